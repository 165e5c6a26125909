// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::manifest::GrammarManifest;
use crate::model::{ElementId, NodePath, SyntaxNode, SyntaxTree};

/// Structural descriptor used to re-match an element id after a reparse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    pub ast_type: SmolStr,
    pub parent: Option<ElementId>,
    pub containment: SmolStr,
    pub name: Option<String>,
    /// Ordinal among constructs sharing `(parent, containment, ast_type)`, in pre-order.
    pub sibling_index: usize,
}

/// A construct that is represented in the graphical model, located in one tree generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicalConstruct {
    pub path: NodePath,
    /// Nearest graphical ancestor.
    pub parent: Option<NodePath>,
    /// Number of graphical ancestors.
    pub level: usize,
    pub ast_type: SmolStr,
    pub containment: SmolStr,
    pub name: Option<String>,
    pub sibling_index: usize,
}

impl GraphicalConstruct {
    pub fn fingerprint(&self, parent: Option<ElementId>) -> Fingerprint {
        Fingerprint {
            ast_type: self.ast_type.clone(),
            parent,
            containment: self.containment.clone(),
            name: self.name.clone(),
            sibling_index: self.sibling_index,
        }
    }
}

type SiblingKey = (Option<NodePath>, SmolStr, SmolStr);

/// Graphical constructs of `tree` in pre-order.
///
/// Constructs that are not graphical are skipped but their descendants are still visited; a
/// graphical descendant then hangs off the nearest graphical ancestor.
pub fn graphical_constructs(tree: &SyntaxTree, manifest: &GrammarManifest) -> Vec<GraphicalConstruct> {
    let mut out = Vec::new();
    let mut ancestors: Vec<NodePath> = Vec::new();
    let mut sibling_counts = BTreeMap::<SiblingKey, usize>::new();

    tree.walk(&mut |node: &SyntaxNode, path: &NodePath| {
        while ancestors.last().is_some_and(|top| !path.is_descendant_of(top)) {
            ancestors.pop();
        }
        if !manifest.is_graphical(node) {
            return;
        }

        let parent = ancestors.last().cloned();
        let ast_type = SmolStr::new(node.node_type());
        let containment = SmolStr::new(node.containment());
        let counter = sibling_counts
            .entry((parent.clone(), containment.clone(), ast_type.clone()))
            .or_insert(0);
        let sibling_index = *counter;
        *counter += 1;

        out.push(GraphicalConstruct {
            path: path.clone(),
            parent,
            level: ancestors.len(),
            ast_type,
            containment,
            name: node.name().map(str::to_owned),
            sibling_index,
        });
        ancestors.push(path.clone());
    });

    out
}
