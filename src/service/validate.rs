// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::format::TextRange;
use crate::identity::{graphical_constructs, CancellationToken};
use crate::manifest::GrammarManifest;
use crate::model::{NodePath, SourceSpan, SyntaxNode};
use crate::state::ModelState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MarkerSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub severity: MarkerSeverity,
    pub message: String,
    pub range: TextRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub markers: Vec<Marker>,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
}

impl ValidationReport {
    fn from_markers(markers: Vec<Marker>) -> Self {
        let error_count = markers.iter().filter(|m| m.severity == MarkerSeverity::Error).count();
        let warning_count = markers.len() - error_count;
        Self { markers, is_valid: error_count == 0, error_count, warning_count }
    }
}

/// Collects markers for one document. Returns `None` if `cancel` fired between passes.
pub(crate) fn validate_document(
    state: &ModelState,
    manifest: &GrammarManifest,
    cancel: &CancellationToken,
) -> Option<ValidationReport> {
    let text = state.text();
    let index = state.line_index();
    let marker = |severity, message: String, span: SourceSpan, path: Option<&NodePath>| Marker {
        severity,
        message,
        range: index.range(text, span),
        element_id: path.and_then(|p| state.element_id(p)).map(ToString::to_string),
    };

    let mut markers = state
        .diagnostics()
        .iter()
        .map(|d| marker(MarkerSeverity::Error, d.message.clone(), d.span, None))
        .collect::<Vec<_>>();

    if let Some(tree) = state.tree() {
        if cancel.is_cancelled() {
            return None;
        }
        tree.walk(&mut |node: &SyntaxNode, path: &NodePath| {
            for property in node.properties() {
                for reference in property.value().references() {
                    if !reference.is_resolved() {
                        markers.push(marker(
                            MarkerSeverity::Error,
                            format!("unresolved reference @{} in {}", reference.text(), property.key()),
                            reference.span(),
                            Some(path),
                        ));
                    }
                }
            }
        });

        if cancel.is_cancelled() {
            return None;
        }
        let constructs = graphical_constructs(tree, manifest);
        let mut seen = BTreeMap::<(Option<NodePath>, &str, &str), usize>::new();
        for construct in &constructs {
            let Some(name) = construct.name.as_deref() else { continue };
            let key = (construct.parent.clone(), construct.containment.as_str(), name);
            let count = seen.entry(key).or_insert(0);
            *count += 1;
            if *count > 1 {
                if let Some(node) = tree.node_at(&construct.path) {
                    markers.push(marker(
                        MarkerSeverity::Warning,
                        format!("duplicate name {name} among siblings"),
                        node.span(),
                        Some(&construct.path),
                    ));
                }
            }
        }
    }

    if let Err(violation) = state.gmodel().check_invariants() {
        markers.push(marker(MarkerSeverity::Error, violation.to_string(), SourceSpan::new(0, 0), None));
    }

    Some(ValidationReport::from_markers(markers))
}
