// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use super::{
    kind_mismatch, restorable, restore_removed, Applied, Execution, Operation, OperationContext,
    OperationError, OperationHandler, OperationKind,
};
use crate::model::{ElementId, GElement};

/// Deletes nodes and edges. Deleting a node also removes the nodes of its nested constructs and
/// every edge touching any removed node.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteHandler;

impl DeleteHandler {
    fn check<'o>(ctx: &OperationContext<'_>, op: &'o Operation) -> Result<&'o [ElementId], OperationError> {
        let Operation::Delete { element_ids } = op else {
            return Err(kind_mismatch(OperationKind::Delete, op));
        };
        if element_ids.is_empty() {
            return Err(OperationError::NothingToDelete);
        }
        ctx.state.root()?;
        for element_id in element_ids {
            if !ctx.state.gmodel().contains(element_id) {
                return Err(OperationError::NotFound { element_id: element_id.clone() });
            }
        }
        Ok(element_ids.as_slice())
    }

    /// Targets plus the nodes of every construct nested inside a targeted node.
    fn expand(ctx: &OperationContext<'_>, targets: &[ElementId]) -> (BTreeSet<ElementId>, Vec<ElementId>) {
        let gmodel = ctx.state.gmodel();
        let mut nodes = BTreeSet::new();
        let mut edges = Vec::new();
        for id in targets {
            match gmodel.find(id) {
                Some(GElement::Node(_)) => {
                    nodes.insert(id.clone());
                }
                Some(GElement::Edge(_)) => edges.push(id.clone()),
                _ => {}
            }
        }

        let roots = nodes.iter().filter_map(|id| ctx.state.ast_path(id)).cloned().collect::<Vec<_>>();
        for node in gmodel.nodes() {
            let nested = ctx
                .state
                .ast_path(&node.id)
                .is_some_and(|path| roots.iter().any(|root| path.is_descendant_of(root)));
            if nested {
                nodes.insert(node.id.clone());
            }
        }

        for edge_id in gmodel.edges_touching(&nodes) {
            if !edges.contains(&edge_id) {
                edges.push(edge_id);
            }
        }
        (nodes, edges)
    }
}

impl OperationHandler for DeleteHandler {
    fn kind(&self) -> OperationKind {
        OperationKind::Delete
    }

    fn can_execute(&self, ctx: &OperationContext<'_>, op: &Operation) -> bool {
        Self::check(ctx, op).is_ok()
    }

    fn execute(&self, ctx: &mut OperationContext<'_>, op: &Operation) -> Result<Execution, OperationError> {
        let targets = Self::check(ctx, op)?;
        let version = ctx.state.version();
        let (nodes, edges) = Self::expand(ctx, targets);

        let text_edits = ctx.provider.delete(&ctx.edit_context(), targets)?;
        ctx.ensure_version(version)?;

        let mut removed = Vec::with_capacity(nodes.len() + edges.len());
        let mut metadata = Vec::with_capacity(nodes.len() + edges.len());
        for id in edges.iter().chain(nodes.iter()) {
            if let Some(element) = ctx.state.gmodel_mut().remove(id) {
                removed.push(element);
                metadata.push((id.clone(), ctx.state.take_metadata(id)));
            }
        }
        ctx.state.gmodel_mut().bump_revision();

        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "deleted elements");
        Ok(Execution {
            kind: OperationKind::Delete,
            element_id: targets.first().cloned(),
            text_edits,
            applied: Applied::Deleted { removed, metadata },
        })
    }

    fn undo(&self, ctx: &mut OperationContext<'_>, applied: &Applied) -> bool {
        let Applied::Deleted { removed, metadata } = applied else {
            return false;
        };
        if removed.is_empty() || !restorable(ctx, removed) {
            return false;
        }

        restore_removed(ctx, removed, metadata);
        ctx.state.gmodel_mut().bump_revision();
        true
    }
}
