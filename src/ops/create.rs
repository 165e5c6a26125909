// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use smol_str::SmolStr;

use super::{
    kind_mismatch, Applied, Execution, Operation, OperationContext, OperationError, OperationHandler,
    OperationKind,
};
use crate::identity::Fingerprint;
use crate::manifest::NodeMapping;
use crate::model::{ElementId, GElement, GLabel, GNode};

/// Creates a node by inserting a new construct rendered from the type's template.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateHandler;

impl CreateHandler {
    fn check<'m>(ctx: &'m OperationContext<'_>, op: &Operation) -> Result<&'m NodeMapping, OperationError> {
        let Operation::Create { element_type_id, container_id, location, .. } = op else {
            return Err(kind_mismatch(OperationKind::Create, op));
        };
        let mapping = ctx
            .manifest
            .node_mapping_for_diagram_type(element_type_id)
            .ok_or_else(|| OperationError::UnsupportedElementType { element_type: element_type_id.to_string() })?;
        if location.is_none() {
            return Err(OperationError::MissingLocation);
        }
        ctx.state.root()?;

        let allowed = match container_id {
            None => ctx.manifest.allows_root(&mapping.ast_type),
            Some(container_id) => {
                let container = ctx
                    .state
                    .gmodel()
                    .is_node(container_id)
                    .then(|| ctx.state.ast_node(container_id))
                    .flatten()
                    .ok_or_else(|| OperationError::ContainerNotFound { container_id: container_id.clone() })?;
                ctx.manifest
                    .node_mapping(container.node_type())
                    .is_some_and(|m| m.allows_child(&mapping.ast_type))
            }
        };
        if !allowed {
            return Err(OperationError::PlacementNotAllowed {
                ast_type: mapping.ast_type.clone(),
                container_id: container_id.clone(),
            });
        }
        Ok(mapping)
    }
}

impl OperationHandler for CreateHandler {
    fn kind(&self) -> OperationKind {
        OperationKind::Create
    }

    fn can_execute(&self, ctx: &OperationContext<'_>, op: &Operation) -> bool {
        Self::check(ctx, op).is_ok()
    }

    fn execute(&self, ctx: &mut OperationContext<'_>, op: &Operation) -> Result<Execution, OperationError> {
        let (ast_type, default_size) = {
            let mapping = Self::check(ctx, op)?;
            (SmolStr::new(&mapping.ast_type), mapping.default_size)
        };
        let Operation::Create { container_id, location, size, .. } = op else {
            return Err(kind_mismatch(OperationKind::Create, op));
        };
        let position = location.unwrap_or_default();
        let version = ctx.state.version();

        let node_id = ctx.registry.generate_id()?;
        let plan = ctx.provider.create(&ctx.edit_context(), &ast_type, container_id.as_ref())?;
        ctx.ensure_version(version)?;

        let uri = ctx.state.uri().clone();
        let sibling_index =
            ctx.registry.sibling_count(&uri, plan.parent.as_ref(), &plan.containment, &plan.ast_type);
        let fingerprint = Fingerprint {
            ast_type: plan.ast_type.clone(),
            parent: plan.parent.clone(),
            containment: plan.containment.clone(),
            name: Some(plan.name.clone()),
            sibling_index,
        };
        ctx.registry.register_new_uuid(&uri, node_id.clone(), fingerprint)?;

        let size = size.or(default_size).unwrap_or(ctx.config.default_node_size);
        let node = GNode {
            id: node_id.clone(),
            element_type: ctx.manifest.diagram_type_for(&plan.ast_type),
            position,
            size,
            collapsed: false,
            children: vec![GElement::Label(GLabel {
                id: node_id.derive("", "_label"),
                element_type: SmolStr::new(&ctx.config.label_type),
                text: plan.name.clone(),
            })],
        };
        ctx.state.gmodel_mut().insert_node(node);
        ctx.state.set_position(&node_id, position);
        ctx.state.set_size(&node_id, size);
        ctx.state.gmodel_mut().bump_revision();

        tracing::debug!(id = %node_id, name = %plan.name, ast_type = %plan.ast_type, "created node");
        Ok(Execution {
            kind: OperationKind::Create,
            element_id: Some(node_id.clone()),
            text_edits: plan.edits,
            applied: Applied::Created { node_id, name: plan.name },
        })
    }

    fn undo(&self, ctx: &mut OperationContext<'_>, applied: &Applied) -> bool {
        let Applied::Created { node_id, .. } = applied else {
            return false;
        };
        remove_node(ctx, node_id)
    }
}

/// Removes the node and every edge attached to it since it was created.
fn remove_node(ctx: &mut OperationContext<'_>, node_id: &ElementId) -> bool {
    if !ctx.state.gmodel().is_node(node_id) {
        return false;
    }
    let attached = ctx.state.gmodel().edges_touching(&BTreeSet::from([node_id.clone()]));
    for id in attached.iter().chain([node_id]) {
        ctx.state.gmodel_mut().remove(id);
        ctx.state.take_metadata(id);
    }
    ctx.state.gmodel_mut().bump_revision();
    tracing::debug!(id = %node_id, edges = attached.len(), "undid node creation");
    true
}
