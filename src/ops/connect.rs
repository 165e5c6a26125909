// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use smol_str::SmolStr;

use super::{
    kind_mismatch, restorable, restore_removed, Applied, Execution, Operation, OperationContext,
    OperationError, OperationHandler, OperationKind,
};
use crate::model::{ElementId, GEdge, GElement, GLabel, SyntaxNode};
use crate::state::EdgeOrigin;

/// Connects two nodes by writing a reference into the source construct.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectHandler;

impl ConnectHandler {
    fn endpoint<'c>(ctx: &'c OperationContext<'_>, id: &ElementId) -> Result<&'c SyntaxNode, OperationError> {
        let element =
            ctx.state.find_element(id).ok_or_else(|| OperationError::NotFound { element_id: id.clone() })?;
        if !element.is_node() {
            return Err(OperationError::NotANode { element_id: id.clone() });
        }
        ctx.state.ast_node(id).ok_or_else(|| OperationError::NotFound { element_id: id.clone() })
    }

    fn check(ctx: &OperationContext<'_>, op: &Operation) -> Result<(), OperationError> {
        let Operation::Connect { edge_type_id, source_id, target_id, .. } = op else {
            return Err(kind_mismatch(OperationKind::Connect, op));
        };
        if !ctx.manifest.supports_edge_type(edge_type_id) {
            return Err(OperationError::UnsupportedEdgeType { edge_type: edge_type_id.to_string(), source_type: None });
        }
        ctx.state.root()?;
        let source = Self::endpoint(ctx, source_id)?;
        Self::endpoint(ctx, target_id)?;
        if ctx.manifest.edge_mapping_for_type(edge_type_id, source.node_type()).is_none() {
            return Err(OperationError::UnsupportedEdgeType {
                edge_type: edge_type_id.to_string(),
                source_type: Some(source.node_type().to_owned()),
            });
        }
        Ok(())
    }

    /// `{source}_{property}_{target}`, suffixed until unused. Ids in `freed` are about to go away.
    fn edge_id(
        ctx: &OperationContext<'_>,
        source: &ElementId,
        property: &str,
        target: &ElementId,
        freed: &[ElementId],
    ) -> Option<ElementId> {
        let base = format!("{source}_{property}_{target}");
        let taken = |id: &ElementId| {
            (ctx.state.gmodel().contains(id) && !freed.contains(id)) || ctx.registry.is_issued(id)
        };
        let first = ElementId::new(base.as_str()).ok()?;
        if !taken(&first) {
            return Some(first);
        }
        (1usize..)
            .map_while(|suffix| ElementId::new(format!("{base}{suffix}")).ok())
            .find(|candidate| !taken(candidate))
    }
}

impl OperationHandler for ConnectHandler {
    fn kind(&self) -> OperationKind {
        OperationKind::Connect
    }

    fn can_execute(&self, ctx: &OperationContext<'_>, op: &Operation) -> bool {
        Self::check(ctx, op).is_ok()
    }

    fn execute(&self, ctx: &mut OperationContext<'_>, op: &Operation) -> Result<Execution, OperationError> {
        Self::check(ctx, op)?;
        let Operation::Connect { edge_type_id, source_id, target_id, routing_points } = op else {
            return Err(kind_mismatch(OperationKind::Connect, op));
        };
        let version = ctx.state.version();

        let plan = ctx.provider.connect(&ctx.edit_context(), source_id, target_id, edge_type_id)?;
        ctx.ensure_version(version)?;

        let source_path = ctx
            .state
            .ast_path(source_id)
            .cloned()
            .ok_or_else(|| OperationError::NotFound { element_id: source_id.clone() })?;
        let overwritten = plan
            .replaced
            .iter()
            .flat_map(|name| ctx.state.edges_from_reference(&source_path, &plan.property, name))
            .filter(|id| ctx.state.gmodel().contains(id))
            .collect::<Vec<_>>();
        let edge_id = Self::edge_id(ctx, source_id, &plan.property, target_id, &overwritten).ok_or_else(|| {
            OperationError::UnsupportedEdgeType { edge_type: edge_type_id.to_string(), source_type: None }
        })?;
        let label = ctx.state.ast_node(source_id).and_then(|node| {
            ctx.manifest
                .edge_mapping(node.node_type(), &plan.property)
                .and_then(|m| m.label_property.as_deref())
                .and_then(|key| node.property(key))
                .and_then(|p| p.value().display_text())
        });

        let edge = GEdge {
            id: edge_id.clone(),
            element_type: SmolStr::new(edge_type_id),
            source_id: source_id.clone(),
            target_id: target_id.clone(),
            routing_points: routing_points.clone(),
            children: label
                .map(|text| {
                    vec![GElement::Label(GLabel {
                        id: edge_id.derive("", "_label"),
                        element_type: SmolStr::new(&ctx.config.label_type),
                        text,
                    })]
                })
                .unwrap_or_default(),
        };
        let mut replaced = Vec::with_capacity(overwritten.len());
        let mut metadata = Vec::with_capacity(overwritten.len());
        for id in &overwritten {
            if let Some(element) = ctx.state.gmodel_mut().remove(id) {
                replaced.push(element);
                metadata.push((id.clone(), ctx.state.take_metadata(id)));
            }
        }
        ctx.state.gmodel_mut().push_edge(edge);
        if !routing_points.is_empty() {
            ctx.state.set_routing_points(&edge_id, routing_points.clone());
        }
        ctx.state.register_edge_origin(
            edge_id.clone(),
            EdgeOrigin { source: source_path, property: plan.property, target_name: plan.target_name },
        );
        ctx.state.gmodel_mut().bump_revision();

        tracing::debug!(
            id = %edge_id,
            source = %source_id,
            target = %target_id,
            replaced = replaced.len(),
            "connected nodes"
        );
        Ok(Execution {
            kind: OperationKind::Connect,
            element_id: Some(edge_id.clone()),
            text_edits: plan.edits,
            applied: Applied::Connected { edge_id, replaced, metadata },
        })
    }

    fn undo(&self, ctx: &mut OperationContext<'_>, applied: &Applied) -> bool {
        let Applied::Connected { edge_id, replaced, metadata } = applied else {
            return false;
        };
        if ctx.state.gmodel_mut().remove(edge_id).is_none() {
            return false;
        }
        ctx.state.take_metadata(edge_id);
        // Overwritten edges come back only while both of their endpoints are still nodes.
        if restorable(ctx, replaced) {
            restore_removed(ctx, replaced, metadata);
        }
        ctx.state.gmodel_mut().bump_revision();
        true
    }
}
