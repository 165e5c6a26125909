// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::{
    kind_mismatch, Applied, Execution, Operation, OperationContext, OperationError, OperationHandler,
    OperationKind,
};
use crate::model::GNode;

/// Repositions (and optionally resizes) a node. Layout is metadata, so text is untouched unless
/// the provider says otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveHandler;

impl MoveHandler {
    fn check<'c>(ctx: &'c OperationContext<'_>, op: &Operation) -> Result<&'c GNode, OperationError> {
        let Operation::Move { element_id, .. } = op else {
            return Err(kind_mismatch(OperationKind::Move, op));
        };
        let element = ctx
            .state
            .find_element(element_id)
            .ok_or_else(|| OperationError::NotFound { element_id: element_id.clone() })?;
        element.as_node().ok_or_else(|| OperationError::NotANode { element_id: element_id.clone() })
    }
}

impl OperationHandler for MoveHandler {
    fn kind(&self) -> OperationKind {
        OperationKind::Move
    }

    fn can_execute(&self, ctx: &OperationContext<'_>, op: &Operation) -> bool {
        Self::check(ctx, op).is_ok()
    }

    fn execute(&self, ctx: &mut OperationContext<'_>, op: &Operation) -> Result<Execution, OperationError> {
        let (previous_position, previous_size) = {
            let node = Self::check(ctx, op)?;
            (node.position, node.size)
        };
        let Operation::Move { element_id, position, size } = op else {
            return Err(kind_mismatch(OperationKind::Move, op));
        };
        let version = ctx.state.version();

        let text_edits = ctx.provider.move_element(&ctx.edit_context(), element_id)?;
        ctx.ensure_version(version)?;

        let previous_metadata = ctx.state.metadata().entry(element_id);
        ctx.state.set_position(element_id, *position);
        if let Some(size) = size {
            ctx.state.set_size(element_id, *size);
        }
        ctx.state.gmodel_mut().bump_revision();

        Ok(Execution {
            kind: OperationKind::Move,
            element_id: Some(element_id.clone()),
            text_edits,
            applied: Applied::Moved {
                element_id: element_id.clone(),
                previous_position,
                previous_size,
                previous_metadata,
            },
        })
    }

    fn undo(&self, ctx: &mut OperationContext<'_>, applied: &Applied) -> bool {
        let Applied::Moved { element_id, previous_position, previous_size, previous_metadata } = applied else {
            return false;
        };
        if !ctx.state.gmodel().is_node(element_id) {
            return false;
        }

        ctx.state.take_metadata(element_id);
        ctx.state.restore_metadata(element_id, previous_metadata.clone());
        if let Some(node) = ctx.state.gmodel_mut().find_node_mut(element_id) {
            node.position = *previous_position;
            node.size = *previous_size;
        }
        ctx.state.gmodel_mut().bump_revision();
        true
    }
}
