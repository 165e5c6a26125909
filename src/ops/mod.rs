// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Graphical operations.
//!
//! Every handler checks its preconditions, asks the text edit provider for the edits that
//! realize the change, and only then mutates the graphical model, metadata and registry. A
//! failed precondition or provider call leaves all of them untouched. Undo reverses the
//! in-memory graphical mutation only; reverting the text is the caller's job.

mod connect;
mod create;
mod delete;
mod move_node;

pub use connect::ConnectHandler;
pub use create::CreateHandler;
pub use delete::DeleteHandler;
pub use move_node::MoveHandler;

use std::collections::BTreeSet;
use std::fmt;

use smol_str::SmolStr;

use crate::config::ServiceConfig;
use crate::edits::{EditContext, ProviderError, TextEdit, TextEditProvider};
use crate::identity::{IdentityRegistry, RegistryError};
use crate::manifest::GrammarManifest;
use crate::model::{Dimension, ElementId, ElementMetadata, Point, RemovedElement, RoutingPoints};
use crate::state::{ModelState, StateError};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create {
        element_type_id: SmolStr,
        container_id: Option<ElementId>,
        location: Option<Point>,
        size: Option<Dimension>,
    },
    Delete {
        element_ids: Vec<ElementId>,
    },
    Move {
        element_id: ElementId,
        position: Point,
        size: Option<Dimension>,
    },
    Connect {
        edge_type_id: SmolStr,
        source_id: ElementId,
        target_id: ElementId,
        routing_points: RoutingPoints,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Delete { .. } => OperationKind::Delete,
            Self::Move { .. } => OperationKind::Move,
            Self::Connect { .. } => OperationKind::Connect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Create,
    Delete,
    Move,
    Connect,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Connect => "connect",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an executed operation changed in memory; enough to undo it.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Created {
        node_id: ElementId,
        name: String,
    },
    Deleted {
        /// In removal order.
        removed: Vec<RemovedElement>,
        metadata: Vec<(ElementId, ElementMetadata)>,
    },
    Moved {
        element_id: ElementId,
        previous_position: Point,
        previous_size: Dimension,
        previous_metadata: ElementMetadata,
    },
    Connected {
        edge_id: ElementId,
        /// Edges whose reference the connect overwrote, in removal order.
        replaced: Vec<RemovedElement>,
        metadata: Vec<(ElementId, ElementMetadata)>,
    },
}

impl Applied {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Created { .. } => OperationKind::Create,
            Self::Deleted { .. } => OperationKind::Delete,
            Self::Moved { .. } => OperationKind::Move,
            Self::Connected { .. } => OperationKind::Connect,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub kind: OperationKind,
    pub element_id: Option<ElementId>,
    /// Edits against the text the handler saw; applying them is the caller's job.
    pub text_edits: Vec<TextEdit>,
    pub applied: Applied,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationError {
    NotReady(StateError),
    KindMismatch { expected: OperationKind, found: OperationKind },
    UnsupportedElementType { element_type: String },
    MissingLocation,
    ContainerNotFound { container_id: ElementId },
    PlacementNotAllowed { ast_type: String, container_id: Option<ElementId> },
    NotFound { element_id: ElementId },
    NotANode { element_id: ElementId },
    NothingToDelete,
    UnsupportedEdgeType { edge_type: String, source_type: Option<String> },
    StaleVersion { expected: u64, current: u64 },
    Provider(ProviderError),
    Registry(RegistryError),
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady(err) => write!(f, "model not ready: {err}"),
            Self::KindMismatch { expected, found } => {
                write!(f, "operation kind mismatch (expected={expected}, found={found})")
            }
            Self::UnsupportedElementType { element_type } => {
                write!(f, "element type {element_type} is not supported")
            }
            Self::MissingLocation => f.write_str("create requires a location"),
            Self::ContainerNotFound { container_id } => {
                write!(f, "container {container_id} does not exist")
            }
            Self::PlacementNotAllowed { ast_type, container_id: Some(container_id) } => {
                write!(f, "{ast_type} may not be placed inside {container_id}")
            }
            Self::PlacementNotAllowed { ast_type, container_id: None } => {
                write!(f, "{ast_type} may not be placed at the document root")
            }
            Self::NotFound { element_id } => write!(f, "element {element_id} not found"),
            Self::NotANode { element_id } => write!(f, "element {element_id} is not a node"),
            Self::NothingToDelete => f.write_str("delete requires at least one element"),
            Self::UnsupportedEdgeType { edge_type, source_type: Some(source_type) } => {
                write!(f, "edge type {edge_type} is not supported from {source_type}")
            }
            Self::UnsupportedEdgeType { edge_type, source_type: None } => {
                write!(f, "edge type {edge_type} is not supported")
            }
            Self::StaleVersion { expected, current } => {
                write!(f, "document changed (expected version={expected}, current={current})")
            }
            Self::Provider(err) => write!(f, "text edit failed: {err}"),
            Self::Registry(err) => write!(f, "identity registry: {err}"),
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotReady(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StateError> for OperationError {
    fn from(err: StateError) -> Self {
        Self::NotReady(err)
    }
}

impl From<ProviderError> for OperationError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<RegistryError> for OperationError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

/// Everything a handler reads or mutates for one document.
pub struct OperationContext<'a> {
    pub state: &'a mut ModelState,
    pub registry: &'a mut IdentityRegistry,
    pub manifest: &'a GrammarManifest,
    pub config: &'a ServiceConfig,
    pub provider: &'a dyn TextEditProvider,
}

impl OperationContext<'_> {
    pub fn edit_context(&self) -> EditContext<'_> {
        EditContext { state: &*self.state, manifest: self.manifest, config: self.config }
    }

    /// Fails if the document version moved while the provider ran.
    fn ensure_version(&self, expected: u64) -> Result<(), OperationError> {
        let current = self.state.version();
        if current != expected {
            return Err(OperationError::StaleVersion { expected, current });
        }
        Ok(())
    }
}

pub trait OperationHandler {
    fn kind(&self) -> OperationKind;

    /// Pure precondition check.
    fn can_execute(&self, ctx: &OperationContext<'_>, op: &Operation) -> bool;

    fn execute(&self, ctx: &mut OperationContext<'_>, op: &Operation) -> Result<Execution, OperationError>;

    /// Reverses the graphical mutation of `applied`. `false` if there is nothing left to undo.
    fn undo(&self, ctx: &mut OperationContext<'_>, applied: &Applied) -> bool;
}

fn kind_mismatch(expected: OperationKind, op: &Operation) -> OperationError {
    OperationError::KindMismatch { expected, found: op.kind() }
}

/// Whether `removed` can go back without duplicating an id or leaving an edge without an endpoint.
fn restorable(ctx: &OperationContext<'_>, removed: &[RemovedElement]) -> bool {
    let gmodel = ctx.state.gmodel();
    if removed.iter().any(|r| gmodel.contains(r.element.id())) {
        return false;
    }
    let restored_nodes =
        removed.iter().filter(|r| r.element.is_node()).map(|r| r.element.id()).collect::<BTreeSet<_>>();
    removed.iter().filter_map(|r| r.element.as_edge()).all(|edge| {
        [&edge.source_id, &edge.target_id]
            .into_iter()
            .all(|id| gmodel.is_node(id) || restored_nodes.contains(id))
    })
}

/// Puts back what a handler removed, metadata included. Callers check [`restorable`] first.
fn restore_removed(
    ctx: &mut OperationContext<'_>,
    removed: &[RemovedElement],
    metadata: &[(ElementId, ElementMetadata)],
) {
    for element in removed.iter().rev() {
        ctx.state.gmodel_mut().restore(element.clone());
    }
    for (id, entry) in metadata {
        ctx.state.restore_metadata(id, entry.clone());
    }
}

/// Dispatches operations to the handler registered for their kind.
pub struct OperationHandlers {
    handlers: Vec<Box<dyn OperationHandler + Send + Sync>>,
}

impl Default for OperationHandlers {
    fn default() -> Self {
        Self {
            handlers: vec![
                Box::new(CreateHandler),
                Box::new(DeleteHandler),
                Box::new(MoveHandler),
                Box::new(ConnectHandler),
            ],
        }
    }
}

impl fmt::Debug for OperationHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|h| h.kind())).finish()
    }
}

impl OperationHandlers {
    /// Replaces the handler for its kind.
    pub fn register(&mut self, handler: Box<dyn OperationHandler + Send + Sync>) {
        self.handlers.retain(|h| h.kind() != handler.kind());
        self.handlers.push(handler);
    }

    fn handler(&self, kind: OperationKind) -> Option<&(dyn OperationHandler + Send + Sync)> {
        self.handlers.iter().find(|h| h.kind() == kind).map(|h| h.as_ref())
    }

    pub fn can_execute(&self, ctx: &OperationContext<'_>, op: &Operation) -> bool {
        self.handler(op.kind()).is_some_and(|h| h.can_execute(ctx, op))
    }

    pub fn execute(&self, ctx: &mut OperationContext<'_>, op: &Operation) -> Result<Execution, OperationError> {
        match self.handler(op.kind()) {
            Some(handler) => handler.execute(ctx, op),
            None => Err(OperationError::UnsupportedElementType { element_type: op.kind().to_string() }),
        }
    }

    pub fn undo(&self, ctx: &mut OperationContext<'_>, applied: &Applied) -> bool {
        self.handler(applied.kind()).is_some_and(|h| h.undo(ctx, applied))
    }
}
