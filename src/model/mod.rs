// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: syntax trees on the text side, the graphical model on the diagram side,
//! and the layout metadata that only the diagram side owns.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod gmodel;
pub mod ids;
pub mod metadata;
pub mod syntax;

pub use gmodel::{
    Dimension, GEdge, GElement, GLabel, GModelRoot, GNode, InvariantViolation, Point,
    RemovedElement, RoutingPoints, GRAPH_TYPE, LABEL_TYPE,
};
pub use ids::{DocumentUri, DocumentUriTag, ElementId, ElementIdTag, Id, IdError};
pub use metadata::{ElementMetadata, ModelMetadata};
pub use syntax::{
    walk_descendants, NodePath, PathSegment, Property, Reference, SourceSpan, SyntaxNode,
    SyntaxTree, SyntaxVisitor, Value,
};
