// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-document model state.
//!
//! Owns the source text, the latest syntax tree, the graphical model and its layout metadata.
//! Layout setters write through to both the metadata and the live graphical element so the two
//! never need a separate sync pass.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::format::{LineIndex, ParseDiagnostic};
use crate::model::{
    Dimension, DocumentUri, ElementId, ElementMetadata, GElement, GModelRoot, ModelMetadata,
    NodePath, Point, RoutingPoints, SyntaxNode, SyntaxTree,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("document {uri} has no parsed content")]
    NoParsedContent { uri: DocumentUri },
}

/// Where an edge came from in the text: a reference held by a property of its source construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeOrigin {
    pub source: NodePath,
    pub property: SmolStr,
    pub target_name: String,
}

/// Element <-> syntax node table for exactly one tree generation.
#[derive(Debug, Clone, Default)]
struct ElementMappings {
    generation: Option<u64>,
    by_element: BTreeMap<ElementId, NodePath>,
    by_node: BTreeMap<NodePath, ElementId>,
    edge_origins: BTreeMap<ElementId, EdgeOrigin>,
}

#[derive(Debug, Clone)]
pub struct ModelState {
    uri: DocumentUri,
    text: String,
    version: u64,
    tree: Option<SyntaxTree>,
    diagnostics: Vec<ParseDiagnostic>,
    gmodel: GModelRoot,
    metadata: ModelMetadata,
    mappings: ElementMappings,
    dirty: bool,
}

impl ModelState {
    pub fn new(uri: DocumentUri, text: impl Into<String>, version: u64) -> Self {
        let root_id = uri.derive("graph:", "");
        Self {
            uri,
            text: text.into(),
            version,
            tree: None,
            diagnostics: Vec::new(),
            gmodel: GModelRoot::new(root_id),
            metadata: ModelMetadata::default(),
            mappings: ElementMappings::default(),
            dirty: false,
        }
    }

    pub fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.text)
    }

    pub(crate) fn set_text(&mut self, text: String, version: u64) {
        self.text = text;
        self.version = version;
    }

    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.tree.as_ref()
    }

    /// Replaces the parse result. A `None` tree keeps the last graphical model untouched.
    pub(crate) fn set_parse_result(&mut self, tree: Option<SyntaxTree>, diagnostics: Vec<ParseDiagnostic>) {
        self.tree = tree;
        self.diagnostics = diagnostics;
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    /// Root of the syntax tree; "model not ready" until the first successful parse.
    pub fn root(&self) -> Result<&SyntaxNode, StateError> {
        self.tree
            .as_ref()
            .map(SyntaxTree::root)
            .ok_or_else(|| StateError::NoParsedContent { uri: self.uri.clone() })
    }

    pub fn gmodel(&self) -> &GModelRoot {
        &self.gmodel
    }

    pub fn set_gmodel(&mut self, gmodel: GModelRoot) {
        self.gmodel = gmodel;
        self.dirty = true;
    }

    pub(crate) fn gmodel_mut(&mut self) -> &mut GModelRoot {
        self.dirty = true;
        &mut self.gmodel
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Replaces the layout metadata, e.g. with a persisted copy.
    pub fn set_metadata(&mut self, metadata: ModelMetadata) {
        self.metadata = metadata;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Drops every mapping and binds the table to the current tree generation.
    pub fn clear_mappings(&mut self) {
        self.mappings = ElementMappings {
            generation: self.tree.as_ref().map(SyntaxTree::generation),
            ..ElementMappings::default()
        };
    }

    pub fn register_mapping(&mut self, id: ElementId, path: NodePath) {
        self.mappings.by_node.insert(path.clone(), id.clone());
        self.mappings.by_element.insert(id, path);
    }

    pub fn register_edge_origin(&mut self, id: ElementId, origin: EdgeOrigin) {
        self.mappings.edge_origins.insert(id, origin);
    }

    fn mappings_current(&self) -> bool {
        self.mappings.generation.is_some()
            && self.mappings.generation == self.tree.as_ref().map(SyntaxTree::generation)
    }

    /// Path of the construct behind `id` in the current tree generation.
    pub fn ast_path(&self, id: &ElementId) -> Option<&NodePath> {
        if !self.mappings_current() {
            return None;
        }
        self.mappings.by_element.get(id)
    }

    pub fn ast_node(&self, id: &ElementId) -> Option<&SyntaxNode> {
        let path = self.ast_path(id)?;
        self.tree.as_ref()?.node_at(path)
    }

    pub fn element_id(&self, path: &NodePath) -> Option<&ElementId> {
        if !self.mappings_current() {
            return None;
        }
        self.mappings.by_node.get(path)
    }

    pub fn edge_origin(&self, id: &ElementId) -> Option<&EdgeOrigin> {
        if !self.mappings_current() {
            return None;
        }
        self.mappings.edge_origins.get(id)
    }

    /// Edges that came from the reference `@target_name` in `property` of the construct at `source`.
    pub fn edges_from_reference(&self, source: &NodePath, property: &str, target_name: &str) -> Vec<ElementId> {
        if !self.mappings_current() {
            return Vec::new();
        }
        self.mappings
            .edge_origins
            .iter()
            .filter(|(_, o)| &o.source == source && o.property == property && o.target_name == target_name)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn find_element(&self, id: &ElementId) -> Option<&GElement> {
        self.gmodel.find(id)
    }

    pub fn find_elements_by_type(&self, element_type: &str) -> Vec<&GElement> {
        self.gmodel.find_by_type(element_type)
    }

    pub fn position(&self, id: &ElementId) -> Option<Point> {
        self.metadata.position(id)
    }

    pub fn set_position(&mut self, id: &ElementId, position: Point) {
        self.metadata.set_position(id.clone(), position);
        if let Some(node) = self.gmodel.find_node_mut(id) {
            node.position = position;
        }
        self.dirty = true;
    }

    pub fn size(&self, id: &ElementId) -> Option<Dimension> {
        self.metadata.size(id)
    }

    pub fn set_size(&mut self, id: &ElementId, size: Dimension) {
        self.metadata.set_size(id.clone(), size);
        if let Some(node) = self.gmodel.find_node_mut(id) {
            node.size = size;
        }
        self.dirty = true;
    }

    pub fn routing_points(&self, id: &ElementId) -> Option<&RoutingPoints> {
        self.metadata.routing_points(id)
    }

    pub fn set_routing_points(&mut self, id: &ElementId, points: RoutingPoints) {
        if let Some(edge) = self.gmodel.find_edge_mut(id) {
            edge.routing_points = points.clone();
        }
        self.metadata.set_routing_points(id.clone(), points);
        self.dirty = true;
    }

    pub fn is_collapsed(&self, id: &ElementId) -> bool {
        self.metadata.is_collapsed(id)
    }

    pub fn set_collapsed(&mut self, id: &ElementId, collapsed: bool) {
        self.metadata.set_collapsed(id.clone(), collapsed);
        if let Some(node) = self.gmodel.find_node_mut(id) {
            node.collapsed = collapsed;
        }
        self.dirty = true;
    }

    pub(crate) fn take_metadata(&mut self, id: &ElementId) -> ElementMetadata {
        self.dirty = true;
        self.metadata.take(id)
    }

    pub(crate) fn restore_metadata(&mut self, id: &ElementId, entry: ElementMetadata) {
        self.dirty = true;
        self.metadata.put(id, entry);
    }

    /// Drops the layout of ids that no longer name anything. Returns how many had layout.
    pub fn drop_metadata<'a>(&mut self, ids: impl IntoIterator<Item = &'a ElementId>) -> usize {
        let mut dropped = 0;
        for id in ids {
            if self.metadata.take(id) != ElementMetadata::default() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            self.dirty = true;
        }
        dropped
    }
}
