// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::ids::ElementId;

pub const GRAPH_TYPE: &str = "graph";
pub const LABEL_TYPE: &str = "label:text";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Dimension {
    pub width: f64,
    pub height: f64,
}

impl Dimension {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub type RoutingPoints = SmallVec<[Point; 4]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GNode {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: SmolStr,
    pub position: Point,
    pub size: Dimension,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub collapsed: bool,
    #[serde(default)]
    pub children: Vec<GElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GEdge {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: SmolStr,
    pub source_id: ElementId,
    pub target_id: ElementId,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub routing_points: RoutingPoints,
    #[serde(default)]
    pub children: Vec<GElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GLabel {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: SmolStr,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GElement {
    Node(GNode),
    Edge(GEdge),
    Label(GLabel),
}

impl GElement {
    pub fn id(&self) -> &ElementId {
        match self {
            Self::Node(node) => &node.id,
            Self::Edge(edge) => &edge.id,
            Self::Label(label) => &label.id,
        }
    }

    pub fn element_type(&self) -> &str {
        match self {
            Self::Node(node) => &node.element_type,
            Self::Edge(edge) => &edge.element_type,
            Self::Label(label) => &label.element_type,
        }
    }

    pub fn children(&self) -> &[GElement] {
        match self {
            Self::Node(node) => &node.children,
            Self::Edge(edge) => &edge.children,
            Self::Label(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<GElement>> {
        match self {
            Self::Node(node) => Some(&mut node.children),
            Self::Edge(edge) => Some(&mut edge.children),
            Self::Label(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&GNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut GNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&GEdge> {
        match self {
            Self::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_edge_mut(&mut self) -> Option<&mut GEdge> {
        match self {
            Self::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge(_))
    }
}

/// An element taken out of the tree, with enough context to put it back where it was.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedElement {
    pub parent_id: Option<ElementId>,
    pub index: usize,
    pub element: GElement,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("edge {edge_id} references missing node {missing_id}")]
    DanglingEdge { edge_id: ElementId, missing_id: ElementId },
    #[error("element id {element_id} is used more than once")]
    DuplicateId { element_id: ElementId },
}

/// Root of the graphical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GModelRoot {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub element_type: SmolStr,
    pub revision: u64,
    #[serde(default)]
    pub children: Vec<GElement>,
}

impl GModelRoot {
    pub fn new(id: ElementId) -> Self {
        Self { id, element_type: SmolStr::new_static(GRAPH_TYPE), revision: 0, children: Vec::new() }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bump_revision(&mut self) -> u64 {
        self.revision = self.revision.saturating_add(1);
        self.revision
    }

    /// Depth-first, pre-order search.
    pub fn find(&self, id: &ElementId) -> Option<&GElement> {
        fn find_in<'a>(elements: &'a [GElement], id: &ElementId) -> Option<&'a GElement> {
            for element in elements {
                if element.id() == id {
                    return Some(element);
                }
                if let Some(found) = find_in(element.children(), id) {
                    return Some(found);
                }
            }
            None
        }

        find_in(&self.children, id)
    }

    pub fn find_mut(&mut self, id: &ElementId) -> Option<&mut GElement> {
        fn find_in<'a>(elements: &'a mut [GElement], id: &ElementId) -> Option<&'a mut GElement> {
            for element in elements {
                if element.id() == id {
                    return Some(element);
                }
                if let Some(children) = element.children_mut() {
                    if let Some(found) = find_in(children, id) {
                        return Some(found);
                    }
                }
            }
            None
        }

        find_in(&mut self.children, id)
    }

    pub fn find_node_mut(&mut self, id: &ElementId) -> Option<&mut GNode> {
        self.find_mut(id).and_then(GElement::as_node_mut)
    }

    pub fn find_edge_mut(&mut self, id: &ElementId) -> Option<&mut GEdge> {
        self.find_mut(id).and_then(GElement::as_edge_mut)
    }

    /// Depth-first, pre-order search by type tag.
    pub fn find_by_type(&self, element_type: &str) -> Vec<&GElement> {
        fn collect<'a>(elements: &'a [GElement], element_type: &str, out: &mut Vec<&'a GElement>) {
            for element in elements {
                if element.element_type() == element_type {
                    out.push(element);
                }
                collect(element.children(), element_type, out);
            }
        }

        let mut out = Vec::new();
        collect(&self.children, element_type, &mut out);
        out
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.find(id).is_some()
    }

    pub fn is_node(&self, id: &ElementId) -> bool {
        self.find(id).is_some_and(GElement::is_node)
    }

    pub fn nodes(&self) -> Vec<&GNode> {
        let mut out = Vec::new();
        self.visit(&mut |element| {
            if let GElement::Node(node) = element {
                out.push(node);
            }
        });
        out
    }

    pub fn edges(&self) -> Vec<&GEdge> {
        let mut out = Vec::new();
        self.visit(&mut |element| {
            if let GElement::Edge(edge) = element {
                out.push(edge);
            }
        });
        out
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a GElement)) {
        fn visit_in<'a>(elements: &'a [GElement], f: &mut dyn FnMut(&'a GElement)) {
            for element in elements {
                f(element);
                visit_in(element.children(), f);
            }
        }

        visit_in(&self.children, f);
    }

    /// Ids of edges whose source or target is in `node_ids`.
    pub fn edges_touching(&self, node_ids: &BTreeSet<ElementId>) -> Vec<ElementId> {
        self.edges()
            .into_iter()
            .filter(|edge| node_ids.contains(&edge.source_id) || node_ids.contains(&edge.target_id))
            .map(|edge| edge.id.clone())
            .collect()
    }

    /// Appends a node after the last top-level node, keeping nodes ahead of edges.
    pub fn insert_node(&mut self, node: GNode) {
        let index = self.children.iter().position(GElement::is_edge).unwrap_or(self.children.len());
        self.children.insert(index, GElement::Node(node));
    }

    pub fn push_edge(&mut self, edge: GEdge) {
        self.children.push(GElement::Edge(edge));
    }

    pub fn remove(&mut self, id: &ElementId) -> Option<RemovedElement> {
        fn remove_in(
            elements: &mut Vec<GElement>,
            parent_id: Option<&ElementId>,
            id: &ElementId,
        ) -> Option<RemovedElement> {
            if let Some(index) = elements.iter().position(|e| e.id() == id) {
                let element = elements.remove(index);
                return Some(RemovedElement { parent_id: parent_id.cloned(), index, element });
            }
            for element in elements.iter_mut() {
                let element_id = element.id().clone();
                if let Some(children) = element.children_mut() {
                    if let Some(found) = remove_in(children, Some(&element_id), id) {
                        return Some(found);
                    }
                }
            }
            None
        }

        remove_in(&mut self.children, None, id)
    }

    /// Puts a removed element back at its recorded index (clamped to the current length).
    ///
    /// Returns `false` if the recorded parent no longer exists.
    pub fn restore(&mut self, removed: RemovedElement) -> bool {
        let children = match &removed.parent_id {
            None => &mut self.children,
            Some(parent_id) => match self.find_mut(parent_id).and_then(GElement::children_mut) {
                Some(children) => children,
                None => return false,
            },
        };
        let index = removed.index.min(children.len());
        children.insert(index, removed.element);
        true
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = BTreeSet::new();
        let mut duplicate = None;
        self.visit(&mut |element| {
            if !seen.insert(element.id().clone()) && duplicate.is_none() {
                duplicate = Some(element.id().clone());
            }
        });
        if let Some(element_id) = duplicate {
            return Err(InvariantViolation::DuplicateId { element_id });
        }

        for edge in self.edges() {
            for endpoint in [&edge.source_id, &edge.target_id] {
                if !self.is_node(endpoint) {
                    return Err(InvariantViolation::DanglingEdge {
                        edge_id: edge.id.clone(),
                        missing_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
