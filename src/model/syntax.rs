// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Parsed syntax trees.
//!
//! A tree is immutable for the lifetime of one parse. Nodes are addressed by [`NodePath`], which
//! is only meaningful for the generation of the tree it was computed from.

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

/// Half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment {
    containment: SmolStr,
    index: usize,
}

impl PathSegment {
    pub fn containment(&self) -> &str {
        &self.containment
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Position of a node in one generation of a tree: `(containment, index)` steps from the root.
///
/// The index is the ordinal of the node among its parent's children held by the same
/// containment property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, containment: impl Into<SmolStr>, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment { containment: containment.into(), index });
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn parent(&self) -> Option<NodePath> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self { segments: rest.to_vec() })
    }

    /// `true` when `self` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &NodePath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}@{}", seg.containment, seg.index)?;
        }
        Ok(())
    }
}

/// A cross-reference by name. `target` is filled in by [`SyntaxTree::link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    text: String,
    span: SourceSpan,
    target: Option<NodePath>,
}

impl Reference {
    pub fn new(text: impl Into<String>, span: SourceSpan) -> Self {
        Self { text: text.into(), span, target: None }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn target(&self) -> Option<&NodePath> {
        self.target.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Ref(Reference),
    RefList(Vec<Reference>),
}

impl Value {
    /// Text used when this value is shown as a label.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Self::Str(value) => Some(value.clone()),
            Self::Int(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Ref(reference) => Some(reference.text().to_owned()),
            Self::RefList(_) => None,
        }
    }

    pub fn references(&self) -> &[Reference] {
        match self {
            Self::Ref(reference) => std::slice::from_ref(reference),
            Self::RefList(references) => references,
            Self::Str(_) | Self::Int(_) | Self::Bool(_) => &[],
        }
    }

    fn references_mut(&mut self) -> &mut [Reference] {
        match self {
            Self::Ref(reference) => std::slice::from_mut(reference),
            Self::RefList(references) => references,
            Self::Str(_) | Self::Int(_) | Self::Bool(_) => &mut [],
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Ref(_) | Self::RefList(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    key: SmolStr,
    value: Value,
    span: SourceSpan,
}

impl Property {
    pub fn new(key: impl Into<SmolStr>, value: Value, span: SourceSpan) -> Self {
        Self { key: key.into(), value, span }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    node_type: SmolStr,
    name: Option<String>,
    containment: SmolStr,
    properties: Vec<Property>,
    children: Vec<SyntaxNode>,
    span: SourceSpan,
    body: Option<SourceSpan>,
}

impl SyntaxNode {
    pub fn new(node_type: impl Into<SmolStr>, name: Option<String>) -> Self {
        Self {
            node_type: node_type.into(),
            name,
            containment: SmolStr::default(),
            properties: Vec::new(),
            children: Vec::new(),
            span: SourceSpan::default(),
            body: None,
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_child(mut self, containment: impl Into<SmolStr>, mut child: SyntaxNode) -> Self {
        child.containment = containment.into();
        self.children.push(child);
        self
    }

    pub fn with_span(mut self, span: SourceSpan, body: Option<SourceSpan>) -> Self {
        self.span = span;
        self.body = body;
        self
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn containment(&self) -> &str {
        &self.containment
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key() == key)
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    /// Span between the braces of the construct, if it has a body.
    pub fn body(&self) -> Option<SourceSpan> {
        self.body
    }

    /// Children paired with their paths, given this node's own path.
    pub fn child_paths<'a>(
        &'a self,
        path: &'a NodePath,
    ) -> impl Iterator<Item = (NodePath, &'a SyntaxNode)> + 'a {
        let mut ordinals = BTreeMap::<&str, usize>::new();
        self.children.iter().map(move |child| {
            let ordinal = ordinals.entry(child.containment()).or_insert(0);
            let child_path = path.child(child.containment.clone(), *ordinal);
            *ordinal += 1;
            (child_path, child)
        })
    }
}

/// Pre-order traversal callback.
pub trait SyntaxVisitor {
    fn visit(&mut self, node: &SyntaxNode, path: &NodePath);
}

impl<F: FnMut(&SyntaxNode, &NodePath)> SyntaxVisitor for F {
    fn visit(&mut self, node: &SyntaxNode, path: &NodePath) {
        self(node, path)
    }
}

/// Visits every descendant of `root` (not `root` itself), depth-first, pre-order.
pub fn walk_descendants<V: SyntaxVisitor + ?Sized>(root: &SyntaxNode, visitor: &mut V) {
    fn recurse<V: SyntaxVisitor + ?Sized>(node: &SyntaxNode, path: &NodePath, visitor: &mut V) {
        for (child_path, child) in node.child_paths(path) {
            visitor.visit(child, &child_path);
            recurse(child, &child_path, visitor);
        }
    }

    recurse(root, &NodePath::root(), visitor);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    root: SyntaxNode,
    generation: u64,
}

impl SyntaxTree {
    pub fn new(root: SyntaxNode, generation: u64) -> Self {
        Self { root, generation }
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn walk<V: SyntaxVisitor + ?Sized>(&self, visitor: &mut V) {
        walk_descendants(&self.root, visitor);
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&SyntaxNode> {
        let mut current = &self.root;
        for seg in path.segments() {
            current = current
                .children
                .iter()
                .filter(|child| child.containment() == seg.containment())
                .nth(seg.index())?;
        }
        Some(current)
    }

    /// Path of the first construct (pre-order) carrying `name`.
    pub fn find_by_name(&self, name: &str) -> Option<NodePath> {
        let mut found = None;
        self.walk(&mut |node: &SyntaxNode, path: &NodePath| {
            if found.is_none() && node.name() == Some(name) {
                found = Some(path.clone());
            }
        });
        found
    }

    /// Resolves every reference by name against the constructs of this tree.
    ///
    /// The first construct in pre-order wins when names are duplicated.
    pub fn link(&mut self) {
        let mut by_name = BTreeMap::<String, NodePath>::new();
        self.walk(&mut |node: &SyntaxNode, path: &NodePath| {
            if let Some(name) = node.name() {
                by_name.entry(name.to_owned()).or_insert_with(|| path.clone());
            }
        });

        fn link_node(node: &mut SyntaxNode, by_name: &BTreeMap<String, NodePath>) {
            for property in &mut node.properties {
                for reference in property.value.references_mut() {
                    reference.target = by_name.get(reference.text()).cloned();
                }
            }
            for child in &mut node.children {
                link_node(child, by_name);
            }
        }

        link_node(&mut self.root, &by_name);
    }

    pub fn descendant_count(&self) -> usize {
        let mut count = 0usize;
        self.walk(&mut |_: &SyntaxNode, _: &NodePath| count += 1);
        count
    }
}
