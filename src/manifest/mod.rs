// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Grammar manifests: per-language, read-only mapping data between syntax types and
//! diagram types.
//!
//! Behaviour varies per language only through lookups into this data. Builtin defaults
//! (`node:element`, `edge:reference`) are always available behind the manifest entries.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::model::{Dimension, SyntaxNode};

pub const DEFAULT_NODE_TYPE: &str = "node:element";
pub const DEFAULT_NODE_AST_TYPE: &str = "Element";
pub const DEFAULT_EDGE_TYPE: &str = "edge:reference";
pub const DEFAULT_EDGE_PROPERTY: &str = "references";
pub const DEFAULT_TEMPLATE: &str = "${type} ${name} {\n}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMapping {
    pub ast_type: String,
    #[serde(default)]
    pub diagram_type: Option<String>,
    #[serde(default)]
    pub label_property: Option<String>,
    #[serde(default)]
    pub default_size: Option<Dimension>,
    /// Construct types that may be created inside this one. Empty allows any.
    #[serde(default)]
    pub child_types: Vec<String>,
    #[serde(default)]
    pub default_name: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
}

impl NodeMapping {
    pub fn new(ast_type: impl Into<String>) -> Self {
        Self {
            ast_type: ast_type.into(),
            diagram_type: None,
            label_property: None,
            default_size: None,
            child_types: Vec::new(),
            default_name: None,
            template: None,
        }
    }

    pub fn diagram_type(&self) -> SmolStr {
        match &self.diagram_type {
            Some(diagram_type) => SmolStr::new(diagram_type),
            None => SmolStr::new(format!("node:{}", self.ast_type.to_lowercase())),
        }
    }

    /// Base for generated construct names.
    pub fn default_name(&self) -> &str {
        self.default_name.as_deref().unwrap_or(&self.ast_type)
    }

    pub fn allows_child(&self, child_ast_type: &str) -> bool {
        self.child_types.is_empty() || self.child_types.iter().any(|t| t == child_ast_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMapping {
    /// Construct type owning the reference property. `None` applies to any type.
    #[serde(default)]
    pub source_type: Option<String>,
    pub property: String,
    #[serde(default)]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub label_property: Option<String>,
    /// Whether the property holds a reference list.
    #[serde(default)]
    pub multiple: bool,
}

impl EdgeMapping {
    pub fn edge_type(&self) -> SmolStr {
        SmolStr::new(self.edge_type.as_deref().unwrap_or(DEFAULT_EDGE_TYPE))
    }

    fn applies_to(&self, source_type: &str) -> bool {
        self.source_type.as_deref().map_or(true, |t| t == source_type)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest must declare a languageId")]
    MissingLanguageId,
    #[error("AST type {ast_type} is mapped more than once")]
    DuplicateAstType { ast_type: String },
    #[error("diagram type {diagram_type} is mapped more than once")]
    DuplicateDiagramType { diagram_type: String },
    #[error("edge mapping for property {property} must not be empty")]
    EmptyEdgeProperty { property: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarManifest {
    pub language_id: String,
    #[serde(default)]
    pub file_extensions: Vec<String>,
    /// Construct types allowed at document level. Empty allows any.
    #[serde(default)]
    pub root_types: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeMapping>,
    #[serde(default)]
    pub edges: Vec<EdgeMapping>,
}

fn builtin_nodes() -> &'static [NodeMapping] {
    static NODES: OnceLock<Vec<NodeMapping>> = OnceLock::new();
    NODES.get_or_init(|| {
        vec![NodeMapping {
            diagram_type: Some(DEFAULT_NODE_TYPE.to_owned()),
            default_name: Some(DEFAULT_NODE_AST_TYPE.to_owned()),
            ..NodeMapping::new(DEFAULT_NODE_AST_TYPE)
        }]
    })
}

fn builtin_edges() -> &'static [EdgeMapping] {
    static EDGES: OnceLock<Vec<EdgeMapping>> = OnceLock::new();
    EDGES.get_or_init(|| {
        vec![EdgeMapping {
            source_type: None,
            property: DEFAULT_EDGE_PROPERTY.to_owned(),
            edge_type: Some(DEFAULT_EDGE_TYPE.to_owned()),
            label_property: None,
            multiple: true,
        }]
    })
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([A-Za-z_]+)\}").expect("static placeholder regex"))
}

impl GrammarManifest {
    pub fn new(language_id: impl Into<String>) -> Self {
        Self { language_id: language_id.into(), ..Self::default() }
    }

    pub fn from_json_str(input: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(input)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let input = std::fs::read_to_string(path)
            .map_err(|source| ManifestError::Io { path: path.display().to_string(), source })?;
        Self::from_json_str(&input)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.language_id.trim().is_empty() {
            return Err(ManifestError::MissingLanguageId);
        }

        let mut ast_types = BTreeSet::new();
        let mut diagram_types = BTreeSet::new();
        for mapping in &self.nodes {
            if !ast_types.insert(mapping.ast_type.as_str()) {
                return Err(ManifestError::DuplicateAstType { ast_type: mapping.ast_type.clone() });
            }
            if !diagram_types.insert(mapping.diagram_type()) {
                return Err(ManifestError::DuplicateDiagramType {
                    diagram_type: mapping.diagram_type().to_string(),
                });
            }
        }
        for mapping in &self.edges {
            if mapping.property.trim().is_empty() {
                return Err(ManifestError::EmptyEdgeProperty { property: mapping.property.clone() });
            }
        }
        Ok(())
    }

    fn all_nodes(&self) -> impl Iterator<Item = &NodeMapping> {
        self.nodes.iter().chain(builtin_nodes())
    }

    fn all_edges(&self) -> impl Iterator<Item = &EdgeMapping> {
        self.edges.iter().chain(builtin_edges())
    }

    pub fn node_mapping(&self, ast_type: &str) -> Option<&NodeMapping> {
        self.all_nodes().find(|m| m.ast_type == ast_type)
    }

    pub fn node_mapping_for_diagram_type(&self, diagram_type: &str) -> Option<&NodeMapping> {
        self.all_nodes().find(|m| m.diagram_type() == diagram_type)
    }

    pub fn supports_node_type(&self, diagram_type: &str) -> bool {
        self.node_mapping_for_diagram_type(diagram_type).is_some()
    }

    /// Diagram type for a construct; unmapped named constructs get `node:<type>`.
    pub fn diagram_type_for(&self, ast_type: &str) -> SmolStr {
        match self.node_mapping(ast_type) {
            Some(mapping) => mapping.diagram_type(),
            None => SmolStr::new(format!("node:{}", ast_type.to_lowercase())),
        }
    }

    /// Whether a construct is represented in the graphical model.
    pub fn is_graphical(&self, node: &SyntaxNode) -> bool {
        !node.node_type().is_empty()
            && (self.node_mapping(node.node_type()).is_some() || node.name().is_some())
    }

    pub fn edge_mapping(&self, source_type: &str, property: &str) -> Option<&EdgeMapping> {
        self.all_edges()
            .filter(|m| m.property == property)
            .find(|m| m.source_type.as_deref() == Some(source_type))
            .or_else(|| {
                self.all_edges()
                    .find(|m| m.property == property && m.source_type.is_none())
            })
    }

    /// Mapping used to create an edge of `edge_type` from a construct of `source_type`.
    pub fn edge_mapping_for_type(&self, edge_type: &str, source_type: &str) -> Option<&EdgeMapping> {
        self.all_edges().find(|m| m.edge_type() == edge_type && m.applies_to(source_type))
    }

    pub fn supports_edge_type(&self, edge_type: &str) -> bool {
        self.all_edges().any(|m| m.edge_type() == edge_type)
    }

    pub fn edge_type_for(&self, source_type: &str, property: &str) -> SmolStr {
        self.edge_mapping(source_type, property)
            .map_or_else(|| SmolStr::new_static(DEFAULT_EDGE_TYPE), EdgeMapping::edge_type)
    }

    pub fn allows_root(&self, ast_type: &str) -> bool {
        self.root_types.is_empty() || self.root_types.iter().any(|t| t == ast_type)
    }

    /// Source text for a new construct; `${type}` and `${name}` are substituted.
    pub fn render_template(&self, mapping: &NodeMapping, name: &str) -> String {
        let template = mapping.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        placeholder_regex()
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "type" => mapping.ast_type.clone(),
                "name" => name.to_owned(),
                _ => caps[0].to_owned(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{GrammarManifest, ManifestError, DEFAULT_EDGE_TYPE, DEFAULT_NODE_TYPE};
    use crate::model::fixtures::governance_manifest;
    use crate::model::{Dimension, SyntaxNode};

    #[test]
    fn loads_camel_case_json() {
        let manifest = governance_manifest();
        let org = manifest.node_mapping("Organization").expect("organization mapping");
        assert_eq!(org.diagram_type(), "node:organization");
        assert_eq!(org.label_property.as_deref(), Some("title"));
        assert_eq!(org.default_size, Some(Dimension::new(200.0, 120.0)));
        assert!(org.allows_child("Department"));
        assert!(!org.allows_child("Person"));
    }

    #[test]
    fn builtin_defaults_back_every_manifest() {
        let manifest = GrammarManifest::new("empty");
        assert!(manifest.supports_node_type(DEFAULT_NODE_TYPE));
        assert!(manifest.supports_edge_type(DEFAULT_EDGE_TYPE));
        assert_eq!(manifest.edge_type_for("Anything", "references"), DEFAULT_EDGE_TYPE);
        assert!(!manifest.supports_node_type("node:unknown"));
        assert_eq!(manifest.diagram_type_for("Widget"), "node:widget");
    }

    #[test]
    fn source_specific_edge_mappings_win() {
        let manifest = governance_manifest();
        assert_eq!(manifest.edge_type_for("Department", "lead"), "edge:lead");
        assert_eq!(manifest.edge_type_for("Person", "peers"), "edge:peer");
        assert!(manifest.edge_mapping_for_type("edge:lead", "Person").is_none());
        assert!(manifest.edge_mapping_for_type("edge:lead", "Department").is_some());
    }

    #[test]
    fn graphical_filter_needs_mapping_or_name() {
        let manifest = governance_manifest();
        assert!(manifest.is_graphical(&SyntaxNode::new("Person", None)));
        assert!(manifest.is_graphical(&SyntaxNode::new("Note", Some("n".to_owned()))));
        assert!(!manifest.is_graphical(&SyntaxNode::new("Note", None)));
        assert!(!manifest.is_graphical(&SyntaxNode::new("", Some("x".to_owned()))));
    }

    #[test]
    fn templates_substitute_known_placeholders() {
        let manifest = governance_manifest();
        let person = manifest.node_mapping("Person").expect("person");
        assert_eq!(manifest.render_template(person, "Person1"), "Person Person1 {\n    level: 1\n}");

        let element = manifest.node_mapping("Element").expect("builtin element");
        assert_eq!(manifest.render_template(element, "Element"), "Element Element {\n}");
    }

    #[test]
    fn rejects_duplicate_ast_types() {
        let err = GrammarManifest::from_json_str(
            r#"{ "languageId": "x", "nodes": [ { "astType": "A" }, { "astType": "A" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateAstType { .. }));

        let err = GrammarManifest::from_json_str(r#"{ "languageId": " " }"#).unwrap_err();
        assert!(matches!(err, ManifestError::MissingLanguageId));
    }
}
