// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Manifest-driven conversion of a syntax tree into a graphical model.
//!
//! Conversion is always full: mappings are cleared and rebuilt, nodes are emitted in pre-order
//! followed by the edges derived from their references, and the revision goes up by one.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::config::ServiceConfig;
use crate::identity::{graphical_constructs, IdentityRegistry, RegistryError};
use crate::manifest::GrammarManifest;
use crate::model::{
    Dimension, ElementId, GEdge, GElement, GLabel, GModelRoot, GNode, NodePath, SyntaxNode,
};
use crate::state::{EdgeOrigin, ModelState};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Non-fatal findings of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionWarning {
    #[error("{element_id}: label property {property} is missing")]
    MissingLabelProperty { element_id: ElementId, property: String },
    #[error("id {requested} is taken; using {assigned}")]
    IdDisambiguated { requested: String, assigned: ElementId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub gmodel: GModelRoot,
    pub node_count: usize,
    pub edge_count: usize,
    pub warnings: Vec<ConversionWarning>,
}

#[derive(Debug, Clone)]
pub struct ModelConverter<'a> {
    manifest: &'a GrammarManifest,
    default_size: Dimension,
    label_type: SmolStr,
}

/// Ids handed out during one conversion pass.
#[derive(Default)]
struct IdAllocator {
    used: BTreeSet<ElementId>,
    type_counters: BTreeMap<SmolStr, usize>,
}

impl IdAllocator {
    /// `base`, or `base1`, `base2`, ... if taken here or ever issued by the registry.
    fn disambiguate(&mut self, base: &str, registry: &IdentityRegistry) -> Option<ElementId> {
        let mut candidate = ElementId::new(base).ok()?;
        let mut suffix = 1usize;
        while self.used.contains(&candidate) || registry.is_issued(&candidate) {
            candidate = ElementId::new(format!("{base}{suffix}")).ok()?;
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        Some(candidate)
    }

    fn next_type_base(&mut self, ast_type: &str) -> String {
        let counter = self.type_counters.entry(SmolStr::new(ast_type)).or_insert(0);
        *counter += 1;
        format!("{ast_type}_{counter}")
    }
}

impl<'a> ModelConverter<'a> {
    pub fn new(manifest: &'a GrammarManifest, config: &ServiceConfig) -> Self {
        Self {
            manifest,
            default_size: config.default_node_size,
            label_type: SmolStr::new(&config.label_type),
        }
    }

    /// Rebuilds the graphical model of `state` from its current tree and installs it.
    ///
    /// Ids come from the registry when it already placed an id at the same path of the same
    /// tree generation; otherwise they are derived from the construct name and registered.
    pub fn convert(
        &self,
        state: &mut ModelState,
        registry: &mut IdentityRegistry,
    ) -> Result<ConversionResult, ConvertError> {
        let uri = state.uri().clone();
        let mut gmodel = GModelRoot::new(state.gmodel().id.clone());
        gmodel.revision = state.gmodel().revision();
        gmodel.bump_revision();

        let mut warnings = Vec::new();
        let mut mappings = Vec::<(ElementId, NodePath)>::new();
        let mut origins = Vec::<(ElementId, EdgeOrigin)>::new();

        if let Some(tree) = state.tree() {
            let generation = tree.generation();
            let metadata = state.metadata();
            let mut alloc = IdAllocator::default();
            let mut ids_by_path = BTreeMap::<NodePath, ElementId>::new();
            let mut converted = Vec::<(&SyntaxNode, NodePath, ElementId)>::new();

            for construct in graphical_constructs(tree, self.manifest) {
                let Some(node) = tree.node_at(&construct.path) else { continue };

                let reused = registry
                    .element_at(&uri, generation, &construct.path)
                    .filter(|id| !alloc.used.contains(*id))
                    .cloned();
                let id = match reused {
                    Some(id) => {
                        alloc.used.insert(id.clone());
                        id
                    }
                    None => {
                        let id = self.derive_node_id(node, &mut alloc, registry, &mut warnings)?;
                        let parent = construct.parent.as_ref().and_then(|p| ids_by_path.get(p)).cloned();
                        registry.register_converted(
                            &uri,
                            id.clone(),
                            construct.fingerprint(parent),
                            generation,
                            construct.path.clone(),
                        )?;
                        id
                    }
                };

                let mapping = self.manifest.node_mapping(node.node_type());
                let label = self.node_label(node, &id, &mut warnings);
                let size = metadata
                    .size(&id)
                    .or_else(|| mapping.and_then(|m| m.default_size))
                    .unwrap_or(self.default_size);

                gmodel.insert_node(GNode {
                    id: id.clone(),
                    element_type: self.manifest.diagram_type_for(node.node_type()),
                    position: metadata.position(&id).unwrap_or_default(),
                    size,
                    collapsed: metadata.is_collapsed(&id),
                    children: vec![GElement::Label(GLabel {
                        id: id.derive("", "_label"),
                        element_type: self.label_type.clone(),
                        text: label,
                    })],
                });

                ids_by_path.insert(construct.path.clone(), id.clone());
                mappings.push((id.clone(), construct.path.clone()));
                converted.push((node, construct.path, id));
            }

            for (node, path, source_id) in &converted {
                for property in node.properties() {
                    for reference in property.value().references() {
                        let Some(target_id) = reference.target().and_then(|t| ids_by_path.get(t)) else {
                            tracing::debug!(
                                source = %source_id,
                                property = property.key(),
                                target = reference.text(),
                                "dropping reference to a construct without a node"
                            );
                            continue;
                        };

                        let base = format!("{source_id}_{}_{target_id}", property.key());
                        let Some(edge_id) = alloc.disambiguate(&base, registry) else {
                            tracing::warn!(base = %base, "reference does not yield a valid edge id");
                            continue;
                        };
                        if edge_id.as_str() != base {
                            warnings.push(ConversionWarning::IdDisambiguated {
                                requested: base,
                                assigned: edge_id.clone(),
                            });
                        }

                        let edge_mapping = self.manifest.edge_mapping(node.node_type(), property.key());
                        let label = edge_mapping
                            .and_then(|m| m.label_property.as_deref())
                            .and_then(|key| node.property(key))
                            .and_then(|p| p.value().display_text());

                        gmodel.push_edge(GEdge {
                            id: edge_id.clone(),
                            element_type: self.manifest.edge_type_for(node.node_type(), property.key()),
                            source_id: source_id.clone(),
                            target_id: target_id.clone(),
                            routing_points: metadata.routing_points(&edge_id).cloned().unwrap_or_default(),
                            children: label
                                .map(|text| {
                                    vec![GElement::Label(GLabel {
                                        id: edge_id.derive("", "_label"),
                                        element_type: self.label_type.clone(),
                                        text,
                                    })]
                                })
                                .unwrap_or_default(),
                        });
                        origins.push((
                            edge_id,
                            EdgeOrigin {
                                source: path.clone(),
                                property: SmolStr::new(property.key()),
                                target_name: reference.text().to_owned(),
                            },
                        ));
                    }
                }
            }
        }

        state.clear_mappings();
        for (id, path) in mappings {
            state.register_mapping(id, path);
        }
        for (id, origin) in origins {
            state.register_edge_origin(id, origin);
        }

        let node_count = gmodel.node_count();
        let edge_count = gmodel.edge_count();
        tracing::debug!(
            uri = %uri,
            revision = gmodel.revision(),
            nodes = node_count,
            edges = edge_count,
            warnings = warnings.len(),
            "converted document"
        );
        state.set_gmodel(gmodel.clone());
        Ok(ConversionResult { gmodel, node_count, edge_count, warnings })
    }

    fn derive_node_id(
        &self,
        node: &SyntaxNode,
        alloc: &mut IdAllocator,
        registry: &mut IdentityRegistry,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Result<ElementId, ConvertError> {
        let base = match node.name() {
            Some(name) => name.to_owned(),
            None => alloc.next_type_base(node.node_type()),
        };
        let id = match alloc.disambiguate(&base, registry) {
            Some(id) => id,
            None => {
                let id = registry.generate_id()?;
                alloc.used.insert(id.clone());
                id
            }
        };
        if id.as_str() != base {
            warnings.push(ConversionWarning::IdDisambiguated { requested: base, assigned: id.clone() });
        }
        Ok(id)
    }

    /// Configured label property, else the name, else the type tag.
    fn node_label(&self, node: &SyntaxNode, id: &ElementId, warnings: &mut Vec<ConversionWarning>) -> String {
        let label_property = self
            .manifest
            .node_mapping(node.node_type())
            .and_then(|m| m.label_property.as_deref());
        if let Some(key) = label_property {
            match node.property(key).and_then(|p| p.value().display_text()) {
                Some(text) => return text,
                None => warnings.push(ConversionWarning::MissingLabelProperty {
                    element_id: id.clone(),
                    property: key.to_owned(),
                }),
            }
        }
        node.name().unwrap_or(node.node_type()).to_owned()
    }
}
