// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use super::{to_text_edits, ConnectPlan, CreatePlan, EditContext, ProviderError, TextEdit, TextEditProvider};
use crate::format::block::{NESTED_CONTAINMENT, ROOT_CONTAINMENT};
use crate::model::{ElementId, NodePath, Property, SourceSpan, SyntaxNode, SyntaxTree, Value};
use crate::state::{ModelState, StateError};

/// Text edits for the block syntax parsed by [`crate::format::BlockParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockTextEditProvider;

impl TextEditProvider for BlockTextEditProvider {
    fn create(
        &self,
        ctx: &EditContext<'_>,
        ast_type: &str,
        container: Option<&ElementId>,
    ) -> Result<CreatePlan, ProviderError> {
        let mapping = ctx
            .manifest
            .node_mapping(ast_type)
            .ok_or_else(|| ProviderError::UnknownType { ast_type: ast_type.to_owned() })?;
        let tree = parsed_tree(ctx.state)?;
        let text = ctx.state.text();

        let name = unique_name(tree, mapping.default_name());
        let rendered = ctx.manifest.render_template(mapping, &name);

        let (replacement, containment) = match container {
            None => {
                let mut insert = String::new();
                if !text.is_empty() && !text.ends_with('\n') {
                    insert.push('\n');
                }
                insert.push_str(&rendered);
                insert.push('\n');
                ((SourceSpan::new(text.len(), text.len()), insert), ROOT_CONTAINMENT)
            }
            Some(id) => {
                let node = ctx
                    .state
                    .ast_node(id)
                    .ok_or_else(|| ProviderError::ContainerNotFound { id: id.clone() })?;
                let replacement = insert_before_close(text, node, &rendered, &ctx.config.indent_unit)
                    .ok_or_else(|| ProviderError::ContainerHasNoBody { id: id.clone() })?;
                (replacement, NESTED_CONTAINMENT)
            }
        };

        Ok(CreatePlan {
            edits: to_text_edits(text, vec![replacement])?,
            name,
            ast_type: SmolStr::new(&mapping.ast_type),
            containment: SmolStr::new_static(containment),
            parent: container.cloned(),
        })
    }

    fn delete(&self, ctx: &EditContext<'_>, targets: &[ElementId]) -> Result<Vec<TextEdit>, ProviderError> {
        let state = ctx.state;
        let tree = parsed_tree(state)?;
        let text = state.text();

        let mut deleted = Vec::<NodePath>::new();
        let mut removals = BTreeMap::<(NodePath, SmolStr), BTreeSet<usize>>::new();
        for id in targets {
            if let Some(path) = state.ast_path(id) {
                deleted.push(path.clone());
                continue;
            }
            let Some(origin) = state.edge_origin(id) else {
                return Err(ProviderError::ElementNotFound { id: id.clone() });
            };
            let index = tree
                .node_at(&origin.source)
                .and_then(|source| source.property(&origin.property))
                .and_then(|property| {
                    property.value().references().iter().position(|r| r.text() == origin.target_name)
                })
                .ok_or_else(|| ProviderError::ReferenceNotFound { id: id.clone() })?;
            removals.entry((origin.source.clone(), origin.property.clone())).or_default().insert(index);
        }

        deleted.sort();
        deleted.dedup();
        let roots = deleted
            .iter()
            .filter(|path| !deleted.iter().any(|other| path.is_descendant_of(other)))
            .cloned()
            .collect::<Vec<_>>();
        let is_deleted = |path: &NodePath| roots.iter().any(|root| path == root || path.is_descendant_of(root));

        tree.walk(&mut |node: &SyntaxNode, path: &NodePath| {
            if is_deleted(path) {
                return;
            }
            for property in node.properties() {
                for (index, reference) in property.value().references().iter().enumerate() {
                    if reference.target().is_some_and(|target| is_deleted(target)) {
                        removals
                            .entry((path.clone(), SmolStr::new(property.key())))
                            .or_default()
                            .insert(index);
                    }
                }
            }
        });

        let mut replacements = Vec::new();
        for root in &roots {
            if let Some(node) = tree.node_at(root) {
                replacements.push((whole_lines(text, node.span()), String::new()));
            }
        }
        for ((path, key), indices) in &removals {
            if is_deleted(path) {
                continue;
            }
            if let Some(property) = tree.node_at(path).and_then(|node| node.property(key)) {
                remove_references(text, property, indices, &mut replacements);
            }
        }

        to_text_edits(text, replacements)
    }

    fn connect(
        &self,
        ctx: &EditContext<'_>,
        source: &ElementId,
        target: &ElementId,
        edge_type: &str,
    ) -> Result<ConnectPlan, ProviderError> {
        let state = ctx.state;
        parsed_tree(state)?;
        let text = state.text();

        let source_node = state
            .ast_node(source)
            .ok_or_else(|| ProviderError::ElementNotFound { id: source.clone() })?;
        let target_node = state
            .ast_node(target)
            .ok_or_else(|| ProviderError::ElementNotFound { id: target.clone() })?;
        let target_name = target_node
            .name()
            .ok_or_else(|| ProviderError::TargetHasNoName { id: target.clone() })?;
        let mapping = ctx
            .manifest
            .edge_mapping_for_type(edge_type, source_node.node_type())
            .ok_or_else(|| ProviderError::UnsupportedEdgeType {
                edge_type: edge_type.to_owned(),
                source_type: source_node.node_type().to_owned(),
            })?;

        let key = mapping.property.as_str();
        let reference = format!("@{target_name}");
        let mut replaced = Vec::new();
        let replacement = match source_node.property(key) {
            Some(property) => match property.value() {
                Value::RefList(references) if mapping.multiple => {
                    let close = property.span().end.saturating_sub(1);
                    let insert = if references.is_empty() { reference } else { format!(", {reference}") };
                    (SourceSpan::new(close, close), insert)
                }
                Value::Ref(existing) if !mapping.multiple => {
                    replaced.push(existing.text().to_owned());
                    (existing.span(), reference)
                }
                value if mapping.multiple => {
                    let mut items = value
                        .references()
                        .iter()
                        .map(|r| format!("@{}", r.text()))
                        .collect::<Vec<_>>();
                    items.push(reference);
                    (property.span(), format!("{key}: [{}]", items.join(", ")))
                }
                value => {
                    replaced.extend(value.references().iter().map(|r| r.text().to_owned()));
                    (property.span(), format!("{key}: {reference}"))
                }
            },
            None => {
                let line = if mapping.multiple {
                    format!("{key}: [{reference}]")
                } else {
                    format!("{key}: {reference}")
                };
                insert_before_close(text, source_node, &line, &ctx.config.indent_unit)
                    .ok_or_else(|| ProviderError::ContainerHasNoBody { id: source.clone() })?
            }
        };

        Ok(ConnectPlan {
            edits: to_text_edits(text, vec![replacement])?,
            property: SmolStr::new(key),
            target_name: target_name.to_owned(),
            replaced,
        })
    }
}

fn parsed_tree(state: &ModelState) -> Result<&SyntaxTree, ProviderError> {
    state
        .tree()
        .ok_or_else(|| StateError::NoParsedContent { uri: state.uri().clone() }.into())
}

/// `base`, else `base1`, `base2`, ... against every construct name in the tree.
fn unique_name(tree: &SyntaxTree, base: &str) -> String {
    let mut names = BTreeSet::new();
    tree.walk(&mut |node: &SyntaxNode, _: &NodePath| {
        if let Some(name) = node.name() {
            names.insert(name.to_owned());
        }
    });

    if !names.contains(base) {
        return base.to_owned();
    }
    (1usize..)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !names.contains(candidate))
        .unwrap_or_else(|| base.to_owned())
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |idx| idx + 1)
}

fn line_indent(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

fn indent_lines(content: &str, indent: &str) -> String {
    content
        .lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("{indent}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Insertion of `content` as the last item of `node`'s body, one level deeper than `node`.
fn insert_before_close(
    text: &str,
    node: &SyntaxNode,
    content: &str,
    indent_unit: &str,
) -> Option<(SourceSpan, String)> {
    let close = node.body()?.end;
    let outer = line_indent(text, node.span().start);
    let block = indent_lines(content, &format!("{outer}{indent_unit}"));

    let close_line = line_start(text, close);
    if text[close_line..close].trim().is_empty() {
        Some((SourceSpan::new(close_line, close_line), format!("{block}\n")))
    } else {
        Some((SourceSpan::new(close, close), format!("\n{block}\n{outer}")))
    }
}

/// Grows `span` to whole lines, terminator included, when nothing else shares them.
fn whole_lines(text: &str, span: SourceSpan) -> SourceSpan {
    let start = line_start(text, span.start);
    let end = text[span.end..].find('\n').map_or(text.len(), |idx| span.end + idx);
    if !text[start..span.start].trim().is_empty() || !text[span.end..end].trim().is_empty() {
        return span;
    }
    SourceSpan::new(start, if end < text.len() { end + 1 } else { end })
}

/// Removes the references at `indices`: the whole property when none would remain, else each
/// run of list items together with one separator.
fn remove_references(
    text: &str,
    property: &Property,
    indices: &BTreeSet<usize>,
    out: &mut Vec<(SourceSpan, String)>,
) {
    let references = property.value().references();
    if references.iter().enumerate().all(|(idx, _)| indices.contains(&idx)) {
        out.push((whole_lines(text, property.span()), String::new()));
        return;
    }

    let mut idx = 0;
    while idx < references.len() {
        if !indices.contains(&idx) {
            idx += 1;
            continue;
        }
        let first = idx;
        while idx + 1 < references.len() && indices.contains(&(idx + 1)) {
            idx += 1;
        }
        let span = if idx + 1 < references.len() {
            SourceSpan::new(references[first].span().start, references[idx + 1].span().start)
        } else {
            SourceSpan::new(references[first - 1].span().end, references[idx].span().end)
        };
        out.push((span, String::new()));
        idx += 1;
    }
}
