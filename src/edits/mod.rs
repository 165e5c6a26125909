// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Graphical edits expressed as text edits.
//!
//! Providers compute edits from the current (pre-edit) tree and model; they never touch the
//! graphical model. The caller applies the edits to the buffer and the next reparse reconciles.

mod block;

pub use block::BlockTextEditProvider;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::config::ServiceConfig;
use crate::format::{LineIndex, TextRange};
use crate::manifest::GrammarManifest;
use crate::model::{ElementId, SourceSpan};
use crate::state::{ModelState, StateError};

/// An LSP-shaped text edit against the document text the provider saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: TextRange, new_text: impl Into<String>) -> Self {
        Self { range, new_text: new_text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("type {ast_type} is not declared by the manifest")]
    UnknownType { ast_type: String },
    #[error("container {id} does not exist")]
    ContainerNotFound { id: ElementId },
    #[error("container {id} has no body to insert into")]
    ContainerHasNoBody { id: ElementId },
    #[error("element {id} is not backed by a parsed construct")]
    ElementNotFound { id: ElementId },
    #[error("connection target {id} has no name to reference")]
    TargetHasNoName { id: ElementId },
    #[error("edge type {edge_type} is not supported from {source_type}")]
    UnsupportedEdgeType { edge_type: String, source_type: String },
    #[error("reference behind edge {id} not found")]
    ReferenceNotFound { id: ElementId },
    #[error("text edit range {range:?} is outside the document")]
    InvalidRange { range: TextRange },
    #[error("text edits overlap")]
    OverlappingEdits,
}

/// Everything a provider may read.
#[derive(Debug, Clone, Copy)]
pub struct EditContext<'a> {
    pub state: &'a ModelState,
    pub manifest: &'a GrammarManifest,
    pub config: &'a ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlan {
    pub edits: Vec<TextEdit>,
    /// Human-readable name written into the text; unique among construct names.
    pub name: String,
    pub ast_type: SmolStr,
    pub containment: SmolStr,
    pub parent: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPlan {
    pub edits: Vec<TextEdit>,
    pub property: SmolStr,
    pub target_name: String,
    /// Reference texts the edit overwrites; a single-valued property loses its old target.
    pub replaced: Vec<String>,
}

/// Language-specific translation of graphical edits into text edits.
pub trait TextEditProvider {
    fn create(
        &self,
        ctx: &EditContext<'_>,
        ast_type: &str,
        container: Option<&ElementId>,
    ) -> Result<CreatePlan, ProviderError>;

    /// Removes the constructs behind `targets` and every reference that would dangle.
    fn delete(&self, ctx: &EditContext<'_>, targets: &[ElementId]) -> Result<Vec<TextEdit>, ProviderError>;

    fn connect(
        &self,
        ctx: &EditContext<'_>,
        source: &ElementId,
        target: &ElementId,
        edge_type: &str,
    ) -> Result<ConnectPlan, ProviderError>;

    /// Layout lives in metadata only, so moves need no text by default.
    fn move_element(&self, _ctx: &EditContext<'_>, _id: &ElementId) -> Result<Vec<TextEdit>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Turns byte-range replacements into sorted, non-overlapping LSP edits.
pub(crate) fn to_text_edits(
    text: &str,
    mut replacements: Vec<(SourceSpan, String)>,
) -> Result<Vec<TextEdit>, ProviderError> {
    replacements.sort_by(|a, b| a.0.cmp(&b.0));
    replacements.dedup();
    for pair in replacements.windows(2) {
        if pair[0].0.end > pair[1].0.start {
            return Err(ProviderError::OverlappingEdits);
        }
    }

    let index = LineIndex::new(text);
    Ok(replacements
        .into_iter()
        .map(|(span, new_text)| TextEdit::new(index.range(text, span), new_text))
        .collect())
}

/// Applies edits computed against `text`. Edits must not overlap.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> Result<String, ProviderError> {
    let index = LineIndex::new(text);
    let mut spans = Vec::with_capacity(edits.len());
    for edit in edits {
        let start = index.offset(text, edit.range.start);
        let end = index.offset(text, edit.range.end);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => spans.push((start, end, edit.new_text.as_str())),
            _ => return Err(ProviderError::InvalidRange { range: edit.range }),
        }
    }
    spans.sort_by_key(|(start, end, _)| (*start, *end));
    for pair in spans.windows(2) {
        if pair[0].1 > pair[1].0 {
            return Err(ProviderError::OverlappingEdits);
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, new_text) in spans {
        out.push_str(&text[cursor..start]);
        out.push_str(new_text);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{apply_text_edits, to_text_edits, ProviderError, TextEdit};
    use crate::format::{Position, TextRange};
    use crate::model::SourceSpan;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> TextRange {
        TextRange::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[test]
    fn applies_edits_in_any_order() {
        let text = "alpha\nbeta\ngamma\n";
        let edits = vec![
            TextEdit::new(range(2, 0, 2, 5), "GAMMA"),
            TextEdit::new(range(0, 0, 1, 0), ""),
            TextEdit::new(range(3, 0, 3, 0), "delta\n"),
        ];
        assert_eq!(apply_text_edits(text, &edits).expect("apply"), "beta\nGAMMA\ndelta\n");
    }

    #[test]
    fn rejects_overlaps_and_bad_ranges() {
        let text = "abc\n";
        let overlapping = vec![TextEdit::new(range(0, 0, 0, 2), ""), TextEdit::new(range(0, 1, 0, 3), "")];
        assert_eq!(apply_text_edits(text, &overlapping), Err(ProviderError::OverlappingEdits));

        let outside = vec![TextEdit::new(range(5, 0, 5, 1), "")];
        assert!(matches!(apply_text_edits(text, &outside), Err(ProviderError::InvalidRange { .. })));
    }

    #[test]
    fn byte_replacements_become_sorted_lsp_edits() {
        let text = "ab\ncd\n";
        let edits = to_text_edits(
            text,
            vec![(SourceSpan::new(3, 4), "X".to_owned()), (SourceSpan::new(0, 1), String::new())],
        )
        .expect("edits");
        assert_eq!(edits[0].range, range(0, 0, 0, 1));
        assert_eq!(edits[1].range, range(1, 0, 1, 1));
        assert_eq!(apply_text_edits(text, &edits).expect("apply"), "b\nXd\n");

        let json = serde_json::to_value(&edits[1]).expect("json");
        assert_eq!(json["newText"], "X");
        assert_eq!(json["range"]["start"]["line"], 1);
    }
}
