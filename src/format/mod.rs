// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Source text handling: the parser seam, the bundled block syntax, and text coordinates.

pub mod block;
pub mod line_index;

pub use block::{parse_block_document, BlockParseError, BlockParser};
pub use line_index::{LineIndex, Position, TextRange};

use crate::model::{SourceSpan, SyntaxTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub message: String,
    pub span: SourceSpan,
}

/// Result of one parse. `tree` is `None` when the text could not be parsed at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutcome {
    pub tree: Option<SyntaxTree>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Produces linked syntax trees from source text.
pub trait SyntaxParser {
    fn parse(&self, text: &str, generation: u64) -> ParseOutcome;
}
