// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Dimension, LABEL_TYPE};

pub const DEFAULT_NODE_WIDTH: f64 = 120.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 60.0;
pub const DEFAULT_INDENT: &str = "    ";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("default node size must be positive, got {width}x{height}")]
    InvalidNodeSize { width: f64, height: f64 },
    #[error("indent unit must be spaces or tabs")]
    InvalidIndent,
}

/// Service-wide settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Size of nodes whose type has no configured default and no stored size.
    pub default_node_size: Dimension,
    pub label_type: String,
    /// Indentation added per nesting level when text is synthesized.
    pub indent_unit: String,
    /// Drop layout of ids retired by reconciliation.
    pub drop_retired_metadata: bool,
    /// Check graph invariants after every executed operation.
    pub verify_invariants: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_node_size: Dimension::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
            label_type: LABEL_TYPE.to_owned(),
            indent_unit: DEFAULT_INDENT.to_owned(),
            drop_retired_metadata: true,
            verify_invariants: true,
        }
    }
}

impl ServiceConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_json_str(&input)
    }

    pub fn with_default_node_size(mut self, size: Dimension) -> Self {
        self.default_node_size = size;
        self
    }

    pub fn with_indent_unit(mut self, indent: impl Into<String>) -> Self {
        self.indent_unit = indent.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Dimension { width, height } = self.default_node_size;
        if !(width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidNodeSize { width, height });
        }
        if !self.indent_unit.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ConfigError::InvalidIndent);
        }
        Ok(())
    }
}
