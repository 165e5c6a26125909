// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Duplex: bidirectional text/diagram synchronization core.
//!
//! A document's source text is parsed into a syntax tree, converted into a graphical model
//! using a per-language grammar manifest, and kept in sync in both directions: text edits are
//! reconciled against stable element ids, and graphical operations are turned into text edits.

pub mod config;
pub mod convert;
pub mod edits;
pub mod format;
pub mod identity;
pub mod manifest;
pub mod model;
pub mod ops;
pub mod service;
pub mod state;

pub use config::ServiceConfig;
pub use manifest::GrammarManifest;
pub use ops::Operation;
pub use service::{DiagramService, OperationResult, ServiceError, ValidationReport};
