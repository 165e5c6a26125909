// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The diagram service: one model state per open document, one identity registry and one
//! manifest per language.
//!
//! Text changes flow in through [`DiagramService::update_document`] (parse, reconcile,
//! convert). Graphical changes flow in through [`DiagramService::execute_operation`], which
//! mutates the graphical model right away and hands back the text edits for the caller to apply.

pub mod types;
mod validate;

pub use validate::{Marker, MarkerSeverity, ValidationReport};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::{ConfigError, ServiceConfig};
use crate::convert::{ConversionWarning, ConvertError, ModelConverter};
use crate::edits::{self, BlockTextEditProvider, ProviderError, TextEdit, TextEditProvider};
use crate::format::{BlockParser, SyntaxParser};
use crate::identity::{CancellationToken, IdGenerator, IdentityRegistry, RegistryError};
use crate::manifest::GrammarManifest;
use crate::model::{DocumentUri, ElementId, GModelRoot, InvariantViolation, ModelMetadata};
use crate::ops::{
    Applied, Operation, OperationContext, OperationError, OperationHandler, OperationHandlers, OperationKind,
};
use crate::state::ModelState;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("document {uri} is not open")]
    UnknownDocument { uri: DocumentUri },
    #[error("document {uri} is already open")]
    AlreadyOpen { uri: DocumentUri },
    #[error("update of {uri} was cancelled")]
    Cancelled { uri: DocumentUri },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    TextEdits(#[from] ProviderError),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(#[from] InvariantViolation),
}

/// Outcome of one graphical operation. Precondition failures are results, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub success: bool,
    pub kind: OperationKind,
    pub element_id: Option<ElementId>,
    pub text_edits: Vec<TextEdit>,
    pub error: Option<String>,
    /// What to reverse on undo; `None` for failures.
    pub applied: Option<Applied>,
}

impl OperationResult {
    pub fn failure(kind: OperationKind, error: impl Into<String>) -> Self {
        Self { success: false, kind, element_id: None, text_edits: Vec::new(), error: Some(error.into()), applied: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub gmodel: GModelRoot,
    pub metadata: ModelMetadata,
}

/// Summary of one text synchronization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentUpdate {
    pub version: u64,
    /// `false` when the text did not parse; the last graphical model was kept.
    pub parsed: bool,
    pub retired: BTreeSet<ElementId>,
    pub assigned: BTreeSet<ElementId>,
    pub warnings: Vec<ConversionWarning>,
}

pub struct DiagramService {
    manifest: Arc<GrammarManifest>,
    config: ServiceConfig,
    parser: Box<dyn SyntaxParser + Send + Sync>,
    provider: Box<dyn TextEditProvider + Send + Sync>,
    handlers: OperationHandlers,
    registry: IdentityRegistry,
    documents: BTreeMap<DocumentUri, ModelState>,
    next_generation: u64,
}

impl std::fmt::Debug for DiagramService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramService")
            .field("language_id", &self.manifest.language_id)
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl DiagramService {
    /// A service for the block syntax with UUID identifiers.
    pub fn new(manifest: impl Into<Arc<GrammarManifest>>, config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            manifest: manifest.into(),
            config,
            parser: Box::new(BlockParser),
            provider: Box::new(BlockTextEditProvider),
            handlers: OperationHandlers::default(),
            registry: IdentityRegistry::default(),
            documents: BTreeMap::new(),
            next_generation: 0,
        })
    }

    pub fn with_parser(mut self, parser: Box<dyn SyntaxParser + Send + Sync>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_provider(mut self, provider: Box<dyn TextEditProvider + Send + Sync>) -> Self {
        self.provider = provider;
        self
    }

    /// Replaces the registry; only meaningful before any document is opened.
    pub fn with_id_generator(mut self, generator: Box<dyn IdGenerator>) -> Self {
        self.registry = IdentityRegistry::new(generator);
        self
    }

    pub fn with_handler(mut self, handler: Box<dyn OperationHandler + Send + Sync>) -> Self {
        self.handlers.register(handler);
        self
    }

    pub fn manifest(&self) -> &GrammarManifest {
        &self.manifest
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn document(&self, uri: &DocumentUri) -> Option<&ModelState> {
        self.documents.get(uri)
    }

    fn document_mut(&mut self, uri: &DocumentUri) -> Result<&mut ModelState, ServiceError> {
        self.documents.get_mut(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })
    }

    fn generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Parses and converts a newly opened document. Node ids derive from construct names.
    pub fn open_document(
        &mut self,
        uri: DocumentUri,
        text: impl Into<String>,
        version: u64,
    ) -> Result<DocumentUpdate, ServiceError> {
        if self.documents.contains_key(&uri) {
            return Err(ServiceError::AlreadyOpen { uri });
        }
        let text = text.into();
        let generation = self.generation();
        let outcome = self.parser.parse(&text, generation);
        let parsed = outcome.tree.is_some();
        if !parsed {
            tracing::warn!(uri = %uri, diagnostics = outcome.diagnostics.len(), "document opened without a parse tree");
        }

        let mut state = ModelState::new(uri.clone(), text, version);
        state.set_parse_result(outcome.tree, outcome.diagnostics);
        let conversion = ModelConverter::new(&self.manifest, &self.config).convert(&mut state, &mut self.registry)?;
        state.mark_clean();

        let assigned = self.registry.live_ids(&uri).into_iter().cloned().collect();
        self.documents.insert(uri, state);
        Ok(DocumentUpdate { version, parsed, retired: BTreeSet::new(), assigned, warnings: conversion.warnings })
    }

    /// Replaces the text: reparse, reconcile identities, reconvert.
    ///
    /// Unparsable text keeps the last graphical model and skips reconciliation. A cancelled
    /// reconciliation leaves the document and the registry exactly as they were.
    pub fn update_document(
        &mut self,
        uri: &DocumentUri,
        text: impl Into<String>,
        version: u64,
        cancel: &CancellationToken,
    ) -> Result<DocumentUpdate, ServiceError> {
        if !self.documents.contains_key(uri) {
            return Err(ServiceError::UnknownDocument { uri: uri.clone() });
        }
        let text = text.into();
        let generation = self.generation();
        let outcome = self.parser.parse(&text, generation);

        let Some(tree) = outcome.tree else {
            tracing::warn!(
                uri = %uri,
                version,
                diagnostics = outcome.diagnostics.len(),
                "parse failed; keeping the last graphical model"
            );
            let state = self.document_mut(uri)?;
            state.set_text(text, version);
            state.set_parse_result(None, outcome.diagnostics);
            return Ok(DocumentUpdate { version, ..DocumentUpdate::default() });
        };

        let reconciled = match self.registry.reconcile(uri, &tree, &self.manifest, cancel) {
            Ok(reconciled) => reconciled,
            Err(RegistryError::Cancelled) => return Err(ServiceError::Cancelled { uri: uri.clone() }),
            Err(err) => return Err(err.into()),
        };

        let state = self.documents.get_mut(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        state.set_text(text, version);
        state.set_parse_result(Some(tree), outcome.diagnostics);
        let conversion = ModelConverter::new(&self.manifest, &self.config).convert(state, &mut self.registry)?;

        if self.config.drop_retired_metadata && !reconciled.retired.is_empty() {
            let dropped = state.drop_metadata(&reconciled.retired);
            if dropped > 0 {
                tracing::warn!(uri = %uri, dropped, "dropped layout of retired elements");
            }
        }

        Ok(DocumentUpdate {
            version,
            parsed: true,
            retired: reconciled.retired,
            assigned: reconciled.assigned,
            warnings: conversion.warnings,
        })
    }

    /// Applies edits to the current text and synchronizes the result as `version`.
    pub fn apply_text_edits(
        &mut self,
        uri: &DocumentUri,
        edits: &[TextEdit],
        version: u64,
        cancel: &CancellationToken,
    ) -> Result<DocumentUpdate, ServiceError> {
        let current = self.documents.get(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        let text = edits::apply_text_edits(current.text(), edits)?;
        self.update_document(uri, text, version, cancel)
    }

    /// Closes a document and drops its identity partition. Its ids stay retired.
    pub fn close_document(&mut self, uri: &DocumentUri) -> Option<ModelState> {
        self.registry.forget(uri);
        self.documents.remove(uri)
    }

    pub fn load_model(&self, uri: &DocumentUri) -> Result<LoadedModel, ServiceError> {
        let state = self.documents.get(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        Ok(LoadedModel { gmodel: state.gmodel().clone(), metadata: state.metadata().clone() })
    }

    /// Installs persisted layout and refreshes the graphical model with it.
    pub fn restore_metadata(&mut self, uri: &DocumentUri, metadata: ModelMetadata) -> Result<(), ServiceError> {
        let state = self.documents.get_mut(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        state.set_metadata(metadata);
        ModelConverter::new(&self.manifest, &self.config).convert(state, &mut self.registry)?;
        Ok(())
    }

    pub fn can_execute(&mut self, uri: &DocumentUri, op: &Operation) -> Result<bool, ServiceError> {
        let state = self.documents.get_mut(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        let ctx = OperationContext {
            state,
            registry: &mut self.registry,
            manifest: &self.manifest,
            config: &self.config,
            provider: self.provider.as_ref(),
        };
        Ok(self.handlers.can_execute(&ctx, op))
    }

    pub fn execute_operation(&mut self, uri: &DocumentUri, op: &Operation) -> Result<OperationResult, ServiceError> {
        self.execute(uri, None, op)
    }

    /// Like [`Self::execute_operation`], but fails if the document is no longer at `base_version`.
    pub fn execute_operation_at(
        &mut self,
        uri: &DocumentUri,
        base_version: u64,
        op: &Operation,
    ) -> Result<OperationResult, ServiceError> {
        self.execute(uri, Some(base_version), op)
    }

    fn execute(
        &mut self,
        uri: &DocumentUri,
        base_version: Option<u64>,
        op: &Operation,
    ) -> Result<OperationResult, ServiceError> {
        let state = self.documents.get_mut(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        if let Some(expected) = base_version {
            let current = state.version();
            if current != expected {
                let err = OperationError::StaleVersion { expected, current };
                tracing::debug!(uri = %uri, kind = %op.kind(), error = %err, "operation rejected");
                return Ok(OperationResult::failure(op.kind(), err.to_string()));
            }
        }

        let mut ctx = OperationContext {
            state,
            registry: &mut self.registry,
            manifest: &self.manifest,
            config: &self.config,
            provider: self.provider.as_ref(),
        };
        let execution = match self.handlers.execute(&mut ctx, op) {
            Ok(execution) => execution,
            Err(OperationError::Registry(err)) => return Err(err.into()),
            Err(err) => {
                tracing::debug!(uri = %uri, kind = %op.kind(), error = %err, "operation rejected");
                return Ok(OperationResult::failure(op.kind(), err.to_string()));
            }
        };

        if self.config.verify_invariants {
            if let Err(violation) = ctx.state.gmodel().check_invariants() {
                tracing::error!(uri = %uri, kind = %execution.kind, error = %violation, "operation broke the graphical model");
                self.handlers.undo(&mut ctx, &execution.applied);
                return Err(violation.into());
            }
        }

        Ok(OperationResult {
            success: true,
            kind: execution.kind,
            element_id: execution.element_id,
            text_edits: execution.text_edits,
            error: None,
            applied: Some(execution.applied),
        })
    }

    /// Reverses the in-memory effect of a successful result. `false` if there is nothing to undo.
    ///
    /// With `verify_invariants` on, an undo that leaves the model inconsistent is an error.
    pub fn undo(&mut self, uri: &DocumentUri, result: &OperationResult) -> Result<bool, ServiceError> {
        let Some(applied) = result.applied.as_ref().filter(|_| result.success) else {
            return Ok(false);
        };
        let state = self.documents.get_mut(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        let mut ctx = OperationContext {
            state,
            registry: &mut self.registry,
            manifest: &self.manifest,
            config: &self.config,
            provider: self.provider.as_ref(),
        };
        let undone = self.handlers.undo(&mut ctx, applied);

        if undone && self.config.verify_invariants {
            if let Err(violation) = ctx.state.gmodel().check_invariants() {
                tracing::error!(uri = %uri, kind = %applied.kind(), error = %violation, "undo broke the graphical model");
                return Err(violation.into());
            }
        }
        Ok(undone)
    }

    pub fn validate(&self, uri: &DocumentUri, cancel: &CancellationToken) -> Result<ValidationReport, ServiceError> {
        let state = self.documents.get(uri).ok_or_else(|| ServiceError::UnknownDocument { uri: uri.clone() })?;
        validate::validate_document(state, &self.manifest, cancel).ok_or_else(|| ServiceError::Cancelled { uri: uri.clone() })
    }
}
