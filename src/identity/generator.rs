// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::model::{ElementId, IdError};

/// Source of fresh opaque element ids.
pub trait IdGenerator: fmt::Debug + Send {
    fn next_id(&mut self) -> Result<ElementId, IdError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> Result<ElementId, IdError> {
        ElementId::new(Uuid::new_v4().to_string())
    }
}

/// Deterministic ids (`<prefix><n>`) for tests and benches.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: 1 }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("uuid-")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> Result<ElementId, IdError> {
        let id = ElementId::new(format!("{}{}", self.prefix, self.next))?;
        self.next += 1;
        Ok(id)
    }
}

/// Cooperative cancellation flag shared between a caller and a long-running pass.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
