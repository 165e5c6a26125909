// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

use std::sync::Once;

use duplex::edits::TextEdit;
use duplex::identity::{CancellationToken, SequentialIdGenerator};
use duplex::model::{DocumentUri, ElementId, Point};
use duplex::{DiagramService, GrammarManifest, Operation, OperationResult, ServiceConfig};
use tracing_subscriber::EnvFilter;

pub const ARCH_MANIFEST: &str = r#"{
    "languageId": "arch",
    "fileExtensions": [".arch"],
    "rootTypes": ["System", "Component", "Element"],
    "nodes": [
        { "astType": "System", "diagramType": "node:system", "defaultSize": { "width": 300.0, "height": 200.0 }, "childTypes": ["Component"] },
        { "astType": "Component", "diagramType": "node:component", "defaultName": "Component" }
    ],
    "edges": [
        { "sourceType": "Component", "property": "calls", "edgeType": "edge:call", "multiple": true }
    ]
}"#;

pub const ARCH_SOURCE: &str = "\
System Shop {
    Component Cart {
        calls: [@Billing]
    }
}
Component Billing {
    calls: [@Ledger]
}
Component Ledger {
}
";

pub const DOC: &str = "file:///shop.arch";

static TRACING: Once = Once::new();

/// Installs a test subscriber once; `RUST_LOG=duplex=debug` shows sync summaries.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn manifest() -> GrammarManifest {
    GrammarManifest::from_json_str(ARCH_MANIFEST).expect("manifest")
}

pub fn doc() -> DocumentUri {
    DocumentUri::new(DOC).expect("uri")
}

pub fn eid(value: &str) -> ElementId {
    ElementId::new(value).expect("element id")
}

/// A service with deterministic ids (`uuid-1`, `uuid-2`, ...) and `text` open as [`DOC`].
pub fn open(text: &str) -> DiagramService {
    init_tracing();
    let mut service = DiagramService::new(manifest(), ServiceConfig::default())
        .expect("service")
        .with_id_generator(Box::new(SequentialIdGenerator::default()));
    service.open_document(doc(), text, 1).expect("open");
    service
}

pub fn version(service: &DiagramService) -> u64 {
    service.document(&doc()).expect("open document").version()
}

pub fn text(service: &DiagramService) -> String {
    service.document(&doc()).expect("open document").text().to_owned()
}

/// Applies the edits like an editor would and synchronizes the reparse.
pub fn sync(service: &mut DiagramService, edits: &[TextEdit]) {
    let next = version(service) + 1;
    service
        .apply_text_edits(&doc(), edits, next, &CancellationToken::new())
        .expect("sync");
}

pub fn replace_text(service: &mut DiagramService, text: &str) {
    let next = version(service) + 1;
    service
        .update_document(&doc(), text, next, &CancellationToken::new())
        .expect("update");
}

/// Executes `op` and, when it succeeds, applies its text edits.
pub fn execute(service: &mut DiagramService, op: &Operation) -> OperationResult {
    let result = service.execute_operation(&doc(), op).expect("execute");
    if result.success {
        sync(service, &result.text_edits);
    }
    result
}

pub fn create(element_type: &str) -> Operation {
    Operation::Create {
        element_type_id: element_type.into(),
        container_id: None,
        location: Some(Point::new(0.0, 0.0)),
        size: None,
    }
}

pub fn node_ids(service: &DiagramService) -> Vec<String> {
    let model = service.load_model(&doc()).expect("model");
    model.gmodel.nodes().iter().map(|n| n.id.to_string()).collect()
}

pub fn edge_ids(service: &DiagramService) -> Vec<String> {
    let model = service.load_model(&doc()).expect("model");
    model.gmodel.edges().iter().map(|e| e.id.to_string()).collect()
}
