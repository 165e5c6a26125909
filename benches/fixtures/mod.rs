// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::fmt::Write as _;

use duplex::identity::CancellationToken;
use duplex::model::{DocumentUri, GModelRoot};
use duplex::{DiagramService, GrammarManifest, ServiceConfig};

pub const MANIFEST: &str = r#"{
    "languageId": "arch",
    "fileExtensions": [".arch"],
    "rootTypes": ["System", "Component"],
    "nodes": [
        { "astType": "System", "diagramType": "node:system", "childTypes": ["Component"] },
        { "astType": "Component", "diagramType": "node:component", "defaultName": "Component" }
    ],
    "edges": [
        { "sourceType": "Component", "property": "calls", "edgeType": "edge:call", "multiple": true }
    ]
}"#;

pub const URI: &str = "file:///bench.arch";

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    fn shape(self) -> (usize, usize) {
        match self {
            Self::Small => (2, 5),
            Self::Medium => (10, 20),
            Self::Large => (40, 50),
        }
    }

    /// Constructs in the generated document (systems plus components).
    pub fn constructs(self) -> u64 {
        let (systems, components) = self.shape();
        (systems * (components + 1)) as u64
    }
}

/// `System S{n}` blocks, each holding components that call their next two siblings.
pub fn source(case: Case) -> String {
    let (systems, components) = case.shape();
    let mut out = String::new();
    for s in 0..systems {
        let _ = writeln!(out, "System S{s} {{");
        for c in 0..components {
            let _ = writeln!(out, "    Component S{s}C{c} {{");
            let targets = [(c + 1) % components, (c + 2) % components]
                .iter()
                .map(|t| format!("@S{s}C{t}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "        calls: [{targets}]");
            let _ = writeln!(out, "    }}");
        }
        let _ = writeln!(out, "}}");
    }
    out
}

/// Same shape as [`source`] with every component of the first system renamed and a comment
/// inserted at the top.
pub fn edited_source(case: Case) -> String {
    let renamed = source(case).replace("S0C", "S0K");
    format!("// edited\n{renamed}")
}

pub fn manifest() -> GrammarManifest {
    GrammarManifest::from_json_str(MANIFEST).expect("bench manifest")
}

pub fn uri() -> DocumentUri {
    DocumentUri::new(URI).expect("bench uri")
}

pub fn service() -> DiagramService {
    DiagramService::new(manifest(), ServiceConfig::default()).expect("bench service")
}

pub fn opened(case: Case) -> DiagramService {
    let mut service = service();
    service.open_document(uri(), &source(case), 1).expect("open bench document");
    service
}

pub fn update(service: &mut DiagramService, text: &str) -> usize {
    let version = service.document(&uri()).map_or(1, |state| state.version()) + 1;
    let update = service
        .update_document(&uri(), text, version, &CancellationToken::new())
        .expect("update bench document");
    update.retired.len() + update.assigned.len()
}

pub fn checksum_gmodel(gmodel: &GModelRoot) -> u64 {
    let mut acc = gmodel.revision();
    for node in gmodel.nodes() {
        acc = acc.wrapping_mul(31).wrapping_add(node.id.as_str().len() as u64);
    }
    for edge in gmodel.edges() {
        acc = acc.wrapping_mul(17).wrapping_add(edge.id.as_str().len() as u64);
    }
    acc
}
