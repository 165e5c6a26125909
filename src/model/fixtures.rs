// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::ids::{DocumentUri, ElementId};
use super::syntax::SyntaxTree;
use crate::format::parse_block_document;
use crate::manifest::GrammarManifest;

pub(crate) const GOVERNANCE_MANIFEST: &str = r#"{
    "languageId": "governance",
    "fileExtensions": [".gov"],
    "rootTypes": ["Organization", "Person", "Note", "Element"],
    "nodes": [
        {
            "astType": "Organization",
            "diagramType": "node:organization",
            "labelProperty": "title",
            "defaultSize": { "width": 200.0, "height": 120.0 },
            "childTypes": ["Department"]
        },
        {
            "astType": "Department",
            "diagramType": "node:department",
            "childTypes": ["Person"]
        },
        {
            "astType": "Person",
            "diagramType": "node:person",
            "defaultName": "Person",
            "template": "${type} ${name} {\n    level: 1\n}"
        }
    ],
    "edges": [
        { "sourceType": "Department", "property": "lead", "edgeType": "edge:lead" },
        { "sourceType": "Person", "property": "peers", "edgeType": "edge:peer", "labelProperty": "role", "multiple": true }
    ]
}"#;

pub(crate) const GOVERNANCE_SOURCE: &str = "\
Organization Acme {
    title: \"Acme Corp\"
    Department Sales {
        lead: @Bob
    }
}
Person Bob {
    role: \"peer\"
    peers: [@Alice, @Carol]
}
Person Alice {
}
Person Carol {
}
";

pub(crate) fn governance_manifest() -> GrammarManifest {
    GrammarManifest::from_json_str(GOVERNANCE_MANIFEST).expect("governance manifest")
}

pub(crate) fn parse(text: &str, generation: u64) -> SyntaxTree {
    parse_block_document(text, generation).expect("fixture parses")
}

pub(crate) fn eid(value: &str) -> ElementId {
    ElementId::new(value).expect("element id")
}

pub(crate) fn uri(value: &str) -> DocumentUri {
    DocumentUri::new(value).expect("document uri")
}
