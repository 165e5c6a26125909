// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

mod common;

use std::collections::BTreeSet;

use duplex::identity::CancellationToken;
use duplex::model::{DocumentUri, ModelMetadata, Point};
use duplex::service::types::{ExecuteOperationParams, LoadModelResponse, OperationResponse, WireOperation};
use duplex::Operation;
use smallvec::smallvec;

use common::{
    create, doc, edge_ids, eid, execute, node_ids, open, replace_text, text, ARCH_SOURCE,
};

#[test]
fn reconversion_without_reparse_keeps_every_id() {
    let mut service = open(ARCH_SOURCE);
    let first = service.load_model(&doc()).expect("model").gmodel;

    service.restore_metadata(&doc(), ModelMetadata::default()).expect("reconvert");
    let second = service.load_model(&doc()).expect("model").gmodel;

    assert_eq!(node_ids(&service), ["Shop", "Cart", "Billing", "Ledger"]);
    assert_eq!(first.children, second.children);
    assert!(second.revision() > first.revision());
}

#[test]
fn reparse_of_unchanged_text_keeps_every_id() {
    let mut service = open(ARCH_SOURCE);
    let nodes = node_ids(&service);
    let edges = edge_ids(&service);

    replace_text(&mut service, ARCH_SOURCE);

    assert_eq!(node_ids(&service), nodes);
    assert_eq!(edges, ["Cart_calls_Billing", "Billing_calls_Ledger"]);
    assert_eq!(edge_ids(&service), edges);
}

#[test]
fn unrelated_edits_keep_id_and_position() {
    let mut service = open(ARCH_SOURCE);
    let op = Operation::Move { element_id: eid("Ledger"), position: Point::new(10.0, 20.0), size: None };
    assert!(execute(&mut service, &op).success);

    let edited = ARCH_SOURCE
        .replace("Billing", "Payments")
        .replace("Component Ledger {", "// books\nComponent Ledger {");
    replace_text(&mut service, &edited);

    let state = service.document(&doc()).expect("open");
    assert_eq!(state.position(&eid("Ledger")), Some(Point::new(10.0, 20.0)));
    let ledger = state.find_element(&eid("Ledger")).and_then(|e| e.as_node()).expect("ledger");
    assert_eq!(ledger.position, Point::new(10.0, 20.0));
    assert_eq!(node_ids(&service), ["Shop", "Cart", "Billing", "Ledger"]);
    let payments = state.ast_node(&eid("Billing")).expect("renamed construct");
    assert_eq!(payments.name(), Some("Payments"));
}

#[test]
fn deleting_a_node_cascades_to_its_edges() {
    let mut service = open(ARCH_SOURCE);
    let a = execute(&mut service, &create("node:component")).element_id.expect("a");
    let b = execute(&mut service, &create("node:component")).element_id.expect("b");
    let connect = Operation::Connect {
        edge_type_id: "edge:call".into(),
        source_id: a.clone(),
        target_id: b.clone(),
        routing_points: smallvec![],
    };
    let edge = execute(&mut service, &connect).element_id.expect("edge");
    assert!(text(&service).contains("Component Component {\n    calls: [@Component1]\n}"));

    let result = execute(&mut service, &Operation::Delete { element_ids: vec![a.clone()] });
    assert!(result.success);

    let model = service.load_model(&doc()).expect("model").gmodel;
    assert!(!model.contains(&a));
    assert!(!model.contains(&edge));
    assert!(model.is_node(&b));
    assert!(model.check_invariants().is_ok());
    assert!(!text(&service).contains("@Component1"));
}

#[test]
fn undo_of_create_nets_out_node_count() {
    let mut service = open(ARCH_SOURCE);
    let before = service.load_model(&doc()).expect("model").gmodel;

    let result = service.execute_operation(&doc(), &create("node:component")).expect("execute");
    assert!(result.success);
    assert_eq!(service.load_model(&doc()).expect("model").gmodel.node_count(), before.node_count() + 1);

    assert!(service.undo(&doc(), &result).expect("undo"));
    let after = service.load_model(&doc()).expect("model").gmodel;
    assert_eq!(after.node_count(), before.node_count());
    assert_eq!(after.edge_count(), before.edge_count());
    assert!(after.revision() > before.revision());

    assert!(!service.undo(&doc(), &result).expect("second undo"));
}

#[test]
fn default_names_collide_but_ids_do_not() {
    let mut service = open(ARCH_SOURCE);
    let first = execute(&mut service, &create("node:element"));
    let second = execute(&mut service, &create("node:element"));

    assert_eq!(first.element_id, Some(eid("uuid-1")));
    assert_eq!(second.element_id, Some(eid("uuid-2")));
    assert!(text(&service).ends_with("Element Element {\n}\nElement Element1 {\n}\n"));

    let state = service.document(&doc()).expect("open");
    assert_eq!(state.ast_node(&eid("uuid-1")).and_then(|n| n.name()), Some("Element"));
    assert_eq!(state.ast_node(&eid("uuid-2")).and_then(|n| n.name()), Some("Element1"));
}

#[test]
fn unsupported_types_are_rejected() {
    let mut service = open(ARCH_SOURCE);
    let before = service.load_model(&doc()).expect("model").gmodel;
    let op = create("node:database");

    assert!(!service.can_execute(&doc(), &op).expect("can execute"));
    let result = service.execute_operation(&doc(), &op).expect("execute");
    assert!(!result.success);
    assert!(result.error.as_deref().is_some_and(|e| e.contains("node:database")));
    assert_eq!(service.load_model(&doc()).expect("model").gmodel, before);
}

#[test]
fn rename_with_reorder_keeps_the_named_survivor() {
    let mut service = open("Component Ann {\n}\nComponent Bea {\n}\n");
    let update = service
        .update_document(&doc(), "Component Bea {\n}\nComponent Zed {\n}\n", 2, &CancellationToken::new())
        .expect("update");

    assert_eq!(update.retired, BTreeSet::from([eid("Ann")]));
    assert_eq!(update.assigned, BTreeSet::from([eid("uuid-1")]));
    assert_eq!(node_ids(&service), ["Bea", "uuid-1"]);
    let state = service.document(&doc()).expect("open");
    assert_eq!(state.ast_node(&eid("uuid-1")).and_then(|n| n.name()), Some("Zed"));
}

#[test]
fn wire_round_trip_through_the_service() {
    let mut service = open(ARCH_SOURCE);
    let wire: WireOperation = serde_json::from_str(
        r#"{ "kind": "move", "elementId": "Cart", "position": { "x": 4.0, "y": 2.0 } }"#,
    )
    .expect("wire");
    let op = Operation::try_from(wire).expect("operation");
    let result = service.execute_operation(&doc(), &op).expect("execute");
    let response = serde_json::to_value(OperationResponse::from(&result)).expect("response");
    assert_eq!(response, serde_json::json!({ "success": true, "elementId": "Cart" }));

    let loaded = service.load_model(&doc()).expect("model");
    let response = LoadModelResponse::try_from(&loaded).expect("load response");
    assert_eq!(response.metadata["positions"]["Cart"]["x"], 4.0);
    assert_eq!(response.g_model["type"], "graph");
    assert_eq!(response.g_model["children"][1]["id"], "Cart");
}

#[test]
fn execute_params_carry_the_base_version() {
    let mut service = open(ARCH_SOURCE);
    let params: ExecuteOperationParams = serde_json::from_value(serde_json::json!({
        "uri": "file:///shop.arch",
        "operation": { "kind": "delete", "elementIds": ["Ledger"] },
        "baseVersion": 7
    }))
    .expect("params");

    let uri = DocumentUri::new(params.uri.as_str()).expect("uri");
    let op = Operation::try_from(params.operation).expect("operation");
    let base_version = params.base_version.expect("base version");
    let stale = service.execute_operation_at(&uri, base_version, &op).expect("execute");
    assert!(!stale.success);

    let result = service.execute_operation_at(&uri, 1, &op).expect("execute");
    assert!(result.success);
    assert!(!result.text_edits.is_empty());
}

#[test]
fn undoing_a_create_drops_edges_attached_since() {
    let mut service = open(ARCH_SOURCE);
    let created = execute(&mut service, &create("node:component"));
    let node = created.element_id.clone().expect("node");
    let connect = Operation::Connect {
        edge_type_id: "edge:call".into(),
        source_id: eid("Billing"),
        target_id: node.clone(),
        routing_points: smallvec![],
    };
    let edge = execute(&mut service, &connect).element_id.expect("edge");

    assert!(service.undo(&doc(), &created).expect("undo"));
    let model = service.load_model(&doc()).expect("model").gmodel;
    assert!(!model.contains(&node));
    assert!(!model.contains(&edge));
    assert!(model.check_invariants().is_ok());
}

#[test]
fn undoing_a_delete_is_refused_once_a_neighbour_is_gone() {
    let mut service = open(ARCH_SOURCE);
    let first = execute(&mut service, &Operation::Delete { element_ids: vec![eid("Billing")] });
    assert!(first.success);
    assert!(execute(&mut service, &Operation::Delete { element_ids: vec![eid("Ledger")] }).success);

    let before = service.load_model(&doc()).expect("model").gmodel;
    assert!(!service.undo(&doc(), &first).expect("undo"));
    assert_eq!(service.load_model(&doc()).expect("model").gmodel, before);
}
