// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use rstest::{fixture, rstest};
use smol_str::SmolStr;

use super::{
    CancellationToken, Fingerprint, IdentityRegistry, RegistryError, SequentialIdGenerator,
};
use crate::manifest::GrammarManifest;
use crate::model::fixtures::{eid, governance_manifest, parse, uri};
use crate::model::{DocumentUri, ElementId, NodePath};

#[fixture]
fn registry() -> IdentityRegistry {
    IdentityRegistry::new(Box::new(SequentialIdGenerator::default()))
}

#[fixture]
fn manifest() -> GrammarManifest {
    governance_manifest()
}

#[fixture]
fn doc() -> DocumentUri {
    uri("file:///org.gov")
}

fn top(index: usize) -> NodePath {
    NodePath::root().child("elements", index)
}

fn reconcile(
    registry: &mut IdentityRegistry,
    doc: &DocumentUri,
    manifest: &GrammarManifest,
    text: &str,
    generation: u64,
) -> super::ReconcileOutcome {
    registry
        .reconcile(doc, &parse(text, generation), manifest, &CancellationToken::new())
        .expect("reconcile")
}

fn id_at(registry: &IdentityRegistry, doc: &DocumentUri, generation: u64, path: &NodePath) -> ElementId {
    registry.element_at(doc, generation, path).cloned().expect("assigned id")
}

#[rstest]
fn first_pass_assigns_fresh_ids(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    let outcome = reconcile(&mut registry, &doc, &manifest, "Person Ann {}\nPerson Bea {}\n", 1);

    assert!(outcome.remap.is_empty());
    assert!(outcome.retired.is_empty());
    assert_eq!(outcome.assigned, BTreeSet::from([eid("uuid-1"), eid("uuid-2")]));
    assert_eq!(id_at(&registry, &doc, 1, &top(0)), eid("uuid-1"));
    assert_eq!(id_at(&registry, &doc, 1, &top(1)), eid("uuid-2"));
    assert!(registry.element_at(&doc, 0, &top(0)).is_none());
}

#[rstest]
fn unrelated_edits_keep_ids(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    reconcile(&mut registry, &doc, &manifest, "Person Ann {}\nPerson Bea {}\n", 1);
    let outcome = reconcile(
        &mut registry,
        &doc,
        &manifest,
        "// staff\nPerson Ann { level: 2 }\nPerson Bee {}\n",
        2,
    );

    assert_eq!(outcome.remap.len(), 2);
    assert!(outcome.retired.is_empty());
    assert!(outcome.assigned.is_empty());
    assert_eq!(id_at(&registry, &doc, 2, &top(0)), eid("uuid-1"));
    // Renamed in place: matched by sibling index.
    assert_eq!(id_at(&registry, &doc, 2, &top(1)), eid("uuid-2"));
    assert_eq!(
        registry.fingerprint(&doc, &eid("uuid-2")).and_then(|fp| fp.name.as_deref()),
        Some("Bee")
    );
}

#[rstest]
fn reorder_matches_by_name(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    reconcile(&mut registry, &doc, &manifest, "Person Ann {}\nPerson Bea {}\n", 1);
    reconcile(&mut registry, &doc, &manifest, "Person Bea {}\nPerson Ann {}\n", 2);

    assert_eq!(id_at(&registry, &doc, 2, &top(0)), eid("uuid-2"));
    assert_eq!(id_at(&registry, &doc, 2, &top(1)), eid("uuid-1"));
}

#[rstest]
fn rename_and_reorder_in_one_edit_is_deterministic(manifest: GrammarManifest, doc: DocumentUri) {
    let run = || {
        let mut registry = IdentityRegistry::new(Box::new(SequentialIdGenerator::default()));
        reconcile(&mut registry, &doc, &manifest, "Person Ann {}\nPerson Bea {}\n", 1);
        let outcome = reconcile(&mut registry, &doc, &manifest, "Person Bea {}\nPerson Zed {}\n", 2);
        let ids = (id_at(&registry, &doc, 2, &top(0)), id_at(&registry, &doc, 2, &top(1)));
        (outcome, ids)
    };

    let (first, first_ids) = run();
    let (second, second_ids) = run();
    assert_eq!(first, second);
    assert_eq!(first_ids, second_ids);

    // Bea keeps its id by name. Ann's old index is taken, so the renamed construct is new.
    assert_eq!(first_ids.0, eid("uuid-2"));
    assert_eq!(first_ids.1, eid("uuid-3"));
    assert_eq!(first.retired, BTreeSet::from([eid("uuid-1")]));
}

#[rstest]
fn ambiguous_names_fall_back_to_sibling_index(
    mut registry: IdentityRegistry,
    manifest: GrammarManifest,
    doc: DocumentUri,
) {
    reconcile(&mut registry, &doc, &manifest, "Person Twin {}\nPerson Twin {}\n", 1);
    reconcile(&mut registry, &doc, &manifest, "Person Twin { level: 1 }\nPerson Twin {}\n", 2);

    assert_eq!(id_at(&registry, &doc, 2, &top(0)), eid("uuid-1"));
    assert_eq!(id_at(&registry, &doc, 2, &top(1)), eid("uuid-2"));
}

#[rstest]
fn children_follow_their_parent_id(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    let before = "Organization Acme {\n    Department Sales {}\n    Department Ops {}\n}\n";
    let after = "Organization Acme2 {\n    Department Ops {}\n    Department Sales {}\n}\n";
    reconcile(&mut registry, &doc, &manifest, before, 1);
    let sales = id_at(&registry, &doc, 1, &top(0).child("children", 0));
    let org = id_at(&registry, &doc, 1, &top(0));

    let outcome = reconcile(&mut registry, &doc, &manifest, after, 2);
    assert!(outcome.assigned.is_empty());
    assert_eq!(id_at(&registry, &doc, 2, &top(0)), org);
    assert_eq!(id_at(&registry, &doc, 2, &top(0).child("children", 1)), sales);
    assert_eq!(registry.fingerprint(&doc, &sales).and_then(|fp| fp.parent.clone()), Some(org));
}

#[rstest]
fn retired_ids_are_never_reissued(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    reconcile(&mut registry, &doc, &manifest, "Person Ann {}\n", 1);
    let outcome = reconcile(&mut registry, &doc, &manifest, "Organization Acme {}\n", 2);
    assert_eq!(outcome.retired, BTreeSet::from([eid("uuid-1")]));
    assert!(!registry.is_live(&doc, &eid("uuid-1")));
    assert!(registry.is_issued(&eid("uuid-1")));

    let err = registry
        .register_new_uuid(&doc, eid("uuid-1"), fingerprint("Person", "Ann", 0))
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
    assert_eq!(registry.generate_id().expect("id"), eid("uuid-3"));
}

#[rstest]
fn cancelled_pass_commits_nothing(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    reconcile(&mut registry, &doc, &manifest, "Person Ann {}\n", 1);

    let token = CancellationToken::new();
    token.cancel();
    let err = registry
        .reconcile(&doc, &parse("Person Bea {}\nPerson Cid {}\n", 2), &manifest, &token)
        .unwrap_err();

    assert!(matches!(err, RegistryError::Cancelled));
    assert_eq!(registry.live_ids(&doc), vec![&eid("uuid-1")]);
    assert_eq!(id_at(&registry, &doc, 1, &top(0)), eid("uuid-1"));
    assert!(!registry.is_issued(&eid("uuid-2")));
}

#[rstest]
fn pending_registration_is_claimed_by_name(
    mut registry: IdentityRegistry,
    manifest: GrammarManifest,
    doc: DocumentUri,
) {
    reconcile(&mut registry, &doc, &manifest, "Person Ann {}\n", 1);
    let created = registry.generate_id().expect("id");
    registry
        .register_new_uuid(&doc, created.clone(), fingerprint("Person", "Person", 1))
        .expect("register");
    assert_eq!(registry.sibling_count(&doc, None, "elements", "Person"), 2);

    reconcile(&mut registry, &doc, &manifest, "Person Person {}\nPerson Ann {}\n", 2);
    assert_eq!(id_at(&registry, &doc, 2, &top(0)), created);
    assert_eq!(id_at(&registry, &doc, 2, &top(1)), eid("uuid-1"));
}

#[rstest]
fn partitions_are_independent(mut registry: IdentityRegistry, manifest: GrammarManifest, doc: DocumentUri) {
    let other = uri("file:///other.gov");
    reconcile(&mut registry, &doc, &manifest, "Person Ann {}\n", 1);
    reconcile(&mut registry, &other, &manifest, "Person Ann {}\n", 1);

    assert_eq!(id_at(&registry, &doc, 1, &top(0)), eid("uuid-1"));
    assert_eq!(id_at(&registry, &other, 1, &top(0)), eid("uuid-2"));

    registry.forget(&other);
    assert!(registry.live_ids(&other).is_empty());
    assert!(registry.is_issued(&eid("uuid-2")));
    assert_eq!(registry.live_ids(&doc).len(), 1);
}

fn fingerprint(ast_type: &str, name: &str, sibling_index: usize) -> Fingerprint {
    Fingerprint {
        ast_type: SmolStr::new(ast_type),
        parent: None,
        containment: SmolStr::new("elements"),
        name: Some(name.to_owned()),
        sibling_index,
    }
}
