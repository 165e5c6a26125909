// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Element identity registry.
//!
//! Keeps opaque element ids stable across reparses by matching structural fingerprints. The
//! fingerprint table is partitioned per document; the set of ids ever issued is shared, so an id
//! never collides across documents and is never handed out twice.

mod fingerprint;
mod generator;

pub use fingerprint::{graphical_constructs, Fingerprint, GraphicalConstruct};
pub use generator::{CancellationToken, IdGenerator, SequentialIdGenerator, UuidGenerator};

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::manifest::GrammarManifest;
use crate::model::{DocumentUri, ElementId, IdError, NodePath, SyntaxTree};

const MAX_GENERATION_ATTEMPTS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("element id {id} is already registered")]
    AlreadyRegistered { id: ElementId },
    #[error("reconciliation cancelled")]
    Cancelled,
    #[error("id generator produced an invalid id: {0}")]
    InvalidGeneratedId(#[from] IdError),
    #[error("id generator kept producing issued ids")]
    GeneratorExhausted,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Old id -> new id for every id that survived; currently always the identity.
    pub remap: BTreeMap<ElementId, ElementId>,
    pub retired: BTreeSet<ElementId>,
    pub assigned: BTreeSet<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    fingerprint: Fingerprint,
    path: Option<NodePath>,
}

#[derive(Debug, Clone, Default)]
struct Partition {
    entries: BTreeMap<ElementId, Entry>,
    /// Tree generation the recorded paths belong to.
    generation: Option<u64>,
    by_path: BTreeMap<NodePath, ElementId>,
}

impl Partition {
    fn enter_generation(&mut self, generation: u64) {
        if self.generation == Some(generation) {
            return;
        }
        self.generation = Some(generation);
        self.by_path.clear();
        for entry in self.entries.values_mut() {
            entry.path = None;
        }
    }
}

type GroupKey = (Option<ElementId>, SmolStr, SmolStr);

#[derive(Debug)]
pub struct IdentityRegistry {
    partitions: BTreeMap<DocumentUri, Partition>,
    issued: BTreeSet<ElementId>,
    generator: Box<dyn IdGenerator>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new(Box::new(UuidGenerator))
    }
}

impl IdentityRegistry {
    pub fn new(generator: Box<dyn IdGenerator>) -> Self {
        Self { partitions: BTreeMap::new(), issued: BTreeSet::new(), generator }
    }

    /// A fresh id that has never been issued. Not registered until [`Self::register_new_uuid`].
    pub fn generate_id(&mut self) -> Result<ElementId, RegistryError> {
        fresh_id(self.generator.as_mut(), &self.issued, &BTreeSet::new())
    }

    /// Records the fingerprint of a newly created element.
    pub fn register_new_uuid(
        &mut self,
        uri: &DocumentUri,
        id: ElementId,
        fingerprint: Fingerprint,
    ) -> Result<(), RegistryError> {
        self.insert(uri, id, fingerprint, None)
    }

    /// Records an element produced by converting `generation` of a document's tree.
    pub fn register_converted(
        &mut self,
        uri: &DocumentUri,
        id: ElementId,
        fingerprint: Fingerprint,
        generation: u64,
        path: NodePath,
    ) -> Result<(), RegistryError> {
        self.insert(uri, id, fingerprint, Some((generation, path)))
    }

    fn insert(
        &mut self,
        uri: &DocumentUri,
        id: ElementId,
        fingerprint: Fingerprint,
        placement: Option<(u64, NodePath)>,
    ) -> Result<(), RegistryError> {
        if self.issued.contains(&id) {
            return Err(RegistryError::AlreadyRegistered { id });
        }

        let partition = self.partitions.entry(uri.clone()).or_default();
        let path = match placement {
            Some((generation, path)) => {
                partition.enter_generation(generation);
                partition.by_path.insert(path.clone(), id.clone());
                Some(path)
            }
            None => None,
        };
        partition.entries.insert(id.clone(), Entry { fingerprint, path });
        self.issued.insert(id);
        Ok(())
    }

    /// Re-associates the document's ids with the constructs of `tree`.
    ///
    /// Groups of siblings sharing `(parent, containment, ast type)` are matched level by level,
    /// parents first: by unique name, then by sibling index. Matched ids keep their value,
    /// leftover old ids are retired and leftover constructs get fresh ids. Nothing is committed
    /// if `cancel` fires before the pass completes.
    pub fn reconcile(
        &mut self,
        uri: &DocumentUri,
        tree: &SyntaxTree,
        manifest: &GrammarManifest,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, RegistryError> {
        let constructs = graphical_constructs(tree, manifest);

        let empty = BTreeMap::new();
        let old_entries = self.partitions.get(uri).map_or(&empty, |p| &p.entries);
        let mut old_groups = BTreeMap::<GroupKey, Vec<(&ElementId, &Fingerprint)>>::new();
        for (id, entry) in old_entries {
            let fp = &entry.fingerprint;
            old_groups
                .entry((fp.parent.clone(), fp.containment.clone(), fp.ast_type.clone()))
                .or_default()
                .push((id, fp));
        }
        for group in old_groups.values_mut() {
            group.sort_by(|a, b| a.1.sibling_index.cmp(&b.1.sibling_index).then_with(|| a.0.cmp(b.0)));
        }

        let mut levels = BTreeMap::<usize, BTreeMap<(Option<&NodePath>, &str, &str), Vec<usize>>>::new();
        for (idx, construct) in constructs.iter().enumerate() {
            levels
                .entry(construct.level)
                .or_default()
                .entry((
                    construct.parent.as_ref(),
                    construct.containment.as_str(),
                    construct.ast_type.as_str(),
                ))
                .or_default()
                .push(idx);
        }

        let mut assigned_ids = vec![None::<ElementId>; constructs.len()];
        let mut by_path = BTreeMap::<NodePath, ElementId>::new();
        let mut matched = BTreeSet::<ElementId>::new();
        let mut fresh = BTreeSet::<ElementId>::new();

        for groups in levels.values() {
            for ((parent_path, containment, ast_type), members) in groups {
                if cancel.is_cancelled() {
                    return Err(RegistryError::Cancelled);
                }

                let parent_id = match parent_path {
                    None => Some(None),
                    Some(path) => by_path.get(*path).cloned().map(Some),
                };
                let candidates: &[(&ElementId, &Fingerprint)] = match &parent_id {
                    Some(parent) => old_groups
                        .get(&(parent.clone(), SmolStr::new(*containment), SmolStr::new(*ast_type)))
                        .map(Vec::as_slice)
                        .unwrap_or_default(),
                    None => &[],
                };

                let mut name_counts = BTreeMap::<&str, usize>::new();
                for &idx in members {
                    if let Some(name) = constructs[idx].name.as_deref() {
                        *name_counts.entry(name).or_insert(0) += 1;
                    }
                }

                for &idx in members {
                    let Some(name) = constructs[idx].name.as_deref() else { continue };
                    if name_counts.get(name) != Some(&1) {
                        continue;
                    }
                    let mut hits = candidates
                        .iter()
                        .filter(|(id, fp)| fp.name.as_deref() == Some(name) && !matched.contains(*id));
                    if let (Some((id, _)), None) = (hits.next(), hits.next()) {
                        matched.insert((*id).clone());
                        assigned_ids[idx] = Some((*id).clone());
                    }
                }

                for &idx in members {
                    if assigned_ids[idx].is_some() {
                        continue;
                    }
                    let sibling_index = constructs[idx].sibling_index;
                    if let Some((id, _)) = candidates
                        .iter()
                        .find(|(id, fp)| fp.sibling_index == sibling_index && !matched.contains(*id))
                    {
                        matched.insert((*id).clone());
                        assigned_ids[idx] = Some((*id).clone());
                    }
                }

                for &idx in members {
                    let id = match &assigned_ids[idx] {
                        Some(id) => id.clone(),
                        None => {
                            let id = fresh_id(self.generator.as_mut(), &self.issued, &fresh)?;
                            fresh.insert(id.clone());
                            assigned_ids[idx] = Some(id.clone());
                            id
                        }
                    };
                    by_path.insert(constructs[idx].path.clone(), id);
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }

        let mut entries = BTreeMap::new();
        for (construct, id) in constructs.iter().zip(assigned_ids) {
            let Some(id) = id else { continue };
            let parent = construct.parent.as_ref().and_then(|p| by_path.get(p)).cloned();
            entries.insert(
                id,
                Entry { fingerprint: construct.fingerprint(parent), path: Some(construct.path.clone()) },
            );
        }

        let retired = old_entries
            .keys()
            .filter(|id| !matched.contains(*id))
            .cloned()
            .collect::<BTreeSet<_>>();
        let outcome = ReconcileOutcome {
            remap: matched.iter().map(|id| (id.clone(), id.clone())).collect(),
            retired,
            assigned: fresh,
        };

        let partition = self.partitions.entry(uri.clone()).or_default();
        partition.entries = entries;
        partition.by_path = by_path;
        partition.generation = Some(tree.generation());
        self.issued.extend(outcome.assigned.iter().cloned());

        tracing::debug!(
            uri = %uri,
            generation = tree.generation(),
            matched = outcome.remap.len(),
            retired = outcome.retired.len(),
            assigned = outcome.assigned.len(),
            "reconciled element identities"
        );
        Ok(outcome)
    }

    /// Id assigned to the construct at `path` in tree `generation`, if any.
    pub fn element_at(&self, uri: &DocumentUri, generation: u64, path: &NodePath) -> Option<&ElementId> {
        let partition = self.partitions.get(uri)?;
        if partition.generation != Some(generation) {
            return None;
        }
        partition.by_path.get(path)
    }

    pub fn path_of(&self, uri: &DocumentUri, id: &ElementId) -> Option<&NodePath> {
        self.partitions.get(uri)?.entries.get(id)?.path.as_ref()
    }

    pub fn fingerprint(&self, uri: &DocumentUri, id: &ElementId) -> Option<&Fingerprint> {
        self.partitions.get(uri)?.entries.get(id).map(|e| &e.fingerprint)
    }

    pub fn is_live(&self, uri: &DocumentUri, id: &ElementId) -> bool {
        self.partitions.get(uri).is_some_and(|p| p.entries.contains_key(id))
    }

    /// Whether `id` was ever issued, in any document.
    pub fn is_issued(&self, id: &ElementId) -> bool {
        self.issued.contains(id)
    }

    pub fn live_ids(&self, uri: &DocumentUri) -> Vec<&ElementId> {
        self.partitions.get(uri).map(|p| p.entries.keys().collect()).unwrap_or_default()
    }

    /// Live ids whose fingerprint names `parent` and `containment` with `ast_type`.
    pub fn sibling_count(
        &self,
        uri: &DocumentUri,
        parent: Option<&ElementId>,
        containment: &str,
        ast_type: &str,
    ) -> usize {
        self.partitions.get(uri).map_or(0, |p| {
            p.entries
                .values()
                .filter(|e| {
                    e.fingerprint.parent.as_ref() == parent
                        && e.fingerprint.containment == containment
                        && e.fingerprint.ast_type == ast_type
                })
                .count()
        })
    }

    /// Drops a document's partition. Its ids stay issued.
    pub fn forget(&mut self, uri: &DocumentUri) {
        self.partitions.remove(uri);
    }
}

fn fresh_id(
    generator: &mut dyn IdGenerator,
    issued: &BTreeSet<ElementId>,
    pending: &BTreeSet<ElementId>,
) -> Result<ElementId, RegistryError> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let id = generator.next_id()?;
        if !issued.contains(&id) && !pending.contains(&id) {
            return Ok(id);
        }
    }
    Err(RegistryError::GeneratorExhausted)
}

#[cfg(test)]
mod tests;
