// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::gmodel::{Dimension, Point, RoutingPoints};
use super::ids::ElementId;

/// Per-document layout state keyed by stable element id.
///
/// Persisted next to the source text; never derived from it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default)]
    positions: BTreeMap<ElementId, Point>,
    #[serde(default)]
    sizes: BTreeMap<ElementId, Dimension>,
    #[serde(default)]
    routing_points: BTreeMap<ElementId, RoutingPoints>,
    #[serde(default)]
    collapsed: BTreeSet<ElementId>,
}

/// Everything metadata holds for one element; used to drop and later restore it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementMetadata {
    pub position: Option<Point>,
    pub size: Option<Dimension>,
    pub routing_points: Option<RoutingPoints>,
    pub collapsed: bool,
}

impl ModelMetadata {
    pub fn position(&self, id: &ElementId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn size(&self, id: &ElementId) -> Option<Dimension> {
        self.sizes.get(id).copied()
    }

    pub fn routing_points(&self, id: &ElementId) -> Option<&RoutingPoints> {
        self.routing_points.get(id)
    }

    pub fn is_collapsed(&self, id: &ElementId) -> bool {
        self.collapsed.contains(id)
    }

    pub(crate) fn set_position(&mut self, id: ElementId, position: Point) {
        self.positions.insert(id, position);
    }

    pub(crate) fn set_size(&mut self, id: ElementId, size: Dimension) {
        self.sizes.insert(id, size);
    }

    pub(crate) fn set_routing_points(&mut self, id: ElementId, points: RoutingPoints) {
        if points.is_empty() {
            self.routing_points.remove(&id);
        } else {
            self.routing_points.insert(id, points);
        }
    }

    pub(crate) fn set_collapsed(&mut self, id: ElementId, collapsed: bool) {
        if collapsed {
            self.collapsed.insert(id);
        } else {
            self.collapsed.remove(&id);
        }
    }

    pub fn entry(&self, id: &ElementId) -> ElementMetadata {
        ElementMetadata {
            position: self.position(id),
            size: self.size(id),
            routing_points: self.routing_points(id).cloned(),
            collapsed: self.is_collapsed(id),
        }
    }

    pub(crate) fn take(&mut self, id: &ElementId) -> ElementMetadata {
        ElementMetadata {
            position: self.positions.remove(id),
            size: self.sizes.remove(id),
            routing_points: self.routing_points.remove(id),
            collapsed: self.collapsed.remove(id),
        }
    }

    pub(crate) fn put(&mut self, id: &ElementId, entry: ElementMetadata) {
        if let Some(position) = entry.position {
            self.positions.insert(id.clone(), position);
        }
        if let Some(size) = entry.size {
            self.sizes.insert(id.clone(), size);
        }
        if let Some(points) = entry.routing_points {
            self.routing_points.insert(id.clone(), points);
        }
        if entry.collapsed {
            self.collapsed.insert(id.clone());
        }
    }

    pub fn element_ids(&self) -> BTreeSet<&ElementId> {
        self.positions
            .keys()
            .chain(self.sizes.keys())
            .chain(self.routing_points.keys())
            .chain(self.collapsed.iter())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
            && self.sizes.is_empty()
            && self.routing_points.is_empty()
            && self.collapsed.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
