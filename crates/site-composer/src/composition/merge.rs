//! Shallow override merge.
//!
//! Every top-level key present in an override replaces the catalog default
//! wholesale; absent keys keep the default. Presence is decided by the key
//! existing in the map, so `false`, `0`, `""`, and `null` overrides all apply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::CatalogEntry;
use super::domain::{BlockData, CatalogKey};

/// Where a merged field came from. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    Default,
    Override,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    pub data: BlockData,
    pub provenance: BTreeMap<String, FieldOrigin>,
}

impl MergeOutcome {
    pub fn customized_fields(&self) -> impl Iterator<Item = &str> {
        self.provenance
            .iter()
            .filter(|(_, origin)| **origin == FieldOrigin::Override)
            .map(|(field, _)| field.as_str())
    }
}

/// Override fields the catalog schema does not know about. They are still merged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("override for {catalog} sets fields outside the catalog schema: {}", .fields.join(", "))]
pub struct MergeShapeMismatch {
    pub catalog: CatalogKey,
    pub fields: Vec<String>,
}

pub fn merge(defaults: &BlockData, override_data: &BlockData) -> MergeOutcome {
    merge_layers(defaults, [override_data])
}

/// Applies overrides in order; later layers win.
pub fn merge_layers<'a>(
    defaults: &BlockData,
    layers: impl IntoIterator<Item = &'a BlockData>,
) -> MergeOutcome {
    let mut data = defaults.clone();
    let mut provenance: BTreeMap<String, FieldOrigin> = defaults
        .keys()
        .map(|key| (key.clone(), FieldOrigin::Default))
        .collect();

    for layer in layers {
        for (key, value) in layer {
            data.insert(key.clone(), value.clone());
            provenance.insert(key.clone(), FieldOrigin::Override);
        }
    }

    MergeOutcome { data, provenance }
}

/// Merges the override layers onto a catalog entry, logging any schema drift.
pub fn merge_entry<'a>(
    entry: &CatalogEntry,
    layers: impl IntoIterator<Item = &'a BlockData>,
) -> MergeOutcome {
    let layers: Vec<&BlockData> = layers.into_iter().collect();

    let mut unknown: Vec<String> = layers
        .iter()
        .flat_map(|layer| entry.unknown_fields(layer))
        .collect();
    unknown.sort();
    unknown.dedup();

    if !unknown.is_empty() {
        let mismatch = MergeShapeMismatch {
            catalog: entry.key.clone(),
            fields: unknown,
        };
        tracing::warn!(catalog = %entry.key, error = %mismatch, "merging fields outside catalog schema");
    }

    merge_layers(&entry.default_data, layers)
}
