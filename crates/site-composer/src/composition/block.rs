use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::CatalogEntry;
use super::directive::ResourceKind;
use super::domain::{BlockData, BlockInstance, InstanceId, Scope};
use super::merge::{FieldOrigin, MergeOutcome};

/// One block ready for rendering. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBlock {
    pub instance_id: InstanceId,
    pub block_type: String,
    pub variant: String,
    pub order: i32,
    pub source_scope: Scope,
    /// Attached through the page membership table rather than inherited.
    pub via_membership: bool,
    pub data: BlockData,
    pub provenance: BTreeMap<String, FieldOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedContent>,
}

impl ResolvedBlock {
    pub(crate) fn from_merge(
        instance: &BlockInstance,
        entry: &CatalogEntry,
        order: i32,
        source_scope: Scope,
        via_membership: bool,
        merged: MergeOutcome,
    ) -> Self {
        Self {
            instance_id: instance.instance_id.clone(),
            block_type: entry.key.block_type.clone(),
            variant: entry.key.variant.clone(),
            order,
            source_scope,
            via_membership,
            data: merged.data,
            provenance: merged.provenance,
            resolved: None,
        }
    }

    /// Render order: ascending `order`, then block type, then instance id.
    pub fn sort_key(&self) -> (i32, &str, &InstanceId) {
        (self.order, self.block_type.as_str(), &self.instance_id)
    }
}

/// Live content fetched for a directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContent {
    pub items: Vec<Value>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DirectiveFailure>,
}

impl ResolvedContent {
    pub fn failed(failure: DirectiveFailure) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            error: Some(failure),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    FetchFailed,
    InvalidDirective,
    FetcherMissing,
}

/// Error marker left on a block whose directive could not be served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveFailure {
    pub code: FailureCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    pub message: String,
}
