use async_trait::async_trait;

use super::domain::{
    BlockInstance, InstanceId, PageId, PageMembership, PageRecord, PageTypeCode, PageTypeRecord,
    Scope, TenantId, Theme,
};

/// Read access to the relational rows the resolver consumes. Writes belong to the
/// editing surface; committed writes are visible to the next read.
#[async_trait]
pub trait CompositionStore: Send + Sync {
    async fn page_type(
        &self,
        tenant: &TenantId,
        code: &PageTypeCode,
    ) -> Result<Option<PageTypeRecord>, StoreError>;

    async fn page(&self, tenant: &TenantId, page_id: &PageId)
        -> Result<Option<PageRecord>, StoreError>;

    /// Every instance attached at `scope` under `scope_key`, active or not.
    async fn instances_in_scope(
        &self,
        tenant: &TenantId,
        scope: Scope,
        scope_key: &str,
    ) -> Result<Vec<BlockInstance>, StoreError>;

    /// Junction rows for a page, active or not.
    async fn page_memberships(
        &self,
        tenant: &TenantId,
        page_id: &PageId,
    ) -> Result<Vec<PageMembership>, StoreError>;

    async fn instances_by_id(
        &self,
        tenant: &TenantId,
        ids: &[InstanceId],
    ) -> Result<Vec<BlockInstance>, StoreError>;
}

#[async_trait]
pub trait ThemeStore: Send + Sync {
    async fn theme(&self, tenant: &TenantId) -> Result<Option<Theme>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored row is malformed: {0}")]
    Corrupt(String),
}
