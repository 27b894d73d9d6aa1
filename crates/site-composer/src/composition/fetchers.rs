use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::directive::{DataDirective, OrderSpec, Pagination, ResourceKind};
use super::domain::{BlockData, Locale, TenantId};

/// Everything a fetcher needs for one directive. Owned so each fetch runs on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub tenant_id: TenantId,
    pub locale: Locale,
    pub kind: ResourceKind,
    pub filters: BlockData,
    pub pagination: Pagination,
    pub order_by: Option<OrderSpec>,
}

impl FetchRequest {
    pub fn from_directive(
        directive: &DataDirective,
        tenant_id: &TenantId,
        locale: &Locale,
    ) -> Self {
        Self {
            tenant_id: tenant_id.clone(),
            locale: locale.clone(),
            kind: directive.kind,
            filters: directive.filters.clone(),
            pagination: directive.pagination,
            order_by: directive.order_by.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePage {
    pub items: Vec<Value>,
    pub total: u64,
}

/// Infrastructure failure. "No results" is an empty page, never an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{0} source unavailable: {1}")]
    Unavailable(ResourceKind, String),
    #[error("{0} source rejected the request: {1}")]
    Rejected(ResourceKind, String),
}

/// Adapter over one domain resource (listings, agents, ...).
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResourcePage, FetchError>;
}

/// Fetchers keyed by resource kind, injected into the resolver.
#[derive(Clone, Default)]
pub struct ResourceFetchers {
    fetchers: BTreeMap<ResourceKind, Arc<dyn ResourceFetcher>>,
}

impl ResourceFetchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ResourceKind, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.fetchers.insert(kind, fetcher);
        self
    }

    /// Registers the same fetcher for every kind.
    pub fn uniform(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        ResourceKind::ALL
            .into_iter()
            .fold(Self::new(), |registry, kind| registry.with(kind, Arc::clone(&fetcher)))
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn ResourceFetcher>> {
        self.fetchers.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.fetchers.keys().copied()
    }
}

impl std::fmt::Debug for ResourceFetchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetchers")
            .field("kinds", &self.fetchers.keys().collect::<Vec<_>>())
            .finish()
    }
}
