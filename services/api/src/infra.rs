use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::Value;
use site_composer::composition::{
    BlockInstance, CatalogRegistry, CompositionStore, FetchError, FetchRequest, InstanceId,
    PageAssembler, PageId, PageMembership, PageRecord, PageTypeCode, PageTypeRecord,
    ResourceFetcher, ResourceFetchers, ResourceKind, ResourcePage, Scope, SortDirection,
    StoreError, TenantId, Theme, ThemeStore,
};
use site_composer::config::CompositionConfig;
use site_composer::error::AppError;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

const DEMO_SEED: &str = include_str!("../seed/demo-site.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TenantPageType {
    pub(crate) tenant_id: TenantId,
    #[serde(flatten)]
    pub(crate) record: PageTypeRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResourceSeed {
    pub(crate) tenant_id: TenantId,
    pub(crate) kind: ResourceKind,
    #[serde(default)]
    pub(crate) items: Vec<Value>,
}

/// Rows for every table the resolver reads, plus the domain resources behind the
/// fetchers. Stands in for the relational store when running locally.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SiteSeed {
    #[serde(default)]
    pub(crate) themes: BTreeMap<TenantId, Theme>,
    #[serde(default)]
    pub(crate) page_types: Vec<TenantPageType>,
    #[serde(default)]
    pub(crate) pages: Vec<PageRecord>,
    #[serde(default)]
    pub(crate) instances: Vec<BlockInstance>,
    #[serde(default)]
    pub(crate) memberships: Vec<PageMembership>,
    #[serde(default)]
    pub(crate) resources: Vec<ResourceSeed>,
}

impl SiteSeed {
    pub(crate) fn demo() -> Result<Self, AppError> {
        Ok(serde_json::from_str(DEMO_SEED)?)
    }

    /// Reads `path` when given, otherwise the bundled demo site.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let seed: Self = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => Self::demo()?,
        };
        let source = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "bundled demo".to_string());
        info!(
            %source,
            tenants = seed.themes.len(),
            instances = seed.instances.len(),
            "site seed loaded"
        );
        Ok(seed)
    }

    pub(crate) fn tenants(&self) -> impl Iterator<Item = &TenantId> {
        self.themes.keys()
    }

    pub(crate) fn page_types_of<'a>(
        &'a self,
        tenant: &'a TenantId,
    ) -> impl Iterator<Item = &'a PageTypeRecord> + 'a {
        self.page_types
            .iter()
            .filter(move |row| &row.tenant_id == tenant)
            .map(|row| &row.record)
    }

    pub(crate) fn pages_of<'a>(
        &'a self,
        tenant: &'a TenantId,
    ) -> impl Iterator<Item = &'a PageRecord> + 'a {
        self.pages.iter().filter(move |page| &page.tenant_id == tenant)
    }
}

/// Read-only store over a [`SiteSeed`]; serves both composition rows and themes.
#[derive(Clone)]
pub(crate) struct SeedStore {
    seed: Arc<SiteSeed>,
}

impl SeedStore {
    pub(crate) fn new(seed: Arc<SiteSeed>) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl CompositionStore for SeedStore {
    async fn page_type(
        &self,
        tenant: &TenantId,
        code: &PageTypeCode,
    ) -> Result<Option<PageTypeRecord>, StoreError> {
        Ok(self
            .seed
            .page_types_of(tenant)
            .find(|record| &record.code == code)
            .cloned())
    }

    async fn page(
        &self,
        tenant: &TenantId,
        page_id: &PageId,
    ) -> Result<Option<PageRecord>, StoreError> {
        Ok(self
            .seed
            .pages_of(tenant)
            .find(|page| &page.id == page_id)
            .cloned())
    }

    async fn instances_in_scope(
        &self,
        tenant: &TenantId,
        scope: Scope,
        scope_key: &str,
    ) -> Result<Vec<BlockInstance>, StoreError> {
        Ok(self
            .seed
            .instances
            .iter()
            .filter(|row| {
                &row.tenant_id == tenant && row.scope == scope && row.scope_key == scope_key
            })
            .cloned()
            .collect())
    }

    async fn page_memberships(
        &self,
        tenant: &TenantId,
        page_id: &PageId,
    ) -> Result<Vec<PageMembership>, StoreError> {
        let owned = self.seed.pages_of(tenant).any(|page| &page.id == page_id);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(self
            .seed
            .memberships
            .iter()
            .filter(|row| &row.page_id == page_id)
            .cloned()
            .collect())
    }

    async fn instances_by_id(
        &self,
        tenant: &TenantId,
        ids: &[InstanceId],
    ) -> Result<Vec<BlockInstance>, StoreError> {
        Ok(self
            .seed
            .instances
            .iter()
            .filter(|row| &row.tenant_id == tenant && ids.contains(&row.instance_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ThemeStore for SeedStore {
    async fn theme(&self, tenant: &TenantId) -> Result<Option<Theme>, StoreError> {
        Ok(self.seed.themes.get(tenant).cloned())
    }
}

/// Serves one resource kind from seeded items: equality filters, optional ordering,
/// then page slicing. `total` counts matches before slicing.
pub(crate) struct SeedFetcher {
    items: BTreeMap<TenantId, Vec<Value>>,
}

impl SeedFetcher {
    fn new(kind: ResourceKind, seed: &SiteSeed) -> Self {
        let mut items: BTreeMap<TenantId, Vec<Value>> = BTreeMap::new();
        for resource in seed.resources.iter().filter(|r| r.kind == kind) {
            items
                .entry(resource.tenant_id.clone())
                .or_default()
                .extend(resource.items.iter().cloned());
        }
        Self { items }
    }
}

#[async_trait]
impl ResourceFetcher for SeedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResourcePage, FetchError> {
        let Some(items) = self.items.get(&request.tenant_id) else {
            return Ok(ResourcePage::default());
        };

        let mut matches: Vec<&Value> = items
            .iter()
            .filter(|item| {
                request
                    .filters
                    .iter()
                    .all(|(field, expected)| item.get(field) == Some(expected))
            })
            .collect();

        if let Some(order) = &request.order_by {
            matches.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(request.pagination.offset())
            .take(request.pagination.limit as usize)
            .cloned()
            .collect();
        Ok(ResourcePage { items, total })
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

pub(crate) fn seed_fetchers(seed: &SiteSeed) -> ResourceFetchers {
    ResourceKind::ALL
        .into_iter()
        .fold(ResourceFetchers::new(), |registry, kind| {
            registry.with(kind, Arc::new(SeedFetcher::new(kind, seed)))
        })
}

pub(crate) type SeedAssembler = PageAssembler<SeedStore, SeedStore>;

pub(crate) fn build_assembler(seed: SiteSeed, config: CompositionConfig) -> SeedAssembler {
    let fetchers = seed_fetchers(&seed);
    let store = Arc::new(SeedStore::new(Arc::new(seed)));
    PageAssembler::new(
        Arc::clone(&store),
        store,
        Arc::new(CatalogRegistry::standard()),
        fetchers,
        config,
    )
}
