use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::composition::catalog::CatalogRegistry;
use crate::composition::directive::ResourceKind;
use crate::composition::domain::{
    BlockData, BlockInstance, CatalogKey, InstanceId, PageId, PageMembership, PageRecord,
    PageTypeCode, PageTypeRecord, Scope, TenantId, Theme,
};
use crate::composition::fetchers::{
    FetchError, FetchRequest, ResourceFetcher, ResourceFetchers, ResourcePage,
};
use crate::composition::store::{CompositionStore, StoreError, ThemeStore};
use crate::composition::PageAssembler;
use crate::config::CompositionConfig;

pub(super) const TENANT: &str = "inmobiliaria-sol";
pub(super) const PROMO_PAGE: &str = "promo-verano";
pub(super) const LIBRARY_POOL: &str = "biblioteca";

pub(super) fn object(value: Value) -> BlockData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub(super) fn tenant() -> TenantId {
    TenantId(TENANT.to_string())
}

pub(super) fn instance(
    id: &str,
    scope: Scope,
    scope_key: &str,
    catalog: (&str, &str),
    order: i32,
    overrides: Value,
) -> BlockInstance {
    BlockInstance {
        instance_id: InstanceId(id.to_string()),
        tenant_id: tenant(),
        scope,
        scope_key: scope_key.to_string(),
        catalog: CatalogKey::new(catalog.0, catalog.1),
        order,
        active: true,
        override_data: object(overrides),
    }
}

pub(super) fn membership(instance_id: &str, order: i32, overrides: Value) -> PageMembership {
    PageMembership {
        page_id: PageId(PROMO_PAGE.to_string()),
        instance_id: InstanceId(instance_id.to_string()),
        order,
        active: true,
        override_data: object(overrides),
    }
}

pub(super) fn theme() -> Theme {
    let mut tokens = BTreeMap::new();
    tokens.insert("primary".to_string(), "#0f766e".to_string());
    tokens.insert("secondary".to_string(), "#f59e0b".to_string());
    tokens.insert("background".to_string(), "#ffffff".to_string());
    Theme { tokens }
}

#[derive(Default)]
pub(super) struct MemoryStoreState {
    pub(super) page_types: Vec<PageTypeRecord>,
    pub(super) pages: Vec<PageRecord>,
    pub(super) instances: Vec<BlockInstance>,
    pub(super) memberships: Vec<PageMembership>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) state: Arc<Mutex<MemoryStoreState>>,
}

impl MemoryStore {
    pub(super) fn push_instance(&self, instance: BlockInstance) {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .instances
            .push(instance);
    }

    pub(super) fn push_membership(&self, membership: PageMembership) {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .memberships
            .push(membership);
    }

    pub(super) fn set_active(&self, id: &str, active: bool) {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        for instance in guard.instances.iter_mut() {
            if instance.instance_id.0 == id {
                instance.active = active;
            }
        }
    }
}

#[async_trait]
impl CompositionStore for MemoryStore {
    async fn page_type(
        &self,
        _tenant: &TenantId,
        code: &PageTypeCode,
    ) -> Result<Option<PageTypeRecord>, StoreError> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard.page_types.iter().find(|record| &record.code == code).cloned())
    }

    async fn page(
        &self,
        tenant: &TenantId,
        page_id: &PageId,
    ) -> Result<Option<PageRecord>, StoreError> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .pages
            .iter()
            .find(|page| &page.id == page_id && &page.tenant_id == tenant)
            .cloned())
    }

    async fn instances_in_scope(
        &self,
        tenant: &TenantId,
        scope: Scope,
        scope_key: &str,
    ) -> Result<Vec<BlockInstance>, StoreError> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .instances
            .iter()
            .filter(|instance| {
                &instance.tenant_id == tenant
                    && instance.scope == scope
                    && instance.scope_key == scope_key
            })
            .cloned()
            .collect())
    }

    async fn page_memberships(
        &self,
        _tenant: &TenantId,
        page_id: &PageId,
    ) -> Result<Vec<PageMembership>, StoreError> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .memberships
            .iter()
            .filter(|membership| &membership.page_id == page_id)
            .cloned()
            .collect())
    }

    async fn instances_by_id(
        &self,
        tenant: &TenantId,
        ids: &[InstanceId],
    ) -> Result<Vec<BlockInstance>, StoreError> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .instances
            .iter()
            .filter(|instance| &instance.tenant_id == tenant && ids.contains(&instance.instance_id))
            .cloned()
            .collect())
    }
}

/// Page types `homepage`, `landing`, `contacto`; one landing page; header/footer at
/// tenant scope, a dark footer and a hero on `landing`, a hero override on the page.
pub(super) fn seeded_store() -> MemoryStore {
    let store = MemoryStore::default();
    {
        let mut guard = store.state.lock().expect("store mutex poisoned");
        guard.page_types = vec![
            PageTypeRecord {
                code: PageTypeCode("homepage".to_string()),
                name: "Inicio".to_string(),
                is_homepage: true,
            },
            PageTypeRecord {
                code: PageTypeCode("landing".to_string()),
                name: "Landing".to_string(),
                is_homepage: false,
            },
            PageTypeRecord {
                code: PageTypeCode("contacto".to_string()),
                name: "Contacto".to_string(),
                is_homepage: false,
            },
        ];
        guard.pages = vec![PageRecord {
            id: PageId(PROMO_PAGE.to_string()),
            tenant_id: tenant(),
            page_type: PageTypeCode("landing".to_string()),
            slug: "promo-verano".to_string(),
            title: "Promoción de verano".to_string(),
            description: None,
            updated_at: None,
        }];
        guard.instances = vec![
            instance("t-header", Scope::Tenant, TENANT, ("header", "default"), 0, json!({})),
            instance(
                "t-footer",
                Scope::Tenant,
                TENANT,
                ("footer", "default"),
                100,
                json!({ "copyright": "© Inmobiliaria Sol" }),
            ),
            instance(
                "pt-footer",
                Scope::PageType,
                "landing",
                ("footer", "dark"),
                100,
                json!({}),
            ),
            instance(
                "pt-hero",
                Scope::PageType,
                "landing",
                ("hero", "modern"),
                10,
                json!({ "titulo": "Oferta especial" }),
            ),
            instance(
                "p-hero",
                Scope::Page,
                PROMO_PAGE,
                ("hero", "modern"),
                10,
                json!({ "titulo": "Solo esta semana", "mostrarBadge": false }),
            ),
            instance(
                "lib-videos",
                Scope::Page,
                LIBRARY_POOL,
                ("videos", "gallery"),
                0,
                json!({ "titulo": "Recorridos virtuales" }),
            ),
            instance(
                "lib-contact",
                Scope::Page,
                LIBRARY_POOL,
                ("contact", "form"),
                0,
                json!({}),
            ),
        ];
    }
    store
}

#[derive(Default, Clone)]
pub(super) struct MemoryThemes {
    themes: Arc<Mutex<BTreeMap<TenantId, Theme>>>,
}

impl MemoryThemes {
    pub(super) fn with_tenant_theme() -> Self {
        let themes = Self::default();
        themes
            .themes
            .lock()
            .expect("theme mutex poisoned")
            .insert(tenant(), theme());
        themes
    }
}

#[async_trait]
impl ThemeStore for MemoryThemes {
    async fn theme(&self, tenant: &TenantId) -> Result<Option<Theme>, StoreError> {
        Ok(self
            .themes
            .lock()
            .expect("theme mutex poisoned")
            .get(tenant)
            .cloned())
    }
}

/// Serves `count` synthetic items regardless of the requested limit, and records
/// every request it sees.
pub(super) struct StaticFetcher {
    count: usize,
    total: u64,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StaticFetcher {
    pub(super) fn new(count: usize, total: u64) -> Self {
        Self {
            count,
            total,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().expect("fetcher mutex poisoned").clone()
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResourcePage, FetchError> {
        self.requests
            .lock()
            .expect("fetcher mutex poisoned")
            .push(request.clone());
        let items = (0..self.count)
            .map(|index| json!({ "id": format!("{}-{index}", request.kind), "kind": request.kind }))
            .collect();
        Ok(ResourcePage {
            items,
            total: self.total,
        })
    }
}

pub(super) struct FailingFetcher {
    pub(super) calls: AtomicUsize,
}

impl FailingFetcher {
    pub(super) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResourceFetcher for FailingFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResourcePage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Unavailable(
            request.kind,
            "connection reset".to_string(),
        ))
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl CompositionStore for UnavailableStore {
    async fn page_type(
        &self,
        _tenant: &TenantId,
        _code: &PageTypeCode,
    ) -> Result<Option<PageTypeRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn page(
        &self,
        _tenant: &TenantId,
        _page_id: &PageId,
    ) -> Result<Option<PageRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn instances_in_scope(
        &self,
        _tenant: &TenantId,
        _scope: Scope,
        _scope_key: &str,
    ) -> Result<Vec<BlockInstance>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn page_memberships(
        &self,
        _tenant: &TenantId,
        _page_id: &PageId,
    ) -> Result<Vec<PageMembership>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn instances_by_id(
        &self,
        _tenant: &TenantId,
        _ids: &[InstanceId],
    ) -> Result<Vec<BlockInstance>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Answers page lookups from the seeded rows but fails every block query.
pub(super) struct BlockRowsOffline(pub(super) MemoryStore);

#[async_trait]
impl CompositionStore for BlockRowsOffline {
    async fn page_type(
        &self,
        tenant: &TenantId,
        code: &PageTypeCode,
    ) -> Result<Option<PageTypeRecord>, StoreError> {
        self.0.page_type(tenant, code).await
    }

    async fn page(
        &self,
        tenant: &TenantId,
        page_id: &PageId,
    ) -> Result<Option<PageRecord>, StoreError> {
        self.0.page(tenant, page_id).await
    }

    async fn instances_in_scope(
        &self,
        _tenant: &TenantId,
        _scope: Scope,
        _scope_key: &str,
    ) -> Result<Vec<BlockInstance>, StoreError> {
        Err(StoreError::Unavailable("block table offline".to_string()))
    }

    async fn page_memberships(
        &self,
        _tenant: &TenantId,
        _page_id: &PageId,
    ) -> Result<Vec<PageMembership>, StoreError> {
        Err(StoreError::Unavailable("block table offline".to_string()))
    }

    async fn instances_by_id(
        &self,
        _tenant: &TenantId,
        _ids: &[InstanceId],
    ) -> Result<Vec<BlockInstance>, StoreError> {
        Err(StoreError::Unavailable("block table offline".to_string()))
    }
}

pub(super) fn uniform_fetchers(fetcher: Arc<dyn ResourceFetcher>) -> ResourceFetchers {
    ResourceFetchers::uniform(fetcher)
}

/// Every kind served by a static fetcher except `failing`, which always errors.
pub(super) fn fetchers_failing_on(
    failing: ResourceKind,
    healthy: Arc<StaticFetcher>,
) -> ResourceFetchers {
    ResourceFetchers::uniform(healthy).with(failing, Arc::new(FailingFetcher::new()))
}

pub(super) fn build_assembler<S: CompositionStore + 'static>(
    store: S,
    themes: MemoryThemes,
    fetchers: ResourceFetchers,
) -> PageAssembler<S, MemoryThemes> {
    PageAssembler::new(
        Arc::new(store),
        Arc::new(themes),
        Arc::new(CatalogRegistry::standard()),
        fetchers,
        CompositionConfig::default(),
    )
}

pub(super) fn default_assembler() -> (
    PageAssembler<MemoryStore, MemoryThemes>,
    MemoryStore,
    Arc<StaticFetcher>,
) {
    let store = seeded_store();
    let fetcher = Arc::new(StaticFetcher::new(3, 3));
    let assembler = build_assembler(
        store.clone(),
        MemoryThemes::with_tenant_theme(),
        uniform_fetchers(fetcher.clone()),
    );
    (assembler, store, fetcher)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
