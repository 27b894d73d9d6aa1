use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use super::block::ResolvedBlock;
use super::catalog::CatalogRegistry;
use super::domain::{
    Locale, PageId, PageIdentity, PageRecord, PageTypeCode, PageTypeRecord, Scope, TenantId, Theme,
};
use super::dynamic::DynamicDataResolver;
use super::fetchers::ResourceFetchers;
use super::homepage::{HomepageRecipe, HomepageSection};
use super::merge::merge_entry;
use super::scope::{CandidateSet, EditingCandidate, ScopeResolver};
use super::store::{CompositionStore, StoreError, ThemeStore};
use crate::config::CompositionConfig;

/// Progress of one assembly pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStage {
    Init,
    ThemeLoaded,
    BlocksResolved,
    DataResolved,
    Done,
    Failed,
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssemblyStage::Init => "init",
            AssemblyStage::ThemeLoaded => "theme_loaded",
            AssemblyStage::BlocksResolved => "blocks_resolved",
            AssemblyStage::DataResolved => "data_resolved",
            AssemblyStage::Done => "done",
            AssemblyStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Failures that abort assembly. Directive fetch errors never appear here; they are
/// embedded in the affected block.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("page not found: tenant {tenant}, page type {page_type}{}", .page_id.as_ref().map(|id| format!(", page {id}")).unwrap_or_default())]
    PageNotFound {
        tenant: TenantId,
        page_type: PageTypeCode,
        page_id: Option<PageId>,
    },
    #[error("tenant {0} has no theme configured")]
    ThemeMissing(TenantId),
    #[error("store failure after stage {stage}: {source}")]
    Store {
        stage: AssemblyStage,
        #[source]
        source: StoreError,
    },
}

impl AssemblyError {
    fn not_found(identity: &PageIdentity) -> Self {
        Self::PageNotFound {
            tenant: identity.tenant_id.clone(),
            page_type: identity.page_type.clone(),
            page_id: identity.page_id.clone(),
        }
    }

    fn store(stage: AssemblyStage) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { stage, source }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMetadata {
    pub tenant_id: TenantId,
    pub page_type: PageTypeCode,
    pub page_type_name: String,
    pub is_homepage: bool,
    pub locale: Locale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<PageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Output of [`PageAssembler::assemble`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledPage {
    pub page: PageMetadata,
    pub theme: Theme,
    pub blocks: Vec<ResolvedBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<HomepageSection>,
}

impl AssembledPage {
    pub fn blocks_of_type<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a ResolvedBlock> {
        self.blocks
            .iter()
            .filter(move |block| block.block_type == block_type)
    }

    pub fn section(&self, key: &str) -> Option<&HomepageSection> {
        self.sections.iter().find(|section| section.key == key)
    }
}

struct PageContext {
    page_type: PageTypeRecord,
    page: Option<PageRecord>,
}

/// Entry point composing theme, scoped blocks, and live data into a page.
pub struct PageAssembler<S, T> {
    store: Arc<S>,
    themes: Arc<T>,
    scopes: ScopeResolver<S>,
    catalog: Arc<CatalogRegistry>,
    dynamic: DynamicDataResolver,
    homepage: HomepageRecipe,
    config: CompositionConfig,
}

impl<S, T> PageAssembler<S, T>
where
    S: CompositionStore + 'static,
    T: ThemeStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        themes: Arc<T>,
        catalog: Arc<CatalogRegistry>,
        fetchers: ResourceFetchers,
        config: CompositionConfig,
    ) -> Self {
        Self {
            scopes: ScopeResolver::new(Arc::clone(&store)),
            store,
            themes,
            catalog,
            dynamic: DynamicDataResolver::new(fetchers),
            homepage: HomepageRecipe::standard(),
            config,
        }
    }

    pub fn with_homepage_recipe(mut self, recipe: HomepageRecipe) -> Self {
        self.homepage = recipe;
        self
    }

    pub fn catalog(&self) -> &CatalogRegistry {
        &self.catalog
    }

    pub fn default_locale(&self) -> &Locale {
        &self.config.default_locale
    }

    pub fn scopes(&self) -> &ScopeResolver<S> {
        &self.scopes
    }

    /// Composes the page for `identity`. Only a lookup miss, a missing theme, or a
    /// store failure aborts; fetch failures are embedded in their blocks.
    pub async fn assemble(
        &self,
        identity: &PageIdentity,
        locale: &Locale,
    ) -> Result<AssembledPage, AssemblyError> {
        let span = info_span!(
            "assemble",
            tenant = %identity.tenant_id,
            page_type = %identity.page_type,
            page_id = ?identity.page_id.as_ref().map(|id| id.0.as_str()),
            locale = %locale,
        );

        async {
            let result = self.run(identity, locale).await;
            if let Err(err) = &result {
                match err {
                    AssemblyError::PageNotFound { .. } => info!(error = %err, "assembly failed"),
                    _ => warn!(error = %err, "assembly failed"),
                }
                debug!(stage = %AssemblyStage::Failed, "assembly stage");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        identity: &PageIdentity,
        locale: &Locale,
    ) -> Result<AssembledPage, AssemblyError> {
        let mut stage = AssemblyStage::Init;

        let context = self.lookup(identity).await?;

        let theme = self
            .themes
            .theme(&identity.tenant_id)
            .await
            .map_err(AssemblyError::store(stage))?
            .ok_or_else(|| AssemblyError::ThemeMissing(identity.tenant_id.clone()))?;
        advance(&mut stage, AssemblyStage::ThemeLoaded);

        let candidates = self
            .scopes
            .gather(identity)
            .await
            .map_err(AssemblyError::store(stage))?;
        let mut blocks = self.resolve_blocks(&candidates);
        advance(&mut stage, AssemblyStage::BlocksResolved);

        // Block directives and homepage sections settle in one join.
        let is_homepage = self.is_homepage(&context.page_type);
        let sections = async {
            if is_homepage {
                self.homepage
                    .compose(
                        &self.dynamic,
                        &identity.tenant_id,
                        locale,
                        &self.config.default_locale,
                    )
                    .await
            } else {
                Vec::new()
            }
        };
        let ((), sections) = futures::join!(
            self.dynamic
                .resolve_blocks(&mut blocks, &identity.tenant_id, locale),
            sections,
        );
        advance(&mut stage, AssemblyStage::DataResolved);

        let degraded = blocks
            .iter()
            .filter_map(|block| block.resolved.as_ref())
            .filter(|content| content.is_degraded())
            .count()
            + sections.iter().filter(|section| section.error.is_some()).count();

        let PageContext { page_type, page } = context;
        let page = PageMetadata {
            tenant_id: identity.tenant_id.clone(),
            page_type: page_type.code,
            page_type_name: page_type.name,
            is_homepage,
            locale: locale.clone(),
            page_id: page.as_ref().map(|record| record.id.clone()),
            slug: page.as_ref().map(|record| record.slug.clone()),
            title: page.as_ref().map(|record| record.title.clone()),
            description: page.as_ref().and_then(|record| record.description.clone()),
            updated_at: page.as_ref().and_then(|record| record.updated_at),
        };

        advance(&mut stage, AssemblyStage::Done);
        info!(
            blocks = blocks.len(),
            sections = sections.len(),
            degraded,
            "page assembled"
        );

        Ok(AssembledPage {
            page,
            theme,
            blocks,
            sections,
        })
    }

    /// The single canonical block of a type (header, footer) for a page, merged but
    /// without live data.
    pub async fn resolve_canonical(
        &self,
        identity: &PageIdentity,
        block_type: &str,
    ) -> Result<Option<ResolvedBlock>, AssemblyError> {
        self.lookup(identity).await?;
        let candidates = self
            .scopes
            .gather(identity)
            .await
            .map_err(AssemblyError::store(AssemblyStage::ThemeLoaded))?;

        Ok(candidates.canonical(block_type).and_then(|instance| {
            let entry = self.catalog.get(&instance.catalog)?;
            let merged = merge_entry(entry, [&instance.override_data]);
            Some(ResolvedBlock::from_merge(
                instance,
                entry,
                instance.order,
                instance.scope,
                false,
                merged,
            ))
        }))
    }

    /// Every layer for the editor, bypassing the precedence collapse.
    pub async fn list_candidates_for_editing(
        &self,
        identity: &PageIdentity,
    ) -> Result<Vec<EditingCandidate>, StoreError> {
        self.scopes.list_for_editing(identity).await
    }

    async fn lookup(&self, identity: &PageIdentity) -> Result<PageContext, AssemblyError> {
        let init = AssemblyStage::Init;
        let page_type = self
            .store
            .page_type(&identity.tenant_id, &identity.page_type)
            .await
            .map_err(AssemblyError::store(init))?
            .ok_or_else(|| AssemblyError::not_found(identity))?;

        let page = match &identity.page_id {
            Some(page_id) => {
                let record = self
                    .store
                    .page(&identity.tenant_id, page_id)
                    .await
                    .map_err(AssemblyError::store(init))?
                    .filter(|record| record.page_type == identity.page_type)
                    .ok_or_else(|| AssemblyError::not_found(identity))?;
                Some(record)
            }
            None => None,
        };

        Ok(PageContext { page_type, page })
    }

    fn is_homepage(&self, page_type: &PageTypeRecord) -> bool {
        page_type.is_homepage || page_type.code == self.config.homepage_code
    }

    /// Merges every winning and member instance, then sorts into render order.
    fn resolve_blocks(&self, candidates: &CandidateSet) -> Vec<ResolvedBlock> {
        let mut blocks = Vec::new();

        for instance in candidates.winners() {
            let Some(entry) = self.catalog.get(&instance.catalog) else {
                warn!(instance = %instance.instance_id, catalog = %instance.catalog, "instance references unknown catalog entry");
                continue;
            };
            let merged = merge_entry(entry, [&instance.override_data]);
            blocks.push(ResolvedBlock::from_merge(
                instance,
                entry,
                instance.order,
                instance.scope,
                false,
                merged,
            ));
        }

        for member in candidates.members() {
            let instance = &member.instance;
            let Some(entry) = self.catalog.get(&instance.catalog) else {
                warn!(instance = %instance.instance_id, catalog = %instance.catalog, "instance references unknown catalog entry");
                continue;
            };
            let merged = merge_entry(
                entry,
                [&instance.override_data, &member.membership.override_data],
            );
            blocks.push(ResolvedBlock::from_merge(
                instance,
                entry,
                member.membership.order,
                Scope::Page,
                true,
                merged,
            ));
        }

        blocks.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        blocks
    }
}

fn advance(stage: &mut AssemblyStage, next: AssemblyStage) {
    debug!(from = %stage, to = %next, "assembly stage");
    *stage = next;
}
