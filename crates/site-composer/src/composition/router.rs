use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::assembler::{AssembledPage, PageAssembler};
use super::block::ResolvedBlock;
use super::domain::{Locale, PageId, PageIdentity, PageTypeCode, TenantId};
use super::store::{CompositionStore, ThemeStore};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub(crate) page_id: Option<String>,
    #[serde(default)]
    pub(crate) locale: Option<String>,
}

impl PageQuery {
    fn identity(&self, tenant_id: String, page_type: String) -> PageIdentity {
        PageIdentity {
            tenant_id: TenantId(tenant_id),
            page_type: PageTypeCode(page_type),
            page_id: self
                .page_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| PageId(id.to_string())),
        }
    }
}

/// Router exposing page assembly and the editor read path.
pub fn composition_router<S, T>(assembler: Arc<PageAssembler<S, T>>) -> Router
where
    S: CompositionStore + 'static,
    T: ThemeStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/tenants/:tenant_id/pages/:page_type",
            get(page_handler::<S, T>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/pages/:page_type/candidates",
            get(candidates_handler::<S, T>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/pages/:page_type/blocks/:block_type",
            get(canonical_handler::<S, T>),
        )
        .with_state(assembler)
}

pub(crate) async fn page_handler<S, T>(
    State(assembler): State<Arc<PageAssembler<S, T>>>,
    Path((tenant_id, page_type)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<AssembledPage>, AppError>
where
    S: CompositionStore + 'static,
    T: ThemeStore + 'static,
{
    let identity = query.identity(tenant_id, page_type);
    let locale = query
        .locale
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(Locale::new)
        .unwrap_or_else(|| assembler.default_locale().clone());

    let page = assembler.assemble(&identity, &locale).await?;
    Ok(Json(page))
}

pub(crate) async fn candidates_handler<S, T>(
    State(assembler): State<Arc<PageAssembler<S, T>>>,
    Path((tenant_id, page_type)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: CompositionStore + 'static,
    T: ThemeStore + 'static,
{
    let identity = query.identity(tenant_id, page_type);
    let candidates = assembler.list_candidates_for_editing(&identity).await?;
    Ok(Json(json!({ "candidates": candidates })))
}

pub(crate) async fn canonical_handler<S, T>(
    State(assembler): State<Arc<PageAssembler<S, T>>>,
    Path((tenant_id, page_type, block_type)): Path<(String, String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ResolvedBlock>, AppError>
where
    S: CompositionStore + 'static,
    T: ThemeStore + 'static,
{
    let identity = query.identity(tenant_id, page_type);
    assembler
        .resolve_canonical(&identity, &block_type)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("no active {block_type} block for this page"))
        })
}
