use super::common::*;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::composition::composition_router;
use crate::composition::fetchers::ResourceFetchers;
use crate::composition::router::{canonical_handler, page_handler, PageQuery};

fn router() -> axum::Router {
    let (assembler, store, _) = default_assembler();
    store.push_membership(membership("lib-videos", 20, json!({})));
    composition_router(Arc::new(assembler))
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::get(uri).body(axum::body::Body::empty()).unwrap()
}

#[tokio::test]
async fn page_route_returns_the_assembled_page() {
    let response = router()
        .oneshot(get(&format!(
            "/api/v1/tenants/{TENANT}/pages/landing?page_id={PROMO_PAGE}&locale=es-MX"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["page"]["locale"], "es-mx");
    assert_eq!(body["page"]["page_id"], PROMO_PAGE);
    assert_eq!(body["theme"]["primary"], "#0f766e");
    let ids: Vec<&str> = body["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|block| block["instance_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["t-header", "p-hero", "lib-videos", "pt-footer"]);
    assert_eq!(body["blocks"][2]["via_membership"], true);
    assert_eq!(body["blocks"][1]["provenance"]["titulo"], "override");
    assert!(body.get("sections").is_none());
}

#[tokio::test]
async fn page_route_defaults_the_locale() {
    let response = router()
        .oneshot(get(&format!("/api/v1/tenants/{TENANT}/pages/homepage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["page"]["locale"], "es");
    assert_eq!(body["sections"][0]["title"], "Propiedades destacadas");
}

#[tokio::test]
async fn page_route_returns_not_found_for_unknown_page() {
    let response = router()
        .oneshot(get(&format!(
            "/api/v1/tenants/{TENANT}/pages/landing?page_id=no-existe"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("no-existe"));
}

#[tokio::test]
async fn page_handler_returns_internal_error_without_theme() {
    let assembler = Arc::new(build_assembler(
        seeded_store(),
        MemoryThemes::default(),
        ResourceFetchers::new(),
    ));

    let response = page_handler::<MemoryStore, MemoryThemes>(
        State(assembler),
        Path((TENANT.to_string(), "landing".to_string())),
        Query(PageQuery::default()),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("no theme configured"));
}

#[tokio::test]
async fn page_handler_returns_internal_error_on_store_failure() {
    let assembler = Arc::new(build_assembler(
        UnavailableStore,
        MemoryThemes::with_tenant_theme(),
        ResourceFetchers::new(),
    ));

    let response = page_handler::<UnavailableStore, MemoryThemes>(
        State(assembler),
        Path((TENANT.to_string(), "landing".to_string())),
        Query(PageQuery::default()),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("database offline"));
}

#[tokio::test]
async fn candidates_route_lists_every_layer() {
    let response = router()
        .oneshot(get(&format!(
            "/api/v1/tenants/{TENANT}/pages/landing/candidates?page_id={PROMO_PAGE}"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let candidates = body["candidates"].as_array().unwrap();
    // Five inherited rows plus the membership.
    assert_eq!(candidates.len(), 6);
    assert!(candidates
        .iter()
        .any(|row| row["instance"]["instance_id"] == "t-footer" && row["effective"] == false));
    assert!(candidates
        .iter()
        .any(|row| row["membership"]["instance_id"] == "lib-videos"));
}

#[tokio::test]
async fn canonical_route_returns_the_winning_block() {
    let response = router()
        .oneshot(get(&format!(
            "/api/v1/tenants/{TENANT}/pages/landing/blocks/footer"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["instance_id"], "pt-footer");
    assert_eq!(body["variant"], "dark");
}

#[tokio::test]
async fn canonical_handler_returns_not_found_when_no_block_applies() {
    let (assembler, _, _) = default_assembler();

    let response = canonical_handler::<MemoryStore, MemoryThemes>(
        State(Arc::new(assembler)),
        Path((
            TENANT.to_string(),
            "contacto".to_string(),
            "hero".to_string(),
        )),
        Query(PageQuery::default()),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("hero"));
}
