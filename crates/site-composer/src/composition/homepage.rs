use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::block::{DirectiveFailure, ResolvedContent};
use super::directive::{OrderSpec, Pagination, ResourceKind, SortDirection};
use super::domain::{BlockData, Locale, TenantId};
use super::dynamic::DynamicDataResolver;
use super::fetchers::FetchRequest;

/// Fixed resource section fetched for every homepage.
#[derive(Debug, Clone)]
pub struct SectionTemplate {
    pub key: &'static str,
    pub kind: ResourceKind,
    pub filters: BlockData,
    pub pagination: Pagination,
    pub order_by: Option<OrderSpec>,
    /// `(language, title)` pairs.
    pub titles: Vec<(&'static str, &'static str)>,
}

impl SectionTemplate {
    /// Title for the locale's language, else the fallback language, else the first one.
    pub fn title_for(&self, locale: &Locale, fallback: &Locale) -> &'static str {
        let lookup = |language: &str| {
            self.titles
                .iter()
                .find(|(lang, _)| *lang == language)
                .map(|(_, title)| *title)
        };

        lookup(locale.language())
            .or_else(|| lookup(fallback.language()))
            .or_else(|| self.titles.first().map(|(_, title)| *title))
            .unwrap_or(self.key)
    }
}

/// A homepage section after its fetch settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomepageSection {
    pub key: String,
    pub title: String,
    pub kind: ResourceKind,
    pub items: Vec<serde_json::Value>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DirectiveFailure>,
}

#[derive(Debug, Clone)]
pub struct HomepageRecipe {
    sections: Vec<SectionTemplate>,
}

impl HomepageRecipe {
    pub fn standard() -> Self {
        Self {
            sections: standard_sections(),
        }
    }

    pub fn sections(&self) -> &[SectionTemplate] {
        &self.sections
    }

    /// Fetches every section concurrently; failures degrade per section.
    pub async fn compose(
        &self,
        resolver: &DynamicDataResolver,
        tenant: &TenantId,
        locale: &Locale,
        fallback: &Locale,
    ) -> Vec<HomepageSection> {
        let fetches = self.sections.iter().map(|template| {
            let request = FetchRequest {
                tenant_id: tenant.clone(),
                locale: locale.clone(),
                kind: template.kind,
                filters: template.filters.clone(),
                pagination: template.pagination,
                order_by: template.order_by.clone(),
            };
            async move { (template, resolver.fetch(request).await) }
        });

        join_all(fetches)
            .await
            .into_iter()
            .map(|(template, content)| {
                let ResolvedContent {
                    items,
                    total,
                    error,
                } = content;
                HomepageSection {
                    key: template.key.to_string(),
                    title: template.title_for(locale, fallback).to_string(),
                    kind: template.kind,
                    items,
                    total,
                    error,
                }
            })
            .collect()
    }
}

fn filters(value: serde_json::Value) -> BlockData {
    match value {
        serde_json::Value::Object(map) => map,
        _ => BlockData::new(),
    }
}

fn newest_first(field: &str) -> Option<OrderSpec> {
    Some(OrderSpec {
        field: field.to_string(),
        direction: SortDirection::Desc,
    })
}

fn standard_sections() -> Vec<SectionTemplate> {
    vec![
        SectionTemplate {
            key: "featured_listings",
            kind: ResourceKind::Listings,
            filters: filters(json!({ "destacada": true })),
            pagination: Pagination::new(6, 1),
            order_by: newest_first("publicado"),
            titles: vec![
                ("es", "Propiedades destacadas"),
                ("en", "Featured properties"),
                ("pt", "Imóveis em destaque"),
            ],
        },
        SectionTemplate {
            key: "agents",
            kind: ResourceKind::Agents,
            filters: BlockData::new(),
            pagination: Pagination::new(8, 1),
            order_by: None,
            titles: vec![
                ("es", "Nuestros asesores"),
                ("en", "Our agents"),
                ("pt", "Nossos corretores"),
            ],
        },
        SectionTemplate {
            key: "testimonials",
            kind: ResourceKind::Testimonials,
            filters: BlockData::new(),
            pagination: Pagination::new(6, 1),
            order_by: None,
            titles: vec![
                ("es", "Lo que dicen nuestros clientes"),
                ("en", "What our clients say"),
                ("pt", "O que dizem nossos clientes"),
            ],
        },
        SectionTemplate {
            key: "videos",
            kind: ResourceKind::Videos,
            filters: BlockData::new(),
            pagination: Pagination::new(4, 1),
            order_by: newest_first("fecha"),
            titles: vec![("es", "Videos"), ("en", "Videos"), ("pt", "Vídeos")],
        },
        SectionTemplate {
            key: "articles",
            kind: ResourceKind::Articles,
            filters: BlockData::new(),
            pagination: Pagination::new(3, 1),
            order_by: newest_first("fecha"),
            titles: vec![
                ("es", "Artículos recientes"),
                ("en", "Latest articles"),
                ("pt", "Artigos recentes"),
            ],
        },
    ]
}
