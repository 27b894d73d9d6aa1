use futures::future::join_all;
use tracing::{debug, warn};

use super::block::{DirectiveFailure, FailureCode, ResolvedBlock, ResolvedContent};
use super::directive::{DataDirective, DirectiveError};
use super::domain::{BlockData, Locale, TenantId};
use super::fetchers::{FetchRequest, ResourceFetchers};

/// Replaces block directives with live content from the resource fetchers.
///
/// Every directive on a page is fetched concurrently and joined all-settled: a
/// failing or missing fetcher only degrades its own block to an empty result with
/// an error marker.
#[derive(Debug, Clone, Default)]
pub struct DynamicDataResolver {
    fetchers: ResourceFetchers,
}

impl DynamicDataResolver {
    pub fn new(fetchers: ResourceFetchers) -> Self {
        Self { fetchers }
    }

    pub fn fetchers(&self) -> &ResourceFetchers {
        &self.fetchers
    }

    /// Resolves the directive in one block's data, if it has one.
    pub async fn resolve_dynamic(
        &self,
        data: &BlockData,
        tenant: &TenantId,
        locale: &Locale,
    ) -> Option<ResolvedContent> {
        let parsed = DataDirective::from_block(data)?;
        Some(self.run(parsed, tenant, locale).await)
    }

    /// Fills the `resolved` slot of every block carrying a directive.
    pub async fn resolve_blocks(
        &self,
        blocks: &mut [ResolvedBlock],
        tenant: &TenantId,
        locale: &Locale,
    ) {
        let pending: Vec<(usize, Result<DataDirective, DirectiveError>)> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                DataDirective::from_block(&block.data).map(|parsed| (index, parsed))
            })
            .collect();

        if pending.is_empty() {
            return;
        }
        debug!(directives = pending.len(), "fetching block directives");

        let outcomes = join_all(pending.into_iter().map(|(index, parsed)| async move {
            (index, self.run(parsed, tenant, locale).await)
        }))
        .await;

        for (index, content) in outcomes {
            if let Some(block) = blocks.get_mut(index) {
                block.resolved = Some(content);
            }
        }
    }

    /// Runs one fetch, converting every failure into a degraded result.
    pub async fn fetch(&self, request: FetchRequest) -> ResolvedContent {
        let Some(fetcher) = self.fetchers.get(request.kind) else {
            warn!(kind = %request.kind, tenant = %request.tenant_id, "no fetcher registered");
            return ResolvedContent::failed(DirectiveFailure {
                code: FailureCode::FetcherMissing,
                kind: Some(request.kind),
                message: format!("no fetcher registered for {}", request.kind),
            });
        };

        match fetcher.fetch(&request).await {
            Ok(page) => ResolvedContent {
                items: page.items,
                total: page.total,
                error: None,
            },
            Err(err) => {
                warn!(kind = %request.kind, tenant = %request.tenant_id, error = %err, "directive fetch failed");
                ResolvedContent::failed(DirectiveFailure {
                    code: FailureCode::FetchFailed,
                    kind: Some(request.kind),
                    message: err.to_string(),
                })
            }
        }
    }

    async fn run(
        &self,
        parsed: Result<DataDirective, DirectiveError>,
        tenant: &TenantId,
        locale: &Locale,
    ) -> ResolvedContent {
        match parsed {
            Ok(directive) => {
                self.fetch(FetchRequest::from_directive(&directive, tenant, locale))
                    .await
            }
            Err(err) => {
                warn!(tenant = %tenant, error = %err, "ignoring invalid directive");
                ResolvedContent::failed(DirectiveFailure {
                    code: FailureCode::InvalidDirective,
                    kind: None,
                    message: err.to_string(),
                })
            }
        }
    }
}
