//! Page composition: scoped block inheritance, override merging, and live-data
//! binding for tenant websites.

pub mod assembler;
pub mod block;
pub mod catalog;
pub mod directive;
pub mod domain;
pub mod dynamic;
pub mod fetchers;
pub mod homepage;
pub mod merge;
pub mod router;
pub mod scope;
pub mod store;

#[cfg(test)]
mod tests;

pub use assembler::{AssembledPage, AssemblyError, AssemblyStage, PageAssembler, PageMetadata};
pub use block::{DirectiveFailure, FailureCode, ResolvedBlock, ResolvedContent};
pub use catalog::{CatalogEntry, CatalogError, CatalogRegistry, FieldDescriptor, FieldKind};
pub use directive::{DataDirective, OrderSpec, Pagination, ResourceKind, SortDirection};
pub use domain::{
    BlockData, BlockInstance, CatalogKey, InstanceId, Locale, PageId, PageIdentity,
    PageMembership, PageRecord, PageTypeCode, PageTypeRecord, Scope, TenantId, Theme,
};
pub use dynamic::DynamicDataResolver;
pub use fetchers::{FetchError, FetchRequest, ResourceFetcher, ResourceFetchers, ResourcePage};
pub use homepage::{HomepageRecipe, HomepageSection};
pub use merge::{merge, FieldOrigin, MergeOutcome, MergeShapeMismatch};
pub use router::composition_router;
pub use scope::{CandidateSet, EditingCandidate, ScopeResolver};
pub use store::{CompositionStore, StoreError, ThemeStore};
