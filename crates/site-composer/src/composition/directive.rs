use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::BlockData;

/// Key under which a block stores its live-data directive.
pub const DIRECTIVE_KEY: &str = "dataSource";

const DEFAULT_LIMIT: u32 = 12;
const MAX_LIMIT: u32 = 100;

/// Domain resources a directive may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Listings,
    Agents,
    Testimonials,
    Videos,
    Articles,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Listings,
        ResourceKind::Agents,
        ResourceKind::Testimonials,
        ResourceKind::Videos,
        ResourceKind::Articles,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Listings => "listings",
            ResourceKind::Agents => "agents",
            ResourceKind::Testimonials => "testimonials",
            ResourceKind::Videos => "videos",
            ResourceKind::Articles => "articles",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub limit: u32,
    pub page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
        }
    }
}

impl Pagination {
    pub fn new(limit: u32, page: u32) -> Self {
        Self { limit, page }.normalized()
    }

    /// Clamps to `1..=100` items and pages starting at 1.
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_LIMIT),
            page: self.page.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Instruction embedded in block data requesting live domain content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDirective {
    pub kind: ResourceKind,
    #[serde(default)]
    pub filters: BlockData,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub order_by: Option<OrderSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    #[error("`dataSource` must be an object")]
    NotAnObject,
    #[error("malformed directive: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl DataDirective {
    /// Reads the directive from block data. `None` when the block has none.
    pub fn from_block(data: &BlockData) -> Option<Result<Self, DirectiveError>> {
        data.get(DIRECTIVE_KEY).map(Self::parse)
    }

    pub fn parse(value: &Value) -> Result<Self, DirectiveError> {
        if !value.is_object() {
            return Err(DirectiveError::NotAnObject);
        }
        let mut directive: Self = serde_json::from_value(value.clone())?;
        directive.pagination = directive.pagination.normalized();
        Ok(directive)
    }
}
