use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open-ended block payload. `serde_json::Map` is ordered, which keeps output stable.
pub type BlockData = Map<String, Value>;

/// Brokerage owning the site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

/// Page-type code such as `homepage`, `landing`, or `property-detail`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageTypeCode(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PageTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a catalog entry, e.g. `hero/modern`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    pub block_type: String,
    pub variant: String,
}

impl CatalogKey {
    pub fn new(block_type: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.block_type, self.variant)
    }
}

/// Level a block instance is attached at. Variants are declared from least to most
/// specific so `Ord` doubles as precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Tenant,
    PageType,
    Page,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Tenant, Scope::PageType, Scope::Page];

    pub fn label(self) -> &'static str {
        match self {
            Scope::Tenant => "tenant",
            Scope::PageType => "page_type",
            Scope::Page => "page",
        }
    }
}

/// A catalog entry attached to one scope, optionally overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    pub instance_id: InstanceId,
    pub tenant_id: TenantId,
    pub scope: Scope,
    /// Tenant id, page-type code, or page id depending on `scope`.
    pub scope_key: String,
    pub catalog: CatalogKey,
    pub order: i32,
    pub active: bool,
    #[serde(default)]
    pub override_data: BlockData,
}

impl BlockInstance {
    pub fn block_type(&self) -> &str {
        &self.catalog.block_type
    }
}

/// Junction row assigning a reusable instance to a specific page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMembership {
    pub page_id: PageId,
    pub instance_id: InstanceId,
    pub order: i32,
    pub active: bool,
    #[serde(default)]
    pub override_data: BlockData,
}

/// Resolution key supplied by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageIdentity {
    pub tenant_id: TenantId,
    pub page_type: PageTypeCode,
    pub page_id: Option<PageId>,
}

impl PageIdentity {
    pub fn new(tenant_id: impl Into<String>, page_type: impl Into<String>) -> Self {
        Self {
            tenant_id: TenantId(tenant_id.into()),
            page_type: PageTypeCode(page_type.into()),
            page_id: None,
        }
    }

    pub fn with_page(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(PageId(page_id.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTypeRecord {
    pub code: PageTypeCode,
    pub name: String,
    #[serde(default)]
    pub is_homepage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub tenant_id: TenantId,
    pub page_type: PageTypeCode,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Color tokens for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme {
    pub tokens: BTreeMap<String, String>,
}

impl Theme {
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }
}

/// Normalized language tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().replace('_', "-").to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag: `es-MX` -> `es`.
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_ordering_matches_specificity() {
        assert!(Scope::Page > Scope::PageType);
        assert!(Scope::PageType > Scope::Tenant);
        assert_eq!(Scope::ALL.iter().max(), Some(&Scope::Page));
    }

    #[test]
    fn locale_normalizes_tags() {
        let locale = Locale::new(" es_MX ");
        assert_eq!(locale.as_str(), "es-mx");
        assert_eq!(locale.language(), "es");
    }

    #[test]
    fn scope_serializes_snake_case() {
        let encoded = serde_json::to_string(&Scope::PageType).expect("serializes");
        assert_eq!(encoded, "\"page_type\"");
    }
}
