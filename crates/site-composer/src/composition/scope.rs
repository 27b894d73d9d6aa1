use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use super::domain::{BlockInstance, InstanceId, PageIdentity, PageMembership, Scope};
use super::store::{CompositionStore, StoreError};

/// Active instances for one block type, bucketed by scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotCandidates {
    by_scope: BTreeMap<Scope, Vec<BlockInstance>>,
}

impl SlotCandidates {
    fn push(&mut self, instance: BlockInstance) {
        let bucket = self.by_scope.entry(instance.scope).or_default();
        bucket.push(instance);
        bucket.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.instance_id.cmp(&b.instance_id))
        });
    }

    pub fn at(&self, scope: Scope) -> &[BlockInstance] {
        self.by_scope.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most specific scope holding at least one active instance.
    pub fn winning_scope(&self) -> Option<Scope> {
        self.by_scope
            .iter()
            .rev()
            .find(|(_, instances)| !instances.is_empty())
            .map(|(scope, _)| *scope)
    }

    /// Every instance at the winning scope; less specific scopes are shadowed.
    pub fn winners(&self) -> &[BlockInstance] {
        match self.winning_scope() {
            Some(scope) => self.at(scope),
            None => &[],
        }
    }
}

/// A page membership joined with the instance it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberCandidate {
    pub membership: PageMembership,
    pub instance: BlockInstance,
}

/// Everything that could render on a page, before precedence is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    slots: BTreeMap<String, SlotCandidates>,
    members: Vec<MemberCandidate>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.members.is_empty()
    }

    pub fn block_types(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn slot(&self, block_type: &str) -> Option<&SlotCandidates> {
        self.slots.get(block_type)
    }

    /// Single-slot inheritance: the winning instances for every block type.
    pub fn winners(&self) -> impl Iterator<Item = &BlockInstance> {
        self.slots.values().flat_map(SlotCandidates::winners)
    }

    /// The one instance treated as "the" block of a type, e.g. the header.
    pub fn canonical(&self, block_type: &str) -> Option<&BlockInstance> {
        self.slot(block_type).and_then(|slot| slot.winners().first())
    }

    /// Explicit page membership, ordered by membership order.
    pub fn members(&self) -> &[MemberCandidate] {
        &self.members
    }
}

/// Instance row as the editing UI sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditingCandidate {
    pub instance: BlockInstance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<PageMembership>,
    /// Whether this row renders on the page as currently stored.
    pub effective: bool,
}

/// Gathers candidate instances for a page identity from the store.
pub struct ScopeResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for ScopeResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ScopeResolver<S>
where
    S: CompositionStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Active candidates for a page. An unknown page type yields an empty set.
    pub async fn resolve_candidates(
        &self,
        identity: &PageIdentity,
    ) -> Result<CandidateSet, StoreError> {
        let known = self
            .store
            .page_type(&identity.tenant_id, &identity.page_type)
            .await?
            .is_some();
        if !known {
            return Ok(CandidateSet::default());
        }

        self.gather(identity).await
    }

    /// Same as [`Self::resolve_candidates`] for callers that already validated the
    /// page identity.
    pub(crate) async fn gather(&self, identity: &PageIdentity) -> Result<CandidateSet, StoreError> {
        let mut set = CandidateSet::default();

        for (_, instances) in self.scope_rows(identity).await? {
            for instance in instances.into_iter().filter(|instance| instance.active) {
                set.slots
                    .entry(instance.catalog.block_type.clone())
                    .or_default()
                    .push(instance);
            }
        }

        set.members = self
            .member_rows(identity)
            .await?
            .into_iter()
            .filter_map(|(membership, instance)| {
                if !membership.active {
                    return None;
                }
                match instance {
                    Some(instance) if attached_to_page(&instance, identity) => {
                        tracing::debug!(
                            page = %membership.page_id,
                            instance = %membership.instance_id,
                            "membership duplicates a block already attached to the page"
                        );
                        None
                    }
                    Some(instance) if instance.active => Some(MemberCandidate {
                        membership,
                        instance,
                    }),
                    Some(_) => None,
                    None => {
                        tracing::warn!(
                            tenant = %identity.tenant_id,
                            page = %membership.page_id,
                            instance = %membership.instance_id,
                            "page membership points at a missing block instance"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok(set)
    }

    /// All layers, active or not, flagged with whether each row renders.
    pub async fn list_for_editing(
        &self,
        identity: &PageIdentity,
    ) -> Result<Vec<EditingCandidate>, StoreError> {
        let known = self
            .store
            .page_type(&identity.tenant_id, &identity.page_type)
            .await?
            .is_some();
        if !known {
            return Ok(Vec::new());
        }

        let mut inherited: Vec<BlockInstance> = self
            .scope_rows(identity)
            .await?
            .into_iter()
            .flat_map(|(_, instances)| instances)
            .collect();
        inherited.sort_by(|a, b| {
            a.catalog
                .block_type
                .cmp(&b.catalog.block_type)
                .then_with(|| b.scope.cmp(&a.scope))
                .then_with(|| a.order.cmp(&b.order))
                .then_with(|| a.instance_id.cmp(&b.instance_id))
        });

        let mut winning: HashMap<&str, Scope> = HashMap::new();
        for instance in inherited.iter().filter(|instance| instance.active) {
            let scope = winning
                .entry(instance.catalog.block_type.as_str())
                .or_insert(instance.scope);
            if instance.scope > *scope {
                *scope = instance.scope;
            }
        }

        let mut candidates: Vec<EditingCandidate> = inherited
            .iter()
            .map(|instance| EditingCandidate {
                effective: instance.active
                    && winning.get(instance.catalog.block_type.as_str()) == Some(&instance.scope),
                instance: instance.clone(),
                membership: None,
            })
            .collect();

        for (membership, instance) in self.member_rows(identity).await? {
            if let Some(instance) = instance {
                candidates.push(EditingCandidate {
                    effective: membership.active
                        && instance.active
                        && !attached_to_page(&instance, identity),
                    instance,
                    membership: Some(membership),
                });
            }
        }

        Ok(candidates)
    }

    async fn scope_rows(
        &self,
        identity: &PageIdentity,
    ) -> Result<Vec<(Scope, Vec<BlockInstance>)>, StoreError> {
        let tenant = &identity.tenant_id;
        let mut keys = vec![
            (Scope::Tenant, tenant.0.clone()),
            (Scope::PageType, identity.page_type.0.clone()),
        ];
        if let Some(page_id) = &identity.page_id {
            keys.push((Scope::Page, page_id.0.clone()));
        }

        let mut rows = Vec::with_capacity(keys.len());
        for (scope, key) in keys {
            let instances = self
                .store
                .instances_in_scope(tenant, scope, &key)
                .await?
                .into_iter()
                .filter(|instance| {
                    &instance.tenant_id == tenant
                        && instance.scope == scope
                        && instance.scope_key == key
                })
                .collect();
            rows.push((scope, instances));
        }
        Ok(rows)
    }

    /// Memberships sorted by their own order, each joined with its instance if found.
    async fn member_rows(
        &self,
        identity: &PageIdentity,
    ) -> Result<Vec<(PageMembership, Option<BlockInstance>)>, StoreError> {
        let Some(page_id) = &identity.page_id else {
            return Ok(Vec::new());
        };

        let mut memberships = self
            .store
            .page_memberships(&identity.tenant_id, page_id)
            .await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }
        memberships.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.instance_id.cmp(&b.instance_id))
        });

        let ids: Vec<InstanceId> = memberships
            .iter()
            .map(|membership| membership.instance_id.clone())
            .collect();
        let instances: HashMap<InstanceId, BlockInstance> = self
            .store
            .instances_by_id(&identity.tenant_id, &ids)
            .await?
            .into_iter()
            .filter(|instance| instance.tenant_id == identity.tenant_id)
            .map(|instance| (instance.instance_id.clone(), instance))
            .collect();

        Ok(memberships
            .into_iter()
            .map(|membership| {
                let instance = instances.get(&membership.instance_id).cloned();
                (membership, instance)
            })
            .collect())
    }
}

/// Whether the instance already renders on the page through its own page scope.
fn attached_to_page(instance: &BlockInstance, identity: &PageIdentity) -> bool {
    instance.scope == Scope::Page
        && identity
            .page_id
            .as_ref()
            .is_some_and(|page_id| instance.scope_key == page_id.0)
}
