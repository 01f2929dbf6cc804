//! In-memory store for tests and local development.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Search executes a
//! [`SearchPlan`] with the same predicate and ordering as the Postgres store,
//! using the `pg_trgm`-compatible helpers in [`crate::text`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    NewUser, Organization, OrganizationMembership, OrganizationUpdate, Physician, User, UserRole,
    UserUpdate,
};
use crate::search::{SearchPlan, SortBy, SortOrder, SortSpec};
use crate::text;

use super::{AccountStore, PhysicianStore, StoreError, StoreResult};

/// In-memory store implementing both store traits.
#[derive(Default)]
pub struct InMemoryStore {
    physicians: RwLock<HashMap<String, Physician>>,
    users: RwLock<HashMap<String, User>>,
    organizations: RwLock<HashMap<Uuid, Organization>>,
    memberships: RwLock<Vec<OrganizationMembership>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with physicians.
    pub fn with_physicians(physicians: impl IntoIterator<Item = Physician>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.physicians.write() {
            for p in physicians {
                map.insert(p.npi.clone(), p);
            }
        }
        store
    }
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Backend(anyhow!("in-memory store lock poisoned")))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Backend(anyhow!("in-memory store lock poisoned")))
}

/// A physician that matched a plan, with its ranking signals.
struct Scored<'a> {
    physician: &'a Physician,
    rank: f64,
    similarity: f64,
}

fn matches_text(p: &Physician, plan: &SearchPlan) -> bool {
    let Some(ref q) = plan.text else {
        return true;
    };
    let threshold = plan.similarity_threshold;

    if !q.terms.is_empty() {
        let lexemes = text::name_lexemes(&p.first_name, p.middle_name.as_deref(), &p.last_name);
        if text::ts_prefix_match(&lexemes, &q.terms) {
            return true;
        }
    }
    if text::trigram_similarity(&p.first_name, &q.raw) > threshold
        || text::trigram_similarity(&p.last_name, &q.raw) > threshold
    {
        return true;
    }
    if p
        .primary_specialty
        .iter()
        .chain(p.secondary_specialties.iter())
        .any(|s| text::contains_ci(&s.taxonomy_description, &q.raw))
    {
        return true;
    }
    if p
        .address_state
        .as_deref()
        .is_some_and(|s| text::contains_ci(s, &q.raw))
    {
        return true;
    }
    p.address_zip5
        .as_deref()
        .is_some_and(|z| z.to_lowercase().starts_with(&q.raw.to_lowercase()))
}

fn matches_plan(p: &Physician, plan: &SearchPlan) -> bool {
    if let Some(ref state) = plan.state {
        if p.address_state.as_deref() != Some(state.as_str()) {
            return false;
        }
    }
    if let Some(ref zip) = plan.zip_prefix {
        if !p
            .address_zip5
            .as_deref()
            .is_some_and(|z| z.starts_with(zip.as_str()))
        {
            return false;
        }
    }
    matches_text(p, plan)
}

fn score<'a>(p: &'a Physician, plan: &SearchPlan) -> Scored<'a> {
    let (rank, similarity) = match plan.text {
        Some(ref q) => {
            let lexemes =
                text::name_lexemes(&p.first_name, p.middle_name.as_deref(), &p.last_name);
            let rank = text::ts_rank(&lexemes, &q.terms);
            let similarity = text::trigram_similarity(&p.first_name, &q.raw)
                .max(text::trigram_similarity(&p.last_name, &q.raw));
            (rank, similarity)
        }
        None => (0.0, 0.0),
    };
    Scored {
        physician: p,
        rank,
        similarity,
    }
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn compare_sort(a: &Physician, b: &Physician, sort: SortSpec) -> Ordering {
    match sort.by {
        SortBy::Name => directed(
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name)),
            sort.order,
        ),
        // NULLS LAST in both directions.
        SortBy::Specialty => match (
            a.primary_specialty_description(),
            b.primary_specialty_description(),
        ) {
            (Some(x), Some(y)) => directed(x.cmp(y), sort.order),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn compare(a: &Scored<'_>, b: &Scored<'_>, plan: &SearchPlan) -> Ordering {
    let mut ord = Ordering::Equal;
    if plan.text.is_some() {
        ord = b
            .rank
            .partial_cmp(&a.rank)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(Ordering::Equal)
            });
    }
    ord = match plan.sort {
        Some(sort) => ord.then_with(|| compare_sort(a.physician, b.physician, sort)),
        None if plan.text.is_none() => {
            ord.then_with(|| a.physician.last_name.cmp(&b.physician.last_name))
        }
        None => ord,
    };
    ord.then_with(|| a.physician.npi.cmp(&b.physician.npi))
}

#[async_trait]
impl PhysicianStore for InMemoryStore {
    async fn search_physicians(&self, plan: &SearchPlan) -> StoreResult<Vec<Physician>> {
        let map = read(&self.physicians)?;
        let mut scored: Vec<Scored<'_>> = map
            .values()
            .filter(|p| matches_plan(p, plan))
            .map(|p| score(p, plan))
            .collect();
        scored.sort_by(|a, b| compare(a, b, plan));

        Ok(scored
            .into_iter()
            .skip(plan.offset as usize)
            .take(plan.limit as usize)
            .map(|s| s.physician.clone())
            .collect())
    }

    async fn count_physicians(&self, plan: &SearchPlan) -> StoreResult<i64> {
        let map = read(&self.physicians)?;
        Ok(map.values().filter(|p| matches_plan(p, plan)).count() as i64)
    }

    async fn get_physician(&self, npi: &str) -> StoreResult<Option<Physician>> {
        Ok(read(&self.physicians)?.get(npi).cloned())
    }

    async fn insert_physician(&self, physician: &Physician) -> StoreResult<bool> {
        let mut map = write(&self.physicians)?;
        if map.contains_key(&physician.npi) {
            return Ok(false);
        }
        map.insert(physician.npi.clone(), physician.clone());
        Ok(true)
    }

    async fn upsert_physician(&self, physician: &Physician) -> StoreResult<()> {
        let mut map = write(&self.physicians)?;
        let mut record = physician.clone();
        if let Some(existing) = map.get(&physician.npi) {
            record.created_at = existing.created_at;
            record.updated_at = Utc::now();
        }
        map.insert(record.npi.clone(), record);
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut users = write(&self.users)?;
        if users.contains_key(&user.user_id) {
            return Err(StoreError::Conflict(format!("user {}", user.user_id)));
        }
        let now = Utc::now();
        let record = User {
            user_id: user.user_id.clone(),
            platform_role: user.platform_role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        users.insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.get(user_id).cloned())
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> StoreResult<Option<User>> {
        let mut users = write(&self.users)?;
        let Some(user) = users.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(role) = update.platform_role {
            user.platform_role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let removed = write(&self.users)?.remove(user_id).is_some();
        if removed {
            write(&self.memberships)?.retain(|m| m.user_id != user_id);
        }
        Ok(removed)
    }

    async fn insert_organization(&self, name: &str, slug: &str) -> StoreResult<Organization> {
        let mut orgs = write(&self.organizations)?;
        if orgs.values().any(|o| o.slug == slug) {
            return Err(StoreError::Conflict(format!("organization slug {}", slug)));
        }
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        orgs.insert(org.id, org.clone());
        Ok(org)
    }

    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(read(&self.organizations)?.get(&id).cloned())
    }

    async fn update_organization(
        &self,
        id: Uuid,
        update: &OrganizationUpdate,
    ) -> StoreResult<Option<Organization>> {
        let mut orgs = write(&self.organizations)?;
        if let Some(ref slug) = update.slug {
            if orgs.values().any(|o| o.id != id && &o.slug == slug) {
                return Err(StoreError::Conflict(format!("organization slug {}", slug)));
            }
        }
        let Some(org) = orgs.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(ref name) = update.name {
            org.name = name.clone();
        }
        if let Some(ref slug) = update.slug {
            org.slug = slug.clone();
        }
        org.updated_at = Utc::now();
        Ok(Some(org.clone()))
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<bool> {
        let removed = write(&self.organizations)?.remove(&id).is_some();
        if removed {
            write(&self.memberships)?.retain(|m| m.organization_id != id);
        }
        Ok(removed)
    }

    async fn list_user_organizations(&self, user_id: &str) -> StoreResult<Vec<Organization>> {
        let memberships = read(&self.memberships)?;
        let orgs = read(&self.organizations)?;
        let mut out: Vec<Organization> = memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| orgs.get(&m.organization_id).cloned())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn upsert_membership(
        &self,
        organization_id: Uuid,
        user_id: &str,
        role: UserRole,
    ) -> StoreResult<OrganizationMembership> {
        if !read(&self.organizations)?.contains_key(&organization_id) {
            return Err(StoreError::MissingReference(format!(
                "organization {}",
                organization_id
            )));
        }
        if !read(&self.users)?.contains_key(user_id) {
            return Err(StoreError::MissingReference(format!("user {}", user_id)));
        }

        let mut memberships = write(&self.memberships)?;
        let now = Utc::now();
        if let Some(existing) = memberships
            .iter_mut()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
        {
            existing.role = role;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let membership = OrganizationMembership {
            user_id: user_id.to_string(),
            organization_id,
            role,
            created_at: now,
            updated_at: now,
        };
        memberships.push(membership.clone());
        Ok(membership)
    }

    async fn remove_membership(&self, organization_id: Uuid, user_id: &str) -> StoreResult<bool> {
        let mut memberships = write(&self.memberships)?;
        let before = memberships.len();
        memberships.retain(|m| !(m.organization_id == organization_id && m.user_id == user_id));
        Ok(memberships.len() < before)
    }

    async fn list_memberships(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>> {
        let mut out: Vec<OrganizationMembership> = read(&self.memberships)?
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(out)
    }
}
