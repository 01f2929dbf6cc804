//! Storage abstraction for Physician Finder.
//!
//! [`PhysicianStore`] covers the physician catalog (search, count, lookup,
//! import writes); [`AccountStore`] covers users, organizations and
//! memberships. Actions are written against these traits, so the Postgres
//! store and the in-memory store are interchangeable.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    NewUser, Organization, OrganizationMembership, OrganizationUpdate, Physician,
    User, UserRole, UserUpdate,
};
use crate::search::SearchPlan;

/// Errors a store can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key is already taken (primary key, slug).
    #[error("duplicate key: {0}")]
    Conflict(String),
    /// The referenced row does not exist (e.g. membership for a missing user).
    #[error("missing reference: {0}")]
    MissingReference(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read and write access to physician records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`search_physicians`](PhysicianStore::search_physicians) | One ordered page of a plan |
/// | [`count_physicians`](PhysicianStore::count_physicians) | Rows matching a plan's predicate |
/// | [`get_physician`](PhysicianStore::get_physician) | Lookup by NPI |
/// | [`insert_physician`](PhysicianStore::insert_physician) | Insert unless the NPI exists |
/// | [`upsert_physician`](PhysicianStore::upsert_physician) | Insert or replace by NPI |
#[async_trait]
pub trait PhysicianStore: Send + Sync {
    /// Rows matching the plan's predicate, ordered, limited to the plan's page.
    async fn search_physicians(&self, plan: &SearchPlan) -> StoreResult<Vec<Physician>>;

    /// Number of rows matching the plan's predicate, ignoring page and limit.
    async fn count_physicians(&self, plan: &SearchPlan) -> StoreResult<i64>;

    async fn get_physician(&self, npi: &str) -> StoreResult<Option<Physician>>;

    /// Returns `false` when a row with the same NPI already exists.
    async fn insert_physician(&self, physician: &Physician) -> StoreResult<bool>;

    async fn upsert_physician(&self, physician: &Physician) -> StoreResult<()>;
}

/// Users, organizations, and memberships.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User>;

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> StoreResult<Option<User>>;

    /// Returns `false` when no such user existed. Memberships cascade.
    async fn delete_user(&self, user_id: &str) -> StoreResult<bool>;

    /// `slug` must already be resolved by the caller.
    async fn insert_organization(&self, name: &str, slug: &str) -> StoreResult<Organization>;

    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;

    async fn update_organization(
        &self,
        id: Uuid,
        update: &OrganizationUpdate,
    ) -> StoreResult<Option<Organization>>;

    /// Returns `false` when no such organization existed. Memberships cascade.
    async fn delete_organization(&self, id: Uuid) -> StoreResult<bool>;

    /// Organizations the user belongs to, ordered by name.
    async fn list_user_organizations(&self, user_id: &str) -> StoreResult<Vec<Organization>>;

    /// Adds a member or changes an existing member's role.
    async fn upsert_membership(
        &self,
        organization_id: Uuid,
        user_id: &str,
        role: UserRole,
    ) -> StoreResult<OrganizationMembership>;

    async fn remove_membership(&self, organization_id: Uuid, user_id: &str) -> StoreResult<bool>;

    /// Memberships of an organization, ordered by user id.
    async fn list_memberships(&self, organization_id: Uuid)
        -> StoreResult<Vec<OrganizationMembership>>;
}

/// Both store halves, as held by the HTTP server.
pub trait Store: PhysicianStore + AccountStore {}

impl<T: PhysicianStore + AccountStore> Store for T {}
