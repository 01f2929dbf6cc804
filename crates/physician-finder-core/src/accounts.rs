//! User, organization and membership actions.

use uuid::Uuid;

use crate::action::{ActionState, FailureKind};
use crate::models::{
    slugify, NewOrganization, NewUser, Organization, OrganizationMembership, OrganizationUpdate,
    User, UserRole, UserUpdate,
};
use crate::store::{AccountStore, StoreError};

/// Logs a backend error and returns the generic failure for an operation.
///
/// Conflicts and missing references are expected outcomes, so callers
/// handle them before reaching this.
fn backend_failure<T>(operation: &str, e: StoreError, message: &str) -> ActionState<T> {
    tracing::error!(operation, error = %e, "account store error");
    ActionState::unavailable(message)
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub async fn create_user<S: AccountStore + ?Sized>(store: &S, user: &NewUser) -> ActionState<User> {
    if blank(&user.user_id) {
        return ActionState::validation("User ID is required to create user");
    }
    match store.insert_user(user).await {
        Ok(created) => {
            tracing::info!(user_id = %created.user_id, "user created");
            ActionState::success("User created successfully", created)
        }
        Err(StoreError::Conflict(_)) => ActionState::conflict("User already exists."),
        Err(e) => backend_failure("create_user", e, "Failed to create user"),
    }
}

pub async fn get_user<S: AccountStore + ?Sized>(store: &S, user_id: &str) -> ActionState<User> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    match store.get_user(user_id).await {
        Ok(Some(user)) => ActionState::success("User retrieved successfully", user),
        Ok(None) => ActionState::not_found("User not found"),
        Err(e) => backend_failure("get_user", e, "Failed to get user"),
    }
}

/// Returns the user, creating it with `defaults` when it does not exist yet.
///
/// Called after sign-in, so a concurrent create that wins the race is read
/// back instead of reported as a conflict.
pub async fn get_or_create_user<S: AccountStore + ?Sized>(
    store: &S,
    user_id: &str,
    defaults: Option<UserRole>,
) -> ActionState<User> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    let existing = get_user(store, user_id).await;
    if existing.failure_kind() != Some(FailureKind::NotFound) {
        return existing;
    }

    tracing::info!(user_id, "user not found, creating record");
    let new_user = NewUser {
        user_id: user_id.to_string(),
        platform_role: defaults,
    };
    match create_user(store, &new_user).await {
        ActionState::Failure(f) if f.kind == FailureKind::Conflict => {
            get_user(store, user_id).await
        }
        other => other,
    }
}

pub async fn update_user<S: AccountStore + ?Sized>(
    store: &S,
    user_id: &str,
    update: &UserUpdate,
) -> ActionState<User> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    if update.is_empty() {
        return ActionState::validation("No update data provided");
    }
    match store.update_user(user_id, update).await {
        Ok(Some(user)) => ActionState::success("User updated successfully", user),
        Ok(None) => ActionState::not_found("User not found to update"),
        Err(e) => backend_failure("update_user", e, "Failed to update user"),
    }
}

pub async fn delete_user<S: AccountStore + ?Sized>(store: &S, user_id: &str) -> ActionState<()> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    match store.delete_user(user_id).await {
        Ok(true) => {
            tracing::info!(user_id, "user deleted");
            ActionState::success("User deleted successfully", ())
        }
        Ok(false) => ActionState::not_found("User not found to delete"),
        Err(e) => backend_failure("delete_user", e, "Failed to delete user"),
    }
}

/// Creates an organization. The slug defaults to [`slugify`] of the name.
pub async fn create_organization<S: AccountStore + ?Sized>(
    store: &S,
    input: &NewOrganization,
) -> ActionState<Organization> {
    let name = input.name.trim();
    if name.is_empty() {
        return ActionState::validation("Organization name is required");
    }
    let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => slugify(s),
        None => slugify(name),
    };
    if slug.is_empty() {
        return ActionState::validation("Organization slug must contain letters or digits");
    }

    match store.insert_organization(name, &slug).await {
        Ok(org) => {
            tracing::info!(id = %org.id, slug = %org.slug, "organization created");
            ActionState::success("Organization created successfully", org)
        }
        Err(StoreError::Conflict(_)) => {
            ActionState::conflict(format!("Organization slug '{}' is already taken", slug))
        }
        Err(e) => backend_failure("create_organization", e, "Failed to create organization"),
    }
}

pub async fn get_organization<S: AccountStore + ?Sized>(
    store: &S,
    id: Uuid,
) -> ActionState<Organization> {
    match store.get_organization(id).await {
        Ok(Some(org)) => ActionState::success("Organization retrieved successfully", org),
        Ok(None) => ActionState::not_found("Organization not found"),
        Err(e) => backend_failure("get_organization", e, "Failed to get organization"),
    }
}

pub async fn update_organization<S: AccountStore + ?Sized>(
    store: &S,
    id: Uuid,
    update: &OrganizationUpdate,
) -> ActionState<Organization> {
    if update.is_empty() {
        return ActionState::validation("No update data provided");
    }
    let mut normalized = OrganizationUpdate::default();
    if let Some(ref name) = update.name {
        let name = name.trim();
        if name.is_empty() {
            return ActionState::validation("Organization name cannot be empty");
        }
        normalized.name = Some(name.to_string());
    }
    if let Some(ref slug) = update.slug {
        let slug = slugify(slug);
        if slug.is_empty() {
            return ActionState::validation("Organization slug must contain letters or digits");
        }
        normalized.slug = Some(slug);
    }

    match store.update_organization(id, &normalized).await {
        Ok(Some(org)) => ActionState::success("Organization updated successfully", org),
        Ok(None) => ActionState::not_found("Organization not found to update"),
        Err(StoreError::Conflict(_)) => ActionState::conflict(format!(
            "Organization slug '{}' is already taken",
            normalized.slug.unwrap_or_default()
        )),
        Err(e) => backend_failure("update_organization", e, "Failed to update organization"),
    }
}

pub async fn delete_organization<S: AccountStore + ?Sized>(store: &S, id: Uuid) -> ActionState<()> {
    match store.delete_organization(id).await {
        Ok(true) => {
            tracing::info!(%id, "organization deleted");
            ActionState::success("Organization deleted successfully", ())
        }
        Ok(false) => ActionState::not_found("Organization not found to delete"),
        Err(e) => backend_failure("delete_organization", e, "Failed to delete organization"),
    }
}

/// Organizations the user is a member of. An unknown user is not found,
/// a known user without memberships gets an empty list.
pub async fn list_user_organizations<S: AccountStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> ActionState<Vec<Organization>> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    match store.get_user(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ActionState::not_found("User not found"),
        Err(e) => return backend_failure("list_user_organizations", e, "Failed to get organizations"),
    }
    match store.list_user_organizations(user_id).await {
        Ok(orgs) => ActionState::success("Organizations retrieved successfully", orgs),
        Err(e) => backend_failure("list_user_organizations", e, "Failed to get organizations"),
    }
}

/// Adds a member, or changes the role of an existing one.
pub async fn add_member<S: AccountStore + ?Sized>(
    store: &S,
    organization_id: Uuid,
    user_id: &str,
    role: UserRole,
) -> ActionState<OrganizationMembership> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    match store.upsert_membership(organization_id, user_id, role).await {
        Ok(m) => {
            tracing::info!(%organization_id, user_id, role = %m.role, "membership saved");
            ActionState::success("Membership saved successfully", m)
        }
        Err(StoreError::MissingReference(what)) => {
            tracing::debug!(%what, "membership target missing");
            ActionState::not_found("Organization or user not found")
        }
        Err(e) => backend_failure("add_member", e, "Failed to save membership"),
    }
}

pub async fn remove_member<S: AccountStore + ?Sized>(
    store: &S,
    organization_id: Uuid,
    user_id: &str,
) -> ActionState<()> {
    if blank(user_id) {
        return ActionState::validation("User ID is required");
    }
    match store.remove_membership(organization_id, user_id).await {
        Ok(true) => ActionState::success("Membership removed successfully", ()),
        Ok(false) => ActionState::not_found("Membership not found"),
        Err(e) => backend_failure("remove_member", e, "Failed to remove membership"),
    }
}

pub async fn list_members<S: AccountStore + ?Sized>(
    store: &S,
    organization_id: Uuid,
) -> ActionState<Vec<OrganizationMembership>> {
    match store.get_organization(organization_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ActionState::not_found("Organization not found"),
        Err(e) => return backend_failure("list_members", e, "Failed to get members"),
    }
    match store.list_memberships(organization_id).await {
        Ok(members) => ActionState::success("Members retrieved successfully", members),
        Err(e) => backend_failure("list_members", e, "Failed to get members"),
    }
}
