//! JSON HTTP API.
//!
//! Exposes the physician and account actions over HTTP. Every response body
//! is an action state:
//!
//! ```json
//! { "isSuccess": true, "message": "Physician retrieved successfully", "data": { ... } }
//! { "isSuccess": false, "message": "Physician not found", "code": "not_found" }
//! ```
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/physicians/search` | Search with flat query parameters |
//! | `POST` | `/physicians/search` | Search with a JSON body |
//! | `GET`  | `/physicians/{npi}` | Physician by NPI |
//! | `POST` | `/users` | Create a user |
//! | `GET` `PATCH` `DELETE` | `/users/{user_id}` | Read, update, delete a user |
//! | `POST` | `/users/{user_id}/ensure` | Get or create a user |
//! | `GET`  | `/users/{user_id}/organizations` | Organizations of a user |
//! | `POST` | `/organizations` | Create an organization |
//! | `GET` `PATCH` `DELETE` | `/organizations/{id}` | Read, update, delete an organization |
//! | `GET`  | `/organizations/{id}/members` | Members of an organization |
//! | `PUT` `DELETE` | `/organizations/{id}/members/{user_id}` | Add/update or remove a member |
//!
//! # Status codes
//!
//! `200` on success (`201` for creates), `400` for validation failures,
//! `404` not found, `409` conflict, `500` when the store is unavailable.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the finder can be
//! embedded on partner sites.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use physician_finder_core::accounts;
use physician_finder_core::action::{ActionState, FailureKind};
use physician_finder_core::models::{
    NewOrganization, NewUser, Organization, OrganizationMembership, OrganizationUpdate, Physician,
    User, UserRole, UserUpdate,
};
use physician_finder_core::physicians;
use physician_finder_core::search::{
    SearchFilters, SearchParams, SearchResults, SearchSettings, SortBy, SortOrder,
};
use physician_finder_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::pg_store::PgStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    settings: SearchSettings,
}

/// Starts the HTTP server on `[server].bind`, backed by Postgres.
///
/// Runs until the process receives Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let app = build_router(store, config.search.settings());

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Physician Finder listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

/// Builds the router over any store. Tests drive it with the in-memory store.
pub fn build_router(store: Arc<dyn Store>, settings: SearchSettings) -> Router {
    let state = AppState { store, settings };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/physicians/search",
            get(handle_search_query).post(handle_search_body),
        )
        .route("/physicians/{npi}", get(handle_get_physician))
        .route("/users", post(handle_create_user))
        .route(
            "/users/{user_id}",
            get(handle_get_user)
                .patch(handle_update_user)
                .delete(handle_delete_user),
        )
        .route("/users/{user_id}/ensure", post(handle_ensure_user))
        .route(
            "/users/{user_id}/organizations",
            get(handle_user_organizations),
        )
        .route("/organizations", post(handle_create_organization))
        .route(
            "/organizations/{id}",
            get(handle_get_organization)
                .patch(handle_update_organization)
                .delete(handle_delete_organization),
        )
        .route("/organizations/{id}/members", get(handle_list_members))
        .route(
            "/organizations/{id}/members/{user_id}",
            put(handle_put_member).delete(handle_delete_member),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Responses ============

/// An action state rendered as an HTTP response.
struct ActionResponse<T> {
    state: ActionState<T>,
    created: bool,
}

impl<T> From<ActionState<T>> for ActionResponse<T> {
    fn from(state: ActionState<T>) -> Self {
        Self {
            state,
            created: false,
        }
    }
}

impl<T> ActionResponse<T> {
    fn created(state: ActionState<T>) -> Self {
        Self {
            state,
            created: true,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        ActionState::validation(message).into()
    }
}

fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Validation => StatusCode::BAD_REQUEST,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Conflict => StatusCode::CONFLICT,
        FailureKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        let status = match self.state.failure_kind() {
            None if self.created => StatusCode::CREATED,
            None => StatusCode::OK,
            Some(kind) => status_for(kind),
        };
        (status, Json(self.state)).into_response()
    }
}

/// Parses a path segment as an organization id.
fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("Invalid organization id: '{}'", raw))
}

/// Parses an optional JSON body; an empty body yields `T::default()`.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, String> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {}", e))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Physicians ============

/// Flat query-string form of [`SearchParams`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    query: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
    sort_by: Option<SortBy>,
    sort_order: Option<SortOrder>,
}

impl From<SearchQuery> for SearchParams {
    fn from(q: SearchQuery) -> Self {
        let filters = if q.state.is_some() || q.zip.is_some() {
            Some(SearchFilters {
                state: q.state,
                zip: q.zip,
            })
        } else {
            None
        };
        SearchParams {
            query: q.query,
            filters,
            page: q.page,
            limit: q.limit,
            sort_by: q.sort_by,
            sort_order: q.sort_order,
        }
    }
}

async fn handle_search_query(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ActionResponse<SearchResults> {
    let params: SearchParams = match query {
        Ok(Query(q)) => q.into(),
        Err(rejection) => return ActionResponse::invalid(rejection.body_text()),
    };
    physicians::search_physicians(state.store.as_ref(), &params, &state.settings)
        .await
        .into()
}

async fn handle_search_body(
    State(state): State<AppState>,
    body: Result<Json<SearchParams>, JsonRejection>,
) -> ActionResponse<SearchResults> {
    let params = match body {
        Ok(Json(p)) => p,
        Err(rejection) => return ActionResponse::invalid(rejection.body_text()),
    };
    physicians::search_physicians(state.store.as_ref(), &params, &state.settings)
        .await
        .into()
}

async fn handle_get_physician(
    State(state): State<AppState>,
    Path(npi): Path<String>,
) -> ActionResponse<Physician> {
    physicians::get_physician_by_npi(state.store.as_ref(), &npi)
        .await
        .into()
}

// ============ Users ============

async fn handle_create_user(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ActionResponse<User> {
    let user = match body {
        Ok(Json(u)) => u,
        Err(rejection) => return ActionResponse::invalid(rejection.body_text()),
    };
    ActionResponse::created(accounts::create_user(state.store.as_ref(), &user).await)
}

async fn handle_get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ActionResponse<User> {
    accounts::get_user(state.store.as_ref(), &user_id).await.into()
}

async fn handle_update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<UserUpdate>, JsonRejection>,
) -> ActionResponse<User> {
    let update = match body {
        Ok(Json(u)) => u,
        Err(rejection) => return ActionResponse::invalid(rejection.body_text()),
    };
    accounts::update_user(state.store.as_ref(), &user_id, &update)
        .await
        .into()
}

async fn handle_delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ActionResponse<()> {
    accounts::delete_user(state.store.as_ref(), &user_id)
        .await
        .into()
}

/// Optional body of `POST /users/{user_id}/ensure`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnsureUserBody {
    #[serde(default)]
    platform_role: Option<UserRole>,
}

async fn handle_ensure_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> ActionResponse<User> {
    let defaults: EnsureUserBody = match optional_body(&body) {
        Ok(b) => b,
        Err(message) => return ActionResponse::invalid(message),
    };
    accounts::get_or_create_user(state.store.as_ref(), &user_id, defaults.platform_role)
        .await
        .into()
}

async fn handle_user_organizations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ActionResponse<Vec<Organization>> {
    accounts::list_user_organizations(state.store.as_ref(), &user_id)
        .await
        .into()
}

// ============ Organizations ============

async fn handle_create_organization(
    State(state): State<AppState>,
    body: Result<Json<NewOrganization>, JsonRejection>,
) -> ActionResponse<Organization> {
    let input = match body {
        Ok(Json(o)) => o,
        Err(rejection) => return ActionResponse::invalid(rejection.body_text()),
    };
    ActionResponse::created(accounts::create_organization(state.store.as_ref(), &input).await)
}

async fn handle_get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResponse<Organization> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::invalid(message),
    };
    accounts::get_organization(state.store.as_ref(), id)
        .await
        .into()
}

async fn handle_update_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<OrganizationUpdate>, JsonRejection>,
) -> ActionResponse<Organization> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::invalid(message),
    };
    let update = match body {
        Ok(Json(u)) => u,
        Err(rejection) => return ActionResponse::invalid(rejection.body_text()),
    };
    accounts::update_organization(state.store.as_ref(), id, &update)
        .await
        .into()
}

async fn handle_delete_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResponse<()> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::invalid(message),
    };
    accounts::delete_organization(state.store.as_ref(), id)
        .await
        .into()
}

async fn handle_list_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResponse<Vec<OrganizationMembership>> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::invalid(message),
    };
    accounts::list_members(state.store.as_ref(), id).await.into()
}

/// Optional body of `PUT /organizations/{id}/members/{user_id}`.
#[derive(Debug, Default, Deserialize)]
struct MemberBody {
    #[serde(default)]
    role: Option<UserRole>,
}

async fn handle_put_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    body: Bytes,
) -> ActionResponse<OrganizationMembership> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::invalid(message),
    };
    let member: MemberBody = match optional_body(&body) {
        Ok(b) => b,
        Err(message) => return ActionResponse::invalid(message),
    };
    accounts::add_member(
        state.store.as_ref(),
        id,
        &user_id,
        member.role.unwrap_or_default(),
    )
    .await
    .into()
}

async fn handle_delete_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> ActionResponse<()> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::invalid(message),
    };
    accounts::remove_member(state.store.as_ref(), id, &user_id)
        .await
        .into()
}
