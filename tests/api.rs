//! HTTP API tests. The router runs over the in-memory store, so no database
//! is needed.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use physician_finder::server::build_router;
use physician_finder_core::models::{Physician, SpecialtyInfo};
use physician_finder_core::search::SearchSettings;
use physician_finder_core::store::memory::InMemoryStore;

fn physician(npi: &str, first: &str, last: &str, state: &str, zip: &str, specialty: &str) -> Physician {
    let mut p = Physician::new(npi, first, last, NaiveDate::from_ymd_opt(2010, 5, 1).unwrap());
    p.address_state = Some(state.to_string());
    p.address_zip5 = Some(zip.to_string());
    p.primary_specialty = Some(SpecialtyInfo {
        taxonomy_code: "207Q00000X".to_string(),
        taxonomy_description: specialty.to_string(),
        license_number: None,
        license_state: None,
        primary_specialty: true,
        board_certified: None,
    });
    p
}

fn app() -> Router {
    let store = InMemoryStore::with_physicians([
        physician("1234567890", "Ana", "Ruiz", "IL", "60601", "Cardiovascular Disease"),
        physician("1588667638", "Wei", "Chen", "IL", "60611", "Family Medicine"),
        physician("1437192200", "Maria", "Lopez", "WI", "53703", "Cardiovascular Disease"),
    ]);
    build_router(Arc::new(store), SearchSettings::default())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_search_by_query_string() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::GET,
        "/physicians/search?query=cardio&state=il",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSuccess"], true);
    assert_eq!(body["data"]["totalCount"], 1);
    assert_eq!(body["data"]["currentPage"], 1);
    assert_eq!(body["data"]["totalPages"], 1);
    assert_eq!(body["data"]["physicians"][0]["npi"], "1234567890");
}

#[tokio::test]
async fn test_search_by_json_body() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/physicians/search",
        Some(json!({
            "filters": { "state": "IL" },
            "limit": 1,
            "page": 2,
            "sortBy": "name",
            "sortOrder": "asc"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalCount"], 2);
    assert_eq!(body["data"]["totalPages"], 2);
    // Chen sorts before Ruiz.
    assert_eq!(body["data"]["physicians"][0]["lastName"], "Ruiz");
}

#[tokio::test]
async fn test_search_rejects_bad_input() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/physicians/search?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["code"], "bad_request");
    assert!(
        body["message"].as_str().unwrap().contains("search.max_limit"),
        "{}",
        body
    );

    let (status, _) = send(&app, Method::GET, "/physicians/search?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/physicians/search?sortBy=rating", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);
}

#[tokio::test]
async fn test_get_physician() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/physicians/1588667638", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Physician retrieved successfully");
    assert_eq!(body["data"]["firstName"], "Wei");

    let (status, body) = send(&app, Method::GET, "/physicians/1999999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Physician not found");
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_user_lifecycle() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/users", Some(json!({ "userId": "user_1" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["platformRole"], "member");

    let (status, body) = send(&app, Method::POST, "/users", Some(json!({ "userId": "user_1" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists.");

    let (status, body) = send(&app, Method::PATCH, "/users/user_1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No update data provided");

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/users/user_1",
        Some(json!({ "platformRole": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["platformRole"], "admin");

    let (status, _) = send(&app, Method::DELETE, "/users/user_1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/users/user_1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/users/user_2/ensure", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], "user_2");

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/user_2/ensure",
        Some(json!({ "platformRole": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Existing users keep their role.
    assert_eq!(body["data"]["platformRole"], "member");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_organizations_and_memberships() {
    let app = app();
    send(&app, Method::POST, "/users", Some(json!({ "userId": "owner" }))).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/organizations",
        Some(json!({ "name": "Lakeshore Health" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "lakeshore-health");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/organizations",
        Some(json!({ "name": "Lakeshore  Health!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Organization slug 'lakeshore-health' is already taken");

    let members = format!("/organizations/{}/members", id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("{}/owner", members),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let (status, _) = send(&app, Method::PUT, &format!("{}/ghost", members), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, &members, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/users/owner/organizations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Lakeshore Health");

    let (status, _) = send(&app, Method::DELETE, &format!("{}/owner", members), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &format!("{}/owner", members), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let org = format!("/organizations/{}", id);
    let (status, _) = send(&app, Method::DELETE, &org, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &org, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_organization_id() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/organizations/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://partner.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
