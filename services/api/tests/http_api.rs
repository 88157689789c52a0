//! End-to-end checks of the `/api/v1/users` routes over the in-memory adapters.

use std::sync::Arc;

use api_lib::web::{api_router, cookies::CookieSettings, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use identity_core::memory::{InMemoryAssetStore, InMemoryStore};
use identity_core::{PasswordSettings, PasswordVerifier, SessionPolicy, TokenSettings, Video};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "identity-test-boundary";

struct TestApp {
    router: Router,
    db: Arc<InMemoryStore>,
}

fn test_app() -> TestApp {
    let db = Arc::new(InMemoryStore::new());
    let assets = Arc::new(InMemoryAssetStore::new("http://assets.test"));
    let passwords = PasswordVerifier::new(PasswordSettings::minimal()).unwrap();
    let settings = TokenSettings {
        access_secret: "access-secret-for-tests".to_string(),
        refresh_secret: "refresh-secret-for-tests".to_string(),
        access_ttl: Duration::minutes(15),
        refresh_ttl: Duration::days(10),
    };
    let state = Arc::new(AppState::new(
        db.clone(),
        assets,
        passwords,
        &settings,
        SessionPolicy::default(),
        CookieSettings { secure: false },
    ));
    TestApp {
        router: api_router(state),
        db,
    }
}

//=========================================================================================
// Request Helpers
//=========================================================================================

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    )
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

async fn register(app: &TestApp, username: &str, email: &str) -> Response {
    let body = multipart_body(
        &[
            ("fullName", "Test User"),
            ("email", email),
            ("username", username),
            ("password", "secret-pass"),
        ],
        &[("avatar", "me.png", b"\x89PNG-avatar")],
    );
    let request = multipart_request("POST", "/api/v1/users/register")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

async fn register_ok(app: &TestApp, username: &str) -> Uuid {
    let response = register(app, username, &format!("{username}@example.com")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["id"].as_str().unwrap().parse().unwrap()
}

async fn login(app: &TestApp, username: &str) -> Value {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": username, "password": "secret-pass" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn authed_get(uri: &str, access_token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap()
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn health_probe_answers() {
    let app = test_app();
    let response = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_returns_sanitized_user_in_envelope() {
    let app = test_app();
    let response = register(&app, "  Alice ", "Alice@Example.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 201);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["username"], "alice");
    assert_eq!(json["data"]["email"], "alice@example.com");
    assert!(json["data"]["avatar"]
        .as_str()
        .unwrap()
        .starts_with("http://assets.test/"));
    assert!(json["data"].get("passwordHash").is_none());
    assert!(json["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn register_without_avatar_is_rejected() {
    let app = test_app();
    let body = multipart_body(
        &[
            ("fullName", "Bob"),
            ("email", "bob@example.com"),
            ("username", "bob"),
            ("password", "pw"),
        ],
        &[],
    );
    let request = multipart_request("POST", "/api/v1/users/register")
        .body(Body::from(body))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn register_with_malformed_email_is_rejected() {
    let app = test_app();
    let response = register(&app, "carol", "not-an-email").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = test_app();
    register_ok(&app, "dave").await;
    let response = register(&app, "DAVE", "other@example.com").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_sets_both_session_cookies() {
    let app = test_app();
    register_ok(&app, "erin").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "email": "ERIN@example.com", "password": "secret-pass" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["username"], "erin");
    assert!(json["data"]["accessToken"].is_string());
    assert!(json["data"]["refreshToken"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized_and_unknown_user_not_found() {
    let app = test_app();
    register_ok(&app, "frank").await;

    let wrong = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "frank", "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "ghost", "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let app = test_app();
    let response = send(
        &app,
        Request::builder()
            .uri("/api/v1/users/current-user")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 401);
    assert_eq!(json["success"], false);

    let forged = send(&app, authed_get("/api/v1/users/current-user", "not.a.jwt")).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_works_as_cookie_or_bearer() {
    let app = test_app();
    register_ok(&app, "grace").await;
    let session = login(&app, "grace").await;
    let access = session["data"]["accessToken"].as_str().unwrap();

    let via_bearer = send(&app, authed_get("/api/v1/users/current-user", access)).await;
    assert_eq!(via_bearer.status(), StatusCode::OK);

    let via_cookie = send(
        &app,
        Request::builder()
            .uri("/api/v1/users/current-user")
            .header(header::COOKIE, format!("accessToken={access}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(via_cookie.status(), StatusCode::OK);
    let json = body_json(via_cookie).await;
    assert_eq!(json["data"]["username"], "grace");
}

#[tokio::test]
async fn refresh_rotates_and_rejects_the_superseded_token() {
    let app = test_app();
    register_ok(&app, "heidi").await;
    let session = login(&app, "heidi").await;
    let first = session["data"]["refreshToken"].as_str().unwrap().to_string();

    let rotated = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/refresh-token")
            .header(header::COOKIE, format!("refreshToken={first}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(rotated.status(), StatusCode::OK);
    assert_eq!(set_cookies(&rotated).len(), 2);
    let json = body_json(rotated).await;
    let second = json["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    let replay = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": first }),
        ),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    let from_body = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": second }),
        ),
    )
    .await;
    assert_eq!(from_body.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_any_token_is_unauthorized() {
    let app = test_app();
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/refresh-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes_refresh() {
    let app = test_app();
    register_ok(&app, "ivan").await;
    let session = login(&app, "ivan").await;
    let access = session["data"]["accessToken"].as_str().unwrap();
    let refresh = session["data"]["refreshToken"].as_str().unwrap();

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/logout")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    let refreshed = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": refresh }),
        ),
    )
    .await;
    assert_eq!(refreshed.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_then_login_with_new_password() {
    let app = test_app();
    register_ok(&app, "judy").await;
    let session = login(&app, "judy").await;
    let access = session["data"]["accessToken"].as_str().unwrap();

    let mut request = json_request(
        "POST",
        "/api/v1/users/change-password",
        json!({ "oldPassword": "secret-pass", "newPassword": "n3w-pass" }),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {access}").parse().unwrap(),
    );
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);

    let old = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "judy", "password": "secret-pass" }),
        ),
    )
    .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "judy", "password": "n3w-pass" }),
        ),
    )
    .await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn update_account_changes_name() {
    let app = test_app();
    register_ok(&app, "ken").await;
    let session = login(&app, "ken").await;
    let access = session["data"]["accessToken"].as_str().unwrap();

    let mut request = json_request(
        "PATCH",
        "/api/v1/users/update-account",
        json!({ "fullName": "Kenneth" }),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {access}").parse().unwrap(),
    );
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["fullName"], "Kenneth");
    assert_eq!(json["data"]["email"], "ken@example.com");
}

#[tokio::test]
async fn avatar_replacement_returns_new_url() {
    let app = test_app();
    register_ok(&app, "lena").await;
    let session = login(&app, "lena").await;
    let access = session["data"]["accessToken"].as_str().unwrap();
    let old_avatar = session["data"]["user"]["avatar"].as_str().unwrap().to_string();

    let body = multipart_body(&[], &[("avatar", "new.png", b"\x89PNG-new")]);
    let request = multipart_request("PATCH", "/api/v1/users/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::from(body))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let new_avatar = json["data"]["avatar"].as_str().unwrap();
    assert_ne!(new_avatar, old_avatar);
}

#[tokio::test]
async fn channel_profile_reflects_viewer_subscription() {
    let app = test_app();
    let channel = register_ok(&app, "mallory").await;
    let viewer = register_ok(&app, "niaj").await;
    app.db.add_subscription(viewer, channel).await;

    let anonymous = send(
        &app,
        Request::builder()
            .uri("/api/v1/users/c/mallory")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::OK);
    let json = body_json(anonymous).await;
    assert_eq!(json["data"]["subscriberCount"], 1);
    assert_eq!(json["data"]["channelsSubscribedToCount"], 0);
    assert_eq!(json["data"]["isSubscribed"], false);

    let session = login(&app, "niaj").await;
    let access = session["data"]["accessToken"].as_str().unwrap();
    let signed_in = send(&app, authed_get("/api/v1/users/c/MALLORY", access)).await;
    let json = body_json(signed_in).await;
    assert_eq!(json["data"]["isSubscribed"], true);

    let missing = send(&app, authed_get("/api/v1/users/c/nobody", access)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn watch_history_lists_videos_with_owner() {
    let app = test_app();
    let owner = register_ok(&app, "olivia").await;
    let viewer = register_ok(&app, "peggy").await;

    let session = login(&app, "peggy").await;
    let access = session["data"]["accessToken"].as_str().unwrap();
    let empty = send(&app, authed_get("/api/v1/users/history", access)).await;
    assert_eq!(body_json(empty).await["data"], json!([]));

    let video_id = Uuid::new_v4();
    app.db
        .add_video(Video {
            id: video_id,
            owner_id: owner,
            title: "Intro".to_string(),
            description: "First upload".to_string(),
            video_url: "http://assets.test/intro.mp4".to_string(),
            thumbnail_url: "http://assets.test/intro.png".to_string(),
            duration_secs: 42.5,
            views: 3,
            is_published: true,
            created_at: Utc::now(),
        })
        .await;
    app.db.record_watch(viewer, video_id).await.unwrap();

    let response = send(&app, authed_get("/api/v1/users/history", access)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Intro");
    assert_eq!(items[0]["owner"]["username"], "olivia");
    assert!(items[0]["owner"].get("email").is_none());
}

#[tokio::test]
async fn login_body_without_password_gets_a_400_envelope() {
    let app = test_app();
    register_ok(&app, "pia").await;

    let response = send(
        &app,
        json_request("POST", "/api/v1/users/login", json!({ "username": "pia" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["success"], false);
    assert!(json["data"].is_null());
    assert!(json["message"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn unreadable_json_bodies_get_a_400_envelope() {
    let app = test_app();
    register_ok(&app, "quinn").await;
    let session = login(&app, "quinn").await;
    let access = session["data"]["accessToken"].as_str().unwrap();

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/v1/users/change-password")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::from("{\"oldPassword\": "))
        .unwrap();
    let response = send(&app, malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    let wrong_type = Request::builder()
        .method("PATCH")
        .uri("/api/v1/users/update-account")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::from("fullName=Quinn"))
        .unwrap();
    let response = send(&app, wrong_type).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["statusCode"], 400);
}
