// libs/auth-cell/tests/integration_test.rs
use std::time::Duration;

use axum::{body::Body, middleware, routing::get, Json, Router};
use http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_cell::{
    admin_gate, auth_routes, reception_gate, AuthCellState, SessionRecord, SessionService,
};
use role_directory_cell::{Role, RoleDirectoryService, RoleRecord};
use shared_store::Collection;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestCell {
    app: Router,
    roles: RoleDirectoryService,
}

/// The auth API under `/api` plus the two gated page trees, mounted the way
/// the binary mounts them.
fn test_cell() -> TestCell {
    let config = TestConfig::default().to_arc();
    let roles = RoleDirectoryService::new(Collection::<RoleRecord>::new("roles"));
    let sessions = SessionService::new(
        config.clone(),
        Collection::<SessionRecord>::new("sessions"),
        roles.clone(),
    );
    let state = AuthCellState {
        config,
        sessions,
        roles: roles.clone(),
    };

    let reception_pages = Router::new()
        .route("/", get(|| async { Json(json!({ "page": "reception" })) }))
        .layer(middleware::from_fn_with_state(state.clone(), reception_gate));
    let admin_pages = Router::new()
        .route("/", get(|| async { Json(json!({ "page": "admin" })) }))
        .layer(middleware::from_fn_with_state(state.clone(), admin_gate));

    let app = Router::new()
        .nest("/api", auth_routes(state))
        .nest("/reception", reception_pages)
        .nest("/admin", admin_pages);
    TestCell { app, roles }
}

fn token_for(user: &TestUser) -> String {
    JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, None)
}

fn set_token_request(token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/setToken")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "token": token }).to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Runs setToken and hands back the `name=value` pair for the Cookie header.
async fn log_in(cell: &TestCell, user: &TestUser) -> String {
    let response = cell
        .app
        .clone()
        .oneshot(set_token_request(&token_for(user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("setToken should set the session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

// =====================================================================================
// COOKIE LIFECYCLE
// =====================================================================================

#[tokio::test]
async fn set_token_issues_an_http_only_session_cookie() {
    let cell = test_cell();
    let user = TestUser::patient("asha@example.com");

    let response = cell
        .app
        .oneshot(set_token_request(&token_for(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("session_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=86400"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user_id"], json!(user.id));
}

#[tokio::test]
async fn an_invalid_token_cannot_open_a_session() {
    let cell = test_cell();

    let response = cell
        .app
        .oneshot(set_token_request("three.broken.parts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn logout_clears_the_cookie_whatever_the_session_state() {
    let cell = test_cell();

    // Without any cookie at all.
    let response = cell
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    // With a live session; a repeat with the now-stale cookie still works.
    let user = TestUser::patient("asha@example.com");
    let cookie = log_in(&cell, &user).await;
    for _ in 0..2 {
        let response = cell
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = cell
        .app
        .oneshot(get_with_cookie("/api/session", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn the_session_endpoint_reports_the_live_role() {
    let cell = test_cell();
    let user = TestUser::patient("asha@example.com");
    let cookie = log_in(&cell, &user).await;

    let response = cell
        .app
        .clone()
        .oneshot(get_with_cookie("/api/session", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["role"], json!("patient"));

    // A promotion shows up on the very next request.
    cell.roles.set_role(&user.id, Role::Admin).await.unwrap();
    let response = cell
        .app
        .oneshot(get_with_cookie("/api/session", &cookie))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["role"], json!("admin"));
}

// =====================================================================================
// PAGE GATES
// =====================================================================================

#[tokio::test]
async fn anonymous_visitors_are_routed_to_login() {
    let cell = test_cell();

    for uri in ["/reception", "/admin"] {
        let response = cell
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
    }
}

#[tokio::test]
async fn a_fabricated_cookie_does_not_pass_the_gate() {
    let cell = test_cell();
    // A real signed token, but no session was ever opened for it.
    let cookie = format!(
        "session_token={}",
        token_for(&TestUser::receptionist("front@example.com"))
    );

    let response = cell
        .app
        .oneshot(get_with_cookie("/reception", &cookie))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn patients_are_turned_away_from_both_page_trees() {
    let cell = test_cell();
    let cookie = log_in(&cell, &TestUser::patient("asha@example.com")).await;

    for uri in ["/reception", "/admin"] {
        let response = cell
            .app
            .clone()
            .oneshot(get_with_cookie(uri, &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}

#[tokio::test]
async fn receptionists_reach_reception_but_not_admin() {
    let cell = test_cell();
    let user = TestUser::receptionist("front@example.com");
    cell.roles
        .set_role(&user.id, Role::Receptionist)
        .await
        .unwrap();
    let cookie = log_in(&cell, &user).await;

    let response = cell
        .app
        .clone()
        .oneshot(get_with_cookie("/reception", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["page"], json!("reception"));

    let response = cell
        .app
        .oneshot(get_with_cookie("/admin", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn admins_pass_both_gates() {
    let cell = test_cell();
    let user = TestUser::admin("admin@example.com");
    cell.roles.set_role(&user.id, Role::Admin).await.unwrap();
    let cookie = log_in(&cell, &user).await;

    for (uri, page) in [("/reception", "reception"), ("/admin", "admin")] {
        let response = cell
            .app
            .clone()
            .oneshot(get_with_cookie(uri, &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["page"], json!(page));
    }
}

#[tokio::test]
async fn a_forced_logout_bounces_the_next_gated_request() {
    let cell = test_cell();
    let user = TestUser::receptionist("front@example.com");
    cell.roles
        .set_role(&user.id, Role::Receptionist)
        .await
        .unwrap();
    let cookie = log_in(&cell, &user).await;

    let response = cell
        .app
        .clone()
        .oneshot(get_with_cookie("/reception", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    cell.roles.request_logout(&user.id).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let response = cell
            .app
            .clone()
            .oneshot(get_with_cookie("/reception", &cookie))
            .await
            .unwrap();
        if response.status() == StatusCode::SEE_OTHER {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "the forced logout never revoked the session"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Consumed, not latched: the flag is down and a fresh login works.
    assert!(!cell.roles.record_of(&user.id).await.force_logout);
    let cookie = log_in(&cell, &user).await;
    let response = cell
        .app
        .oneshot(get_with_cookie("/reception", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
