use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use worklog::config::Config;

const UA: &str = "Mozilla/5.0 (X11; Linux x86_64)";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let state = worklog::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    worklog::api::router(state)
}

fn request(method: &str, uri: &str, ip: &str, cookies: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Forwarded-For", ip)
        .header(header::USER_AGENT, UA);

    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }

    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Cookie name=value pairs from every Set-Cookie header of a response.
fn cookies_from(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(ToString::to_string)
        .collect()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str, password: &str, ip: &str) {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            ip,
            None,
            Some(json!({
                "username": username,
                "password": password,
                "display_name": username,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

async fn login(app: &Router, ip: &str, payload: Value) -> Response<Body> {
    app.clone()
        .oneshot(request("POST", "/api/auth/login", ip, None, Some(payload)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_and_login() {
    let app = spawn_app().await;
    let ip = "203.0.113.10";

    register(&app, "alice", "secret123", ip).await;

    let response = login(
        &app,
        ip,
        json!({"username": "alice", "password": "secret123"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!cookies_from(&response).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "employee");
}

#[tokio::test]
async fn test_register_duplicate_username_rejected() {
    let app = spawn_app().await;
    let ip = "203.0.113.11";

    register(&app, "dupe", "secret123", ip).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            ip,
            None,
            Some(json!({"username": "dupe", "password": "secret123"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = spawn_app().await;
    let ip = "203.0.113.12";

    register(&app, "bob", "secret123", ip).await;

    let response = login(&app, ip, json!({"username": "bob", "password": "nope"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(
        &app,
        ip,
        json!({"username": "nobody", "password": "whatever"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lockout_after_five_failures() {
    let app = spawn_app().await;
    let ip = "203.0.113.13";

    register(&app, "carol", "secret123", ip).await;

    for _ in 0..5 {
        let response = login(&app, ip, json!({"username": "carol", "password": "bad"})).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Correct password is refused while the lock is active.
    let response = login(
        &app,
        ip,
        json!({"username": "carol", "password": "secret123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn test_failure_counter_resets_on_success() {
    let app = spawn_app().await;
    let ip = "203.0.113.14";

    register(&app, "dave", "secret123", ip).await;

    // Four failures do not lock; the successful fifth attempt resets the
    // counter, so four more failures still leave room for a success.
    for round in 0..2 {
        for _ in 0..4 {
            let response = login(&app, ip, json!({"username": "dave", "password": "bad"})).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "round {round}");
        }

        let response = login(
            &app,
            ip,
            json!({"username": "dave", "password": "secret123"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK, "round {round}");
    }
}

#[tokio::test]
async fn test_seeded_manager_login() {
    let app = spawn_app().await;

    let response = login(
        &app,
        "127.0.0.1",
        json!({"username": "admin", "password": "admin123"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "manager");
}

#[tokio::test]
async fn test_remember_me_issues_auto_login_cookie() {
    let app = spawn_app().await;
    let ip = "127.0.0.1";

    register(&app, "erin", "secret123", ip).await;

    let response = login(
        &app,
        ip,
        json!({"username": "erin", "password": "secret123", "remember_me": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = cookies_from(&response);
    let auto_login = cookies
        .iter()
        .find(|c| c.starts_with("auto_login="))
        .expect("auto_login cookie missing");

    // The cookie alone logs in from a trusted IP.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/auto-login",
            ip,
            Some(auto_login),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "erin");
}

#[tokio::test]
async fn test_login_without_remember_me_issues_no_cookie() {
    let app = spawn_app().await;
    let ip = "127.0.0.1";

    register(&app, "frank", "secret123", ip).await;

    let response = login(
        &app,
        ip,
        json!({"username": "frank", "password": "secret123"}),
    )
    .await;

    assert!(
        !cookies_from(&response)
            .iter()
            .any(|c| c.starts_with("auto_login="))
    );
}

#[tokio::test]
async fn test_password_change_invalidates_auto_login_token() {
    let app = spawn_app().await;
    let ip = "127.0.0.1";

    register(&app, "grace", "secret123", ip).await;

    let response = login(
        &app,
        ip,
        json!({"username": "grace", "password": "secret123", "remember_me": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = cookies_from(&response);
    let auto_login = cookies
        .iter()
        .find(|c| c.starts_with("auto_login="))
        .expect("auto_login cookie missing")
        .clone();
    let session = cookies.join("; ");

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/auth/password",
            ip,
            Some(&session),
            Some(json!({"current_password": "secret123", "new_password": "newsecret9"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The old token no longer matches the stored hash.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/auto-login",
            ip,
            Some(&auto_login),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_probe() {
    let app = spawn_app().await;
    let ip = "127.0.0.1";

    register(&app, "henry", "secret123", ip).await;

    // No cookies at all.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/auth/status", ip, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["logged_in"], false);
    assert_eq!(body["data"]["auto_login_available"], false);

    let response = login(
        &app,
        ip,
        json!({"username": "henry", "password": "secret123", "remember_me": true}),
    )
    .await;
    let cookies = cookies_from(&response);
    let auto_login = cookies
        .iter()
        .find(|c| c.starts_with("auto_login="))
        .unwrap()
        .clone();
    let session = cookies.join("; ");

    // With the session cookie the probe reports a live login.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/auth/status", ip, Some(&session), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["logged_in"], true);
    assert_eq!(body["data"]["user"]["username"], "henry");

    // With only the auto-login cookie the probe offers auto-login but
    // performs none.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/auth/status",
            ip,
            Some(&auto_login),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["logged_in"], false);
    assert_eq!(body["data"]["auto_login_available"], true);
    assert_eq!(body["data"]["username"], "henry");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = spawn_app().await;
    let ip = "203.0.113.15";

    register(&app, "iris", "secret123", ip).await;

    let response = login(
        &app,
        ip,
        json!({"username": "iris", "password": "secret123"}),
    )
    .await;
    let session = cookies_from(&response).join("; ");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/logout",
            ip,
            Some(&session),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/devices", ip, Some(&session), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = spawn_app().await;
    let ip = "203.0.113.16";

    for (method, uri) in [
        ("GET", "/api/devices"),
        ("GET", "/api/tasks"),
        ("GET", "/api/security-events"),
        ("GET", "/api/users"),
    ] {
        let response = app
            .clone()
            .oneshot(request(method, uri, ip, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}
