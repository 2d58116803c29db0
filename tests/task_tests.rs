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

fn request(method: &str, uri: &str, cookies: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Forwarded-For", "127.0.0.1")
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

fn cookies_from(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login_as(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": username, "password": password})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    cookies_from(&response)
}

async fn register_and_login(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"username": username, "password": "secret123"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    login_as(app, username, "secret123").await
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

async fn create_task(app: &Router, session: &str, payload: Value) -> Response<Body> {
    app.clone()
        .oneshot(request("POST", "/api/tasks", Some(session), Some(payload)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_employee_creates_and_lists_tasks() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = create_task(
        &app,
        &session,
        json!({
            "title": "Write weekly report",
            "description": "Numbers for the sprint",
            "date": today(),
            "priority": "high",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Write weekly report");
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(body["data"]["priority"], "high");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/tasks", Some(&session), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_manager_cannot_write_tasks() {
    let app = spawn_app().await;
    let session = login_as(&app, "admin", "admin123").await;

    let response = create_task(
        &app,
        &session,
        json!({"title": "Managerial task", "date": today()}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error"], "无权限");
}

#[tokio::test]
async fn test_task_date_window() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "bob").await;

    let today = chrono::Utc::now().date_naive();

    // Five days back is the oldest accepted date.
    let oldest = (today - chrono::Duration::days(5)).format("%Y-%m-%d").to_string();
    let response = create_task(&app, &session, json!({"title": "Backfill", "date": oldest})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let too_old = (today - chrono::Duration::days(6)).format("%Y-%m-%d").to_string();
    let response = create_task(&app, &session, json!({"title": "Too old", "date": too_old})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let tomorrow = (today + chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
    let response = create_task(&app, &session, json!({"title": "Future", "date": tomorrow})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = create_task(
        &app,
        &session,
        json!({"title": "Bad format", "date": "28-08-2026"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_priority_rejected() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "carol").await;

    let response = create_task(
        &app,
        &session,
        json!({"title": "Task", "date": today(), "priority": "urgent"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_employee_sees_only_own_tasks_manager_sees_all() {
    let app = spawn_app().await;

    let session_a = register_and_login(&app, "dave").await;
    let session_b = register_and_login(&app, "erin").await;

    create_task(&app, &session_a, json!({"title": "Dave's task", "date": today()})).await;
    create_task(&app, &session_b, json!({"title": "Erin's task", "date": today()})).await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/tasks", Some(&session_a), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let tasks = body["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Dave's task");

    let manager = login_as(&app, "admin", "admin123").await;
    let response = app
        .clone()
        .oneshot(request("GET", "/api/tasks", Some(&manager), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_and_delete_are_owner_only() {
    let app = spawn_app().await;

    let session_a = register_and_login(&app, "frank").await;
    let session_b = register_and_login(&app, "grace").await;

    let response = create_task(
        &app,
        &session_a,
        json!({"title": "Frank's task", "date": today()}),
    )
    .await;
    let body = body_json(response).await;
    let task_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/tasks/{task_id}"),
            Some(&session_b),
            Some(json!({"title": "Hijacked", "date": today()})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/tasks/{task_id}"),
            Some(&session_b),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner can do both.
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/tasks/{task_id}"),
            Some(&session_a),
            Some(json!({"title": "Renamed", "date": today(), "priority": "low"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Renamed");

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/tasks/{task_id}"),
            Some(&session_a),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/tasks/{task_id}"),
            Some(&session_a),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_csv_export() {
    let app = spawn_app().await;

    let session = register_and_login(&app, "henry").await;
    create_task(
        &app,
        &session,
        json!({"title": "Quarterly, review", "date": today(), "priority": "high"}),
    )
    .await;

    let manager = login_as(&app, "admin", "admin123").await;
    let response = app
        .clone()
        .oneshot(request("GET", "/api/export-csv", Some(&manager), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(csv.starts_with("日期,标题,描述,优先级,状态,负责人"));
    assert!(csv.contains("\"Quarterly, review\""));
    assert!(csv.contains("高"));
    assert!(csv.contains("进行中"));
    assert!(csv.contains("henry"));
}

#[tokio::test]
async fn test_csv_export_date_range() {
    let app = spawn_app().await;

    let session = register_and_login(&app, "iris").await;
    let today = chrono::Utc::now().date_naive();
    let yesterday = (today - chrono::Duration::days(1)).format("%Y-%m-%d").to_string();

    create_task(
        &app,
        &session,
        json!({"title": "Old entry", "date": yesterday}),
    )
    .await;
    create_task(
        &app,
        &session,
        json!({"title": "Fresh entry", "date": today.format("%Y-%m-%d").to_string()}),
    )
    .await;

    let manager = login_as(&app, "admin", "admin123").await;
    let uri = format!(
        "/api/export-csv?start_date={}&end_date={}",
        today.format("%Y-%m-%d"),
        today.format("%Y-%m-%d"),
    );
    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some(&manager), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(csv.contains("Fresh entry"));
    assert!(!csv.contains("Old entry"));
}
