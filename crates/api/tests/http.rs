mod common;

use axum::{
  body::Body,
  http::{header, Method, Request, StatusCode},
  Router,
};
use http_body_util::BodyExt;
use planhive_api::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
  router: Router,
}

struct Reply {
  status: StatusCode,
  set_cookie: Option<String>,
  body: Value,
}

impl TestApp {
  async fn new() -> Self {
    let pool = common::pool().await;
    let state = AppState::new(pool, b"test-secret", 60);

    Self {
      router: planhive_api::router(state),
    }
  }

  async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string())),
      None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = self.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
      .headers()
      .get(header::SET_COOKIE)
      .and_then(|value| value.to_str().ok())
      .map(str::to_owned);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    Reply { status, set_cookie, body }
  }

  async fn register(&self, email: &str) -> Reply {
    self
      .send(
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({ "email": email, "password": common::PASSWORD })),
      )
      .await
  }

  /// Registers and logs in, returning the bearer token.
  async fn sign_up(&self, email: &str) -> String {
    assert_eq!(self.register(email).await.status, StatusCode::CREATED);

    let reply = self
      .send(
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({ "email": email, "password": common::PASSWORD })),
      )
      .await;
    assert_eq!(reply.status, StatusCode::OK);

    reply.body["token"].as_str().unwrap().to_string()
  }
}

#[tokio::test]
async fn health_reports_success() {
  let app = TestApp::new().await;

  let reply = app.send(Method::GET, "/health", None, None).await;

  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["success"], true);
}

#[tokio::test]
async fn registration_and_login_errors_map_to_statuses() {
  let app = TestApp::new().await;

  assert_eq!(app.register("alice@example.com").await.status, StatusCode::CREATED);

  let duplicate = app.register("Alice@Example.com").await;
  assert_eq!(duplicate.status, StatusCode::CONFLICT);
  assert_eq!(duplicate.body["kind"], "CONFLICT");

  let invalid = app.register("not-an-email").await;
  assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
  assert_eq!(invalid.body["kind"], "INVALID_INPUT_ERROR");

  let wrong_password = app
    .send(
      Method::POST,
      "/api/users/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": "wrong password" })),
    )
    .await;
  assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
  assert_eq!(wrong_password.body["kind"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_issues_token_and_cookie() {
  let app = TestApp::new().await;
  app.register("alice@example.com").await;

  let login = app
    .send(
      Method::POST,
      "/api/users/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": common::PASSWORD })),
    )
    .await;
  assert_eq!(login.status, StatusCode::OK);
  let token = login.body["token"].as_str().unwrap();
  assert!(login.set_cookie.unwrap().starts_with(&format!("token={token}")));

  let me = app.send(Method::GET, "/api/users/me", Some(token), None).await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.body["email"], "alice@example.com");
  assert!(me.body.get("password").is_none());

  let request = Request::builder()
    .uri("/api/users/me")
    .header(header::COOKIE, format!("token={token}"))
    .body(Body::empty())
    .unwrap();
  let by_cookie = app.router.clone().oneshot(request).await.unwrap();
  assert_eq!(by_cookie.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_auth_cookie() {
  let app = TestApp::new().await;
  let token = app.sign_up("alice@example.com").await;

  let logout = app.send(Method::POST, "/api/users/logout", Some(&token), None).await;
  assert_eq!(logout.status, StatusCode::OK);
  assert_eq!(logout.body["status"], "success");

  let cookie = logout.set_cookie.unwrap();
  assert!(cookie.starts_with("token=;"));
  assert!(cookie.contains("Max-Age=0"));

  let anonymous = app.send(Method::POST, "/api/users/logout", None, None).await;
  assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_valid_token() {
  let app = TestApp::new().await;

  let anonymous = app.send(Method::GET, "/api/projects", None, None).await;
  assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
  assert_eq!(anonymous.body["kind"], "UNAUTHORIZED");

  let forged = app.send(Method::GET, "/api/users/me", Some("not.a.token"), None).await;
  assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_account_token_is_rejected() {
  let app = TestApp::new().await;
  let token = app.sign_up("alice@example.com").await;

  let deleted = app.send(Method::DELETE, "/api/users/me", Some(&token), None).await;
  assert_eq!(deleted.status, StatusCode::NO_CONTENT);
  assert!(deleted.set_cookie.unwrap().starts_with("token=;"));

  let me = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
  assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn collaboration_flow_over_http() {
  let app = TestApp::new().await;
  let alice = app.sign_up("alice@example.com").await;
  let bob = app.sign_up("bob@example.com").await;
  let carol = app.sign_up("carol@example.com").await;

  let project = app
    .send(Method::POST, "/api/projects", Some(&alice), Some(json!({ "name": "Apollo" })))
    .await;
  assert_eq!(project.status, StatusCode::CREATED);
  let project_id = project.body["id"].as_str().unwrap().to_string();
  let project_uri = format!("/api/projects/{project_id}");

  let denied = app.send(Method::GET, &project_uri, Some(&carol), None).await;
  assert_eq!(denied.status, StatusCode::FORBIDDEN);
  let missing = app
    .send(Method::GET, &format!("/api/projects/{}", Uuid::new_v4()), Some(&alice), None)
    .await;
  assert_eq!(missing.status, StatusCode::NOT_FOUND);

  let invitation = app
    .send(
      Method::POST,
      &format!("{project_uri}/invitations"),
      Some(&alice),
      Some(json!({ "invitee_email": "bob@example.com" })),
    )
    .await;
  assert_eq!(invitation.status, StatusCode::CREATED);
  assert_eq!(invitation.body["status"], "pending");
  assert_eq!(invitation.body["role"], "member");

  let again = app
    .send(
      Method::POST,
      &format!("{project_uri}/invitations"),
      Some(&alice),
      Some(json!({ "invitee_email": "bob@example.com" })),
    )
    .await;
  assert_eq!(again.status, StatusCode::CONFLICT);

  let inbox = app.send(Method::GET, "/api/invitations", Some(&bob), None).await;
  assert_eq!(inbox.status, StatusCode::OK);
  let invitation_id = inbox.body[0]["id"].as_str().unwrap().to_string();

  let accept_uri = format!("/api/invitations/{invitation_id}/accept");
  let stolen = app.send(Method::POST, &accept_uri, Some(&carol), None).await;
  assert_eq!(stolen.status, StatusCode::FORBIDDEN);
  let accepted = app.send(Method::POST, &accept_uri, Some(&bob), None).await;
  assert_eq!(accepted.status, StatusCode::OK);
  assert_eq!(accepted.body["role"], "member");
  let twice = app.send(Method::POST, &accept_uri, Some(&bob), None).await;
  assert_eq!(twice.status, StatusCode::NOT_FOUND);

  let no_project = app
    .send(Method::POST, "/api/tasks", Some(&bob), Some(json!({ "name": "Loose end" })))
    .await;
  assert_eq!(no_project.status, StatusCode::BAD_REQUEST);

  let task = app
    .send(
      Method::POST,
      "/api/tasks",
      Some(&bob),
      Some(json!({ "name": "Write report", "project_id": project_id })),
    )
    .await;
  assert_eq!(task.status, StatusCode::CREATED);
  assert_eq!(task.body["status"], "New");
  let status_uri = format!("/api/tasks/{}/status", task.body["id"].as_str().unwrap());

  let outsider = app
    .send(Method::PATCH, &status_uri, Some(&carol), Some(json!({ "status": "Completed" })))
    .await;
  assert_eq!(outsider.status, StatusCode::FORBIDDEN);
  let completed = app
    .send(Method::PATCH, &status_uri, Some(&bob), Some(json!({ "status": "Completed" })))
    .await;
  assert_eq!(completed.status, StatusCode::OK);
  assert_eq!(completed.body["status"], "Completed");

  let members = app.send(Method::GET, &format!("{project_uri}/members"), Some(&bob), None).await;
  assert_eq!(members.status, StatusCode::OK);
  let membership_id = members.body[0]["id"].as_str().unwrap().to_string();

  let kick_uri = format!("/api/memberships/{membership_id}");
  let kicked = app.send(Method::DELETE, &kick_uri, Some(&alice), None).await;
  assert_eq!(kicked.status, StatusCode::NO_CONTENT);
  let kicked_again = app.send(Method::DELETE, &kick_uri, Some(&alice), None).await;
  assert_eq!(kicked_again.status, StatusCode::NOT_FOUND);

  let tasks = app.send(Method::GET, &format!("{project_uri}/tasks"), Some(&bob), None).await;
  assert_eq!(tasks.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
  let app = TestApp::new().await;
  let token = app.sign_up("alice@example.com").await;

  let request = Request::builder()
    .method(Method::POST)
    .uri("/api/projects")
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{\"name\": "))
    .unwrap();
  let response = app.router.clone().oneshot(request).await.unwrap();

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
