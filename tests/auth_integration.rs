use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::{AccessTokenCodec, SigningKey, DEFAULT_ISSUER};
use chirpy::configuration::Platform;
use chirpy::session::{SessionPolicy, SessionService};
use chirpy::startup::run;
use chirpy::store::InMemoryStore;
use serde_json::{json, Value};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub codec: AccessTokenCodec,
    pub client: reqwest::Client,
}

fn spawn_app_on(platform: Platform) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let key = SigningKey::generate().expect("Failed to generate signing key");
    let codec = AccessTokenCodec::new(&key, DEFAULT_ISSUER);
    let store = Arc::new(InMemoryStore::new());
    let sessions = SessionService::new(
        store.clone(),
        store,
        codec.clone(),
        SessionPolicy::default(),
        platform,
    );

    let server = run(listener, sessions).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        codec,
        client: reqwest::Client::new(),
    }
}

fn spawn_app() -> TestApp {
    spawn_app_on(Platform::Dev)
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn post_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register(&self, email: &str, password: &str) -> Value {
        let response = self
            .post_json("/api/users", &json!({ "email": email, "password": password }))
            .await;
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn login(&self, email: &str, password: &str) -> Value {
        let response = self
            .post_json("/api/login", &json!({ "email": email, "password": password }))
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().unwrap_or_else(|| panic!("missing {} in {}", field, body))
}

// --- Registration Tests ---

#[tokio::test]
async fn create_user_returns_201_without_password() {
    let app = spawn_app();

    let body = app.register("Walt@Example.com", "04234").await;

    assert_eq!(str_field(&body, "email"), "walt@example.com");
    assert!(Uuid::parse_str(str_field(&body, "id")).is_ok());
    assert_eq!(body["is_chirpy_red"], false);
    assert!(body.get("created_at").is_some());
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn create_user_rejects_duplicate_email() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;

    let response = app
        .post_json("/api/users", &json!({ "email": "walt@example.com", "password": "other" }))
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn create_user_returns_400_for_invalid_input() {
    let app = spawn_app();
    let cases = vec![
        (json!({ "email": "not-an-email", "password": "04234" }), "malformed email"),
        (json!({ "email": "", "password": "04234" }), "empty email"),
        (json!({ "email": "walt@example.com", "password": "" }), "empty password"),
        (json!({ "email": "walt@example.com" }), "missing password"),
    ];

    for (body, description) in cases {
        let response = app.post_json("/api/users", &body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload was {}.",
            description
        );
        let error: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(str_field(&error, "code"), "VALIDATION_ERROR");
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_user_and_both_tokens() {
    let app = spawn_app();
    let user = app.register("walt@example.com", "04234").await;

    let session = app.login("walt@example.com", "04234").await;

    assert_eq!(session["id"], user["id"]);
    assert_eq!(session["email"], user["email"]);
    let subject = app
        .codec
        .verify(str_field(&session, "token"))
        .expect("Access token should verify");
    assert_eq!(subject.to_string(), str_field(&user, "id"));
    assert_eq!(str_field(&session, "refresh_token").len(), 43);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;

    let wrong_password = app
        .post_json("/api/login", &json!({ "email": "walt@example.com", "password": "nope" }))
        .await;
    let unknown_email = app
        .post_json("/api/login", &json!({ "email": "jesse@example.com", "password": "04234" }))
        .await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_email: Value = unknown_email.json().await.unwrap();
    assert_eq!(wrong_password["error"], unknown_email["error"]);
    assert_eq!(wrong_password["code"], unknown_email["code"]);
}

#[tokio::test]
async fn login_rejects_non_positive_expiry() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;

    let response = app
        .post_json(
            "/api/login",
            &json!({ "email": "walt@example.com", "password": "04234", "expires_in_seconds": 0 }),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
}

// --- Refresh / Revoke Tests ---

#[tokio::test]
async fn refresh_issues_new_access_token() {
    let app = spawn_app();
    let user = app.register("walt@example.com", "04234").await;
    let session = app.login("walt@example.com", "04234").await;

    let response = app
        .post_bearer("/api/refresh", str_field(&session, "refresh_token"))
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let token = str_field(&body, "token");
    assert_ne!(token, str_field(&session, "token"));
    let subject = app.codec.verify(token).expect("Refreshed token should verify");
    assert_eq!(subject.to_string(), str_field(&user, "id"));
}

#[tokio::test]
async fn refresh_requires_a_refresh_token() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;
    let session = app.login("walt@example.com", "04234").await;

    let missing = app
        .client
        .post(&format!("{}/api/refresh", app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, missing.status().as_u16());

    let access_token = app.post_bearer("/api/refresh", str_field(&session, "token")).await;
    assert_eq!(401, access_token.status().as_u16());
}

#[tokio::test]
async fn revoked_refresh_token_is_rejected() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;
    let session = app.login("walt@example.com", "04234").await;
    let refresh_token = str_field(&session, "refresh_token");

    let response = app.post_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.post_bearer("/api/refresh", refresh_token).await;
    assert_eq!(401, response.status().as_u16());

    let response = app.post_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, response.status().as_u16());
}

// --- Protected Route Tests ---

#[tokio::test]
async fn update_user_requires_valid_access_token() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;
    let body = json!({ "email": "heisenberg@example.com", "password": "blue" });

    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let foreign_key = SigningKey::generate().unwrap();
    let forged = AccessTokenCodec::new(&foreign_key, DEFAULT_ISSUER)
        .issue(Uuid::new_v4(), chrono::Duration::hours(1))
        .unwrap();
    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .bearer_auth(forged)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn update_user_changes_own_credentials() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;
    let session = app.login("walt@example.com", "04234").await;

    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .bearer_auth(str_field(&session, "token"))
        .json(&json!({ "email": "heisenberg@example.com", "password": "blue" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(str_field(&body, "email"), "heisenberg@example.com");
    assert_eq!(body["id"], session["id"]);

    let old = app
        .post_json("/api/login", &json!({ "email": "walt@example.com", "password": "04234" }))
        .await;
    assert_eq!(401, old.status().as_u16());
    app.login("heisenberg@example.com", "blue").await;
}

#[tokio::test]
async fn delete_user_is_limited_to_the_owner() {
    let app = spawn_app();
    let owner = app.register("walt@example.com", "04234").await;
    app.register("jesse@example.com", "capncook").await;
    let intruder = app.login("jesse@example.com", "capncook").await;
    let url = format!("{}/api/users/{}", app.address, str_field(&owner, "id"));

    let response = app
        .client
        .delete(&url)
        .bearer_auth(str_field(&intruder, "token"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());

    let response = app
        .client
        .delete(&url)
        .bearer_auth("garbage")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let session = app.login("walt@example.com", "04234").await;

    let response = app
        .client
        .delete(&url)
        .bearer_auth(str_field(&session, "token"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    let login = app
        .post_json("/api/login", &json!({ "email": "walt@example.com", "password": "04234" }))
        .await;
    assert_eq!(401, login.status().as_u16());
}

// --- Admin Tests ---

#[tokio::test]
async fn reset_is_forbidden_outside_dev() {
    let app = spawn_app_on(Platform::Production);
    app.register("walt@example.com", "04234").await;

    let response = app.post_json("/admin/reset", &json!({})).await;
    assert_eq!(403, response.status().as_u16());

    app.login("walt@example.com", "04234").await;
}

#[tokio::test]
async fn reset_clears_users_and_tokens_on_dev() {
    let app = spawn_app();
    app.register("walt@example.com", "04234").await;
    let session = app.login("walt@example.com", "04234").await;

    let response = app.post_json("/admin/reset", &json!({})).await;
    assert_eq!(200, response.status().as_u16());

    let login = app
        .post_json("/api/login", &json!({ "email": "walt@example.com", "password": "04234" }))
        .await;
    assert_eq!(401, login.status().as_u16());

    let refresh = app
        .post_bearer("/api/refresh", str_field(&session, "refresh_token"))
        .await;
    assert_eq!(401, refresh.status().as_u16());
}
