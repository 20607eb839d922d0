#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use keyward_core::config::LicensingConfig;
use keyward_server::auth::JwtManager;
use keyward_server::licensing::{LicenseService, ManualClock, SECS_PER_DAY};
use keyward_server::server::{AppState, build_router};
use keyward_server::storage::LicenseDatabase;

const ADMIN_PASSWORD: &str = "admin-pass";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

async fn app() -> TestApp {
    let db = LicenseDatabase::open_in_memory().await.unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let licensing = Arc::new(LicenseService::new(
        Arc::new(db),
        clock.clone(),
        &LicensingConfig::default(),
    ));
    licensing
        .ensure_admin("admin", Some(ADMIN_PASSWORD))
        .await
        .unwrap();
    let jwt = Arc::new(JwtManager::new(b"test-secret", 3600));

    TestApp {
        router: build_router(AppState { licensing, jwt }),
        clock,
    }
}

impl TestApp {
    /// Send a request and return (status, JSON body). An empty body reads as `null`.
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/admin/login",
                None,
                json!({ "username": "admin", "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register a reseller through the referral flow, grant it credits, and
    /// log it in. Returns (reseller id, session token).
    async fn reseller(&self, admin: &str, username: &str, credits: i64) -> (i64, String) {
        let (status, token) = self
            .post("/api/admin/referral-token", Some(admin), json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{token}");

        let (status, reseller) = self
            .post(
                "/api/reseller/register",
                None,
                json!({
                    "username": username,
                    "password": "hunter22",
                    "referralToken": token["token"]["token"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{reseller}");
        let id = reseller["reseller"]["id"].as_i64().unwrap();

        if credits > 0 {
            let (status, body) = self
                .post(
                    &format!("/api/admin/resellers/{id}/credits"),
                    Some(admin),
                    json!({ "credits": credits }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
        }

        let (status, login) = self
            .post(
                "/api/reseller/login",
                None,
                json!({ "username": username, "password": "hunter22" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{login}");
        (id, login["token"].as_str().unwrap().to_string())
    }

    /// Issue a key and return (key id, key string).
    async fn issue_key(&self, reseller: &str, device_limit: i64, expiry_days: i64) -> (i64, String) {
        let (status, body) = self
            .post(
                "/api/reseller/keys",
                Some(reseller),
                json!({
                    "game": "Free Fire",
                    "deviceLimit": device_limit,
                    "expiryDays": expiry_days,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["key"]["id"].as_i64().unwrap(),
            body["key"]["key"].as_str().unwrap().to_string(),
        )
    }

    async fn verify(&self, key: &str, device: &str) -> (StatusCode, Value) {
        self.post("/api/verify", None, json!({ "key": key, "deviceId": device }))
            .await
    }
}

#[tokio::test]
async fn healthz_ok() {
    let app = app().await;
    let (status, body) = app.get("/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn verify_binds_devices_up_to_limit() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, reseller) = app.reseller(&admin, "alice", 1).await;
    let (_, key) = app.issue_key(&reseller, 1, 30).await;

    let (status, body) = app.get(&format!("/api/verify?key={key}&deviceId=D1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], "device_registered");
    assert_eq!(body["game"], "Free Fire");
    assert!(body["expiresAt"].is_i64());

    let (status, body) = app.verify(&key, "D2").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "device_limit_reached");
    assert!(body.get("game").is_none());

    let (status, body) = app.verify(&key, "D1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "valid");
    assert_eq!(body["message"], "Key validated successfully");
}

#[tokio::test]
async fn verify_rejects_bad_input() {
    let app = app().await;

    let (status, body) = app.get("/api/verify?key=ABC", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/verify")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["success"], false);

    let (status, body) = app.verify("FREEFIRE-000000-000000", "D1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "invalid_key");
}

#[tokio::test]
async fn expired_key_is_rejected() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, reseller) = app.reseller(&admin, "alice", 1).await;
    let (_, key) = app.issue_key(&reseller, 2, 1).await;

    assert_eq!(app.verify(&key, "D1").await.0, StatusCode::OK);

    app.clock.advance(SECS_PER_DAY);
    let (status, body) = app.verify(&key, "D1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "expired");
}

#[tokio::test]
async fn revoked_key_is_rejected() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reseller(&admin, "alice", 1).await;
    let (_, mallory) = app.reseller(&admin, "mallory", 0).await;
    let (key_id, key) = app.issue_key(&alice, 100, 30).await;

    let (status, _) = app
        .delete(&format!("/api/reseller/keys/{key_id}"), Some(&mallory))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .delete(&format!("/api/reseller/keys/{key_id}"), Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["key"]["isActive"], false);

    let (status, body) = app.verify(&key, "D1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "revoked");

    let (status, _) = app.delete("/api/reseller/keys/999", Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn issuance_errors() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, broke) = app.reseller(&admin, "broke", 0).await;
    let (_, alice) = app.reseller(&admin, "alice", 2).await;

    let spec = json!({ "game": "Free Fire", "deviceLimit": 1, "expiryDays": 30 });
    let (status, body) = app.post("/api/reseller/keys", Some(&broke), spec).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient credits");

    let custom = json!({
        "game": "Free Fire",
        "deviceLimit": 2,
        "expiryDays": 30,
        "customKey": "VIP-0001",
    });
    let (status, body) = app
        .post("/api/reseller/keys", Some(&alice), custom.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["creditsRemaining"], 1);

    let (status, _) = app.post("/api/reseller/keys", Some(&alice), custom).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let bad = json!({ "game": "Free Fire", "deviceLimit": 5, "expiryDays": 30 });
    let (status, _) = app.post("/api/reseller/keys", Some(&alice), bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/reseller/credits", Some(&alice)).await;
    assert_eq!(body["credits"], 1);
}

#[tokio::test]
async fn routes_enforce_roles() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, reseller) = app.reseller(&admin, "alice", 0).await;

    let (status, _) = app.get("/api/admin/resellers", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/admin/resellers", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/admin/keys", Some(&reseller)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/reseller/keys", Some(&admin)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/admin/login",
            None,
            json!({ "username": "admin", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn me_reports_session() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (id, reseller) = app.reseller(&admin, "alice", 3).await;

    let (status, body) = app.get("/api/me", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert!(body.get("credits").is_none());

    let (_, body) = app.get("/api/me", Some(&reseller)).await;
    assert_eq!(body["id"], id);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["credits"], 3);
}

#[tokio::test]
async fn referral_token_cannot_be_reused() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, token) = app
        .post("/api/admin/referral-token", Some(&admin), json!({}))
        .await;

    let register = |username: &str| {
        json!({
            "username": username,
            "password": "hunter22",
            "referralToken": token["token"]["token"],
        })
    };

    let (status, _) = app
        .post("/api/reseller/register", None, register("alice"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/reseller/register", None, register("bob"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or used referral token");

    let (_, tokens) = app.get("/api/admin/referral-tokens", Some(&admin)).await;
    assert_eq!(tokens["tokens"][0]["used"], true);
    assert_eq!(tokens["tokens"][0]["usedBy"], "alice");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = app().await;
    let admin = app.admin_token().await;
    app.reseller(&admin, "alice", 0).await;
    let (_, token) = app
        .post("/api/admin/referral-token", Some(&admin), json!({}))
        .await;

    let (status, _) = app
        .post(
            "/api/reseller/register",
            None,
            json!({
                "username": "alice",
                "password": "hunter22",
                "referralToken": token["token"]["token"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn credit_grants_are_validated() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (id, _) = app.reseller(&admin, "alice", 0).await;

    let (status, _) = app
        .post(
            &format!("/api/admin/resellers/{id}/credits"),
            Some(&admin),
            json!({ "credits": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/admin/resellers/999/credits",
            Some(&admin),
            json!({ "credits": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/admin/resellers/abc/credits",
            Some(&admin),
            json!({ "credits": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &format!("/api/admin/resellers/{id}/credits"),
            Some(&admin),
            json!({ "credits": 25 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reseller"]["credits"], 25);
    assert!(body["reseller"].get("passwordHash").is_none());
}

#[tokio::test]
async fn reset_frees_device_slots() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, reseller) = app.reseller(&admin, "alice", 1).await;
    let (key_id, key) = app.issue_key(&reseller, 1, 30).await;

    assert_eq!(app.verify(&key, "D1").await.0, StatusCode::OK);
    assert_eq!(app.verify(&key, "D2").await.0, StatusCode::FORBIDDEN);

    let (_, devices) = app
        .get(&format!("/api/reseller/keys/{key_id}/devices"), Some(&reseller))
        .await;
    assert_eq!(devices["devices"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .post(
            &format!("/api/reseller/keys/{key_id}/reset"),
            Some(&reseller),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["key"]["id"], key_id);

    let (status, body) = app.verify(&key, "D2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "device_registered");

    app.delete(&format!("/api/reseller/keys/{key_id}"), Some(&reseller))
        .await;
    let (status, body) = app
        .post(
            &format!("/api/reseller/keys/{key_id}/reset"),
            Some(&reseller),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Revoked keys cannot be reset");
}

#[tokio::test]
async fn deleting_reseller_revokes_keys_and_sessions() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (id, reseller) = app.reseller(&admin, "alice", 1).await;
    let (_, key) = app.issue_key(&reseller, 1, 30).await;

    let (status, _) = app
        .delete(&format!("/api/admin/resellers/{id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/reseller/keys", Some(&reseller)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.verify(&key, "D1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "revoked");

    let (_, keys) = app.get("/api/admin/keys", Some(&admin)).await;
    assert_eq!(keys["keys"][0]["isActive"], false);
    assert!(keys["keys"][0]["createdBy"].is_null());

    let (status, _) = app
        .delete(&format!("/api/admin/resellers/{id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn key_spec_accepts_numeric_strings() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (_, reseller) = app.reseller(&admin, "alice", 2).await;

    let (status, body) = app
        .post(
            "/api/reseller/keys",
            Some(&reseller),
            json!({ "game": "Free Fire", "deviceLimit": "1", "expiryDays": "30" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["key"]["deviceLimit"], 1);
    assert_eq!(body["key"]["expiryDays"], 30);

    // Strings still go through the range checks.
    let (status, _) = app
        .post(
            "/api/reseller/keys",
            Some(&reseller),
            json!({ "game": "Free Fire", "deviceLimit": "3", "expiryDays": "30" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/reseller/keys",
            Some(&reseller),
            json!({ "game": "Free Fire", "deviceLimit": "one", "expiryDays": "30" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/reseller/credits", Some(&reseller)).await;
    assert_eq!(body["credits"], 1);
}

#[tokio::test]
async fn logout_ends_only_that_session() {
    let app = app().await;
    let admin = app.admin_token().await;
    let other = app.admin_token().await;

    let (status, body) = app.post("/api/logout", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Logout successful");

    let (status, _) = app.get("/api/me", Some(&admin)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/admin/resellers", Some(&admin)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/api/logout", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/me", Some(&other)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/logout", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn management_responses_use_named_envelopes() {
    let app = app().await;
    let admin = app.admin_token().await;
    let (id, reseller) = app.reseller(&admin, "alice", 1).await;
    let (key_id, _) = app.issue_key(&reseller, 1, 30).await;

    let (_, body) = app.get("/api/admin/resellers", Some(&admin)).await;
    assert_eq!(body["resellers"][0]["id"], id);

    let (_, body) = app.get("/api/admin/keys", Some(&admin)).await;
    assert_eq!(body["keys"][0]["id"], key_id);

    let (_, body) = app.get("/api/reseller/keys", Some(&reseller)).await;
    assert_eq!(body["keys"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .get(&format!("/api/admin/keys/{key_id}/devices"), Some(&admin))
        .await;
    assert!(body["devices"].as_array().unwrap().is_empty());

    let (status, body) = app
        .post("/api/admin/referral-token", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"]["token"].as_str().unwrap().starts_with("X-R-T0K3N-"));
}
