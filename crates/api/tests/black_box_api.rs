use std::sync::Arc;

use argon2::Params;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use warden_api::state::AppState;
use warden_auth::{Argon2Hasher, AuthConfig};
use warden_core::{Adapter, AssetLoader, Rank};
use warden_infra::{InMemoryAdapter, StaticAssetLoader};

const SIGNING_KEY: &str = include_str!("../../auth/tests/fixtures/signing_key.pem");
const PUBLIC_KEY: &str = include_str!("../../auth/tests/fixtures/signing_key.pub.pem");
const SERVICE_ACCOUNT: &str = include_str!("../../auth/tests/fixtures/service_account.json");

const ADMIN: &str = "root";
const ADMIN_PASSWORD: &str = "R00t!secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
    _static_root: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        let static_root = tempfile::tempdir().expect("failed to create static root");
        std::fs::create_dir(static_root.path().join("keys")).unwrap();
        std::fs::write(static_root.path().join("keys/default.pem"), SIGNING_KEY).unwrap();
        std::fs::write(static_root.path().join("keys/firebase.json"), SERVICE_ACCOUNT).unwrap();

        let adapter: Arc<dyn Adapter> = Arc::new(InMemoryAdapter::new());
        let loader: Arc<dyn AssetLoader> = Arc::new(StaticAssetLoader::new(static_root.path()));
        let hasher = Arc::new(Argon2Hasher::new(
            Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
        ));
        let state = Arc::new(AppState::with_hasher(
            &AuthConfig::default(),
            adapter,
            loader,
            hasher,
        ));
        let created = state
            .write(|tx| {
                state
                    .users
                    .bootstrap_admin(tx, ADMIN, ADMIN_PASSWORD, Rank::new(100))
            })
            .unwrap();
        assert!(created);

        // Same router as prod, bound to an ephemeral port.
        let app = warden_api::app::build_app(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
            _static_root: static_root,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/session"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Creates `username` with `rank` and returns its session token.
    async fn user(&self, admin: &str, username: &str, rank: u32) -> String {
        let res = self
            .post(
                "/users",
                admin,
                json!({ "username": username, "password": "Passw0rd!", "rank": rank }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        self.login(username, "Passw0rd!").await
    }

    async fn client_uid(&self, admin: &str, redirect_url: &str) -> String {
        self.client_of_type(admin, redirect_url, "default", "keys/default.pem").await
    }

    async fn client_of_type(
        &self,
        admin: &str,
        redirect_url: &str,
        token_type: &str,
        key_uri: &str,
    ) -> String {
        let res = self
            .post(
                "/clients",
                admin,
                json!({
                    "name": "dashboard",
                    "redirect_url": redirect_url,
                    "token_type": token_type,
                    "key_uri": key_uri,
                }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["uid"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseRole {
    role: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseIssuedClaims {
    uid: String,
    claims: FirebaseRole,
}

#[derive(Debug, Deserialize)]
struct IssuedClaims {
    iss: String,
    aud: String,
    username: String,
    role: String,
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_endpoints_require_a_live_session() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/session")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("/users", "not-a-token").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("/users", "00000000-0000-4000-8000-000000000000").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn login_rejects_bad_credentials_without_saying_which() {
    let srv = TestServer::spawn().await;

    for (username, password) in [(ADMIN, "wrong"), ("nobody", ADMIN_PASSWORD)] {
        let res = srv
            .client
            .post(srv.url("/session"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], warden_auth::INVALID_CREDENTIALS);
    }
}

#[tokio::test]
async fn whoami_reports_the_session_owner() {
    let srv = TestServer::spawn().await;
    let token = srv.login(ADMIN, ADMIN_PASSWORD).await;

    let res = srv.get("/session", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], ADMIN);
    assert_eq!(body["rank"], 100);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let srv = TestServer::spawn().await;
    let token = srv.login(ADMIN, ADMIN_PASSWORD).await;

    let res = srv
        .client
        .delete(srv.url("/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get("/session", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_users_never_expose_password_hashes() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    srv.user(&admin, "alice", 5).await;

    let res = srv.get("/users", &admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password_hash").is_none());
}

#[tokio::test]
async fn weak_passwords_are_rejected_with_the_rule() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;

    let res = srv
        .post(
            "/users",
            &admin,
            json!({ "username": "bob", "password": "short", "rank": 1 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "password must be at least 8 characters long");
}

#[tokio::test]
async fn lower_ranks_cannot_act_upwards() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    let alice = srv.user(&admin, "alice", 5).await;

    // Same rank as the actor is not assignable.
    let res = srv
        .post(
            "/users",
            &alice,
            json!({ "username": "carol", "password": "Passw0rd!", "rank": 5 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .delete(srv.url(&format!("/users/{ADMIN}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Below the client-management rank.
    let res = srv
        .post(
            "/clients",
            &alice,
            json!({
                "name": "rogue",
                "redirect_url": "https://rogue.example.com",
                "token_type": "default",
                "key_uri": "keys/default.pem",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.get("/users", &alice).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_reset_revokes_the_users_sessions() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    let alice = srv.user(&admin, "alice", 5).await;

    let res = srv
        .client
        .put(srv.url("/users/alice/password"))
        .bearer_auth(&admin)
        .json(&json!({ "password": "N3w!password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get("/session", &alice).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    srv.login("alice", "N3w!password").await;
}

#[tokio::test]
async fn self_service_change_keeps_only_the_current_session() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    let current = srv.user(&admin, "alice", 5).await;
    let other = srv.login("alice", "Passw0rd!").await;

    let res = srv
        .client
        .put(srv.url("/session/password"))
        .bearer_auth(&current)
        .json(&json!({ "old_password": "Passw0rd!", "new_password": "Chang3d!pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert_eq!(srv.get("/session", &current).await.status(), StatusCode::OK);
    assert_eq!(srv.get("/session", &other).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn issues_redirect_token_for_assigned_user() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    srv.user(&admin, "alice", 5).await;
    let uid = srv
        .client_uid(&admin, "https://app.example.com/callback?state=xyz")
        .await;

    let res = srv
        .post(
            &format!("/clients/{uid}/roles"),
            &admin,
            json!({ "username": "alice", "role": "editor" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .post(srv.url(&format!("/clients/{uid}/token")))
        .json(&json!({ "username": "alice", "password": "Passw0rd!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let redirect = body["redirect_url"].as_str().unwrap();
    let (prefix, token) = redirect.split_once("&token=").unwrap();
    assert_eq!(prefix, "https://app.example.com/callback?state=xyz");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[uid.as_str()]);
    validation.set_issuer(&["warden"]);
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
    let claims = jsonwebtoken::decode::<IssuedClaims>(token, &key, &validation)
        .unwrap()
        .claims;
    assert_eq!(claims.iss, "warden");
    assert_eq!(claims.aud, uid);
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.role, "editor");
}

#[tokio::test]
async fn firebase_client_gets_custom_token() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    srv.user(&admin, "alice", 5).await;
    let uid = srv
        .client_of_type(&admin, "https://app.example.com/", "firebase", "keys/firebase.json")
        .await;
    let res = srv
        .post(
            &format!("/clients/{uid}/roles"),
            &admin,
            json!({ "username": "alice", "role": "viewer" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .post(srv.url(&format!("/clients/{uid}/token")))
        .json(&json!({ "username": "alice", "password": "Passw0rd!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let redirect = body["redirect_url"].as_str().unwrap();
    let token = redirect.strip_prefix("https://app.example.com/?token=").unwrap();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[warden_auth::token::FIREBASE_AUDIENCE]);
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
    let claims = jsonwebtoken::decode::<FirebaseIssuedClaims>(token, &key, &validation)
        .unwrap()
        .claims;
    assert_eq!(claims.uid, "alice");
    assert_eq!(claims.claims.role, "viewer");
}

#[tokio::test]
async fn unassigned_user_gets_no_token() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    srv.user(&admin, "alice", 5).await;
    let uid = srv.client_uid(&admin, "https://app.example.com/").await;

    let res = srv
        .client
        .post(srv.url(&format!("/clients/{uid}/token")))
        .json(&json!({ "username": "alice", "password": "Passw0rd!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], warden_auth::NOT_ASSIGNED);
}

#[tokio::test]
async fn client_lifecycle() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN, ADMIN_PASSWORD).await;
    let uid = srv.client_uid(&admin, "https://app.example.com/").await;

    let res = srv.get(&format!("/clients/{uid}"), &admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["token_type"], "default");

    let res = srv
        .client
        .put(srv.url(&format!("/clients/{uid}")))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "renamed",
            "redirect_url": "https://other.example.com/",
            "token_type": "firebase",
            "key_uri": "keys/firebase.json",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get("/clients", &admin).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body[0]["name"], "renamed");

    let res = srv
        .client
        .delete(srv.url(&format!("/clients/{uid}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&format!("/clients/{uid}"), &admin).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.get("/clients/not-a-uid", &admin).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_path");
}
