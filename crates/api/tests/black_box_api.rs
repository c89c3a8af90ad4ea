use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use renolens_auth::{BearerClaims, Role};
use renolens_core::AccountId;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = renolens_api::app::build_app(jwt_secret.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, account_id: AccountId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = BearerClaims {
        sub: account_id,
        roles,
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn generate_body(account_id: AccountId) -> serde_json::Value {
    json!({
        "account_id": account_id.to_string(),
        "image_base64": BASE64.encode(b"not really a jpeg"),
        "mime_type": "image/jpeg",
        "prompt": "repaint the living room in sage green",
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn health_is_public_but_api_requires_auth() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/tokens", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/api/tokens", srv.base_url))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread")]
async fn fresh_account_starts_at_default_balance() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let token = mint_jwt(secret, AccountId::new(), vec![]);
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("{}/api/tokens", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["balance"], 100);
    assert_eq!(body["generation_cost"], 30);
}

#[tokio::test(flavor = "multi_thread")]
async fn generation_charges_cost_and_returns_image() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let account = AccountId::new();
    let token = mint_jwt(secret, account, vec![]);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/generate", srv.base_url))
        .bearer_auth(&token)
        .json(&generate_body(account))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["tokens_charged"], 30);
    assert_eq!(body["balance"], 70);
    let image = BASE64
        .decode(body["image_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(&image[..4], &[0x89, b'P', b'N', b'G']);

    let balance: serde_json::Value = client
        .get(format!("{}/api/tokens", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance["balance"], 70);
}

#[tokio::test(flavor = "multi_thread")]
async fn token_cannot_spend_for_another_account() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let token = mint_jwt(secret, AccountId::new(), vec![]);
    let victim = AccountId::new();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/generate", srv.base_url))
        .bearer_auth(&token)
        .json(&generate_body(victim))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // The claimed account was never charged.
    let victim_token = mint_jwt(secret, victim, vec![]);
    let balance: serde_json::Value = client
        .get(format!("{}/api/tokens", srv.base_url))
        .bearer_auth(&victim_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance["balance"], 100);
}

#[tokio::test(flavor = "multi_thread")]
async fn insufficient_balance_is_payment_required() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let account = AccountId::new();
    let token = mint_jwt(secret, account, vec![]);
    let client = reqwest::Client::new();

    // 100 tokens cover exactly three generations.
    for _ in 0..3 {
        let res = client
            .post(format!("{}/api/generate", srv.base_url))
            .bearer_auth(&token)
            .json(&generate_body(account))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .post(format!("{}/api/generate", srv.base_url))
        .bearer_auth(&token)
        .json(&generate_body(account))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["required"], 30);
    assert_eq!(body["balance"], 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn purchase_credits_base_plus_bonus() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let account = AccountId::new();
    let token = mint_jwt(secret, account, vec![]);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/purchases", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "package_id": "pro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["purchase"]["total_tokens"], 350);
    assert_eq!(body["purchase"]["price_cents"], 1299);
    assert_eq!(body["balance"], 450);

    let res = client
        .post(format!("{}/api/purchases", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "package_id": "mega" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_surface_requires_operator_role() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let client = reqwest::Client::new();

    let user_token = mint_jwt(secret, AccountId::new(), vec![]);
    let res = client
        .get(format!("{}/admin/revenue", srv.base_url))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let operator = mint_jwt(secret, AccountId::new(), vec![Role::new("operator")]);
    let res = client
        .get(format!("{}/admin/revenue", srv.base_url))
        .bearer_auth(&operator)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn revenue_window_reflects_purchases() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let client = reqwest::Client::new();

    let buyer = mint_jwt(secret, AccountId::new(), vec![]);
    for package in ["starter", "premium"] {
        let res = client
            .post(format!("{}/api/purchases", srv.base_url))
            .bearer_auth(&buyer)
            .json(&json!({ "package_id": package }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let operator = mint_jwt(secret, AccountId::new(), vec![Role::new("operator")]);
    let body: serde_json::Value = client
        .get(format!("{}/admin/revenue?window=today", srv.base_url))
        .bearer_auth(&operator)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["total_revenue_cents"], 4498);
    assert_eq!(body["total_purchases"], 2);
    assert_eq!(body["total_tokens_sold"], 1300);

    let res = client
        .get(format!("{}/admin/revenue?window=yesterday", srv.base_url))
        .bearer_auth(&operator)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn recent_purchases_are_newest_first() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    let client = reqwest::Client::new();

    let buyer = mint_jwt(secret, AccountId::new(), vec![]);
    for package in ["starter", "pro"] {
        client
            .post(format!("{}/api/purchases", srv.base_url))
            .bearer_auth(&buyer)
            .json(&json!({ "package_id": package }))
            .send()
            .await
            .unwrap();
    }

    let operator = mint_jwt(secret, AccountId::new(), vec![Role::new("operator")]);
    let body: serde_json::Value = client
        .get(format!("{}/admin/purchases?limit=1", srv.base_url))
        .bearer_auth(&operator)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["package_name"], "Pro Pack");
}
