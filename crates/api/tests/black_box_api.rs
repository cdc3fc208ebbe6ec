//! Black-box tests against the real router on an ephemeral port.
//!
//! The API is eventual-consistent between the command path and the
//! projections feeding reads, so assertions on read endpoints poll briefly
//! instead of asserting immediately after a command.

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};

use tradepost_auth::{Hs256JwtCodec, JwtClaims, Role};
use tradepost_core::UserId;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@tradepost.local";
const ADMIN_PASSWORD: &str = "tradepost-admin";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let app = tradepost_api::app::build_app(JWT_SECRET.to_string()).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

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

/// Poll until `f` yields a value; projections are fed by a bus subscriber,
/// so reads can trail a successful command by a few milliseconds.
async fn eventually<F, Fut, T>(mut f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    for _ in 0..200 {
        if let Some(value) = f().await {
            return value;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

async fn login(client: &reqwest::Client, base_url: &str, email: &str, password: &str) -> Value {
    eventually(|| async {
        let res = client
            .post(format!("{base_url}/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        if res.status() == StatusCode::OK {
            Some(res.json::<Value>().await.unwrap())
        } else {
            None
        }
    })
    .await
}

/// Register + verify an account; returns (user_id, bearer token).
async fn register_verified(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    role: &str,
) -> (String, String) {
    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({ "email": email, "password": "s3cret-pass", "role": role }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let user_id = body["user_id"].as_str().unwrap().to_string();
    let token = body["verification_token"].as_str().unwrap().to_string();

    // The verification lookup reads the accounts projection.
    eventually(|| async {
        let res = client
            .post(format!("{base_url}/auth/verify-email"))
            .json(&json!({ "token": token }))
            .send()
            .await
            .unwrap();
        (res.status() == StatusCode::OK).then_some(())
    })
    .await;

    let session = login(client, base_url, email, "s3cret-pass").await;
    (user_id, session["token"].as_str().unwrap().to_string())
}

async fn admin_token(client: &reqwest::Client, base_url: &str) -> String {
    let session = login(client, base_url, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    session["token"].as_str().unwrap().to_string()
}

/// Register, verify, onboard, and approve a supplier; returns (id, token).
async fn approved_supplier(
    client: &reqwest::Client,
    base_url: &str,
    admin: &str,
    email: &str,
) -> (String, String) {
    let (supplier_id, token) = register_verified(client, base_url, email, "supplier").await;

    let res = client
        .post(format!("{base_url}/supplier/onboarding/submit"))
        .bearer_auth(&token)
        .json(&json!({
            "company": {
                "company_name": "Acme Industrial",
                "business_registration": "HRB-12345",
                "legal_entity_type": "GmbH",
                "address": "1 Factory Rd",
                "website": null
            },
            "contact": { "email": email, "phone": null }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{base_url}/admin/suppliers/{supplier_id}/approve"))
        .bearer_auth(admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Wait until the directory sees the approval; product creation checks it.
    eventually(|| async {
        let res = client
            .get(format!("{base_url}/supplier/profile"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        if res.status() != StatusCode::OK {
            return None;
        }
        let profile: Value = res.json().await.unwrap();
        (profile["status"] == "active").then_some(())
    })
    .await;

    (supplier_id, token)
}

async fn create_product(
    client: &reqwest::Client,
    base_url: &str,
    supplier: &str,
    name: &str,
) -> String {
    let res = eventually(|| async {
        let res = client
            .post(format!("{base_url}/supplier/products"))
            .bearer_auth(supplier)
            .json(&json!({
                "name": name,
                "description": "bulk pallets",
                "category_id": null,
                "pricing": { "base_price": 1250, "currency": "EUR", "min_order_quantity": 10 },
                "submit_for_review": true
            }))
            .send()
            .await
            .unwrap();
        (res.status() == StatusCode::CREATED).then_some(res)
    })
    .await;
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication surface
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn seeded_admin_can_log_in() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let token = admin_token(&client, &srv.base_url).await;
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn token_signed_with_wrong_secret_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let now = Utc::now();
    let forged = Hs256JwtCodec::new(b"not-the-server-secret")
        .encode(&JwtClaims {
            sub: UserId::new(),
            role: Role::Admin,
            issued_at: now,
            expires_at: now + ChronoDuration::minutes(10),
        })
        .unwrap();

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_requires_verified_email() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({ "email": "slow@buyer.example", "password": "s3cret-pass", "role": "buyer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // The account exists but is unverified; login must refuse it once the
    // projection knows the account (404-equivalent 401 before that).
    eventually(|| async {
        let res = client
            .post(format!("{}/auth/login", srv.base_url))
            .json(&json!({ "email": "slow@buyer.example", "password": "s3cret-pass" }))
            .send()
            .await
            .unwrap();
        (res.status() == StatusCode::FORBIDDEN).then_some(())
    })
    .await;
}

#[tokio::test]
async fn unverified_registration_is_superseded_verified_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({ "email": "again@buyer.example", "password": "s3cret-pass", "role": "buyer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Wait until the accounts projection knows the (unverified) account, so
    // the re-registration below exercises the supersede path.
    eventually(|| async {
        let res = client
            .post(format!("{}/auth/login", srv.base_url))
            .json(&json!({ "email": "again@buyer.example", "password": "s3cret-pass" }))
            .send()
            .await
            .unwrap();
        (res.status() == StatusCode::FORBIDDEN).then_some(())
    })
    .await;

    // Same email, still unverified: the abandoned signup gives way.
    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({ "email": "again@buyer.example", "password": "an0ther-pass", "role": "buyer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let (_, _token) =
        register_verified(&client, &srv.base_url, "locked@buyer.example", "buyer").await;
    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({ "email": "locked@buyer.example", "password": "s3cret-pass", "role": "buyer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

// ─────────────────────────────────────────────────────────────────────────────
// Product moderation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn product_review_roundtrip_reaches_public_listing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let (_supplier_id, supplier) =
        approved_supplier(&client, &srv.base_url, &admin, "sales@acme.example").await;
    let product_id = create_product(&client, &srv.base_url, &supplier, "Pallet Jack").await;

    // Pending products are invisible to the public surface.
    let res = client
        .get(format!("{}/products", srv.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());

    let res = client
        .post(format!("{}/admin/products/{product_id}/approve", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "notes": "meets listing standards" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let listed = eventually(|| async {
        let res = client
            .get(format!("{}/products", srv.base_url))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        let items = body["items"].as_array().unwrap();
        items
            .iter()
            .find(|p| p["id"] == product_id.as_str())
            .cloned()
    })
    .await;
    assert_eq!(listed["status"], "approved");
    assert!(listed["reviewed_by"].is_string());
    assert!(listed["reviewed_at"].is_string());

    // The owning supplier is told about the approval, exactly once.
    let notifications = eventually(|| async {
        let res = client
            .get(format!("{}/notifications", srv.base_url))
            .bearer_auth(&supplier)
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        let matching = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["type"] == "product_approved")
            .count();
        (matching > 0).then_some(matching)
    })
    .await;
    assert_eq!(notifications, 1);
}

#[tokio::test]
async fn editing_a_live_product_resets_it_to_pending() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let (_, supplier) =
        approved_supplier(&client, &srv.base_url, &admin, "sales@edit.example").await;
    let product_id = create_product(&client, &srv.base_url, &supplier, "Drum Mixer").await;

    let res = client
        .post(format!("{}/admin/products/{product_id}/approve", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "notes": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Wait until the edit can see the approved state, then patch.
    eventually(|| async {
        let res = client
            .get(format!("{}/supplier/products", srv.base_url))
            .bearer_auth(&supplier)
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == product_id.as_str() && p["status"] == "approved")
            .then_some(())
    })
    .await;

    let res = client
        .patch(format!("{}/supplier/products/{product_id}", srv.base_url))
        .bearer_auth(&supplier)
        .json(&json!({ "description": "now with a 2kW motor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Back out of the public listing until re-reviewed.
    eventually(|| async {
        let res = client
            .get(format!("{}/products", srv.base_url))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p["id"] != product_id.as_str())
            .then_some(())
    })
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Inquiry moderation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inquiry_moves_between_admin_queues_on_approval() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let (supplier_id, _supplier) =
        approved_supplier(&client, &srv.base_url, &admin, "sales@gate.example").await;
    let (_, buyer) = register_verified(&client, &srv.base_url, "buyer@gate.example", "buyer").await;

    let res = eventually(|| async {
        let res = client
            .post(format!("{}/buyer/inquiries", srv.base_url))
            .bearer_auth(&buyer)
            .json(&json!({
                "supplier_id": supplier_id,
                "product_id": null,
                "subject": "Bulk pricing",
                "message": "What is your price for 500 units?"
            }))
            .send()
            .await
            .unwrap();
        (res.status() == StatusCode::CREATED).then_some(res)
    })
    .await;
    let body: Value = res.json().await.unwrap();
    let inquiry_id = body["id"].as_str().unwrap().to_string();

    // Visible in the pending queue, absent from the approved one.
    eventually(|| async {
        let res = client
            .get(format!("{}/admin/inquiries/pending", srv.base_url))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == inquiry_id.as_str())
            .then_some(())
    })
    .await;

    let res = client
        .post(format!("{}/admin/inquiries/{inquiry_id}/approve", srv.base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    eventually(|| async {
        let approved = client
            .get(format!("{}/admin/inquiries/approved", srv.base_url))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap();
        let pending = client
            .get(format!("{}/admin/inquiries/pending", srv.base_url))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap();

        let in_approved = approved["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == inquiry_id.as_str());
        let in_pending = pending["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == inquiry_id.as_str());
        (in_approved && !in_pending).then_some(())
    })
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Supplier moderation + category guard
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_supplier_sees_the_reason_and_can_resubmit() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let (supplier_id, supplier) =
        register_verified(&client, &srv.base_url, "sales@rej.example", "supplier").await;

    let res = client
        .post(format!("{}/supplier/onboarding/submit", srv.base_url))
        .bearer_auth(&supplier)
        .json(&json!({
            "company": { "company_name": "Shady Goods Ltd" },
            "contact": {}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/admin/suppliers/{supplier_id}/reject", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "missing business registration" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let profile = eventually(|| async {
        let res = client
            .get(format!("{}/supplier/profile", srv.base_url))
            .bearer_auth(&supplier)
            .send()
            .await
            .unwrap();
        let profile: Value = res.json().await.unwrap();
        (profile["status"] == "rejected").then_some(profile)
    })
    .await;
    assert_eq!(profile["verified"], false);
    assert_eq!(profile["rejection_reason"], "missing business registration");

    // Resubmission re-enters the review queue.
    let res = client
        .post(format!("{}/supplier/onboarding/submit", srv.base_url))
        .bearer_auth(&supplier)
        .json(&json!({
            "company": {
                "company_name": "Shady Goods Ltd",
                "business_registration": "HRB-9000"
            },
            "contact": {}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    eventually(|| async {
        let res = client
            .get(format!("{}/admin/suppliers?status=pending_approval", srv.base_url))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|s| s["id"] == supplier_id.as_str())
            .then_some(())
    })
    .await;
}

#[tokio::test]
async fn suspending_a_supplier_requires_a_reason() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let (supplier_id, _) =
        approved_supplier(&client, &srv.base_url, &admin, "sales@susp.example").await;

    let res = client
        .post(format!("{}/admin/suppliers/{supplier_id}/suspend", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/admin/suppliers/{supplier_id}/suspend", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "payment dispute" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn category_with_subcategories_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let res = client
        .post(format!("{}/admin/categories", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Machinery", "parent_id": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let parent: Value = res.json().await.unwrap();
    let parent_id = parent["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/admin/categories", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Pumps", "parent_id": parent_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .delete(format!("{}/admin/categories/{parent_id}", srv.base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: Value = res.json().await.unwrap();
    assert_eq!(outcome["outcome"], "blocked");
    assert_eq!(outcome["deleted"], false);

    let res = client
        .get(format!("{}/admin/categories", srv.base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["id"] == parent_id.as_str())
    );
}

#[tokio::test]
async fn non_admin_cannot_reach_moderation_routes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, buyer) = register_verified(&client, &srv.base_url, "buyer@noauth.example", "buyer").await;

    let res = client
        .get(format!("{}/admin/suppliers", srv.base_url))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
