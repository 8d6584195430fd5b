use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use labstock_auth::{JwtClaims, Role};
use labstock_core::UserId;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = labstock_api::app::build_app(jwt_secret.to_string()).await;
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

fn mint_jwt(jwt_secret: &str, user_id: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public_but_everything_else_requires_auth() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for path in ["/whoami", "/components", "/stocklogs", "/dashboard/stats"] {
        let res = client
            .get(format!("{}{}", srv.base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "path {path}");
    }
}

#[tokio::test]
async fn whoami_reflects_the_token() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;

    let user_id = UserId::new();
    let token = mint_jwt(jwt_secret, user_id, vec![Role::new("admin")]);

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn component_and_stock_lifecycle() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, UserId::new(), vec![Role::new("admin")]);
    let client = reqwest::Client::new();

    // Create
    let res = client
        .post(format!("{}/components", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "0603 resistor 100R",
            "part_number": "R-100",
            "category": "resistor",
            "location": "shelf A3",
            "quantity": 10,
            "unit_price_minor": 4,
            "critical_threshold": 5
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created["label_payload"].as_str().unwrap().contains("R-100"));

    // Duplicate part number is rejected
    let res = client
        .post(format!("{}/components", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "another",
            "part_number": "R-100",
            "category": "resistor",
            "location": "shelf A4"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Outward movement
    let res = client
        .post(format!("{}/stocklogs", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "component_id": id,
            "direction": "outward",
            "quantity": 6,
            "reason": "prototype build"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let recorded: serde_json::Value = res.json().await.unwrap();
    assert_eq!(recorded["component"]["quantity"], 4);
    assert_eq!(recorded["component"]["status"], "low");

    // Overdraw is rejected without changing anything
    let res = client
        .post(format!("{}/stocklogs", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "component_id": id,
            "direction": "outward",
            "quantity": 10,
            "reason": "too much"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .get(format!("{}/components/{}", srv.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched["quantity"], 4);

    // The ledger holds exactly one entry for this component
    let res = client
        .get(format!("{}/stocklogs?component_id={}", srv.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let logs: serde_json::Value = res.json().await.unwrap();
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["direction"], "outward");
}

#[tokio::test]
async fn members_can_move_stock_but_not_mutate_the_registry() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let admin = mint_jwt(jwt_secret, UserId::new(), vec![Role::new("admin")]);
    let member = mint_jwt(jwt_secret, UserId::new(), vec![Role::new("member")]);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/components", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "22uF capacitor",
            "part_number": "C-220",
            "category": "capacitor",
            "location": "drawer 2",
            "quantity": 50
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Member cannot create components...
    let res = client
        .post(format!("{}/components", srv.base_url))
        .bearer_auth(&member)
        .json(&json!({
            "name": "x",
            "part_number": "X-1",
            "category": "misc",
            "location": "bin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // ...but can read them and record movements.
    let res = client
        .get(format!("{}/components/{}", srv.base_url, id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/stocklogs", srv.base_url))
        .bearer_auth(&member)
        .json(&json!({
            "component_id": id,
            "direction": "inward",
            "quantity": 25,
            "reason": "restock order arrived"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn bulk_import_reports_per_row_outcomes() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, UserId::new(), vec![Role::new("admin")]);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/components/import", srv.base_url))
        .bearer_auth(&token)
        .json(&json!([
            { "name": "a", "part_number": "P-1", "category": "misc", "location": "bin" },
            { "name": " ", "part_number": "P-2", "category": "misc", "location": "bin" },
            { "name": "c", "part_number": "P-1", "category": "misc", "location": "bin" }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["created"], 1);
    assert_eq!(report["failed"], 2);
    assert_eq!(report["rows"].as_array().unwrap().len(), 3);

    let res = client
        .get(format!("{}/components", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let components: serde_json::Value = res.json().await.unwrap();
    assert_eq!(components.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn dashboard_reflects_movements() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, UserId::new(), vec![Role::new("admin")]);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/components", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "M3 screw",
            "part_number": "S-3",
            "category": "hardware",
            "location": "drawer 1",
            "quantity": 100,
            "unit_price_minor": 2,
            "critical_threshold": 10
        }))
        .send()
        .await
        .unwrap();
    let id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    for (direction, quantity) in [("inward", 50), ("outward", 30)] {
        let res = client
            .post(format!("{}/stocklogs", srv.base_url))
            .bearer_auth(&token)
            .json(&json!({
                "component_id": id,
                "direction": direction,
                "quantity": quantity,
                "reason": "monthly churn"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!("{}/dashboard/stats", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stats: serde_json::Value = res.json().await.unwrap();
    assert_eq!(stats["total_components"], 1);
    // 100 + 50 - 30 = 120 on hand at 2 minor units each.
    assert_eq!(stats["total_value_minor"], 240);
    // The outward movement just happened, so the component is not stale.
    assert!(stats["stale_stock"].as_array().unwrap().is_empty());

    let res = client
        .get(format!("{}/dashboard/charts", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let charts: serde_json::Value = res.json().await.unwrap();
    assert_eq!(charts["labels"].as_array().unwrap().len(), 1);
    assert_eq!(charts["inward"][0], 50);
    assert_eq!(charts["outward"][0], 30);
}
