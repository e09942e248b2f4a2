//! Integration tests for the HTTP remote gateway against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use pantry_sync::model::{CartEntry, Product};
use pantry_sync::{GatewayError, HttpGateway, RemoteGateway, Snapshot, StaticToken};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_DATA: &str = "/api/user-data";

fn gateway(server: &MockServer, token: StaticToken) -> HttpGateway {
    HttpGateway::new(
        format!("{}{USER_DATA}", server.uri()),
        Duration::from_millis(500),
        Arc::new(token),
    )
    .unwrap()
}

#[tokio::test]
async fn fetch_parses_the_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "products": [{ "id": "1", "name": "Rice", "price": 38000, "stock": 12 }],
                "favorites": ["1"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let seed = gateway(&server, StaticToken::new("secret"))
        .fetch_snapshot()
        .await
        .unwrap()
        .expect("remote data");

    let products = seed.products.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Rice");
    assert_eq!(products[0].stock, 12);
    assert_eq!(seed.favorites.unwrap()[0].as_str(), "1");
    assert!(seed.recipes.is_none());
}

#[tokio::test]
async fn fetch_keeps_good_records_next_to_bad_ones() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "products": [
                    { "id": "1", "name": "Rice", "stock": 2.5 },
                    { "id": "2", "name": "Eggs", "stock": -1 }
                ],
                "expenses": [
                    { "id": "e1", "date": "2025-01-03T10:00:00.000Z", "amount": 5 },
                    { "id": "e2", "date": "not a date", "amount": 9 }
                ],
                "mealPlans": "corrupted",
                "cart": [{ "productId": "1" }, { "quantity": 4 }]
            }
        })))
        .mount(&server)
        .await;

    let seed = gateway(&server, StaticToken::none())
        .fetch_snapshot()
        .await
        .unwrap()
        .expect("remote data");

    let stock: Vec<u32> = seed.products.unwrap().iter().map(|p| p.stock).collect();
    assert_eq!(stock, vec![3, 0]);
    let expenses = seed.expenses.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].date.to_string(), "2025-01-03");
    assert!(seed.meal_plans.is_none());
    assert_eq!(seed.cart.unwrap(), vec![CartEntry::new("1", 1)]);
}

#[tokio::test]
async fn replace_writes_back_undeclared_fields() {
    let server = MockServer::start().await;
    let product: Product = serde_json::from_value(json!({
        "id": "1", "name": "Rice", "barcode": "893", "expiryDate": "2025-02-01"
    }))
    .unwrap();
    let snapshot = Snapshot {
        products: vec![product],
        ..Snapshot::default()
    };
    Mock::given(method("POST"))
        .and(path(USER_DATA))
        .and(body_json(serde_json::to_value(&snapshot).unwrap()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server, StaticToken::none())
        .replace_snapshot(&snapshot)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["products"][0]["barcode"], "893");
    assert_eq!(body["products"][0]["expiryDate"], "2025-02-01");
}

#[tokio::test]
async fn fetch_without_collections_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let seed = gateway(&server, StaticToken::none()).fetch_snapshot().await.unwrap();
    assert!(seed.is_none());
}

#[tokio::test]
async fn fetch_without_data_key_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let seed = gateway(&server, StaticToken::none()).fetch_snapshot().await.unwrap();
    assert!(seed.is_none());
}

#[tokio::test]
async fn fetch_rejects_malformed_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = gateway(&server, StaticToken::none()).fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, GatewayError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn unauthorized_and_server_errors_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(USER_DATA))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let gateway = gateway(&server, StaticToken::none());

    let err = gateway.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized));

    let err = gateway.replace_snapshot(&Snapshot::default()).await.unwrap_err();
    match err {
        GatewayError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "products": [] } }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = gateway(&server, StaticToken::none()).fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn replace_posts_the_whole_snapshot() {
    let server = MockServer::start().await;
    let snapshot = Snapshot {
        products: vec![Product::new("p1", "Rice").with_price(10.0)],
        cart: vec![CartEntry::new("p1", 2)],
        ..Snapshot::default()
    };

    Mock::given(method("POST"))
        .and(path(USER_DATA))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(&snapshot))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server, StaticToken::new("secret"))
        .replace_snapshot(&snapshot)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["cart"][0]["productId"], "p1");
    assert_eq!(body["shoppingLists"], json!([]));
}
