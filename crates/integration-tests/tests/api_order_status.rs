//! Order-status webhook tests.
//!
//! The webhook takes its payload from the JSON body on POST and from the
//! query string on GET, gated by a shared secret when one is configured.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use denif_core::{OrderId, OrderStatus};
use denif_integration_tests::{
    FailingStore, app, config_with_webhook_secret, get, placed_order, post_json, read_json,
    state_over, temp_store, test_config,
};
use denif_server::store::OrderStore;

#[tokio::test]
async fn test_update_changes_the_stored_order() {
    let (_dir, store) = temp_store();
    store
        .append(placed_order("ORD-2024-123456AB"))
        .await
        .unwrap();
    let app = app(state_over(test_config(), store.clone()));

    let body = serde_json::json!({
        "orderId": "ORD-2024-123456AB",
        "status": "shipped",
    });
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], serde_json::json!(true));
    assert_eq!(body["message"], "Order ORD-2024-123456AB updated to shipped");

    let stored = store
        .get(&OrderId::new("ORD-2024-123456AB"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_update_via_query_string() {
    let (_dir, store) = temp_store();
    store
        .append(placed_order("ORD-2024-123456AB"))
        .await
        .unwrap();
    let app = app(state_over(test_config(), store.clone()));

    let response = app
        .oneshot(get(
            "/api/webhook/order-status?orderId=ORD-2024-123456AB&status=delivered",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = store
        .get(&OrderId::new("ORD-2024-123456AB"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_missing_or_empty_order_id_is_rejected() {
    let bodies = [
        serde_json::json!({"status": "shipped"}),
        serde_json::json!({"orderId": "", "status": "shipped"}),
    ];
    for body in bodies {
        let (_dir, store) = temp_store();
        let app = app(state_over(test_config(), store));

        let response = app
            .oneshot(post_json("/api/webhook/order-status", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(read_json(response).await["error"], "Order ID required");
    }
}

#[tokio::test]
async fn test_missing_status_is_rejected() {
    let (_dir, store) = temp_store();
    let app = app(state_over(test_config(), store));

    let body = serde_json::json!({"orderId": "ORD-2024-123456AB"});
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Status required");
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let (_dir, store) = temp_store();
    store
        .append(placed_order("ORD-2024-123456AB"))
        .await
        .unwrap();
    let app = app(state_over(test_config(), store));

    let body = serde_json::json!({
        "orderId": "ORD-2024-123456AB",
        "status": "teleported",
    });
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Invalid status");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let (_dir, store) = temp_store();
    let app = app(state_over(test_config(), store));

    let body = serde_json::json!({
        "orderId": "ORD-2024-00000000",
        "status": "shipped",
    });
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "Order not found");
}

#[tokio::test]
async fn test_configured_secret_gates_the_webhook() {
    let (_dir, store) = temp_store();
    store
        .append(placed_order("ORD-2024-123456AB"))
        .await
        .unwrap();
    let config = config_with_webhook_secret("wh_9f27c4e1a8b35d60");
    let app = app(state_over(config, store));

    let body = serde_json::json!({
        "orderId": "ORD-2024-123456AB",
        "status": "shipped",
    });
    let signed = |secret: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/webhook/order-status")
            .header("content-type", "application/json")
            .header("x-webhook-secret", secret)
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(signed("wrong")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(signed("wh_9f27c4e1a8b35d60")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unconfigured_webhook_accepts_unauthenticated_calls() {
    let (_dir, store) = temp_store();
    store
        .append(placed_order("ORD-2024-123456AB"))
        .await
        .unwrap();
    let app = app(state_over(test_config(), store));

    let body = serde_json::json!({
        "orderId": "ORD-2024-123456AB",
        "status": "processing",
    });
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_store_failure_is_a_server_error() {
    let app = app(state_over(test_config(), Arc::new(FailingStore)));

    let body = serde_json::json!({
        "orderId": "ORD-2024-123456AB",
        "status": "shipped",
    });
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json(response).await["error"], "Failed to update order");
}

#[tokio::test]
async fn test_shipping_details_ride_along() {
    let (_dir, store) = temp_store();
    store
        .append(placed_order("ORD-2024-123456AB"))
        .await
        .unwrap();
    let app = app(state_over(test_config(), store.clone()));

    // Tracking details feed the shipping notification, which is best-effort
    // and unconfigured here; the status update itself must still land.
    let body = serde_json::json!({
        "orderId": "ORD-2024-123456AB",
        "status": "shipped",
        "trackingNumber": "BRT-123456789",
        "carrier": "BRT",
    });
    let response = app
        .oneshot(post_json("/api/webhook/order-status", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = store
        .get(&OrderId::new("ORD-2024-123456AB"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
}
