//! Catalog endpoint and health probe tests.
//!
//! AirTable stays unconfigured here, so the catalog serves its built-in
//! fallback; the interesting part is the query-string plumbing on top.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use tower::ServiceExt;

use denif_integration_tests::{FailingStore, app, get, read_json, state_over, temp_store, test_config};

#[tokio::test]
async fn test_products_serves_the_builtin_catalog() {
    let (_dir, store) = temp_store();
    let app = app(state_over(test_config(), store));

    let response = app.oneshot(get("/api/products")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let products = body.as_array().unwrap();
    assert_eq!(products.len(), 10);

    let first = products.first().unwrap();
    assert_eq!(first["name"], "Décolleté Classica in Pelle");
    assert_eq!(first["price"], serde_json::json!(280.0));
    assert_eq!(first["inStock"], serde_json::json!(true));
}

#[tokio::test]
async fn test_query_filters_combine() {
    let (_dir, store) = temp_store();
    let app = app(state_over(test_config(), store));

    // Two Stivaletti in the catalog, one of them out of stock
    let response = app
        .clone()
        .oneshot(get("/api/products?category=stivaletti&inStock=true"))
        .await
        .unwrap();
    let body = read_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|product| product["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Stivaletto Invernale"]);

    let response = app
        .clone()
        .oneshot(get("/api/products?size=45"))
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/api/products?q=sughero"))
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body[0]["name"], "Sandalo Artigianale");

    // inStock=false is a no-op, not an out-of-stock filter
    let response = app
        .oneshot(get("/api/products?inStock=false"))
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_product_detail() {
    let (_dir, store) = temp_store();
    let app = app(state_over(test_config(), store));

    let response = app.clone().oneshot(get("/api/products/3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["name"], "Mocassino in Pelle Scamosciata");
    assert_eq!(body["sizes"].as_array().unwrap().len(), 6);

    let response = app.oneshot(get("/api/products/99")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "Product not found");
}

#[tokio::test]
async fn test_health_and_readiness() {
    let (_dir, store) = temp_store();
    let live = app(state_over(test_config(), store));

    let response = live.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");

    let response = live.oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Readiness degrades when the order document is unreadable
    let unready = app(state_over(test_config(), Arc::new(FailingStore)));
    let response = unready.oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
