use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bigdecimal::BigDecimal;
use order_service::api::{self, AppState};
use order_service::location::EAST_WAREHOUSE;
use order_service::models::{CatalogProduct, CustomerContact, DiscountCode, OrderDraft, PersistedOrder};
use order_service::notification::EmailService;
use order_service::store::{CheckoutStore, MemoryCheckoutStore, ProductCatalog, RuleStore};
use order_service::{CheckoutConfig, CheckoutError, OrderOrchestrator};
use payment_service::SimulatedGateway;
use serde_json::{json, Value};
use shared::{OrderConfirmation, PaymentResult};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct SilentEmail;

#[async_trait]
impl EmailService for SilentEmail {
    async fn send_order_confirmation(&self, _confirmation: &OrderConfirmation) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Every storage call fails, as with the database down.
struct UnreachableStore;

#[async_trait]
impl RuleStore for UnreachableStore {
    async fn requirement_for_scope(&self, _scope: &str) -> anyhow::Result<Option<i32>> {
        anyhow::bail!("connection refused")
    }

    async fn wholesale_min_quantity(&self) -> anyhow::Result<Option<i32>> {
        anyhow::bail!("connection refused")
    }

    async fn is_wholesale_eligible(&self, _user_id: Uuid) -> anyhow::Result<bool> {
        anyhow::bail!("connection refused")
    }
}

#[async_trait]
impl ProductCatalog for UnreachableStore {
    async fn products_by_ids(&self, _ids: &[Uuid]) -> anyhow::Result<Vec<CatalogProduct>> {
        anyhow::bail!("connection refused")
    }
}

#[async_trait]
impl CheckoutStore for UnreachableStore {
    async fn available_stock(&self, _product_id: Uuid, _location_id: &str) -> anyhow::Result<i32> {
        anyhow::bail!("connection refused")
    }

    async fn find_discount(&self, _code: &str) -> anyhow::Result<Option<DiscountCode>> {
        anyhow::bail!("connection refused")
    }

    async fn customer_contact(&self, _user_id: Uuid) -> anyhow::Result<Option<CustomerContact>> {
        anyhow::bail!("connection refused")
    }

    async fn commit_order(&self, _draft: OrderDraft) -> Result<PersistedOrder, CheckoutError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn record_payment(&self, _order_id: Uuid, _result: &PaymentResult) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
}

async fn app() -> (Router, MemoryCheckoutStore, Uuid) {
    let store = MemoryCheckoutStore::new();
    let widget = Uuid::new_v4();
    store
        .add_product(widget, "Widget", BigDecimal::from_str("12.50").unwrap(), true)
        .await;
    store.stock(widget, EAST_WAREHOUSE, 20).await.unwrap();
    store.set_requirement("customer", 2).await;

    let orchestrator = OrderOrchestrator::new(
        CheckoutConfig::default(),
        Arc::new(store.clone()),
        Arc::new(SimulatedGateway::new(1.0)),
        Arc::new(SilentEmail),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    let router = api::create_router(state, Arc::new(store.ledger()));
    (router, store, widget)
}

fn order_body(product_id: Uuid, quantity: i32) -> Value {
    json!({
        "items": [{ "productId": product_id, "quantity": quantity }],
        "shippingAddress": {
            "street": "1 Yonge St",
            "city": "Toronto",
            "province": "ON",
            "postalCode": "M5E 1W7"
        },
        "paymentMethod": "visa"
    })
}

fn post_order(body: String, user: Option<(Uuid, &str)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json");
    if let Some((user_id, role)) = user {
        builder = builder
            .header(api::USER_ID_HEADER, user_id.to_string())
            .header(api::USER_ROLE_HEADER, role);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn placing_an_order_returns_created() {
    let (router, store, widget) = app().await;

    let response = router
        .oneshot(post_order(
            order_body(widget, 4).to_string(),
            Some((Uuid::new_v4(), "customer")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "awaiting_approval");
    assert_eq!(body["paymentStatus"], "paid");
    let order_id = Uuid::parse_str(body["orderId"].as_str().unwrap()).unwrap();
    assert!(store.order(order_id).await.is_some());
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let (router, store, widget) = app().await;

    let response = router
        .oneshot(post_order(order_body(widget, 4).to_string(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn unknown_role_is_unauthorized() {
    let (router, _store, widget) = app().await;

    let response = router
        .oneshot(post_order(
            order_body(widget, 4).to_string(),
            Some((Uuid::new_v4(), "superuser")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn business_rule_failure_is_bad_request() {
    let (router, _store, widget) = app().await;

    let response = router
        .oneshot(post_order(
            order_body(widget, 1).to_string(),
            Some((Uuid::new_v4(), "customer")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body["error"],
        "minimum order quantity is 2 units for this account, but this order has 1 units"
    );
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (router, _store, _widget) = app().await;

    let response = router
        .oneshot(post_order("{\"items\": [".to_string(), Some((Uuid::new_v4(), "customer"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn storage_outage_is_internal_error() {
    let orchestrator = OrderOrchestrator::new(
        CheckoutConfig::default(),
        Arc::new(UnreachableStore),
        Arc::new(SimulatedGateway::new(1.0)),
        Arc::new(SilentEmail),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    let router = api::create_router(state, Arc::new(MemoryCheckoutStore::new().ledger()));

    let response = router
        .oneshot(post_order(
            order_body(Uuid::new_v4(), 4).to_string(),
            Some((Uuid::new_v4(), "customer")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "order could not be placed");
}

#[tokio::test]
async fn inventory_routes_are_nested() {
    let (router, _store, widget) = app().await;

    let placed = router
        .clone()
        .oneshot(post_order(
            order_body(widget, 5).to_string(),
            Some((Uuid::new_v4(), "customer")),
        ))
        .await
        .unwrap();
    assert_eq!(placed.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/inventory/{}/{}", widget, EAST_WAREHOUSE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let level = read_json(response).await;
    assert_eq!(level["quantity"], 15);

    let health = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
