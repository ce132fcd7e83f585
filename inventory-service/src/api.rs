use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::InventoryLedger;
use crate::models::*;

pub type SharedLedger = Arc<dyn InventoryLedger>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FulfillRequest {
    pub actor_id: Option<Uuid>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Routes for the supplementary ledger operations, meant to be nested under `/inventory`.
pub fn create_router(ledger: SharedLedger) -> Router {
    Router::new()
        .route("/adjust", post(adjust))
        .route("/transfer", post(transfer))
        .route("/reservations", post(reserve))
        .route("/reservations/:id/fulfill", post(fulfill))
        .route("/reservations/:id/release", post(release))
        .route("/:product_id/:location_id", get(level))
        .route("/:product_id/:location_id/movements", get(movements))
        .with_state(ledger)
}

fn reject(err: LedgerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        LedgerError::InsufficientStock { .. } | LedgerError::ReservationClosed { .. } => StatusCode::CONFLICT,
        LedgerError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InvalidQuantity(_) | LedgerError::SameLocation(_) => StatusCode::BAD_REQUEST,
        LedgerError::Database(_) | LedgerError::Infrastructure(_) => {
            error!("Inventory operation failed: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "inventory operation failed".to_string(),
                }),
            );
        }
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

async fn level(
    State(ledger): State<SharedLedger>,
    Path((product_id, location_id)): Path<(Uuid, String)>,
) -> ApiResult<InventoryRecord> {
    ledger.level(product_id, location_id).await.map(Json).map_err(reject)
}

async fn movements(
    State(ledger): State<SharedLedger>,
    Path((product_id, location_id)): Path<(Uuid, String)>,
) -> ApiResult<Vec<StockMovement>> {
    ledger.movements(product_id, location_id).await.map(Json).map_err(reject)
}

async fn adjust(State(ledger): State<SharedLedger>, Json(request): Json<AdjustStock>) -> ApiResult<InventoryRecord> {
    ledger.adjust(request).await.map(Json).map_err(reject)
}

async fn transfer(State(ledger): State<SharedLedger>, Json(request): Json<TransferStock>) -> ApiResult<TransferReceipt> {
    ledger.transfer(request).await.map(Json).map_err(reject)
}

async fn reserve(State(ledger): State<SharedLedger>, Json(request): Json<ReserveStock>) -> ApiResult<Reservation> {
    ledger.reserve(request).await.map(Json).map_err(reject)
}

async fn fulfill(
    State(ledger): State<SharedLedger>,
    Path(id): Path<Uuid>,
    body: Option<Json<FulfillRequest>>,
) -> ApiResult<Reservation> {
    let actor_id = body.and_then(|Json(b)| b.actor_id);
    ledger.fulfill(id, actor_id).await.map(Json).map_err(reject)
}

async fn release(State(ledger): State<SharedLedger>, Path(id): Path<Uuid>) -> ApiResult<Reservation> {
    ledger.release(id).await.map(Json).map_err(reject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryInventoryLedger;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn overdrawn_transfer_is_a_conflict() {
        let product = Uuid::new_v4();
        let ledger = MemoryInventoryLedger::new();
        ledger
            .adjust(AdjustStock {
                product_id: product,
                location_id: "eastern-warehouse".to_string(),
                delta: 2,
                actor_id: None,
            })
            .await
            .unwrap();
        let app = create_router(Arc::new(ledger.clone()));

        let response = app
            .oneshot(json_post(
                "/transfer",
                serde_json::json!({
                    "product_id": product,
                    "from_location": "eastern-warehouse",
                    "to_location": "western-warehouse",
                    "quantity": 3
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let level = ledger.level(product, "eastern-warehouse".to_string()).await.unwrap();
        assert_eq!(level.quantity, 2);
    }

    #[tokio::test]
    async fn adjust_then_read_level() {
        let product = Uuid::new_v4();
        let app = create_router(Arc::new(MemoryInventoryLedger::new()));

        let response = app
            .clone()
            .oneshot(json_post(
                "/adjust",
                serde_json::json!({"product_id": product, "location_id": "eastern-warehouse", "delta": 7}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{}/eastern-warehouse", product))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let record: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(record["quantity"], 7);
    }
}
