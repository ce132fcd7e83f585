use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use inventory_service::api::SharedLedger;
use serde::Serialize;
use shared::*;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::orchestrator::OrderOrchestrator;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<OrderOrchestrator>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

/// Caller identity forwarded by the auth gateway.
pub struct Authenticated(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)
            .and_then(|value| value.parse::<Uuid>().ok())
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "authentication required"))?;
        let role = header(parts, USER_ROLE_HEADER)
            .and_then(|value| value.parse::<UserRole>().ok())
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "authentication required"))?;

        Ok(Authenticated(Identity { user_id, role }))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn create_router(state: AppState, ledger: SharedLedger) -> Router {
    Router::new()
        .route("/orders", post(place_order))
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/inventory", inventory_service::api::create_router(ledger))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn place_order(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    match state.orchestrator.place_order(identity, request).await {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(e) if e.is_client_error() => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("Failed to place order for user {}: {:?}", identity.user_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
