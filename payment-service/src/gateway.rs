use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use shared::{PaymentMethod, PaymentResult};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub user_id: Uuid,
}

/// Adapter in front of a payment provider.
///
/// A declined payment is an `Ok` result with `success == false`; `Err` is
/// reserved for transport failures where the outcome is unknown.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process_payment(&self, request: &PaymentRequest) -> anyhow::Result<PaymentResult>;
}
