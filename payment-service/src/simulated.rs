use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use shared::{PaymentResult, PaymentStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::gateway::{PaymentGateway, PaymentRequest};

/// Gateway stand-in that captures card-style payments with a fixed success rate.
pub struct SimulatedGateway {
    success_rate: f64,
}

impl SimulatedGateway {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn process_payment(&self, request: &PaymentRequest) -> anyhow::Result<PaymentResult> {
        if request.amount <= BigDecimal::zero() {
            return Ok(PaymentResult {
                success: false,
                status: PaymentStatus::Failed,
                transaction_id: None,
                message: format!("invalid payment amount {}", request.amount),
            });
        }

        if request.method.requires_confirmation() {
            info!(
                "Payment for order {} via {} awaits confirmation",
                request.order_id,
                request.method.as_str()
            );
            return Ok(PaymentResult {
                success: true,
                status: PaymentStatus::AwaitingConfirmation,
                transaction_id: Some(format!("ref_{}", Uuid::new_v4().simple())),
                message: format!("awaiting {} confirmation", request.method.as_str()),
            });
        }

        let should_succeed = rand::random::<f64>() < self.success_rate;
        if !should_succeed {
            warn!("Simulated decline for order {}", request.order_id);
            return Ok(PaymentResult {
                success: false,
                status: PaymentStatus::Failed,
                transaction_id: None,
                message: "Payment processing failed".to_string(),
            });
        }

        Ok(PaymentResult {
            success: true,
            status: PaymentStatus::Paid,
            transaction_id: Some(format!("txn_{}", Uuid::new_v4().simple())),
            message: "payment captured".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PaymentMethod;
    use std::str::FromStr;

    fn request(method: PaymentMethod, amount: &str) -> PaymentRequest {
        PaymentRequest {
            order_id: Uuid::new_v4(),
            amount: BigDecimal::from_str(amount).unwrap(),
            method,
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn card_payment_is_captured_when_always_succeeding() {
        let gateway = SimulatedGateway::new(1.0);
        let result = gateway
            .process_payment(&request(PaymentMethod::CreditCard, "42.50"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.status, PaymentStatus::Paid);
        assert!(result.transaction_id.unwrap().starts_with("txn_"));
    }

    #[tokio::test]
    async fn card_payment_is_declined_when_never_succeeding() {
        let gateway = SimulatedGateway::new(0.0);
        let result = gateway
            .process_payment(&request(PaymentMethod::Paypal, "42.50"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn bank_transfer_awaits_confirmation_without_capture() {
        let gateway = SimulatedGateway::new(0.0);
        let result = gateway
            .process_payment(&request(PaymentMethod::BankTransfer, "10"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.status, PaymentStatus::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn non_positive_amount_is_declined() {
        let gateway = SimulatedGateway::new(1.0);
        let result = gateway
            .process_payment(&request(PaymentMethod::CreditCard, "0"))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
