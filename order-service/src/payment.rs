use payment_service::{PaymentGateway, PaymentRequest};
use shared::{PaymentResult, PaymentStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

use crate::store::CheckoutStore;

/// Runs payment for a committed order. Neither a declined payment nor a
/// gateway failure touches the order or its stock; the outcome is recorded
/// as the order's payment status. A gateway call that panics counts as a
/// failed payment.
pub struct PaymentDispatcher {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn CheckoutStore>,
    wait: Duration,
}

impl PaymentDispatcher {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: Arc<dyn CheckoutStore>, wait: Duration) -> Self {
        Self { gateway, store, wait }
    }

    /// Starts the payment on its own task and waits up to the configured
    /// duration for the outcome. `None` means it is still in flight; the
    /// task keeps running and records the result when it lands.
    pub async fn dispatch(&self, request: PaymentRequest) -> Option<PaymentResult> {
        let order_id = request.order_id;
        let handle = tokio::spawn(settle(self.gateway.clone(), self.store.clone(), request));

        match time::timeout(self.wait, handle).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                error!("Payment task for order {} aborted: {}", order_id, e);
                None
            }
            Err(_) => {
                warn!(
                    "Payment for order {} still pending after {:?}, responding without it",
                    order_id, self.wait
                );
                None
            }
        }
    }
}

async fn settle(
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn CheckoutStore>,
    request: PaymentRequest,
) -> PaymentResult {
    let call = {
        let request = request.clone();
        tokio::spawn(async move { gateway.process_payment(&request).await })
    };

    let result = match call.await {
        Ok(Ok(result)) if result.success => result,
        Ok(Ok(result)) => {
            warn!("Payment declined for order {}: {}", request.order_id, result.message);
            PaymentResult {
                status: PaymentStatus::Failed,
                ..result
            }
        }
        Ok(Err(e)) => {
            error!("Payment gateway error for order {}: {}", request.order_id, e);
            failed(format!("Payment could not be processed: {}", e))
        }
        Err(e) => {
            error!("Payment gateway call for order {} aborted: {}", request.order_id, e);
            failed("Payment could not be processed: gateway call aborted".to_string())
        }
    };

    match store.record_payment(request.order_id, &result).await {
        Ok(()) => info!(
            "Payment for order {} settled as {}",
            request.order_id,
            result.status.as_str()
        ),
        Err(e) => error!(
            "Failed to record payment status {} for order {}: {}",
            result.status.as_str(),
            request.order_id,
            e
        ),
    }

    result
}

fn failed(message: String) -> PaymentResult {
    PaymentResult {
        success: false,
        status: PaymentStatus::Failed,
        transaction_id: None,
        message,
    }
}
