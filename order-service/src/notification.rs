use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rdkafka::producer::{FutureProducer, FutureRecord};
use shared::{Address, OrderConfirmation, OrderLineSummary};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::CheckoutStore;

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> anyhow::Result<()>;
}

/// Hands confirmations to the mailer through a Kafka topic.
pub struct KafkaEmailService {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEmailService {
    pub fn new(producer: FutureProducer, topic: String) -> Self {
        Self { producer, topic }
    }
}

#[async_trait]
impl EmailService for KafkaEmailService {
    async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> anyhow::Result<()> {
        let json = serde_json::to_string(confirmation)?;
        let key = confirmation.order_id.to_string();
        let record = FutureRecord::to(&self.topic).payload(&json).key(&key);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Failed to publish order confirmation: {}", e))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationDetails {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total: BigDecimal,
    pub items: Vec<OrderLineSummary>,
    pub shipping_address: Address,
}

pub struct NotificationDispatcher {
    email: Arc<dyn EmailService>,
    store: Arc<dyn CheckoutStore>,
}

impl NotificationDispatcher {
    pub fn new(email: Arc<dyn EmailService>, store: Arc<dyn CheckoutStore>) -> Self {
        Self { email, store }
    }

    /// Fire-and-forget. Failures are logged and go nowhere else.
    pub fn dispatch(&self, details: ConfirmationDetails) -> JoinHandle<()> {
        let email = self.email.clone();
        let store = self.store.clone();
        tokio::spawn(async move {
            let order_id = details.order_id;
            if let Err(e) = send(email, store, details).await {
                warn!("Order confirmation for {} not sent: {}", order_id, e);
            }
        })
    }
}

async fn send(
    email: Arc<dyn EmailService>,
    store: Arc<dyn CheckoutStore>,
    details: ConfirmationDetails,
) -> anyhow::Result<()> {
    let contact = store
        .customer_contact(details.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no contact on file for user {}", details.user_id))?;

    let confirmation = OrderConfirmation {
        customer_email: contact.email,
        customer_name: contact.name,
        order_id: details.order_id,
        total: details.total,
        items: details.items,
        shipping_address: details.shipping_address,
    };
    email.send_order_confirmation(&confirmation).await?;
    info!("Sent order confirmation for {} to {}", confirmation.order_id, confirmation.customer_email);
    Ok(())
}
