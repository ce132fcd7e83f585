use anyhow::Result;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use inventory_service::DbPool;
use rdkafka::producer::{FutureProducer, FutureRecord};
use shared::OutboxEvent;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info};

use crate::models::*;
use crate::schema::*;

const BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct OutboxTopics {
    pub order_events: String,
    pub payment_events: String,
}

impl OutboxTopics {
    pub fn topic_for(&self, event_type: &str) -> &str {
        match event_type {
            OutboxEvent::ORDER_PLACED => &self.order_events,
            OutboxEvent::PAYMENT_RECORDED => &self.payment_events,
            _ => "domain-events",
        }
    }
}

/// Relays events written by the order transaction to Kafka.
pub struct OutboxProcessor {
    pool: DbPool,
    producer: FutureProducer,
    topics: OutboxTopics,
    interval: Duration,
}

impl OutboxProcessor {
    pub fn new(pool: DbPool, producer: FutureProducer, topics: OutboxTopics, interval: Duration) -> Self {
        Self {
            pool,
            producer,
            topics,
            interval,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.process_outbox_events().await {
                error!("Error processing outbox events: {}", e);
            }
        }
    }

    async fn process_outbox_events(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let unprocessed_events = outbox_events::table
            .filter(outbox_events::processed.eq(false))
            .order(outbox_events::created_at.asc())
            .limit(BATCH_SIZE)
            .load::<DbOutboxEvent>(&mut conn)
            .await?;

        if !unprocessed_events.is_empty() {
            debug!("Relaying {} outbox events", unprocessed_events.len());
        }

        for event in unprocessed_events {
            // Stop at the first failure so events for one order keep their order.
            if let Err(e) = self.publish_event(&event).await {
                error!("Failed to publish event {}: {}", event.id, e);
                break;
            }

            diesel::update(outbox_events::table.filter(outbox_events::id.eq(event.id)))
                .set(outbox_events::processed.eq(true))
                .execute(&mut conn)
                .await?;

            info!("Published {} event {} for order {}", event.event_type, event.id, event.aggregate_id);
        }

        Ok(())
    }

    async fn publish_event(&self, event: &DbOutboxEvent) -> Result<()> {
        let topic = self.topics.topic_for(&event.event_type);
        let json = serde_json::to_string(&event.event_data)?;
        let key = event.aggregate_id.to_string();
        let record = FutureRecord::to(topic).payload(&json).key(&key);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Failed to publish event: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_route_to_their_topics() {
        let topics = OutboxTopics {
            order_events: "orders".to_string(),
            payment_events: "payments".to_string(),
        };
        assert_eq!(topics.topic_for(OutboxEvent::ORDER_PLACED), "orders");
        assert_eq!(topics.topic_for(OutboxEvent::PAYMENT_RECORDED), "payments");
        assert_eq!(topics.topic_for("SomethingElse"), "domain-events");
    }
}
