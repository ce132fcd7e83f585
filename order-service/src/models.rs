use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use shared::*;
use uuid::Uuid;

use crate::pricing::PriceBreakdown;

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub subtotal: BigDecimal,
    pub discount_amount: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub taxes: BigDecimal,
    pub total_amount: BigDecimal,
    pub is_wholesale: bool,
    pub total_quantity: i32,
    pub location_id: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub payment_method: String,
    pub payment_status: String,
    pub payment_transaction_id: Option<String>,
    pub discount_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::order_items)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price_per_item: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::order_status_history)]
pub struct NewStatusHistory {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub note: Option<String>,
}

impl NewStatusHistory {
    pub fn new(order_id: Uuid, status: OrderStatus, note: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            status: status.as_str().to_string(),
            note: note.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::outbox_events)]
pub struct DbOutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEvent> for DbOutboxEvent {
    fn from(event: OutboxEvent) -> Self {
        Self {
            id: event.id,
            aggregate_id: event.aggregate_id,
            event_type: event.event_type,
            event_data: event.event_data,
            processed: event.processed,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct DbProduct {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub is_active: bool,
}

impl From<DbProduct> for CatalogProduct {
    fn from(row: DbProduct) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct DbDiscountCode {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub discount_value: BigDecimal,
    pub min_order_amount: BigDecimal,
    pub max_discount_amount: Option<BigDecimal>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscountCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: BigDecimal,
    pub min_order_amount: BigDecimal,
    pub max_discount_amount: Option<BigDecimal>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub is_active: bool,
}

impl TryFrom<DbDiscountCode> for DiscountCode {
    type Error = anyhow::Error;

    fn try_from(row: DbDiscountCode) -> Result<Self, Self::Error> {
        let discount_type = row
            .discount_type
            .parse::<DiscountType>()
            .map_err(|e| anyhow::anyhow!("discount code {}: {}", row.code, e))?;

        Ok(Self {
            code: row.code,
            discount_type,
            discount_value: row.discount_value,
            min_order_amount: row.min_order_amount,
            max_discount_amount: row.max_discount_amount,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            usage_limit: row.usage_limit,
            times_used: row.times_used,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct CustomerContact {
    pub email: String,
    pub name: String,
}

/// An order line with its catalog name and price frozen at purchase time.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * &BigDecimal::from(self.quantity)
    }

    pub fn summary(&self) -> OrderLineSummary {
        OrderLineSummary {
            product_id: self.product_id,
            name: self.name.clone(),
            quantity: self.quantity,
            price_per_item: self.unit_price.clone(),
        }
    }
}

/// Everything the order transaction writes, computed before it opens.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub location_id: String,
    pub lines: Vec<PricedLine>,
    pub pricing: PriceBreakdown,
    pub total_quantity: i32,
    pub is_wholesale: bool,
    pub upgrade_to_wholesale: bool,
    pub discount_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

impl OrderDraft {
    pub fn to_order(&self) -> serde_json::Result<Order> {
        let now = Utc::now();
        Ok(Order {
            id: self.order_id,
            user_id: self.user_id,
            status: self.status.as_str().to_string(),
            subtotal: self.pricing.subtotal.clone(),
            discount_amount: self.pricing.discount_amount.clone(),
            shipping_cost: self.pricing.shipping_cost.clone(),
            taxes: self.pricing.taxes.clone(),
            total_amount: self.pricing.total_amount.clone(),
            is_wholesale: self.is_wholesale,
            total_quantity: self.total_quantity,
            location_id: self.location_id.clone(),
            shipping_address: serde_json::to_value(&self.shipping_address)?,
            billing_address: serde_json::to_value(&self.billing_address)?,
            payment_method: self.payment_method.as_str().to_string(),
            payment_status: self.payment_status.as_str().to_string(),
            payment_transaction_id: None,
            discount_code: self.discount_code.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn to_items(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id: self.order_id,
                product_id: line.product_id,
                name: line.name.clone(),
                price_per_item: line.unit_price.clone(),
                quantity: line.quantity,
            })
            .collect()
    }

    pub fn placed_event(&self) -> OrderPlacedEvent {
        OrderPlacedEvent {
            order_id: self.order_id,
            user_id: self.user_id,
            location_id: self.location_id.clone(),
            total_amount: self.pricing.total_amount.clone(),
            is_wholesale: self.is_wholesale,
            discount_code: self.discount_code.clone(),
            lines: self.lines.iter().map(PricedLine::summary).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedOrder {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}
