use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::inventory)]
pub struct InventoryRecord {
    pub product_id: Uuid,
    pub location_id: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn empty(product_id: Uuid, location_id: &str) -> Self {
        Self {
            product_id,
            location_id: location_id.to_string(),
            quantity: 0,
            reserved_quantity: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn available(&self) -> i32 {
        self.quantity - self.reserved_quantity
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::inventory)]
pub struct NewInventoryRecord {
    pub product_id: Uuid,
    pub location_id: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    InitialStock,
    OrderPlacement,
    Adjustment,
    Fulfillment,
    TransferOut,
    TransferIn,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::InitialStock => "initial_stock",
            MovementReason::OrderPlacement => "order_placement",
            MovementReason::Adjustment => "adjustment",
            MovementReason::Fulfillment => "fulfillment",
            MovementReason::TransferOut => "transfer_out",
            MovementReason::TransferIn => "transfer_in",
        }
    }
}

/// One append-only ledger row. Every change to `inventory.quantity` writes exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::stock_movements)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: String,
    pub delta: i32,
    pub reason: String,
    pub actor_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        product_id: Uuid,
        location_id: &str,
        delta: i32,
        reason: MovementReason,
        actor_id: Option<Uuid>,
        order_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            location_id: location_id.to_string(),
            delta,
            reason: reason.as_str().to_string(),
            actor_id,
            order_id,
            created_at: Utc::now(),
        }
    }
}

pub const RESERVED: &str = "reserved";
pub const FULFILLED: &str = "fulfilled";
pub const RELEASED: &str = "released";

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::reservations)]
pub struct Reservation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: String,
    pub order_id: Option<Uuid>,
    pub quantity: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(product_id: Uuid, location_id: &str, quantity: i32, order_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            product_id,
            location_id: location_id.to_string(),
            order_id,
            quantity,
            status: RESERVED.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStock {
    pub product_id: Uuid,
    pub location_id: String,
    pub delta: i32,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveStock {
    pub product_id: Uuid,
    pub location_id: String,
    pub quantity: i32,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferStock {
    pub product_id: Uuid,
    pub from_location: String,
    pub to_location: String,
    pub quantity: i32,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub source: InventoryRecord,
    pub destination: InventoryRecord,
}
