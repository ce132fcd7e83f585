use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient stock for product {product_id} at {location_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: Uuid,
        location_id: String,
        requested: i32,
        available: i32,
    },

    #[error("quantity must be non-zero and within bounds, got {0}")]
    InvalidQuantity(i32),

    #[error("cannot transfer stock from {0} to itself")]
    SameLocation(String),

    #[error("reservation {0} not found")]
    ReservationNotFound(Uuid),

    #[error("reservation {id} is already {status}")]
    ReservationClosed { id: Uuid, status: String },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}
