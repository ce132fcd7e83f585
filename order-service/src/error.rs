use inventory_service::LedgerError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("minimum order quantity is {minimum} units for this account, but this order has {actual} units")]
    BelowMinimum { minimum: i32, actual: i32 },

    #[error("product {0} does not exist or is no longer available")]
    ProductUnavailable(Uuid),

    #[error("insufficient stock for {product}, {available} available")]
    InsufficientStock { product: String, available: i32 },

    #[error("inventory changed for {product} ({available} available), please retry")]
    StockChanged { product: String, available: i32 },

    #[error("discount code {0} is no longer available, please retry")]
    DiscountExhausted(String),

    #[error("order could not be placed")]
    Infrastructure(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for CheckoutError {
    fn from(err: diesel::result::Error) -> Self {
        CheckoutError::Infrastructure(err.into())
    }
}

impl CheckoutError {
    /// Maps a failed decrement inside the order transaction. Losing the race
    /// for stock is a concurrency loss, not an infrastructure failure.
    pub fn from_ledger(err: LedgerError, product: &str) -> Self {
        match err {
            LedgerError::InsufficientStock { available, .. } => CheckoutError::StockChanged {
                product: product.to_string(),
                available,
            },
            LedgerError::Database(e) => e.into(),
            LedgerError::Infrastructure(e) => CheckoutError::Infrastructure(e),
            other => CheckoutError::Infrastructure(other.into()),
        }
    }

    /// Input, business-rule and concurrency-loss errors are the caller's to act on.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CheckoutError::Infrastructure(_))
    }
}
