//! Persistence seam for order placement.
//!
//! The Postgres store backs the running service; the in-memory store has the
//! same atomicity guarantees and backs the tests.

mod memory;
mod postgres;

pub use memory::MemoryCheckoutStore;
pub use postgres::PgCheckoutStore;

use async_trait::async_trait;
use shared::PaymentResult;
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::models::*;

/// Business rules read before an order is priced.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Minimum total units of the newest active requirement for `scope`
    /// (a role name or `ALL`).
    async fn requirement_for_scope(&self, scope: &str) -> anyhow::Result<Option<i32>>;

    async fn wholesale_min_quantity(&self) -> anyhow::Result<Option<i32>>;

    async fn is_wholesale_eligible(&self, user_id: Uuid) -> anyhow::Result<bool>;
}

/// Batch lookup into the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn products_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CatalogProduct>>;
}

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Units available for sale (on hand minus reserved). Read-time only.
    async fn available_stock(&self, product_id: Uuid, location_id: &str) -> anyhow::Result<i32>;

    async fn find_discount(&self, code: &str) -> anyhow::Result<Option<DiscountCode>>;

    async fn customer_contact(&self, user_id: Uuid) -> anyhow::Result<Option<CustomerContact>>;

    /// Writes the order, its items, the stock decrements, the wholesale upgrade
    /// and the discount redemption as one unit. Nothing persists on error.
    async fn commit_order(&self, draft: OrderDraft) -> Result<PersistedOrder, CheckoutError>;

    async fn record_payment(&self, order_id: Uuid, result: &PaymentResult) -> anyhow::Result<()>;
}
