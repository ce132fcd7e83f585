use async_trait::async_trait;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::book::StockBook;
use crate::error::LedgerError;
use crate::models::*;
use crate::{pg, DbPool};

/// Stock-level reads, adjustments, reservations and movement history.
///
/// Each call is atomic on its own. Order placement does not go through this
/// trait: it calls [`pg::decrement_for_order`] inside the order transaction.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn level(&self, product_id: Uuid, location_id: String) -> Result<InventoryRecord, LedgerError>;

    async fn adjust(&self, request: AdjustStock) -> Result<InventoryRecord, LedgerError>;

    async fn reserve(&self, request: ReserveStock) -> Result<Reservation, LedgerError>;

    async fn fulfill(&self, reservation_id: Uuid, actor_id: Option<Uuid>) -> Result<Reservation, LedgerError>;

    async fn release(&self, reservation_id: Uuid) -> Result<Reservation, LedgerError>;

    async fn transfer(&self, request: TransferStock) -> Result<TransferReceipt, LedgerError>;

    async fn movements(&self, product_id: Uuid, location_id: String) -> Result<Vec<StockMovement>, LedgerError>;
}

pub struct PgInventoryLedger {
    pool: DbPool,
}

impl PgInventoryLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryLedger for PgInventoryLedger {
    async fn level(&self, product_id: Uuid, location_id: String) -> Result<InventoryRecord, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        pg::level(&mut conn, product_id, &location_id).await
    }

    async fn adjust(&self, request: AdjustStock) -> Result<InventoryRecord, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let record = conn
            .transaction::<_, LedgerError, _>(|conn| Box::pin(async move { pg::adjust(conn, &request).await }))
            .await?;

        info!(
            "Adjusted stock for {} at {}: now {} on hand",
            record.product_id, record.location_id, record.quantity
        );
        Ok(record)
    }

    async fn reserve(&self, request: ReserveStock) -> Result<Reservation, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        let conn: &mut AsyncPgConnection = &mut conn;
        conn.transaction::<_, LedgerError, _>(|conn| Box::pin(async move { pg::reserve(conn, &request).await }))
            .await
    }

    async fn fulfill(&self, reservation_id: Uuid, actor_id: Option<Uuid>) -> Result<Reservation, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let reservation = conn
            .transaction::<_, LedgerError, _>(|conn| {
                Box::pin(async move { pg::fulfill(conn, reservation_id, actor_id).await })
            })
            .await?;

        info!("Reservation {} fulfilled", reservation.id);
        Ok(reservation)
    }

    async fn release(&self, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let reservation = conn
            .transaction::<_, LedgerError, _>(|conn| Box::pin(async move { pg::release(conn, reservation_id).await }))
            .await?;

        info!("Reservation {} released", reservation.id);
        Ok(reservation)
    }

    async fn transfer(&self, request: TransferStock) -> Result<TransferReceipt, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let receipt = conn
            .transaction::<_, LedgerError, _>(|conn| Box::pin(async move { pg::transfer(conn, &request).await }))
            .await?;

        info!(
            "Transferred stock of {} from {} to {}",
            receipt.source.product_id, receipt.source.location_id, receipt.destination.location_id
        );
        Ok(receipt)
    }

    async fn movements(&self, product_id: Uuid, location_id: String) -> Result<Vec<StockMovement>, LedgerError> {
        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        pg::movements(&mut conn, product_id, &location_id).await
    }
}

/// Ledger over a shared [`StockBook`], for tests and local runs.
#[derive(Clone, Default)]
pub struct MemoryInventoryLedger {
    book: Arc<Mutex<StockBook>>,
}

impl MemoryInventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_book(book: StockBook) -> Self {
        Self {
            book: Arc::new(Mutex::new(book)),
        }
    }

    /// Runs `f` with exclusive access to the book.
    pub async fn with_book<R>(&self, f: impl FnOnce(&mut StockBook) -> R) -> R {
        let mut book = self.book.lock().await;
        f(&mut book)
    }
}

#[async_trait]
impl InventoryLedger for MemoryInventoryLedger {
    async fn level(&self, product_id: Uuid, location_id: String) -> Result<InventoryRecord, LedgerError> {
        Ok(self.book.lock().await.level(product_id, &location_id))
    }

    async fn adjust(&self, request: AdjustStock) -> Result<InventoryRecord, LedgerError> {
        self.book.lock().await.adjust(&request)
    }

    async fn reserve(&self, request: ReserveStock) -> Result<Reservation, LedgerError> {
        self.book.lock().await.reserve(&request)
    }

    async fn fulfill(&self, reservation_id: Uuid, actor_id: Option<Uuid>) -> Result<Reservation, LedgerError> {
        self.book.lock().await.fulfill(reservation_id, actor_id)
    }

    async fn release(&self, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
        self.book.lock().await.release(reservation_id)
    }

    async fn transfer(&self, request: TransferStock) -> Result<TransferReceipt, LedgerError> {
        self.book.lock().await.transfer(&request)
    }

    async fn movements(&self, product_id: Uuid, location_id: String) -> Result<Vec<StockMovement>, LedgerError> {
        Ok(self.book.lock().await.movements(product_id, &location_id))
    }
}
