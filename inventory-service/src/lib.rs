pub mod api;
pub mod book;
pub mod error;
pub mod ledger;
pub mod models;
pub mod pg;
pub mod schema;

use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

pub use book::StockBook;
pub use error::LedgerError;
pub use ledger::{InventoryLedger, MemoryInventoryLedger, PgInventoryLedger};

pub type DbPool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;
