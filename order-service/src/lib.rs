pub mod api;
pub mod config;
pub mod discount;
pub mod error;
pub mod location;
pub mod models;
pub mod notification;
pub mod orchestrator;
pub mod outbox;
pub mod payment;
pub mod pricing;
pub mod requirements;
pub mod schema;
pub mod store;
pub mod wholesale;

pub use config::{Args, CheckoutConfig};
pub use error::CheckoutError;
pub use orchestrator::OrderOrchestrator;
