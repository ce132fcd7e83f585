mod gateway;
mod simulated;

pub use gateway::{PaymentGateway, PaymentRequest};
pub use simulated::SimulatedGateway;
