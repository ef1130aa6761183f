//! Paid-order fulfilment.

mod pipeline;
mod types;

pub use pipeline::OrderFulfiller;
pub use types::{FulfillmentConfig, FulfillmentError, ProcessResult};
