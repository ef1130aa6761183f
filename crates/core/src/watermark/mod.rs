//! PDF watermarking.
//!
//! The watermark service takes a batch of PDFs plus the buyer's email and
//! order reference, stamps every page, and answers with a ZIP archive of the
//! personalized files.

mod error;
mod http;
mod traits;
mod types;

pub use error::WatermarkError;
pub use http::HttpWatermarker;
pub use traits::Watermarker;
pub use types::{WatermarkInput, WatermarkJob, WatermarkResult};
