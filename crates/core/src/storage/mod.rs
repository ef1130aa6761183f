//! Object storage for comic assets and order archives.

mod error;
mod s3;
mod traits;

pub use error::StorageError;
pub use s3::S3Storage;
pub use traits::ObjectStorage;
