pub mod client;
pub mod error;
pub mod helpers;
pub mod keys;
pub mod queue;
pub mod upload;
pub mod worker;

pub use client::{AwsClientFactory, DryRunFactory};
pub use error::UploadError;
pub use queue::DEFAULT_QUEUE_CAPACITY;
pub use upload::{DEFAULT_WORKERS, UploadJob, UploadSummary, upload};
pub use worker::FailurePolicy;
