use std::path::PathBuf;
use thiserror::Error;

use super::queue::QueueClosed;

/// Outcome of a failed bucket existence probe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The service answered that the bucket does not exist
    #[error("bucket not found")]
    NotFound,

    /// The request never got a definitive answer (timeout, dispatch failure)
    #[error("transient error: {0}")]
    Transient(String),

    /// Any other service response, e.g. access denied
    #[error("{0}")]
    Unknown(String),
}

/// A single file whose upload failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub path: PathBuf,
    pub key: String,
    pub error: String,
}

/// Errors that can occur during a parallel upload job
#[derive(Error, Debug)]
pub enum UploadError {
    /// Bad job parameters, raised before anything touches the network
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The target bucket does not exist
    #[error("Bucket '{bucket}' doesn't exist")]
    BucketNotFound { bucket: String },

    /// Probing the bucket failed for a reason other than "not found"
    #[error("Failed to check bucket '{bucket}': {source}")]
    BucketProbe {
        bucket: String,
        #[source]
        source: ProbeError,
    },

    /// A storage client session could not be created
    #[error("Failed to create storage client: {0:#}")]
    Session(#[source] anyhow::Error),

    /// Some uploads failed; every enqueued file was still attempted
    #[error("{} upload(s) failed, {uploaded} succeeded", .failures.len())]
    UploadFailed {
        failures: Vec<FailedUpload>,
        uploaded: usize,
    },

    /// The job stopped at the first failed upload
    #[error("Upload of {} failed, job aborted: {}", .failure.path.display(), .failure.error)]
    Aborted {
        failure: FailedUpload,
        uploaded: usize,
    },

    #[error(transparent)]
    Queue(#[from] QueueClosed),

    #[error("Upload worker panicked: {0}")]
    WorkerPanicked(String),
}

impl UploadError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::BucketNotFound { bucket } => {
                format!(
                    "Bucket '{}' doesn't exist\n\nPossible solutions:\n  \
                     1. Check the bucket name for typos\n  \
                     2. Verify it exists: aws s3 ls s3://{}\n  \
                     3. Check AWS_REGION in .env matches the bucket region",
                    bucket, bucket
                )
            }
            Self::BucketProbe { bucket, source } => {
                format!(
                    "Could not verify bucket '{}': {}\n\nPossible solutions:\n  \
                     1. Check your AWS credentials: aws sts get-caller-identity\n  \
                     2. Verify your IAM user/role may call s3:ListBucket on '{}'\n  \
                     3. Check your network connection and try again",
                    bucket, source, bucket
                )
            }
            Self::UploadFailed { failures, uploaded } => {
                let mut message = format!(
                    "{} upload(s) failed, {} succeeded:",
                    failures.len(),
                    uploaded
                );
                for failure in failures {
                    message.push_str(&format!(
                        "\n  {} -> {}: {}",
                        failure.path.display(),
                        failure.key,
                        failure.error
                    ));
                }
                message
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for upload jobs
pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failed_message_lists_every_file() {
        let err = UploadError::UploadFailed {
            failures: vec![
                FailedUpload {
                    path: PathBuf::from("/data/a.txt"),
                    key: "a.txt".to_string(),
                    error: "timeout".to_string(),
                },
                FailedUpload {
                    path: PathBuf::from("/data/b.txt"),
                    key: "b.txt".to_string(),
                    error: "access denied".to_string(),
                },
            ],
            uploaded: 3,
        };

        assert_eq!(err.to_string(), "2 upload(s) failed, 3 succeeded");
        let message = err.user_message();
        assert!(message.contains("/data/a.txt -> a.txt: timeout"));
        assert!(message.contains("/data/b.txt -> b.txt: access denied"));
    }

    #[test]
    fn test_bucket_not_found_message() {
        let err = UploadError::BucketNotFound {
            bucket: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Bucket 'missing' doesn't exist");
        assert!(err.user_message().contains("aws s3 ls s3://missing"));
    }
}
