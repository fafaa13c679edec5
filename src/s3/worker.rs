use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::client::StorageClient;
use super::error::FailedUpload;
use super::helpers::resolve_content_metadata;
use super::keys::derive_key;
use super::queue::WorkReceiver;

/// What a worker does after a failed upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and keep consuming the queue
    #[default]
    Isolate,
    /// Cancel the whole job on the first failure
    Abort,
}

/// Parameters every worker in a job shares
#[derive(Debug)]
pub struct WorkerContext {
    pub bucket: String,
    pub source: PathBuf,
    /// Already normalized, empty for the bucket root
    pub destination: String,
    pub policy: FailurePolicy,
    /// Failure that cancelled the job under [`FailurePolicy::Abort`]; set once
    pub abort_cause: OnceLock<FailedUpload>,
}

/// Per-worker tally returned when the worker exits
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub uploaded: usize,
    pub failures: Vec<FailedUpload>,
}

/// One slot of the pool, owning its own client session
pub struct UploadWorker<C> {
    id: usize,
    client: C,
    queue: WorkReceiver<PathBuf>,
    ctx: Arc<WorkerContext>,
    shutdown: CancellationToken,
}

impl<C: StorageClient> UploadWorker<C> {
    pub fn new(
        id: usize,
        client: C,
        queue: WorkReceiver<PathBuf>,
        ctx: Arc<WorkerContext>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            client,
            queue,
            ctx,
            shutdown,
        }
    }

    /// Consume the queue until it is closed and drained or the job is cancelled
    pub async fn run(self) -> WorkerReport {
        // A panic below drops this guard and cancels the job, so neither the
        // producer nor the other workers wait on a dead pool.
        let guard = self.shutdown.clone().drop_guard();
        let mut report = WorkerReport::default();

        loop {
            let task = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                task = self.queue.get() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            let path = task.item();
            match self.upload_one(path).await {
                Ok(key) => {
                    info!(
                        "Uploaded {} -> s3://{}/{}",
                        path.display(),
                        self.ctx.bucket,
                        key
                    );
                    report.uploaded += 1;
                }
                Err(failure) => {
                    error!("Upload failed for {}: {}", path.display(), failure.error);
                    report.failures.push(failure.clone());

                    if self.ctx.policy == FailurePolicy::Abort {
                        // Only the first worker to fail names the cause
                        let _ = self.ctx.abort_cause.set(failure);
                        self.shutdown.cancel();
                        break;
                    }
                }
            }
            // `task` drops here and marks the path done
        }

        guard.disarm();
        debug!(
            "[worker {}] exiting: {} uploaded, {} failed",
            self.id,
            report.uploaded,
            report.failures.len()
        );
        report
    }

    async fn upload_one(&self, path: &Path) -> Result<String, FailedUpload> {
        let Some(key) = derive_key(path, &self.ctx.source, &self.ctx.destination) else {
            return Err(FailedUpload {
                path: path.to_path_buf(),
                key: path.to_string_lossy().to_string(),
                error: "path is not valid UTF-8 and cannot be mapped to an S3 key".to_string(),
            });
        };
        let metadata = resolve_content_metadata(path);

        debug!("[worker {}] Uploading {}", self.id, path.display());

        self.client
            .put_object(&self.ctx.bucket, &key, path, &metadata)
            .await
            .map_err(|e| FailedUpload {
                path: path.to_path_buf(),
                key: key.clone(),
                error: format!("{:#}", e),
            })?;

        Ok(key)
    }
}
