use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::client::{ClientFactory, StorageClient};
use super::error::{ProbeError, Result, UploadError};
use super::keys::normalize_destination;
use super::queue::{DEFAULT_QUEUE_CAPACITY, WorkQueue};
use super::worker::{FailurePolicy, UploadWorker, WorkerContext, WorkerReport};

pub const DEFAULT_WORKERS: usize = 20;

/// Parameters of one upload job
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub source: PathBuf,
    pub bucket: String,
    pub destination: Option<String>,
    pub workers: usize,
    pub queue_capacity: usize,
    pub policy: FailurePolicy,
}

impl UploadJob {
    pub fn new(source: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bucket: bucket.into(),
            destination: None,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            policy: FailurePolicy::default(),
        }
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pre-flight checks; nothing has been touched if these fail
    fn validate(&self) -> Result<()> {
        if !self.source.exists() {
            return Err(UploadError::InvalidInput(format!(
                "{} doesn't exist",
                self.source.display()
            )));
        }

        if let Some(destination) = &self.destination
            && destination.trim().is_empty()
        {
            return Err(UploadError::InvalidInput(
                "destination must not be blank".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(UploadError::InvalidInput(
                "at least one worker is required".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(UploadError::InvalidInput(
                "queue capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Result of a job where every file was uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub elapsed: Duration,
}

/// Upload `job.source` to `job.bucket` with a pool of `job.workers` workers
///
/// Paths are streamed from the walk into a bounded queue, so the walk stalls
/// whenever the workers fall behind. Returns once every enqueued file has
/// been uploaded (or has failed, see [`FailurePolicy`]).
pub async fn upload<F: ClientFactory>(factory: &F, job: UploadJob) -> Result<UploadSummary> {
    let start = Instant::now();
    job.validate()?;

    let destination = normalize_destination(job.destination.as_deref());

    let probe = factory.create().await.map_err(UploadError::Session)?;
    resolve_bucket(&probe, &job.bucket).await?;
    drop(probe);

    info!(
        "Uploading {} to s3://{}/{} with {} workers",
        job.source.display(),
        job.bucket,
        destination,
        job.workers
    );

    let mut queue = WorkQueue::new(job.queue_capacity);
    let shutdown = CancellationToken::new();
    let ctx = Arc::new(WorkerContext {
        bucket: job.bucket.clone(),
        source: job.source.clone(),
        destination,
        policy: job.policy,
        abort_cause: OnceLock::new(),
    });

    let mut workers = JoinSet::new();
    for id in 0..job.workers {
        let client = factory.create().await.map_err(UploadError::Session)?;
        let worker = UploadWorker::new(
            id,
            client,
            queue.receiver(),
            Arc::clone(&ctx),
            shutdown.clone(),
        );
        workers.spawn(worker.run());
    }

    let mut enqueued = 0usize;
    for path in enumerate_files(&job.source) {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            res = queue.put(path) => {
                res?;
                enqueued += 1;
            }
        }
    }
    queue.close();
    debug!("Enqueued {} file(s)", enqueued);

    // Once cancelled the remaining queued paths are abandoned, so the barrier
    // would never open.
    tokio::select! {
        _ = queue.join() => {}
        _ = shutdown.cancelled() => {}
    }

    let mut uploaded = 0;
    let mut failures = Vec::new();
    let mut panicked = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(WorkerReport {
                uploaded: n,
                failures: f,
            }) => {
                uploaded += n;
                failures.extend(f);
            }
            Err(e) => {
                panicked.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if let Some(reason) = panicked {
        return Err(UploadError::WorkerPanicked(reason));
    }

    if !failures.is_empty() {
        return Err(match job.policy {
            FailurePolicy::Abort => UploadError::Aborted {
                failure: ctx
                    .abort_cause
                    .get()
                    .cloned()
                    .unwrap_or_else(|| failures.swap_remove(0)),
                uploaded,
            },
            FailurePolicy::Isolate => UploadError::UploadFailed { failures, uploaded },
        });
    }

    let elapsed = start.elapsed();
    info!("Uploaded all data in {:.2}s", elapsed.as_secs_f64());

    Ok(UploadSummary { uploaded, elapsed })
}

async fn resolve_bucket<C: StorageClient>(client: &C, bucket: &str) -> Result<()> {
    match client.head_bucket(bucket).await {
        Ok(()) => Ok(()),
        Err(ProbeError::NotFound) => Err(UploadError::BucketNotFound {
            bucket: bucket.to_string(),
        }),
        Err(source) => Err(UploadError::BucketProbe {
            bucket: bucket.to_string(),
            source,
        }),
    }
}

/// Lazily list the files under `source`
///
/// A directory is walked recursively, yielding regular files and symlinks
/// that point at regular files. Anything else yields just `source`.
pub fn enumerate_files(source: &Path) -> Box<dyn Iterator<Item = PathBuf> + Send> {
    if !source.is_dir() {
        return Box::new(std::iter::once(source.to_path_buf()));
    }

    Box::new(
        WalkDir::new(source)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| {
                entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
            })
            .map(|entry| entry.into_path()),
    )
}
