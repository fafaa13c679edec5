use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{
    Client, error::SdkError, operation::head_bucket::HeadBucketError, primitives::ByteStream,
};
use std::path::Path;
use tracing::{debug, info};

use super::error::ProbeError;
use super::helpers::ContentMetadata;

/// Operations the upload pipeline needs from an object store
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Check that `bucket` exists and is reachable with the current credentials
    async fn head_bucket(&self, bucket: &str) -> std::result::Result<(), ProbeError>;

    /// Upload the file at `local_path` as `bucket/key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        metadata: &ContentMetadata,
    ) -> Result<()>;
}

/// Builds one client session per worker
///
/// Sessions are never shared between workers; the coordinator asks for a new
/// one for the bucket probe and for each worker it starts.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: StorageClient + 'static;

    async fn create(&self) -> Result<Self::Client>;
}

/// Factory producing AWS SDK clients from an explicitly loaded config
#[derive(Debug, Clone)]
pub struct AwsClientFactory {
    sdk_config: SdkConfig,
}

impl AwsClientFactory {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    type Client = S3Client;

    async fn create(&self) -> Result<S3Client> {
        Ok(S3Client {
            client: Client::new(&self.sdk_config),
        })
    }
}

pub struct S3Client {
    client: Client,
}

#[async_trait]
impl StorageClient for S3Client {
    async fn head_bucket(&self, bucket: &str) -> std::result::Result<(), ProbeError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => Err(classify_probe_error(err)),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        metadata: &ContentMetadata,
    ) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .context("Failed to create byte stream from file")?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .set_content_type(metadata.content_type.map(str::to_string))
            .set_content_encoding(metadata.content_encoding.map(str::to_string))
            .send()
            .await
            .context("Failed to upload file to S3")?;

        Ok(())
    }
}

fn classify_probe_error(err: SdkError<HeadBucketError>) -> ProbeError {
    match &err {
        SdkError::ServiceError(service_err) => {
            // HEAD responses carry no body, so the status code is all we get
            let status = service_err.raw().status().as_u16();
            debug!("Bucket probe returned HTTP {}", status);
            if service_err.err().is_not_found() || status == 404 {
                ProbeError::NotFound
            } else {
                ProbeError::Unknown(format!("HTTP {}: {}", status, service_err.err()))
            }
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProbeError::Transient(format!("{:?}", err))
        }
        _ => ProbeError::Unknown(err.to_string()),
    }
}

/// Wraps another factory so that nothing is written to the bucket
///
/// The bucket probe still goes to the real service, uploads are only logged.
pub struct DryRunFactory<F> {
    inner: F,
}

impl<F> DryRunFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<F: ClientFactory> ClientFactory for DryRunFactory<F> {
    type Client = DryRunClient<F::Client>;

    async fn create(&self) -> Result<Self::Client> {
        Ok(DryRunClient {
            inner: self.inner.create().await?,
        })
    }
}

pub struct DryRunClient<C> {
    inner: C,
}

#[async_trait]
impl<C: StorageClient> StorageClient for DryRunClient<C> {
    async fn head_bucket(&self, bucket: &str) -> std::result::Result<(), ProbeError> {
        self.inner.head_bucket(bucket).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        metadata: &ContentMetadata,
    ) -> Result<()> {
        info!(
            "[dry-run] would upload {} -> s3://{}/{} (type: {}, encoding: {})",
            local_path.display(),
            bucket,
            key,
            metadata.content_type.unwrap_or("-"),
            metadata.content_encoding.unwrap_or("-")
        );
        Ok(())
    }
}
