mod config;
mod s3;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use config::Config;
use s3::{
    AwsClientFactory, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, DryRunFactory, FailurePolicy,
    UploadError, UploadJob, UploadSummary, upload,
};

#[derive(Parser, Debug)]
#[command(
    name = "s3upload",
    version = env!("CARGO_PKG_VERSION"),
    author = "Tyr Chen <tyr.chen@gmail.com>",
    about = "Recursively upload a file or directory to S3 using a pool of concurrent workers",
    long_about = "Walks the given path and uploads every file to an S3 bucket, keeping the directory \
                  structure in the object keys. Content-Type and Content-Encoding are inferred from \
                  file extensions. Many small files upload much faster with more workers.",
    after_help = "Examples:\n  \
                  s3upload ./site -b my-bucket                  # Upload to the bucket root\n  \
                  s3upload ./site -b my-bucket -d www           # Upload under www/\n  \
                  s3upload ./photo.jpg -b my-bucket -d images   # Upload a single file\n  \
                  s3upload ./data -b my-bucket -w 64 --fail-fast\n\n\
                  Configuration (.env):\n  \
                  AWS_REGION=us-west-2\n  \
                  AWS_PROFILE=default\n  \
                  S3_BUCKET=my-bucket\n  \
                  S3_TARGET_PATH=uploads\n\n\
                  For more information: https://github.com/tyrchen/swiss-knife"
)]
struct Cli {
    /// File or directory to upload
    path: PathBuf,

    /// Target bucket (overrides S3_BUCKET)
    #[arg(long, short = 'b')]
    bucket: Option<String>,

    /// Key prefix inside the bucket (overrides S3_TARGET_PATH)
    #[arg(long, short = 'd')]
    destination: Option<String>,

    /// Number of concurrent upload workers
    #[arg(long, short = 'w', default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Maximum number of paths waiting in the upload queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Stop the whole job at the first failed upload
    #[arg(long)]
    fail_fast: bool,

    /// Check the bucket and log what would be uploaded without uploading
    #[arg(long)]
    dry_run: bool,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    region: Option<String>,

    /// AWS profile (overrides AWS_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    bucket: &'a str,
    uploaded: usize,
    elapsed_secs: f64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("S3 Upload Tool v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let bucket = cli
        .bucket
        .clone()
        .or_else(|| config.bucket.clone())
        .context("No bucket given. Pass --bucket or set S3_BUCKET in .env")?;
    Config::validate_bucket_name(&bucket)?;

    let region = cli.region.clone().or_else(|| config.region.clone());
    if let Some(region) = &region {
        Config::validate_region(region)?;
    }

    let mut aws_config = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        aws_config = aws_config.region(aws_config::Region::new(region));
    }
    if let Some(profile) = cli.profile.as_ref().or(config.profile.as_ref()) {
        aws_config = aws_config.profile_name(profile);
    }
    let factory = AwsClientFactory::new(aws_config.load().await);

    let mut job = UploadJob::new(&cli.path, &bucket)
        .workers(cli.workers)
        .queue_capacity(cli.queue_capacity)
        .policy(if cli.fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Isolate
        });
    if let Some(destination) = cli.destination.clone().or(config.target_path.clone()) {
        job = job.destination(destination);
    }

    let result = if cli.dry_run {
        println!(
            "{}",
            style("🔍 DRY RUN MODE - No files will be uploaded")
                .yellow()
                .bold()
        );
        upload(&DryRunFactory::new(factory), job).await
    } else {
        upload(&factory, job).await
    };

    match result {
        Ok(summary) => {
            print_summary(&bucket, &summary, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(bucket: &str, summary: &UploadSummary, json: bool) -> Result<()> {
    if json {
        let output = JsonSummary {
            bucket,
            uploaded: summary.uploaded,
            elapsed_secs: summary.elapsed.as_secs_f64(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\n{}", style("═".repeat(70)).dim());
    println!(
        "{}",
        style(format!(
            "Summary: {} file(s) uploaded to s3://{}",
            summary.uploaded, bucket
        ))
        .bold()
    );
    println!(
        "{}",
        style(format!("Time: {:.2}s", summary.elapsed.as_secs_f64())).dim()
    );
    Ok(())
}

fn report_error(err: &UploadError) {
    eprintln!("{} {}", style("✗").red(), style(err.user_message()).red());
}
