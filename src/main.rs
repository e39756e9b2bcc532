//! Forwarding job entry point - one pass per invocation, scheduling is the
//! caller's problem

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use chrono::Utc;
use deal_forwarder::forwarding::checkpoint::CheckpointStore;
use deal_forwarder::forwarding::dispatch::WebhookClient;
use deal_forwarder::forwarding::fetch::SourceFetcher;
use deal_forwarder::forwarding::pipeline;
use deal_forwarder::storage::S3Storage;
use std::env;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting deal forwarding run");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3 = aws_sdk_s3::Client::new(&aws_config);

    let checkpoints = CheckpointStore::new(
        Arc::new(S3Storage::new(s3.clone(), &config.checkpoint_bucket)),
        &config.checkpoint_key,
    );
    let source = SourceFetcher::new(
        Arc::new(S3Storage::new(s3, &config.source_bucket)),
        &config.source_key,
    );
    let sink = WebhookClient::new(&config.webhook_url)?;

    let today = Utc::now().date_naive();
    let summary = pipeline::run(&checkpoints, &source, &sink, today).await?;

    info!(
        "Run complete: {} rows parsed ({} errors), {} eligible, {} selected, {}, checkpoint: {:?}",
        summary.rows_parsed,
        summary.parse_errors,
        summary.eligible,
        summary.selected,
        summary.stats,
        summary.checkpoint,
    );

    Ok(())
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    webhook_url: String,
    source_bucket: String,
    source_key: String,
    checkpoint_bucket: String,
    checkpoint_key: String,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Config {
            webhook_url: env::var("WEBHOOK_URL").context("WEBHOOK_URL must be set")?,
            source_bucket: env::var("SOURCE_BUCKET").context("SOURCE_BUCKET must be set")?,
            source_key: env::var("SOURCE_KEY").context("SOURCE_KEY must be set")?,
            checkpoint_bucket: env::var("CHECKPOINT_BUCKET")
                .context("CHECKPOINT_BUCKET must be set")?,
            checkpoint_key: env::var("CHECKPOINT_KEY").context("CHECKPOINT_KEY must be set")?,
        })
    }
}
