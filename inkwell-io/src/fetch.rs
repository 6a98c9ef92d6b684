//! First-run dataset download.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use inkwell_core::config::DatasetConfig;
use inkwell_core::{DataLoadError, QuoteDataset};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch `url` into `target`, creating parent directories. The body lands in
/// a sibling `.part` file first so an interrupted download never leaves a
/// truncated dataset behind. Returns the number of bytes written.
pub async fn download_dataset(url: &str, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let http = Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    tracing::info!(%url, path = %target.display(), "Downloading quote dataset");
    let resp = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to contact {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("Dataset server returned {}", status));
    }
    let body = resp.bytes().await.context("Failed to read dataset body")?;

    let partial = target.with_extension("part");
    tokio::fs::write(&partial, &body)
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    tokio::fs::rename(&partial, target)
        .await
        .with_context(|| format!("Failed to move dataset into {}", target.display()))?;

    tracing::info!(bytes = body.len(), "Dataset downloaded");
    Ok(body.len() as u64)
}

/// Load the configured dataset, downloading it first if the file is missing
/// and a URL is configured. A failed download is only fatal if nothing can
/// be loaded afterwards.
pub async fn ensure_dataset(config: &DatasetConfig) -> Result<QuoteDataset, DataLoadError> {
    if !config.path.exists() {
        let Some(url) = config.url.as_deref() else {
            return Err(DataLoadError::Unavailable(format!(
                "{} does not exist and no download URL is configured",
                config.path.display()
            )));
        };
        if let Err(e) = download_dataset(url, &config.path).await {
            tracing::warn!(error = %format!("{e:#}"), "Dataset download failed");
            if !config.path.exists() {
                return Err(DataLoadError::Unavailable(format!("{e:#}")));
            }
        }
    }
    QuoteDataset::load(&config.path)
}
