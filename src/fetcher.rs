use anyhow::{Context, Result, ensure};
use futures_util::{StreamExt as _, stream};
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::config::FetchConfig;

/// Downloads a single source list as text
///
/// # Errors
/// Errors on network error, timeout or a non-success status
#[instrument(skip(client, config))]
pub async fn fetch_source(client: &Client, config: &FetchConfig, url: &str) -> Result<String> {
    let res = client
        .get(url)
        .timeout(config.timeout)
        .send()
        .await
        .context("Requesting source list")?;

    ensure!(
        res.status().is_success(),
        "Source answered with status {}",
        res.status()
    );

    let body = res.bytes().await.context("Reading source list body")?;
    // Lists are UTF-8 in practice, whatever the server claims
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Fetches every source with at most `config.concurrency` in flight.
///
/// Failed sources are logged and skipped. Bodies come back in completion order.
pub async fn fetch_all(client: &Client, config: &FetchConfig, urls: &[String]) -> Vec<String> {
    stream::iter(urls)
        .map(|url| async move {
            info!("Fetching source {url}");
            match fetch_source(client, config, url).await {
                Ok(body) => {
                    info!("Fetched {} bytes from {url}", body.len());
                    Some(body)
                }
                Err(e) => {
                    warn!("Skipping source {url}: {e:#}");
                    None
                }
            }
        })
        .buffer_unordered(config.concurrency.max(1))
        .filter_map(|body| async move { body })
        .collect()
        .await
}
