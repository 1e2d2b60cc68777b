use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rlimit::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Descriptors kept aside for the runtime, logs and the output file
const RESERVED_FILE_DESCRIPTORS: u64 = 64;

/// Warns when the open file limit cannot fit every concurrent probe socket
pub fn warn_ulimit(concurrent_connections: usize) {
    let Ok((limit, _)) = rlimit::getrlimit(Resource::NOFILE) else {
        return;
    };

    let needed = concurrent_connections as u64 + RESERVED_FILE_DESCRIPTORS;
    if limit < needed {
        warn!(
            "Your file limit ({limit}) is lower than the {needed} descriptors this run may use. Consider lowering `--probe-concurrency` or raising your file limit via `ulimit -n 10240`"
        );
    }
}

/// Shared client for fetching lists and probing streams
///
/// # Errors
/// Errors when the TLS backend cannot be initialized
pub fn init_http_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!(
            "{}/{} (+{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_REPOSITORY")
        ))
        .context("Building User-Agent header")?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .build()
        .context("Building HTTP client")
}

/// Spawn a task that watches for CTRL + C signal and cancels a [`CancellationToken`] when caught
pub fn spawn_ct_watcher(ct: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Caught CTRL+C signal! Remaining probes are skipped");
            ct.cancel();
        }
    });
}
