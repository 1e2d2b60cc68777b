use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use indicatif::ProgressBar;
use reqwest::Client;
use thiserror::Error;
use tokio::{select, sync::Semaphore, task::JoinSet};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, instrument, warn};

use crate::config::ProbeConfig;

/// Latency recorded for every probe that did not succeed
pub const INVALID_LATENCY: Duration = Duration::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub stream_url: String,
    pub latency: Duration,
    pub valid: bool,
}

impl ProbeResult {
    fn valid(stream_url: String, latency: Duration) -> Self {
        Self {
            stream_url,
            latency,
            valid: true,
        }
    }

    fn invalid(stream_url: String) -> Self {
        Self {
            stream_url,
            latency: INVALID_LATENCY,
            valid: false,
        }
    }
}

/// Why a single probe was marked invalid
#[derive(Debug, Error)]
enum ProbeFailure {
    #[error("timed out")]
    Timeout,
    #[error("status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("cancelled")]
    Cancelled,
}

/// Liveness and latency checker for candidate stream URLs.
///
/// Cloning is cheap and every clone shares the same permit pool, so the
/// concurrency cap holds across all channels probed through it.
#[derive(Clone)]
pub struct Prober {
    client: Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
    ct: CancellationToken,
    progress: ProgressBar,
}

impl Prober {
    #[must_use]
    pub fn new(client: Client, config: &ProbeConfig, ct: CancellationToken) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_probes.max(1))),
            timeout: config.timeout,
            ct,
            progress: ProgressBar::hidden(),
        }
    }

    /// Ticks `progress` once per finished probe
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Probes every URL concurrently, bounded by the shared permit pool.
    ///
    /// Returns exactly one result per input URL, in input order.
    #[instrument(skip_all, fields(candidates = urls.len()))]
    pub async fn probe_all(&self, urls: &[String]) -> Vec<ProbeResult> {
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let prober = self.clone();
            let url = url.clone();

            tasks.spawn(
                async move {
                    let result = prober.probe_with_permit(url).await;
                    prober.progress.inc(1);
                    (index, result)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<ProbeResult>> = vec![None; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("Probe task failed: {e}"),
            }
        }

        // A task that panicked leaves its slot empty, it counts as a failed probe
        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| slot.unwrap_or_else(|| ProbeResult::invalid(url.clone())))
            .collect()
    }

    async fn probe_with_permit(&self, url: String) -> ProbeResult {
        let _permit = select! {
            biased;
            () = self.ct.cancelled() => {
                debug!(url = %url, reason = %ProbeFailure::Cancelled, "Probe skipped");
                return ProbeResult::invalid(url);
            }
            permit = self.permits.acquire() => match permit {
                Ok(p) => p,
                Err(_) => return ProbeResult::invalid(url),
            }
        };

        self.probe(url).await
    }

    /// A single probe: one streaming GET, no retries.
    ///
    /// Latency runs from the request start until the first body chunk (or the
    /// end of an empty body) arrives.
    pub async fn probe(&self, url: String) -> ProbeResult {
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.first_chunk(&url)).await;
        match outcome {
            Ok(Ok(())) => {
                let latency = start.elapsed();
                debug!(url = %url, ?latency, "Probe succeeded");
                ProbeResult::valid(url, latency)
            }
            Ok(Err(reason)) => {
                debug!(url = %url, %reason, "Probe failed");
                ProbeResult::invalid(url)
            }
            Err(_) => {
                debug!(url = %url, reason = %ProbeFailure::Timeout, "Probe failed");
                ProbeResult::invalid(url)
            }
        }
    }

    async fn first_chunk(&self, url: &str) -> Result<(), ProbeFailure> {
        let res = self.client.get(url).send().await?;

        if !res.status().is_success() {
            return Err(ProbeFailure::Status(res.status()));
        }

        // Live streams never end, so only the first chunk is awaited
        let mut body = res.bytes_stream();
        if let Some(chunk) = body.next().await {
            chunk?;
        }
        Ok(())
    }
}
