#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, builder::RangedU64ValueParser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    channels::ChannelFilter,
    config::{DEFAULT_CHANNEL_PATTERN, DEFAULT_SOURCES, FetchConfig, ProbeConfig, RunConfig},
    pipeline::probe_progress_bar,
    util::{init_http_client, spawn_ct_watcher, warn_ulimit},
    writer::OutputFormat,
};

pub mod channels;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod prober;
pub mod selector;
pub mod util;
pub mod writer;

#[cfg(test)]
mod test_server;

/// Collects IPTV channel lists, probes every stream and keeps the fastest sources per channel
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Channel list to fetch, either an `#EXTM3U` playlist or `name,url` lines [default: built-in list]
    #[arg(short, long = "source", env = "IPTV_SOURCES", value_delimiter = ',')]
    sources: Vec<String>,

    /// Case-insensitive regex a channel name must match to be kept
    #[arg(short, long, env = "IPTV_CHANNEL_PATTERN", default_value = DEFAULT_CHANNEL_PATTERN)]
    channel_pattern: String,

    /// Seconds a stream gets to start answering
    #[arg(long, env = "IPTV_PROBE_TIMEOUT", default_value_t = 5)]
    probe_timeout: u64,

    /// Streams probed at the same time, across all channels
    #[arg(short = 'j', long, env = "IPTV_PROBE_CONCURRENCY", value_parser = at_least_one(), default_value_t = 10)]
    probe_concurrency: usize,

    /// Sources kept per channel
    #[arg(short = 'k', long, env = "IPTV_MAX_SOURCES", value_parser = at_least_one(), default_value_t = 10)]
    max_sources: usize,

    /// Distinct candidates probed per channel, the rest is never probed
    #[arg(long, env = "IPTV_CANDIDATE_CAP", value_parser = at_least_one(), default_value_t = 100)]
    candidate_cap: usize,

    /// Seconds a channel list download may take
    #[arg(long, env = "IPTV_FETCH_TIMEOUT", default_value_t = 10)]
    fetch_timeout: u64,

    /// Channel lists downloaded at the same time
    #[arg(long, env = "IPTV_FETCH_CONCURRENCY", value_parser = at_least_one(), default_value_t = 5)]
    fetch_concurrency: usize,

    /// Where the result is written
    #[arg(short, long, env = "IPTV_OUTPUT", default_value = "live.m3u")]
    output: PathBuf,

    /// Output layout [default: `delimited` for `.txt` outputs, `playlist` otherwise]
    #[arg(short, long, env = "IPTV_FORMAT", value_enum)]
    format: Option<OutputFormat>,
}

/// Counts that make no sense at zero
fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

impl Args {
    fn into_config(self) -> RunConfig {
        let sources = if self.sources.is_empty() {
            DEFAULT_SOURCES.iter().map(ToString::to_string).collect()
        } else {
            self.sources
        };
        let format = self
            .format
            .unwrap_or_else(|| OutputFormat::from_path(&self.output));

        RunConfig {
            sources,
            channel_pattern: self.channel_pattern,
            fetch: FetchConfig {
                timeout: Duration::from_secs(self.fetch_timeout),
                concurrency: self.fetch_concurrency,
            },
            probe: ProbeConfig {
                timeout: Duration::from_secs(self.probe_timeout),
                max_concurrent_probes: self.probe_concurrency,
                max_sources_per_channel: self.max_sources,
                candidate_cap: self.candidate_cap,
            },
            output: self.output,
            format,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    let filter = ChannelFilter::new(&config.channel_pattern)?;
    warn_ulimit(config.probe.max_concurrent_probes + config.fetch.concurrency);

    let client = init_http_client(config.probe.timeout.max(config.fetch.timeout))?;
    let ct = CancellationToken::new();
    spawn_ct_watcher(ct.clone());

    info!(
        "Probing with {} parallel probes, {}s timeout, keeping {} sources per channel",
        config.probe.max_concurrent_probes,
        config.probe.timeout.as_secs(),
        config.probe.max_sources_per_channel
    );

    match pipeline::run(client, &config, &filter, ct, probe_progress_bar()).await {
        Ok(summary) => {
            info!(
                "Saved {} channels ({} streams) to {}",
                summary.channels,
                summary.streams,
                summary.output.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}
