use std::{path::PathBuf, time::Duration};

use crate::writer::OutputFormat;

/// Public channel lists fetched when no `--source` is given
pub const DEFAULT_SOURCES: &[&str] = &[
    "http://8.138.7.223/live.txt",
    "https://7337.kstore.space/twkj/tvzb.txt",
    "https://ghfast.top/https://raw.githubusercontent.com/tianya7981/jiekou/refs/heads/main/%E9%87%8E%E7%81%AB959",
    "http://tot.totalh.net/tttt.txt",
    "https://raw.githubusercontent.com/YanG-1989/m3u/main/Gather.m3u",
    "https://raw.githubusercontent.com/YueChan/Live/refs/heads/main/APTV.m3u",
    "https://raw.githubusercontent.com/Kimentanm/aptv/master/m3u/iptv.m3u",
    "https://raw.githubusercontent.com/BurningC4/Chinese-IPTV/master/TV-IPV4.m3u",
    "https://raw.githubusercontent.com/Ftindy/IPTV-URL/main/IPV6.m3u",
];

pub const DEFAULT_CHANNEL_PATTERN: &str = "CCTV|卫视";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            concurrency: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Deadline for a single probe, from request start to the first body chunk
    pub timeout: Duration,
    /// Global cap on in-flight probes, shared by every channel
    pub max_concurrent_probes: usize,
    /// How many ranked sources are kept per channel
    pub max_sources_per_channel: usize,
    /// How many distinct candidates per channel are probed at all
    pub candidate_cap: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_concurrent_probes: 10,
            max_sources_per_channel: 10,
            candidate_cap: 100,
        }
    }
}

/// Everything a single batch run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sources: Vec<String>,
    pub channel_pattern: String,
    pub fetch: FetchConfig,
    pub probe: ProbeConfig,
    pub output: PathBuf,
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(ToString::to_string).collect(),
            channel_pattern: DEFAULT_CHANNEL_PATTERN.to_string(),
            fetch: FetchConfig::default(),
            probe: ProbeConfig::default(),
            output: PathBuf::from("live.m3u"),
            format: OutputFormat::Playlist,
        }
    }
}
