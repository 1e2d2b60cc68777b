use std::{path::Path, sync::LazyLock};

use clap::ValueEnum;
use regex::Regex;
use tracing::info;

use crate::{error::RunError, selector::RankedSelection};

pub const PLAYLIST_HEADER: &str = "#EXTM3U x-tvg-url=\"\"";

static BRACKETED_HOST_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://(?:[^/@\[]*@)?\[[0-9A-Fa-f:.%]+\]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `#EXTM3U` playlist, one `#EXTINF` line per URL
    Playlist,
    /// `name,url` lines split into IPv4 and IPv6 sections
    Delimited,
}

impl OutputFormat {
    /// `.txt` means delimited, anything else a playlist
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => Self::Delimited,
            _ => Self::Playlist,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    IPv4,
    IPv6,
}

impl Protocol {
    /// Bracketed literal hosts are IPv6, everything else counts as IPv4
    #[must_use]
    pub fn of(url: &str) -> Self {
        if BRACKETED_HOST_REGEX.is_match(url) {
            Self::IPv6
        } else {
            Self::IPv4
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IPv4 => "IPv4",
            Self::IPv6 => "IPv6",
        }
    }
}

#[must_use]
pub fn render(selections: &[RankedSelection], format: OutputFormat) -> String {
    match format {
        OutputFormat::Playlist => render_playlist(selections),
        OutputFormat::Delimited => render_delimited(selections),
    }
}

fn render_playlist(selections: &[RankedSelection]) -> String {
    let mut out = String::new();
    out.push_str(PLAYLIST_HEADER);
    out.push('\n');

    for selection in selections {
        let name = &selection.channel_name;
        for url in &selection.selected_urls {
            match selection.representative_metadata.as_deref() {
                Some(meta) if !meta.is_empty() => out.push_str(meta),
                _ => out.push_str(&format!(
                    "#EXTINF:-1 tvg-name=\"{name}\" group-title=\"{}\",{name}",
                    Protocol::of(url).label()
                )),
            }
            out.push('\n');
            out.push_str(url);
            out.push('\n');
        }
    }

    out
}

fn render_delimited(selections: &[RankedSelection]) -> String {
    let mut ipv4 = Vec::new();
    let mut ipv6 = Vec::new();

    for selection in selections {
        for url in &selection.selected_urls {
            let line = format!("{},{url}", selection.channel_name);
            match Protocol::of(url) {
                Protocol::IPv4 => ipv4.push(line),
                Protocol::IPv6 => ipv6.push(line),
            }
        }
    }

    format!(
        "# IPv4 Streams\n{}\n\n# IPv6 Streams\n{}\n",
        ipv4.join("\n"),
        ipv6.join("\n")
    )
}

/// Writes the rendered output to `path`, replacing any previous file
///
/// # Errors
/// Errors when `path` cannot be written. Nothing is retried.
pub async fn write_output(
    path: &Path,
    selections: &[RankedSelection],
    format: OutputFormat,
) -> Result<(), RunError> {
    info!("Saving {format:?} output to {path:?}");
    tokio::fs::write(path, render(selections, format))
        .await
        .map_err(|source| RunError::Write {
            path: path.to_path_buf(),
            source,
        })
}
