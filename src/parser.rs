use std::sync::LazyLock;

use regex::Regex;

/// Channel name given to playlist URLs that show up before any `#EXTINF` line
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

const PLAYLIST_HEADER: &str = "#EXTM3U";
const METADATA_PREFIX: &str = "#EXTINF";

static TVG_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-name="([^"]*)""#).unwrap());

static URL_SCHEME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://\S").unwrap());

/// A single channel-to-stream mapping found in a source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub channel_name: String,
    pub stream_url: String,
    /// The `#EXTINF` line the URL was listed under, if any
    pub raw_metadata: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `#EXTM3U` extended playlist
    Playlist,
    /// `name,url` lines
    Delimited,
}

impl SourceFormat {
    /// Picks the format from the first line of a blob
    #[must_use]
    pub fn detect(content: &str) -> Self {
        let first_line = content
            .trim_start_matches('\u{feff}')
            .trim_start()
            .lines()
            .next()
            .unwrap_or_default();

        if first_line.starts_with(PLAYLIST_HEADER) {
            Self::Playlist
        } else {
            Self::Delimited
        }
    }
}

/// Parses a source blob in whichever format its first line announces.
///
/// Malformed lines are skipped, duplicated URLs are kept.
#[must_use]
pub fn parse(content: &str) -> Vec<StreamRecord> {
    match SourceFormat::detect(content) {
        SourceFormat::Playlist => parse_playlist(content),
        SourceFormat::Delimited => parse_delimited(content),
    }
}

#[must_use]
pub fn parse_playlist(content: &str) -> Vec<StreamRecord> {
    let mut records = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in content.lines().map(str::trim) {
        if line.starts_with(METADATA_PREFIX) {
            current = Some((channel_name_of(line), line.to_string()));
        } else if is_url(line) {
            let (channel_name, raw_metadata) = match &current {
                Some((name, meta)) => (name.clone(), Some(meta.clone())),
                None => (UNKNOWN_CHANNEL.to_string(), None),
            };
            records.push(StreamRecord {
                channel_name,
                stream_url: line.to_string(),
                raw_metadata,
            });
        }
    }

    records
}

#[must_use]
pub fn parse_delimited(content: &str) -> Vec<StreamRecord> {
    content
        .lines()
        .filter_map(|line| {
            let (name, url) = line.split_once(',')?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || !is_url(url) {
                return None;
            }

            Some(StreamRecord {
                channel_name: name.to_string(),
                stream_url: url.to_string(),
                raw_metadata: None,
            })
        })
        .collect()
}

/// `tvg-name` wins, then the display title after the last comma
fn channel_name_of(metadata: &str) -> String {
    let name = TVG_NAME_REGEX
        .captures(metadata)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|n| !n.is_empty())
        .or_else(|| {
            metadata
                .rsplit_once(',')
                .map(|(_, title)| title.trim())
                .filter(|t| !t.is_empty())
        });

    name.unwrap_or(UNKNOWN_CHANNEL).to_string()
}

fn is_url(line: &str) -> bool {
    URL_SCHEME_REGEX.is_match(line)
}
