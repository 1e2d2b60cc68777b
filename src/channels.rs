use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::parser::StreamRecord;

/// Case-insensitive whitelist on channel names
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    pattern: Regex,
}

impl ChannelFilter {
    /// # Errors
    /// Errors when `pattern` is not a valid regular expression
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Compiling channel pattern `{pattern}`"))?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn matches(&self, channel_name: &str) -> bool {
        self.pattern.is_match(channel_name)
    }

    /// Keeps matching records, in their original order
    #[must_use]
    pub fn apply(&self, records: Vec<StreamRecord>) -> Vec<StreamRecord> {
        records
            .into_iter()
            .filter(|r| self.matches(&r.channel_name))
            .collect()
    }
}

/// Distinct candidate URLs of one channel, ready to be probed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    pub channel_name: String,
    /// First-appearance order, no duplicates, at most `cap` long
    pub candidate_urls: Vec<String>,
    /// Metadata of the first record seen for the channel
    pub representative_metadata: Option<String>,
}

/// Groups records by exact channel name, sorted by name.
///
/// Candidates beyond `cap` are dropped here, before any of them gets probed.
#[must_use]
pub fn group_records(records: &[StreamRecord], cap: usize) -> Vec<ChannelGroup> {
    let mut groups: BTreeMap<&str, (ChannelGroup, HashSet<&str>)> = BTreeMap::new();

    for record in records {
        let (group, seen) = groups.entry(record.channel_name.as_str()).or_insert_with(|| {
            (
                ChannelGroup {
                    channel_name: record.channel_name.clone(),
                    candidate_urls: Vec::new(),
                    representative_metadata: record.raw_metadata.clone(),
                },
                HashSet::new(),
            )
        });

        if group.candidate_urls.len() < cap && seen.insert(record.stream_url.as_str()) {
            group.candidate_urls.push(record.stream_url.clone());
        }
    }

    groups.into_values().map(|(group, _)| group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn record(name: &str, url: &str) -> StreamRecord {
        StreamRecord {
            channel_name: name.to_string(),
            stream_url: url.to_string(),
            raw_metadata: None,
        }
    }

    #[test]
    fn duplicate_urls_collapse_into_one_candidate() {
        let records = parse(
            "#EXTM3U\n#EXTINF:-1 tvg-name=\"CCTV1\",CCTV1\nhttp://a/1\n#EXTINF:-1 tvg-name=\"CCTV1\",CCTV1\nhttp://a/1\n",
        );
        let groups = group_records(&records, 100);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].channel_name, "CCTV1");
        assert_eq!(groups[0].candidate_urls, vec!["http://a/1"]);
    }

    #[test]
    fn candidates_are_capped_in_first_appearance_order() {
        let records: Vec<_> = (0..15)
            .map(|i| record("CCTV5", &format!("http://h/{}", i % 12)))
            .collect();
        let groups = group_records(&records, 10);

        let expected: Vec<String> = (0..10).map(|i| format!("http://h/{i}")).collect();
        assert_eq!(groups[0].candidate_urls, expected);
    }

    #[test]
    fn dedup_is_exact_string_equality() {
        let records = vec![
            record("CCTV1", "http://a/1"),
            record("CCTV1", "HTTP://A/1"),
            record("CCTV1", "http://a/1/"),
        ];
        let groups = group_records(&records, 100);
        assert_eq!(groups[0].candidate_urls.len(), 3);
    }

    #[test]
    fn first_metadata_represents_the_channel() {
        let mut first = record("CCTV1", "http://a/1");
        first.raw_metadata = Some("#EXTINF:-1 tvg-name=\"CCTV1\",first".to_string());
        let mut second = record("CCTV1", "http://a/2");
        second.raw_metadata = Some("#EXTINF:-1 tvg-name=\"CCTV1\",second".to_string());

        let groups = group_records(&[first.clone(), second], 100);
        assert_eq!(groups[0].representative_metadata, first.raw_metadata);
    }

    #[test]
    fn groups_come_out_sorted_by_name() {
        let records = vec![
            record("湖南卫视", "http://x/1"),
            record("CCTV5", "http://y/1"),
            record("CCTV1", "http://z/1"),
        ];
        let names: Vec<_> = group_records(&records, 100)
            .into_iter()
            .map(|g| g.channel_name)
            .collect();
        assert_eq!(names, vec!["CCTV1", "CCTV5", "湖南卫视"]);
    }

    #[test]
    fn filter_drops_non_matching_channels_and_keeps_order() {
        let filter = ChannelFilter::new("CCTV|卫视").unwrap();
        let records = vec![
            record("湖南卫视", "http://x/1"),
            record("地方台", "http://local/1"),
            record("cctv5", "http://y/1"),
            record("CCTV1", "http://z/1"),
        ];

        let kept: Vec<_> = filter
            .apply(records)
            .into_iter()
            .map(|r| r.channel_name)
            .collect();
        assert_eq!(kept, vec!["湖南卫视", "cctv5", "CCTV1"]);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(ChannelFilter::new("CCTV(").is_err());
    }
}
