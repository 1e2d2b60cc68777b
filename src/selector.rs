use std::collections::HashMap;

use crate::{channels::ChannelGroup, prober::ProbeResult};

/// The fastest working sources kept for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSelection {
    pub channel_name: String,
    /// Ascending latency, never empty
    pub selected_urls: Vec<String>,
    pub representative_metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Ranked(RankedSelection),
    /// No candidate answered, or no source may be kept at all
    NoValidSources,
    /// There was nothing to probe in the first place
    NoCandidates,
}

/// Keeps the `max_sources` fastest valid candidates of `group`.
///
/// Results are matched to candidates by URL, so their order does not matter.
/// Equal latencies keep candidate order.
#[must_use]
pub fn select(group: &ChannelGroup, results: &[ProbeResult], max_sources: usize) -> Selection {
    if group.candidate_urls.is_empty() {
        return Selection::NoCandidates;
    }

    let by_url: HashMap<&str, &ProbeResult> = results
        .iter()
        .map(|r| (r.stream_url.as_str(), r))
        .collect();

    let mut valid: Vec<&ProbeResult> = group
        .candidate_urls
        .iter()
        .filter_map(|url| by_url.get(url.as_str()).copied())
        .filter(|r| r.valid)
        .collect();

    // Keeping zero sources would leave an empty channel behind
    if valid.is_empty() || max_sources == 0 {
        return Selection::NoValidSources;
    }

    // `sort_by_key` is stable
    valid.sort_by_key(|r| r.latency);

    Selection::Ranked(RankedSelection {
        channel_name: group.channel_name.clone(),
        selected_urls: valid
            .into_iter()
            .take(max_sources)
            .map(|r| r.stream_url.clone())
            .collect(),
        representative_metadata: group.representative_metadata.clone(),
    })
}
