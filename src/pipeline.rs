use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, info, info_span, instrument, warn};

use crate::{
    channels::{ChannelFilter, ChannelGroup, group_records},
    config::{ProbeConfig, RunConfig},
    error::RunError,
    fetcher::fetch_all,
    parser::{StreamRecord, parse},
    prober::Prober,
    selector::{RankedSelection, Selection, select},
    writer::write_output,
};

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub channels: usize,
    pub streams: usize,
    pub output: PathBuf,
}

/// One batch run: fetch, parse, filter, probe and rank, write.
///
/// # Errors
/// See [`RunError`]; per-source and per-probe failures are only logged.
#[instrument(skip_all)]
pub async fn run(
    client: Client,
    config: &RunConfig,
    filter: &ChannelFilter,
    ct: CancellationToken,
    progress: ProgressBar,
) -> Result<RunSummary, RunError> {
    info!("Fetching {} sources", config.sources.len());
    let bodies = fetch_all(&client, &config.fetch, &config.sources).await;
    if bodies.is_empty() {
        return Err(RunError::NoContent {
            sources: config.sources.len(),
        });
    }

    info!("Parsing {} fetched sources", bodies.len());
    let records: Vec<StreamRecord> = bodies.iter().flat_map(|body| parse(body)).collect();
    let total = records.len();
    let records = filter.apply(records);
    info!("{} of {total} streams match the channel pattern", records.len());

    let groups = group_records(&records, config.probe.candidate_cap);
    let prober = Prober::new(client, &config.probe, ct.clone()).with_progress(progress.clone());
    let selections = probe_and_rank(&prober, &groups, &config.probe, &progress).await;

    if ct.is_cancelled() {
        return Err(RunError::Interrupted);
    }
    if selections.is_empty() {
        return Err(RunError::NoValidChannels);
    }

    write_output(&config.output, &selections, config.format).await?;

    Ok(RunSummary {
        channels: selections.len(),
        streams: selections.iter().map(|s| s.selected_urls.len()).sum(),
        output: std::path::absolute(&config.output).unwrap_or_else(|_| config.output.clone()),
    })
}

/// Probes each channel's candidates as one batch and ranks the results.
///
/// Channels left without a valid source are dropped.
pub async fn probe_and_rank(
    prober: &Prober,
    groups: &[ChannelGroup],
    config: &ProbeConfig,
    progress: &ProgressBar,
) -> Vec<RankedSelection> {
    progress.set_length(groups.iter().map(|g| g.candidate_urls.len() as u64).sum());

    let mut selections = Vec::with_capacity(groups.len());
    for group in groups {
        progress.set_message(group.channel_name.clone());
        info!(
            "Probing channel {} ({} candidates)",
            group.channel_name,
            group.candidate_urls.len()
        );

        let results = prober
            .probe_all(&group.candidate_urls)
            .instrument(info_span!("channel", name = %group.channel_name))
            .await;
        match select(group, &results, config.max_sources_per_channel) {
            Selection::Ranked(ranked) => {
                info!(
                    "Kept {} sources for {}",
                    ranked.selected_urls.len(),
                    ranked.channel_name
                );
                selections.push(ranked);
            }
            Selection::NoValidSources => {
                warn!("No valid source found for {}", group.channel_name);
            }
            Selection::NoCandidates => {
                warn!("No candidates to probe for {}", group.channel_name);
            }
        }
    }

    progress.finish_and_clear();
    selections
}

/// Progress bar for the probing stage
#[must_use]
pub fn probe_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} probes ({eta}) {msg}",
    ) {
        pb.set_style(style);
    }
    pb
}
