use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::lookup::LookupClient;
use crate::matcher::{match_row, MatchContext, RowOutcome};
use crate::model::RunStats;

pub const DEFAULT_CONCURRENCY: usize = 10;
const PROGRESS_LOG_INTERVAL: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY, show_progress: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<RowOutcome>,
    pub stats: RunStats,
}

fn progress_bar(len: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    match ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta} @ {per_sec}) {msg}") {
        Ok(style) => bar.set_style(style.progress_chars("=> ")),
        Err(e) => warn!("Falling back to default progress style: {}", e),
    }
    bar
}

fn record(stats: &mut RunStats, outcome: &RowOutcome) {
    stats.processed += 1;
    match outcome {
        RowOutcome::Invalid => stats.invalid += 1,
        RowOutcome::NotFound { lookup_failed } => {
            stats.not_found += 1;
            if *lookup_failed {
                stats.lookup_failures += 1;
            }
        }
        RowOutcome::Matched { .. } => stats.matched += 1,
    }
}

// Each outcome lands in the slot of its row index, whatever the completion order.
pub async fn dispatch<C: LookupClient + ?Sized>(client: &C, source_name: &str, rows: &[String], ctx: &MatchContext, options: DispatchOptions) -> DispatchReport {
    let total = rows.len();
    let mut stats = RunStats { total_rows: total, ..RunStats::default() };
    let mut slots: Vec<Option<RowOutcome>> = vec![None; total];
    let bar = progress_bar(total, options.show_progress);
    bar.set_message(source_name.to_string());

    let mut completed = stream::iter(rows.iter().enumerate())
        .map(move |(idx, row)| async move { (idx, match_row(client, row, ctx).await) })
        .buffer_unordered(options.concurrency.max(1));

    while let Some((idx, outcome)) = completed.next().await {
        record(&mut stats, &outcome);
        slots[idx] = Some(outcome);
        bar.inc(1);
        if stats.processed % PROGRESS_LOG_INTERVAL == 0 {
            info!(
                "{}: processed {}/{} \t ({} matched, {} not found, {} invalid)",
                source_name, stats.processed, total, stats.matched, stats.not_found, stats.invalid
            );
        }
    }
    bar.finish_and_clear();

    // Every slot is filled once the stream is drained.
    let outcomes = slots.into_iter().map(|slot| slot.unwrap_or(RowOutcome::Invalid)).collect();
    DispatchReport { outcomes, stats }
}
