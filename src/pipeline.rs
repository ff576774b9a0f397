use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::aggregate::aggregate;
use crate::columns::{resolve, split_row, ColumnNames};
use crate::dispatch::{dispatch, DispatchOptions};
use crate::error::{SinkError, SkipReason};
use crate::lookup::LookupClient;
use crate::matcher::MatchContext;
use crate::model::{RunStats, Source};
use crate::sink::SinkWriter;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub columns: ColumnNames,
    pub separator: u8,
    pub max_results: usize,
    pub max_rows: Option<usize>,
    pub timeout: Option<Duration>,
    pub dispatch: DispatchOptions,
}

#[derive(Debug)]
pub enum SourceState {
    Written { path: PathBuf, stats: RunStats },
    /// Resolved and processed, but nothing matched so no file was written.
    Empty { stats: RunStats },
    Skipped(SkipReason),
    Failed { stats: RunStats, error: SinkError },
}

#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    pub state: SourceState,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.sources.iter().filter(|s| matches!(s.state, SourceState::Failed { .. })).count()
    }

    pub fn skipped(&self) -> usize {
        self.sources.iter().filter(|s| matches!(s.state, SourceState::Skipped(_))).count()
    }

    pub fn written(&self) -> Vec<&PathBuf> {
        self.sources
            .iter()
            .filter_map(|s| match &s.state {
                SourceState::Written { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub async fn process_source<C: LookupClient + ?Sized>(client: &C, source: &Source, settings: &PipelineSettings, sink: &SinkWriter) -> SourceState {
    if let Some(reason) = &source.unreadable {
        warn!("Skipping source '{}': unreadable ({})", source.name, reason);
        return SourceState::Skipped(SkipReason::Unreadable(reason.clone()));
    }
    let header = split_row(source.header().unwrap_or_default(), settings.separator);
    let index = match resolve(&source.name, &header, &settings.columns) {
        Ok(index) => index,
        Err(e) => {
            warn!("Skipping source '{}': {}", source.name, e);
            return SourceState::Skipped(e.into());
        }
    };
    let mut rows = source.data_rows();
    if let Some(limit) = settings.max_rows {
        if rows.len() > limit {
            warn!("{}: limiting {} data rows to {}", source.name, rows.len(), limit);
            rows = &rows[..limit];
        }
    }
    info!("{}: {} data rows, {} in column {}, {} in column {}", source.name, rows.len(), settings.columns.postal_code, index.postal_code, settings.columns.house_number, index.house_number);

    let ctx = MatchContext { separator: settings.separator, index, max_results: settings.max_results, timeout: settings.timeout };
    let report = dispatch(client, &source.name, rows, &ctx, settings.dispatch).await;
    let (table, stats) = aggregate(&source.name, report);
    info!("{}: {}", source.name, stats);

    match sink.write(&source.name, &table) {
        Ok(Some(path)) => SourceState::Written { path, stats },
        Ok(None) => SourceState::Empty { stats },
        Err(error) => {
            error!("{}: {}", source.name, error);
            SourceState::Failed { stats, error }
        }
    }
}

pub async fn run<C: LookupClient + ?Sized>(client: &C, sources: &[Source], settings: &PipelineSettings, sink: &SinkWriter) -> RunSummary {
    let start = Instant::now();
    let mut reports = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        info!("Processing source {}/{}: '{}'", i + 1, sources.len(), source.name);
        let state = process_source(client, source, settings, sink).await;
        reports.push(SourceReport { name: source.name.clone(), state });
    }
    RunSummary { sources: reports, elapsed: start.elapsed() }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match (secs / 3600, secs / 60 % 60, secs % 60) {
        (0, 0, s) => format!("{}.{:03}s", s, elapsed.subsec_millis()),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, m, s) => format!("{}h {}m {}s", h, m, s),
    }
}

pub fn log_summary(summary: &RunSummary) {
    info!("-------------------- FINAL SUMMARY --------------------");
    info!("Total execution time: {}", format_elapsed(summary.elapsed));
    for report in &summary.sources {
        match &report.state {
            SourceState::Written { path, stats } => info!("  - {}: {} -> {}", report.name, stats, path.display()),
            SourceState::Empty { stats } => info!("  - {}: {} (no matches, no file)", report.name, stats),
            SourceState::Skipped(e) => warn!("  - {}: skipped ({})", report.name, e),
            SourceState::Failed { stats, error } => error!("  - {}: {} but output failed: {}", report.name, stats, error),
        }
    }
    info!("Sources: {} total, {} written, {} skipped, {} failed", summary.sources.len(), summary.written().len(), summary.skipped(), summary.failed());
    info!("-------------------------------------------------------");
}
