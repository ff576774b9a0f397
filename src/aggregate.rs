use log::warn;

use crate::dispatch::DispatchReport;
use crate::matcher::RowOutcome;
use crate::model::{MatchRecord, OutputTable, RunStats, KEY_COLUMN, OUTPUT_SEPARATOR};

// Header is fixed by the first matched record; later records are emitted at header width.
#[derive(Debug, Default)]
pub struct Aggregator {
    source_name: String,
    attributes: Option<Vec<String>>,
    lines: Vec<String>,
    shape_mismatches: usize,
}

impl Aggregator {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self { source_name: source_name.into(), ..Self::default() }
    }

    fn render(&mut self, key: &str, record: &MatchRecord) -> String {
        let attributes = self
            .attributes
            .get_or_insert_with(|| record.names().map(str::to_string).collect());
        if !record.names().eq(attributes.iter().map(String::as_str)) {
            self.shape_mismatches += 1;
            warn!(
                "{}: record for {} has attributes [{}] but header is [{}]; emitting positionally",
                self.source_name,
                key,
                record.names().collect::<Vec<_>>().join(","),
                attributes.join(",")
            );
        }
        let width = attributes.len();
        let mut fields: Vec<&str> = Vec::with_capacity(width + 1);
        fields.push(key);
        fields.extend(record.values().chain(std::iter::repeat("")).take(width));
        fields.join(OUTPUT_SEPARATOR)
    }

    pub fn push(&mut self, outcome: &RowOutcome) {
        if let RowOutcome::Matched { key, records } = outcome {
            for record in records {
                let line = self.render(key, record);
                self.lines.push(line);
            }
        }
    }

    pub fn header(&self) -> Option<String> {
        self.attributes.as_ref().map(|attributes| {
            std::iter::once(KEY_COLUMN)
                .chain(attributes.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(OUTPUT_SEPARATOR)
        })
    }

    pub fn finish(self, mut stats: RunStats) -> (OutputTable, RunStats) {
        let mut lines = Vec::with_capacity(self.lines.len() + 1);
        if let Some(header) = self.header() {
            lines.push(header);
        }
        lines.extend(self.lines);
        stats.shape_mismatches += self.shape_mismatches;
        stats.output_rows = lines.len().saturating_sub(1);
        (OutputTable { lines }, stats)
    }
}

pub fn aggregate(source_name: &str, report: DispatchReport) -> (OutputTable, RunStats) {
    let mut aggregator = Aggregator::new(source_name);
    for outcome in &report.outcomes {
        aggregator.push(outcome);
    }
    aggregator.finish(report.stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(key: &str, records: Vec<MatchRecord>) -> RowOutcome {
        RowOutcome::Matched { key: key.to_string(), records }
    }

    fn street(name: &str, nr: &str) -> MatchRecord {
        MatchRecord::new().with("openbareruimtenaam", name).with("huisnummer", nr)
    }

    #[test]
    fn header_comes_from_first_match() {
        let mut agg = Aggregator::new("s");
        agg.push(&RowOutcome::Invalid);
        agg.push(&matched("1234AB-1", vec![street("Dorpsstraat", "1")]));
        agg.push(&RowOutcome::NotFound { lookup_failed: false });
        agg.push(&matched("1234AB-2", vec![street("Dorpsstraat", "2"), street("Dorpsstraat", "2")]));
        let (table, stats) = agg.finish(RunStats::default());
        assert_eq!(table.header(), Some("invoer;openbareruimtenaam;huisnummer"));
        assert_eq!(
            table.data_lines(),
            &["1234AB-1;Dorpsstraat;1".to_string(), "1234AB-2;Dorpsstraat;2".to_string(), "1234AB-2;Dorpsstraat;2".to_string()]
        );
        assert_eq!(stats.output_rows, 3);
        assert_eq!(stats.shape_mismatches, 0);
    }

    #[test]
    fn differently_shaped_record_keeps_header_width() {
        let mut agg = Aggregator::new("s");
        agg.push(&matched("1234AB-1", vec![street("Kerkweg", "1")]));
        let odd = MatchRecord::new().with("postcode", "1234AB").with("woonplaatsnaam", "Ede").with("pandid", "0228");
        agg.push(&matched("1234AB-3", vec![odd, MatchRecord::new().with("x", "only")]));
        let (table, stats) = agg.finish(RunStats::default());
        let header_width = table.header().unwrap().split(';').count();
        for line in table.data_lines() {
            assert_eq!(line.split(';').count(), header_width, "line {}", line);
        }
        assert_eq!(table.data_lines()[1], "1234AB-3;1234AB;Ede");
        assert_eq!(table.data_lines()[2], "1234AB-3;only;");
        assert_eq!(stats.shape_mismatches, 2);
    }

    #[test]
    fn nothing_matched_gives_empty_table() {
        let mut agg = Aggregator::new("s");
        agg.push(&RowOutcome::NotFound { lookup_failed: true });
        let (table, stats) = agg.finish(RunStats::default());
        assert!(table.is_empty());
        assert_eq!(stats.output_rows, 0);
    }
}
