use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use encoding_rs::Encoding;
use log::LevelFilter;

use crate::columns::ColumnNames;
use crate::dispatch::{DispatchOptions, DEFAULT_CONCURRENCY};
use crate::error::ConfigError;
use crate::pipeline::PipelineSettings;
use crate::sink::SinkWriter;

#[derive(Parser, Debug, Clone)]
#[command(name = "bag-address-matcher")]
#[command(about = "Looks up postal code + house number rows in the BAG address registry and writes the matched addresses per sheet.")]
#[command(after_help = "Example:\n    bag-address-matcher --file=input.xlsx --separator=\";\" --pc6=Postcode --nr=Huisnummer")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, default_value = "input.csv", help = "Input file to process (delimited text or spreadsheet)")]
    pub file: PathBuf,
    #[arg(short, long, default_value = "pc6", help = "Header of the column that contains the postal code")]
    pub pc6: String,
    #[arg(short, long, default_value = "huisnummer", help = "Header of the column that contains the house number")]
    pub nr: String,
    #[arg(short, long, help = "Header of the column that contains the house number addition")]
    pub toevoeging: Option<String>,
    #[arg(short, long, default_value = "99", help = "Maximum number of addresses to return per row (e.g. 1a, 1b, ... may all exist)")]
    pub max_addresses: usize,
    #[arg(short, long, default_value = ",", help = "Separator character used in the input file")]
    pub separator: String,
    #[arg(short, long, default_value = "outputdata", help = "Output directory")]
    pub out_dir: PathBuf,
    #[arg(short = 'e', long, default_value = "latin1", help = "Charset used in input and output files")]
    pub charset: String,
    #[arg(long, default_value = "csv", help = "Extension of the output files")]
    pub extension: String,
    #[arg(long, default_value = "config.json", help = "Registry connection settings (JSON or YAML)")]
    pub config: PathBuf,
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, help = "Maximum number of lookups in flight")]
    pub concurrency: usize,
    #[arg(long, help = "Give up on a single lookup after this many seconds and count it as not found")]
    pub lookup_timeout_secs: Option<u64>,
    #[arg(long, help = "Only process the first N data rows of every sheet")]
    pub max_rows: Option<usize>,
    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    pub log_level: String,
    #[arg(long, help = "Disable the progress bar")]
    pub no_progress: bool,
}

pub fn parse_log_level(level: &str) -> Option<LevelFilter> {
    match level.to_uppercase().as_str() {
        "DEBUG" => Some(LevelFilter::Debug),
        "INFO" => Some(LevelFilter::Info),
        "WARN" | "WARNING" => Some(LevelFilter::Warn),
        "ERROR" => Some(LevelFilter::Error),
        _ => None,
    }
}

impl Cli {
    pub fn separator_byte(&self) -> Result<u8, ConfigError> {
        match self.separator.as_bytes() {
            [b] if *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(*b),
            _ => Err(ConfigError::Invalid(format!("separator must be a single ASCII character, got {:?}", self.separator))),
        }
    }

    pub fn encoding(&self) -> Result<&'static Encoding, ConfigError> {
        Encoding::for_label(self.charset.trim().as_bytes()).ok_or_else(|| ConfigError::Invalid(format!("unknown charset '{}'", self.charset)))
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        if self.max_addresses == 0 {
            return Err(ConfigError::Invalid("max-addresses must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        Ok(PipelineSettings {
            columns: ColumnNames { postal_code: self.pc6.clone(), house_number: self.nr.clone(), addition: self.toevoeging.clone() },
            separator: self.separator_byte()?,
            max_results: self.max_addresses,
            max_rows: self.max_rows,
            timeout: self.lookup_timeout_secs.map(Duration::from_secs),
            dispatch: DispatchOptions { concurrency: self.concurrency, show_progress: !self.no_progress },
        })
    }

    pub fn sink(&self) -> Result<SinkWriter, ConfigError> {
        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty".to_string()));
        }
        Ok(SinkWriter::new(&self.out_dir, extension, self.encoding()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let cli = Cli::parse_from(["bag-address-matcher"]);
        assert_eq!(cli.file, PathBuf::from("input.csv"));
        assert_eq!(cli.max_addresses, 99);
        assert_eq!(cli.out_dir, PathBuf::from("outputdata"));
        let settings = cli.pipeline_settings().unwrap();
        assert_eq!(settings.separator, b',');
        assert_eq!(settings.dispatch.concurrency, 10);
        assert_eq!(settings.timeout, None);
        assert_eq!(cli.encoding().unwrap(), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn short_flags() {
        let cli = Cli::parse_from(["bag-address-matcher", "-f", "in.xlsx", "-s", ";", "-p", "Postcode", "-n", "Huisnummer", "-m", "1", "-e", "utf-8"]);
        let settings = cli.pipeline_settings().unwrap();
        assert_eq!(settings.separator, b';');
        assert_eq!(settings.columns.postal_code, "Postcode");
        assert_eq!(settings.max_results, 1);
        assert_eq!(cli.encoding().unwrap(), encoding_rs::UTF_8);
    }

    #[test]
    fn rejects_bad_values() {
        let multi = Cli::parse_from(["bag-address-matcher", "-s", ";;"]);
        assert!(multi.pipeline_settings().is_err());
        let charset = Cli::parse_from(["bag-address-matcher", "-e", "klingon"]);
        assert!(charset.sink().is_err());
        let zero = Cli::parse_from(["bag-address-matcher", "--concurrency", "0"]);
        assert!(zero.pipeline_settings().is_err());
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse_log_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level("verbose"), None);
    }
}
