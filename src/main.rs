use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use time::macros::format_description;

use bag_address_matcher::cli::{parse_log_level, Cli};
use bag_address_matcher::config::RegistryConfig;
use bag_address_matcher::input::read_sources;
use bag_address_matcher::pipeline::{log_summary, run};
use bag_address_matcher::registry::PgRegistry;

const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded_config = RegistryConfig::load(&cli.config).with_context(|| format!("Failed to load registry configuration from {}", cli.config.display()))?;
    let log_level = if loaded_config.as_ref().is_some_and(|c| c.debug_mode) {
        LevelFilter::Debug
    } else {
        parse_log_level(&cli.log_level).unwrap_or_else(|| {
            eprintln!("Invalid log level '{}', defaulting to INFO.", cli.log_level);
            LevelFilter::Info
        })
    };
    SimpleLogger::new()
        .with_level(log_level)
        .with_module_level("sqlx", LevelFilter::Warn)
        .with_timestamp_format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .init()?;
    info!("Starting BAG address matcher");
    info!("Run Timestamp: {}", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    let registry_config = loaded_config.unwrap_or_else(|| {
        warn!("Config file {} not found, using default registry settings", cli.config.display());
        RegistryConfig::default()
    });

    let settings = cli.pipeline_settings().context("Invalid command line settings")?;
    let sink = cli.sink().context("Invalid output settings")?;
    let encoding = cli.encoding()?;

    info!("Processing {}", cli.file.display());
    let sources = read_sources(&cli.file, settings.separator, encoding).with_context(|| format!("Failed to read input {}", cli.file.display()))?;
    info!("Found {} source(s); output goes to {} ({})", sources.len(), sink.out_dir().display(), encoding.name());

    let registry = PgRegistry::connect_lazy(&registry_config);
    let summary = tokio::select! {
        summary = run(&registry, &sources, &settings, &sink) => Some(summary),
        _ = tokio::signal::ctrl_c() => None,
    };
    registry.close().await;

    let Some(summary) = summary else {
        warn!("Interrupted; in-flight lookups were abandoned.");
        std::process::exit(EXIT_INTERRUPTED);
    };
    log_summary(&summary);
    if !summary.is_success() {
        error!("{} source(s) could not be written.", summary.failed());
        std::process::exit(1);
    }
    info!("Matching finished.");
    Ok(())
}
