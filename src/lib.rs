//! Batch matching of postal code + house number rows against the BAG address registry.
//!
//! A run reads one input file into [`model::Source`]s, resolves the key columns of each,
//! dispatches lookups with a bounded number in flight, and writes the enriched rows of every
//! Source to its own file.

pub mod aggregate;
pub mod cli;
pub mod columns;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod lookup;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod sink;

pub use error::{ColumnResolutionError, ConfigError, InputError, LookupError, SinkError, SkipReason};
pub use lookup::LookupClient;
pub use model::{HeaderIndex, LookupKey, MatchRecord, OutputTable, RunStats, Source};
