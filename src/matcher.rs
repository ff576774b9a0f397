use std::time::Duration;

use log::{debug, warn};

use crate::columns::split_row;
use crate::lookup::{fetch, LookupClient};
use crate::model::{HeaderIndex, LookupKey, MatchRecord};

#[derive(Debug, Clone, Copy)]
pub struct MatchContext {
    pub separator: u8,
    pub index: HeaderIndex,
    pub max_results: usize,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Too few fields to cover the resolved columns; never looked up.
    Invalid,
    NotFound { lookup_failed: bool },
    Matched { key: String, records: Vec<MatchRecord> },
}

pub fn parse_house_number(field: &str) -> Option<i32> {
    let field = field.trim();
    if let Ok(n) = field.parse::<i32>() {
        return Some(n);
    }
    match field.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => Some(f as i32),
        _ => None,
    }
}

/// Build the lookup key for a split row, or `None` when the row is too short.
pub fn build_key(fields: &[String], index: &HeaderIndex) -> Option<LookupKey> {
    if fields.len() < index.required_width() {
        return None;
    }
    let addition = index
        .addition
        .and_then(|i| fields.get(i))
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    Some(LookupKey {
        postal_code: fields[index.postal_code].clone(),
        house_number: parse_house_number(&fields[index.house_number]),
        addition,
    })
}

pub async fn match_row<C: LookupClient + ?Sized>(client: &C, row: &str, ctx: &MatchContext) -> RowOutcome {
    let fields = split_row(row, ctx.separator);
    let Some(key) = build_key(&fields, &ctx.index) else {
        debug!("Too few columns ({} < {}): {:?}", fields.len(), ctx.index.required_width(), row);
        return RowOutcome::Invalid;
    };
    if !key.is_queryable() {
        debug!("Not queryable, skipping lookup: {:?}", row);
        return RowOutcome::NotFound { lookup_failed: false };
    }
    match fetch(client, &key, ctx.max_results, ctx.timeout).await {
        Ok(records) if records.is_empty() => RowOutcome::NotFound { lookup_failed: false },
        Ok(records) => RowOutcome::Matched { key: key.to_string(), records },
        Err(e) => {
            warn!("Lookup for {} failed, counting as not found: {}", key, e);
            RowOutcome::NotFound { lookup_failed: true }
        }
    }
}
