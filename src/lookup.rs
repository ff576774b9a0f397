use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::LookupError;
use crate::model::{LookupKey, MatchRecord};

pub const UNIT_ID_ATTRIBUTE: &str = "vboid";
pub const DATE_ATTRIBUTE: &str = "documentdatum";

#[async_trait]
pub trait LookupClient: Send + Sync {
    async fn lookup(&self, key: &LookupKey, max_results: usize) -> Result<Vec<MatchRecord>, LookupError>;
}

fn compare_dates(a: Option<&str>, b: Option<&str>) -> Ordering {
    let parse = |s: &str| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok();
    match (a, b) {
        (Some(a), Some(b)) => match (parse(a), parse(b)) {
            (Some(da), Some(db)) => da.cmp(&db),
            _ => a.cmp(b),
        },
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

// Newest record per unit, newest first. Records without a unit id are kept as they are.
pub fn rank_candidates(records: Vec<MatchRecord>, max_results: usize) -> Vec<MatchRecord> {
    let mut best: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<MatchRecord> = Vec::with_capacity(records.len());
    for record in records {
        let Some(unit) = record.get(UNIT_ID_ATTRIBUTE).filter(|u| !u.is_empty()).map(str::to_string) else {
            kept.push(record);
            continue;
        };
        match best.get(&unit) {
            Some(&slot) => {
                if compare_dates(record.get(DATE_ATTRIBUTE), kept[slot].get(DATE_ATTRIBUTE)) == Ordering::Greater {
                    kept[slot] = record;
                }
            }
            None => {
                best.insert(unit, kept.len());
                kept.push(record);
            }
        }
    }
    kept.sort_by(|a, b| compare_dates(b.get(DATE_ATTRIBUTE), a.get(DATE_ATTRIBUTE)));
    kept.truncate(max_results);
    kept
}

pub async fn fetch<C: LookupClient + ?Sized>(
    client: &C,
    key: &LookupKey,
    max_results: usize,
    timeout: Option<Duration>,
) -> Result<Vec<MatchRecord>, LookupError> {
    let records = match timeout {
        Some(limit) => tokio::time::timeout(limit, client.lookup(key, max_results))
            .await
            .map_err(|_| LookupError::Timeout(limit))??,
        None => client.lookup(key, max_results).await?,
    };
    Ok(rank_candidates(records, max_results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, date: &str) -> MatchRecord {
        MatchRecord::new().with("postcode", "1234AB").with(UNIT_ID_ATTRIBUTE, id).with(DATE_ATTRIBUTE, date)
    }

    #[test]
    fn keeps_newest_variant_per_unit() {
        let ranked = rank_candidates(vec![unit("A", "2010-01-01"), unit("A", "2020-05-01"), unit("B", "2015-01-01")], 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].get(DATE_ATTRIBUTE), Some("2020-05-01"));
        assert_eq!(ranked[0].get(UNIT_ID_ATTRIBUTE), Some("A"));
        assert_eq!(ranked[1].get(UNIT_ID_ATTRIBUTE), Some("B"));
    }

    #[test]
    fn truncates_to_newest_max_results() {
        let records = vec![unit("A", "2001-01-01"), unit("B", "2019-01-01"), unit("C", "2010-01-01"), unit("D", "2021-03-04")];
        let ranked = rank_candidates(records, 2);
        let ids: Vec<_> = ranked.iter().filter_map(|r| r.get(UNIT_ID_ATTRIBUTE)).collect();
        assert_eq!(ids, vec!["D", "B"]);
    }

    #[test]
    fn records_without_unit_id_are_kept() {
        let bare = MatchRecord::new().with("postcode", "1234AB");
        let ranked = rank_candidates(vec![bare.clone(), bare], 5);
        assert_eq!(ranked.len(), 2);
    }

    struct Slow;

    #[async_trait]
    impl LookupClient for Slow {
        async fn lookup(&self, _key: &LookupKey, _max: usize) -> Result<Vec<MatchRecord>, LookupError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![MatchRecord::new().with("a", "b")])
        }
    }

    struct Unranked;

    #[async_trait]
    impl LookupClient for Unranked {
        async fn lookup(&self, _key: &LookupKey, _max: usize) -> Result<Vec<MatchRecord>, LookupError> {
            Ok(vec![unit("A", "2001-01-01"), unit("B", "2019-01-01"), unit("A", "2020-06-01"), unit("C", "2010-01-01")])
        }
    }

    #[tokio::test]
    async fn fetch_ranks_client_output() {
        let key = LookupKey { postal_code: "1234AB".into(), house_number: Some(1), addition: None };
        let ranked = fetch(&Unranked, &key, 2, None).await.unwrap();
        let picked: Vec<_> = ranked.iter().map(|r| (r.get(UNIT_ID_ATTRIBUTE).unwrap(), r.get(DATE_ATTRIBUTE).unwrap())).collect();
        assert_eq!(picked, vec![("A", "2020-06-01"), ("B", "2019-01-01")]);
    }

    #[tokio::test]
    async fn fetch_times_out() {
        let key = LookupKey { postal_code: "1234AB".into(), house_number: Some(1), addition: None };
        let result = fetch(&Slow, &key, 3, Some(Duration::from_millis(20))).await;
        assert!(matches!(result, Err(LookupError::Timeout(_))));
    }
}
