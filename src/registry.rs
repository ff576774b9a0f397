use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row};

use crate::config::RegistryConfig;
use crate::error::LookupError;
use crate::lookup::LookupClient;
use crate::model::{LookupKey, MatchRecord};

#[derive(Clone)]
pub struct PgRegistry {
    pool: PgPool,
    query: String,
}

impl fmt::Debug for PgRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgRegistry")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

// Newest building document per residential object, then newest first across objects.
pub fn address_query(schema: &str) -> String {
    format!(
        "SELECT openbareruimtenaam, huisnummer, huisletter, huisnummertoevoeging, postcode, \
                woonplaatsnaam, pandstatus, pandid, vboid, documentdatum \
         FROM ( \
            SELECT DISTINCT ON (verblijfsobject.identificatie) \
                adres.openbareruimtenaam::text AS openbareruimtenaam, \
                adres.huisnummer::text AS huisnummer, \
                adres.huisletter::text AS huisletter, \
                adres.huisnummertoevoeging::text AS huisnummertoevoeging, \
                adres.postcode::text AS postcode, \
                adres.woonplaatsnaam::text AS woonplaatsnaam, \
                pand.pandstatus::text AS pandstatus, \
                pand.identificatie::text AS pandid, \
                verblijfsobject.identificatie::text AS vboid, \
                pand.documentdatum AS sort_date, \
                pand.documentdatum::text AS documentdatum \
            FROM {schema}.verblijfsobjectpand, {schema}.verblijfsobject, {schema}.pand, {schema}.adres \
            WHERE adres.postcode = $1::text AND adres.huisnummer = $2::integer \
              AND ($3::text IS NULL OR upper(coalesce(adres.huisletter::text, '') || coalesce(adres.huisnummertoevoeging::text, '')) = upper($3)) \
              AND adres.adresseerbaarobject = verblijfsobject.identificatie \
              AND adres.adresseerbaarobject = verblijfsobjectpand.identificatie \
              AND verblijfsobjectpand.gerelateerdpand = pand.identificatie \
            ORDER BY verblijfsobject.identificatie, pand.documentdatum DESC \
         ) AS latest \
         ORDER BY sort_date DESC NULLS LAST \
         LIMIT $4::bigint"
    )
}

fn row_to_record(row: &PgRow) -> Result<MatchRecord, sqlx::Error> {
    let mut record = MatchRecord::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value: Option<String> = row.try_get(idx)?;
        record.push(column.name(), value.unwrap_or_default());
    }
    Ok(record)
}

impl PgRegistry {
    pub fn connect_lazy(config: &RegistryConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.db_url)
            .port(config.db_port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.db_name);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_lazy_with(options);
        info!("Registry pool configured: {:?}", config);
        Self::with_pool(pool, &config.schema)
    }

    pub fn with_pool(pool: PgPool, schema: &str) -> Self {
        Self { pool, query: address_query(schema) }
    }

    pub async fn close(&self) {
        if !self.pool.is_closed() {
            info!("Closing registry connection pool...");
            self.pool.close().await;
        }
    }
}

#[async_trait]
impl LookupClient for PgRegistry {
    async fn lookup(&self, key: &LookupKey, max_results: usize) -> Result<Vec<MatchRecord>, LookupError> {
        let Some(number) = key.house_number else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(max_results).unwrap_or(i64::MAX);
        let rows = sqlx::query(&self.query)
            .bind(&key.postal_code)
            .bind(number)
            .bind(key.addition.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        debug!("{}: {} registry rows", key, rows.len());
        let records = rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_uses_configured_schema() {
        let query = address_query("bag2024");
        assert!(query.contains("FROM bag2024.verblijfsobjectpand, bag2024.verblijfsobject, bag2024.pand, bag2024.adres"));
        assert!(!query.contains("bagactueel"));
    }

    #[test]
    fn query_selects_attributes_in_output_order() {
        let query = address_query("bagactueel");
        let select = query.split(" FROM").next().unwrap();
        let names: Vec<&str> = select.trim_start_matches("SELECT ").split(',').map(str::trim).collect();
        assert_eq!(
            names,
            vec!["openbareruimtenaam", "huisnummer", "huisletter", "huisnummertoevoeging", "postcode", "woonplaatsnaam", "pandstatus", "pandid", "vboid", "documentdatum"]
        );
    }

    #[test]
    fn query_is_parameterised() {
        let query = address_query("bagactueel");
        for placeholder in ["$1", "$2", "$3", "$4"] {
            assert!(query.contains(placeholder), "missing {}", placeholder);
        }
        assert!(query.contains("DISTINCT ON (verblijfsobject.identificatie)"));
        assert!(query.contains("ORDER BY sort_date DESC"));
    }
}
