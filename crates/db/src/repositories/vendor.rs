use sqlx::{QueryBuilder, Row, Sqlite};

use vendorlink_core::domain::vendor::VendorRecord;
use vendorlink_core::filters::{FilterMap, FilterValue};

use super::{RepositoryError, VendorRepository};
use crate::DbPool;

/// SQLite-backed vendor lookup.
///
/// Column identifiers come only from `column_for`; filter values are always
/// bound as parameters, never concatenated into SQL text. List filters use
/// `json_each` membership against the JSON list columns, scalar filters use
/// substring `LIKE`, and multiple keys combine with AND.
pub struct SqlVendorRepository {
    pool: DbPool,
}

impl SqlVendorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn column_for(key: &str) -> Option<&'static str> {
    match key {
        "services" => Some("services"),
        "cities" => Some("cities"),
        "countries" => Some("countries"),
        "company" => Some("company"),
        "name" => Some("name"),
        _ => None,
    }
}

#[async_trait::async_trait]
impl VendorRepository for SqlVendorRepository {
    async fn search(
        &self,
        filters: &FilterMap,
        limit: u32,
    ) -> Result<Vec<VendorRecord>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT name, company, services, cities, countries, contact, email \
             FROM vendor WHERE 1 = 1",
        );

        for (key, value) in filters {
            let column = column_for(key)
                .ok_or_else(|| RepositoryError::UnsupportedField(key.clone()))?;
            match value {
                FilterValue::Scalar(text) => {
                    builder.push(" AND ");
                    builder.push(column);
                    builder.push(" LIKE ");
                    builder.push_bind(format!("%{text}%"));
                }
                FilterValue::List(items) => {
                    for item in items {
                        builder.push(" AND EXISTS (SELECT 1 FROM json_each(");
                        builder.push(column);
                        builder.push(") WHERE json_each.value = ");
                        builder.push_bind(item.clone());
                        builder.push(")");
                    }
                }
            }
        }

        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<VendorRecord, RepositoryError> {
    Ok(VendorRecord {
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        company: row.try_get::<Option<String>, _>("company")?.unwrap_or_default(),
        services: decode_list(row, "services")?,
        cities: decode_list(row, "cities")?,
        countries: decode_list(row, "countries")?,
        contact: decode_list(row, "contact")?,
        email: decode_list(row, "email")?,
    })
}

fn decode_list(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Vec<String>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    match raw {
        None => Ok(Vec::new()),
        Some(text) if text.trim().is_empty() => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|error| RepositoryError::Decode(format!("column `{column}`: {error}"))),
    }
}
