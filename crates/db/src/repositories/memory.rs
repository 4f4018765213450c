use async_trait::async_trait;

use vendorlink_core::domain::vendor::VendorRecord;
use vendorlink_core::filters::{FilterMap, FilterValue};

use super::{RepositoryError, VendorRepository};

/// In-memory stand-in for the SQL repository, used by agent and server
/// tests. Mirrors the SQL matching semantics: scalars match as
/// case-insensitive substrings, list filters as element membership, keys
/// combine with AND. A configured failure makes every search return it.
#[derive(Default)]
pub struct InMemoryVendorRepository {
    records: Vec<VendorRecord>,
    failure: Option<String>,
}

impl InMemoryVendorRepository {
    pub fn with_records(records: Vec<VendorRecord>) -> Self {
        Self { records, failure: None }
    }

    pub fn failing(detail: impl Into<String>) -> Self {
        Self { records: Vec::new(), failure: Some(detail.into()) }
    }
}

fn scalar_fields<'a>(record: &'a VendorRecord, key: &str) -> Option<&'a str> {
    match key {
        "name" => Some(record.name.as_str()),
        "company" => Some(record.company.as_str()),
        _ => None,
    }
}

fn list_fields<'a>(record: &'a VendorRecord, key: &str) -> Option<&'a [String]> {
    match key {
        "services" => Some(&record.services),
        "cities" => Some(&record.cities),
        "countries" => Some(&record.countries),
        _ => None,
    }
}

fn matches(record: &VendorRecord, key: &str, value: &FilterValue) -> bool {
    match value {
        FilterValue::Scalar(needle) => {
            let needle = needle.to_lowercase();
            if let Some(field) = scalar_fields(record, key) {
                field.to_lowercase().contains(&needle)
            } else if let Some(items) = list_fields(record, key) {
                items.iter().any(|item| item.to_lowercase().contains(&needle))
            } else {
                false
            }
        }
        FilterValue::List(wanted) => {
            if let Some(items) = list_fields(record, key) {
                wanted.iter().all(|item| items.contains(item))
            } else if let Some(field) = scalar_fields(record, key) {
                wanted.iter().all(|item| field == item)
            } else {
                false
            }
        }
    }
}

#[async_trait]
impl VendorRepository for InMemoryVendorRepository {
    async fn search(
        &self,
        filters: &FilterMap,
        limit: u32,
    ) -> Result<Vec<VendorRecord>, RepositoryError> {
        if let Some(detail) = &self.failure {
            return Err(RepositoryError::Decode(detail.clone()));
        }

        Ok(self
            .records
            .iter()
            .filter(|record| filters.iter().all(|(key, value)| matches(record, key, value)))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use vendorlink_core::domain::vendor::VendorRecord;
    use vendorlink_core::filters::{FilterMap, FilterValue};

    use super::{InMemoryVendorRepository, VendorRepository};

    fn record(name: &str, cities: &[&str]) -> VendorRecord {
        VendorRecord {
            name: name.to_string(),
            company: format!("{name} Ltd"),
            cities: cities.iter().map(|city| city.to_string()).collect(),
            ..VendorRecord::default()
        }
    }

    fn filters(pairs: &[(&str, FilterValue)]) -> FilterMap {
        pairs.iter().map(|(key, value)| (key.to_string(), value.clone())).collect::<BTreeMap<_, _>>()
    }

    #[tokio::test]
    async fn filters_and_limit_apply() {
        let repository = InMemoryVendorRepository::with_records(vec![
            record("A", &["London"]),
            record("B", &["London"]),
            record("C", &["Genoa"]),
        ]);

        let rows = repository
            .search(&filters(&[("cities", FilterValue::List(vec!["London".into()]))]), 1)
            .await
            .expect("search");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "A");
    }

    #[tokio::test]
    async fn configured_failure_surfaces() {
        let repository = InMemoryVendorRepository::failing("connection reset");
        let error = repository.search(&FilterMap::new(), 5).await.expect_err("must fail");
        assert!(error.to_string().contains("connection reset"));
    }
}
