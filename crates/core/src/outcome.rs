use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::vendor::VendorRecord;

/// Tagged result of one vendor lookup. Serializes to the tool-payload wire
/// shape: `{"results": [...]}` or `{"error": {"kind": ...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    Results(Vec<VendorRecord>),
    Error(QueryError),
}

impl QueryOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Everything that can go wrong between a proposed filter mapping and rows
/// coming back from the store. None of these propagate as faults; each one
/// maps to a user-facing summary line.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryError {
    #[error("filters rejected: {}", rejected.join(", "))]
    InvalidFilters { rejected: Vec<String> },
    #[error("no usable filters supplied")]
    MissingFilters,
    #[error("forbidden keyword in `{value}`")]
    ForbiddenKeyword { value: String },
    /// Part of the wire taxonomy for decoded tool payloads. The live turn
    /// path pre-parses its input and routes malformed intents to
    /// clarification instead of constructing this.
    #[error("malformed tool input: {detail}")]
    Parsing { detail: String },
    #[error("vendor store failure: {detail}")]
    Db { detail: String },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{QueryError, QueryOutcome};
    use crate::domain::vendor::VendorRecord;

    #[test]
    fn results_serialize_to_results_key() {
        let outcome = QueryOutcome::Results(vec![VendorRecord {
            name: "Jan".into(),
            company: "Acme".into(),
            ..VendorRecord::default()
        }]);

        let value = serde_json::to_value(&outcome).expect("serialize");
        assert!(value.get("results").is_some());
        assert_eq!(value["results"][0]["name"], json!("Jan"));
    }

    #[test]
    fn errors_carry_a_kind_tag() {
        let outcome = QueryOutcome::Error(QueryError::ForbiddenKeyword {
            value: "'; DROP TABLE vendor;".into(),
        });

        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["error"]["kind"], json!("forbidden_keyword"));
        assert_eq!(value["error"]["value"], json!("'; DROP TABLE vendor;"));
    }

    #[test]
    fn empty_results_are_distinct_from_errors() {
        let outcome = QueryOutcome::Results(Vec::new());
        assert!(!outcome.is_error());
    }

    #[test]
    fn roundtrips_through_json() {
        let outcome = QueryOutcome::Error(QueryError::InvalidFilters {
            rejected: vec!["password".into()],
        });
        let value = serde_json::to_value(&outcome).expect("serialize");
        let back: QueryOutcome = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, outcome);
    }
}
