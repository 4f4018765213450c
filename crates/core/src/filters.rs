//! Filter validation for the vendor lookup tool.
//!
//! The agent hands the tool an arbitrary JSON mapping produced by the LLM.
//! Nothing in that mapping is trusted: field names are checked against a
//! fixed allow-list, and every value is screened for SQL-injection-indicative
//! keywords before it can reach query construction. Keyword screening is
//! defense-in-depth; the repository layer binds all values as parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of vendor fields a caller may filter on. Column
/// identifiers used in query construction must originate here, never from
/// caller input.
pub const ALLOWED_FILTERS: [&str; 5] = ["services", "cities", "countries", "company", "name"];

/// Case-insensitive substring matches against any of these reject the value.
pub const FORBIDDEN_KEYWORDS: [&str; 12] = [
    "insert",
    "update",
    "delete",
    "drop",
    "truncate",
    "alter",
    "union",
    "exec",
    "declare",
    "sleep",
    "benchmark",
    "information_schema",
];

/// A filter value is either a scalar (substring match) or a list
/// (set-membership match against a JSON list column).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// Every text fragment that will participate in query construction.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Scalar(text) => std::slice::from_ref(text).iter(),
            Self::List(items) => items.iter(),
        }
        .map(String::as_str)
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Scalar(text.clone())),
            Value::Number(number) => Some(Self::Scalar(number.to_string())),
            Value::Array(items) => {
                let mut texts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(text) => texts.push(text.clone()),
                        Value::Number(number) => texts.push(number.to_string()),
                        _ => return None,
                    }
                }
                Some(Self::List(texts))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(text) => Value::String(text.clone()),
            Self::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Validated filters, keyed in deterministic order.
pub type FilterMap = BTreeMap<String, FilterValue>;

/// Splits an untrusted mapping into accepted filters and rejected keys.
///
/// A key is accepted iff it is allow-listed and its value is a non-empty
/// string or non-empty list; every other key present in the input is echoed
/// back in the rejected list. Pure and total: no I/O, cannot fail, and
/// running it on its own accepted output rejects nothing further.
pub fn validate_filters(raw: &serde_json::Map<String, Value>) -> (FilterMap, Vec<String>) {
    let mut accepted = FilterMap::new();
    let mut rejected = Vec::new();

    for (key, value) in raw {
        let allowed = ALLOWED_FILTERS.contains(&key.as_str());
        match FilterValue::from_json(value) {
            Some(filter_value) if allowed && !filter_value.is_empty() => {
                accepted.insert(key.clone(), filter_value);
            }
            _ => rejected.push(key.clone()),
        }
    }

    (accepted, rejected)
}

/// Returns the first value fragment containing a forbidden keyword, in any
/// case combination. `None` means the value is safe to hand to the store.
pub fn contains_forbidden(value: &FilterValue) -> Option<String> {
    for text in value.texts() {
        let lowered = text.to_lowercase();
        if FORBIDDEN_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
            return Some(text.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{contains_forbidden, validate_filters, FilterValue, ALLOWED_FILTERS};

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn allowed_non_empty_fields_pass_unchanged() {
        let input = raw(json!({
            "services": ["motor services", "hull cleaning"],
            "cities": "London",
            "company": "Acme Marine",
        }));

        let (accepted, rejected) = validate_filters(&input);

        assert!(rejected.is_empty());
        assert_eq!(accepted.len(), 3);
        assert_eq!(
            accepted["services"],
            FilterValue::List(vec!["motor services".into(), "hull cleaning".into()])
        );
        assert_eq!(accepted["cities"], FilterValue::Scalar("London".into()));
    }

    #[test]
    fn disallowed_keys_are_echoed_exactly() {
        let input = raw(json!({
            "cities": "Rotterdam",
            "password": "hunter2",
            "services ": "towing",
        }));

        let (accepted, rejected) = validate_filters(&input);

        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected, vec!["password".to_string(), "services ".to_string()]);
    }

    #[test]
    fn empty_and_null_values_are_rejected() {
        let input = raw(json!({
            "services": [],
            "cities": "",
            "countries": null,
            "name": "   ",
        }));

        let (accepted, rejected) = validate_filters(&input);

        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 4);
    }

    #[test]
    fn non_text_values_are_rejected() {
        let input = raw(json!({
            "cities": {"nested": "object"},
            "countries": [{"also": "nested"}],
            "company": true,
        }));

        let (accepted, rejected) = validate_filters(&input);

        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 3);
    }

    #[test]
    fn validation_is_idempotent_on_its_own_output() {
        let input = raw(json!({
            "services": ["towing"],
            "cities": "Hamburg",
            "bogus": "x",
        }));

        let (first, _) = validate_filters(&input);
        let as_json: Map<String, Value> =
            first.iter().map(|(key, value)| (key.clone(), value.to_json())).collect();
        let (second, rejected) = validate_filters(&as_json);

        assert!(rejected.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn forbidden_keywords_match_case_insensitively() {
        for candidate in ["DROP TABLE vendor", "DrOp", "1; sLeEp(10)", "information_SCHEMA"] {
            let value = FilterValue::Scalar(candidate.to_string());
            assert_eq!(contains_forbidden(&value), Some(candidate.to_string()), "{candidate}");
        }
    }

    #[test]
    fn forbidden_keyword_in_list_names_the_offending_element() {
        let value = FilterValue::List(vec!["towing".into(), "x UNION SELECT y".into()]);
        assert_eq!(contains_forbidden(&value), Some("x UNION SELECT y".to_string()));
    }

    #[test]
    fn plain_values_are_not_flagged() {
        for candidate in ["motor services", "London", "O'Brien & Sons"] {
            assert!(contains_forbidden(&FilterValue::Scalar(candidate.into())).is_none());
        }
    }

    #[test]
    fn screening_uses_substring_semantics() {
        // "updating" embeds "update"; the screen is deliberately strict.
        let value = FilterValue::Scalar("updating records".into());
        assert!(contains_forbidden(&value).is_some());
    }

    #[test]
    fn allow_list_is_the_documented_closed_set() {
        assert_eq!(ALLOWED_FILTERS, ["services", "cities", "countries", "company", "name"]);
    }
}
