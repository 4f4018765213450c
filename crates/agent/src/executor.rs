use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, warn};
use vendorlink_core::filters::{contains_forbidden, validate_filters};
use vendorlink_core::outcome::{QueryError, QueryOutcome};
use vendorlink_db::VendorRepository;

/// Rows returned per lookup, matching the summary rendering bound.
pub const RESULT_LIMIT: u32 = 5;

/// Turns an untrusted filter mapping into a tagged lookup outcome.
///
/// Order of defenses: allow-list validation, then the forbidden-keyword
/// screen on every accepted value, and only then a bounded repository call.
/// Nothing here can fail the caller; every path returns a `QueryOutcome`.
pub struct VendorQueryExecutor<R> {
    repository: Arc<R>,
    limit: u32,
}

impl<R> VendorQueryExecutor<R>
where
    R: VendorRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository, limit: RESULT_LIMIT }
    }

    pub async fn run(&self, raw_filters: &Map<String, Value>) -> QueryOutcome {
        let (accepted, rejected) = validate_filters(raw_filters);

        if !rejected.is_empty() {
            return QueryOutcome::Error(QueryError::InvalidFilters { rejected });
        }
        if accepted.is_empty() {
            return QueryOutcome::Error(QueryError::MissingFilters);
        }

        for value in accepted.values() {
            if let Some(offending) = contains_forbidden(value) {
                warn!(
                    event_name = "agent.executor.forbidden_keyword",
                    value = %offending,
                    "filter value rejected before store access"
                );
                return QueryOutcome::Error(QueryError::ForbiddenKeyword { value: offending });
            }
        }

        match self.repository.search(&accepted, self.limit).await {
            Ok(records) => QueryOutcome::Results(records),
            Err(store_error) => {
                error!(
                    event_name = "agent.executor.store_failure",
                    error = %store_error,
                    "vendor lookup failed"
                );
                QueryOutcome::Error(QueryError::Db { detail: store_error.to_string() })
            }
        }
    }
}
