pub mod config;
pub mod domain;
pub mod filters;
pub mod outcome;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::chat::{Message, Role};
pub use domain::vendor::{VendorDraft, VendorRecord};
pub use filters::{
    contains_forbidden, validate_filters, FilterMap, FilterValue, ALLOWED_FILTERS,
    FORBIDDEN_KEYWORDS,
};
pub use outcome::{QueryError, QueryOutcome};
