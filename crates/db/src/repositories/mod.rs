use async_trait::async_trait;
use thiserror::Error;

use vendorlink_core::domain::vendor::VendorRecord;
use vendorlink_core::filters::FilterMap;

pub mod memory;
pub mod vendor;

pub use memory::InMemoryVendorRepository;
pub use vendor::SqlVendorRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unsupported filter field `{0}`")]
    UnsupportedField(String),
}

/// Bounded vendor lookup. Implementations must treat `filters` as already
/// allow-listed but still resolve column identifiers from their own fixed
/// mapping and bind every value as a parameter.
#[async_trait]
pub trait VendorRepository: Send + Sync {
    async fn search(
        &self,
        filters: &FilterMap,
        limit: u32,
    ) -> Result<Vec<VendorRecord>, RepositoryError>;
}
