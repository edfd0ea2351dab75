//! Error types for abqinv-inventory

use thiserror::Error;

/// Errors that can occur while building or caching an inventory
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// Listing the virtual machines failed
    #[error("failed to list virtual machines: {0}")]
    ListFailed(String),

    /// Fetching a required relation of a virtual machine failed
    #[error("failed to fetch {relation} of {vm}: {message}")]
    EnrichFailed {
        /// Virtual machine name
        vm: String,
        /// Relation that was being fetched
        relation: &'static str,
        /// Underlying error
        message: String,
    },

    /// The API returned a record the inventory cannot represent
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A snapshot failed its consistency check
    #[error("inventory invariant violated: {0}")]
    Invariant(String),

    /// Cache file could not be read or written
    #[error("cache error: {0}")]
    CacheError(String),
}

impl InventoryError {
    /// Check if the error came from talking to the API
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            InventoryError::ListFailed(_) | InventoryError::EnrichFailed { .. }
        )
    }
}
