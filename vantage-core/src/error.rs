use crate::model::{AddressFamily, AssetId, RelationType};
use thiserror::Error;

/// Failures raised by an asset store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Other error: {0}")]
    Other(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("no names to query")]
    NoNames,

    #[error("no targets to query")]
    NoTargets,

    #[error("no pairs to process")]
    NoPairs,

    #[error("no addresses were discovered")]
    NoAddresses,

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// A well-formed address handed to the wrong record type (IPv6 for an
    /// A record, IPv4 for AAAA). Malformed input like `InvalidAddress`.
    #[error("{relation} requires an {expected} address, got {address}")]
    FamilyMismatch {
        relation: RelationType,
        expected: AddressFamily,
        address: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GraphError {
    /// True for the "nothing found" outcomes of a query against a sparse graph,
    /// as opposed to malformed input or a broken store.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            GraphError::NoNames
                | GraphError::NoTargets
                | GraphError::NoPairs
                | GraphError::NoAddresses
        )
    }

    /// True when the input itself was rejected: a bad name, an unparseable
    /// address, or an address of the wrong family for its record type.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            GraphError::InvalidName(_)
                | GraphError::InvalidAddress(_)
                | GraphError::FamilyMismatch { .. }
        )
    }
}

/// Returned by a [`crate::intake::Dispatcher`] that could not deliver an event.
#[derive(Error, Debug)]
#[error("Dispatch failed: {0}")]
pub struct DispatchError(pub String);

pub type Result<T> = std::result::Result<T, GraphError>;
