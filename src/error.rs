//! Error types for recordvault
//!
//! Provides a unified error type for all storage operations. Cache failures
//! have their own type ([`crate::cache::CacheError`]) because they never
//! escape the cache-aside layer.

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for recordvault operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record {id} not found")]
    NotFound { id: i64 },

    /// A freshly allocated id already has a record: allocator state is corrupt.
    #[error("Integrity violation: id {id} already has a record")]
    Integrity { id: i64 },

    #[error("Storage is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    // -------------------------------------------------------------------------
    // Protocol / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`VaultError`]
///
/// Callers at the service boundary map these to responses: `NotFound` to a
/// not-found reply, `Io`/`Integrity`/`Closed` to an internal failure, and
/// `Invalid` to a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    NotFound,
    Integrity,
    Closed,
    Invalid,
}

impl VaultError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Io(_)
            | VaultError::WalCorruption(_)
            | VaultError::Storage(_)
            | VaultError::Database(_)
            | VaultError::Serialization(_) => ErrorKind::Io,
            VaultError::NotFound { .. } => ErrorKind::NotFound,
            VaultError::Integrity { .. } => ErrorKind::Integrity,
            VaultError::Closed => ErrorKind::Closed,
            VaultError::Protocol(_) | VaultError::Config(_) => ErrorKind::Invalid,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::NotFound`
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
