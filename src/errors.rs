//! Error handling for the access engine
//!
//! Absence of data (no authorization row, no feature) is never an error here:
//! it resolves to a default inside the evaluator. What does surface as an
//! error is a broken precondition, an inconsistent rank configuration, or a
//! failing store.

use crate::rank::Rank;
use thiserror::Error;

/// Main error type for the access engine
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database operation failed: {operation} - {source}")]
    Database {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Precondition violated: {message}")]
    Precondition { message: String },

    #[error("Unknown rank {rank} for {context}")]
    UnknownRank { rank: Rank, context: String },

    #[error("Lock poisoned: {resource}")]
    LockPoisoned { resource: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {resource} - {id}")]
    NotFound { resource: String, id: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create an unknown rank error
    pub fn unknown_rank(rank: Rank, context: impl Into<String>) -> Self {
        Self::UnknownRank {
            rank,
            context: context.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error comes from configuration rather than from the store.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::UnknownRank { .. })
    }
}

/// Helper trait for safe RwLock read operations
pub trait SafeReadLock<T: ?Sized> {
    /// Safely acquire a read lock
    fn safe_read(&self) -> AccessResult<std::sync::RwLockReadGuard<'_, T>>;
}

impl<T: ?Sized> SafeReadLock<T> for std::sync::RwLock<T> {
    fn safe_read(&self) -> AccessResult<std::sync::RwLockReadGuard<'_, T>> {
        self.read().map_err(|_| AccessError::LockPoisoned {
            resource: "rwlock_read".to_string(),
        })
    }
}

/// Helper trait for safe RwLock write operations
pub trait SafeWriteLock<T: ?Sized> {
    /// Safely acquire a write lock
    fn safe_write(&self) -> AccessResult<std::sync::RwLockWriteGuard<'_, T>>;
}

impl<T: ?Sized> SafeWriteLock<T> for std::sync::RwLock<T> {
    fn safe_write(&self) -> AccessResult<std::sync::RwLockWriteGuard<'_, T>> {
        self.write().map_err(|_| AccessError::LockPoisoned {
            resource: "rwlock_write".to_string(),
        })
    }
}

/// Convert from sled errors
impl From<sled::Error> for AccessError {
    fn from(err: sled::Error) -> Self {
        AccessError::database("sled_operation", err)
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        AccessError::serialization("json_operation", err)
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for AccessError {
    fn from(err: std::io::Error) -> Self {
        AccessError::io("io_operation", err)
    }
}

/// Convert from figment errors
impl From<figment::Error> for AccessError {
    fn from(err: figment::Error) -> Self {
        AccessError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = AccessError::config("ladder has duplicate ranks");
        assert!(config_err.to_string().contains("Configuration error"));
        assert!(config_err.is_configuration());

        let rank_err = AccessError::unknown_rank(Rank::new(9), "project demo");
        assert!(rank_err.to_string().contains("Unknown rank 9"));
        assert!(rank_err.is_configuration());

        let pre = AccessError::precondition("anonymous user flagged superuser");
        assert!(!pre.is_configuration());
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "lookup timed out");
        let err = AccessError::io("authorization lookup", io_err);

        assert!(err.source().is_some());
        assert!(err.to_string().contains("I/O operation failed"));
    }

    #[test]
    fn poisoned_lock_maps_to_error() {
        use std::sync::{Arc, RwLock};

        let lock = Arc::new(RwLock::new(0u8));
        let poisoner = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(
            lock.safe_read(),
            Err(AccessError::LockPoisoned { .. })
        ));
        assert!(matches!(
            lock.safe_write(),
            Err(AccessError::LockPoisoned { .. })
        ));
    }
}
