//! Error types for the KNI Operator

use std::time::Duration;

use thiserror::Error;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write rejected because the object changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Create rejected because the object already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Write targeted an object that no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object is missing metadata required for a write
    #[error("Missing metadata: {0}")]
    Metadata(String),

    /// ClusterVersion singleton could not be resolved
    #[error("ClusterVersion error: {0}")]
    ClusterVersion(String),

    /// Any other store backend failure
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    /// Create a missing metadata error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Error::Metadata(msg.into())
    }

    /// Create a ClusterVersion error
    pub fn cluster_version(msg: impl Into<String>) -> Self {
        Error::ClusterVersion(msg.into())
    }

    /// Create a generic store error
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Whether a later reconcile can be expected to succeed.
    ///
    /// Everything raised while talking to the store is transient; only
    /// configuration and rendering problems need a human.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Config(_) | Error::Serialization(_))
    }

    /// Delay before the next attempt after this error
    pub fn requeue_after(&self) -> Duration {
        match self {
            Error::Conflict(_) | Error::AlreadyExists(_) | Error::NotFound(_) => {
                Duration::from_secs(5)
            }
            Error::Kube(_) | Error::Store(_) => Duration::from_secs(30),
            Error::ClusterVersion(_) | Error::Metadata(_) => Duration::from_secs(60),
            Error::Config(_) | Error::Serialization(_) => Duration::from_secs(300),
        }
    }
}
