//! Error types for Netwatch.

use thiserror::Error;

/// Main error type for Netwatch operations.
#[derive(Error, Debug, Clone)]
pub enum NetwatchError {
    /// No record exists for the node.
    #[error("Node not found: {id}")]
    NotFound { id: String },

    /// A call to the remote operation provider failed.
    #[error("Provider call {operation} failed for {node}: {message}")]
    ProviderFailure {
        operation: String,
        node: String,
        message: String,
    },

    /// Writing to a log sink failed.
    #[error("Log sink error: {0}")]
    LogSink(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NetwatchError {
    /// Build a provider failure for `operation` on `node`.
    pub fn provider(
        operation: impl Into<String>,
        node: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        NetwatchError::ProviderFailure {
            operation: operation.into(),
            node: node.into(),
            message: message.into(),
        }
    }

    /// Returns true if the next cycle may succeed where this one failed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NetwatchError::ProviderFailure { .. } | NetwatchError::LogSink(_)
        )
    }

    /// Returns the node ID if the error concerns a single node.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            NetwatchError::NotFound { id } => Some(id),
            NetwatchError::ProviderFailure { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Convenience Result type for Netwatch operations.
pub type Result<T> = std::result::Result<T, NetwatchError>;

impl From<serde_json::Error> for NetwatchError {
    fn from(err: serde_json::Error) -> Self {
        NetwatchError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for NetwatchError {
    fn from(err: std::io::Error) -> Self {
        NetwatchError::LogSink(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_is_recoverable() {
        let err = NetwatchError::provider("grow_resource", "n00dles", "unreachable");
        assert!(err.is_recoverable());
        assert_eq!(err.node_id(), Some("n00dles"));
        assert_eq!(
            err.to_string(),
            "Provider call grow_resource failed for n00dles: unreachable"
        );
    }

    #[test]
    fn test_config_error_not_recoverable() {
        let err = NetwatchError::Config("max_weaken_attempts must be > 0".into());
        assert!(!err.is_recoverable());
        assert!(err.node_id().is_none());
    }
}
