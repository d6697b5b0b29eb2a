//! Error types for spendview-transport

use thiserror::Error;

use crate::endpoint::Endpoint;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error on {endpoint}: {message}")]
    Network { endpoint: Endpoint, message: String },

    #[error("Server error on {endpoint}: {message}")]
    Server { endpoint: Endpoint, message: String },

    #[error("Invalid parameters for {endpoint}: {message}")]
    InvalidParams { endpoint: Endpoint, message: String },

    #[error("Unknown endpoint: {name}")]
    UnknownEndpoint { name: String },

    #[error("Dataset error: {message}")]
    Dataset { message: String },
}

impl TransportError {
    /// Endpoint the failure belongs to, when known
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            TransportError::Network { endpoint, .. }
            | TransportError::Server { endpoint, .. }
            | TransportError::InvalidParams { endpoint, .. } => Some(*endpoint),
            _ => None,
        }
    }
}
