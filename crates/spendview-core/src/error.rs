//! Error types for spendview-core
//!
//! Transport failures propagate to the caller of the view action that
//! triggered them; responses that arrive for a superseded selection are
//! reported as `StaleResponse` and never applied.

use serde::{Deserialize, Serialize};
use spendview_transport::{Endpoint, TransportError};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Retrieval failed
    Transport,
    /// Response for a superseded selection
    StaleResponse,
    /// Response body did not match the expected shape
    Decode,
    /// Request parameters could not be serialized
    Encode,
    /// Employee id not in the directory
    UnknownEmployee,
    /// Transaction id not held by the view
    UnknownTransaction,
    /// Conflicting request already outstanding
    Busy,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Transport => write!(f, "TRANSPORT"),
            ErrorCode::StaleResponse => write!(f, "STALE_RESPONSE"),
            ErrorCode::Decode => write!(f, "DECODE"),
            ErrorCode::Encode => write!(f, "ENCODE"),
            ErrorCode::UnknownEmployee => write!(f, "UNKNOWN_EMPLOYEE"),
            ErrorCode::UnknownTransaction => write!(f, "UNKNOWN_TRANSACTION"),
            ErrorCode::Busy => write!(f, "BUSY"),
        }
    }
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Debug information
    Debug,
    /// Informational
    Info,
    /// Warning - the action was refused
    Warning,
    /// Error - the action failed
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Debug => write!(f, "debug"),
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Main error type for spendview-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Stale response for {action} discarded (issued at epoch {issued}, now {current})")]
    StaleResponse { action: String, issued: u64, current: u64 },

    #[error("Could not decode {endpoint} response: {message}")]
    Decode { endpoint: Endpoint, message: String },

    #[error("Could not encode {endpoint} parameters: {message}")]
    Encode { endpoint: Endpoint, message: String },

    #[error("Unknown employee: {id}")]
    UnknownEmployee { id: String },

    #[error("Unknown transaction: {id}")]
    UnknownTransaction { id: String },

    #[error("Busy: {operation} is already in progress")]
    Busy { operation: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Transport(_) => ErrorCode::Transport,
            CoreError::StaleResponse { .. } => ErrorCode::StaleResponse,
            CoreError::Decode { .. } => ErrorCode::Decode,
            CoreError::Encode { .. } => ErrorCode::Encode,
            CoreError::UnknownEmployee { .. } => ErrorCode::UnknownEmployee,
            CoreError::UnknownTransaction { .. } => ErrorCode::UnknownTransaction,
            CoreError::Busy { .. } => ErrorCode::Busy,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Transport(_) => ErrorSeverity::Error,
            CoreError::StaleResponse { .. } => ErrorSeverity::Debug,
            CoreError::Decode { .. } => ErrorSeverity::Error,
            CoreError::Encode { .. } => ErrorSeverity::Error,
            CoreError::UnknownEmployee { .. } => ErrorSeverity::Warning,
            CoreError::UnknownTransaction { .. } => ErrorSeverity::Warning,
            CoreError::Busy { .. } => ErrorSeverity::Info,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, CoreError::StaleResponse { .. })
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::Transport(error) => {
                if let Some(endpoint) = error.endpoint() {
                    details = details.with_detail(serde_json::json!({ "endpoint": endpoint.as_str() }));
                }
                details = details.with_suggestion(
                    "Retry the action; nothing was applied to the view.".to_string()
                );
            }
            CoreError::Decode { endpoint, .. } => {
                details = details.with_detail(serde_json::json!({ "endpoint": endpoint.as_str() }));
                details = details.with_suggestion(
                    "Check that the backend serves the expected response shape.".to_string()
                );
            }
            CoreError::UnknownEmployee { id } => {
                details = details.with_suggestion(format!(
                    "Employee '{}' is not in the loaded directory; refresh the directory first.", id
                ));
            }
            CoreError::Busy { .. } => {
                details = details.with_suggestion(
                    "Wait for the outstanding request to finish.".to_string()
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Ticket of the view action, when there is one
    pub ticket: Option<u64>,
    /// Operation being performed
    pub operation: String,
    /// Additional context data
    pub data: serde_json::Value,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: String) -> Self {
        Self {
            ticket: None,
            operation,
            data: serde_json::json!({}),
        }
    }

    /// Add the action ticket
    pub fn with_ticket(mut self, ticket: u64) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Add context data
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data[key] = value;
        self
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    /// Log debug information
    fn log_debug(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Error => log::error!(
                target: "spendview::error",
                "ERROR [{}] {} - Operation: {} - Ticket: {:?}",
                error.code(),
                error.to_details(),
                context.operation,
                context.ticket
            ),
            ErrorSeverity::Warning | ErrorSeverity::Info => log::warn!(
                target: "spendview::error",
                "WARNING [{}] {} - Operation: {} - Ticket: {:?}",
                error.code(),
                error,
                context.operation,
                context.ticket
            ),
            ErrorSeverity::Debug => self.log_debug(&error.to_string(), context),
        }
    }

    fn log_debug(&self, message: &str, context: &ErrorContext) {
        log::debug!(
            target: "spendview::error",
            "DEBUG: {} - Operation: {} - Ticket: {:?} - Data: {}",
            message,
            context.operation,
            context.ticket,
            context.data
        );
    }
}

// ==================== Tests ====================
