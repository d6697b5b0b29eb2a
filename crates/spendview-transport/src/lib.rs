//! Transport boundary for spendview
//!
//! The view core never talks to a wire directly: it asks a `Transport` for
//! the JSON body of a logical endpoint. This crate defines that boundary,
//! the models carried across it and an in-memory backend.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod endpoint;
pub mod error;
pub mod memory;
pub mod models;

pub use endpoint::{ApprovalParams, EmployeeParams, Endpoint, PageParams};
pub use error::TransportError;
pub use memory::{Dataset, InMemoryTransport};
pub use models::{Employee, Page, Transaction};

// ==================== Transport Trait ====================

/// Transport reference type
pub type TransportRef = Arc<dyn Transport>;

/// Retrieval of one logical endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Retrieve the response body of `endpoint` for `params`
    async fn retrieve(&self, endpoint: Endpoint, params: Option<Value>) -> Result<Value, TransportError>;
}
