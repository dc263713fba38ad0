//! Persistence collaborator boundary
//!
//! The core never talks to a transport; it fetches and saves server
//! document records through this trait and the converter. Failures are
//! transient by definition: they surface as save-status state, never as
//! document mutations.

use async_trait::async_trait;
use esgdoc_api::{ApiDocument, ApiDocumentUpdate};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    /// Connectivity to the persistence endpoint is lost
    #[error("persistence endpoint unreachable")]
    Offline,

    #[error("document not found: {0}")]
    NotFound(i64),

    #[error("server rejected document: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Remote document store (GET / PUT-PATCH)
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    async fn fetch_document(&self, id: i64) -> Result<ApiDocument, PersistError>;

    async fn save_document(
        &self,
        id: i64,
        update: &ApiDocumentUpdate,
    ) -> Result<(), PersistError>;
}
