//! # ESGDoc Editor
//!
//! Editing and state core for ESG report documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ api: server records ↔ internal tree         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: session + mutations                 │
//! │  - Apply mutations with validation          │
//! │  - Whole-document undo/redo snapshots       │
//! │  - Save-status machine + dirty tracking     │
//! │  - AI-assist correlation (id-based)         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ rendering surface: reads + subscriptions    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: the rendering surface reads
//!    the current `Document` and reacts to push notifications
//! 2. **Mutations flow through the session**: every edit snapshots first,
//!    so every edit is individually undoable
//! 3. **Structural errors propagate, transient errors become state**:
//!    a bad mutation is the caller's bug; a failed save is a status
//! 4. **Async responses correlate by id**: an AI suggestion lands on the
//!    block that produced it or nowhere
//!
//! ## Usage
//!
//! ```rust,ignore
//! use esgdoc_editor::{EditorConfig, EditorSession, Mutation};
//!
//! // Open a session on a fetched server document
//! let mut session = EditorSession::open(&client, 1042, EditorConfig::default()).await?;
//!
//! // Edit through the store
//! session.apply(Mutation::SetDocumentTitle { title: "FY2024 Report".into() })?;
//! session.undo();
//!
//! // Persist
//! let status = session.save(&client).await;
//! ```

pub mod assist;
pub mod config;
pub mod history;
pub mod mutations;
pub mod persist;
pub mod session;

pub use assist::{
    AiAssistClient, AssistAdapter, AssistDisposition, AssistError, AssistTicket,
    ExpansionOptions, ExpansionOutcome, MappingOptions, MappingOutcome,
};
pub use config::EditorConfig;
pub use history::History;
pub use mutations::{BlockPatch, Mutation, MutationError};
pub use persist::{PersistError, PersistenceClient};
pub use session::{EditorEvent, EditorSession, SaveStatus, Selection, TextRange};

// Re-export the tree types for convenience
pub use esgdoc_model::{Block, BlockKind, BlockPayload, Document, Inline, Section};
