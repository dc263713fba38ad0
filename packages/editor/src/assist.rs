//! # AI-Assist Correlation Adapter
//!
//! Issues framework-mapping and content-expansion requests against a
//! specific block and routes the response back into the exact node that
//! produced it.
//!
//! Correlation is identifier-based, not positional: a ticket captures the
//! block id, the owning document id and the session generation before the
//! request leaves, and the response is only applied if all three still
//! hold when it lands. A response for a deleted block or a swapped-out
//! document is a logged no-op, never an error: the race is an expected
//! outcome of concurrent editing.
//!
//! Applying a suggestion is a normal store mutation, so it is
//! individually undoable and participates in dirty tracking.

use crate::config::EditorConfig;
use crate::mutations::{BlockPatch, Mutation, MutationError};
use crate::session::EditorSession;
use async_trait::async_trait;
use esgdoc_api::assist::{
    ContentExpansionRequest, ContentExpansionResponse, ContentTone, EsgMappingRequest,
    EsgMappingResponse, ExpansionMode,
};
use esgdoc_api::wire_id;
use esgdoc_model::{BlockKind, Framework, IdGenerator, Inline};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssistError {
    /// Extracted text is too short to analyze; no request was sent
    #[error("extracted text is {len} chars, below the {min}-char minimum")]
    InsufficientContent { len: usize, min: usize },

    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// The block's variant carries no text to analyze or expand
    #[error("block {0} carries no expandable text")]
    NotTextual(String),

    #[error("assist request timed out after {0}s")]
    Timeout(u64),

    #[error("assist transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// AI collaborator transport. Endpoint, auth and retries are the
/// embedding application's concern.
#[async_trait]
pub trait AiAssistClient: Send + Sync {
    async fn map_esg(&self, request: &EsgMappingRequest)
        -> Result<EsgMappingResponse, AssistError>;

    async fn expand_content(
        &self,
        request: &ContentExpansionRequest,
    ) -> Result<ContentExpansionResponse, AssistError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingOptions {
    /// Frameworks to search; `None` searches all
    pub frameworks: Option<Vec<Framework>>,
    pub top_k: u32,
    pub min_confidence: f64,
    pub language: String,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            frameworks: None,
            top_k: 5,
            min_confidence: 0.5,
            language: "ko".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOptions {
    pub mode: ExpansionMode,
    pub tone: ContentTone,
    pub target_length: Option<u32>,
    pub language: String,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            mode: ExpansionMode::Expand,
            tone: ContentTone::Professional,
            target_length: None,
            language: "ko".to_string(),
        }
    }
}

/// Everything captured before a request leaves the client
#[derive(Debug, Clone, PartialEq)]
pub struct AssistTicket {
    pub correlation_id: String,
    pub block_id: String,
    pub document_id: String,
    pub generation: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutcome {
    pub ticket: AssistTicket,
    pub response: EsgMappingResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOutcome {
    pub ticket: AssistTicket,
    pub response: ContentExpansionResponse,
}

/// What happened to a suggestion when it came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistDisposition {
    Applied,
    /// The session moved to a different document while the request was in
    /// flight
    DiscardedStaleDocument,
    /// The target block was deleted while the request was in flight
    DiscardedMissingBlock,
}

pub struct AssistAdapter {
    tokens: IdGenerator,
    config: EditorConfig,
}

impl AssistAdapter {
    pub fn new(session: &EditorSession, config: EditorConfig) -> Self {
        Self {
            tokens: IdGenerator::from_seed(format!("assist-{}", session.document_id())),
            config,
        }
    }

    /// Build a ticket for a framework-mapping request. Extracts the
    /// block's plain text and rejects locally, with no network call, when
    /// it is below the minimum length.
    pub fn prepare_mapping(
        &mut self,
        session: &EditorSession,
        block_id: &str,
    ) -> Result<AssistTicket, AssistError> {
        self.ticket(session, block_id, false)
    }

    /// Build a ticket for a content-expansion request. Only text and
    /// heading blocks can receive an expanded rewrite.
    pub fn prepare_expansion(
        &mut self,
        session: &EditorSession,
        block_id: &str,
    ) -> Result<AssistTicket, AssistError> {
        self.ticket(session, block_id, true)
    }

    fn ticket(
        &mut self,
        session: &EditorSession,
        block_id: &str,
        expandable_only: bool,
    ) -> Result<AssistTicket, AssistError> {
        let block = session
            .document()
            .find_block(block_id)
            .ok_or_else(|| AssistError::BlockNotFound(block_id.to_string()))?;

        if expandable_only && !matches!(block.kind(), BlockKind::Text | BlockKind::Heading) {
            return Err(AssistError::NotTextual(block_id.to_string()));
        }

        let text = block
            .plain_text()
            .ok_or_else(|| AssistError::NotTextual(block_id.to_string()))?;

        let len = text.chars().count();
        let min = self.config.assist_min_chars;
        if len < min {
            return Err(AssistError::InsufficientContent { len, min });
        }

        Ok(AssistTicket {
            correlation_id: self.tokens.next_id(),
            block_id: block_id.to_string(),
            document_id: session.document_id().to_string(),
            generation: session.generation(),
            text,
        })
    }

    /// Send a framework-mapping request, bounded by the client timeout
    pub async fn map_esg<C>(
        &self,
        client: &C,
        ticket: AssistTicket,
        options: MappingOptions,
    ) -> Result<MappingOutcome, AssistError>
    where
        C: AiAssistClient + ?Sized,
    {
        let request = EsgMappingRequest {
            text: ticket.text.clone(),
            document_id: wire_id(&ticket.document_id),
            block_id: ticket.block_id.clone(),
            frameworks: options.frameworks,
            top_k: options.top_k,
            min_confidence: options.min_confidence,
            language: options.language,
        };

        debug!(correlation = %ticket.correlation_id, block = %ticket.block_id, "dispatching mapping request");

        match timeout(self.config.assist_timeout(), client.map_esg(&request)).await {
            Err(_) => Err(AssistError::Timeout(self.config.assist_timeout_secs)),
            Ok(result) => result.map(|response| MappingOutcome { ticket, response }),
        }
    }

    /// Send a content-expansion request, bounded by the client timeout
    pub async fn expand_content<C>(
        &self,
        client: &C,
        ticket: AssistTicket,
        options: ExpansionOptions,
    ) -> Result<ExpansionOutcome, AssistError>
    where
        C: AiAssistClient + ?Sized,
    {
        let request = ContentExpansionRequest {
            text: ticket.text.clone(),
            document_id: wire_id(&ticket.document_id),
            block_id: ticket.block_id.clone(),
            mode: options.mode,
            tone: options.tone,
            target_length: options.target_length,
            language: options.language,
        };

        debug!(correlation = %ticket.correlation_id, block = %ticket.block_id, "dispatching expansion request");

        match timeout(self.config.assist_timeout(), client.expand_content(&request)).await {
            Err(_) => Err(AssistError::Timeout(self.config.assist_timeout_secs)),
            Ok(result) => result.map(|response| ExpansionOutcome { ticket, response }),
        }
    }

    /// Write accepted mapping matches into the block's attribute map.
    /// Stale responses are discarded silently.
    pub fn apply_mapping(
        &self,
        session: &mut EditorSession,
        outcome: &MappingOutcome,
    ) -> Result<AssistDisposition, AssistError> {
        if let Some(disposition) = self.staleness(session, &outcome.ticket) {
            return Ok(disposition);
        }

        let suggestions =
            serde_json::to_value(&outcome.response.suggestions).unwrap_or(serde_json::Value::Null);
        session.apply(Mutation::SetBlockAttribute {
            block_id: outcome.ticket.block_id.clone(),
            name: "aiAssist".to_string(),
            value: serde_json::json!({
                "correlationId": outcome.ticket.correlation_id,
                "suggestions": suggestions,
            }),
        })?;

        Ok(AssistDisposition::Applied)
    }

    /// Replace the block's text content with the suggested rewrite.
    /// Stale responses are discarded silently.
    pub fn apply_expansion(
        &self,
        session: &mut EditorSession,
        outcome: &ExpansionOutcome,
    ) -> Result<AssistDisposition, AssistError> {
        if let Some(disposition) = self.staleness(session, &outcome.ticket) {
            return Ok(disposition);
        }

        // Variants are stable for a given id (patches preserve them and
        // ids are never reused), so this only guards hand-built outcomes
        let kind = match session.document().find_block(&outcome.ticket.block_id) {
            Some(block) => block.kind(),
            None => return Ok(AssistDisposition::DiscardedMissingBlock),
        };

        let inline = Inline::text(session.next_node_id(), outcome.response.suggestion.as_str());
        let patch = match kind {
            BlockKind::Text => BlockPatch::Text {
                role: None,
                content: Some(vec![inline]),
            },
            BlockKind::Heading => BlockPatch::Heading {
                level: None,
                content: Some(vec![inline]),
            },
            _ => return Err(AssistError::NotTextual(outcome.ticket.block_id.clone())),
        };

        session.apply(Mutation::UpdateBlockPayload {
            block_id: outcome.ticket.block_id.clone(),
            patch,
        })?;

        Ok(AssistDisposition::Applied)
    }

    /// Race checks shared by both apply paths: document identity first,
    /// then block presence
    fn staleness(
        &self,
        session: &EditorSession,
        ticket: &AssistTicket,
    ) -> Option<AssistDisposition> {
        if ticket.generation != session.generation() || ticket.document_id != session.document_id()
        {
            warn!(
                correlation = %ticket.correlation_id,
                "discarding assist response for a replaced document"
            );
            return Some(AssistDisposition::DiscardedStaleDocument);
        }

        if session.document().find_block(&ticket.block_id).is_none() {
            debug!(
                correlation = %ticket.correlation_id,
                block = %ticket.block_id,
                "discarding assist response for a deleted block"
            );
            return Some(AssistDisposition::DiscardedMissingBlock);
        }

        None
    }
}
