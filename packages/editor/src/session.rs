//! # Editor Session Store
//!
//! One live instance per open document. The session owns the document
//! (through the history manager), the current selection, and the
//! save-status machine, and is the single entry point for mutations so
//! every edit gets a history snapshot and a state notification.
//!
//! ## Save-status machine
//!
//! ```text
//! idle ──mutate──▶ edited ──save──▶ saving ──ok──▶ saved
//!   ▲                ▲                 │
//!   │                └──────fail───────┴──▶ error ──mutate──▶ edited
//! ```
//!
//! An orthogonal connectivity bit folds any state into `Offline` while
//! the persistence collaborator is unreachable; the base state resumes
//! when connectivity returns.
//!
//! Dirty is not a boolean flip: the session retains the last successfully
//! saved document value and compares structurally, so undoing back to the
//! save point reports clean again.

use crate::config::EditorConfig;
use crate::history::History;
use crate::mutations::{Mutation, MutationError};
use crate::persist::{PersistenceClient, PersistError};
use chrono::{DateTime, Utc};
use esgdoc_api::{to_internal, to_update_request, wire_id};
use esgdoc_model::{Document, IdGenerator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Edited,
    Saving,
    Saved,
    Error,
    Offline,
}

/// Inline text-offset range within the selected block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

/// Current editing focus. Selection is UI state: it never creates a
/// history entry and never affects the dirty flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub section_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

/// Push notification for the rendering surface. Events signal which part
/// of the session changed; readers pull the current value back off the
/// session.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Document { version: u64 },
    Selection(Option<Selection>),
    SaveStatus(SaveStatus),
}

pub struct EditorSession {
    history: History,
    selection: Option<Selection>,

    /// Base machine state; `Offline` is derived, never stored
    status: SaveStatus,
    online: bool,
    last_saved: Option<DateTime<Utc>>,

    /// What the server last acknowledged; dirty = present differs
    saved_snapshot: Document,

    /// Ids of deleted blocks; never reassigned within the session
    retired_block_ids: HashSet<String>,

    ids: IdGenerator,

    /// Bumps when a different document is loaded; in-flight assist
    /// responses from an older generation are discarded
    generation: u64,

    /// Bumps on every applied change, including undo/redo
    version: u64,

    events: broadcast::Sender<EditorEvent>,
    config: EditorConfig,
}

impl EditorSession {
    pub fn new(document: Document, config: EditorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let ids = IdGenerator::for_document(&format!(
            "{}@{}",
            document.id, document.meta.updated_at
        ));

        Self {
            saved_snapshot: document.clone(),
            history: History::new(document, config.history_limit),
            selection: None,
            status: SaveStatus::Idle,
            online: true,
            last_saved: None,
            retired_block_ids: HashSet::new(),
            ids,
            generation: 0,
            version: 0,
            events,
            config,
        }
    }

    /// Fetch a server document and open a session on it
    pub async fn open<C>(
        client: &C,
        document_id: i64,
        config: EditorConfig,
    ) -> Result<Self, PersistError>
    where
        C: PersistenceClient + ?Sized,
    {
        let api = client.fetch_document(document_id).await?;
        Ok(Self::new(to_internal(&api), config))
    }

    pub fn document(&self) -> &Document {
        self.history.present()
    }

    pub fn document_id(&self) -> &str {
        &self.history.present().id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Subscribe to state-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    /// Next session-unique node id, skipping anything live or retired
    pub fn next_node_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            if !self.history.present().contains_block_id(&id)
                && !self.retired_block_ids.contains(&id)
            {
                return id;
            }
        }
    }

    pub fn dirty(&self) -> bool {
        self.saved_snapshot != *self.history.present()
    }

    /// Reported status, with the connectivity bit folded in
    pub fn save_status(&self) -> SaveStatus {
        if self.online {
            self.status
        } else {
            SaveStatus::Offline
        }
    }

    /// Flip connectivity to the persistence collaborator
    pub fn set_online(&mut self, online: bool) {
        if self.online != online {
            self.online = online;
            self.emit(EditorEvent::SaveStatus(self.save_status()));
        }
    }

    /// Apply a mutation through the store: snapshot, stamp, notify.
    ///
    /// Structural errors propagate to the caller untouched and leave the
    /// document, the history, and the save status unchanged.
    pub fn apply(&mut self, mutation: Mutation) -> Result<(), MutationError> {
        self.check_retired(&mutation)?;

        // Ids to retire if the mutation removes blocks, collected before
        // the tree changes
        let retiring: Vec<String> = match &mutation {
            Mutation::RemoveBlock { block_id } => vec![block_id.clone()],
            Mutation::RemoveSection { section_id } => self
                .history
                .present()
                .find_section(section_id)
                .map(|s| s.blocks.iter().map(|b| b.id.clone()).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let mut next = self.history.present().clone();
        mutation.apply(&mut next)?;
        next.meta.updated_at = Utc::now().to_rfc3339();

        debug!(mutation = mutation.name(), document = %next.id, "applying mutation");

        self.retired_block_ids.extend(retiring);
        self.history.record(next);
        self.version += 1;
        self.emit(EditorEvent::Document {
            version: self.version,
        });
        self.mark_edited();
        Ok(())
    }

    /// Clone a block under fresh ids and insert the copy right after the
    /// original. One ordinary history entry; returns the new block id.
    pub fn duplicate_block(&mut self, block_id: &str) -> Result<String, MutationError> {
        let (section_id, at, source) = {
            let doc = self.history.present();
            let (si, bi) = doc
                .position_of_block(block_id)
                .ok_or_else(|| MutationError::BlockNotFound(block_id.to_string()))?;
            (
                doc.sections[si].id.clone(),
                bi + 1,
                doc.sections[si].blocks[bi].clone(),
            )
        };

        let mut copy = source.duplicated(&mut self.ids);
        copy.id = self.next_node_id();
        let new_id = copy.id.clone();

        self.apply(Mutation::InsertBlock {
            section_id,
            block: copy,
            index: Some(at),
        })?;
        Ok(new_id)
    }

    /// Step back one snapshot. No-op (returning false) with empty history.
    pub fn undo(&mut self) -> bool {
        if !self.history.undo() {
            return false;
        }
        self.after_history_nav();
        true
    }

    /// Step forward one snapshot. Mirror of `undo`.
    pub fn redo(&mut self) -> bool {
        if !self.history.redo() {
            return false;
        }
        self.after_history_nav();
        true
    }

    /// Update the selection. Never creates a history entry.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        if self.selection != selection {
            self.selection = selection;
            self.emit(EditorEvent::Selection(self.selection.clone()));
        }
    }

    /// Persist the current document. Transient failures become state
    /// (`error` / `offline`), never exceptions, and the content is kept.
    pub async fn save<C>(&mut self, client: &C) -> SaveStatus
    where
        C: PersistenceClient + ?Sized,
    {
        if !self.dirty() {
            return self.save_status();
        }

        self.transition(SaveStatus::Saving);

        let snapshot = self.history.present().clone();
        let update = to_update_request(&snapshot);
        let id = wire_id(&snapshot.id);

        match client.save_document(id, &update).await {
            Ok(()) => {
                debug!(document = %snapshot.id, "document saved");
                self.saved_snapshot = snapshot;
                self.last_saved = Some(Utc::now());
                // Edits that landed while the save was in flight keep the
                // session dirty; the snapshot comparison reports them
                let next = if self.dirty() {
                    SaveStatus::Edited
                } else {
                    SaveStatus::Saved
                };
                self.transition(next);
            }
            Err(PersistError::Offline) => {
                warn!(document = %snapshot.id, "save failed: endpoint unreachable");
                self.online = false;
                self.transition(SaveStatus::Edited);
            }
            Err(error) => {
                warn!(document = %snapshot.id, %error, "save failed");
                self.transition(SaveStatus::Error);
            }
        }

        self.save_status()
    }

    /// Replace the open document: resets history, selection, retired ids
    /// and the saved baseline, and invalidates in-flight assist work.
    pub fn load(&mut self, document: Document) {
        self.ids = IdGenerator::for_document(&format!(
            "{}@{}",
            document.id, document.meta.updated_at
        ));
        self.saved_snapshot = document.clone();
        self.history.reset(document);
        self.retired_block_ids.clear();
        self.generation += 1;
        self.version += 1;
        self.last_saved = None;
        self.selection = None;

        self.emit(EditorEvent::Document {
            version: self.version,
        });
        self.emit(EditorEvent::Selection(None));
        self.transition(SaveStatus::Idle);
    }

    /// Reject ids that were retired by a delete in this session
    fn check_retired(&self, mutation: &Mutation) -> Result<(), MutationError> {
        match mutation {
            Mutation::InsertBlock { block, .. } => {
                if self.retired_block_ids.contains(&block.id) {
                    return Err(MutationError::DuplicateBlockId(block.id.clone()));
                }
                Ok(())
            }
            Mutation::InsertSection { section, .. } => {
                for block in &section.blocks {
                    if self.retired_block_ids.contains(&block.id) {
                        return Err(MutationError::DuplicateBlockId(block.id.clone()));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn mark_edited(&mut self) {
        match self.status {
            SaveStatus::Idle | SaveStatus::Saved | SaveStatus::Error => {
                self.transition(SaveStatus::Edited);
            }
            // A save in flight stays in flight; the dirty comparison
            // catches edits that land before the ack
            SaveStatus::Saving | SaveStatus::Edited => {}
            // Never stored as base state
            SaveStatus::Offline => {}
        }
    }

    fn after_history_nav(&mut self) {
        self.version += 1;
        self.emit(EditorEvent::Document {
            version: self.version,
        });

        // Re-derive the status from the saved baseline
        let next = if self.dirty() {
            SaveStatus::Edited
        } else if self.last_saved.is_some() {
            SaveStatus::Saved
        } else {
            SaveStatus::Idle
        };
        if self.status != SaveStatus::Saving {
            self.transition(next);
        }
    }

    fn transition(&mut self, next: SaveStatus) {
        if self.status != next {
            self.status = next;
            self.emit(EditorEvent::SaveStatus(self.save_status()));
        }
    }

    // Send failures only mean nobody is subscribed
    fn emit(&self, event: EditorEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::Mutation;
    use esgdoc_model::{Block, BlockPayload, Inline, Section, TextRole};

    fn text_block(id: &str, inline_id: &str, text: &str) -> Block {
        Block::new(
            id,
            BlockPayload::Text {
                role: TextRole::Paragraph,
                content: vec![Inline::text(inline_id, text)],
            },
        )
    }

    fn session() -> EditorSession {
        let mut doc = Document::new_report("1042", "Report");
        doc.sections.push(Section::new("s1", "Environment"));
        EditorSession::new(doc, EditorConfig::default())
    }

    fn insert(session: &mut EditorSession, id: &str) {
        session
            .apply(Mutation::InsertBlock {
                section_id: "s1".into(),
                block: text_block(id, &format!("{}-i", id), "emissions overview"),
                index: None,
            })
            .unwrap();
    }

    #[test]
    fn test_mutation_marks_edited_and_dirty() {
        let mut session = session();
        assert_eq!(session.save_status(), SaveStatus::Idle);
        assert!(!session.dirty());

        insert(&mut session, "b1");

        assert_eq!(session.save_status(), SaveStatus::Edited);
        assert!(session.dirty());
        assert_eq!(session.version(), 1);
    }

    #[test]
    fn test_undo_restores_clean_state_before_any_save() {
        let mut session = session();
        insert(&mut session, "b1");

        assert!(session.undo());
        assert!(session.document().find_block("b1").is_none());
        assert!(!session.dirty());
        assert_eq!(session.save_status(), SaveStatus::Idle);

        assert!(session.redo());
        assert!(session.document().find_block("b1").is_some());
        assert_eq!(session.save_status(), SaveStatus::Edited);
    }

    #[test]
    fn test_retired_id_is_never_reused() {
        let mut session = session();
        insert(&mut session, "b1");

        session
            .apply(Mutation::RemoveBlock {
                block_id: "b1".into(),
            })
            .unwrap();

        let err = session
            .apply(Mutation::InsertBlock {
                section_id: "s1".into(),
                block: text_block("b1", "i9", "second life"),
                index: None,
            })
            .unwrap_err();
        assert_eq!(err, MutationError::DuplicateBlockId("b1".into()));
    }

    #[test]
    fn test_remove_section_retires_its_block_ids() {
        let mut session = session();
        insert(&mut session, "b1");

        session
            .apply(Mutation::RemoveSection {
                section_id: "s1".into(),
            })
            .unwrap();

        session
            .apply(Mutation::InsertSection {
                section: Section::new("s1b", "Environment again"),
                index: None,
            })
            .unwrap();

        let err = session
            .apply(Mutation::InsertBlock {
                section_id: "s1b".into(),
                block: text_block("b1", "i9", "back again"),
                index: None,
            })
            .unwrap_err();
        assert_eq!(err, MutationError::DuplicateBlockId("b1".into()));
    }

    #[test]
    fn test_structural_error_leaves_history_and_status_untouched() {
        let mut session = session();

        let err = session
            .apply(Mutation::RemoveBlock {
                block_id: "missing".into(),
            })
            .unwrap_err();

        assert_eq!(err, MutationError::BlockNotFound("missing".into()));
        assert!(!session.can_undo());
        assert_eq!(session.save_status(), SaveStatus::Idle);
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn test_selection_creates_no_history_entry() {
        let mut session = session();

        session.set_selection(Some(Selection {
            section_id: "s1".into(),
            block_id: None,
            range: None,
        }));

        assert!(!session.can_undo());
        assert!(!session.dirty());
        assert_eq!(session.save_status(), SaveStatus::Idle);
        assert_eq!(session.selection().unwrap().section_id, "s1");
    }

    #[test]
    fn test_events_are_pushed_on_every_transition() {
        let mut session = session();
        let mut events = session.subscribe();

        insert(&mut session, "b1");
        session.set_selection(Some(Selection {
            section_id: "s1".into(),
            block_id: Some("b1".into()),
            range: Some(TextRange { start: 0, end: 4 }),
        }));

        assert_eq!(
            events.try_recv().unwrap(),
            EditorEvent::Document { version: 1 }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            EditorEvent::SaveStatus(SaveStatus::Edited)
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            EditorEvent::Selection(Some(_))
        ));
    }

    #[test]
    fn test_offline_folds_over_any_state() {
        let mut session = session();
        insert(&mut session, "b1");

        session.set_online(false);
        assert_eq!(session.save_status(), SaveStatus::Offline);

        // The base state survives the outage
        session.set_online(true);
        assert_eq!(session.save_status(), SaveStatus::Edited);
    }

    #[test]
    fn test_load_resets_session_state() {
        let mut session = session();
        insert(&mut session, "b1");
        let generation = session.generation();

        let mut replacement = Document::new_report("2000", "Other report");
        replacement.sections.push(Section::new("s9", "Intro"));
        session.load(replacement);

        assert_eq!(session.document_id(), "2000");
        assert_eq!(session.generation(), generation + 1);
        assert!(!session.can_undo());
        assert!(!session.dirty());
        assert_eq!(session.save_status(), SaveStatus::Idle);
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_duplicate_block_inserts_copy_after_original() {
        let mut session = session();
        insert(&mut session, "b1");

        let copy_id = session.duplicate_block("b1").unwrap();
        assert_ne!(copy_id, "b1");

        let blocks = &session.document().find_section("s1").unwrap().blocks;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, "b1");
        assert_eq!(blocks[1].id, copy_id);
        assert_eq!(blocks[0].plain_text(), blocks[1].plain_text());

        // One history entry: a single undo removes the copy
        assert!(session.undo());
        assert_eq!(
            session.document().find_section("s1").unwrap().blocks.len(),
            1
        );
    }

    #[test]
    fn test_next_node_id_skips_live_ids() {
        let mut session = session();
        let id = session.next_node_id();
        insert(&mut session, &id);

        let next = session.next_node_id();
        assert_ne!(id, next);
        assert!(!session.document().contains_block_id(&next));
    }
}
