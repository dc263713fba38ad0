//! End-to-end editing scenarios
//!
//! This tests:
//! - Insert → undo → redo round trips
//! - Save-status transitions against a mock persistence backend
//! - Dirty tracking across save points
//! - Opening a session from a fetched server document

use async_trait::async_trait;
use esgdoc_api::{ApiDocument, ApiDocumentUpdate};
use esgdoc_editor::{
    Block, BlockPayload, EditorConfig, EditorEvent, EditorSession, Inline, Mutation, PersistError,
    PersistenceClient, SaveStatus, Section,
};
use esgdoc_model::{Document, TextRole};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Copy)]
enum SaveBehavior {
    Succeed,
    Reject,
    Offline,
}

struct MockStore {
    document: ApiDocument,
    behavior: Mutex<SaveBehavior>,
    saves: AtomicUsize,
}

impl MockStore {
    fn new() -> Self {
        Self {
            document: server_fixture(),
            behavior: Mutex::new(SaveBehavior::Succeed),
            saves: AtomicUsize::new(0),
        }
    }

    fn set_behavior(&self, behavior: SaveBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }
}

#[async_trait]
impl PersistenceClient for MockStore {
    async fn fetch_document(&self, id: i64) -> Result<ApiDocument, PersistError> {
        if self.document.id == id {
            Ok(self.document.clone())
        } else {
            Err(PersistError::NotFound(id))
        }
    }

    async fn save_document(
        &self,
        _id: i64,
        _update: &ApiDocumentUpdate,
    ) -> Result<(), PersistError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        match *self.behavior.lock().unwrap() {
            SaveBehavior::Succeed => Ok(()),
            SaveBehavior::Reject => Err(PersistError::Rejected("validation failed".into())),
            SaveBehavior::Offline => Err(PersistError::Offline),
        }
    }
}

fn server_fixture() -> ApiDocument {
    serde_json::from_value(json!({
        "id": 1042,
        "user_id": 7,
        "title": "FY2024 Sustainability Report",
        "sections": [
            {
                "id": 11,
                "document_id": 1042,
                "title": "Environment",
                "order": 0,
                "blocks": [{
                    "id": "b0",
                    "blockType": "paragraph",
                    "content": [{"id": "i0", "type": "inline", "text": "Baseline disclosure."}]
                }]
            }
        ],
        "created_at": "2024-03-02T09:00:00Z",
        "updated_at": "2024-06-18T17:30:00Z",
    }))
    .unwrap()
}

fn text_block(id: &str, text: &str) -> Block {
    Block::new(
        id,
        BlockPayload::Text {
            role: TextRole::Paragraph,
            content: vec![Inline::text(format!("{}-i", id), text)],
        },
    )
}

fn empty_session() -> EditorSession {
    let mut doc = Document::new_report("1042", "Report");
    doc.sections.push(Section::new("s1", "Environment"));
    EditorSession::new(doc, EditorConfig::default())
}

fn insert(session: &mut EditorSession, id: &str) {
    session
        .apply(Mutation::InsertBlock {
            section_id: "s1".into(),
            block: text_block(id, "emissions fell 12% year over year"),
            index: None,
        })
        .unwrap();
}

fn drain_statuses(events: &mut tokio::sync::broadcast::Receiver<EditorEvent>) -> Vec<SaveStatus> {
    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EditorEvent::SaveStatus(status) = event {
            statuses.push(status);
        }
    }
    statuses
}

#[test]
fn test_insert_then_undo_then_redo() {
    let mut session = empty_session();

    insert(&mut session, "b1");
    assert_eq!(session.document().find_section("s1").unwrap().blocks.len(), 1);

    assert!(session.undo());
    assert_eq!(session.document().find_section("s1").unwrap().blocks.len(), 0);

    assert!(session.redo());
    let blocks = &session.document().find_section("s1").unwrap().blocks;
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, "b1");
}

#[test]
fn test_fresh_edit_invalidates_redo() {
    let mut session = empty_session();

    insert(&mut session, "b1");
    assert!(session.undo());
    assert!(session.can_redo());

    insert(&mut session, "b2");
    assert!(!session.can_redo());
    assert!(!session.redo());
    assert!(session.document().find_block("b2").is_some());
    assert!(session.document().find_block("b1").is_none());
}

#[tokio::test]
async fn test_save_status_transition_sequence() {
    let store = MockStore::new();
    let mut session = empty_session();
    let mut events = session.subscribe();

    assert_eq!(session.save_status(), SaveStatus::Idle);

    insert(&mut session, "b1");
    let status = session.save(&store).await;

    assert_eq!(status, SaveStatus::Saved);
    assert!(!session.dirty());
    assert!(session.last_saved().is_some());
    assert_eq!(
        drain_statuses(&mut events),
        vec![SaveStatus::Edited, SaveStatus::Saving, SaveStatus::Saved]
    );
}

#[tokio::test]
async fn test_save_failure_keeps_content_and_is_retryable() {
    let store = MockStore::new();
    store.set_behavior(SaveBehavior::Reject);
    let mut session = empty_session();

    insert(&mut session, "b1");
    let status = session.save(&store).await;

    assert_eq!(status, SaveStatus::Error);
    assert!(session.dirty());
    assert!(session.document().find_block("b1").is_some());
    assert!(session.last_saved().is_none());

    // The same content saves cleanly once the backend recovers
    store.set_behavior(SaveBehavior::Succeed);
    let status = session.save(&store).await;
    assert_eq!(status, SaveStatus::Saved);
    assert!(!session.dirty());
    assert_eq!(store.saves.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_lost_connectivity_reports_offline_from_any_state() {
    let store = MockStore::new();
    store.set_behavior(SaveBehavior::Offline);
    let mut session = empty_session();

    insert(&mut session, "b1");
    let status = session.save(&store).await;

    assert_eq!(status, SaveStatus::Offline);
    assert!(session.dirty());

    // Reconnecting restores the underlying state machine
    session.set_online(true);
    assert_eq!(session.save_status(), SaveStatus::Edited);
}

#[tokio::test]
async fn test_undo_back_to_save_point_clears_dirty() {
    let store = MockStore::new();
    let mut session = empty_session();

    insert(&mut session, "b1");
    session.save(&store).await;
    assert!(!session.dirty());

    insert(&mut session, "b2");
    assert!(session.dirty());
    assert_eq!(session.save_status(), SaveStatus::Edited);

    // Undoing past the unsaved edit lands exactly on the saved snapshot
    assert!(session.undo());
    assert!(!session.dirty());
    assert_eq!(session.save_status(), SaveStatus::Saved);

    // Redoing past it makes the session dirty again
    assert!(session.redo());
    assert!(session.dirty());
    assert_eq!(session.save_status(), SaveStatus::Edited);
}

#[tokio::test]
async fn test_clean_session_skips_the_network() {
    let store = MockStore::new();
    let mut session = empty_session();

    let status = session.save(&store).await;
    assert_eq!(status, SaveStatus::Idle);
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_open_maps_server_document_through_converter() {
    let store = MockStore::new();

    let session = EditorSession::open(&store, 1042, EditorConfig::default())
        .await
        .unwrap();

    assert_eq!(session.document_id(), "1042");
    assert_eq!(session.document().title, "FY2024 Sustainability Report");
    assert_eq!(session.document().sections.len(), 1);
    assert!(session.document().find_block("b0").is_some());
    assert!(!session.dirty());

    let missing = EditorSession::open(&store, 9999, EditorConfig::default()).await;
    assert!(matches!(missing, Err(PersistError::NotFound(9999))));
}

#[tokio::test]
async fn test_saved_edit_round_trips_through_wire_shape() -> anyhow::Result<()> {
    let store = MockStore::new();
    let mut session = EditorSession::open(&store, 1042, EditorConfig::default()).await?;

    let block_id = session.next_node_id();
    let section_id = session.document().sections[0].id.clone();
    session.apply(Mutation::InsertBlock {
        section_id,
        block: text_block(&block_id, "Scope 2 market-based emissions held flat."),
        index: None,
    })?;

    let status = session.save(&store).await;
    assert_eq!(status, SaveStatus::Saved);

    // The update payload the store received reflects the edit
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    Ok(())
}
