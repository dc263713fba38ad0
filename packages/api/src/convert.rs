//! # Converter
//!
//! Bidirectional mapping between server document records and the internal
//! tree. Both directions are total: missing optional fields get empty
//! defaults on the way in, and wire variants this core does not recognize
//! are preserved as the opaque `Unknown` block so round-tripping never
//! loses author content.
//!
//! For every field both schemas share, `to_external(to_internal(x))`
//! reproduces `x`.

use crate::schema::{
    ApiBlock, ApiDocument, ApiDocumentUpdate, ApiInline, ApiListItem, ApiSection,
    ApiSectionUpdate,
};
use esgdoc_model::{
    Block, BlockPayload, Document, DocumentMeta, DocumentStatus, EsgMetricPayload, IdGenerator,
    ImagePayload, Inline, ListItem, PageSetup, Section, TextMark, TextRole,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Coerce an internal string id back to its wire form.
///
/// Ids that originated from a numeric wire id parse back exactly; locally
/// generated ids export as 0, the backend's "unassigned" marker.
pub fn wire_id(internal: &str) -> i64 {
    internal.parse().unwrap_or(0)
}

/// Map a fetched server document into the internal tree
pub fn to_internal(api: &ApiDocument) -> Document {
    let id = api.id.to_string();
    // Deterministic: the same wire document always yields the same
    // revision id within a session
    let revision_id = IdGenerator::for_document(&id).next_id();

    Document {
        title: api.title.clone(),
        meta: DocumentMeta {
            version: 1,
            revision_id,
            status: DocumentStatus::Draft,
            author_id: api.user_id.map(|u| u.to_string()).unwrap_or_default(),
            language: "ko".to_string(),
            created_at: api.created_at.clone(),
            updated_at: api.updated_at.clone(),
            tags: Vec::new(),
        },
        page_setup: PageSetup::default(),
        sections: api.sections.iter().map(section_to_internal).collect(),
        id,
    }
}

fn section_to_internal(api: &ApiSection) -> Section {
    Section {
        id: api.id.to_string(),
        title: api.title.clone(),
        description: api.description.clone(),
        blocks: api.blocks.iter().map(block_to_internal).collect(),
        standard_refs: api.gri_reference.clone(),
        metadata: api.metadata.clone(),
    }
}

/// Map one block record into the internal envelope.
///
/// Any record whose payload does not match its declared variant's shape
/// is carried as `Unknown` with the raw fields verbatim, never coerced.
pub fn block_to_internal(api: &ApiBlock) -> Block {
    let mut attributes = api.attributes.clone();

    let payload = match api.block_type.as_str() {
        "paragraph" => match parse_inlines(&api.content) {
            Some(content) => BlockPayload::Text {
                role: TextRole::Paragraph,
                content,
            },
            None => unknown_payload(api),
        },
        "quote" => match parse_inlines(&api.content) {
            Some(content) => BlockPayload::Text {
                role: TextRole::Quote,
                content,
            },
            None => unknown_payload(api),
        },
        "heading" => match parse_inlines(&api.content) {
            Some(content) => {
                // The wire carries the level inside the attribute map;
                // lift it into the typed payload and drop the raw entry
                let level = attributes
                    .remove("level")
                    .and_then(|v| v.as_u64())
                    .map(|l| l as u8)
                    .unwrap_or(2);
                BlockPayload::Heading { level, content }
            }
            None => unknown_payload(api),
        },
        "list" => match parse_list_items(&api.children) {
            Some(items) => BlockPayload::List { items },
            None => unknown_payload(api),
        },
        "image" => match api
            .data
            .clone()
            .and_then(|d| serde_json::from_value::<ImagePayload>(d).ok())
        {
            Some(image) => BlockPayload::Image(image),
            None => unknown_payload(api),
        },
        "table" => match split_captioned_data(&api.data) {
            Some((data, caption)) => BlockPayload::Table { data, caption },
            None => unknown_payload(api),
        },
        "chart" => match split_captioned_data(&api.data) {
            Some((data, caption)) => BlockPayload::Chart { data, caption },
            None => unknown_payload(api),
        },
        "esgMetric" => match api
            .data
            .clone()
            .and_then(|d| serde_json::from_value::<EsgMetricPayload>(d).ok())
        {
            Some(metric) => BlockPayload::EsgMetric(metric),
            None => unknown_payload(api),
        },
        other => {
            debug!(block_type = other, block_id = %api.id, "preserving unrecognized block variant");
            unknown_payload(api)
        }
    };

    // A payload downgraded to Unknown keeps its raw attributes untouched
    let attributes = if payload.kind() == esgdoc_model::BlockKind::Unknown {
        api.attributes.clone()
    } else {
        attributes
    };

    Block {
        id: api.id.clone(),
        payload,
        attributes,
    }
}

fn unknown_payload(api: &ApiBlock) -> BlockPayload {
    BlockPayload::Unknown {
        block_type: api.block_type.clone(),
        content: api.content.clone(),
        data: api.data.clone(),
        children: api.children.clone(),
    }
}

/// Parse a raw `content` field into inline spans. Absent content is an
/// empty sequence; present-but-malformed content is `None` so the caller
/// can fall back to `Unknown`.
fn parse_inlines(content: &Option<Value>) -> Option<Vec<Inline>> {
    match content {
        None => Some(Vec::new()),
        Some(value) => serde_json::from_value::<Vec<ApiInline>>(value.clone())
            .ok()
            .map(|records| records.iter().map(inline_to_internal).collect()),
    }
}

fn inline_to_internal(api: &ApiInline) -> Inline {
    let marks = api
        .marks
        .iter()
        .filter_map(|name| {
            let mark = TextMark::parse(name);
            if mark.is_none() {
                warn!(mark = %name, inline_id = %api.id, "skipping unrecognized text mark");
            }
            mark
        })
        .collect();

    Inline {
        id: api.id.clone(),
        text: api.text.clone(),
        marks,
        link: api.link.clone(),
        annotation: api.annotation.clone(),
    }
}

fn parse_list_items(children: &Option<Value>) -> Option<Vec<ListItem>> {
    let value = children.clone()?;
    let records = serde_json::from_value::<Vec<ApiListItem>>(value).ok()?;
    Some(records.iter().map(list_item_to_internal).collect())
}

fn list_item_to_internal(api: &ApiListItem) -> ListItem {
    ListItem {
        id: api.id.clone(),
        content: api.content.iter().map(inline_to_internal).collect(),
        children: api
            .children
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(list_item_to_internal)
            .collect(),
    }
}

/// Split a table/chart `data` object into its payload and lifted caption
fn split_captioned_data(data: &Option<Value>) -> Option<(Value, Option<String>)> {
    let mut value = data.clone()?;
    let map = value.as_object_mut()?;

    let caption = match map.get("caption") {
        Some(Value::String(text)) => {
            let text = text.clone();
            map.remove("caption");
            Some(text)
        }
        _ => None,
    };

    Some((value, caption))
}

/// Map the internal tree back to the server record shape
pub fn to_external(doc: &Document) -> ApiDocument {
    let document_id = wire_id(&doc.id);

    ApiDocument {
        id: document_id,
        user_id: doc.meta.author_id.parse().ok(),
        title: doc.title.clone(),
        description: None,
        is_public: false,
        is_template: false,
        sections: doc
            .sections
            .iter()
            .enumerate()
            .map(|(index, section)| section_to_external(section, index, document_id))
            .collect(),
        created_at: doc.meta.created_at.clone(),
        updated_at: doc.meta.updated_at.clone(),
    }
}

fn section_to_external(section: &Section, index: usize, document_id: i64) -> ApiSection {
    ApiSection {
        id: wire_id(&section.id),
        document_id,
        title: section.title.clone(),
        description: section.description.clone(),
        order: index as i64,
        blocks: section.blocks.iter().map(block_to_external).collect(),
        gri_reference: section.standard_refs.clone(),
        metadata: section.metadata.clone(),
        created_at: None,
        updated_at: None,
    }
}

/// Map one internal block back to its wire record
pub fn block_to_external(block: &Block) -> ApiBlock {
    let mut attributes = block.attributes.clone();

    let (block_type, content, data, children) = match &block.payload {
        BlockPayload::Text {
            role: TextRole::Paragraph,
            content,
        } => ("paragraph".to_string(), Some(inlines_to_external(content)), None, None),
        BlockPayload::Text {
            role: TextRole::Quote,
            content,
        } => ("quote".to_string(), Some(inlines_to_external(content)), None, None),
        BlockPayload::Heading { level, content } => {
            attributes.insert("level".to_string(), Value::from(*level));
            ("heading".to_string(), Some(inlines_to_external(content)), None, None)
        }
        BlockPayload::List { items } => {
            let records: Vec<ApiListItem> = items.iter().map(list_item_to_external).collect();
            ("list".to_string(), None, None, Some(value_of(&records)))
        }
        BlockPayload::Image(image) => ("image".to_string(), None, Some(value_of(image)), None),
        BlockPayload::Table { data, caption } => (
            "table".to_string(),
            None,
            Some(rejoin_captioned_data(data, caption)),
            None,
        ),
        BlockPayload::Chart { data, caption } => (
            "chart".to_string(),
            None,
            Some(rejoin_captioned_data(data, caption)),
            None,
        ),
        BlockPayload::EsgMetric(metric) => {
            ("esgMetric".to_string(), None, Some(value_of(metric)), None)
        }
        BlockPayload::Unknown {
            block_type,
            content,
            data,
            children,
        } => (
            block_type.clone(),
            content.clone(),
            data.clone(),
            children.clone(),
        ),
    };

    ApiBlock {
        id: block.id.clone(),
        block_type,
        attributes,
        content,
        data,
        children,
    }
}

fn inlines_to_external(content: &[Inline]) -> Value {
    let records: Vec<ApiInline> = content.iter().map(inline_to_external).collect();
    value_of(&records)
}

fn inline_to_external(inline: &Inline) -> ApiInline {
    ApiInline {
        id: inline.id.clone(),
        node_type: "inline".to_string(),
        text: inline.text.clone(),
        marks: inline.marks.iter().map(|m| m.as_str().to_string()).collect(),
        link: inline.link.clone(),
        annotation: inline.annotation.clone(),
    }
}

fn list_item_to_external(item: &ListItem) -> ApiListItem {
    ApiListItem {
        id: item.id.clone(),
        content: item.content.iter().map(inline_to_external).collect(),
        children: if item.children.is_empty() {
            None
        } else {
            Some(item.children.iter().map(list_item_to_external).collect())
        },
    }
}

fn rejoin_captioned_data(data: &Value, caption: &Option<String>) -> Value {
    let mut value = data.clone();
    if let (Value::Object(map), Some(text)) = (&mut value, caption) {
        map.insert("caption".to_string(), Value::String(text.clone()));
    }
    value
}

// Serialization of our own record types cannot fail; Null would only
// appear if that invariant broke
fn value_of<T: serde::Serialize>(record: &T) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// Build the bulk-save payload, ordering sections by position
pub fn to_update_request(doc: &Document) -> ApiDocumentUpdate {
    ApiDocumentUpdate {
        title: doc.title.clone(),
        sections: doc
            .sections
            .iter()
            .enumerate()
            .map(|(index, section)| ApiSectionUpdate {
                title: section.title.clone(),
                description: section.description.clone(),
                order: index as i64,
                blocks: section.blocks.iter().map(block_to_external).collect(),
                gri_reference: section.standard_refs.clone(),
                metadata: section.metadata.clone(),
            })
            .collect(),
    }
}
