//! # Block Variant Model
//!
//! Blocks are the unit of report content. The variant set is closed and
//! discriminated: every payload shape is a `BlockPayload` arm, and every
//! site that inspects a payload matches exhaustively, so adding a variant
//! is a compile error at each consumer.
//!
//! Tree-level operations (insert, delete, move, duplicate) work on the
//! common `Block` envelope and never branch on the variant; the only
//! variant-aware code paths are plain-text extraction and payload shape
//! validation.

use crate::id_generator::IdGenerator;
use crate::inline::{plain_text, Inline};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Maximum list nesting depth accepted by validation
pub const MAX_LIST_DEPTH: usize = 6;

/// Discriminant for the closed block-variant set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Text,
    Heading,
    List,
    Image,
    Table,
    Chart,
    EsgMetric,
    Unknown,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Text => "text",
            BlockKind::Heading => "heading",
            BlockKind::List => "list",
            BlockKind::Image => "image",
            BlockKind::Table => "table",
            BlockKind::Chart => "chart",
            BlockKind::EsgMetric => "esgMetric",
            BlockKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Role a text block plays on the wire (`paragraph` vs `quote`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRole {
    Paragraph,
    Quote,
}

/// One list entry; items nest through `children`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    pub content: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ListItem>,
}

impl ListItem {
    pub fn new(id: impl Into<String>, content: Vec<Inline>) -> Self {
        Self {
            id: id.into(),
            content,
            children: Vec::new(),
        }
    }

    fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ListItem::depth)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Period value of a disclosure metric: numeric or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// How an ESG metric should be visualized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricDisplay {
    #[default]
    Table,
    Chart,
    Text,
}

/// Disclosure-metric payload: a standard code bound to per-period values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgMetricPayload {
    /// Standard code, e.g. "GRI 305-1"
    pub code: String,
    /// Period label → value, e.g. "FY2024" → 1042.5
    #[serde(default)]
    pub values: BTreeMap<String, MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub display: MetricDisplay,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
}

/// Variant-specific payloads
///
/// `Unknown` preserves wire variants this core does not understand; the
/// raw fields travel through untouched so round-tripping never loses
/// author content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockPayload {
    Text {
        role: TextRole,
        content: Vec<Inline>,
    },
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    List {
        items: Vec<ListItem>,
    },
    Image(ImagePayload),
    Table {
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Chart {
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    EsgMetric(EsgMetricPayload),
    Unknown {
        block_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        children: Option<Value>,
    },
}

/// Payload shape violation, reported as `InvalidBlockPayload` at the
/// mutation boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("heading level {0} out of range 1..=3")]
    HeadingLevelOutOfRange(u8),

    #[error("list nesting depth {depth} exceeds maximum {max}")]
    ListTooDeep { depth: usize, max: usize },

    #[error("{kind} data must be a JSON object")]
    DataNotAnObject { kind: BlockKind },
}

impl BlockPayload {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockPayload::Text { .. } => BlockKind::Text,
            BlockPayload::Heading { .. } => BlockKind::Heading,
            BlockPayload::List { .. } => BlockKind::List,
            BlockPayload::Image(_) => BlockKind::Image,
            BlockPayload::Table { .. } => BlockKind::Table,
            BlockPayload::Chart { .. } => BlockKind::Chart,
            BlockPayload::EsgMetric(_) => BlockKind::EsgMetric,
            BlockPayload::Unknown { .. } => BlockKind::Unknown,
        }
    }

    /// Check the payload against its variant's shape rules
    pub fn validate(&self) -> Result<(), PayloadError> {
        match self {
            BlockPayload::Text { .. } => Ok(()),
            BlockPayload::Heading { level, .. } => {
                if !(1..=3).contains(level) {
                    return Err(PayloadError::HeadingLevelOutOfRange(*level));
                }
                Ok(())
            }
            BlockPayload::List { items } => {
                let depth = items.iter().map(ListItem::depth).max().unwrap_or(0);
                if depth > MAX_LIST_DEPTH {
                    return Err(PayloadError::ListTooDeep {
                        depth,
                        max: MAX_LIST_DEPTH,
                    });
                }
                Ok(())
            }
            BlockPayload::Image(_) => Ok(()),
            BlockPayload::Table { data, .. } => {
                if !data.is_object() {
                    return Err(PayloadError::DataNotAnObject {
                        kind: BlockKind::Table,
                    });
                }
                Ok(())
            }
            BlockPayload::Chart { data, .. } => {
                if !data.is_object() {
                    return Err(PayloadError::DataNotAnObject {
                        kind: BlockKind::Chart,
                    });
                }
                Ok(())
            }
            BlockPayload::EsgMetric(_) => Ok(()),
            // Opaque by definition; nothing to check
            BlockPayload::Unknown { .. } => Ok(()),
        }
    }
}

/// A single content unit within a section.
///
/// The envelope is variant-agnostic: a stable id (unique across the whole
/// document and never reused within a session), the payload, and a
/// free-form attribute map carrying styling/layout hints opaque to this
/// core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub payload: BlockPayload,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Block {
    pub fn new(id: impl Into<String>, payload: BlockPayload) -> Self {
        Self {
            id: id.into(),
            payload,
            attributes: BTreeMap::new(),
        }
    }

    /// Create an empty block of the given kind with safe defaults
    pub fn empty(kind: BlockKind, ids: &mut IdGenerator) -> Self {
        let id = ids.next_id();
        let payload = match kind {
            BlockKind::Text => BlockPayload::Text {
                role: TextRole::Paragraph,
                content: vec![Inline::text(ids.next_id(), "")],
            },
            BlockKind::Heading => BlockPayload::Heading {
                level: 2,
                content: vec![Inline::text(ids.next_id(), "")],
            },
            BlockKind::List => BlockPayload::List {
                items: vec![ListItem::new(
                    ids.next_id(),
                    vec![Inline::text(ids.next_id(), "")],
                )],
            },
            BlockKind::Image => BlockPayload::Image(ImagePayload {
                src: String::new(),
                alt: None,
                caption: None,
            }),
            BlockKind::Table => BlockPayload::Table {
                data: serde_json::json!({
                    "rows": 2,
                    "cols": 2,
                    "cells": [["", ""], ["", ""]],
                }),
                caption: None,
            },
            BlockKind::Chart => BlockPayload::Chart {
                data: serde_json::json!({
                    "type": "bar",
                    "data": [],
                    "options": {},
                }),
                caption: None,
            },
            BlockKind::EsgMetric => BlockPayload::EsgMetric(EsgMetricPayload {
                code: String::new(),
                values: BTreeMap::new(),
                unit: None,
                display: MetricDisplay::Table,
                citations: Vec::new(),
            }),
            BlockKind::Unknown => BlockPayload::Unknown {
                block_type: "unknown".to_string(),
                content: None,
                data: None,
                children: None,
            },
        };
        Self::new(id, payload)
    }

    pub fn kind(&self) -> BlockKind {
        self.payload.kind()
    }

    pub fn validate(&self) -> Result<(), PayloadError> {
        self.payload.validate()
    }

    /// Extract the block's plain text via the inline-concatenation rule.
    ///
    /// `None` for variants that carry no inline text.
    pub fn plain_text(&self) -> Option<String> {
        match &self.payload {
            BlockPayload::Text { content, .. } | BlockPayload::Heading { content, .. } => {
                Some(plain_text(content))
            }
            BlockPayload::List { items } => {
                let mut lines = Vec::new();
                collect_item_text(items, &mut lines);
                Some(lines.join("\n"))
            }
            BlockPayload::Image(_)
            | BlockPayload::Table { .. }
            | BlockPayload::Chart { .. }
            | BlockPayload::EsgMetric(_)
            | BlockPayload::Unknown { .. } => None,
        }
    }

    /// Copy of the block under fresh ids: the envelope, every inline
    /// span, and every list item. Payload content and attributes are
    /// carried over unchanged.
    pub fn duplicated(&self, ids: &mut IdGenerator) -> Block {
        let mut copy = self.clone();
        copy.id = ids.next_id();
        match &mut copy.payload {
            BlockPayload::Text { content, .. } | BlockPayload::Heading { content, .. } => {
                for inline in content {
                    inline.id = ids.next_id();
                }
            }
            BlockPayload::List { items } => refresh_item_ids(items, ids),
            BlockPayload::Image(_)
            | BlockPayload::Table { .. }
            | BlockPayload::Chart { .. }
            | BlockPayload::EsgMetric(_)
            | BlockPayload::Unknown { .. } => {}
        }
        copy
    }

    /// True when the block holds an inline span with this id
    pub fn has_inline(&self, inline_id: &str) -> bool {
        match &self.payload {
            BlockPayload::Text { content, .. } | BlockPayload::Heading { content, .. } => {
                content.iter().any(|i| i.id == inline_id)
            }
            BlockPayload::List { items } => items_have_inline(items, inline_id),
            BlockPayload::Image(_)
            | BlockPayload::Table { .. }
            | BlockPayload::Chart { .. }
            | BlockPayload::EsgMetric(_)
            | BlockPayload::Unknown { .. } => false,
        }
    }

    /// Find an inline span by id, searching text content and list items
    pub fn find_inline_mut(&mut self, inline_id: &str) -> Option<&mut Inline> {
        match &mut self.payload {
            BlockPayload::Text { content, .. } | BlockPayload::Heading { content, .. } => {
                content.iter_mut().find(|i| i.id == inline_id)
            }
            BlockPayload::List { items } => find_inline_in_items(items, inline_id),
            BlockPayload::Image(_)
            | BlockPayload::Table { .. }
            | BlockPayload::Chart { .. }
            | BlockPayload::EsgMetric(_)
            | BlockPayload::Unknown { .. } => None,
        }
    }
}

fn collect_item_text(items: &[ListItem], out: &mut Vec<String>) {
    for item in items {
        out.push(plain_text(&item.content));
        collect_item_text(&item.children, out);
    }
}

fn refresh_item_ids(items: &mut [ListItem], ids: &mut IdGenerator) {
    for item in items {
        item.id = ids.next_id();
        for inline in &mut item.content {
            inline.id = ids.next_id();
        }
        refresh_item_ids(&mut item.children, ids);
    }
}

fn items_have_inline(items: &[ListItem], inline_id: &str) -> bool {
    items.iter().any(|item| {
        item.content.iter().any(|i| i.id == inline_id) || items_have_inline(&item.children, inline_id)
    })
}

fn find_inline_in_items<'a>(items: &'a mut [ListItem], inline_id: &str) -> Option<&'a mut Inline> {
    for item in items {
        if let Some(pos) = item.content.iter().position(|i| i.id == inline_id) {
            return Some(&mut item.content[pos]);
        }
        if let Some(found) = find_inline_in_items(&mut item.children, inline_id) {
            return Some(found);
        }
    }
    None
}
