//! Server document schema
//!
//! Record shapes as the persistence backend speaks them: numeric
//! document/section ids, string block ids, camelCase block fields next to
//! snake_case record fields. Exactly one of `content`/`data`/`children`
//! is populated per block depending on the variant family.

use esgdoc_model::{Annotation, Link, StandardRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn inline_node_type() -> String {
    "inline".to_string()
}

/// Inline record inside a text-bearing block's `content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInline {
    pub id: String,
    #[serde(rename = "type", default = "inline_node_type")]
    pub node_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

/// List entry record inside a list block's `children`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiListItem {
    pub id: String,
    pub content: Vec<ApiInline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ApiListItem>>,
}

/// Block record. `content`/`data`/`children` stay raw JSON here; the
/// converter interprets them per `blockType` and preserves shapes it does
/// not recognize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiBlock {
    pub id: String,
    #[serde(rename = "blockType")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    pub id: i64,
    #[serde(default)]
    pub document_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub blocks: Vec<ApiBlock>,
    #[serde(rename = "griReference", default, skip_serializing_if = "Vec::is_empty")]
    pub gri_reference: Vec<StandardRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub sections: Vec<ApiSection>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApiDocument {
    /// True when no section holds any block
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.blocks.is_empty())
    }
}

/// Bulk-update payload for PUT/PATCH. Section ids are omitted; the
/// backend reconciles sections by order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocumentUpdate {
    pub title: String,
    pub sections: Vec<ApiSectionUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSectionUpdate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: i64,
    pub blocks: Vec<ApiBlock>,
    #[serde(rename = "griReference", default, skip_serializing_if = "Vec::is_empty")]
    pub gri_reference: Vec<StandardRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}
