//! AI-assist wire contract
//!
//! Two request/response pairs: framework mapping (text → ranked standard
//! matches) and content expansion (text → rewritten text). Transport and
//! auth belong to the embedding application; this core depends only on
//! the shapes.

use esgdoc_model::Framework;
use serde::{Deserialize, Serialize};

fn default_top_k() -> u32 {
    5
}

fn default_min_confidence() -> f64 {
    0.5
}

/// Framework-mapping request against one block's extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgMappingRequest {
    pub text: String,
    pub document_id: i64,
    pub block_id: String,
    /// Frameworks to search; `None` searches all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frameworks: Option<Vec<Framework>>,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    pub language: String,
}

/// One matched disclosure standard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMatch {
    /// e.g. "GRI 305-1"
    pub standard_id: String,
    pub framework: Framework,
    /// E, S, G, GENERAL or OTHER
    pub category: String,
    pub topic: String,
    pub title: String,
    pub description: String,
    /// 0.0..=1.0
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgMappingResponse {
    pub suggestions: Vec<StandardMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    #[default]
    Expand,
    Rewrite,
    Summarize,
    Formalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentTone {
    #[default]
    Professional,
    Casual,
    Technical,
}

/// Content-expansion request against one block's extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentExpansionRequest {
    pub text: String,
    pub document_id: i64,
    pub block_id: String,
    #[serde(default)]
    pub mode: ExpansionMode,
    #[serde(default)]
    pub tone: ContentTone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_length: Option<u32>,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Addition,
    Deletion,
    Modification,
}

/// One edit inside the suggested text, relative to the original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub start: usize,
    pub end: usize,
    pub original: String,
    pub suggested: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentExpansionResponse {
    pub original: String,
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<ContentChange>,
    pub explanation: String,
}
