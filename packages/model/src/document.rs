//! # Document Tree Model
//!
//! Document → Section → Block → Inline. Sections are ordered and the
//! order is the rendering/export order; block ids are unique across the
//! whole document, not just within a section.

use crate::block::Block;
use crate::id_generator::IdGenerator;
use crate::inline::Inline;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Disclosure framework a standard reference belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "GRI")]
    Gri,
    #[serde(rename = "SASB")]
    Sasb,
    #[serde(rename = "TCFD")]
    Tcfd,
    #[serde(rename = "ISO26000")]
    Iso26000,
    #[serde(rename = "ESRS")]
    Esrs,
}

/// Reference into a disclosure framework, e.g. GRI 305-1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRef {
    pub code: Vec<String>,
    pub framework: Framework,
}

/// One report chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standard_refs: Vec<StandardRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            blocks: Vec::new(),
            standard_refs: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn untitled(ids: &mut IdGenerator) -> Self {
        Self::new(ids.next_id(), "New Section")
    }

    pub fn find_block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Review,
    Final,
}

/// Document-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub version: u32,
    pub revision_id: String,
    pub status: DocumentStatus,
    pub author_id: String,
    pub language: String,
    /// ISO-8601, carried verbatim from the server record
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum PaperFormat {
    A4,
    Letter,
    A3,
    Custom { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Page margins in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            bottom: 20.0,
            left: 20.0,
            right: 20.0,
        }
    }
}

/// Print/PDF layout configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    #[serde(flatten)]
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub margin: Margins,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            orientation: Orientation::Portrait,
            margin: Margins::default(),
        }
    }
}

/// Root of the report tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub meta: DocumentMeta,
    pub page_setup: PageSetup,
    pub sections: Vec<Section>,
}

impl Document {
    /// Fresh draft report with default page setup and no sections
    pub fn new_report(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        let now = chrono::Utc::now().to_rfc3339();
        let revision_id = IdGenerator::for_document(&id).next_id();
        Self {
            id,
            title: title.into(),
            meta: DocumentMeta {
                version: 1,
                revision_id,
                status: DocumentStatus::Draft,
                author_id: String::new(),
                language: "ko".to_string(),
                created_at: now.clone(),
                updated_at: now,
                tags: Vec::new(),
            },
            page_setup: PageSetup::default(),
            sections: Vec::new(),
        }
    }

    pub fn find_section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn find_section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    pub fn find_block(&self, block_id: &str) -> Option<&Block> {
        self.sections
            .iter()
            .find_map(|s| s.blocks.iter().find(|b| b.id == block_id))
    }

    pub fn find_block_mut(&mut self, block_id: &str) -> Option<&mut Block> {
        self.sections
            .iter_mut()
            .find_map(|s| s.blocks.iter_mut().find(|b| b.id == block_id))
    }

    /// Locate a block as (section index, block index)
    pub fn position_of_block(&self, block_id: &str) -> Option<(usize, usize)> {
        self.sections.iter().enumerate().find_map(|(si, s)| {
            s.blocks
                .iter()
                .position(|b| b.id == block_id)
                .map(|bi| (si, bi))
        })
    }

    pub fn contains_block_id(&self, block_id: &str) -> bool {
        self.position_of_block(block_id).is_some()
    }

    pub fn find_inline_mut(&mut self, inline_id: &str) -> Option<&mut Inline> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.blocks.iter_mut())
            .find_map(|b| b.find_inline_mut(inline_id))
    }

    /// True when no section holds any block
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.blocks.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, BlockPayload, TextRole};

    fn sample() -> Document {
        let mut doc = Document::new_report("1042", "FY2024 Sustainability Report");
        let mut s1 = Section::new("s1", "Environment");
        s1.blocks.push(Block::new(
            "b1",
            BlockPayload::Text {
                role: TextRole::Paragraph,
                content: vec![Inline::text("i1", "emissions overview")],
            },
        ));
        let s2 = Section::new("s2", "Governance");
        doc.sections.push(s1);
        doc.sections.push(s2);
        doc
    }

    #[test]
    fn test_lookups_report_absence_as_none() {
        let doc = sample();

        assert!(doc.find_section("s1").is_some());
        assert!(doc.find_section("s9").is_none());
        assert!(doc.find_block("b1").is_some());
        assert!(doc.find_block("b9").is_none());
        assert_eq!(doc.position_of_block("b1"), Some((0, 0)));
    }

    #[test]
    fn test_block_ids_are_document_scoped() {
        let doc = sample();

        // b1 lives in s1, but the document-level lookup finds it without
        // knowing the owning section
        assert!(doc.contains_block_id("b1"));
        assert_eq!(doc.find_section("s2").unwrap().find_block("b1"), None);
    }

    #[test]
    fn test_new_report_defaults() {
        let doc = Document::new_report("7", "Draft");

        assert_eq!(doc.meta.status, DocumentStatus::Draft);
        assert_eq!(doc.meta.version, 1);
        assert!(!doc.meta.revision_id.is_empty());
        assert_eq!(doc.page_setup.format, PaperFormat::A4);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_is_empty_ignores_blockless_sections() {
        let mut doc = Document::new_report("7", "Draft");
        doc.sections.push(Section::new("s1", "Empty chapter"));
        assert!(doc.is_empty());

        let mut ids = IdGenerator::for_document("7");
        let block = Block::empty(BlockKind::Text, &mut ids);
        doc.sections[0].blocks.push(block);
        assert!(!doc.is_empty());
    }
}
