//! # Tree Mutations
//!
//! Semantic operations on the report tree.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each mutation represents one editing intent
//! 2. **Validated**: structural constraints are checked before anything
//!    moves; a failed mutation leaves the tree unchanged
//! 3. **Variant-agnostic**: insert/delete/move work on the block envelope
//!    and never branch on the payload shape
//!
//! ## Mutation Semantics
//!
//! ### InsertBlock
//! - Appends or inserts at a clamped index
//! - Fails if the block id already exists anywhere in the document
//!   (ids are document-scoped, not section-scoped)
//!
//! ### MoveBlock
//! - Atomic relocation across sections; identity and content unchanged
//!
//! ### UpdateBlockPayload
//! - Variant-preserving partial update; a patch for a different variant
//!   fails with `VariantMismatch`
//!
//! ### ApplyMark / RemoveMark
//! - Idempotent: applying a present mark or removing an absent one is a
//!   no-op, not an error

use esgdoc_model::{
    Block, BlockKind, BlockPayload, Document, Inline, ListItem, MetricDisplay, MetricValue,
    PayloadError, Section, TextMark, TextRole,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("section not found: {0}")]
    SectionNotFound(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("inline not found: {0}")]
    InlineNotFound(String),

    #[error("duplicate section id: {0}")]
    DuplicateSectionId(String),

    #[error("duplicate block id: {0}")]
    DuplicateBlockId(String),

    #[error("invalid block payload: {0}")]
    InvalidBlockPayload(#[from] PayloadError),

    #[error("variant mismatch: block is {found}, patch targets {expected}")]
    VariantMismatch {
        expected: BlockKind,
        found: BlockKind,
    },
}

/// Variant-preserving partial payload update. Fields left as `None` keep
/// the block's current value. Unknown blocks are opaque and cannot be
/// patched; they can only be moved, attribute-edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockPatch {
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<TextRole>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Vec<Inline>>,
    },
    Heading {
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Vec<Inline>>,
    },
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        items: Option<Vec<ListItem>>,
    },
    Image {
        #[serde(skip_serializing_if = "Option::is_none")]
        src: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Table {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Chart {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    EsgMetric {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        values: Option<BTreeMap<String, MetricValue>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        display: Option<MetricDisplay>,
        #[serde(skip_serializing_if = "Option::is_none")]
        citations: Option<Vec<String>>,
    },
}

impl BlockPatch {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockPatch::Text { .. } => BlockKind::Text,
            BlockPatch::Heading { .. } => BlockKind::Heading,
            BlockPatch::List { .. } => BlockKind::List,
            BlockPatch::Image { .. } => BlockKind::Image,
            BlockPatch::Table { .. } => BlockKind::Table,
            BlockPatch::Chart { .. } => BlockKind::Chart,
            BlockPatch::EsgMetric { .. } => BlockKind::EsgMetric,
        }
    }

    /// Compute the patched payload without touching the block. Shape
    /// violations in the result are reported before anything is written.
    fn patched(&self, current: &BlockPayload) -> Result<BlockPayload, MutationError> {
        let next = match (current, self) {
            (
                BlockPayload::Text { role, content },
                BlockPatch::Text {
                    role: new_role,
                    content: new_content,
                },
            ) => BlockPayload::Text {
                role: new_role.unwrap_or(*role),
                content: new_content.clone().unwrap_or_else(|| content.clone()),
            },
            (
                BlockPayload::Heading { level, content },
                BlockPatch::Heading {
                    level: new_level,
                    content: new_content,
                },
            ) => BlockPayload::Heading {
                level: new_level.unwrap_or(*level),
                content: new_content.clone().unwrap_or_else(|| content.clone()),
            },
            (BlockPayload::List { items }, BlockPatch::List { items: new_items }) => {
                BlockPayload::List {
                    items: new_items.clone().unwrap_or_else(|| items.clone()),
                }
            }
            (BlockPayload::Image(image), BlockPatch::Image { src, alt, caption }) => {
                let mut image = image.clone();
                if let Some(src) = src {
                    image.src = src.clone();
                }
                if let Some(alt) = alt {
                    image.alt = Some(alt.clone());
                }
                if let Some(caption) = caption {
                    image.caption = Some(caption.clone());
                }
                BlockPayload::Image(image)
            }
            (
                BlockPayload::Table { data, caption },
                BlockPatch::Table {
                    data: new_data,
                    caption: new_caption,
                },
            ) => BlockPayload::Table {
                data: new_data.clone().unwrap_or_else(|| data.clone()),
                caption: new_caption.clone().or_else(|| caption.clone()),
            },
            (
                BlockPayload::Chart { data, caption },
                BlockPatch::Chart {
                    data: new_data,
                    caption: new_caption,
                },
            ) => BlockPayload::Chart {
                data: new_data.clone().unwrap_or_else(|| data.clone()),
                caption: new_caption.clone().or_else(|| caption.clone()),
            },
            (
                BlockPayload::EsgMetric(metric),
                BlockPatch::EsgMetric {
                    code,
                    values,
                    unit,
                    display,
                    citations,
                },
            ) => {
                let mut metric = metric.clone();
                if let Some(code) = code {
                    metric.code = code.clone();
                }
                if let Some(values) = values {
                    metric.values = values.clone();
                }
                if let Some(unit) = unit {
                    metric.unit = Some(unit.clone());
                }
                if let Some(display) = display {
                    metric.display = *display;
                }
                if let Some(citations) = citations {
                    metric.citations = citations.clone();
                }
                BlockPayload::EsgMetric(metric)
            }
            (current, patch) => {
                return Err(MutationError::VariantMismatch {
                    expected: patch.kind(),
                    found: current.kind(),
                })
            }
        };

        next.validate()?;
        Ok(next)
    }
}

/// Semantic mutations (intent-preserving operations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a section at index (or append)
    InsertSection {
        section: Section,
        index: Option<usize>,
    },

    /// Remove a section and all its blocks
    RemoveSection { section_id: String },

    SetSectionTitle { section_id: String, title: String },

    SetDocumentTitle { title: String },

    /// Insert a block into a section at index (or append)
    InsertBlock {
        section_id: String,
        block: Block,
        index: Option<usize>,
    },

    /// Remove a block from its owning section; the id is retired
    RemoveBlock { block_id: String },

    /// Relocate a block, possibly across sections, identity unchanged
    MoveBlock {
        block_id: String,
        target_section_id: String,
        index: usize,
    },

    /// Variant-preserving partial payload update
    UpdateBlockPayload { block_id: String, patch: BlockPatch },

    /// Set one entry in the block's free-form attribute map
    SetBlockAttribute {
        block_id: String,
        name: String,
        value: Value,
    },

    /// Add a mark to an inline span (no-op if present)
    ApplyMark { inline_id: String, mark: TextMark },

    /// Remove a mark from an inline span (no-op if absent)
    RemoveMark { inline_id: String, mark: TextMark },
}

impl Mutation {
    /// Debug name for logging and events
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::InsertSection { .. } => "insert_section",
            Mutation::RemoveSection { .. } => "remove_section",
            Mutation::SetSectionTitle { .. } => "set_section_title",
            Mutation::SetDocumentTitle { .. } => "set_document_title",
            Mutation::InsertBlock { .. } => "insert_block",
            Mutation::RemoveBlock { .. } => "remove_block",
            Mutation::MoveBlock { .. } => "move_block",
            Mutation::UpdateBlockPayload { .. } => "update_block_payload",
            Mutation::SetBlockAttribute { .. } => "set_block_attribute",
            Mutation::ApplyMark { .. } => "apply_mark",
            Mutation::RemoveMark { .. } => "remove_mark",
        }
    }

    /// Validate without applying
    pub fn validate(&self, doc: &Document) -> Result<(), MutationError> {
        match self {
            Mutation::InsertSection { section, .. } => {
                if doc.find_section(&section.id).is_some() {
                    return Err(MutationError::DuplicateSectionId(section.id.clone()));
                }
                for block in &section.blocks {
                    if doc.contains_block_id(&block.id) {
                        return Err(MutationError::DuplicateBlockId(block.id.clone()));
                    }
                    block.validate()?;
                }
                Ok(())
            }

            Mutation::RemoveSection { section_id } | Mutation::SetSectionTitle { section_id, .. } => {
                doc.find_section(section_id)
                    .map(|_| ())
                    .ok_or_else(|| MutationError::SectionNotFound(section_id.clone()))
            }

            Mutation::SetDocumentTitle { .. } => Ok(()),

            Mutation::InsertBlock {
                section_id, block, ..
            } => {
                if doc.find_section(section_id).is_none() {
                    return Err(MutationError::SectionNotFound(section_id.clone()));
                }
                if doc.contains_block_id(&block.id) {
                    return Err(MutationError::DuplicateBlockId(block.id.clone()));
                }
                block.validate()?;
                Ok(())
            }

            Mutation::RemoveBlock { block_id } => doc
                .find_block(block_id)
                .map(|_| ())
                .ok_or_else(|| MutationError::BlockNotFound(block_id.clone())),

            Mutation::MoveBlock {
                block_id,
                target_section_id,
                ..
            } => {
                if doc.find_block(block_id).is_none() {
                    return Err(MutationError::BlockNotFound(block_id.clone()));
                }
                if doc.find_section(target_section_id).is_none() {
                    return Err(MutationError::SectionNotFound(target_section_id.clone()));
                }
                Ok(())
            }

            Mutation::UpdateBlockPayload { block_id, patch } => {
                let block = doc
                    .find_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                if block.kind() != patch.kind() {
                    return Err(MutationError::VariantMismatch {
                        expected: patch.kind(),
                        found: block.kind(),
                    });
                }
                Ok(())
            }

            Mutation::SetBlockAttribute { block_id, .. } => doc
                .find_block(block_id)
                .map(|_| ())
                .ok_or_else(|| MutationError::BlockNotFound(block_id.clone())),

            Mutation::ApplyMark { inline_id, .. } | Mutation::RemoveMark { inline_id, .. } => {
                let found = doc
                    .sections
                    .iter()
                    .flat_map(|s| s.blocks.iter())
                    .any(|b| b.has_inline(inline_id));
                if found {
                    Ok(())
                } else {
                    Err(MutationError::InlineNotFound(inline_id.clone()))
                }
            }
        }
    }

    /// Apply mutation to the tree with validation
    pub fn apply(&self, doc: &mut Document) -> Result<(), MutationError> {
        // Validate first so failures leave the tree unchanged
        self.validate(doc)?;

        match self {
            Mutation::InsertSection { section, index } => {
                let at = index.unwrap_or(doc.sections.len()).min(doc.sections.len());
                doc.sections.insert(at, section.clone());
                Ok(())
            }

            Mutation::RemoveSection { section_id } => {
                doc.sections.retain(|s| s.id != *section_id);
                Ok(())
            }

            Mutation::SetSectionTitle { section_id, title } => {
                if let Some(section) = doc.find_section_mut(section_id) {
                    section.title = title.clone();
                }
                Ok(())
            }

            Mutation::SetDocumentTitle { title } => {
                doc.title = title.clone();
                Ok(())
            }

            Mutation::InsertBlock {
                section_id,
                block,
                index,
            } => {
                if let Some(section) = doc.find_section_mut(section_id) {
                    let at = index.unwrap_or(section.blocks.len()).min(section.blocks.len());
                    section.blocks.insert(at, block.clone());
                }
                Ok(())
            }

            Mutation::RemoveBlock { block_id } => {
                remove_block(doc, block_id)?;
                Ok(())
            }

            Mutation::MoveBlock {
                block_id,
                target_section_id,
                index,
            } => {
                let block = remove_block(doc, block_id)?;
                let section = doc
                    .find_section_mut(target_section_id)
                    .ok_or_else(|| MutationError::SectionNotFound(target_section_id.clone()))?;
                let at = (*index).min(section.blocks.len());
                section.blocks.insert(at, block);
                Ok(())
            }

            Mutation::UpdateBlockPayload { block_id, patch } => {
                let block = doc
                    .find_block_mut(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                let next = patch.patched(&block.payload)?;
                block.payload = next;
                Ok(())
            }

            Mutation::SetBlockAttribute {
                block_id,
                name,
                value,
            } => {
                let block = doc
                    .find_block_mut(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                block.attributes.insert(name.clone(), value.clone());
                Ok(())
            }

            Mutation::ApplyMark { inline_id, mark } => {
                let inline = doc
                    .find_inline_mut(inline_id)
                    .ok_or_else(|| MutationError::InlineNotFound(inline_id.clone()))?;
                inline.add_mark(*mark);
                Ok(())
            }

            Mutation::RemoveMark { inline_id, mark } => {
                let inline = doc
                    .find_inline_mut(inline_id)
                    .ok_or_else(|| MutationError::InlineNotFound(inline_id.clone()))?;
                inline.remove_mark(*mark);
                Ok(())
            }
        }
    }
}

/// Remove a block from its owning section and return it
fn remove_block(doc: &mut Document, block_id: &str) -> Result<Block, MutationError> {
    let (si, bi) = doc
        .position_of_block(block_id)
        .ok_or_else(|| MutationError::BlockNotFound(block_id.to_string()))?;
    Ok(doc.sections[si].blocks.remove(bi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use esgdoc_model::{Document, IdGenerator, Inline, Section};
    use serde_json::json;

    fn text_block(id: &str, inline_id: &str, text: &str) -> Block {
        Block::new(
            id,
            BlockPayload::Text {
                role: TextRole::Paragraph,
                content: vec![Inline::text(inline_id, text)],
            },
        )
    }

    fn two_section_doc() -> Document {
        let mut doc = Document::new_report("1", "Report");
        let mut s1 = Section::new("s1", "Environment");
        s1.blocks.push(text_block("b1", "i1", "emissions"));
        s1.blocks.push(text_block("b2", "i2", "water"));
        doc.sections.push(s1);
        doc.sections.push(Section::new("s2", "Social"));
        doc
    }

    #[test]
    fn test_insert_block_appends_and_inserts() {
        let mut doc = two_section_doc();

        Mutation::InsertBlock {
            section_id: "s2".into(),
            block: text_block("b3", "i3", "workforce"),
            index: None,
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(doc.find_section("s2").unwrap().blocks[0].id, "b3");

        Mutation::InsertBlock {
            section_id: "s1".into(),
            block: text_block("b4", "i4", "first"),
            index: Some(0),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(doc.find_section("s1").unwrap().blocks[0].id, "b4");
    }

    #[test]
    fn test_insert_rejects_duplicate_id_across_sections() {
        let mut doc = two_section_doc();

        // b1 lives in s1; inserting another b1 into s2 must fail
        let err = Mutation::InsertBlock {
            section_id: "s2".into(),
            block: text_block("b1", "i9", "dup"),
            index: None,
        }
        .apply(&mut doc)
        .unwrap_err();

        assert_eq!(err, MutationError::DuplicateBlockId("b1".into()));
        assert!(doc.find_section("s2").unwrap().blocks.is_empty());
    }

    #[test]
    fn test_insert_rejects_invalid_payload_and_leaves_tree_unchanged() {
        let mut doc = two_section_doc();
        let before = doc.clone();

        let err = Mutation::InsertBlock {
            section_id: "s1".into(),
            block: Block::new(
                "b9",
                BlockPayload::Heading {
                    level: 7,
                    content: vec![],
                },
            ),
            index: None,
        }
        .apply(&mut doc)
        .unwrap_err();

        assert!(matches!(err, MutationError::InvalidBlockPayload(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_remove_block_reports_absence() {
        let mut doc = two_section_doc();

        Mutation::RemoveBlock {
            block_id: "b1".into(),
        }
        .apply(&mut doc)
        .unwrap();
        assert!(doc.find_block("b1").is_none());

        let err = Mutation::RemoveBlock {
            block_id: "b1".into(),
        }
        .apply(&mut doc)
        .unwrap_err();
        assert_eq!(err, MutationError::BlockNotFound("b1".into()));
    }

    #[test]
    fn test_move_block_across_sections_preserves_identity() {
        let mut doc = two_section_doc();
        let before = doc.find_block("b1").unwrap().clone();

        Mutation::MoveBlock {
            block_id: "b1".into(),
            target_section_id: "s2".into(),
            index: 0,
        }
        .apply(&mut doc)
        .unwrap();

        assert_eq!(doc.find_section("s1").unwrap().blocks.len(), 1);
        assert_eq!(doc.find_section("s2").unwrap().blocks[0], before);
    }

    #[test]
    fn test_move_index_is_clamped() {
        let mut doc = two_section_doc();

        Mutation::MoveBlock {
            block_id: "b1".into(),
            target_section_id: "s2".into(),
            index: 99,
        }
        .apply(&mut doc)
        .unwrap();

        assert_eq!(doc.find_section("s2").unwrap().blocks[0].id, "b1");
    }

    #[test]
    fn test_patch_preserves_unspecified_fields() {
        let mut doc = two_section_doc();

        Mutation::UpdateBlockPayload {
            block_id: "b1".into(),
            patch: BlockPatch::Text {
                role: Some(TextRole::Quote),
                content: None,
            },
        }
        .apply(&mut doc)
        .unwrap();

        match &doc.find_block("b1").unwrap().payload {
            BlockPayload::Text { role, content } => {
                assert_eq!(*role, TextRole::Quote);
                assert_eq!(content[0].text, "emissions");
            }
            other => panic!("expected text, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_patch_variant_mismatch() {
        let mut doc = two_section_doc();

        let err = Mutation::UpdateBlockPayload {
            block_id: "b1".into(),
            patch: BlockPatch::Chart {
                data: Some(json!({"type": "bar"})),
                caption: None,
            },
        }
        .apply(&mut doc)
        .unwrap_err();

        assert_eq!(
            err,
            MutationError::VariantMismatch {
                expected: BlockKind::Chart,
                found: BlockKind::Text,
            }
        );
    }

    #[test]
    fn test_patch_shape_violation_leaves_block_unchanged() {
        let mut doc = two_section_doc();
        doc.sections[1].blocks.push(Block::new(
            "h1",
            BlockPayload::Heading {
                level: 2,
                content: vec![Inline::text("i8", "Governance")],
            },
        ));
        let before = doc.clone();

        let err = Mutation::UpdateBlockPayload {
            block_id: "h1".into(),
            patch: BlockPatch::Heading {
                level: Some(9),
                content: None,
            },
        }
        .apply(&mut doc)
        .unwrap_err();

        assert!(matches!(err, MutationError::InvalidBlockPayload(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_marks_are_idempotent() {
        let mut doc = two_section_doc();

        for _ in 0..2 {
            Mutation::ApplyMark {
                inline_id: "i1".into(),
                mark: TextMark::Bold,
            }
            .apply(&mut doc)
            .unwrap();
        }

        let mut block = doc.find_block("b1").unwrap().clone();
        assert_eq!(block.find_inline_mut("i1").unwrap().marks, vec![TextMark::Bold]);

        for _ in 0..2 {
            Mutation::RemoveMark {
                inline_id: "i1".into(),
                mark: TextMark::Bold,
            }
            .apply(&mut doc)
            .unwrap();
        }

        let mut block = doc.find_block("b1").unwrap().clone();
        assert!(block.find_inline_mut("i1").unwrap().marks.is_empty());
    }

    #[test]
    fn test_mark_on_missing_inline_is_an_error() {
        let mut doc = two_section_doc();

        let err = Mutation::ApplyMark {
            inline_id: "i99".into(),
            mark: TextMark::Bold,
        }
        .apply(&mut doc)
        .unwrap_err();

        assert_eq!(err, MutationError::InlineNotFound("i99".into()));
    }

    #[test]
    fn test_set_block_attribute() {
        let mut doc = two_section_doc();

        Mutation::SetBlockAttribute {
            block_id: "b1".into(),
            name: "align".into(),
            value: json!("center"),
        }
        .apply(&mut doc)
        .unwrap();

        assert_eq!(
            doc.find_block("b1").unwrap().attributes.get("align"),
            Some(&json!("center"))
        );
    }

    #[test]
    fn test_section_operations() {
        let mut doc = two_section_doc();
        let mut ids = IdGenerator::for_document("1");

        let section = Section::untitled(&mut ids);
        let section_id = section.id.clone();
        Mutation::InsertSection {
            section,
            index: Some(1),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(doc.sections[1].id, section_id);

        Mutation::SetSectionTitle {
            section_id: section_id.clone(),
            title: "Climate".into(),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(doc.find_section(&section_id).unwrap().title, "Climate");

        Mutation::RemoveSection {
            section_id: section_id.clone(),
        }
        .apply(&mut doc)
        .unwrap();
        assert!(doc.find_section(&section_id).is_none());

        let err = Mutation::InsertSection {
            section: Section::new("s1", "Duplicate"),
            index: None,
        }
        .apply(&mut doc)
        .unwrap_err();
        assert_eq!(err, MutationError::DuplicateSectionId("s1".into()));
    }

    #[test]
    fn test_mutation_serialization_round_trips() {
        let mutation = Mutation::UpdateBlockPayload {
            block_id: "b1".into(),
            patch: BlockPatch::Text {
                role: None,
                content: Some(vec![Inline::text("i1", "replacement")]),
            },
        };

        let json = serde_json::to_string(&mutation).unwrap();
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(mutation, deserialized);
    }
}
