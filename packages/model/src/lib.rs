//! # ESGDoc Model
//!
//! Typed document tree for ESG report authoring:
//!
//! ```text
//! Document → Section → Block → Inline
//! ```
//!
//! - Blocks are polymorphic over a closed, discriminated variant set
//!   ([`block::BlockPayload`]); tree operations never branch on the
//!   variant.
//! - Node ids are session-unique and never reused ([`id_generator`]).
//! - Concatenating a block's inline texts in order reconstructs its
//!   plain-text content ([`inline::plain_text`]).
//!
//! Mutation operations live in `esgdoc-editor`; the wire schema and the
//! converter live in `esgdoc-api`.

pub mod block;
pub mod document;
pub mod id_generator;
pub mod inline;

pub use block::{
    Block, BlockKind, BlockPayload, EsgMetricPayload, ImagePayload, ListItem, MetricDisplay,
    MetricValue, PayloadError, TextRole, MAX_LIST_DEPTH,
};
pub use document::{
    Document, DocumentMeta, DocumentStatus, Framework, Margins, Orientation, PageSetup,
    PaperFormat, Section, StandardRef,
};
pub use id_generator::{document_seed, IdGenerator};
pub use inline::{plain_text, Annotation, Inline, Link, LinkTarget, TextMark};
