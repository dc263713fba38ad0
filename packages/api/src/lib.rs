//! # ESGDoc API
//!
//! Wire boundary of the editing core:
//!
//! - [`schema`]: server document records (persistence collaborator)
//! - [`assist`]: AI-assist request/response contract
//! - [`convert`]: lossless bidirectional mapping between server records
//!   and the internal tree
//!
//! The core never talks to a transport directly; it consumes and produces
//! these shapes exclusively through the converter.

pub mod assist;
pub mod convert;
pub mod schema;

pub use assist::{
    ContentChange, ContentExpansionRequest, ContentExpansionResponse, ContentTone,
    EsgMappingRequest, EsgMappingResponse, ExpansionMode, StandardMatch,
};
pub use convert::{to_external, to_internal, to_update_request, wire_id};
pub use schema::{
    ApiBlock, ApiDocument, ApiDocumentUpdate, ApiInline, ApiListItem, ApiSection,
    ApiSectionUpdate,
};
