//! Building-model (IDF) documents.
//!
//! A document keeps every object's original text so that a round trip without edits reproduces the input
//! byte-for-byte. Objects that get edited are re-rendered in the conventional one-field-per-line layout.

pub(crate) mod document;
mod object;
pub(crate) mod schema;
mod version;

pub use document::IdfDocument;
pub use object::{
    Channel,
    Field,
    IdealLoadsFlavor,
    IdealLoadsSystem,
    ModelObject,
    OutputVariable,
    RawObject,
    ScheduleCompact,
    ScheduleTypeLimits,
    Version,
};
pub use schema::{
    ClassDef,
    FieldDef,
    FieldKind,
    Schema,
};
pub use version::VersionNumber;

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum IdfError {
    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Malformed schema definition at line {line}: {reason}")]
    SchemaParse { line: usize, reason: String },

    #[error("{class} at line {line} does not match the schema: {reason}")]
    SchemaMismatch { line: usize, class: String, reason: String },
}
