//! Errors raised by IR operations.

/// Error produced while decoding, validating or annotating IR.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    #[error("invalid IR JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("node {id} already has metadata key {key:?}")]
    MetadataConflict { id: String, key: String },
}
