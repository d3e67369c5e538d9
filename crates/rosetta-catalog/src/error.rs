//! Catalog loading errors.
//!
//! Every variant is fatal: no translation runs without a valid catalog.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {name}: {message}")]
    Parse { name: String, message: String },

    #[error("unsupported catalog format: {0}")]
    UnknownFormat(String),

    #[error("pattern {id}: {message}")]
    InvalidPattern { id: String, message: String },

    #[error("duplicate pattern id: {0}")]
    DuplicatePattern(String),

    #[error("mapping #{index} ({category} -> {ecosystem}): {source}")]
    Template {
        index: usize,
        category: String,
        ecosystem: String,
        source: TemplateSyntaxError,
    },
}

/// Malformed template text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateSyntaxError {
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),

    #[error("empty placeholder at byte {0}")]
    Empty(usize),

    #[error("invalid placeholder name {name:?} at byte {offset}")]
    InvalidName { name: String, offset: usize },
}
