//! Engine errors.
//!
//! Only configuration-level problems are errors. Everything that can go
//! wrong with a single node degrades to fallback output plus a warning.

use rosetta_catalog::CatalogLoadError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error("no writer for target language {language:?} (ecosystem {ecosystem:?})")]
    UnknownTarget { ecosystem: String, language: String },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
