//! Pattern registry and mapping catalog.
//!
//! Patterns and mappings are data. A catalog document lists both:
//!
//! ```toml
//! [[patterns]]
//! id = "reactive-state"
//! category = "reactive-state"
//! hint = "hold the value in the target's observable cell"
//!
//! [patterns.matcher]
//! type = "node"
//!
//! [patterns.matcher.shape]
//! kind = "library_call"
//! pattern = "reactive-state|useState"
//!
//! [[mappings]]
//! source_category = "reactive-state"
//! target_ecosystem = "vue"
//! template = "ref({{initial|undefined}})"
//! priority = 10
//! behavior_preserving = true
//! imports = ['import { ref } from "vue";']
//! ```
//!
//! [`CatalogLoader`] reads the embedded built-in catalog and any number of
//! TOML, YAML or JSON files into one immutable [`Catalog`].

mod catalog;
mod error;
mod mapping;
mod pattern;
pub mod template;

pub use catalog::{Catalog, CatalogFile, CatalogLoader, Format};
pub use error::{CatalogLoadError, TemplateSyntaxError};
pub use mapping::{Mapping, MappingSpec, Suggestion, SuggestionKind};
pub use pattern::{
    ChildShape, ChildSpec, Matcher, MatcherSpec, Pattern, PatternSpec, Shape, ShapeSpec,
    Stability,
};
pub use template::{Segment, Template};
