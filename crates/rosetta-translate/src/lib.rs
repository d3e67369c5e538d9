//! Pattern-aware translation of canonical IR into target ecosystems.
//!
//! `rosetta-translate` recognizes library idioms, resource lifecycles,
//! platform branches and generic containers in a unit's IR, rewrites them
//! through catalog mappings for the requested ecosystem, and renders
//! everything else structurally so the output is always valid code.
//!
//! # Architecture
//!
//! ```text
//! IR unit ─> StructuralMatcher ─> Resolver ─────────┐
//!             (catalog patterns)  (catalog mappings, │
//!                                  ranking service)  v
//!           Synthesizer <── substitute (templates) <─┘
//!                │  (Writer: python / typescript / lua)
//!                v
//!           code + confidence + warnings
//! ```
//!
//! # Example
//!
//! ```
//! use rosetta_catalog::Catalog;
//! use rosetta_ir::{IdGen, LibraryDependency};
//! use rosetta_translate::{CancelToken, Engine, RosettaConfig, Unit};
//!
//! let mut ids = IdGen::new("counter");
//! let state = ids.library_call(
//!     None,
//!     LibraryDependency::new("stateA", "reactive-state").with_parameter("initial", "0"),
//!     vec![],
//! );
//! let count = ids.variable("count", Some(state));
//! let root = ids.module("counter", vec![count]);
//!
//! let engine = Engine::new(Catalog::builtin().unwrap(), RosettaConfig::default());
//! let target = engine.target("vue").unwrap();
//! let outcome = engine
//!     .translate_unit(&Unit::new("counter", root), &target, &CancelToken::new())
//!     .unwrap();
//! let result = outcome.result().unwrap();
//! assert!(result.code.contains("ref(0)"));
//! assert_eq!(result.confidence, 1.0);
//! ```
//!
//! # Failure model
//!
//! Only a catalog that fails to load, or a target with no writer, is an
//! error. An unmapped pattern, a template that references an unbound
//! placeholder, an ambiguous tie-break or a front-end diagnostic all degrade
//! to fallback output plus a [`Warning`], and lower the unit's confidence.

mod annotate;
mod cancel;
pub mod config;
mod engine;
mod error;
pub mod frontend;
pub mod matcher;
pub mod ranker;
pub mod resolver;
mod result;
mod scorer;
pub mod substitute;
mod synth;
pub mod writer;

pub use annotate::{MATCH_KEY, RESOLUTION_KEY};
pub use cancel::CancelToken;
pub use config::RosettaConfig;
pub use engine::{Engine, Source, Target, Unit};
pub use error::EngineError;
pub use frontend::{FrontEnd, FrontEndRegistry, IrJsonFrontEnd, Parsed};
pub use ranker::{MappingRanker, RankFailure, RankRequest, RankerClient, RankerError};
pub use resolver::{Resolution, Unmapped};
pub use result::{Diagnostic, TranslationResult, UnitOutcome, Warning, WarningKind};
pub use writer::{Writer, WriterRegistry};
