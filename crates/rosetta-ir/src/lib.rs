//! Canonical intermediate representation for cross-ecosystem translation.
//!
//! Front-end adapters lower source text into a tree of [`Node`]s; the
//! translation engine reads that tree and never rewrites it.
//!
//! # Architecture
//!
//! ```text
//! Adapter             IR                         Engine passes
//! ─────────      ───────────────────      ──────────────────────────
//! C / JS / ... ─> Node tree (owned)  ──┬─> TreeIndex (positions)
//!                  + metadata          ├─> SymbolTable (per unit)
//!                  + library deps      └─> GlobalSymbols (all units)
//! ```
//!
//! # Example
//!
//! ```
//! use rosetta_ir::{IdGen, StructureEq, json};
//!
//! let mut ids = IdGen::new("calc");
//! let a = ids.ident("a");
//! let b = ids.ident("b");
//! let sum = ids.binary(a, "+", b);
//! let ret = ids.ret(Some(sum));
//! let add = ids.function("add", &["a", "b"], vec![ret]);
//!
//! let text = json::to_json(&add).unwrap();
//! let back = json::from_json(&text).unwrap();
//! assert!(back.structure_eq(&add));
//! ```

mod builder;
mod error;
pub mod index;
pub mod json;
mod node;
pub mod structure_eq;
pub mod symbols;

pub use error::IrError;
pub use index::TreeIndex;
pub use node::{IdGen, LibraryDependency, Metadata, Node, NodeId, NodeKind, Walk};
pub use structure_eq::StructureEq;
pub use symbols::{GlobalSymbols, Resolved, Symbol, SymbolTable};
