//! Structural equality for IR trees.
//!
//! `structure_eq` compares trees on the fields that carry program structure
//! and ignores node ids, which are unit-local and regenerated by every parse.
//!
//! # Compared
//!
//! - `kind`, `name`
//! - `children` (same length, pairwise structurally equal, same order)
//! - `metadata` (exact, including annotation keys)
//! - `library_dependencies` (exact, same order)
//!
//! # Ignored
//!
//! - `id`

use crate::{LibraryDependency, Node};

/// Trait for structural equality comparison.
///
/// Unlike `PartialEq`, this ignores identity fields that differ between two
/// parses of the same program.
pub trait StructureEq {
    fn structure_eq(&self, other: &Self) -> bool;
}

impl StructureEq for Node {
    fn structure_eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.metadata == other.metadata
            && self.library_dependencies.structure_eq(&other.library_dependencies)
            && self.children.structure_eq(&other.children)
    }
}

impl StructureEq for LibraryDependency {
    fn structure_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: StructureEq> StructureEq for Vec<T> {
    fn structure_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.structure_eq(b))
    }
}

impl<T: StructureEq> StructureEq for Option<T> {
    fn structure_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.structure_eq(b),
            _ => false,
        }
    }
}
