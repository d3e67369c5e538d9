//! Symbol tables for name-based cross references.
//!
//! Nodes never point at each other. A call to a function defined elsewhere
//! carries the callee's name, and that name is resolved through a
//! [`SymbolTable`] built once per unit after parsing. Units that need to see
//! into their siblings go through [`GlobalSymbols`], which is assembled once
//! after every unit has been parsed and is read-only from then on.

use crate::{Node, NodeId, NodeKind};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// A declaration site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Declared directly in the unit's root scope.
    pub top_level: bool,
}

/// Declarations of one translation unit, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    unit: String,
    names: BTreeMap<String, Vec<Symbol>>,
}

impl SymbolTable {
    pub fn build(unit: &str, root: &Node) -> Self {
        let mut table = Self {
            unit: unit.to_string(),
            names: BTreeMap::new(),
        };
        if root.kind == NodeKind::Module {
            for child in &root.children {
                table.collect(child, true);
            }
        } else {
            table.collect(root, true);
        }
        table
    }

    fn collect(&mut self, node: &Node, top_level: bool) {
        let declares = node.kind.declares_name()
            || (node.kind == NodeKind::Loop && node.meta_str("form") == Some("for_each"));
        if declares && let Some(name) = node.name() {
            self.names.entry(name.to_string()).or_default().push(Symbol {
                id: node.id.clone(),
                kind: node.kind,
                top_level,
            });
        }
        for child in &node.children {
            self.collect(child, false);
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Every declaration of `name`, in pre-order.
    pub fn lookup(&self, name: &str) -> &[Symbol] {
        self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn top_level(&self, name: &str) -> Option<&Symbol> {
        self.lookup(name).iter().find(|s| s.top_level)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Declared names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

/// A resolved reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub unit: &'a str,
    pub symbol: &'a Symbol,
}

/// Cross-unit symbol index. Built once, shared read-only by all workers.
#[derive(Debug, Clone, Default)]
pub struct GlobalSymbols {
    units: BTreeMap<String, SymbolTable>,
    duplicates: Vec<String>,
}

impl GlobalSymbols {
    /// When two tables share a unit name the first one is kept and the name
    /// is listed in [`GlobalSymbols::duplicates`].
    pub fn build(tables: impl IntoIterator<Item = SymbolTable>) -> Self {
        let mut units = BTreeMap::new();
        let mut duplicates = Vec::new();
        for table in tables {
            match units.entry(table.unit.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(table);
                }
                Entry::Occupied(slot) => duplicates.push(slot.key().clone()),
            }
        }
        duplicates.sort_unstable();
        duplicates.dedup();
        Self { units, duplicates }
    }

    /// Unit names given to more than one table, sorted.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn unit(&self, name: &str) -> Option<&SymbolTable> {
        self.units.get(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Resolve `name` as seen from `from_unit`.
    ///
    /// Local declarations win. `unit.symbol` resolves into the named unit.
    /// Otherwise the first sibling unit (by name) with a matching top-level
    /// declaration is used.
    pub fn resolve(&self, from_unit: &str, name: &str) -> Option<Resolved<'_>> {
        if let Some(local) = self.units.get(from_unit)
            && let Some(symbol) = local.lookup(name).first()
        {
            return Some(Resolved {
                unit: &local.unit,
                symbol,
            });
        }

        if let Some((unit, symbol_name)) = name.rsplit_once('.')
            && let Some(table) = self.units.get(unit)
        {
            return table.top_level(symbol_name).map(|symbol| Resolved {
                unit: &table.unit,
                symbol,
            });
        }

        self.units
            .values()
            .filter(|t| t.unit != from_unit)
            .find_map(|t| {
                t.top_level(name).map(|symbol| Resolved {
                    unit: &t.unit,
                    symbol,
                })
            })
    }
}
