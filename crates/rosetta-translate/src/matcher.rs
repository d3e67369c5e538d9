//! Structural matcher.
//!
//! Walks a unit bottom-up and runs every catalog pattern at every node.
//! Node patterns see the node, its subtree and up to `ancestor_depth`
//! ancestors; pair patterns see the node and its later siblings in the same
//! statement list. Candidates are then accepted greedily so that the result
//! is non-overlapping:
//!
//! 1. `preserve` matches before `modernize` matches,
//! 2. larger covered span first,
//! 3. earlier catalog pattern first,
//! 4. earlier discovery (post-order) first.
//!
//! Two matches conflict when they share a participating node or when their
//! covered regions intersect without one strictly containing the other. A
//! `modernize` match also conflicts with any `preserve` match it intersects,
//! nested or not.

use crate::result::{Warning, WarningKind};
use rosetta_catalog::{Catalog, Matcher as PatternMatcher, Pattern, Shape};
use rosetta_ir::{GlobalSymbols, NodeId, NodeKind, TreeIndex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// A value extracted by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Literal text (a name, a metadata value, a library parameter).
    Text(String),
    /// One node, rendered in its own syntactic position.
    Node(NodeId),
    /// A statement list.
    Nodes(Vec<NodeId>),
    /// An argument list.
    Args(Vec<NodeId>),
}

impl Binding {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Binding::Text(text) => Some(text),
            _ => None,
        }
    }
}

pub type Bindings = BTreeMap<String, Binding>;

/// One accepted firing of a pattern.
#[derive(Debug, Clone)]
pub struct Match {
    /// Index into [`Catalog::patterns`].
    pub pattern: usize,
    /// Participating nodes (pre-order positions), in source order.
    pub roots: Vec<usize>,
    /// Pre-order range of everything the match spans.
    pub covered: Range<usize>,
    pub bindings: Bindings,
    pub preserve: bool,
    discovery: usize,
}

impl Match {
    pub fn span(&self) -> usize {
        self.covered.len()
    }

    pub fn first_root(&self) -> usize {
        self.roots[0]
    }

    fn intersects(&self, other: &Match) -> bool {
        self.covered.start < other.covered.end && other.covered.start < self.covered.end
    }

    fn nests_with(&self, other: &Match) -> bool {
        let (a, b) = (&self.covered, &other.covered);
        (a.start <= b.start && b.end <= a.end) || (b.start <= a.start && a.end <= b.end)
    }

    fn shares_root(&self, other: &Match) -> bool {
        self.roots.iter().any(|r| other.roots.contains(r))
    }
}

/// Accepted matches plus warnings about tie-breaks.
#[derive(Debug, Default)]
pub struct MatchSet {
    pub matches: Vec<Match>,
    pub warnings: Vec<Warning>,
}

impl MatchSet {
    /// Accepted matches ordered by first participating node.
    pub fn in_source_order(&self) -> Vec<&Match> {
        let mut out: Vec<&Match> = self.matches.iter().collect();
        out.sort_by_key(|m| (m.first_root(), m.covered.end));
        out
    }
}

pub struct StructuralMatcher<'a> {
    catalog: &'a Catalog,
    ancestor_depth: usize,
}

impl<'a> StructuralMatcher<'a> {
    pub fn new(catalog: &'a Catalog, ancestor_depth: usize) -> Self {
        Self {
            catalog,
            ancestor_depth,
        }
    }

    pub fn run(&self, index: &TreeIndex<'_>, symbols: &GlobalSymbols, unit: &str) -> MatchSet {
        let scope = Scope {
            index,
            symbols,
            unit,
            ancestor_depth: self.ancestor_depth,
        };

        let mut candidates = Vec::new();
        for pos in index.post_order() {
            for (pattern_idx, pattern) in self.catalog.patterns().iter().enumerate() {
                if let Some((roots, covered, bindings)) = scope.try_pattern(pattern, pos) {
                    candidates.push(Match {
                        pattern: pattern_idx,
                        roots,
                        covered,
                        bindings,
                        preserve: pattern.is_preserve(),
                        discovery: candidates.len(),
                    });
                }
            }
        }

        let found = candidates.len();
        let set = self.accept(index, candidates);
        debug!(
            unit,
            candidates = found,
            accepted = set.matches.len(),
            "structural matching done"
        );
        set
    }

    fn accept(&self, index: &TreeIndex<'_>, mut candidates: Vec<Match>) -> MatchSet {
        candidates.sort_by(|a, b| {
            b.preserve
                .cmp(&a.preserve)
                .then_with(|| b.span().cmp(&a.span()))
                .then_with(|| self.order(a).cmp(&self.order(b)))
                .then_with(|| a.discovery.cmp(&b.discovery))
        });

        let mut set = MatchSet::default();
        for candidate in candidates {
            let blocker = set.matches.iter().find(|m| {
                m.shares_root(&candidate)
                    || (m.intersects(&candidate) && !m.nests_with(&candidate))
                    || (m.preserve && !candidate.preserve && m.intersects(&candidate))
            });

            match blocker {
                None => set.matches.push(candidate),
                Some(winner) => {
                    if winner.shares_root(&candidate)
                        && winner.span() == candidate.span()
                        && winner.preserve == candidate.preserve
                    {
                        let chosen = &self.catalog.patterns()[winner.pattern];
                        let dropped = &self.catalog.patterns()[candidate.pattern];
                        set.warnings.push(Warning::new(
                            index.node(candidate.first_root()).id.clone(),
                            WarningKind::AmbiguousMatch,
                            format!(
                                "patterns {} and {} both match; using {} (registered first)",
                                chosen.id, dropped.id, chosen.id
                            ),
                        ));
                    }
                }
            }
        }
        set
    }

    fn order(&self, m: &Match) -> usize {
        self.catalog.patterns()[m.pattern].order
    }
}

/// Read-only view a pattern is evaluated against.
struct Scope<'s, 'a> {
    index: &'s TreeIndex<'a>,
    symbols: &'s GlobalSymbols,
    unit: &'s str,
    ancestor_depth: usize,
}

type Found = (Vec<usize>, Range<usize>, Bindings);

impl Scope<'_, '_> {
    fn try_pattern(&self, pattern: &Pattern, pos: usize) -> Option<Found> {
        match &pattern.matcher {
            PatternMatcher::Node(shape) => {
                let mut bindings = Bindings::new();
                self.eval(shape, pos, &mut bindings)
                    .then(|| (vec![pos], self.index.subtree(pos), bindings))
            }
            PatternMatcher::Pair {
                first,
                second,
                key,
                body,
            } => self.try_pair(first, second, key, body.as_deref(), pos),
        }
    }

    fn try_pair(
        &self,
        first: &Shape,
        second: &Shape,
        key: &str,
        body: Option<&str>,
        pos: usize,
    ) -> Option<Found> {
        let parent = self.index.parent(pos)?;
        if !matches!(
            self.index.node(parent).kind,
            NodeKind::Block | NodeKind::Module
        ) {
            return None;
        }

        let mut bindings = Bindings::new();
        if !self.eval(first, pos, &mut bindings) {
            return None;
        }
        let identity = bindings.get(key)?.as_text()?.to_string();

        let siblings = self.index.children(parent);
        let slot = self.index.slot(pos);
        for (offset, &later) in siblings[slot + 1..].iter().enumerate() {
            let mut release = Bindings::new();
            if !self.eval(second, later, &mut release) {
                continue;
            }
            if release.get(key).and_then(Binding::as_text) != Some(identity.as_str()) {
                continue;
            }

            for (name, value) in release {
                bindings.entry(name).or_insert(value);
            }
            if let Some(body) = body {
                let between = siblings[slot + 1..slot + 1 + offset]
                    .iter()
                    .map(|&p| self.index.node(p).id.clone())
                    .collect();
                bindings
                    .entry(body.to_string())
                    .or_insert(Binding::Nodes(between));
            }
            let covered = pos..self.index.subtree(later).end;
            return Some((vec![pos, later], covered, bindings));
        }
        None
    }

    /// Evaluate `shape` at `pos`, adding captures to `bindings` on success.
    /// On failure `bindings` is left untouched.
    fn eval(&self, shape: &Shape, pos: usize, bindings: &mut Bindings) -> bool {
        let node = self.index.node(pos);
        if !shape.accepts(node) {
            return false;
        }

        let mut local = Bindings::new();

        if shape.needs_context() {
            let children = self.index.children(pos);
            for child in &shape.children {
                match children.get(child.index) {
                    Some(&c) => {
                        if !self.eval(&child.shape, c, &mut local) {
                            return false;
                        }
                    }
                    None if child.optional => {}
                    None => return false,
                }
            }

            if let Some(inner) = &shape.contains {
                let found = self
                    .index
                    .subtree(pos)
                    .any(|p| self.eval(inner, p, &mut local));
                if !found {
                    return false;
                }
            }

            if let Some(outer) = &shape.inside {
                let found = self
                    .index
                    .ancestors(pos)
                    .take(self.ancestor_depth)
                    .any(|p| self.eval(outer, p, &mut local));
                if !found {
                    return false;
                }
            }

            if let Some(kind) = shape.resolves_to {
                let resolved = node
                    .name()
                    .and_then(|name| self.symbols.resolve(self.unit, name))
                    .is_some_and(|r| r.symbol.kind == kind);
                if !resolved {
                    return false;
                }
            }
        }

        if let Some(name) = &shape.bind {
            local.insert(name.clone(), Binding::Node(node.id.clone()));
        }
        if let Some(name) = &shape.bind_name {
            let Some(text) = node.name() else {
                return false;
            };
            local.insert(name.clone(), Binding::Text(text.to_string()));
        }
        for (key, name) in &shape.bind_metadata {
            let Some(value) = node.metadata.get(key) else {
                return false;
            };
            local.insert(name.clone(), Binding::Text(metadata_text(value)));
        }
        if let Some(name) = &shape.bind_children {
            local.insert(name.clone(), Binding::Nodes(child_ids(node)));
        }
        if let Some(name) = &shape.bind_args {
            local.insert(name.clone(), Binding::Args(child_ids(node)));
        }

        let dependency = shape
            .library_dependency(node)
            .or_else(|| node.library_dependencies.first());
        if node.kind == NodeKind::LibraryCall
            && let Some(dep) = dependency
        {
            for (param, value) in &dep.parameters {
                local
                    .entry(param.clone())
                    .or_insert_with(|| Binding::Text(value.clone()));
            }
            local
                .entry("library".into())
                .or_insert_with(|| Binding::Text(dep.library.clone()));
            local
                .entry("pattern".into())
                .or_insert_with(|| Binding::Text(dep.pattern.clone()));
        }

        for (name, value) in local {
            bindings.entry(name).or_insert(value);
        }
        true
    }
}

fn child_ids(node: &rosetta_ir::Node) -> Vec<NodeId> {
    node.children.iter().map(|c| c.id.clone()).collect()
}

/// Metadata rendered as template text: strings verbatim, arrays joined.
fn metadata_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(metadata_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
