//! Pattern definitions.
//!
//! A pattern is data: a semantic category plus a matcher built from
//! [`Shape`]s. Catalog files describe shapes with [`ShapeSpec`]; loading
//! compiles them (regexes, nested shapes) into [`Shape`], which answers the
//! node-local questions. Questions that need the surrounding tree (ancestors,
//! descendants, symbol resolution) are answered by the matcher that walks it.

use crate::CatalogLoadError;
use regex::Regex;
use rosetta_ir::{LibraryDependency, Node, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Whether a matched construct may be rewritten into an idiomatic equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    /// Safety-critical: only behavior-preserving mappings may apply.
    Preserve,
    #[default]
    Modernize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSpec {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub stability: Stability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub matcher: MatcherSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatcherSpec {
    /// One node (and its neighbourhood) matching a shape.
    Node { shape: ShapeSpec },
    /// Two statements in the same block, the second after the first, that
    /// agree on the binding named `key` (e.g. an allocation and its release).
    Pair {
        first: ShapeSpec,
        second: ShapeSpec,
        key: String,
        /// Binding for the statements strictly between the pair.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSpec {
    pub kind: Option<NodeKind>,
    pub name: Option<String>,
    pub library: Option<String>,
    pub pattern: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub metadata_match: BTreeMap<String, String>,
    pub has_metadata: Vec<String>,
    pub children: Vec<ChildSpec>,
    pub contains: Option<Box<ShapeSpec>>,
    pub inside: Option<Box<ShapeSpec>>,
    pub resolves_to: Option<NodeKind>,
    pub bind: Option<String>,
    pub bind_name: Option<String>,
    pub bind_metadata: BTreeMap<String, String>,
    pub bind_children: Option<String>,
    pub bind_args: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSpec {
    pub index: usize,
    #[serde(default)]
    pub optional: bool,
    #[serde(flatten)]
    pub shape: ShapeSpec,
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: String,
    pub category: String,
    pub stability: Stability,
    pub hint: Option<String>,
    pub matcher: Matcher,
    /// Position in the loaded catalog. Earlier wins ties.
    pub order: usize,
}

impl Pattern {
    pub fn compile(spec: PatternSpec, order: usize) -> Result<Self, CatalogLoadError> {
        let id = spec.id;
        let invalid = |message: String| CatalogLoadError::InvalidPattern {
            id: id.clone(),
            message,
        };

        if spec.category.trim().is_empty() {
            return Err(invalid("empty category".into()));
        }

        let matcher = match spec.matcher {
            MatcherSpec::Node { shape } => Matcher::Node(Shape::compile(&shape).map_err(invalid)?),
            MatcherSpec::Pair {
                first,
                second,
                key,
                body,
            } => {
                let first = Shape::compile(&first).map_err(invalid)?;
                let second = Shape::compile(&second).map_err(invalid)?;
                for (label, shape) in [("first", &first), ("second", &second)] {
                    if !shape.binds(&key) {
                        return Err(invalid(format!("{label} shape never binds key {key:?}")));
                    }
                }
                Matcher::Pair {
                    first,
                    second,
                    key,
                    body,
                }
            }
        };

        Ok(Self {
            id: id.clone(),
            category: spec.category,
            stability: spec.stability,
            hint: spec.hint,
            matcher,
            order,
        })
    }

    pub fn is_preserve(&self) -> bool {
        self.stability == Stability::Preserve
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Node(Shape),
    Pair {
        first: Shape,
        second: Shape,
        key: String,
        body: Option<String>,
    },
}

/// Compiled [`ShapeSpec`]. Regexes must match the whole value.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    pub kind: Option<NodeKind>,
    pub name: Option<Regex>,
    pub library: Option<Regex>,
    pub pattern: Option<Regex>,
    pub metadata: BTreeMap<String, Value>,
    pub metadata_match: Vec<(String, Regex)>,
    pub has_metadata: Vec<String>,
    pub children: Vec<ChildShape>,
    pub contains: Option<Box<Shape>>,
    pub inside: Option<Box<Shape>>,
    pub resolves_to: Option<NodeKind>,
    pub bind: Option<String>,
    pub bind_name: Option<String>,
    pub bind_metadata: BTreeMap<String, String>,
    pub bind_children: Option<String>,
    pub bind_args: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChildShape {
    pub index: usize,
    pub optional: bool,
    pub shape: Shape,
}

impl Shape {
    pub fn compile(spec: &ShapeSpec) -> Result<Self, String> {
        let children = spec
            .children
            .iter()
            .map(|c| {
                Ok(ChildShape {
                    index: c.index,
                    optional: c.optional,
                    shape: Shape::compile(&c.shape)?,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        let metadata_match = spec
            .metadata_match
            .iter()
            .map(|(key, re)| Ok((key.clone(), whole(re)?)))
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Self {
            kind: spec.kind,
            name: spec.name.as_deref().map(whole).transpose()?,
            library: spec.library.as_deref().map(whole).transpose()?,
            pattern: spec.pattern.as_deref().map(whole).transpose()?,
            metadata: spec.metadata.clone(),
            metadata_match,
            has_metadata: spec.has_metadata.clone(),
            children,
            contains: spec
                .contains
                .as_deref()
                .map(|s| Shape::compile(s).map(Box::new))
                .transpose()?,
            inside: spec
                .inside
                .as_deref()
                .map(|s| Shape::compile(s).map(Box::new))
                .transpose()?,
            resolves_to: spec.resolves_to,
            bind: spec.bind.clone(),
            bind_name: spec.bind_name.clone(),
            bind_metadata: spec.bind_metadata.clone(),
            bind_children: spec.bind_children.clone(),
            bind_args: spec.bind_args.clone(),
        })
    }

    /// Whether matching this shape (including nested shapes) produces `binding`.
    pub fn binds(&self, binding: &str) -> bool {
        let own = [
            &self.bind,
            &self.bind_name,
            &self.bind_children,
            &self.bind_args,
        ]
        .into_iter()
        .any(|b| b.as_deref() == Some(binding))
            || self.bind_metadata.values().any(|b| b == binding);

        own || self.children.iter().any(|c| c.shape.binds(binding))
            || self.contains.as_ref().is_some_and(|s| s.binds(binding))
            || self.inside.as_ref().is_some_and(|s| s.binds(binding))
    }

    /// Checks that only look at `node` itself: kind, name, metadata and
    /// library annotations.
    pub fn accepts(&self, node: &Node) -> bool {
        if self.kind.is_some_and(|k| k != node.kind) {
            return false;
        }
        if let Some(re) = &self.name
            && !node.name().is_some_and(|n| re.is_match(n))
        {
            return false;
        }
        if (self.library.is_some() || self.pattern.is_some())
            && self.library_dependency(node).is_none()
        {
            return false;
        }
        if self
            .metadata
            .iter()
            .any(|(k, v)| node.metadata.get(k) != Some(v))
        {
            return false;
        }
        if self
            .metadata_match
            .iter()
            .any(|(k, re)| !node.meta_str(k).is_some_and(|v| re.is_match(v)))
        {
            return false;
        }
        self.has_metadata
            .iter()
            .all(|k| node.metadata.contains_key(k))
    }

    /// The first library annotation on `node` satisfying both the `library`
    /// and `pattern` regexes.
    pub fn library_dependency<'n>(&self, node: &'n Node) -> Option<&'n LibraryDependency> {
        node.library_dependencies.iter().find(|dep| {
            self.library.as_ref().is_none_or(|re| re.is_match(&dep.library))
                && self.pattern.as_ref().is_none_or(|re| re.is_match(&dep.pattern))
        })
    }

    /// Whether the shape also needs the tree around the node.
    pub fn needs_context(&self) -> bool {
        self.contains.is_some()
            || self.inside.is_some()
            || self.resolves_to.is_some()
            || !self.children.is_empty()
    }
}

fn whole(re: &str) -> Result<Regex, String> {
    Regex::new(&format!("^(?:{re})$")).map_err(|e| e.to_string())
}
