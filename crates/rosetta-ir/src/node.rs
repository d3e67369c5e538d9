//! IR node types.
//!
//! A translation unit is a single owned tree of [`Node`]s. Nodes are created
//! once by a front-end adapter and are never rewritten afterwards; later
//! passes keep their results in side tables keyed by [`NodeId`], or append
//! new metadata keys with [`Node::append_metadata`].

use crate::IrError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Free-form node annotations (source span, numeric precision, macro origin, ...).
pub type Metadata = BTreeMap<String, Value>;

/// Unique node identifier. Generated once and never reused within a unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Function,
    Class,
    Parameter,
    Variable,
    Identifier,
    Expression,
    Assignment,
    Block,
    Conditional,
    Loop,
    Return,
    Break,
    Continue,
    Import,
    Export,
    Literal,
    Call,
    LibraryCall,
    Error,
}

impl NodeKind {
    pub const ALL: [NodeKind; 20] = [
        NodeKind::Module,
        NodeKind::Function,
        NodeKind::Class,
        NodeKind::Parameter,
        NodeKind::Variable,
        NodeKind::Identifier,
        NodeKind::Expression,
        NodeKind::Assignment,
        NodeKind::Block,
        NodeKind::Conditional,
        NodeKind::Loop,
        NodeKind::Return,
        NodeKind::Break,
        NodeKind::Continue,
        NodeKind::Import,
        NodeKind::Export,
        NodeKind::Literal,
        NodeKind::Call,
        NodeKind::LibraryCall,
        NodeKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::Parameter => "parameter",
            NodeKind::Variable => "variable",
            NodeKind::Identifier => "identifier",
            NodeKind::Expression => "expression",
            NodeKind::Assignment => "assignment",
            NodeKind::Block => "block",
            NodeKind::Conditional => "conditional",
            NodeKind::Loop => "loop",
            NodeKind::Return => "return",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Import => "import",
            NodeKind::Export => "export",
            NodeKind::Literal => "literal",
            NodeKind::Call => "call",
            NodeKind::LibraryCall => "library_call",
            NodeKind::Error => "error",
        }
    }

    /// Literal, import and export nodes never need a rendering decision.
    pub fn needs_decision(self) -> bool {
        !matches!(self, NodeKind::Literal | NodeKind::Import | NodeKind::Export)
    }

    /// Kinds that render as expressions rather than statements.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Identifier
                | NodeKind::Expression
                | NodeKind::Literal
                | NodeKind::Call
                | NodeKind::LibraryCall
        )
    }

    /// Kinds whose `name` introduces a binding in the enclosing scope.
    pub fn declares_name(self) -> bool {
        matches!(
            self,
            NodeKind::Function | NodeKind::Class | NodeKind::Parameter | NodeKind::Variable
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown node kind: {s}"))
    }
}

/// Annotation recording that a node's shape comes from a known library call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDependency {
    pub library: String,
    pub pattern: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl LibraryDependency {
    pub fn new(library: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            pattern: pattern.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A node in the canonical IR tree. Children are exclusively owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub library_dependencies: Vec<LibraryDependency>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            name: None,
            children: Vec::new(),
            metadata: Metadata::new(),
            library_dependencies: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_library(mut self, dependency: LibraryDependency) -> Self {
        self.library_dependencies.push(dependency);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// String-valued metadata entry.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn meta_bool(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(Value::as_bool)
    }

    /// Canonical operator of an `expression` node.
    pub fn operator(&self) -> Option<&str> {
        self.meta_str("operator")
    }

    /// Append a metadata entry. Existing keys are never overwritten.
    pub fn append_metadata(&mut self, key: impl Into<String>, value: Value) -> Result<(), IrError> {
        let key = key.into();
        if self.metadata.contains_key(&key) {
            return Err(IrError::MetadataConflict {
                id: self.id.to_string(),
                key,
            });
        }
        self.metadata.insert(key, value);
        Ok(())
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Pre-order iterator over this subtree.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.walk().find(|n| n.id.as_str() == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Check that every id in the tree is unique.
    pub fn validate(&self) -> Result<(), IrError> {
        let mut seen = HashSet::new();
        for node in self.walk() {
            if !seen.insert(node.id.as_str()) {
                return Err(IrError::DuplicateId(node.id.to_string()));
            }
        }
        Ok(())
    }
}

/// Pre-order traversal of a subtree.
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Generates node ids of the form `{unit}#{n}`.
///
/// One generator per translation unit; ids are never handed out twice.
#[derive(Debug, Clone)]
pub struct IdGen {
    prefix: String,
    next: u64,
}

impl IdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(format!("{}#{}", self.prefix, self.next));
        self.next += 1;
        id
    }

    pub fn node(&mut self, kind: NodeKind) -> Node {
        Node::new(self.next_id(), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_never_reused() {
        let mut ids = IdGen::new("unit");
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "unit#0");
        assert_eq!(b.as_str(), "unit#1");
    }

    #[test]
    fn test_append_metadata_never_overwrites() {
        let mut ids = IdGen::new("u");
        let mut node = ids.node(NodeKind::Literal).with_metadata("value", 1);
        assert!(node.append_metadata("span", json!([1, 4])).is_ok());
        let err = node.append_metadata("value", json!(2)).unwrap_err();
        assert!(matches!(err, IrError::MetadataConflict { .. }));
        assert_eq!(node.metadata["value"], json!(1));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let dup = Node::new(NodeId::from("x"), NodeKind::Module)
            .with_child(Node::new(NodeId::from("x"), NodeKind::Literal));
        assert!(matches!(dup.validate(), Err(IrError::DuplicateId(id)) if id == "x"));
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut ids = IdGen::new("u");
        let a = ids.node(NodeKind::Identifier).with_name("a");
        let b = ids.node(NodeKind::Identifier).with_name("b");
        let sum = ids
            .node(NodeKind::Expression)
            .with_metadata("operator", "+")
            .with_children([a, b]);
        let names: Vec<_> = sum.walk().map(|n| n.kind.as_str()).collect();
        assert_eq!(names, ["expression", "identifier", "identifier"]);
        assert_eq!(sum.count(), 3);
    }

    #[test]
    fn test_kind_from_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("lambda".parse::<NodeKind>().is_err());
    }
}
