//! Front-end adapter boundary.
//!
//! Adapters turn source text into IR. They live outside this crate; the
//! engine only needs the [`FrontEnd`] trait. The one built-in front end reads
//! already-serialized IR.

use crate::result::Diagnostic;
use rosetta_ir::{IdGen, Node, NodeKind, json};

/// Output of a front end. Diagnostics are never fatal.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub root: Node,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    /// A module holding a single error leaf, for input that could not be
    /// lowered at all.
    pub fn failed(ids: &mut IdGen, message: impl Into<String>) -> Self {
        let message = message.into();
        let leaf = ids.error(&message);
        let diagnostic = Diagnostic {
            node_id: Some(leaf.id.clone()),
            message,
        };
        Self {
            root: ids.node(NodeKind::Module).with_child(leaf),
            diagnostics: vec![diagnostic],
        }
    }
}

pub trait FrontEnd: Send + Sync {
    /// Language tag this front end accepts.
    fn language(&self) -> &str;

    /// Lower `source` into IR. New node ids come from `ids`.
    fn parse(&self, source: &str, ids: &mut IdGen) -> Parsed;
}

/// Serialized IR in, IR out.
pub struct IrJsonFrontEnd;

impl IrJsonFrontEnd {
    pub const LANGUAGE: &'static str = "rosetta-ir+json";
}

impl FrontEnd for IrJsonFrontEnd {
    fn language(&self) -> &str {
        Self::LANGUAGE
    }

    fn parse(&self, source: &str, ids: &mut IdGen) -> Parsed {
        let root = match json::from_json(source) {
            Ok(root) => root,
            Err(e) => return Parsed::failed(ids, e.to_string()),
        };
        if let Err(e) = root.validate() {
            return Parsed::failed(ids, e.to_string());
        }
        Parsed {
            root,
            diagnostics: Vec::new(),
        }
    }
}

/// Front ends by language. Starts with [`IrJsonFrontEnd`].
pub struct FrontEndRegistry {
    frontends: Vec<Box<dyn FrontEnd>>,
}

impl Default for FrontEndRegistry {
    fn default() -> Self {
        Self {
            frontends: vec![Box::new(IrJsonFrontEnd)],
        }
    }
}

impl FrontEndRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a front end. Later registrations shadow earlier ones.
    pub fn register(&mut self, frontend: Box<dyn FrontEnd>) {
        self.frontends.push(frontend);
    }

    pub fn get(&self, language: &str) -> Option<&dyn FrontEnd> {
        self.frontends
            .iter()
            .rev()
            .find(|f| f.language() == language)
            .map(|f| f.as_ref())
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.frontends.iter().map(|f| f.language()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
