//! Constructors for the common node shapes.
//!
//! These encode the child conventions front-end adapters are expected to
//! follow (parameters before the body block, condition before branches, ...).

use crate::node::{IdGen, LibraryDependency, Node, NodeKind};
use serde_json::Value;

impl IdGen {
    pub fn module(&mut self, name: &str, body: Vec<Node>) -> Node {
        self.node(NodeKind::Module)
            .with_name(name)
            .with_children(body)
    }

    pub fn block(&mut self, stmts: Vec<Node>) -> Node {
        self.node(NodeKind::Block).with_children(stmts)
    }

    /// Function with parameters followed by a body block.
    pub fn function(&mut self, name: &str, params: &[&str], body: Vec<Node>) -> Node {
        let params: Vec<Node> = params.iter().map(|p| self.param(p)).collect();
        let body = self.block(body);
        self.node(NodeKind::Function)
            .with_name(name)
            .with_children(params)
            .with_child(body)
    }

    pub fn param(&mut self, name: &str) -> Node {
        self.node(NodeKind::Parameter).with_name(name)
    }

    pub fn class(&mut self, name: &str, members: Vec<Node>) -> Node {
        self.node(NodeKind::Class)
            .with_name(name)
            .with_children(members)
    }

    pub fn variable(&mut self, name: &str, init: Option<Node>) -> Node {
        let node = self.node(NodeKind::Variable).with_name(name);
        match init {
            Some(init) => node.with_child(init),
            None => node,
        }
    }

    pub fn ident(&mut self, name: &str) -> Node {
        self.node(NodeKind::Identifier).with_name(name)
    }

    pub fn literal(&mut self, value: impl Into<Value>) -> Node {
        self.node(NodeKind::Literal).with_metadata("value", value)
    }

    pub fn binary(&mut self, left: Node, op: &str, right: Node) -> Node {
        self.node(NodeKind::Expression)
            .with_metadata("operator", op)
            .with_children([left, right])
    }

    pub fn unary(&mut self, op: &str, operand: Node) -> Node {
        self.node(NodeKind::Expression)
            .with_metadata("operator", op)
            .with_child(operand)
    }

    pub fn assign(&mut self, target: &str, value: Node) -> Node {
        self.node(NodeKind::Assignment)
            .with_name(target)
            .with_child(value)
    }

    pub fn call(&mut self, callee: &str, args: Vec<Node>) -> Node {
        self.node(NodeKind::Call)
            .with_name(callee)
            .with_children(args)
    }

    pub fn library_call(
        &mut self,
        callee: Option<&str>,
        dependency: LibraryDependency,
        args: Vec<Node>,
    ) -> Node {
        let node = self
            .node(NodeKind::LibraryCall)
            .with_library(dependency)
            .with_children(args);
        match callee {
            Some(callee) => node.with_name(callee),
            None => node,
        }
    }

    pub fn ret(&mut self, value: Option<Node>) -> Node {
        let node = self.node(NodeKind::Return);
        match value {
            Some(value) => node.with_child(value),
            None => node,
        }
    }

    pub fn conditional(&mut self, test: Node, then: Vec<Node>, otherwise: Option<Node>) -> Node {
        let then = self.block(then);
        let node = self
            .node(NodeKind::Conditional)
            .with_children([test, then]);
        match otherwise {
            Some(otherwise) => node.with_child(otherwise),
            None => node,
        }
    }

    pub fn while_loop(&mut self, test: Node, body: Vec<Node>) -> Node {
        let body = self.block(body);
        self.node(NodeKind::Loop)
            .with_metadata("form", "while")
            .with_children([test, body])
    }

    pub fn for_each(&mut self, var: &str, iterable: Node, body: Vec<Node>) -> Node {
        let body = self.block(body);
        self.node(NodeKind::Loop)
            .with_name(var)
            .with_metadata("form", "for_each")
            .with_children([iterable, body])
    }

    pub fn import(&mut self, module: &str, items: &[&str]) -> Node {
        let node = self.node(NodeKind::Import).with_name(module);
        if items.is_empty() {
            node
        } else {
            node.with_metadata(
                "items",
                Value::Array(items.iter().map(|i| Value::from(*i)).collect()),
            )
        }
    }

    pub fn export(&mut self, symbol: &str) -> Node {
        self.node(NodeKind::Export).with_name(symbol)
    }

    pub fn error(&mut self, message: &str) -> Node {
        self.node(NodeKind::Error).with_metadata("message", message)
    }
}
