//! Rendering of a matched unit into target text.
//!
//! The synthesizer walks the unit depth-first in stored order. At the first
//! participating node of an accepted match it resolves a mapping and, if one
//! is found, emits the substituted template in place of every node the match
//! covers. Everything else is rendered structurally from its kind through the
//! target [`Writer`]. Structural output is always valid target syntax; what
//! cannot be translated faithfully is marked as a fallback and warned about.

use crate::CancelToken;
use crate::matcher::Match;
use crate::resolver::{Resolution, Resolver};
use crate::result::{Warning, WarningKind};
use crate::substitute::{
    BindingRenderer, NameScope, claim_fresh_names, instantiate, with_parameters,
};
use crate::writer::{Construct, Writer};
use rosetta_catalog::{Catalog, Pattern};
use rosetta_ir::{Node, NodeId, NodeKind, TreeIndex};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How a node ended up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Rendered directly from its kind.
    Structural,
    /// Covered by a match rendered through a mapping template.
    Substituted,
    /// Stand-in output for something that could not be translated.
    Fallback,
}

/// What happened to one accepted match.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Decision {
    Substituted {
        template: String,
        priority: i32,
        behavior_preserving: bool,
    },
    Fallback {
        reason: String,
    },
}

/// Everything the synthesizer reads.
pub(crate) struct Inputs<'s> {
    pub catalog: &'s Catalog,
    pub index: &'s TreeIndex<'s>,
    pub matches: &'s [Match],
    pub ecosystem: &'s str,
    /// Nodes a front-end diagnostic already reported.
    pub reported: &'s HashSet<NodeId>,
    pub cancel: &'s CancelToken,
}

pub(crate) struct Rendered {
    pub code: String,
    /// Per pre-order position; `None` for nodes never visited.
    pub outcomes: Vec<Option<Outcome>>,
    /// Warnings paired with the pre-order position of their node.
    pub warnings: Vec<(usize, Warning)>,
    /// Per accepted match; `None` when rendering never reached it.
    pub decisions: Vec<Option<Decision>>,
}

pub(crate) struct Synthesizer<'s> {
    writer: &'static dyn Writer,
    inputs: Inputs<'s>,
    resolver: Resolver<'s>,
    /// First participating node of each match.
    plans: HashMap<usize, usize>,
    resolutions: Vec<Option<Resolution<'s>>>,
    decisions: Vec<Option<Decision>>,
    /// Matches whose template is being filled right now.
    active: HashSet<usize>,
    /// Modernization hints for roots of unmapped matches.
    hints: HashMap<usize, String>,
    scope: NameScope,
    out: String,
    depth: usize,
    code_lines: usize,
    notes: Vec<String>,
    imports: Vec<String>,
    /// Mapping setup lines, after the imports.
    setup: Vec<String>,
    /// Mapping cleanup lines, after the body.
    cleanup: Vec<String>,
    outcomes: Vec<Option<Outcome>>,
    warnings: Vec<(usize, Warning)>,
    cancelled: bool,
}

impl<'s> Synthesizer<'s> {
    pub fn new(writer: &'static dyn Writer, inputs: Inputs<'s>, resolver: Resolver<'s>) -> Self {
        let plans = inputs
            .matches
            .iter()
            .enumerate()
            .map(|(i, m)| (m.first_root(), i))
            .collect();
        let names = inputs
            .index
            .root()
            .walk()
            .filter_map(|n| n.name().map(str::to_string));
        let len = inputs.index.len();
        let match_count = inputs.matches.len();

        Self {
            writer,
            resolver,
            plans,
            resolutions: vec![None; match_count],
            decisions: vec![None; match_count],
            active: HashSet::new(),
            hints: HashMap::new(),
            scope: NameScope::new(names),
            out: String::new(),
            depth: 0,
            code_lines: 0,
            notes: Vec::new(),
            imports: Vec::new(),
            setup: Vec::new(),
            cleanup: Vec::new(),
            outcomes: vec![None; len],
            warnings: Vec::new(),
            cancelled: false,
            inputs,
        }
    }

    /// Render the unit. `None` when the unit was cancelled part way.
    pub fn run(mut self) -> Option<Rendered> {
        let index = self.inputs.index;
        if index.root().kind == NodeKind::Module {
            self.mark(0, Outcome::Structural);
            self.statement_list(&index.children(0));
        } else {
            self.statement(0, true);
        }
        self.flush_notes();

        if self.cancelled {
            return None;
        }

        let mut code = String::new();
        for section in [&self.imports, &self.setup] {
            if !section.is_empty() {
                for line in section {
                    code.push_str(line);
                    code.push('\n');
                }
                code.push('\n');
            }
        }
        code.push_str(&self.out);
        if !self.cleanup.is_empty() {
            code.push('\n');
            for line in &self.cleanup {
                code.push_str(line);
                code.push('\n');
            }
        }

        debug!(
            language = self.writer.language(),
            substituted = self
                .decisions
                .iter()
                .filter(|d| matches!(d, Some(Decision::Substituted { .. })))
                .count(),
            warnings = self.warnings.len(),
            "synthesis done"
        );

        Some(Rendered {
            code,
            outcomes: self.outcomes,
            warnings: self.warnings,
            decisions: self.decisions,
        })
    }

    // -- bookkeeping ---------------------------------------------------------

    fn mark(&mut self, pos: usize, outcome: Outcome) {
        if self.outcomes[pos].is_none() {
            self.outcomes[pos] = Some(outcome);
        }
    }

    fn warn(&mut self, pos: usize, kind: WarningKind, reason: impl Into<String>) {
        let id = self.inputs.index.node(pos).id.clone();
        self.warnings.push((pos, Warning::new(id, kind, reason)));
    }

    fn comment(&self, text: &str) -> String {
        let flat: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!("{} {}", self.writer.comment(), flat)
    }

    // -- output --------------------------------------------------------------

    /// Emit one or more lines at the current depth, after pending notes.
    fn emit(&mut self, text: &str) {
        self.flush_notes();
        for line in text.lines() {
            self.push_line(line);
        }
    }

    fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str(self.writer.indent_unit());
        }
        self.out.push_str(line);
        self.out.push('\n');
        if !line.trim_start().starts_with(self.writer.comment()) {
            self.code_lines += 1;
        }
    }

    fn flush_notes(&mut self) {
        for note in std::mem::take(&mut self.notes) {
            let line = self.comment(&note);
            self.push_line(&line);
        }
    }

    /// Render into a fresh buffer at depth zero.
    fn capture(&mut self, f: impl FnOnce(&mut Self)) -> String {
        let out = std::mem::take(&mut self.out);
        let depth = std::mem::replace(&mut self.depth, 0);
        let notes = std::mem::take(&mut self.notes);
        f(self);
        self.flush_notes();
        self.notes = notes;
        self.depth = depth;
        let captured = std::mem::replace(&mut self.out, out);
        captured.trim_end_matches('\n').to_string()
    }

    /// Indented statement list, plus an optional closing line inside it.
    fn body(&mut self, stmts: &[usize], trailer: Option<&str>) {
        self.depth += 1;
        let before = self.code_lines;
        // A closing line after the statements means none of them ends the block.
        self.statements(stmts, trailer.is_none());
        if let Some(trailer) = trailer {
            self.emit(trailer);
        }
        self.flush_notes();
        if self.code_lines == before
            && let Some(empty) = self.writer.empty_body()
        {
            self.emit(empty);
        }
        self.depth -= 1;
    }

    fn footer(&mut self, construct: Construct) {
        if let Some(footer) = self.writer.footer(construct) {
            self.emit(footer);
        }
    }

    // -- matches -------------------------------------------------------------

    /// Substituted text for the match starting at `pos`, with the end of the
    /// region it covers.
    fn try_substitute(&mut self, pos: usize) -> Option<(String, usize)> {
        let &m = self.plans.get(&pos)?;
        if self.active.contains(&m) || matches!(self.decisions[m], Some(Decision::Fallback { .. }))
        {
            return None;
        }

        let (matches, catalog) = (self.inputs.matches, self.inputs.catalog);
        let matched = &matches[m];
        let pattern = &catalog.patterns()[matched.pattern];
        let mapping = match self.resolve(m, pattern) {
            Resolution::Resolved(mapping) => mapping,
            Resolution::Unmapped(reason) => {
                let reason = format!(
                    "{} ({}) has no {} mapping: {reason}",
                    self.subject(matched, pattern),
                    pattern.category,
                    self.inputs.ecosystem
                );
                self.fall_back(m, pattern, WarningKind::UnmappedPattern, reason);
                return None;
            }
        };

        let bindings = with_parameters(&matched.bindings, &mapping.parameters);
        let w = self.writer;
        let fresh = match claim_fresh_names(
            &mapping.template,
            &bindings,
            &mut self.scope,
            |name| w.ident(name),
        ) {
            Ok(fresh) => fresh,
            Err(err) => {
                let reason = format!(
                    "mapping {} -> {}: {err}",
                    mapping.source_category, mapping.target_ecosystem
                );
                self.fall_back(m, pattern, WarningKind::TemplateBindingError, reason);
                return None;
            }
        };

        self.active.insert(m);
        let text = instantiate(&mapping.template, &bindings, &fresh, self);
        self.active.remove(&m);

        for &root in &matched.roots {
            self.outcomes[root] = Some(Outcome::Substituted);
        }
        for covered in matched.covered.clone() {
            self.mark(covered, Outcome::Substituted);
        }
        for (hoisted, lines) in [
            (&mut self.imports, &mapping.imports),
            (&mut self.setup, &mapping.setup),
            (&mut self.cleanup, &mapping.cleanup),
        ] {
            for line in lines {
                if !hoisted.contains(line) {
                    hoisted.push(line.clone());
                }
            }
        }
        if self.decisions[m].is_none() {
            debug!(pattern = %pattern.id, ecosystem = self.inputs.ecosystem, "substituted");
            self.decisions[m] = Some(Decision::Substituted {
                template: mapping.template.source().to_string(),
                priority: mapping.priority,
                behavior_preserving: mapping.behavior_preserving,
            });
        }
        Some((text, matched.covered.end))
    }

    fn resolve(&mut self, m: usize, pattern: &Pattern) -> Resolution<'s> {
        if let Some(resolution) = &self.resolutions[m] {
            return resolution.clone();
        }
        let (resolution, tie) = self.resolver.resolve(pattern, self.inputs.ecosystem);
        if let Some(tie) = tie {
            let first = self.inputs.matches[m].first_root();
            self.warn(
                first,
                WarningKind::AmbiguousMatch,
                format!(
                    "{} mappings for {} -> {} share priority {}; using the first in catalog order",
                    tie.candidates, pattern.category, self.inputs.ecosystem, tie.priority
                ),
            );
        }
        self.resolutions[m] = Some(resolution.clone());
        resolution
    }

    fn subject(&self, matched: &Match, pattern: &Pattern) -> String {
        let root = self.inputs.index.node(matched.first_root());
        match (root.kind, root.library_dependencies.first()) {
            (NodeKind::LibraryCall, Some(dep)) => {
                format!("library call {}:{}", dep.library, dep.pattern)
            }
            _ => format!("pattern {}", pattern.id),
        }
    }

    fn fall_back(&mut self, m: usize, pattern: &Pattern, kind: WarningKind, reason: String) {
        let matches = self.inputs.matches;
        let matched = &matches[m];
        for &root in &matched.roots {
            self.outcomes[root] = Some(Outcome::Fallback);
            if let Some(hint) = &pattern.hint {
                self.hints.insert(root, hint.clone());
            }
        }
        debug!(pattern = %pattern.id, %reason, "falling back to structural rendering");
        self.warn(matched.first_root(), kind, reason.clone());
        self.decisions[m] = Some(Decision::Fallback { reason });
    }

    // -- statements ----------------------------------------------------------

    fn statement_list(&mut self, items: &[usize]) {
        self.statements(items, true);
    }

    /// `ends_block` is false when more output follows `items` in the same
    /// block, so a trailing `return` is not the last statement.
    fn statements(&mut self, items: &[usize], ends_block: bool) {
        let mut resume = 0;
        for (i, &pos) in items.iter().enumerate() {
            if self.inputs.cancel.is_cancelled() {
                self.cancelled = true;
                return;
            }
            if pos < resume {
                continue;
            }
            if let Some(end) = self.statement(pos, ends_block && i + 1 == items.len()) {
                resume = end;
            }
        }
    }

    /// Render one statement. Returns the end of the region a substituted
    /// match consumed, so the caller can skip the siblings it covered.
    fn statement(&mut self, pos: usize, last: bool) -> Option<usize> {
        if let Some((text, end)) = self.try_substitute(pos) {
            let text = if self.inputs.index.node(pos).kind.is_expression() {
                self.writer.expr_stmt(&text)
            } else {
                text
            };
            self.emit(&text);
            return Some(end);
        }
        self.structural_statement(pos, last);
        None
    }

    fn structural_statement(&mut self, pos: usize, last: bool) {
        let index = self.inputs.index;
        let w = self.writer;
        let node = index.node(pos);

        let in_class = index
            .parent(pos)
            .is_some_and(|p| index.node(p).kind == NodeKind::Class);
        if in_class {
            self.member(pos);
            return;
        }

        match node.kind {
            NodeKind::Module | NodeKind::Block => {
                self.mark(pos, Outcome::Structural);
                let children = index.children(pos);
                match w.block_open() {
                    Some(open) => {
                        self.emit(open);
                        self.body(&children, None);
                        self.footer(Construct::Block);
                    }
                    None => self.statement_list(&children),
                }
            }
            NodeKind::Function => self.function(pos, None),
            NodeKind::Class => self.class(pos),
            NodeKind::Parameter | NodeKind::Variable => {
                self.mark(pos, Outcome::Structural);
                let name = self.decl_name(node);
                let init = self.first_expr(pos);
                let mutable = node.meta_bool("mutable").unwrap_or(true);
                self.emit(&w.declare(&name, init.as_deref(), mutable));
            }
            NodeKind::Assignment => {
                self.mark(pos, Outcome::Structural);
                let target = w.ident(node.name().unwrap_or("_"));
                let value = self
                    .first_expr(pos)
                    .unwrap_or_else(|| w.literal(&Value::Null));
                self.emit(&w.assign(&target, &value));
            }
            NodeKind::Conditional => self.conditional(pos),
            NodeKind::Loop => self.loop_statement(pos),
            NodeKind::Return => {
                self.mark(pos, Outcome::Structural);
                let value = self.first_expr(pos);
                let line = if last {
                    w.ret(value.as_deref())
                } else {
                    w.early_return(value.as_deref())
                };
                self.emit(&line);
            }
            NodeKind::Break => {
                self.mark(pos, Outcome::Structural);
                self.emit(&w.brk());
            }
            NodeKind::Continue => {
                self.mark(pos, Outcome::Structural);
                self.emit(&w.cont());
            }
            NodeKind::Import => {
                self.mark(pos, Outcome::Structural);
                let items: Vec<String> = node
                    .metadata
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(|item| w.ident(item))
                            .collect()
                    })
                    .unwrap_or_default();
                self.emit(&w.import(node.name().unwrap_or("_"), &items));
            }
            NodeKind::Export => {
                self.mark(pos, Outcome::Structural);
                self.emit(&w.export(&w.ident(node.name().unwrap_or("_"))));
            }
            NodeKind::Error => self.error_statement(pos),
            NodeKind::Call | NodeKind::LibraryCall => {
                let call = self.structural_expr(pos);
                self.emit(&w.expr_stmt(&call));
            }
            NodeKind::Identifier | NodeKind::Expression | NodeKind::Literal => {
                let expr = self.structural_expr(pos);
                self.emit(&w.discard(&expr));
            }
        }
    }

    fn decl_name(&self, node: &Node) -> String {
        self.writer
            .ident(&node.name().unwrap_or("_").replace('.', "_"))
    }

    fn first_expr(&mut self, pos: usize) -> Option<String> {
        let first = *self.inputs.index.children(pos).first()?;
        Some(self.expr(first))
    }

    /// Statements of a body child: a plain block is flattened, anything
    /// else is a single statement.
    fn block_statements(&mut self, pos: usize) -> Vec<usize> {
        let index = self.inputs.index;
        if index.node(pos).kind == NodeKind::Block && !self.plans.contains_key(&pos) {
            self.mark(pos, Outcome::Structural);
            index.children(pos)
        } else {
            vec![pos]
        }
    }

    fn function(&mut self, pos: usize, owner: Option<&str>) {
        let index = self.inputs.index;
        let node = index.node(pos);
        self.mark(pos, Outcome::Structural);

        let mut params = Vec::new();
        let mut rest = Vec::new();
        for child in index.children(pos) {
            let child_node = index.node(child);
            if child_node.kind == NodeKind::Parameter {
                self.mark(child, Outcome::Structural);
                params.push(self.decl_name(child_node));
            } else {
                rest.push(child);
            }
        }

        let stmts = match rest.as_slice() {
            [only] => self.block_statements(*only),
            _ => rest,
        };

        let name = self.decl_name(node);
        self.emit(&self.writer.function_header(&name, &params, owner));
        self.body(&stmts, None);
        self.footer(Construct::Function);
    }

    fn class(&mut self, pos: usize) {
        let index = self.inputs.index;
        self.mark(pos, Outcome::Structural);
        let name = self.decl_name(index.node(pos));
        self.emit(&self.writer.class_header(&name));
        let members = index.children(pos);
        if self.writer.nests_class_members() {
            self.body(&members, None);
        } else {
            self.statement_list(&members);
        }
        self.footer(Construct::Class);
    }

    fn member(&mut self, pos: usize) {
        let index = self.inputs.index;
        let node = index.node(pos);
        let owner = index
            .parent(pos)
            .map(|p| self.decl_name(index.node(p)))
            .unwrap_or_default();

        match node.kind {
            NodeKind::Function => self.function(pos, Some(&owner)),
            NodeKind::Variable | NodeKind::Parameter => {
                self.mark(pos, Outcome::Structural);
                let name = self.decl_name(node);
                let init = self.first_expr(pos);
                self.emit(&self.writer.field(&owner, &name, init.as_deref()));
            }
            NodeKind::Error => self.error_statement(pos),
            other => {
                self.outcomes[pos] = Some(Outcome::Fallback);
                self.warn(
                    pos,
                    WarningKind::UnmappedPattern,
                    format!("{other} node cannot be rendered as a member of {owner}"),
                );
                let line = self.comment(&format!("untranslated {other} member"));
                self.emit(&line);
            }
        }
    }

    fn conditional(&mut self, pos: usize) {
        let index = self.inputs.index;
        let w = self.writer;
        self.mark(pos, Outcome::Structural);

        let children = index.children(pos);
        let test = self.condition(children.first().copied());
        self.emit(&w.if_header(&test));
        let then = children
            .get(1)
            .map(|&c| self.block_statements(c))
            .unwrap_or_default();
        self.body(&then, None);

        let mut otherwise = children.get(2).copied();
        while let Some(alt) = otherwise {
            if index.node(alt).kind == NodeKind::Conditional && !self.plans.contains_key(&alt) {
                self.mark(alt, Outcome::Structural);
                let alt_children = index.children(alt);
                let test = self.condition(alt_children.first().copied());
                self.emit(&w.else_if(&test));
                let then = alt_children
                    .get(1)
                    .map(|&c| self.block_statements(c))
                    .unwrap_or_default();
                self.body(&then, None);
                otherwise = alt_children.get(2).copied();
            } else {
                self.emit(&w.else_line());
                let stmts = self.block_statements(alt);
                self.body(&stmts, None);
                otherwise = None;
            }
        }
        self.footer(Construct::Conditional);
    }

    fn condition(&mut self, pos: Option<usize>) -> String {
        match pos {
            Some(pos) => self.expr(pos),
            None => self.writer.literal(&Value::Bool(true)),
        }
    }

    fn loop_statement(&mut self, pos: usize) {
        let index = self.inputs.index;
        let w = self.writer;
        let node = index.node(pos);
        self.mark(pos, Outcome::Structural);

        let children = index.children(pos);
        let for_each = match node.meta_str("form") {
            Some("for_each") => true,
            Some(_) => false,
            None => node.name().is_some(),
        };
        let header = if for_each {
            let var = self.decl_name(node);
            let iterable = match children.first() {
                Some(&c) => self.expr(c),
                None => w.literal(&Value::Array(Vec::new())),
            };
            w.for_each_header(&var, &iterable)
        } else {
            let test = self.condition(children.first().copied());
            w.while_header(&test)
        };
        self.emit(&header);

        let stmts = children
            .get(1)
            .map(|&c| self.block_statements(c))
            .unwrap_or_default();
        let label = w.continue_label().filter(|_| self.continues_to(pos));
        self.body(&stmts, label);
        self.footer(Construct::Loop);
    }

    /// Whether a `continue` inside `loop_pos` targets it.
    fn continues_to(&self, loop_pos: usize) -> bool {
        let index = self.inputs.index;
        index.subtree(loop_pos).any(|p| {
            index.node(p).kind == NodeKind::Continue
                && index
                    .ancestors(p)
                    .find(|&a| matches!(index.node(a).kind, NodeKind::Loop | NodeKind::Function))
                    == Some(loop_pos)
        })
    }

    fn error_statement(&mut self, pos: usize) {
        let message = self.error_fallback(pos);
        let line = self.comment(&format!("untranslated: {message}"));
        self.emit(&line);
        self.emit(self.writer.noop());
    }

    /// Record an error leaf as a fallback and return its message.
    fn error_fallback(&mut self, pos: usize) -> String {
        let node = self.inputs.index.node(pos);
        let message = node
            .meta_str("message")
            .unwrap_or("unparseable source")
            .to_string();
        self.outcomes[pos] = Some(Outcome::Fallback);
        if !self.inputs.reported.contains(&node.id) {
            self.warn(pos, WarningKind::ParseDiagnostic, message.clone());
        }
        message
    }

    // -- expressions ---------------------------------------------------------

    fn expr(&mut self, pos: usize) -> String {
        if let Some((text, _)) = self.try_substitute(pos) {
            return text;
        }
        self.structural_expr(pos)
    }

    fn structural_expr(&mut self, pos: usize) -> String {
        let index = self.inputs.index;
        let w = self.writer;
        let node = index.node(pos);

        match node.kind {
            NodeKind::Identifier => {
                self.mark(pos, Outcome::Structural);
                w.ident(node.name().unwrap_or("_"))
            }
            NodeKind::Literal => {
                self.mark(pos, Outcome::Structural);
                w.literal(node.metadata.get("value").unwrap_or(&Value::Null))
            }
            NodeKind::Expression => self.operation(pos),
            NodeKind::Call => {
                self.mark(pos, Outcome::Structural);
                let callee = w.ident(node.name().unwrap_or("_"));
                let args = self.args(pos);
                format!("{callee}({})", args.join(", "))
            }
            NodeKind::LibraryCall => self.library_stub(pos),
            NodeKind::Error => {
                let message = self.error_fallback(pos);
                self.notes.push(format!("untranslated: {message}"));
                w.literal(&Value::Null)
            }
            other => {
                self.outcomes[pos] = Some(Outcome::Fallback);
                self.warn(
                    pos,
                    WarningKind::UnmappedPattern,
                    format!("{other} node cannot be rendered as an expression"),
                );
                self.notes.push(format!("untranslated {other} expression"));
                w.literal(&Value::Null)
            }
        }
    }

    fn operation(&mut self, pos: usize) -> String {
        let index = self.inputs.index;
        let w = self.writer;
        let node = index.node(pos);
        let children = index.children(pos);

        let Some(op) = node.operator() else {
            if let [only] = children.as_slice() {
                self.mark(pos, Outcome::Structural);
                return self.expr(*only);
            }
            self.outcomes[pos] = Some(Outcome::Fallback);
            self.warn(pos, WarningKind::ParseDiagnostic, "expression without operator");
            return w.literal(&Value::Null);
        };

        match children.as_slice() {
            [] => {
                self.outcomes[pos] = Some(Outcome::Fallback);
                self.warn(pos, WarningKind::ParseDiagnostic, "expression without operands");
                w.literal(&Value::Null)
            }
            [operand] => {
                let Some(spelled) = w.unary_op(op) else {
                    return self.unknown_operator(pos, op);
                };
                self.mark(pos, Outcome::Structural);
                let text = self.operand(*operand);
                if text.starts_with('-') {
                    format!("{spelled}({text})")
                } else {
                    format!("{spelled}{text}")
                }
            }
            [first, rest @ ..] => {
                let Some(spelled) = w.binary_op(op) else {
                    return self.unknown_operator(pos, op);
                };
                self.mark(pos, Outcome::Structural);
                let mut text = self.operand(*first);
                for &operand in rest {
                    let right = self.operand(operand);
                    text = format!("{text} {spelled} {right}");
                }
                text
            }
        }
    }

    /// Operators outside the writer's table are never emitted as written.
    fn unknown_operator(&mut self, pos: usize, op: &str) -> String {
        self.outcomes[pos] = Some(Outcome::Fallback);
        self.warn(
            pos,
            WarningKind::UnmappedPattern,
            format!("operator {op:?} has no {} spelling", self.writer.language()),
        );
        self.notes.push(format!("untranslated expression with operator {op:?}"));
        self.writer.literal(&Value::Null)
    }

    fn operand(&mut self, pos: usize) -> String {
        let text = self.expr(pos);
        if self.inputs.index.node(pos).kind == NodeKind::Expression {
            format!("({text})")
        } else {
            text
        }
    }

    fn args(&mut self, pos: usize) -> Vec<String> {
        self.inputs
            .index
            .children(pos)
            .into_iter()
            .map(|c| self.expr(c))
            .collect()
    }

    /// Stand-in call for a library call no mapping covers, with a comment
    /// naming the library and pattern.
    fn library_stub(&mut self, pos: usize) -> String {
        let index = self.inputs.index;
        let w = self.writer;
        let node = index.node(pos);
        let dep = node.library_dependencies.first();
        let label = dep
            .map(|d| format!("{}:{}", d.library, d.pattern))
            .unwrap_or_else(|| "unknown library".to_string());

        // Roots of unmapped matches were already warned about.
        if self.outcomes[pos] != Some(Outcome::Fallback) {
            self.outcomes[pos] = Some(Outcome::Fallback);
            self.warn(
                pos,
                WarningKind::UnmappedPattern,
                format!("library call {label} matches no known pattern"),
            );
        }
        let hint = self
            .hints
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| format!("no {} equivalent known", self.inputs.ecosystem));
        self.notes.push(format!("unmapped {label}: {hint}"));

        let callee = match (node.name(), dep) {
            (Some(name), _) => w.ident(name),
            (None, Some(d)) => w.ident(&format!("{}_{}", d.library, d.pattern).replace('.', "_")),
            (None, None) => w.ident("unknown_library_call"),
        };
        let args = self.args(pos);
        let params: Vec<(String, String)> = dep
            .map(|d| {
                d.parameters
                    .iter()
                    .map(|(k, v)| (k.clone(), self.param_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        w.stub_call(&callee, &args, &params)
    }

    /// Library parameters are strings. Scalar JSON (numbers, booleans, null,
    /// quoted strings) becomes the matching literal; anything else is quoted
    /// verbatim.
    fn param_value(&self, raw: &str) -> String {
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null | Value::String(_))) => {
                self.writer.literal(&value)
            }
            _ => self.writer.literal(&Value::String(raw.to_string())),
        }
    }
}

impl BindingRenderer for Synthesizer<'_> {
    fn render_node(&mut self, id: &NodeId) -> String {
        let index = self.inputs.index;
        let Some(pos) = index.position(id.as_str()) else {
            return self.writer.literal(&Value::Null);
        };
        let node = index.node(pos);

        if node.kind == NodeKind::Block && !self.plans.contains_key(&pos) {
            self.mark(pos, Outcome::Structural);
            let children = index.children(pos);
            return self.render_positions(&children);
        }

        let statement_position = index
            .parent(pos)
            .is_some_and(|p| matches!(index.node(p).kind, NodeKind::Block | NodeKind::Module));
        if node.kind.is_expression() && !statement_position {
            self.expr(pos)
        } else {
            self.capture(|s| {
                s.statement(pos, true);
            })
        }
    }

    fn render_statements(&mut self, ids: &[NodeId]) -> String {
        let index = self.inputs.index;
        let positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| index.position(id.as_str()))
            .collect();
        self.render_positions(&positions)
    }

    fn render_args(&mut self, ids: &[NodeId]) -> String {
        let index = self.inputs.index;
        ids.iter()
            .filter_map(|id| index.position(id.as_str()))
            .map(|pos| self.expr(pos))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn empty_body(&self) -> &'static str {
        self.writer.empty_body().unwrap_or("")
    }

    fn ident(&self, name: &str) -> String {
        self.writer.ident(name)
    }
}

impl Synthesizer<'_> {
    fn render_positions(&mut self, positions: &[usize]) -> String {
        let before = self.code_lines;
        let text = self.capture(|s| s.statement_list(positions));
        if self.code_lines == before {
            match self.writer.empty_body() {
                Some(empty) if text.is_empty() => empty.to_string(),
                Some(empty) => format!("{text}\n{empty}"),
                None => text,
            }
        } else {
            text
        }
    }
}
