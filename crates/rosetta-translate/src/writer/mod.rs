//! Target notation writers.
//!
//! A writer knows the surface syntax of one target notation: how a function
//! header looks, what closes a block, how to spell a literal. The
//! synthesizer owns the traversal and asks the
//! writer for each piece, so every writer renders every node kind.

#[cfg(feature = "write-lua")]
pub mod lua;
#[cfg(feature = "write-python")]
pub mod python;
#[cfg(feature = "write-typescript")]
pub mod typescript;

#[cfg(feature = "write-lua")]
pub use lua::{LUA_WRITER, LuaWriter};
#[cfg(feature = "write-python")]
pub use python::{PYTHON_WRITER, PythonWriter};
#[cfg(feature = "write-typescript")]
pub use typescript::{TYPESCRIPT_WRITER, TypeScriptWriter};

use serde_json::Value;

/// Compound constructs that open a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Function,
    Class,
    Conditional,
    Loop,
    Block,
}

pub trait Writer: Send + Sync {
    /// Language identifier (e.g., "python", "typescript").
    fn language(&self) -> &'static str;

    /// File extension for output (e.g., "py").
    fn extension(&self) -> &'static str;

    /// One level of indentation.
    fn indent_unit(&self) -> &'static str;

    /// Line comment marker.
    fn comment(&self) -> &'static str;

    /// Reserved words that cannot be used as identifiers.
    fn keywords(&self) -> &'static [&'static str];

    /// Suffix after simple statements (";" or nothing).
    fn terminator(&self) -> &'static str;

    /// One path segment with the characters the notation rejects replaced.
    fn sanitize_name(&self, name: &str) -> String {
        sanitize(name)
    }

    /// An identifier safe to emit: invalid characters become `_`, and
    /// reserved words get a trailing `_`. Dotted names are kept as paths.
    fn ident(&self, name: &str) -> String {
        name.split('.')
            .map(|part| {
                let mut clean = self.sanitize_name(part);
                if self.keywords().contains(&clean.as_str()) {
                    clean.push('_');
                }
                clean
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn literal(&self, value: &Value) -> String;

    /// Target spelling of a binary operator, or `None` when the operator
    /// is not one this writer knows.
    fn binary_op(&self, op: &str) -> Option<&'static str> {
        binary_operator(op)
    }

    /// Target spelling of a unary operator, including any space.
    fn unary_op(&self, op: &str) -> Option<&'static str> {
        unary_operator(op)
    }

    fn declare(&self, name: &str, init: Option<&str>, mutable: bool) -> String;

    /// Field declaration inside a class body.
    fn field(&self, owner: &str, name: &str, init: Option<&str>) -> String;

    fn assign(&self, target: &str, value: &str) -> String {
        format!("{target} = {value}{}", self.terminator())
    }

    fn ret(&self, value: Option<&str>) -> String {
        match value {
            Some(v) => format!("return {v}{}", self.terminator()),
            None => format!("return{}", self.terminator()),
        }
    }

    fn brk(&self) -> String {
        format!("break{}", self.terminator())
    }

    fn cont(&self) -> String {
        format!("continue{}", self.terminator())
    }

    /// A call used as a statement.
    fn expr_stmt(&self, expr: &str) -> String {
        format!("{expr}{}", self.terminator())
    }

    /// Any other expression used as a statement; its value is dropped.
    fn discard(&self, expr: &str) -> String {
        self.expr_stmt(expr)
    }

    /// A `return` that is not the last statement of its block.
    fn early_return(&self, value: Option<&str>) -> String {
        self.ret(value)
    }

    /// Label closing a loop body whose `continue` is spelled as a jump.
    fn continue_label(&self) -> Option<&'static str> {
        None
    }

    /// Statement that does nothing, for fallbacks with no other content.
    fn noop(&self) -> &'static str;

    /// Text for an empty body, if the notation needs one.
    fn empty_body(&self) -> Option<&'static str> {
        None
    }

    /// `owner` is the enclosing class for methods.
    fn function_header(&self, name: &str, params: &[String], owner: Option<&str>) -> String;
    fn class_header(&self, name: &str) -> String;
    fn if_header(&self, condition: &str) -> String;
    fn else_if(&self, condition: &str) -> String;
    fn else_line(&self) -> String;
    fn while_header(&self, condition: &str) -> String;
    fn for_each_header(&self, var: &str, iterable: &str) -> String;

    /// Opening line of a bare nested block, if the notation has one.
    fn block_open(&self) -> Option<&'static str>;

    /// Closing line of a construct, if the notation has one.
    fn footer(&self, construct: Construct) -> Option<&'static str>;

    /// Whether a class body is indented under its header.
    fn nests_class_members(&self) -> bool {
        true
    }

    /// Import statement lines.
    fn import(&self, module: &str, items: &[String]) -> String;

    /// Export of a top-level symbol.
    fn export(&self, name: &str) -> String;

    /// Call to a stand-in for an unmapped library call. Library parameters
    /// are passed by name.
    fn stub_call(&self, callee: &str, args: &[String], params: &[(String, String)]) -> String;
}

/// Canonical binary operators. Most notations spell them the same way.
pub const BINARY_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "==", "!=", "<", "<=", ">", ">=", "and", "or",
];

/// Canonical binary operator spelled as written.
pub fn binary_operator(op: &str) -> Option<&'static str> {
    BINARY_OPERATORS.iter().find(|known| **known == op).copied()
}

/// Canonical unary operator in its word form.
pub fn unary_operator(op: &str) -> Option<&'static str> {
    match op {
        "not" => Some("not "),
        "neg" => Some("-"),
        _ => None,
    }
}

/// Replace characters not allowed in identifiers with `_`.
pub fn sanitize(name: &str) -> String {
    sanitize_where(name, char::is_alphanumeric)
}

/// Like [`sanitize`], for notations whose identifiers are `[A-Za-z0-9_]`.
pub fn sanitize_ascii(name: &str) -> String {
    sanitize_where(name, |c| c.is_ascii_alphanumeric())
}

fn sanitize_where(name: &str, allowed: impl Fn(char) -> bool) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if allowed(c) || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Escape a string for a double-quoted literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Number as it appears in source: integral floats print without a fraction.
pub fn number_text(n: &serde_json::Number) -> String {
    if let Some(f) = n.as_f64()
        && n.is_f64()
        && f.is_finite()
        && f.fract() == 0.0
        && f.abs() < 1e15
    {
        return format!("{}", f as i64);
    }
    n.to_string()
}

/// Writers by language. Starts with every built-in writer.
pub struct WriterRegistry {
    writers: Vec<&'static dyn Writer>,
}

impl Default for WriterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        #[cfg(feature = "write-python")]
        registry.register(&PYTHON_WRITER);
        #[cfg(feature = "write-typescript")]
        registry.register(&TYPESCRIPT_WRITER);
        #[cfg(feature = "write-lua")]
        registry.register(&LUA_WRITER);
        registry
    }
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            writers: Vec::new(),
        }
    }

    /// Register a writer. Later registrations shadow earlier ones.
    pub fn register(&mut self, writer: &'static dyn Writer) {
        self.writers.push(writer);
    }

    pub fn get(&self, language: &str) -> Option<&'static dyn Writer> {
        self.writers
            .iter()
            .rev()
            .find(|w| w.language() == language)
            .copied()
    }

    pub fn languages(&self) -> Vec<&'static str> {
        let mut out: Vec<_> = self.writers.iter().map(|w| w.language()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
