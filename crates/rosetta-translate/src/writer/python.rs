//! Python writer.

use super::{Construct, Writer, escape_string, number_text};
use serde_json::Value;

/// Static instance of the Python writer for registry.
pub static PYTHON_WRITER: PythonWriter = PythonWriter;

pub struct PythonWriter;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

impl Writer for PythonWriter {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extension(&self) -> &'static str {
        "py"
    }

    fn indent_unit(&self) -> &'static str {
        "    "
    }

    fn comment(&self) -> &'static str {
        "#"
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }

    fn terminator(&self) -> &'static str {
        ""
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "None".into(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Number(n) => number_text(n),
            Value::String(s) => format!("\"{}\"", escape_string(s)),
            Value::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|v| self.literal(v))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Object(map) => format!(
                "{{{}}}",
                map.iter()
                    .map(|(k, v)| format!("\"{}\": {}", escape_string(k), self.literal(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn declare(&self, name: &str, init: Option<&str>, _mutable: bool) -> String {
        // Python has no declarations, just assignment
        format!("{name} = {}", init.unwrap_or("None"))
    }

    fn field(&self, _owner: &str, name: &str, init: Option<&str>) -> String {
        self.declare(name, init, true)
    }

    fn noop(&self) -> &'static str {
        "pass"
    }

    fn empty_body(&self) -> Option<&'static str> {
        Some("pass")
    }

    fn function_header(&self, name: &str, params: &[String], _owner: Option<&str>) -> String {
        format!("def {name}({}):", params.join(", "))
    }

    fn class_header(&self, name: &str) -> String {
        format!("class {name}:")
    }

    fn if_header(&self, condition: &str) -> String {
        format!("if {condition}:")
    }

    fn else_if(&self, condition: &str) -> String {
        format!("elif {condition}:")
    }

    fn else_line(&self) -> String {
        "else:".into()
    }

    fn while_header(&self, condition: &str) -> String {
        format!("while {condition}:")
    }

    fn for_each_header(&self, var: &str, iterable: &str) -> String {
        format!("for {var} in {iterable}:")
    }

    fn block_open(&self) -> Option<&'static str> {
        None
    }

    fn footer(&self, _construct: Construct) -> Option<&'static str> {
        None
    }

    fn import(&self, module: &str, items: &[String]) -> String {
        if items.is_empty() {
            format!("import {module}")
        } else {
            format!("from {module} import {}", items.join(", "))
        }
    }

    fn export(&self, name: &str) -> String {
        format!("# export: {name}")
    }

    fn stub_call(&self, callee: &str, args: &[String], params: &[(String, String)]) -> String {
        let all: Vec<String> = args
            .iter()
            .cloned()
            .chain(
                params
                    .iter()
                    .map(|(k, v)| format!("{}={v}", self.ident(&k.replace('.', "_")))),
            )
            .collect();
        format!("{callee}({})", all.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals() {
        let w = PythonWriter;
        assert_eq!(w.literal(&json!(null)), "None");
        assert_eq!(w.literal(&json!([1, true, "a\"b"])), "[1, True, \"a\\\"b\"]");
        assert_eq!(w.literal(&json!({"k": 2.5})), "{\"k\": 2.5}");
    }

    #[test]
    fn test_keyword_identifiers_are_escaped() {
        let w = PythonWriter;
        assert_eq!(w.ident("lambda"), "lambda_");
        assert_eq!(w.ident("os.path"), "os.path");
        assert_eq!(w.ident("my-var"), "my_var");
    }

    #[test]
    fn test_stub_call_uses_keywords() {
        let w = PythonWriter;
        let call = w.stub_call(
            "stateA_reactive_state",
            &["x".into()],
            &[("initial".into(), "0".into())],
        );
        assert_eq!(call, "stateA_reactive_state(x, initial=0)");
    }
}
