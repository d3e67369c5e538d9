//! TypeScript writer.

use super::{
    Construct, Writer, binary_operator, escape_string, number_text, sanitize, unary_operator,
};
use serde_json::Value;

/// Static instance of the TypeScript writer for registry.
pub static TYPESCRIPT_WRITER: TypeScriptWriter = TypeScriptWriter;

pub struct TypeScriptWriter;

const KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

impl Writer for TypeScriptWriter {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extension(&self) -> &'static str {
        "ts"
    }

    fn indent_unit(&self) -> &'static str {
        "  "
    }

    fn comment(&self) -> &'static str {
        "//"
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }

    fn terminator(&self) -> &'static str {
        ";"
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
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
            Value::Object(map) if map.is_empty() => "{}".into(),
            Value::Object(map) => format!(
                "{{ {} }}",
                map.iter()
                    .map(|(k, v)| format!("{}: {}", property_key(k), self.literal(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn binary_op(&self, op: &str) -> Option<&'static str> {
        match op {
            "==" => Some("==="),
            "!=" => Some("!=="),
            "and" => Some("&&"),
            "or" => Some("||"),
            other => binary_operator(other),
        }
    }

    fn unary_op(&self, op: &str) -> Option<&'static str> {
        match op {
            "not" => Some("!"),
            other => unary_operator(other),
        }
    }

    fn declare(&self, name: &str, init: Option<&str>, mutable: bool) -> String {
        match init {
            Some(init) if !mutable => format!("const {name} = {init};"),
            Some(init) => format!("let {name} = {init};"),
            None => format!("let {name};"),
        }
    }

    fn field(&self, _owner: &str, name: &str, init: Option<&str>) -> String {
        match init {
            Some(init) => format!("{name} = {init};"),
            None => format!("{name};"),
        }
    }

    fn discard(&self, expr: &str) -> String {
        // A leading brace would open a block
        if expr.starts_with('{') {
            format!("({expr});")
        } else {
            format!("{expr};")
        }
    }

    fn noop(&self) -> &'static str {
        ";"
    }

    fn function_header(&self, name: &str, params: &[String], owner: Option<&str>) -> String {
        match owner {
            Some(_) => format!("{name}({}) {{", params.join(", ")),
            None => format!("function {name}({}) {{", params.join(", ")),
        }
    }

    fn class_header(&self, name: &str) -> String {
        format!("class {name} {{")
    }

    fn if_header(&self, condition: &str) -> String {
        format!("if ({condition}) {{")
    }

    fn else_if(&self, condition: &str) -> String {
        format!("}} else if ({condition}) {{")
    }

    fn else_line(&self) -> String {
        "} else {".into()
    }

    fn while_header(&self, condition: &str) -> String {
        format!("while ({condition}) {{")
    }

    fn for_each_header(&self, var: &str, iterable: &str) -> String {
        format!("for (const {var} of {iterable}) {{")
    }

    fn block_open(&self) -> Option<&'static str> {
        Some("{")
    }

    fn footer(&self, _construct: Construct) -> Option<&'static str> {
        Some("}")
    }

    fn import(&self, module: &str, items: &[String]) -> String {
        if items.is_empty() {
            let local = sanitize(module.rsplit(['.', '/']).next().unwrap_or(module));
            format!("import * as {local} from \"{}\";", escape_string(module))
        } else {
            format!(
                "import {{ {} }} from \"{}\";",
                items.join(", "),
                escape_string(module)
            )
        }
    }

    fn export(&self, name: &str) -> String {
        format!("export {{ {name} }};")
    }

    fn stub_call(&self, callee: &str, args: &[String], params: &[(String, String)]) -> String {
        let mut all: Vec<String> = args.to_vec();
        if !params.is_empty() {
            let fields: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}: {v}", property_key(k)))
                .collect();
            all.push(format!("{{ {} }}", fields.join(", ")));
        }
        format!("{callee}({})", all.join(", "))
    }
}

fn property_key(key: &str) -> String {
    if is_valid_identifier(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape_string(key))
    }
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
