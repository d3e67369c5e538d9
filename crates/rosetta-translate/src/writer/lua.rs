//! Lua writer.

use super::{Construct, Writer, binary_operator, escape_string, number_text, sanitize_ascii};
use serde_json::Value;

/// Static instance of the Lua writer for registry.
pub static LUA_WRITER: LuaWriter = LuaWriter;

pub struct LuaWriter;

const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

impl Writer for LuaWriter {
    fn language(&self) -> &'static str {
        "lua"
    }

    fn extension(&self) -> &'static str {
        "lua"
    }

    fn indent_unit(&self) -> &'static str {
        "  "
    }

    fn comment(&self) -> &'static str {
        "--"
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }

    fn sanitize_name(&self, name: &str) -> String {
        sanitize_ascii(name)
    }

    fn terminator(&self) -> &'static str {
        ""
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "nil".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_text(n),
            Value::String(s) => format!("\"{}\"", escape_string(s)),
            Value::Array(items) => format!(
                "{{{}}}",
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
                    .map(|(k, v)| format!("{} = {}", table_key(k), self.literal(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn binary_op(&self, op: &str) -> Option<&'static str> {
        match op {
            "!=" => Some("~="),
            other => binary_operator(other),
        }
    }

    fn declare(&self, name: &str, init: Option<&str>, _mutable: bool) -> String {
        match init {
            Some(init) => format!("local {name} = {init}"),
            None => format!("local {name}"),
        }
    }

    fn field(&self, owner: &str, name: &str, init: Option<&str>) -> String {
        format!("{owner}.{name} = {}", init.unwrap_or("nil"))
    }

    fn cont(&self) -> String {
        "goto continue".into()
    }

    fn continue_label(&self) -> Option<&'static str> {
        Some("::continue::")
    }

    fn discard(&self, expr: &str) -> String {
        // Only calls may stand alone as statements
        format!("local _ = {expr}")
    }

    fn early_return(&self, value: Option<&str>) -> String {
        match value {
            Some(v) => format!("do return {v} end"),
            None => "do return end".into(),
        }
    }

    fn noop(&self) -> &'static str {
        "do end"
    }

    fn function_header(&self, name: &str, params: &[String], owner: Option<&str>) -> String {
        match owner {
            Some(owner) => format!("function {owner}.{name}({})", params.join(", ")),
            None => format!("local function {name}({})", params.join(", ")),
        }
    }

    fn class_header(&self, name: &str) -> String {
        format!("local {name} = {{}}")
    }

    fn if_header(&self, condition: &str) -> String {
        format!("if {condition} then")
    }

    fn else_if(&self, condition: &str) -> String {
        format!("elseif {condition} then")
    }

    fn else_line(&self) -> String {
        "else".into()
    }

    fn while_header(&self, condition: &str) -> String {
        format!("while {condition} do")
    }

    fn for_each_header(&self, var: &str, iterable: &str) -> String {
        format!("for _, {var} in ipairs({iterable}) do")
    }

    fn block_open(&self) -> Option<&'static str> {
        Some("do")
    }

    fn footer(&self, construct: Construct) -> Option<&'static str> {
        match construct {
            Construct::Class => None,
            _ => Some("end"),
        }
    }

    fn nests_class_members(&self) -> bool {
        false
    }

    fn import(&self, module: &str, items: &[String]) -> String {
        let path = escape_string(module);
        if items.is_empty() {
            let local = self.ident(module.rsplit(['.', '/']).next().unwrap_or(module));
            format!("local {local} = require(\"{path}\")")
        } else {
            items
                .iter()
                .map(|item| format!("local {item} = require(\"{path}\").{item}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    fn export(&self, name: &str) -> String {
        format!("-- export: {name}")
    }

    fn stub_call(&self, callee: &str, args: &[String], params: &[(String, String)]) -> String {
        let mut all: Vec<String> = args.to_vec();
        if !params.is_empty() {
            let fields: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{} = {v}", table_key(k)))
                .collect();
            all.push(format!("{{ {} }}", fields.join(", ")));
        }
        format!("{callee}({})", all.join(", "))
    }
}

fn table_key(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&key);
    if plain {
        key.to_string()
    } else {
        format!("[\"{}\"]", escape_string(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tables() {
        let w = LuaWriter;
        assert_eq!(w.literal(&json!([1, 2])), "{1, 2}");
        assert_eq!(
            w.literal(&json!({"end": true, "x": null})),
            "{ [\"end\"] = true, x = nil }"
        );
    }

    #[test]
    fn test_statements_that_lua_restricts() {
        let w = LuaWriter;
        assert_eq!(w.discard("a + b"), "local _ = a + b");
        assert_eq!(w.early_return(Some("x")), "do return x end");
        assert_eq!(w.binary_op("!="), Some("~="));
        assert_eq!(w.binary_op("xor"), None);
    }

    #[test]
    fn test_identifiers_are_ascii() {
        let w = LuaWriter;
        assert_eq!(w.ident("café"), "caf_");
        assert_eq!(w.ident("x²"), "x_");
        assert_eq!(w.ident("end"), "end_");
        assert_eq!(w.import("lib/données", &[]), "local donn_es = require(\"lib/données\")");
    }

    #[test]
    fn test_function_headers() {
        let w = LuaWriter;
        assert_eq!(
            w.function_header("add", &["a".into(), "b".into()], None),
            "local function add(a, b)"
        );
        assert_eq!(
            w.function_header("run", &["self".into()], Some("Runner")),
            "function Runner.run(self)"
        );
    }
}
