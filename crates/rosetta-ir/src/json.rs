//! JSON serialization of IR trees.
//!
//! The wire shape is
//! `{id, kind, name?, children: [...], metadata: {...}, library_dependencies: [{library, pattern, parameters}]}`
//! and round-trips exactly on everything except formatting.

use crate::{IrError, Node};

pub fn to_json(node: &Node) -> Result<String, IrError> {
    Ok(serde_json::to_string(node)?)
}

pub fn to_json_pretty(node: &Node) -> Result<String, IrError> {
    Ok(serde_json::to_string_pretty(node)?)
}

/// Decode a tree and check that its ids are unique.
pub fn from_json(input: &str) -> Result<Node, IrError> {
    let node: Node = serde_json::from_str(input)?;
    node.validate()?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IdGen, LibraryDependency, NodeKind};

    #[test]
    fn test_wire_shape() {
        let mut ids = IdGen::new("m");
        let call = ids.library_call(
            None,
            LibraryDependency::new("stateA", "reactive-state").with_parameter("initial", "0"),
            vec![],
        );
        insta::assert_snapshot!(to_json(&call).unwrap(), @r#"{"id":"m#0","kind":"library_call","children":[],"metadata":{},"library_dependencies":[{"library":"stateA","pattern":"reactive-state","parameters":{"initial":"0"}}]}"#);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let node = from_json(r#"{"id":"a","kind":"block"}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Block);
        assert!(node.name.is_none());
        assert!(node.children.is_empty());
        assert!(node.metadata.is_empty());
        assert!(node.library_dependencies.is_empty());
    }

    #[test]
    fn test_rejects_unknown_kind_and_duplicates() {
        assert!(matches!(
            from_json(r#"{"id":"a","kind":"lambda"}"#),
            Err(IrError::Json(_))
        ));
        assert!(matches!(
            from_json(r#"{"id":"a","kind":"block","children":[{"id":"a","kind":"break"}]}"#),
            Err(IrError::DuplicateId(_))
        ));
    }
}
