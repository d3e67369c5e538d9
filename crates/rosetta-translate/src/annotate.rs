//! Annotated copy of a unit's IR.
//!
//! The input tree is never touched. The copy carries two appended metadata
//! keys on every participating node of an accepted match:
//! `rosetta.match` (pattern, category, stability, participants) and
//! `rosetta.resolution` (what the synthesizer did with it).

use crate::matcher::Match;
use crate::synth::Decision;
use rosetta_catalog::Catalog;
use rosetta_ir::{Node, TreeIndex};
use serde_json::json;
use tracing::warn;

pub const MATCH_KEY: &str = "rosetta.match";
pub const RESOLUTION_KEY: &str = "rosetta.resolution";

pub(crate) fn annotate(
    root: &Node,
    catalog: &Catalog,
    matches: &[Match],
    decisions: &[Option<Decision>],
) -> Node {
    let index = TreeIndex::build(root);
    let mut copy = root.clone();

    for (i, matched) in matches.iter().enumerate() {
        let pattern = &catalog.patterns()[matched.pattern];
        let participants: Vec<&str> = matched
            .roots
            .iter()
            .map(|&pos| index.node(pos).id.as_str())
            .collect();
        let match_value = json!({
            "pattern": pattern.id,
            "category": pattern.category,
            "stability": if pattern.is_preserve() { "preserve" } else { "modernize" },
            "participants": participants,
        });
        let resolution_value = match decisions.get(i).and_then(Option::as_ref) {
            Some(Decision::Substituted {
                template,
                priority,
                behavior_preserving,
            }) => json!({
                "status": "substituted",
                "template": template,
                "priority": priority,
                "behavior_preserving": behavior_preserving,
            }),
            Some(Decision::Fallback { reason }) => json!({
                "status": "fallback",
                "reason": reason,
            }),
            None => json!({ "status": "not_rendered" }),
        };

        for id in &participants {
            let Some(node) = copy.find_mut(id) else {
                continue;
            };
            for (key, value) in [
                (MATCH_KEY, match_value.clone()),
                (RESOLUTION_KEY, resolution_value.clone()),
            ] {
                if let Err(e) = node.append_metadata(key, value) {
                    warn!(error = %e, "skipping IR annotation");
                }
            }
        }
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::StructuralMatcher;
    use rosetta_ir::{GlobalSymbols, IdGen, SymbolTable};
    use serde_json::Value;

    #[test]
    fn test_pair_participants_are_annotated() {
        let catalog = Catalog::builtin().unwrap();
        let mut ids = IdGen::new("u");
        let size = ids.literal(16);
        let alloc = ids.call("malloc", vec![size]);
        let decl = ids.variable("buf", Some(alloc));
        let arg = ids.ident("buf");
        let release = ids.call("free", vec![arg]);
        let (decl_id, release_id) = (decl.id.clone(), release.id.clone());
        let root = ids.module("u", vec![decl, release]);

        let index = TreeIndex::build(&root);
        let symbols = GlobalSymbols::build([SymbolTable::build("u", &root)]);
        let set = StructuralMatcher::new(&catalog, 4).run(&index, &symbols, "u");
        let decisions = vec![Some(Decision::Fallback {
            reason: "no mapping".into(),
        })];

        let copy = annotate(&root, &catalog, &set.matches, &decisions);
        for id in [&decl_id, &release_id] {
            let node = copy.find(id.as_str()).unwrap();
            assert_eq!(node.metadata[MATCH_KEY]["pattern"], "heap-lifecycle");
            assert_eq!(node.metadata[MATCH_KEY]["stability"], "preserve");
            assert_eq!(node.metadata[RESOLUTION_KEY]["status"], "fallback");
        }
        // The input is untouched.
        assert!(root.walk().all(|n| !n.metadata.contains_key(MATCH_KEY)));
    }

    #[test]
    fn test_existing_keys_are_not_overwritten() {
        let catalog = Catalog::builtin().unwrap();
        let mut ids = IdGen::new("u");
        let decl = ids
            .variable("xs", None)
            .with_metadata("container", "std::vector")
            .with_metadata("type_arguments", vec!["int"])
            .with_metadata(MATCH_KEY, "from the front end");
        let root = ids.module("u", vec![decl]);

        let index = TreeIndex::build(&root);
        let symbols = GlobalSymbols::build([SymbolTable::build("u", &root)]);
        let set = StructuralMatcher::new(&catalog, 4).run(&index, &symbols, "u");
        let copy = annotate(&root, &catalog, &set.matches, &[None]);

        let node = &copy.children[0];
        assert_eq!(node.metadata[MATCH_KEY], Value::from("from the front end"));
        assert_eq!(node.metadata[RESOLUTION_KEY]["status"], "not_rendered");
    }
}
