//! Confidence scoring.

use crate::result::Warning;
use crate::synth::Outcome;
use rosetta_ir::TreeIndex;

/// Share of decision nodes rendered without fallback.
///
/// Literal, import and export nodes are not decisions. Nodes the
/// synthesizer never reached (inside a substituted region that the template
/// did not reference) count as translated. An empty denominator scores 1.
pub(crate) fn confidence(index: &TreeIndex<'_>, outcomes: &[Option<Outcome>]) -> f64 {
    let mut decisions = 0usize;
    let mut resolved = 0usize;
    for pos in 0..index.len() {
        if !index.node(pos).kind.needs_decision() {
            continue;
        }
        decisions += 1;
        if outcomes.get(pos).copied().flatten() != Some(Outcome::Fallback) {
            resolved += 1;
        }
    }
    if decisions == 0 {
        1.0
    } else {
        resolved as f64 / decisions as f64
    }
}

/// Warnings ordered by node position, then by emission order.
pub(crate) fn order_warnings(mut warnings: Vec<(usize, Warning)>) -> Vec<Warning> {
    warnings.sort_by_key(|(pos, _)| *pos);
    warnings.into_iter().map(|(_, w)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::WarningKind;
    use rosetta_ir::{IdGen, LibraryDependency};

    #[test]
    fn test_literals_do_not_count() {
        let mut ids = IdGen::new("u");
        let one = ids.literal(1);
        let stub = ids.library_call(None, LibraryDependency::new("lib", "thing"), vec![one]);
        let root = ids.module("u", vec![stub]);
        let index = TreeIndex::build(&root);

        // module, library_call, literal
        let outcomes = vec![
            Some(Outcome::Structural),
            Some(Outcome::Fallback),
            Some(Outcome::Structural),
        ];
        assert_eq!(confidence(&index, &outcomes), 0.5);
    }

    #[test]
    fn test_nothing_to_decide_scores_one() {
        let mut ids = IdGen::new("u");
        let root = ids.literal("x");
        let index = TreeIndex::build(&root);
        assert_eq!(confidence(&index, &[None]), 1.0);
    }

    #[test]
    fn test_warning_order_is_stable() {
        let w = |id: &str, reason: &str| Warning::new(id.into(), WarningKind::UnmappedPattern, reason);
        let ordered = order_warnings(vec![
            (3, w("u#3", "late")),
            (1, w("u#1", "first")),
            (3, w("u#3", "later")),
            (1, w("u#1", "second")),
        ]);
        let reasons: Vec<_> = ordered.iter().map(|w| w.reason.as_str()).collect();
        assert_eq!(reasons, ["first", "second", "late", "later"]);
    }
}
