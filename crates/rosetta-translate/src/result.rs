//! Translation results and warnings.

use rosetta_ir::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Reported by the front end while lowering source text.
    ParseDiagnostic,
    /// No usable mapping; the node was rendered structurally.
    UnmappedPattern,
    /// A mapping's template referenced a placeholder the match never bound.
    TemplateBindingError,
    /// Several candidates tied and one was picked by catalog order.
    AmbiguousMatch,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningKind::ParseDiagnostic => "parse-diagnostic",
            WarningKind::UnmappedPattern => "unmapped-pattern",
            WarningKind::TemplateBindingError => "template-binding-error",
            WarningKind::AmbiguousMatch => "ambiguous-match",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub node_id: NodeId,
    pub kind: WarningKind,
    pub reason: String,
}

impl Warning {
    pub fn new(node_id: NodeId, kind: WarningKind, reason: impl Into<String>) -> Self {
        Self {
            node_id,
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.node_id, self.kind, self.reason)
    }
}

/// Rendered code for one unit with its accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub code: String,
    /// Share of decision nodes rendered without fallback, in `[0, 1]`.
    pub confidence: f64,
    pub warnings: Vec<Warning>,
}

/// Diagnostic reported by a front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Node the diagnostic belongs to; the unit root when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub message: String,
}

/// Per-unit outcome of a translation request.
#[derive(Debug, Clone)]
pub enum UnitOutcome {
    Translated {
        unit: String,
        result: TranslationResult,
        /// Copy of the unit IR with match and resolution metadata appended,
        /// when `engine.annotate_ir` is set.
        annotated: Option<Node>,
    },
    Cancelled {
        unit: String,
    },
}

impl UnitOutcome {
    pub fn unit(&self) -> &str {
        match self {
            UnitOutcome::Translated { unit, .. } | UnitOutcome::Cancelled { unit } => unit,
        }
    }

    pub fn result(&self) -> Option<&TranslationResult> {
        match self {
            UnitOutcome::Translated { result, .. } => Some(result),
            UnitOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, UnitOutcome::Cancelled { .. })
    }
}
