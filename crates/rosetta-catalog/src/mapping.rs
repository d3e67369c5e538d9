//! Cross-ecosystem mappings.

use crate::{Template, TemplateSyntaxError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSpec {
    pub source_category: String,
    pub target_ecosystem: String,
    pub template: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub behavior_preserving: bool,
    /// Lines hoisted to the top of the unit when this mapping is used.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Lines placed after the imports, before the unit body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<String>,
    /// Lines placed after the unit body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup: Vec<String>,
    /// Template placeholder -> binding it reads, for placeholders named
    /// differently from the source pattern's bindings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// A mapping with its template parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub source_category: String,
    pub target_ecosystem: String,
    pub template: Template,
    pub priority: i32,
    pub behavior_preserving: bool,
    pub imports: Vec<String>,
    pub setup: Vec<String>,
    pub cleanup: Vec<String>,
    pub parameters: BTreeMap<String, String>,
    /// Position in the loaded catalog. Mappings from outside the catalog
    /// (e.g. a ranking service) sort last.
    pub order: usize,
}

impl Mapping {
    pub fn new(
        source_category: impl Into<String>,
        target_ecosystem: impl Into<String>,
        template: &str,
    ) -> Result<Self, TemplateSyntaxError> {
        Ok(Self {
            source_category: source_category.into(),
            target_ecosystem: target_ecosystem.into(),
            template: Template::parse(template)?,
            priority: 0,
            behavior_preserving: false,
            imports: Vec::new(),
            setup: Vec::new(),
            cleanup: Vec::new(),
            parameters: BTreeMap::new(),
            order: usize::MAX,
        })
    }

    pub fn from_spec(spec: MappingSpec, order: usize) -> Result<Self, TemplateSyntaxError> {
        Ok(Self {
            template: Template::parse(&spec.template)?,
            source_category: spec.source_category,
            target_ecosystem: spec.target_ecosystem,
            priority: spec.priority,
            behavior_preserving: spec.behavior_preserving,
            imports: spec.imports,
            setup: spec.setup,
            cleanup: spec.cleanup,
            parameters: spec.parameters,
            order,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn behavior_preserving(mut self, preserving: bool) -> Self {
        self.behavior_preserving = preserving;
        self
    }

    pub fn with_import(mut self, line: impl Into<String>) -> Self {
        self.imports.push(line.into());
        self
    }

    pub fn with_setup(mut self, line: impl Into<String>) -> Self {
        self.setup.push(line.into());
        self
    }

    pub fn with_cleanup(mut self, line: impl Into<String>) -> Self {
        self.cleanup.push(line.into());
        self
    }

    /// Let `placeholder` read the binding called `binding`.
    pub fn with_parameter(
        mut self,
        placeholder: impl Into<String>,
        binding: impl Into<String>,
    ) -> Self {
        self.parameters.insert(placeholder.into(), binding.into());
        self
    }
}

/// How closely a suggested mapping keeps the source behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Behavior-preserving mapping.
    Direct,
    /// Same intent, but the target behaves differently in some cases.
    Approximate,
}

impl SuggestionKind {
    pub fn confidence(self) -> f32 {
        match self {
            SuggestionKind::Direct => 1.0,
            SuggestionKind::Approximate => 0.8,
        }
    }
}

/// A candidate mapping with how much it can be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion<'c> {
    pub mapping: &'c Mapping,
    pub kind: SuggestionKind,
    pub confidence: f32,
}
