//! Loaded pattern and mapping catalog.
//!
//! Catalogs are assembled once, before any translation starts, from the
//! embedded built-in catalog followed by user files in the order given.
//! The result is an immutable snapshot shared by reference across workers.

use crate::{
    CatalogLoadError, Mapping, MappingSpec, Pattern, PatternSpec, Suggestion, SuggestionKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN: &str = include_str!("../builtin/catalog.toml");

/// On-disk catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub patterns: Vec<PatternSpec>,
    pub mappings: Vec<MappingSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, CatalogLoadError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(CatalogLoadError::UnknownFormat(path.display().to_string())),
        }
    }

    pub fn parse(self, name: &str, text: &str) -> Result<CatalogFile, CatalogLoadError> {
        let parsed = match self {
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| CatalogLoadError::Parse {
            name: name.to_string(),
            message,
        })
    }
}

enum Source {
    File(PathBuf),
    Text {
        name: String,
        format: Format,
        text: String,
    },
}

/// Builder that assembles a [`Catalog`] from the built-in catalog and
/// additional sources.
pub struct CatalogLoader {
    builtin: bool,
    sources: Vec<Source>,
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self {
            builtin: true,
            sources: Vec::new(),
        }
    }

    pub fn builtin(mut self, enabled: bool) -> Self {
        self.builtin = enabled;
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into()));
        self
    }

    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources
            .extend(paths.into_iter().map(|p| Source::File(p.into())));
        self
    }

    pub fn text(mut self, name: impl Into<String>, format: Format, text: impl Into<String>) -> Self {
        self.sources.push(Source::Text {
            name: name.into(),
            format,
            text: text.into(),
        });
        self
    }

    pub fn load(self) -> Result<Catalog, CatalogLoadError> {
        let mut catalog = Catalog::default();
        if self.builtin {
            catalog.extend(Format::Toml.parse("<builtin>", BUILTIN)?)?;
        }
        for source in self.sources {
            let file = match source {
                Source::File(path) => {
                    let format = Format::from_path(&path)?;
                    let text = std::fs::read_to_string(&path).map_err(|source| {
                        CatalogLoadError::Io {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    format.parse(&path.display().to_string(), &text)?
                }
                Source::Text { name, format, text } => format.parse(&name, &text)?,
            };
            catalog.extend(file)?;
        }
        debug!(
            patterns = catalog.patterns.len(),
            mappings = catalog.mappings.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

/// Read-only pattern registry and mapping table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    patterns: Vec<Pattern>,
    pattern_ids: HashMap<String, usize>,
    mappings: Vec<Mapping>,
    by_target: HashMap<(String, String), Vec<usize>>,
}

impl Catalog {
    /// The embedded catalog on its own.
    pub fn builtin() -> Result<Self, CatalogLoadError> {
        CatalogLoader::new().load()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn extend(&mut self, file: CatalogFile) -> Result<(), CatalogLoadError> {
        for spec in file.patterns {
            if self.pattern_ids.contains_key(&spec.id) {
                return Err(CatalogLoadError::DuplicatePattern(spec.id));
            }
            let pattern = Pattern::compile(spec, self.patterns.len())?;
            self.pattern_ids
                .insert(pattern.id.clone(), self.patterns.len());
            self.patterns.push(pattern);
        }

        for spec in file.mappings {
            let index = self.mappings.len();
            let key = (spec.source_category.clone(), spec.target_ecosystem.clone());
            let mapping = Mapping::from_spec(spec, index).map_err(|source| {
                CatalogLoadError::Template {
                    index,
                    category: key.0.clone(),
                    ecosystem: key.1.clone(),
                    source,
                }
            })?;
            self.mappings.push(mapping);
            self.by_target.entry(key).or_default().push(index);
        }
        Ok(())
    }

    /// Patterns in catalog order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.pattern_ids.get(id).map(|&i| &self.patterns[i])
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Mappings for `category` into `ecosystem`, in catalog order.
    pub fn candidates<'a>(
        &'a self,
        category: &str,
        ecosystem: &str,
    ) -> impl Iterator<Item = &'a Mapping> + 'a {
        self.by_target
            .get(&(category.to_string(), ecosystem.to_string()))
            .into_iter()
            .flatten()
            .map(|&i| &self.mappings[i])
    }

    /// Every mapping for `category` into `ecosystem`, most trustworthy first:
    /// by confidence, then priority, then catalog order.
    pub fn suggestions(&self, category: &str, ecosystem: &str) -> Vec<Suggestion<'_>> {
        let mut out: Vec<Suggestion<'_>> = self
            .candidates(category, ecosystem)
            .map(|mapping| {
                let kind = if mapping.behavior_preserving {
                    SuggestionKind::Direct
                } else {
                    SuggestionKind::Approximate
                };
                Suggestion {
                    mapping,
                    kind,
                    confidence: kind.confidence(),
                }
            })
            .collect();
        out.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.mapping.priority.cmp(&a.mapping.priority))
                .then(a.mapping.order.cmp(&b.mapping.order))
        });
        out
    }

    /// Target ecosystems `category` can be mapped into, in catalog order.
    pub fn targets_for(&self, category: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .filter(|m| m.source_category == category)
            .map(|m| m.target_ecosystem.as_str())
            .filter(|eco| seen.insert(*eco))
            .collect()
    }

    /// Pattern categories, in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.patterns
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.mappings.is_empty()
    }
}
