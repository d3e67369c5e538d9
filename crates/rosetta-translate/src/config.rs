//! Configuration for rosetta.
//!
//! Loads config from:
//! 1. Global: ~/.config/rosetta/config.toml
//! 2. Per-project: .rosetta/config.toml (overrides global)
//!
//! Example config.toml:
//! ```toml
//! default_language = "typescript"
//!
//! [engine]
//! workers = 4
//! ancestor_depth = 4
//! annotate_ir = false
//!
//! [catalog]
//! builtin = true
//! paths = ["catalogs/house-style.toml"]
//!
//! [ranking]
//! timeout_ms = 250
//! max_pending = 4
//!
//! [targets.deno]
//! language = "typescript"
//! ```
//!
//! Settings left out of a file keep the value from the layer below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Worker threads for batch translation. 0 uses rayon's global pool.
    pub workers: usize,
    /// How many ancestors an `inside` shape may look through.
    pub ancestor_depth: usize,
    /// Return a copy of each unit's IR annotated with match decisions.
    pub annotate_ir: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            ancestor_depth: 4,
            annotate_ir: false,
        }
    }
}

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogConfig {
    /// Load the embedded catalog before any files.
    pub builtin: bool,
    /// Extra catalog files, loaded in order. Relative paths are resolved
    /// against the directory of the config file that named them.
    pub paths: Vec<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            paths: Vec::new(),
        }
    }
}

/// External ranking service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingConfig {
    pub timeout_ms: u64,
    /// Ranker calls that may still be running after their caller gave up.
    /// Once this many are outstanding no new call is started.
    pub max_pending: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 250,
            max_pending: 4,
        }
    }
}

impl RankingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target notation (writer language) for the ecosystem.
    pub language: String,
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosettaConfig {
    pub default_language: String,
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
    pub ranking: RankingConfig,
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for RosettaConfig {
    fn default() -> Self {
        let targets = [
            ("vue", "typescript"),
            ("svelte", "typescript"),
            ("node", "typescript"),
            ("python-stdlib", "python"),
            ("sqlalchemy", "python"),
            ("lua", "lua"),
        ]
        .into_iter()
        .map(|(eco, lang)| {
            (
                eco.to_string(),
                TargetConfig {
                    language: lang.to_string(),
                },
            )
        })
        .collect();

        Self {
            default_language: "typescript".to_string(),
            engine: EngineConfig::default(),
            catalog: CatalogConfig::default(),
            ranking: RankingConfig::default(),
            targets,
        }
    }
}

/// One config file. Every field is optional so a layer only overrides what
/// it names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    default_language: Option<String>,
    engine: EngineLayer,
    catalog: CatalogLayer,
    ranking: RankingLayer,
    targets: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EngineLayer {
    workers: Option<usize>,
    ancestor_depth: Option<usize>,
    annotate_ir: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogLayer {
    builtin: Option<bool>,
    paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RankingLayer {
    timeout_ms: Option<u64>,
    max_pending: Option<usize>,
}

impl RosettaConfig {
    /// Load configuration for a project.
    ///
    /// Loads global config from ~/.config/rosetta/config.toml,
    /// then merges with per-project config from .rosetta/config.toml.
    pub fn load(root: &Path) -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path()
            && let Some(global) = Self::load_file(&global_path)
        {
            config = config.merge(global, global_path.parent());
        }

        let project_path = root.join(".rosetta").join("config.toml");
        if let Some(project) = Self::load_file(&project_path) {
            config = config.merge(project, project_path.parent());
        }

        config
    }

    /// Load only the given file on top of the defaults.
    pub fn from_file(path: &Path) -> Self {
        match Self::load_file(path) {
            Some(layer) => Self::default().merge(layer, path.parent()),
            None => Self::default(),
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("rosetta").join("config.toml"))
    }

    fn load_file(path: &Path) -> Option<ConfigLayer> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                return None;
            }
        };
        match toml::from_str(&content) {
            Ok(layer) => {
                debug!(path = %path.display(), "loaded config file");
                Some(layer)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    fn merge(mut self, layer: ConfigLayer, base: Option<&Path>) -> Self {
        if let Some(language) = layer.default_language {
            self.default_language = language;
        }

        let engine = layer.engine;
        if let Some(workers) = engine.workers {
            self.engine.workers = workers;
        }
        if let Some(depth) = engine.ancestor_depth {
            self.engine.ancestor_depth = depth;
        }
        if let Some(annotate) = engine.annotate_ir {
            self.engine.annotate_ir = annotate;
        }

        if let Some(builtin) = layer.catalog.builtin {
            self.catalog.builtin = builtin;
        }
        if let Some(paths) = layer.catalog.paths {
            self.catalog.paths = paths
                .into_iter()
                .map(|p| match base {
                    Some(base) if p.is_relative() => base.join(p),
                    _ => p,
                })
                .collect();
        }

        if let Some(timeout) = layer.ranking.timeout_ms {
            self.ranking.timeout_ms = timeout;
        }
        if let Some(max_pending) = layer.ranking.max_pending {
            self.ranking.max_pending = max_pending;
        }

        self.targets.extend(layer.targets);
        self
    }

    /// Target notation for `ecosystem`.
    pub fn language_for(&self, ecosystem: &str) -> &str {
        self.targets
            .get(ecosystem)
            .map(|t| t.language.as_str())
            .unwrap_or(&self.default_language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn project_config(dir: &TempDir, body: &str) {
        let rosetta_dir = dir.path().join(".rosetta");
        std::fs::create_dir_all(&rosetta_dir).unwrap();
        let mut file = std::fs::File::create(rosetta_dir.join("config.toml")).unwrap();
        writeln!(file, "{body}").unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = RosettaConfig::default();
        assert_eq!(config.engine.ancestor_depth, 4);
        assert!(config.catalog.builtin);
        assert!(!config.engine.annotate_ir);
        assert_eq!(config.ranking.timeout(), Duration::from_millis(250));
        assert_eq!(config.language_for("vue"), "typescript");
        assert_eq!(config.language_for("sqlalchemy"), "python");
        assert_eq!(config.language_for("lua"), "lua");
        assert_eq!(config.language_for("unheard-of"), "typescript");
    }

    #[test]
    fn test_load_project_config() {
        let dir = TempDir::new().unwrap();
        project_config(
            &dir,
            r#"
default_language = "lua"

[engine]
workers = 2
annotate_ir = true

[catalog]
paths = ["extra.yaml", "/abs/other.toml"]

[targets.deno]
language = "typescript"
"#,
        );

        let config = RosettaConfig::from_file(&dir.path().join(".rosetta/config.toml"));
        assert_eq!(config.engine.workers, 2);
        assert!(config.engine.annotate_ir);
        assert_eq!(config.engine.ancestor_depth, 4); // default
        assert_eq!(config.language_for("unheard-of"), "lua");
        assert_eq!(config.language_for("deno"), "typescript");
        assert_eq!(config.language_for("python-stdlib"), "python");
        assert_eq!(
            config.catalog.paths,
            [
                dir.path().join(".rosetta").join("extra.yaml"),
                PathBuf::from("/abs/other.toml")
            ]
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        project_config(&dir, "[ranking]\ntimeout_ms = 20\n");

        let config = RosettaConfig::from_file(&dir.path().join(".rosetta/config.toml"));
        assert_eq!(config.ranking.timeout_ms, 20);
        assert_eq!(config.ranking.max_pending, 4);
        assert!(config.catalog.builtin);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_malformed_config_is_ignored() {
        let dir = TempDir::new().unwrap();
        project_config(&dir, "[engine\nworkers = ");

        let config = RosettaConfig::from_file(&dir.path().join(".rosetta/config.toml"));
        assert_eq!(config, RosettaConfig::default());
    }

    #[test]
    fn test_missing_project_config() {
        let dir = TempDir::new().unwrap();
        let config = RosettaConfig::from_file(&dir.path().join(".rosetta/config.toml"));
        assert_eq!(config, RosettaConfig::default());
    }
}
