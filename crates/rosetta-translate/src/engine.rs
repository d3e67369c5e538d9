//! Translation engine.
//!
//! A batch runs in two parallel phases with one barrier between them:
//!
//! ```text
//! sources ──par──> parse (front end) ──> units
//!                                          │  barrier: GlobalSymbols::build
//! units ──par──> match ─> resolve ─> substitute ─> synthesize ─> score
//! ```
//!
//! Each unit's index, matches and output stay private to its worker. The
//! catalog and the cross-unit symbol table are shared read-only.

use crate::annotate::annotate;
use crate::frontend::{FrontEnd, FrontEndRegistry, Parsed};
use crate::matcher::StructuralMatcher;
use crate::ranker::{MappingRanker, RankerClient};
use crate::resolver::Resolver;
use crate::result::{Diagnostic, TranslationResult, UnitOutcome, Warning, WarningKind};
use crate::scorer::{confidence, order_warnings};
use crate::synth::{Inputs, Synthesizer};
use crate::writer::{Writer, WriterRegistry};
use crate::{CancelToken, EngineError, RosettaConfig};
use rayon::prelude::*;
use rosetta_catalog::{Catalog, CatalogLoader};
use rosetta_ir::{GlobalSymbols, IdGen, Node, NodeId, SymbolTable, TreeIndex};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tracing::{debug, info, info_span, warn};

/// Requested output: an ecosystem and the notation it is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub ecosystem: String,
    pub language: String,
}

/// Source text of one translation unit.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    /// Front-end language tag.
    pub language: String,
    pub text: String,
    pub cancel: CancelToken,
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            text: text.into(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A parsed translation unit.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub root: Node,
    pub diagnostics: Vec<Diagnostic>,
}

impl Unit {
    pub fn new(name: impl Into<String>, root: Node) -> Self {
        Self {
            name: name.into(),
            root,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

pub struct Engine {
    catalog: Arc<Catalog>,
    config: RosettaConfig,
    writers: WriterRegistry,
    frontends: FrontEndRegistry,
    ranker: Option<Arc<dyn MappingRanker>>,
    /// Ranker calls still running after their caller gave up, across runs.
    ranker_pending: Arc<AtomicUsize>,
}

impl Engine {
    pub fn new(catalog: Catalog, config: RosettaConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            config,
            writers: WriterRegistry::default(),
            frontends: FrontEndRegistry::default(),
            ranker: None,
            ranker_pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load the catalog the configuration names. A catalog that fails to
    /// load stops everything before any unit is translated.
    pub fn from_config(config: RosettaConfig) -> Result<Self, EngineError> {
        let catalog = CatalogLoader::new()
            .builtin(config.catalog.builtin)
            .files(config.catalog.paths.iter().cloned())
            .load()?;
        info!(
            patterns = catalog.patterns().len(),
            mappings = catalog.mappings().len(),
            "catalog ready"
        );
        Ok(Self::new(catalog, config))
    }

    pub fn with_ranker(mut self, ranker: Arc<dyn MappingRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn with_frontend(mut self, frontend: Box<dyn FrontEnd>) -> Self {
        self.frontends.register(frontend);
        self
    }

    pub fn with_writer(mut self, writer: &'static dyn Writer) -> Self {
        self.writers.register(writer);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &RosettaConfig {
        &self.config
    }

    /// Target for `ecosystem`, in the notation the configuration assigns it.
    pub fn target(&self, ecosystem: &str) -> Result<Target, EngineError> {
        let target = Target {
            ecosystem: ecosystem.to_string(),
            language: self.config.language_for(ecosystem).to_string(),
        };
        self.writer_for(&target)?;
        Ok(target)
    }

    fn writer_for(&self, target: &Target) -> Result<&'static dyn Writer, EngineError> {
        self.writers
            .get(&target.language)
            .ok_or_else(|| EngineError::UnknownTarget {
                ecosystem: target.ecosystem.clone(),
                language: target.language.clone(),
            })
    }

    /// Run the front end for `source`. Unknown languages and unreadable
    /// input degrade to a unit holding an error leaf.
    pub fn parse(&self, source: &Source) -> Unit {
        let mut ids = IdGen::new(&source.name);
        let parsed = match self.frontends.get(&source.language) {
            Some(frontend) => frontend.parse(&source.text, &mut ids),
            None => Parsed::failed(
                &mut ids,
                format!("no front end for language {:?}", source.language),
            ),
        };
        Unit::new(&source.name, parsed.root).with_diagnostics(parsed.diagnostics)
    }

    /// Translate one already-parsed unit on the calling thread. Cross-unit
    /// references resolve only within the unit itself.
    pub fn translate_unit(
        &self,
        unit: &Unit,
        target: &Target,
        cancel: &CancelToken,
    ) -> Result<UnitOutcome, EngineError> {
        let writer = self.writer_for(target)?;
        let symbols = GlobalSymbols::build([SymbolTable::build(&unit.name, &unit.root)]);
        let ranker = self.ranker_client();
        Ok(self.run_unit(unit, target, writer, &symbols, ranker.as_ref(), cancel))
    }

    /// Parse and translate a batch. Outcomes are in input order whatever the
    /// worker count; each source's token cancels that source only.
    pub fn translate_batch(
        &self,
        sources: Vec<Source>,
        target: &Target,
    ) -> Result<Vec<UnitOutcome>, EngineError> {
        let writer = self.writer_for(target)?;
        let ranker = self.ranker_client();
        let run = || -> Vec<UnitOutcome> {
            let mut units: Vec<Unit> = sources.par_iter().map(|s| self.parse(s)).collect();

            let symbols =
                GlobalSymbols::build(units.iter().map(|u| SymbolTable::build(&u.name, &u.root)));
            debug!(units = units.len(), "symbol table ready");
            for name in symbols.duplicates() {
                warn!(unit = %name, "unit name used more than once");
                for unit in units.iter_mut().filter(|u| &u.name == name) {
                    unit.diagnostics.push(Diagnostic {
                        node_id: None,
                        message: format!(
                            "unit name {name:?} is used by more than one unit; \
                             references to it resolve against the first"
                        ),
                    });
                }
            }

            units
                .par_iter()
                .zip(sources.par_iter())
                .map(|(unit, source)| {
                    self.run_unit(unit, target, writer, &symbols, ranker.as_ref(), &source.cancel)
                })
                .collect()
        };

        match self.config.engine.workers {
            0 => Ok(run()),
            workers => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()?;
                Ok(pool.install(run))
            }
        }
    }

    /// Ranker access shared by every unit of one run.
    fn ranker_client(&self) -> Option<Arc<RankerClient>> {
        self.ranker.as_ref().map(|ranker| {
            let client = RankerClient::new(Arc::clone(ranker), self.config.ranking.timeout())
                .with_pending_limit(
                    self.config.ranking.max_pending,
                    Arc::clone(&self.ranker_pending),
                );
            Arc::new(client)
        })
    }

    fn run_unit(
        &self,
        unit: &Unit,
        target: &Target,
        writer: &'static dyn Writer,
        symbols: &GlobalSymbols,
        ranker: Option<&Arc<RankerClient>>,
        cancel: &CancelToken,
    ) -> UnitOutcome {
        let span = info_span!("unit", unit = %unit.name, ecosystem = %target.ecosystem);
        let _guard = span.enter();
        let cancelled = || UnitOutcome::Cancelled {
            unit: unit.name.clone(),
        };

        if cancel.is_cancelled() {
            debug!("cancelled before matching");
            return cancelled();
        }

        let index = TreeIndex::build(&unit.root);
        let set = StructuralMatcher::new(&self.catalog, self.config.engine.ancestor_depth).run(
            &index,
            symbols,
            &unit.name,
        );
        if cancel.is_cancelled() {
            debug!("cancelled after matching");
            return cancelled();
        }

        let mut resolver = Resolver::new(&self.catalog, cancel.clone());
        if let Some(ranker) = ranker {
            resolver = resolver.with_ranker(Arc::clone(ranker));
        }
        let reported: HashSet<NodeId> = unit
            .diagnostics
            .iter()
            .filter_map(|d| d.node_id.clone())
            .collect();
        let inputs = Inputs {
            catalog: &self.catalog,
            index: &index,
            matches: &set.matches,
            ecosystem: &target.ecosystem,
            reported: &reported,
            cancel,
        };
        let Some(rendered) = Synthesizer::new(writer, inputs, resolver).run() else {
            debug!("cancelled during synthesis");
            return cancelled();
        };

        let position = |id: &NodeId| index.position(id.as_str()).unwrap_or(0);
        let mut warnings: Vec<(usize, Warning)> = unit
            .diagnostics
            .iter()
            .map(|d| {
                let id = d.node_id.clone().unwrap_or_else(|| unit.root.id.clone());
                (
                    position(&id),
                    Warning::new(id, WarningKind::ParseDiagnostic, d.message.clone()),
                )
            })
            .collect();
        warnings.extend(set.warnings.iter().map(|w| (position(&w.node_id), w.clone())));
        warnings.extend(rendered.warnings);

        let result = TranslationResult {
            code: rendered.code,
            confidence: confidence(&index, &rendered.outcomes),
            warnings: order_warnings(warnings),
        };
        info!(
            confidence = result.confidence,
            warnings = result.warnings.len(),
            "unit translated"
        );

        let annotated = self
            .config
            .engine
            .annotate_ir
            .then(|| annotate(&unit.root, &self.catalog, &set.matches, &rendered.decisions));

        UnitOutcome::Translated {
            unit: unit.name.clone(),
            result,
            annotated,
        }
    }
}
