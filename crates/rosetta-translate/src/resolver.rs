//! Mapping resolution.
//!
//! For a pattern and a target ecosystem the resolver either picks one
//! mapping or says explicitly why there is none. It never returns an empty
//! result.

use crate::CancelToken;
use crate::ranker::{RankFailure, RankRequest, RankerClient};
use rosetta_catalog::{Catalog, Mapping, Pattern};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'c> {
    Resolved(Cow<'c, Mapping>),
    Unmapped(Unmapped),
}

impl Resolution<'_> {
    pub fn mapping(&self) -> Option<&Mapping> {
        match self {
            Resolution::Resolved(m) => Some(m),
            Resolution::Unmapped(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmapped {
    /// Nothing in the catalog (or from the ranker) for this target.
    NoCandidate,
    /// The best mapping is not behavior-preserving and the pattern must be
    /// preserved exactly.
    Refused { priority: i32 },
    /// The ranking service did not answer in time.
    RankerTimedOut(Duration),
    /// Earlier ranker calls are still running; this one was not started.
    RankerBusy(usize),
    RankerFailed(String),
    Cancelled,
}

impl fmt::Display for Unmapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unmapped::NoCandidate => f.write_str("no mapping for this target"),
            Unmapped::Refused { priority } => write!(
                f,
                "best mapping (priority {priority}) is not behavior-preserving"
            ),
            Unmapped::RankerTimedOut(t) => {
                write!(f, "ranking service timed out after {}ms", t.as_millis())
            }
            Unmapped::RankerBusy(n) => write!(
                f,
                "ranking service busy: {n} earlier call{} still pending",
                if *n == 1 { "" } else { "s" }
            ),
            Unmapped::RankerFailed(e) => write!(f, "ranking service failed: {e}"),
            Unmapped::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Two or more equal-priority mappings; the earliest in the catalog won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTie {
    pub priority: i32,
    pub candidates: usize,
}

/// Resolver for one unit. Ranker answers are shared with the rest of the
/// run through the [`RankerClient`].
pub struct Resolver<'c> {
    catalog: &'c Catalog,
    ranker: Option<Arc<RankerClient>>,
    cancel: CancelToken,
}

impl<'c> Resolver<'c> {
    pub fn new(catalog: &'c Catalog, cancel: CancelToken) -> Self {
        Self {
            catalog,
            ranker: None,
            cancel,
        }
    }

    pub fn with_ranker(mut self, ranker: Arc<RankerClient>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn resolve(
        &mut self,
        pattern: &Pattern,
        ecosystem: &str,
    ) -> (Resolution<'c>, Option<MappingTie>) {
        let catalog = self.catalog;
        let mut best: Option<&'c Mapping> = None;
        let mut tied = 0;
        for mapping in catalog.candidates(&pattern.category, ecosystem) {
            match best {
                Some(b) if mapping.priority < b.priority => {}
                Some(b) if mapping.priority == b.priority && mapping.order >= b.order => {
                    tied += 1;
                }
                _ => {
                    best = Some(mapping);
                    tied = 1;
                }
            }
        }

        let (chosen, tie) = match best {
            Some(mapping) => {
                let tie = (tied > 1).then_some(MappingTie {
                    priority: mapping.priority,
                    candidates: tied,
                });
                (Cow::Borrowed(mapping), tie)
            }
            None => match self.ask_ranker(pattern, ecosystem) {
                Ok(mapping) => (Cow::Owned(mapping), None),
                Err(reason) => {
                    debug!(pattern = %pattern.id, ecosystem, %reason, "unmapped");
                    return (Resolution::Unmapped(reason), None);
                }
            },
        };

        if pattern.is_preserve() && !chosen.behavior_preserving {
            debug!(
                pattern = %pattern.id,
                ecosystem,
                priority = chosen.priority,
                "refusing non-preserving mapping for preserve pattern"
            );
            return (
                Resolution::Unmapped(Unmapped::Refused {
                    priority: chosen.priority,
                }),
                tie,
            );
        }

        (Resolution::Resolved(chosen), tie)
    }

    fn ask_ranker(&self, pattern: &Pattern, ecosystem: &str) -> Result<Mapping, Unmapped> {
        let Some(ranker) = &self.ranker else {
            return Err(Unmapped::NoCandidate);
        };
        let request = RankRequest {
            pattern_id: pattern.id.clone(),
            category: pattern.category.clone(),
            ecosystem: ecosystem.to_string(),
        };
        ranker.ask(request, &self.cancel).map_err(|failure| match failure {
            RankFailure::NoSuggestion => Unmapped::NoCandidate,
            RankFailure::TimedOut(t) => Unmapped::RankerTimedOut(t),
            RankFailure::Busy(n) => Unmapped::RankerBusy(n),
            RankFailure::Cancelled => Unmapped::Cancelled,
            RankFailure::Failed(e) => Unmapped::RankerFailed(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranker::{MappingRanker, RankerError};
    use rosetta_catalog::{CatalogLoader, Format};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DOC: &str = r#"
        [[patterns]]
        id = "lock"
        category = "locking"
        stability = "preserve"
        [patterns.matcher]
        type = "node"
        [patterns.matcher.shape]
        kind = "call"

        [[patterns]]
        id = "state"
        category = "reactive-state"
        [patterns.matcher]
        type = "node"
        [patterns.matcher.shape]
        kind = "library_call"

        [[mappings]]
        source_category = "locking"
        target_ecosystem = "python-stdlib"
        template = "with {{lock}}: pass"
        priority = 20

        [[mappings]]
        source_category = "locking"
        target_ecosystem = "python-stdlib"
        template = "acquire({{lock}})"
        priority = 1
        behavior_preserving = true

        [[mappings]]
        source_category = "reactive-state"
        target_ecosystem = "vue"
        template = "ref(first)"
        priority = 3

        [[mappings]]
        source_category = "reactive-state"
        target_ecosystem = "vue"
        template = "ref(low)"
        priority = 1

        [[mappings]]
        source_category = "reactive-state"
        target_ecosystem = "vue"
        template = "ref(second)"
        priority = 3
    "#;

    fn catalog() -> Catalog {
        CatalogLoader::new()
            .builtin(false)
            .text("test", Format::Toml, DOC)
            .load()
            .unwrap()
    }

    #[test]
    fn test_highest_priority_then_catalog_order() {
        let catalog = catalog();
        let mut resolver = Resolver::new(&catalog, CancelToken::new());
        let state = catalog.pattern("state").unwrap();
        for _ in 0..10 {
            let (resolution, tie) = resolver.resolve(state, "vue");
            assert_eq!(resolution.mapping().unwrap().template.source(), "ref(first)");
            assert_eq!(
                tie,
                Some(MappingTie {
                    priority: 3,
                    candidates: 2
                })
            );
        }
    }

    #[test]
    fn test_no_candidate_is_explicit() {
        let catalog = catalog();
        let mut resolver = Resolver::new(&catalog, CancelToken::new());
        let state = catalog.pattern("state").unwrap();
        let (resolution, tie) = resolver.resolve(state, "svelte");
        assert_eq!(resolution, Resolution::Unmapped(Unmapped::NoCandidate));
        assert!(tie.is_none());
    }

    #[test]
    fn test_preserve_refuses_non_preserving_best() {
        let catalog = catalog();
        let mut resolver = Resolver::new(&catalog, CancelToken::new());
        let lock = catalog.pattern("lock").unwrap();
        let (resolution, _) = resolver.resolve(lock, "python-stdlib");
        assert_eq!(
            resolution,
            Resolution::Unmapped(Unmapped::Refused { priority: 20 })
        );
    }

    struct Counting(AtomicUsize);

    impl MappingRanker for Counting {
        fn suggest(&self, request: &RankRequest) -> Result<Option<Mapping>, RankerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Some(
                Mapping::new(&request.category, &request.ecosystem, "suggested()")
                    .unwrap()
                    .behavior_preserving(true),
            ))
        }
    }

    #[test]
    fn test_ranker_fills_gaps_once_per_target() {
        let catalog = catalog();
        let ranker = Arc::new(Counting(AtomicUsize::new(0)));
        let client = RankerClient::new(ranker.clone(), Duration::from_secs(5));
        let mut resolver =
            Resolver::new(&catalog, CancelToken::new()).with_ranker(Arc::new(client));
        let state = catalog.pattern("state").unwrap();

        for _ in 0..3 {
            let (resolution, _) = resolver.resolve(state, "solid");
            assert!(matches!(resolution, Resolution::Resolved(Cow::Owned(_))));
        }
        assert_eq!(ranker.0.load(Ordering::SeqCst), 1);

        // Catalog hits never reach the ranker.
        resolver.resolve(state, "vue");
        assert_eq!(ranker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_unit_gets_unmapped() {
        let catalog = catalog();
        let token = CancelToken::new();
        token.cancel();
        let client = RankerClient::new(Arc::new(Counting(AtomicUsize::new(0))), Duration::from_secs(5));
        let mut resolver = Resolver::new(&catalog, token).with_ranker(Arc::new(client));
        let state = catalog.pattern("state").unwrap();
        let (resolution, _) = resolver.resolve(state, "solid");
        assert_eq!(resolution, Resolution::Unmapped(Unmapped::Cancelled));
    }
}
