//! Boundary to an external mapping ranking service.
//!
//! The catalog is consulted first; a ranker is only asked when the catalog
//! has no candidate for a (category, ecosystem) pair. Every call is bounded
//! by a timeout and by the unit's [`CancelToken`], and any failure degrades
//! to "unmapped".
//!
//! A [`RankerClient`] lives for one translation run and is shared by every
//! unit in it. Answers, including timeouts, are remembered for the whole run,
//! so a stalled service is asked once per (category, ecosystem) rather than
//! once per unit. A call that overruns keeps its helper thread until the
//! ranker returns; the engine counts those threads and stops starting new
//! calls once `ranking.max_pending` of them are outstanding.

use crate::CancelToken;
use rosetta_catalog::Mapping;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};
use tracing::debug;

/// What the ranker is asked to map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankRequest {
    pub pattern_id: String,
    pub category: String,
    pub ecosystem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ranking service error: {0}")]
pub struct RankerError(pub String);

/// A service that can suggest a mapping the catalog does not have.
pub trait MappingRanker: Send + Sync {
    /// Suggest a mapping, or `None` when the service has nothing either.
    /// May block; callers bound the wait.
    fn suggest(&self, request: &RankRequest) -> Result<Option<Mapping>, RankerError>;
}

/// Why a ranker call produced no mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankFailure {
    NoSuggestion,
    TimedOut(Duration),
    /// Too many earlier calls are still running; nothing was started.
    Busy(usize),
    Cancelled,
    Failed(String),
}

/// Poll interval while waiting on the ranker.
const POLL: Duration = Duration::from_millis(5);

const DEFAULT_MAX_PENDING: usize = 4;

type Answer = Result<Mapping, RankFailure>;

/// Ranker access for one translation run.
pub struct RankerClient {
    ranker: Arc<dyn MappingRanker>,
    timeout: Duration,
    max_pending: usize,
    pending: Arc<AtomicUsize>,
    memo: Mutex<HashMap<(String, String), Answer>>,
}

impl RankerClient {
    pub fn new(ranker: Arc<dyn MappingRanker>, timeout: Duration) -> Self {
        Self {
            ranker,
            timeout,
            max_pending: DEFAULT_MAX_PENDING,
            pending: Arc::new(AtomicUsize::new(0)),
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Share the count of outstanding calls with other clients, and cap it.
    pub fn with_pending_limit(mut self, max_pending: usize, pending: Arc<AtomicUsize>) -> Self {
        self.max_pending = max_pending;
        self.pending = pending;
        self
    }

    /// Calls whose helper thread has not returned yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Answer for the request's (category, ecosystem), asking the ranker
    /// only the first time. Calls are made one at a time.
    pub fn ask(&self, request: RankRequest, cancel: &CancelToken) -> Answer {
        let key = (request.category.clone(), request.ecosystem.clone());
        let mut memo = self
            .memo
            .lock()
            .map_err(|_| RankFailure::Failed("ranker memo lock poisoned".into()))?;
        if let Some(answer) = memo.get(&key) {
            return answer.clone();
        }

        let answer = self.call(request, cancel);
        match &answer {
            // A cancelled call says nothing about the service.
            Err(RankFailure::Cancelled) => {}
            Err(RankFailure::TimedOut(t)) => {
                debug!(category = %key.0, ecosystem = %key.1, timeout_ms = t.as_millis() as u64, "ranker timed out");
                memo.insert(key, answer.clone());
            }
            _ => {
                memo.insert(key, answer.clone());
            }
        }
        answer
    }

    /// Ask on a helper thread and wait at most the timeout, giving up early
    /// when `cancel` fires. A ranker that overruns is left to finish on its
    /// own; its answer is discarded.
    fn call(&self, request: RankRequest, cancel: &CancelToken) -> Answer {
        if cancel.is_cancelled() {
            return Err(RankFailure::Cancelled);
        }

        let max = self.max_pending;
        if let Err(outstanding) =
            self.pending
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < max).then_some(n + 1)
                })
        {
            debug!(outstanding, "ranker busy, not starting another call");
            return Err(RankFailure::Busy(outstanding));
        }
        let guard = PendingCall(Arc::clone(&self.pending));

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&self.ranker);
        let spawned = std::thread::Builder::new()
            .name("rosetta-ranker".into())
            .spawn(move || {
                let _guard = guard;
                let _ = tx.send(worker.suggest(&request));
            });
        if let Err(e) = spawned {
            // The closure, and with it the guard, was dropped.
            return Err(RankFailure::Failed(e.to_string()));
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(RankFailure::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RankFailure::TimedOut(self.timeout));
            }
            match rx.recv_timeout(POLL.min(deadline - now)) {
                Ok(Ok(Some(mapping))) => return Ok(mapping),
                Ok(Ok(None)) => return Err(RankFailure::NoSuggestion),
                Ok(Err(e)) => return Err(RankFailure::Failed(e.0)),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(RankFailure::Failed("ranker thread exited".into()));
                }
            }
        }
    }
}

/// Counts one running ranker call until dropped.
struct PendingCall(Arc<AtomicUsize>);

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl MappingRanker for Fixed {
        fn suggest(&self, request: &RankRequest) -> Result<Option<Mapping>, RankerError> {
            Ok(self
                .0
                .map(|t| Mapping::new(&request.category, &request.ecosystem, t).unwrap()))
        }
    }

    struct Slow(AtomicUsize);

    impl MappingRanker for Slow {
        fn suggest(&self, _: &RankRequest) -> Result<Option<Mapping>, RankerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_secs(5));
            Ok(None)
        }
    }

    struct Broken;

    impl MappingRanker for Broken {
        fn suggest(&self, _: &RankRequest) -> Result<Option<Mapping>, RankerError> {
            Err(RankerError("503".into()))
        }
    }

    fn request(category: &str) -> RankRequest {
        RankRequest {
            pattern_id: "p".into(),
            category: category.into(),
            ecosystem: "e".into(),
        }
    }

    fn client(ranker: impl MappingRanker + 'static, timeout: Duration) -> RankerClient {
        RankerClient::new(Arc::new(ranker), timeout)
    }

    #[test]
    fn test_suggestion_is_returned() {
        let fixed = client(Fixed(Some("x()")), Duration::from_secs(5));
        let mapping = fixed.ask(request("c"), &CancelToken::new()).unwrap();
        assert_eq!(mapping.template.source(), "x()");
        assert_eq!(mapping.order, usize::MAX);
    }

    #[test]
    fn test_no_suggestion_and_errors() {
        let token = CancelToken::new();
        let none = client(Fixed(None), Duration::from_secs(5));
        assert_eq!(none.ask(request("c"), &token), Err(RankFailure::NoSuggestion));
        let broken = client(Broken, Duration::from_secs(5));
        assert_eq!(
            broken.ask(request("c"), &token),
            Err(RankFailure::Failed("503".into()))
        );
    }

    #[test]
    fn test_timeout_is_remembered() {
        let slow = Arc::new(Slow(AtomicUsize::new(0)));
        let stalled = RankerClient::new(slow.clone(), Duration::from_millis(30));
        let started = Instant::now();
        for _ in 0..5 {
            assert_eq!(
                stalled.ask(request("c"), &CancelToken::new()),
                Err(RankFailure::TimedOut(Duration::from_millis(30)))
            );
        }
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(slow.0.load(Ordering::SeqCst), 1);
        assert_eq!(stalled.pending(), 1);
    }

    #[test]
    fn test_stalled_calls_are_capped() {
        let slow = Arc::new(Slow(AtomicUsize::new(0)));
        let pending = Arc::new(AtomicUsize::new(0));
        let first_run = RankerClient::new(slow.clone(), Duration::from_millis(20))
            .with_pending_limit(2, Arc::clone(&pending));
        let token = CancelToken::new();

        for category in ["a", "b"] {
            assert!(matches!(
                first_run.ask(request(category), &token),
                Err(RankFailure::TimedOut(_))
            ));
        }
        assert_eq!(first_run.ask(request("c"), &token), Err(RankFailure::Busy(2)));
        assert_eq!(slow.0.load(Ordering::SeqCst), 2);

        // The count outlives the client that started the calls.
        let next_run = RankerClient::new(slow.clone(), Duration::from_millis(20))
            .with_pending_limit(2, pending);
        assert_eq!(next_run.ask(request("d"), &token), Err(RankFailure::Busy(2)));
        assert_eq!(slow.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_finished_calls_release_their_slot() {
        let quick = client(Fixed(Some("x()")), Duration::from_secs(5));
        quick.ask(request("c"), &CancelToken::new()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while quick.pending() > 0 && Instant::now() < deadline {
            std::thread::sleep(POLL);
        }
        assert_eq!(quick.pending(), 0);
    }

    #[test]
    fn test_cancelled_token_short_circuits() {
        let slow = Arc::new(Slow(AtomicUsize::new(0)));
        let stalled = RankerClient::new(slow.clone(), Duration::from_secs(5));
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(stalled.ask(request("c"), &token), Err(RankFailure::Cancelled));
        assert_eq!(slow.0.load(Ordering::SeqCst), 0);

        // Not remembered: a live unit still gets to ask.
        let live = client(Fixed(Some("y()")), Duration::from_secs(5));
        assert_eq!(live.ask(request("c"), &token), Err(RankFailure::Cancelled));
        assert!(live.ask(request("c"), &CancelToken::new()).is_ok());
    }
}
