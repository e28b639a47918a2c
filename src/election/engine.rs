//! Election engine
//!
//! Drives one election to completion:
//! - Honors an existing lock that already names this pod (restart)
//! - Otherwise creates the lock atomically; the orchestrator rejects all
//!   but one concurrent creator
//! - On conflict, hands the holder to the reclaimer, then backs off
//! - Any unexpected API error aborts the election
//!
//! The "check, then create" sequence is racy; correctness rests entirely on
//! create being atomic and conflict-detecting.

use super::backoff::{Backoff, BackoffPolicy};
use super::errors::{ElectionError, ElectionResult};
use super::state::{ElectionOutcome, ElectionState};
use crate::identity::PeerIdentity;
use crate::observability::{log_event_with_fields, Event};
use crate::reclaim::{reclaim_with_cancel, ReclaimOutcome};
use crate::store::{ElectionToken, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Entries kept per history buffer. Older entries are dropped.
pub const HISTORY_LIMIT: usize = 32;

/// A completed backoff sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSleep {
    pub nominal: Duration,
    pub actual: Duration,
}

/// Election engine for one lock and one pod
pub struct ElectionEngine {
    store: Arc<dyn TokenStore>,
    identity: PeerIdentity,
    lock_name: String,
    backoff: Backoff,
    state: ElectionState,
    transitions: Vec<ElectionState>,
    sleeps: Vec<BackoffSleep>,
    reclaims: Vec<ReclaimOutcome>,
    conflicts: u64,
}

impl ElectionEngine {
    /// Create an engine with the fixed backoff policy.
    pub fn new(
        store: Arc<dyn TokenStore>,
        identity: PeerIdentity,
        lock_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            lock_name: lock_name.into(),
            backoff: Backoff::new(BackoffPolicy::DEFAULT),
            state: ElectionState::Init,
            transitions: vec![ElectionState::Init],
            sleeps: Vec::new(),
            reclaims: Vec::new(),
            conflicts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ElectionState {
        &self.state
    }

    /// Most recent states entered, oldest first.
    pub fn transitions(&self) -> &[ElectionState] {
        &self.transitions
    }

    /// Most recent completed backoff sleeps, oldest first.
    pub fn sleeps(&self) -> &[BackoffSleep] {
        &self.sleeps
    }

    /// Most recent reclaimer outcomes, one per lost create.
    pub fn reclaims(&self) -> &[ReclaimOutcome] {
        &self.reclaims
    }

    /// Lost creates over the life of the engine.
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Run the election until this pod leads, a fatal error occurs, or
    /// `cancel` fires.
    pub async fn run(&mut self, cancel: &CancellationToken) -> ElectionResult<ElectionOutcome> {
        let result = self.elect(cancel).await;
        match &result {
            Ok(_) => {}
            Err(ElectionError::Cancelled) => {
                log_event_with_fields(
                    Event::ElectionCancelled,
                    &[
                        ("lock", self.lock_name.as_str()),
                        ("state", self.state.state_name()),
                    ],
                );
            }
            Err(e) => {
                let error = e.to_string();
                log_event_with_fields(
                    Event::ElectionFailed,
                    &[
                        ("code", e.code()),
                        ("error", error.as_str()),
                        ("lock", self.lock_name.as_str()),
                        ("state", self.state.state_name()),
                    ],
                );
            }
        }
        result
    }

    async fn elect(&mut self, cancel: &CancellationToken) -> ElectionResult<ElectionOutcome> {
        log_event_with_fields(
            Event::ElectionStart,
            &[
                ("lock", self.lock_name.as_str()),
                ("namespace", self.identity.namespace.as_str()),
                ("pod", self.identity.name.as_str()),
            ],
        );
        let owner = self.identity.owner_ref();

        self.transition(ElectionState::CheckingExisting);
        ensure_active(cancel)?;
        let mut snapshot = match self.store.get_token(&self.lock_name).await {
            Ok(token) => {
                if token.is_owned_by(&self.identity.name) {
                    return Ok(self.resume());
                }
                for existing in &token.owners {
                    log_event_with_fields(
                        Event::ExistingLockFound,
                        &[
                            ("lock", self.lock_name.as_str()),
                            ("owner", existing.name.as_str()),
                        ],
                    );
                }
                Some(token)
            }
            Err(e) if e.is_not_found() => {
                log_event_with_fields(
                    Event::NoExistingLock,
                    &[("lock", self.lock_name.as_str())],
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.transition(ElectionState::Acquiring { attempt });
            ensure_active(cancel)?;

            match self.store.create_token(&self.lock_name, &owner).await {
                Ok(()) => return Ok(self.lead()),
                Err(e) if e.is_already_exists() => {
                    self.conflicts += 1;
                    log_event_with_fields(
                        Event::LockConflict,
                        &[
                            ("attempt", attempt.to_string().as_str()),
                            ("lock", self.lock_name.as_str()),
                        ],
                    );
                    ensure_active(cancel)?;
                    let conflicting = match snapshot.take() {
                        Some(token) => Some(token),
                        None => self.fetch_conflicting().await?,
                    };
                    if conflicting
                        .as_ref()
                        .is_some_and(|t| t.is_owned_by(&self.identity.name))
                    {
                        return Ok(self.resume());
                    }

                    ensure_active(cancel)?;
                    let outcome =
                        reclaim_with_cancel(self.store.as_ref(), conflicting.as_ref(), cancel)
                            .await?;
                    record(&mut self.reclaims, outcome);
                    ensure_active(cancel)?;
                    self.wait(attempt, cancel).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetch the lock that just beat us. `None` if it has vanished since.
    async fn fetch_conflicting(&self) -> ElectionResult<Option<ElectionToken>> {
        match self.store.get_token(&self.lock_name).await {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn wait(&mut self, attempt: u32, cancel: &CancellationToken) -> ElectionResult<()> {
        let nominal = self.backoff.nominal();
        let actual = self.backoff.sample(&mut rand::thread_rng());
        self.transition(ElectionState::Waiting {
            attempt,
            backoff: nominal,
        });
        log_event_with_fields(
            Event::BackoffSleep,
            &[
                ("attempt", attempt.to_string().as_str()),
                ("delay_ms", actual.as_millis().to_string().as_str()),
                ("lock", self.lock_name.as_str()),
                ("nominal_ms", nominal.as_millis().to_string().as_str()),
            ],
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(ElectionError::Cancelled),
            _ = tokio::time::sleep(actual) => {}
        }

        record(&mut self.sleeps, BackoffSleep { nominal, actual });
        self.backoff.advance();
        Ok(())
    }

    fn resume(&mut self) -> ElectionOutcome {
        log_event_with_fields(
            Event::ResumedLeadership,
            &[
                ("lock", self.lock_name.as_str()),
                ("pod", self.identity.name.as_str()),
            ],
        );
        self.finish(ElectionOutcome::AlreadyLeader)
    }

    fn lead(&mut self) -> ElectionOutcome {
        log_event_with_fields(
            Event::BecameLeader,
            &[
                ("lock", self.lock_name.as_str()),
                ("pod", self.identity.name.as_str()),
            ],
        );
        self.finish(ElectionOutcome::Leader)
    }

    fn finish(&mut self, outcome: ElectionOutcome) -> ElectionOutcome {
        self.transition(outcome.terminal_state());
        outcome
    }

    fn transition(&mut self, next: ElectionState) {
        record(&mut self.transitions, next.clone());
        self.state = next;
    }
}

fn record<T>(history: &mut Vec<T>, entry: T) {
    if history.len() >= HISTORY_LIMIT {
        history.remove(0);
    }
    history.push(entry);
}

fn ensure_active(cancel: &CancellationToken) -> ElectionResult<()> {
    if cancel.is_cancelled() {
        return Err(ElectionError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::ElectionErrorKind;
    use crate::store::{MemoryStore, OwnerRef, StoreError, StoreOp};

    fn setup(pod: &str) -> (MemoryStore, ElectionEngine) {
        let store = MemoryStore::new("default");
        let me = store.add_running_peer(pod);
        let identity = PeerIdentity::new("default", &me.name, &me.uid);
        let engine = ElectionEngine::new(Arc::new(store.clone()), identity, "my-lock");
        (store, engine)
    }

    #[tokio::test]
    async fn test_absent_lock_is_created() {
        let (store, mut engine) = setup("web-0");
        let outcome = engine.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, ElectionOutcome::Leader);
        assert_eq!(engine.state(), &ElectionState::Leader);
        let token = store.token("my-lock").unwrap();
        assert_eq!(token.sole_owner(), Some(&engine.identity().owner_ref()));
        let names: Vec<_> = engine.transitions().iter().map(|s| s.state_name()).collect();
        assert_eq!(names, vec!["Init", "CheckingExisting", "Acquiring", "Leader"]);
    }

    #[tokio::test]
    async fn test_own_lock_resumes_without_create() {
        let (store, mut engine) = setup("web-0");
        store.insert_token("my-lock", vec![engine.identity().owner_ref()]);

        let outcome = engine.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ElectionOutcome::AlreadyLeader);
        assert_eq!(store.count(StoreOp::CreateToken), 0);
    }

    #[tokio::test]
    async fn test_initial_fetch_error_is_fatal() {
        let (store, mut engine) = setup("web-0");
        store.fail(StoreOp::GetToken, StoreError::unknown("unauthorized"));

        let err = engine.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ElectionErrorKind::Api);
        assert_eq!(store.count(StoreOp::CreateToken), 0);
    }

    #[tokio::test]
    async fn test_create_error_is_fatal() {
        let (store, mut engine) = setup("web-0");
        store.fail(StoreOp::CreateToken, StoreError::unknown("server error"));

        let err = engine.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ElectionErrorKind::Api);
        assert!(engine.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_precancelled_engine_makes_no_calls() {
        let (store, mut engine) = setup("web-0");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine.run(&cancel).await.unwrap_err();
        assert!(matches!(err, ElectionError::Cancelled));
        assert!(store.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_uses_snapshot_then_refetches() {
        let (store, mut engine) = setup("web-0");
        let leader = store.add_running_peer("leader");
        store.insert_token("my-lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);

        let cancel = CancellationToken::new();
        let _ = tokio::time::timeout(Duration::from_secs(5), engine.run(&cancel)).await;

        // Initial fetch, then one fresh fetch per conflict after the first.
        let creates = store.count(StoreOp::CreateToken);
        assert!(creates >= 2);
        assert_eq!(store.count(StoreOp::GetToken), creates);
        assert!(engine
            .reclaims()
            .iter()
            .all(|r| matches!(r, ReclaimOutcome::HolderAlive { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_error_is_fatal() {
        let (store, mut engine) = setup("web-0");
        let leader = store.add_running_peer("leader");
        store.insert_token("my-lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);
        // The check misses the lock, the create conflicts, the refetch fails.
        store.fail_next(StoreOp::GetToken, StoreError::not_found("configmap", "my-lock"));
        store.fail(StoreOp::GetToken, StoreError::unknown("timeout"));

        let err = engine.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ElectionErrorKind::Api);
        assert_eq!(store.count(StoreOp::CreateToken), 1);
        assert!(engine.reclaims().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_is_bounded_while_waiting() {
        let (store, mut engine) = setup("web-0");
        let leader = store.add_running_peer("leader");
        store.insert_token("my-lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);

        let cancel = CancellationToken::new();
        let long_wait = Duration::from_secs(6 * 60 * 60);
        let _ = tokio::time::timeout(long_wait, engine.run(&cancel)).await;

        assert!(engine.conflicts() > 10 * HISTORY_LIMIT as u64);
        assert_eq!(engine.transitions().len(), HISTORY_LIMIT);
        assert_eq!(engine.sleeps().len(), HISTORY_LIMIT);
        assert_eq!(engine.reclaims().len(), HISTORY_LIMIT);
        assert!(engine
            .sleeps()
            .iter()
            .all(|s| s.nominal == Duration::from_secs(16)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_finding_own_lock_resumes() {
        let (store, mut engine) = setup("web-0");
        store.insert_token("my-lock", vec![engine.identity().owner_ref()]);
        store.fail_next(StoreOp::GetToken, StoreError::not_found("configmap", "my-lock"));

        let outcome = engine.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ElectionOutcome::AlreadyLeader);
        assert_eq!(store.count(StoreOp::CreateToken), 1);
    }
}
