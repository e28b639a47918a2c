//! Election Protocol Tests
//!
//! Exercises the election engine against the in-memory store:
//! - Atomic lock creation under concurrency
//! - Restart without re-election
//! - Backoff schedule and jitter bounds
//! - Cancellation at the waiting point

use std::sync::Arc;
use std::time::Duration;

use podlock::election::{ElectionEngine, ElectionError, ElectionOutcome, ElectionState};
use podlock::identity::PeerIdentity;
use podlock::reclaim::ReclaimOutcome;
use podlock::store::{MemoryStore, OwnerRef, StoreOp, TokenStore};
use tokio_util::sync::CancellationToken;

const LOCK: &str = "operator-lock";

fn engine_for(store: &MemoryStore, pod: &str) -> ElectionEngine {
    let peer = store
        .peer(pod)
        .unwrap_or_else(|| store.add_running_peer(pod));
    let identity = PeerIdentity::new(store.namespace(), &peer.name, &peer.uid);
    ElectionEngine::new(Arc::new(store.clone()), identity, LOCK)
}

fn hold_lock(store: &MemoryStore, pod: &str) -> OwnerRef {
    let peer = store.add_running_peer(pod);
    let owner = OwnerRef::pod(&peer.name, &peer.uid);
    store.insert_token(LOCK, vec![owner.clone()]);
    owner
}

// =============================================================================
// Atomic Acquisition
// =============================================================================

/// Concurrent creates: exactly one succeeds, the rest conflict.
#[tokio::test]
async fn test_concurrent_creates_have_single_winner() {
    let store = MemoryStore::new("default");

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let owner = OwnerRef::pod(format!("web-{}", i), format!("uid-{}", i));
            store.create_token(LOCK, &owner).await
        }));
    }

    let mut won = 0;
    let mut conflicted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => won += 1,
            Err(e) if e.is_already_exists() => conflicted += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(conflicted, 15);
}

/// Concurrent engines: one leads, the others wait until cancelled.
#[tokio::test(start_paused = true)]
async fn test_concurrent_engines_elect_one_leader() {
    let store = MemoryStore::new("default");
    let cancel = CancellationToken::new();

    let mut handles = Vec::new();
    for i in 0..5 {
        let mut engine = engine_for(&store, &format!("web-{}", i));
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move { engine.run(&cancel).await }));
    }

    tokio::time::sleep(Duration::from_secs(60)).await;
    cancel.cancel();

    let mut leaders = 0;
    let mut cancelled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ElectionOutcome::Leader) => leaders += 1,
            Err(ElectionError::Cancelled) => cancelled += 1,
            other => panic!("unexpected result: {:?}", other),
        }
    }
    assert_eq!(leaders, 1);
    assert_eq!(cancelled, 4);
    assert_eq!(store.count(StoreOp::DeletePeer), 0);
}

/// Absent lock: created with this pod as sole owner.
#[tokio::test]
async fn test_absent_lock_makes_leader() {
    let store = MemoryStore::new("default");
    let mut engine = engine_for(&store, "web-0");

    let outcome = engine.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, ElectionOutcome::Leader);

    let token = store.token(LOCK).unwrap();
    assert_eq!(token.sole_owner(), Some(&engine.identity().owner_ref()));
    assert_eq!(store.count(StoreOp::CreateToken), 1);
}

// =============================================================================
// Restart
// =============================================================================

/// Lock already names this pod: AlreadyLeader, no create issued.
#[tokio::test]
async fn test_restart_keeps_leadership_without_create() {
    let store = MemoryStore::new("default");
    let owner = hold_lock(&store, "web-0");
    let mut engine = engine_for(&store, "web-0");
    assert_eq!(engine.identity().owner_ref(), owner);

    let outcome = engine.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, ElectionOutcome::AlreadyLeader);
    assert_eq!(engine.state(), &ElectionState::AlreadyLeader);
    assert_eq!(store.count(StoreOp::CreateToken), 0);
}

/// Name match alone is enough, even among several owners.
#[tokio::test]
async fn test_restart_matches_owner_by_name() {
    let store = MemoryStore::new("default");
    let mut engine = engine_for(&store, "web-0");
    store.insert_token(
        LOCK,
        vec![
            OwnerRef::pod("web-7", "uid-7"),
            OwnerRef::pod("web-0", "stale-uid"),
        ],
    );

    let outcome = engine.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, ElectionOutcome::AlreadyLeader);
    assert_eq!(store.count(StoreOp::CreateToken), 0);
}

// =============================================================================
// Backoff
// =============================================================================

/// Nominal sleeps follow 1,2,4,8,16,16,... and each actual sleep is within
/// ±20% of nominal.
#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_while_waiting() {
    let store = MemoryStore::new("default");
    hold_lock(&store, "leader");
    let mut engine = engine_for(&store, "web-1");

    let cancel = CancellationToken::new();
    let result = tokio::time::timeout(Duration::from_secs(200), engine.run(&cancel)).await;
    assert!(result.is_err(), "follower must still be waiting");

    let sleeps = engine.sleeps();
    assert!(sleeps.len() >= 6);
    let expected = [1u64, 2, 4, 8, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16];
    for (sleep, nominal_secs) in sleeps.iter().zip(expected) {
        assert_eq!(sleep.nominal, Duration::from_secs(nominal_secs));
        assert!(sleep.actual >= sleep.nominal.mul_f64(0.8));
        assert!(sleep.actual <= sleep.nominal.mul_f64(1.2));
    }
    assert!(engine
        .reclaims()
        .iter()
        .all(|r| matches!(r, ReclaimOutcome::HolderAlive { .. })));
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cancelling a waiting follower returns Cancelled from the Waiting state.
#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting() {
    let store = MemoryStore::new("default");
    hold_lock(&store, "leader");
    let mut engine = engine_for(&store, "web-1");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let err = engine.run(&cancel).await.unwrap_err();
    assert!(matches!(err, ElectionError::Cancelled));
    assert!(!err.is_fatal());
    assert_eq!(engine.state().state_name(), "Waiting");
    assert!(store.token(LOCK).unwrap().is_owned_by("leader"));
}
