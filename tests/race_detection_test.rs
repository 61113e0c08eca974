// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Race Detection Tests for agentguard
//!
//! These tests hammer one shared gateway from many threads and check that
//! per-session accounting stays exact. They are designed to detect data races
//! when run with ThreadSanitizer (TSAN).
//!
//! # Running with ThreadSanitizer
//!
//! ```bash
//! RUSTFLAGS="-Z sanitizer=thread" cargo +nightly test --target x86_64-unknown-linux-gnu --test race_detection_test
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use agentguard::{
    AssistantApp, EchoPipeline, GateError, GatewayConfig, MockClock, SecureLogger,
    SecurityGateway, SessionState, SessionStore, SystemClock,
};

// Test configuration
const CONCURRENCY_LEVEL: usize = 16;
const ITERATIONS_PER_THREAD: usize = 25;
const REAL_CLOCK_THREADS: usize = 8;
const REAL_CLOCK_ITERATIONS: usize = 20_000;

fn shared_gateway(max_requests: u32) -> Arc<SecurityGateway<MockClock>> {
    let config = GatewayConfig { max_requests, ..Default::default() };
    Arc::new(
        SecurityGateway::with_clock(&config, MockClock::new(Instant::now()))
            .with_logger(SecureLogger::empty()),
    )
}

#[test]
fn test_concurrent_requests_same_session_never_over_admit() {
    let max_requests = 100;
    let gateway = shared_gateway(max_requests);
    let barrier = Arc::new(Barrier::new(CONCURRENCY_LEVEL));
    let admitted = Arc::new(AtomicUsize::new(0));
    let limited = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..CONCURRENCY_LEVEL)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            let barrier = Arc::clone(&barrier);
            let admitted = Arc::clone(&admitted);
            let limited = Arc::clone(&limited);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ITERATIONS_PER_THREAD {
                    match gateway.admit_now("shared", "ping") {
                        Ok(_) => admitted.fetch_add(1, Ordering::SeqCst),
                        Err(GateError::RateLimitExceeded { .. }) => {
                            limited.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(e) => panic!("unexpected rejection: {:?}", e),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    let total = CONCURRENCY_LEVEL * ITERATIONS_PER_THREAD;
    assert_eq!(admitted.load(Ordering::SeqCst), max_requests as usize);
    assert_eq!(limited.load(Ordering::SeqCst), total - max_requests as usize);

    let slot = gateway.store().snapshot("shared");
    assert_eq!(slot.session().unwrap().request_count, max_requests);
}

// =============================================================================
// REAL CLOCK
// =============================================================================

fn real_clock_gateway() -> Arc<SecurityGateway<SystemClock>> {
    let config = GatewayConfig { max_requests: 1_000_000, ..Default::default() };
    Arc::new(SecurityGateway::new(&config).with_logger(SecureLogger::empty()))
}

#[test]
fn test_real_clock_same_session_never_fails_internally() {
    let gateway = real_clock_gateway();
    let barrier = Arc::new(Barrier::new(REAL_CLOCK_THREADS));

    let handles: Vec<_> = (0..REAL_CLOCK_THREADS)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..REAL_CLOCK_ITERATIONS)
                    .filter(|_| gateway.admit_now("shared", "ping").is_err())
                    .count()
            })
        })
        .collect();

    let failures: usize = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .sum();
    assert_eq!(failures, 0);

    let slot = gateway.store().snapshot("shared");
    let expected = (REAL_CLOCK_THREADS * REAL_CLOCK_ITERATIONS) as u32;
    assert_eq!(slot.session().unwrap().request_count, expected);
}

#[test]
fn test_real_clock_app_messages_never_fail_internally() {
    let app = Arc::new(AssistantApp::new(
        SecurityGateway::new(&GatewayConfig { max_requests: 1_000_000, ..Default::default() })
            .with_logger(SecureLogger::empty()),
        EchoPipeline,
    ));

    let handles: Vec<_> = (0..REAL_CLOCK_THREADS)
        .map(|_| {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                for _ in 0..REAL_CLOCK_ITERATIONS / 10 {
                    app.handle_message("shared", Some("Basic Chatbot"), "ping")
                        .expect("valid message on a live session");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}

#[test]
fn test_sweep_alongside_live_traffic() {
    let gateway = real_clock_gateway();

    let workers: Vec<_> = (0..REAL_CLOCK_THREADS)
        .map(|i| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                let session_id = format!("user-{}", i);
                for _ in 0..REAL_CLOCK_ITERATIONS / 10 {
                    gateway.admit_now(&session_id, "hi").expect("live session stays admitted");
                }
            })
        })
        .collect();
    for _ in 0..200 {
        gateway.purge_expired();
        thread::yield_now();
    }
    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    for i in 0..REAL_CLOCK_THREADS {
        assert_eq!(gateway.session_state(&format!("user-{}", i)), SessionState::Active);
    }
}

#[test]
fn test_concurrent_distinct_sessions_are_independent() {
    let gateway = shared_gateway(ITERATIONS_PER_THREAD as u32);

    let handles: Vec<_> = (0..CONCURRENCY_LEVEL)
        .map(|i| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                let session_id = format!("user-{}", i);
                for _ in 0..ITERATIONS_PER_THREAD {
                    gateway.admit_now(&session_id, "hello").expect("within limit");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert_eq!(gateway.store().len(), CONCURRENCY_LEVEL);
    for i in 0..CONCURRENCY_LEVEL {
        let slot = gateway.store().snapshot(&format!("user-{}", i));
        assert_eq!(slot.session().unwrap().request_count, ITERATIONS_PER_THREAD as u32);
    }
}

#[test]
fn test_shared_store_across_gateways() {
    let store = Arc::new(SessionStore::new());
    let clock = MockClock::new(Instant::now());
    let config = GatewayConfig { max_requests: 10, ..Default::default() };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let gateway = SecurityGateway::with_clock(&config, clock.clone())
                .with_store(Arc::clone(&store))
                .with_logger(SecureLogger::empty());
            thread::spawn(move || {
                (0..5).filter(|_| gateway.admit_now("shared", "hi").is_ok()).count()
            })
        })
        .collect();

    let admitted: usize = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .sum();
    assert_eq!(admitted, 10);
}

#[test]
fn test_logout_races_with_requests() {
    let gateway = shared_gateway(10_000);

    let worker = {
        let gateway = Arc::clone(&gateway);
        thread::spawn(move || {
            for _ in 0..ITERATIONS_PER_THREAD * 4 {
                gateway.admit_now("flappy", "hi").expect("logout never rejects");
            }
        })
    };
    for _ in 0..ITERATIONS_PER_THREAD {
        gateway.logout("flappy");
        thread::yield_now();
    }
    worker.join().expect("worker thread panicked");

    // Whatever interleaving happened, the slot is in a valid state
    let slot = gateway.store().snapshot("flappy");
    if let Some(session) = slot.session() {
        assert!(session.request_count >= 1);
    }
}
