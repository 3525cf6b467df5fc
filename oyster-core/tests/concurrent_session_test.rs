//! Concurrent session tests
//!
//! Many threads hammer one session manager at once. Exclusivity of a user
//! name must hold no matter how the threads interleave.
//!
//! Run with: cargo test --test concurrent_session_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use oyster_core::adapters::FileUserStore;
use oyster_core::ports::NoopAuditLog;
use oyster_core::services::{SessionManager, SessionSettings};
use oyster_core::Error;

/// Number of concurrent threads for stress tests
const THREAD_COUNT: usize = 8;

/// Number of iterations per thread
const ITERATIONS_PER_THREAD: usize = 10;

fn shared_manager(dir: &TempDir) -> Arc<SessionManager> {
    let store = Arc::new(FileUserStore::open(dir.path()).unwrap());
    Arc::new(SessionManager::new(
        store,
        Arc::new(NoopAuditLog),
        SessionSettings::default(),
    ))
}

/// N concurrent registrations of one name: exactly one wins, the rest are
/// duplicates.
#[test]
fn test_concurrent_register_same_name() {
    let temp_dir = TempDir::new().unwrap();
    let manager = shared_manager(&temp_dir);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let duplicate_count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let success_count = Arc::clone(&success_count);
            let duplicate_count = Arc::clone(&duplicate_count);

            thread::spawn(move || {
                barrier.wait();
                match manager.register("contested", "password") {
                    Ok(_) => {
                        success_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(Error::Duplicate(_)) => {
                        duplicate_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(success_count.load(Ordering::SeqCst), 1);
    assert_eq!(duplicate_count.load(Ordering::SeqCst), THREAD_COUNT - 1);
    assert_eq!(manager.active_sessions(), 1);
}

/// N concurrent logins of one persisted user: exactly one session opens
#[test]
fn test_concurrent_login_same_user() {
    let temp_dir = TempDir::new().unwrap();
    let manager = shared_manager(&temp_dir);

    let session = manager.register("shared", "password").unwrap();
    manager.logout(&session.token).unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let rejected_count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let success_count = Arc::clone(&success_count);
            let rejected_count = Arc::clone(&rejected_count);

            thread::spawn(move || {
                barrier.wait();
                match manager.login("shared", "password") {
                    Ok(_) => {
                        success_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(Error::SessionActive) => {
                        rejected_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(success_count.load(Ordering::SeqCst), 1);
    assert_eq!(rejected_count.load(Ordering::SeqCst), THREAD_COUNT - 1);
}

/// Each thread cycles its own user through register, login and logout
/// while the others do the same. Every cycle must see its own data.
#[test]
fn test_concurrent_independent_users() {
    let temp_dir = TempDir::new().unwrap();
    let manager = shared_manager(&temp_dir);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let error_count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let error_count = Arc::clone(&error_count);

            thread::spawn(move || {
                let name = format!("user{thread_id}");
                barrier.wait();

                let session = match manager.register(&name, "password") {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Thread {thread_id}: register failed: {e}");
                        error_count.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                };
                let mut token = session.token;

                for i in 0..ITERATIONS_PER_THREAD {
                    let user = manager.valid_session(&token).expect("session should be valid");
                    user.add_rule(oyster_core::Rule::new(format!("rule{i}"), "Misc"));

                    if let Err(e) = manager.logout(&token) {
                        eprintln!("Thread {thread_id}: logout failed: {e}");
                        error_count.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    match manager.login(&name, "password") {
                        Ok(s) => {
                            assert_eq!(s.user.rules().len(), i + 1);
                            token = s.token;
                        }
                        Err(e) => {
                            eprintln!("Thread {thread_id}: login failed: {e}");
                            error_count.fetch_add(1, Ordering::SeqCst);
                            return;
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(error_count.load(Ordering::SeqCst), 0);
    assert_eq!(manager.active_sessions(), THREAD_COUNT);
    manager.shutdown().unwrap();
}

/// Logins racing a logout of the same user never observe a stale record
#[test]
fn test_login_racing_logout_sees_latest_data() {
    let temp_dir = TempDir::new().unwrap();
    let manager = shared_manager(&temp_dir);

    let session = manager.register("racer", "password").unwrap();
    manager.logout(&session.token).unwrap();

    for round in 0..ITERATIONS_PER_THREAD {
        let session = loop {
            match manager.login("racer", "password") {
                Ok(s) => break s,
                Err(Error::SessionActive) => thread::yield_now(),
                Err(e) => panic!("unexpected error: {e}"),
            }
        };
        assert_eq!(session.user.rules().len(), round);
        session.user.add_rule(oyster_core::Rule::new(format!("r{round}"), "Misc"));

        let barrier = Arc::new(Barrier::new(2));
        let logout = {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let token = session.token.clone();
            thread::spawn(move || {
                barrier.wait();
                manager.logout(&token).unwrap();
            })
        };
        let login = {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                match manager.login("racer", "password") {
                    Ok(s) => {
                        // Anything we load must already include this round's rule
                        assert_eq!(s.user.rules().len(), round + 1);
                        manager.logout(&s.token).unwrap();
                    }
                    Err(Error::SessionActive) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        };
        logout.join().expect("Thread panicked");
        login.join().expect("Thread panicked");
    }
}
