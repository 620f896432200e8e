//! Process-wide registry of named managers.

mod test_utils;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use cloudlogging::{
    CloudLoggingHandler, LogHandler, LogLevel, LogRecord, ManagerConfig, get_or_create_manager,
    lookup_manager, remove_manager, reset_registry,
};
use serial_test::serial;

use test_utils::{compute_manager, recording_transport};

#[test]
#[serial]
fn handlers_for_one_name_share_a_manager() {
    reset_registry();
    let transport = recording_transport();
    let manager = get_or_create_manager("shared", || Ok(compute_manager(Arc::clone(&transport))))
        .expect("create manager");

    let config = ManagerConfig::builder("shared").build().expect("config");
    // The registered manager is reused, so no metadata server is contacted.
    let first = CloudLoggingHandler::from_config(&config).expect("first handler");
    let second = CloudLoggingHandler::from_config(&config).expect("second handler");
    assert!(Arc::ptr_eq(first.manager(), &manager));
    assert!(Arc::ptr_eq(second.manager(), &manager));

    first
        .handle(LogRecord::new(LogLevel::Info, "from first"))
        .expect("handle");
    second
        .handle(LogRecord::new(LogLevel::Info, "from second").with_end_of_batch(true))
        .expect("handle");

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request.entries.len(), 2);
}

#[test]
#[serial]
fn concurrent_first_use_resolves_once() {
    reset_registry();
    const THREADS: usize = 12;
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let builds = Arc::clone(&builds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                get_or_create_manager("contended", || {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(compute_manager(recording_transport()))
                })
                .expect("manager")
            })
        })
        .collect();

    let managers: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(managers.iter().all(|m| Arc::ptr_eq(m, &managers[0])));
}

#[test]
#[serial]
fn removed_names_are_rebuilt() {
    reset_registry();
    let first = get_or_create_manager("cycled", || Ok(compute_manager(recording_transport())))
        .expect("create");
    let removed = remove_manager("cycled").expect("registered");
    assert!(Arc::ptr_eq(&first, &removed));
    assert!(lookup_manager("cycled").is_none());

    let second = get_or_create_manager("cycled", || Ok(compute_manager(recording_transport())))
        .expect("recreate");
    assert!(!Arc::ptr_eq(&first, &second));
}
