//! Installing the `log` facade bridge as the global logger.

mod test_utils;

use std::num::NonZeroUsize;
use std::sync::Arc;

use cloudlogging::log_compat::install;
use cloudlogging::{CloudLogAdapter, CloudLoggingHandler};
use log::LevelFilter;

use test_utils::{compute_manager, recording_transport};

#[test]
fn facade_records_reach_the_backend() {
    let transport = recording_transport();
    let manager = Arc::new(compute_manager(Arc::clone(&transport)));
    let handler = CloudLoggingHandler::new(Arc::clone(&manager), false);
    let adapter = CloudLogAdapter::new(Box::new(handler))
        .with_batch_size(NonZeroUsize::new(2).expect("non-zero"));

    install(adapter, LevelFilter::Info).expect("no logger installed yet");

    log::debug!(target: "app", "filtered out");
    log::info!(target: "app", "first");
    assert_eq!(manager.pending(), 1);
    log::warn!(target: "app", "second");

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let entries = &sent[0].request.entries;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text_payload, "first");
    assert_eq!(entries[1].metadata.severity, "WARNING");

    log::error!(target: "app", "third");
    log::logger().flush();
    assert_eq!(transport.send_count(), 2);

    let second = CloudLogAdapter::new(Box::new(CloudLoggingHandler::new(manager, false)));
    assert!(install(second, LevelFilter::Info).is_err());
}
