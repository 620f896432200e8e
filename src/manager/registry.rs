//! Global registry mapping manager names to shared instances.
//!
//! The map is guarded by a `parking_lot::RwLock`; each name owns a
//! `OnceCell` slot so creation is single-flight per name. Concurrent first
//! lookups of one name block on the same slot while lookups of other names
//! proceed. A failed creation leaves the slot empty and the next lookup
//! retries.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use crate::config::{ConfigError, ManagerConfig};

use super::{CloudLoggingManager, ManagerError};

type Slot = Arc<OnceCell<Arc<CloudLoggingManager>>>;

#[derive(Default)]
struct Registry {
    managers: HashMap<String, Slot>,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

fn slot_for(name: &str) -> Slot {
    if let Some(slot) = REGISTRY.read().managers.get(name) {
        return Arc::clone(slot);
    }
    let mut registry = REGISTRY.write();
    Arc::clone(registry.managers.entry(name.to_owned()).or_default())
}

/// Return the manager registered as `name`, creating it with `create` if
/// absent.
///
/// `create` runs at most once per successful registration, even when several
/// threads ask for the same name concurrently.
///
/// # Errors
///
/// Returns [`ManagerError::Config`] for a blank name, or the error produced by
/// `create`.
pub fn get_or_create_manager<F>(name: &str, create: F) -> Result<Arc<CloudLoggingManager>, ManagerError>
where
    F: FnOnce() -> Result<CloudLoggingManager, ManagerError>,
{
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidConfig("manager name must not be empty".into()).into());
    }
    let slot = slot_for(name);
    slot.get_or_try_init(|| create().map(Arc::new)).cloned()
}

/// Return the manager for `config.name`, building the production manager on
/// first use.
///
/// # Errors
///
/// See [`CloudLoggingManager::from_config`].
pub fn get_manager(config: &ManagerConfig) -> Result<Arc<CloudLoggingManager>, ManagerError> {
    get_or_create_manager(&config.name, || CloudLoggingManager::from_config(config))
}

/// Return the manager registered as `name`, if it has been created.
pub fn lookup_manager(name: &str) -> Option<Arc<CloudLoggingManager>> {
    REGISTRY
        .read()
        .managers
        .get(name)
        .and_then(|slot| slot.get().cloned())
}

/// Unregister `name`, returning its manager if one was created.
pub fn remove_manager(name: &str) -> Option<Arc<CloudLoggingManager>> {
    REGISTRY
        .write()
        .managers
        .remove(name)
        .and_then(|slot| slot.get().cloned())
}

/// Drop every registered manager.
pub fn reset_registry() {
    REGISTRY.write().managers.clear();
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use serial_test::serial;

    use super::*;
    use crate::credentials::Credentials;
    use crate::environment::EnvironmentOverrides;
    use crate::metadata::MetadataError;
    use crate::test_utils::doubles::{RecordingTransport, StaticMetadata};

    fn build(name: &str) -> Result<CloudLoggingManager, ManagerError> {
        Ok(CloudLoggingManager::resolve(
            name,
            &EnvironmentOverrides::default(),
            &Credentials::Ambient,
            "log_name",
            &StaticMetadata::compute(),
            Box::new(RecordingTransport::new()),
        )?)
    }

    #[test]
    #[serial]
    fn returns_same_instance_for_same_name() {
        reset_registry();
        let first = get_or_create_manager("shared", || build("shared")).expect("create");
        let second = get_or_create_manager("shared", || panic!("must not rebuild")).expect("lookup");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(lookup_manager("shared").is_some());
    }

    #[test]
    #[serial]
    fn distinct_names_get_distinct_managers() {
        reset_registry();
        let a = get_or_create_manager("a", || build("a")).expect("create a");
        let b = get_or_create_manager("b", || build("b")).expect("create b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "a");
        assert_eq!(b.name(), "b");
    }

    #[test]
    #[serial]
    fn concurrent_first_use_creates_once() {
        reset_registry();
        let created = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let created = Arc::clone(&created);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    get_or_create_manager("racy", || {
                        created.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        build("racy")
                    })
                    .expect("create")
                })
            })
            .collect();

        let managers: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(managers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    #[serial]
    fn failed_creation_is_retried() {
        reset_registry();
        let err = get_or_create_manager("flaky", || {
            Err(ManagerError::Metadata(MetadataError {
                path: "instance/zone".into(),
                source: std::io::Error::other("down"),
            }))
        })
        .unwrap_err();
        assert!(matches!(err, ManagerError::Metadata(_)));
        assert!(lookup_manager("flaky").is_none());

        let manager = get_or_create_manager("flaky", || build("flaky")).expect("retry");
        assert_eq!(manager.name(), "flaky");
    }

    #[test]
    #[serial]
    fn remove_and_reset_forget_managers() {
        reset_registry();
        get_or_create_manager("gone", || build("gone")).expect("create");
        assert!(remove_manager("gone").is_some());
        assert!(lookup_manager("gone").is_none());

        get_or_create_manager("also-gone", || build("also-gone")).expect("create");
        reset_registry();
        assert!(lookup_manager("also-gone").is_none());
    }

    #[test]
    fn rejects_blank_names() {
        let err = get_or_create_manager("  ", || panic!("must not build")).unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));
    }
}
