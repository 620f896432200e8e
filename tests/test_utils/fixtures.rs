//! Fixtures building managers over in-memory doubles so integration tests
//! run without a metadata server or network access.

use std::sync::Arc;

use cloudlogging::test_utils::doubles::{RecordingTransport, StaticMetadata};
use cloudlogging::{CloudLoggingManager, Credentials, EnvironmentOverrides};
use rstest::fixture;

/// A transport that records every request.
#[fixture]
pub fn recording_transport() -> Arc<RecordingTransport> {
    Arc::new(RecordingTransport::new())
}

/// A manager on a plain VM writing to `log_name` through `transport`.
pub fn compute_manager(transport: Arc<RecordingTransport>) -> CloudLoggingManager {
    CloudLoggingManager::resolve(
        "integration",
        &EnvironmentOverrides::default(),
        &Credentials::Ambient,
        "log_name",
        &StaticMetadata::compute(),
        Box::new(transport),
    )
    .expect("resolve manager")
}
