pub mod fixtures;

pub use fixtures::{compute_manager, recording_transport};
