//! Access to facts about the hosting VM.
//!
//! A [`MetadataSource`] answers path-addressed lookups such as
//! `project/project-id` or `instance/attributes/`. [`MetadataClient`] talks to
//! the compute metadata server; tests substitute an in-memory source.

mod client;

use std::io;
use std::sync::Arc;

use thiserror::Error;

pub use client::{DEFAULT_METADATA_TIMEOUT, DEFAULT_METADATA_URL, MetadataClient};

/// Path listing the project identifier.
pub const PROJECT_ID_PATH: &str = "project/project-id";
/// Path listing the fully qualified zone, e.g. `projects/123/zones/europe-west1-d`.
pub const ZONE_PATH: &str = "instance/zone";
/// Path listing the numeric VM identifier.
pub const INSTANCE_ID_PATH: &str = "instance/id";
/// Path listing the instance attribute keys, one per line.
pub const ATTRIBUTES_PATH: &str = "instance/attributes/";

/// Path of a single instance attribute.
pub fn attribute_path(key: &str) -> String {
    format!("{ATTRIBUTES_PATH}{key}")
}

/// Synchronous lookup of environment metadata.
pub trait MetadataSource: Send + Sync {
    /// Return the raw value stored at `path`.
    fn fetch(&self, path: &str) -> io::Result<String>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn fetch(&self, path: &str) -> io::Result<String> {
        (**self).fetch(path)
    }
}

impl<T: MetadataSource + ?Sized> MetadataSource for Arc<T> {
    fn fetch(&self, path: &str) -> io::Result<String> {
        (**self).fetch(path)
    }
}

/// A required metadata value could not be fetched and had no override.
#[derive(Debug, Error)]
#[error("failed to fetch metadata path \"{path}\": {source}")]
pub struct MetadataError {
    /// Metadata path that was requested.
    pub path: String,
    /// Underlying I/O failure reported by the source.
    #[source]
    pub source: io::Error,
}

/// Fetch `path`, attaching the path to any failure.
pub(crate) fn fetch_required(
    source: &dyn MetadataSource,
    path: &str,
) -> Result<String, MetadataError> {
    source.fetch(path).map_err(|source| MetadataError {
        path: path.to_owned(),
        source,
    })
}
