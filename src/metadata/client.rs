//! HTTP client for the compute metadata server.

use std::fmt;
use std::io;
use std::time::Duration;

use log::debug;
use ureq::{Agent, AgentBuilder};

use super::MetadataSource;

/// Base URL of the metadata server reachable from inside the platform.
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1/";
/// Connect and read timeout for metadata lookups.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(2);

const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR: &str = "Google";

/// [`MetadataSource`] backed by blocking HTTP requests.
#[derive(Clone)]
pub struct MetadataClient {
    base_url: String,
    agent: Agent,
}

impl MetadataClient {
    /// Create a client rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_URL, DEFAULT_METADATA_TIMEOUT)
    }
}

impl fmt::Debug for MetadataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl MetadataSource for MetadataClient {
    fn fetch(&self, path: &str) -> io::Result<String> {
        let url = self.url_for(path);
        debug!("MetadataClient fetching {url}");
        match self
            .agent
            .get(&url)
            .set(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .call()
        {
            Ok(response) => response.into_string(),
            Err(ureq::Error::Status(404, _)) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("metadata path not found: {url}"),
            )),
            Err(ureq::Error::Status(code, _)) => Err(io::Error::other(format!(
                "metadata server returned status {code} for {url}"
            ))),
            Err(ureq::Error::Transport(err)) => Err(io::Error::other(err.to_string())),
        }
    }
}
