//! Access tokens for the logging API.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::credentials::Credentials;
use crate::metadata::MetadataSource;

/// Metadata path serving tokens for the VM's default service account.
pub const DEFAULT_TOKEN_PATH: &str = "instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for outgoing requests.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> io::Result<String>;
}

/// A fixed token supplied with explicit credentials.
#[derive(Clone)]
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticTokenSource {
    fn access_token(&self) -> io::Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Tokens for the ambient identity, read from the metadata server.
pub struct MetadataTokenSource {
    metadata: Arc<dyn MetadataSource>,
    cached: Mutex<Option<CachedToken>>,
}

impl MetadataTokenSource {
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            metadata,
            cached: Mutex::new(None),
        }
    }
}

impl TokenSource for MetadataTokenSource {
    fn access_token(&self) -> io::Result<String> {
        let mut cached = self.cached.lock();
        let now = Instant::now();
        if let Some(token) = cached.as_ref()
            && now < token.refresh_at
        {
            return Ok(token.token.clone());
        }

        let raw = self.metadata.fetch(DEFAULT_TOKEN_PATH)?;
        let response: TokenResponse = serde_json::from_str(&raw)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!("MetadataTokenSource refreshed token valid for {lifetime:?}");
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            refresh_at: now + lifetime,
        });
        Ok(response.access_token)
    }
}

/// Pick the token source matching `credentials`.
pub fn token_source_for(
    credentials: &Credentials,
    metadata: Arc<dyn MetadataSource>,
) -> Box<dyn TokenSource> {
    match credentials {
        Credentials::Ambient => Box::new(MetadataTokenSource::new(metadata)),
        Credentials::Explicit { key_material, .. } => {
            Box::new(StaticTokenSource::new(key_material.clone()))
        }
    }
}
