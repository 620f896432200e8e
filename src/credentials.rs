//! Identity used to talk to the logging backend.

use std::fmt;

/// How the process authenticates against Cloud Logging.
///
/// The choice also drives environment detection: only ambient identities are
/// probed for App Engine or Dataflow markers, and only explicit identities
/// attach a user id to each entry.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Identity assigned to the VM by the hosting platform.
    #[default]
    Ambient,
    /// A service account supplied by the caller.
    Explicit {
        /// Service account identifier, e.g. `svc@project.iam.gserviceaccount.com`.
        account_id: String,
        /// OAuth2 access token minted for `account_id`.
        key_material: String,
    },
}

impl Credentials {
    /// Build explicit credentials for `account_id`.
    pub fn explicit(account_id: impl Into<String>, key_material: impl Into<String>) -> Self {
        Self::Explicit {
            account_id: account_id.into(),
            key_material: key_material.into(),
        }
    }

    /// Whether the identity comes from the hosting platform.
    pub fn is_ambient(&self) -> bool {
        matches!(self, Self::Ambient)
    }

    /// Account identifier attached to entries as `userId`.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Ambient => None,
            Self::Explicit { account_id, .. } => Some(account_id),
        }
    }
}

// Key material stays out of debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient => f.write_str("Ambient"),
            Self::Explicit { account_id, .. } => f
                .debug_struct("Explicit")
                .field("account_id", account_id)
                .field("key_material", &"<redacted>")
                .finish(),
        }
    }
}
