//! Detection of the execution environment and the labels it implies.
//!
//! Resolution runs once per manager. It decides which platform service the
//! process runs under, builds the common labels attached to every delivered
//! batch, and fixes the project, zone and encoded log name used for entries.
//!
//! Explicit credentials always resolve to [`ServiceIdentifier::Compute`].
//! Ambient credentials inspect the instance attribute keys:
//!
//! - `gae_backend_name` and `gae_backend_version` → App Engine, with App Engine
//!   and Compute labels and a log name prefixed by the App Engine service;
//! - `job_id` → Dataflow, with only the Dataflow job label;
//! - otherwise → Compute.

mod url_encoding;

use std::collections::BTreeMap;
use std::fmt;

use crate::credentials::Credentials;
use crate::metadata::{
    ATTRIBUTES_PATH, INSTANCE_ID_PATH, MetadataError, MetadataSource, PROJECT_ID_PATH, ZONE_PATH,
    attribute_path, fetch_required,
};

pub use url_encoding::form_encode;

/// Service name reported for plain virtual machines.
pub const COMPUTE_SERVICE_NAME: &str = "compute.googleapis.com";
/// Service name reported for App Engine backends.
pub const APPENGINE_SERVICE_NAME: &str = "appengine.googleapis.com";
/// Service name reported for Dataflow workers.
pub const DATAFLOW_SERVICE_NAME: &str = "dataflow.googleapis.com";

const APPENGINE_NAME_ATTRIBUTE: &str = "gae_backend_name";
const APPENGINE_VERSION_ATTRIBUTE: &str = "gae_backend_version";
const DATAFLOW_JOB_ATTRIBUTE: &str = "job_id";

/// Common labels attached to every batch.
pub type Labels = BTreeMap<String, String>;

/// Platform service the process runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceIdentifier {
    Compute,
    AppEngine,
    Dataflow,
}

impl ServiceIdentifier {
    /// Fully qualified service name used in labels and entry metadata.
    pub const fn service_name(self) -> &'static str {
        match self {
            Self::Compute => COMPUTE_SERVICE_NAME,
            Self::AppEngine => APPENGINE_SERVICE_NAME,
            Self::Dataflow => DATAFLOW_SERVICE_NAME,
        }
    }

    /// Classify an instance from its attribute keys.
    pub fn from_attributes<'a>(attributes: impl IntoIterator<Item = &'a str>) -> Self {
        let (mut app_name, mut app_version, mut job) = (false, false, false);
        for key in attributes {
            match key.trim() {
                APPENGINE_NAME_ATTRIBUTE => app_name = true,
                APPENGINE_VERSION_ATTRIBUTE => app_version = true,
                DATAFLOW_JOB_ATTRIBUTE => job = true,
                _ => {}
            }
        }
        if app_name && app_version {
            Self::AppEngine
        } else if job {
            Self::Dataflow
        } else {
            Self::Compute
        }
    }
}

impl fmt::Display for ServiceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

/// Caller-supplied values that take precedence over metadata lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentOverrides {
    pub project_id: Option<String>,
    pub zone: Option<String>,
    pub vm_id: Option<String>,
}

/// Resolved description of where the process runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    service: ServiceIdentifier,
    common_labels: Labels,
    log_name: String,
    project_id: String,
    zone: String,
}

impl Environment {
    /// Resolve the environment for a manager writing to `log_name`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when a value without an override cannot be
    /// fetched from `metadata`.
    pub fn resolve(
        overrides: &EnvironmentOverrides,
        credentials: &Credentials,
        log_name: &str,
        metadata: &dyn MetadataSource,
    ) -> Result<Self, MetadataError> {
        let project_id = resolve_project_id(overrides.project_id.as_deref(), metadata)?;
        let zone = resolve_zone(overrides.zone.as_deref(), metadata)?;
        let service = detect_service(credentials, metadata)?;
        let vm_id = overrides.vm_id.as_deref();

        let (common_labels, log_name) = match service {
            ServiceIdentifier::Compute => {
                (compute_labels(&resolve_vm_id(vm_id, metadata)?), log_name.to_owned())
            }
            ServiceIdentifier::AppEngine => {
                let mut labels = appengine_labels(metadata)?;
                labels.extend(compute_labels(&resolve_vm_id(vm_id, metadata)?));
                (labels, format!("{APPENGINE_SERVICE_NAME}/{log_name}"))
            }
            ServiceIdentifier::Dataflow => (dataflow_labels(metadata)?, log_name.to_owned()),
        };

        Ok(Self {
            service,
            common_labels,
            log_name: form_encode(&log_name),
            project_id,
            zone,
        })
    }

    pub fn service(&self) -> ServiceIdentifier {
        self.service
    }

    pub fn common_labels(&self) -> &Labels {
        &self.common_labels
    }

    /// Form-encoded log name, including any service prefix.
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }
}

fn detect_service(
    credentials: &Credentials,
    metadata: &dyn MetadataSource,
) -> Result<ServiceIdentifier, MetadataError> {
    if !credentials.is_ambient() {
        return Ok(ServiceIdentifier::Compute);
    }
    let listing = fetch_required(metadata, ATTRIBUTES_PATH)?;
    Ok(ServiceIdentifier::from_attributes(listing.lines()))
}

/// Return `vm_id` if set, otherwise the instance id from metadata.
pub fn resolve_vm_id(
    vm_id: Option<&str>,
    metadata: &dyn MetadataSource,
) -> Result<String, MetadataError> {
    match vm_id {
        Some(id) => Ok(id.to_owned()),
        None => fetch_required(metadata, INSTANCE_ID_PATH),
    }
}

/// Return `zone` if set, otherwise the last segment of the instance zone.
pub fn resolve_zone(
    zone: Option<&str>,
    metadata: &dyn MetadataSource,
) -> Result<String, MetadataError> {
    match zone {
        Some(zone) => Ok(zone.to_owned()),
        None => {
            let qualified = fetch_required(metadata, ZONE_PATH)?;
            Ok(qualified
                .trim()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_owned())
        }
    }
}

/// Return `project_id` if set, otherwise the project id from metadata.
pub fn resolve_project_id(
    project_id: Option<&str>,
    metadata: &dyn MetadataSource,
) -> Result<String, MetadataError> {
    match project_id {
        Some(id) => Ok(id.to_owned()),
        None => fetch_required(metadata, PROJECT_ID_PATH),
    }
}

fn compute_labels(vm_id: &str) -> Labels {
    Labels::from([
        (
            format!("{COMPUTE_SERVICE_NAME}/resource_type"),
            "instance".to_owned(),
        ),
        (format!("{COMPUTE_SERVICE_NAME}/resource_id"), vm_id.to_owned()),
    ])
}

fn appengine_labels(metadata: &dyn MetadataSource) -> Result<Labels, MetadataError> {
    let module_id = fetch_required(metadata, &attribute_path(APPENGINE_NAME_ATTRIBUTE))?;
    let version_id = fetch_required(metadata, &attribute_path(APPENGINE_VERSION_ATTRIBUTE))?;
    Ok(Labels::from([
        (format!("{APPENGINE_SERVICE_NAME}/module_id"), module_id),
        (format!("{APPENGINE_SERVICE_NAME}/version_id"), version_id),
    ]))
}

fn dataflow_labels(metadata: &dyn MetadataSource) -> Result<Labels, MetadataError> {
    let job_id = fetch_required(metadata, &attribute_path(DATAFLOW_JOB_ATTRIBUTE))?;
    Ok(Labels::from([(
        format!("{DATAFLOW_SERVICE_NAME}/job_id"),
        job_id,
    )]))
}
