//! Change events emitted by the service.

use serde_json::Value;
use url::Url;

use wcs_config::ConfigurationTarget;
use wcs_workspace::{WorkbenchState, WorkspaceFoldersChange};

/// Consolidated configuration change notification.
///
/// Carries the minimal set of dotted keys whose effective value changed,
/// the scoping resource when the change is folder-specific, and a snapshot
/// of the changed layer's raw contents for telemetry-style consumers.
#[derive(Clone, Debug)]
pub struct ConfigurationChangeEvent {
    pub affected_keys: Vec<String>,
    /// The folder resource the change is scoped to, if any.
    pub resource: Option<Url>,
    /// The layer the change originated from.
    pub target: ConfigurationTarget,
    /// Raw contents of the changed layer at the time of the event.
    pub raw: Option<Value>,
}

impl ConfigurationChangeEvent {
    /// Whether the event affects `key` or any key beneath it.
    ///
    /// Keys changed inside override sections are reported in bracketed form
    /// (`"[ident].key"`) and match their bare key here as well.
    #[must_use]
    pub fn affects(&self, key: &str) -> bool {
        self.affected_keys.iter().any(|affected| {
            let bare = affected
                .strip_prefix('[')
                .and_then(|rest| rest.split_once("]."))
                .map_or(affected.as_str(), |(_, k)| k);
            bare == key || bare.starts_with(key) && bare[key.len()..].starts_with('.')
        })
    }
}

/// Folder membership change notification.
pub type WorkspaceFoldersChangeEvent = WorkspaceFoldersChange;

/// Workspace display-name change notification.
#[derive(Clone, Debug)]
pub struct WorkspaceNameChangeEvent {
    pub name: String,
}

/// Workspace kind change notification.
#[derive(Clone, Debug)]
pub struct WorkbenchStateChangeEvent {
    pub state: WorkbenchState,
}
