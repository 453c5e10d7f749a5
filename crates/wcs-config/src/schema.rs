//! Schema registry interface.
//!
//! The registry is an external collaborator: it supplies default values and
//! per-key scopes. The service only ever reads from it, and reacts to its
//! "schema changed" and "defaults changed" signals through dedicated entry
//! points on the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ConfigurationModel;

/// Where a setting is allowed to be defined.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingScope {
    /// Application-wide; only the user layer may set it.
    Application,
    /// Per window; user and workspace layers may set it.
    Window,
    /// Per resource; every layer including folders may set it.
    Resource,
}

/// Which settings file a piece of content is being loaded for.
///
/// Determines the scope filter applied during parsing: folder settings admit
/// only resource-scoped keys, workspace settings additionally admit
/// window-scoped keys, user settings admit everything.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SettingsTarget {
    User,
    Workspace,
    Folder,
}

impl SettingsTarget {
    /// Whether a key of the given scope may appear at this target.
    ///
    /// Keys unknown to the registry are admitted everywhere; the registry is
    /// not required to be complete.
    #[must_use]
    pub fn allows(self, scope: Option<SettingScope>) -> bool {
        match (self, scope) {
            (_, None) | (SettingsTarget::User, _) => true,
            (SettingsTarget::Workspace, Some(scope)) => scope != SettingScope::Application,
            (SettingsTarget::Folder, Some(scope)) => scope == SettingScope::Resource,
        }
    }
}

/// Read-only view of the setting schema.
pub trait SchemaRegistry: Send + Sync {
    /// The default-values layer.
    fn defaults(&self) -> ConfigurationModel;

    /// The declared scope of a key, if the key is registered.
    fn scope(&self, key: &str) -> Option<SettingScope>;

    /// All registered keys.
    fn known_keys(&self) -> Vec<String>;
}

/// A plain in-memory registry.
///
/// Sufficient for embedders that register their schema up front; the service
/// itself never assumes more than the [`SchemaRegistry`] trait.
#[derive(Default)]
pub struct SimpleSchemaRegistry {
    defaults: ConfigurationModel,
    scopes: std::collections::HashMap<String, SettingScope>,
}

impl SimpleSchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: &str, scope: SettingScope, default: Value) {
        self.scopes.insert(key.to_string(), scope);
        self.defaults.insert(key, default);
    }
}

impl SchemaRegistry for SimpleSchemaRegistry {
    fn defaults(&self) -> ConfigurationModel {
        self.defaults.clone()
    }

    fn scope(&self, key: &str) -> Option<SettingScope> {
        self.scopes.get(key).copied()
    }

    fn known_keys(&self) -> Vec<String> {
        self.defaults.keys().to_vec()
    }
}
