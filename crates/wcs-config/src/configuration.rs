//! The layer aggregator.
//!
//! [`Configuration`] composes the five layers (defaults, user, workspace,
//! per-folder, memory) into effective values. It is exclusively mutated by
//! the orchestrator through typed compare-and-update entry points, each of
//! which reports exactly the dotted keys whose *effective* value changed —
//! compared against resolved values before and after the swap, not against
//! raw layer contents, since a key unchanged in the new layer may have been
//! overridden and reverted by another layer.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::model::ConfigurationModel;

/// Scoping applied to a read or write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationOverrides {
    /// Resource whose owning folder's layer (and per-resource memory section)
    /// should participate in resolution.
    pub resource: Option<Url>,
    /// Override identifier preferring each layer's override section.
    pub override_identifier: Option<String>,
}

impl ConfigurationOverrides {
    #[must_use]
    pub fn for_resource(resource: Url) -> Self {
        ConfigurationOverrides {
            resource: Some(resource),
            override_identifier: None,
        }
    }

    #[must_use]
    pub fn for_identifier(identifier: &str) -> Self {
        ConfigurationOverrides {
            resource: None,
            override_identifier: Some(identifier.to_string()),
        }
    }
}

/// Which layer a write is aimed at.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ConfigurationTarget {
    Default,
    User,
    Workspace,
    WorkspaceFolder,
    Memory,
}

/// Per-layer view of a single key, for diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inspect {
    pub default_value: Option<Value>,
    pub user_value: Option<Value>,
    pub workspace_value: Option<Value>,
    pub workspace_folder_value: Option<Value>,
    pub memory_value: Option<Value>,
    /// The effective value after full resolution.
    pub value: Option<Value>,
}

/// Per-scope key enumeration.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConfigurationKeys {
    pub default: Vec<String>,
    pub user: Vec<String>,
    pub workspace: Vec<String>,
    pub workspace_folder: Vec<String>,
}

/// Serializable snapshot of all layers, for transfer across a process
/// boundary. Folder entries are sorted by resource for determinism.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationData {
    pub defaults: ConfigurationModel,
    pub user: ConfigurationModel,
    pub workspace: ConfigurationModel,
    pub folders: Vec<(Url, ConfigurationModel)>,
}

/// The composed configuration. Precedence is strictly
/// `memory > folder(resource) > workspace > user > default`, with override
/// sections applied within each layer before cross-layer resolution.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    defaults: ConfigurationModel,
    user: ConfigurationModel,
    workspace: ConfigurationModel,
    folders: FxHashMap<Url, ConfigurationModel>,
    memory: ConfigurationModel,
    memory_by_resource: FxHashMap<Url, ConfigurationModel>,
}

impl Configuration {
    #[must_use]
    pub fn new(
        defaults: ConfigurationModel,
        user: ConfigurationModel,
        workspace: ConfigurationModel,
        folders: FxHashMap<Url, ConfigurationModel>,
    ) -> Self {
        Configuration {
            defaults,
            user,
            workspace,
            folders,
            memory: ConfigurationModel::default(),
            memory_by_resource: FxHashMap::default(),
        }
    }

    /// Resolve a key through the full precedence chain. With no key, the
    /// consolidated tree for the given scope is returned.
    #[must_use]
    pub fn get_value(&self, key: Option<&str>, overrides: &ConfigurationOverrides) -> Option<Value> {
        match key {
            Some(key) => self
                .resolve(key, overrides.resource.as_ref(), overrides.override_identifier.as_deref())
                .cloned(),
            None => Some(Value::Object(
                self.consolidated(overrides.resource.as_ref()).contents().clone(),
            )),
        }
    }

    /// The value visible at each individual layer plus the resolved value.
    #[must_use]
    pub fn inspect(&self, key: &str, overrides: &ConfigurationOverrides) -> Inspect {
        let ident = overrides.override_identifier.as_deref();
        let resource = overrides.resource.as_ref();
        let folder_model = resource.and_then(|r| self.owner_of(r)).and_then(|o| self.folders.get(&o));
        let memory_model = resource.and_then(|r| self.memory_by_resource.get(r));

        Inspect {
            default_value: layer_value(&self.defaults, key, ident).cloned(),
            user_value: layer_value(&self.user, key, ident).cloned(),
            workspace_value: layer_value(&self.workspace, key, ident).cloned(),
            workspace_folder_value: folder_model.and_then(|m| layer_value(m, key, ident)).cloned(),
            memory_value: memory_model
                .and_then(|m| layer_value(m, key, ident))
                .or_else(|| layer_value(&self.memory, key, ident))
                .cloned(),
            value: self.resolve(key, resource, ident).cloned(),
        }
    }

    /// Per-layer key enumeration.
    #[must_use]
    pub fn keys(&self) -> ConfigurationKeys {
        let mut workspace_folder: Vec<String> = Vec::new();
        for model in self.folders.values() {
            for key in model.keys() {
                if !workspace_folder.contains(key) {
                    workspace_folder.push(key.clone());
                }
            }
        }
        ConfigurationKeys {
            default: self.defaults.keys().to_vec(),
            user: self.user.keys().to_vec(),
            workspace: self.workspace.keys().to_vec(),
            workspace_folder,
        }
    }

    /// Serializable snapshot of the persisted layers.
    #[must_use]
    pub fn to_data(&self) -> ConfigurationData {
        let mut folders: Vec<(Url, ConfigurationModel)> = self
            .folders
            .iter()
            .map(|(url, model)| (url.clone(), model.clone()))
            .collect();
        folders.sort_by(|a, b| a.0.cmp(&b.0));
        ConfigurationData {
            defaults: self.defaults.clone(),
            user: self.user.clone(),
            workspace: self.workspace.clone(),
            folders,
        }
    }

    /// Unsupported keys across the workspace and folder layers, recomputed on
    /// every call.
    #[must_use]
    pub fn unsupported_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.workspace.unsupported_keys().to_vec();
        for model in self.folders.values() {
            for key in model.unsupported_keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }

    #[must_use]
    pub fn folder(&self, resource: &Url) -> Option<&ConfigurationModel> {
        self.folders.get(resource)
    }

    /// Changed keys between this configuration's effective view and
    /// `other`'s, both resolved without a resource scope. Used when a whole
    /// configuration is rebuilt rather than patched layer by layer.
    #[must_use]
    pub fn compare_effective(&self, other: &Configuration) -> BTreeSet<String> {
        self.consolidated(None).compare(&other.consolidated(None))
    }

    /// Replace the defaults layer (schema defaults changed).
    pub fn compare_and_update_defaults(&mut self, defaults: ConfigurationModel) -> BTreeSet<String> {
        let candidates = self.defaults.compare(&defaults);
        self.effective_changes(&candidates, None, |c| c.defaults = defaults)
    }

    pub fn compare_and_update_user_configuration(
        &mut self,
        user: ConfigurationModel,
    ) -> BTreeSet<String> {
        let candidates = self.user.compare(&user);
        self.effective_changes(&candidates, None, |c| c.user = user)
    }

    pub fn compare_and_update_workspace_configuration(
        &mut self,
        workspace: ConfigurationModel,
    ) -> BTreeSet<String> {
        let candidates = self.workspace.compare(&workspace);
        self.effective_changes(&candidates, None, |c| c.workspace = workspace)
    }

    pub fn compare_and_update_folder_configuration(
        &mut self,
        resource: &Url,
        model: ConfigurationModel,
    ) -> BTreeSet<String> {
        let previous = self.folders.get(resource).cloned().unwrap_or_default();
        let candidates = previous.compare(&model);
        let resource_key = resource.clone();
        self.effective_changes(&candidates, Some(resource), move |c| {
            c.folders.insert(resource_key, model);
        })
    }

    pub fn compare_and_delete_folder_configuration(&mut self, resource: &Url) -> BTreeSet<String> {
        let Some(previous) = self.folders.get(resource).cloned() else {
            return BTreeSet::new();
        };
        let candidates = previous.compare(&ConfigurationModel::default());
        self.effective_changes(&candidates, Some(resource), |c| {
            c.folders.remove(resource);
            // Per-resource memory for anything under the removed root goes too.
            c.memory_by_resource
                .retain(|r, _| !resource_inside(resource, r));
        })
    }

    /// Write directly into the memory layer. Takes effect immediately; no
    /// file I/O is involved. `None` removes the key.
    pub fn update_value(
        &mut self,
        key: &str,
        value: Option<Value>,
        overrides: &ConfigurationOverrides,
    ) -> BTreeSet<String> {
        let candidate = match overrides.override_identifier.as_deref() {
            Some(ident) => format!("[{ident}].{key}"),
            None => key.to_string(),
        };
        let candidates: BTreeSet<String> = std::iter::once(candidate).collect();
        let ident = overrides.override_identifier.clone();
        let resource = overrides.resource.clone();
        let key = key.to_string();
        self.effective_changes(&candidates, overrides.resource.as_ref(), move |c| {
            let model = match resource {
                Some(resource) => c.memory_by_resource.entry(resource).or_default(),
                None => &mut c.memory,
            };
            match (ident, value) {
                (Some(ident), Some(value)) => model.insert_override(&ident, &key, value),
                (Some(ident), None) => model.remove_override(&ident, &key),
                (None, Some(value)) => model.insert(&key, value),
                (None, None) => model.remove(&key),
            }
        })
    }

    fn resolve<'a>(
        &'a self,
        key: &str,
        resource: Option<&Url>,
        ident: Option<&str>,
    ) -> Option<&'a Value> {
        if let Some(resource) = resource {
            if let Some(model) = self.memory_by_resource.get(resource) {
                if let Some(value) = layer_value(model, key, ident) {
                    return Some(value);
                }
            }
        }
        if let Some(value) = layer_value(&self.memory, key, ident) {
            return Some(value);
        }
        if let Some(owner) = resource.and_then(|r| self.owner_of(r)) {
            if let Some(model) = self.folders.get(&owner) {
                if let Some(value) = layer_value(model, key, ident) {
                    return Some(value);
                }
            }
        }
        layer_value(&self.workspace, key, ident)
            .or_else(|| layer_value(&self.user, key, ident))
            .or_else(|| layer_value(&self.defaults, key, ident))
    }

    fn consolidated(&self, resource: Option<&Url>) -> ConfigurationModel {
        let mut merged = self.defaults.merge(&self.user).merge(&self.workspace);
        if let Some(owner) = resource.and_then(|r| self.owner_of(r)) {
            if let Some(model) = self.folders.get(&owner) {
                merged = merged.merge(model);
            }
        }
        merged = merged.merge(&self.memory);
        if let Some(model) = resource.and_then(|r| self.memory_by_resource.get(r)) {
            merged = merged.merge(model);
        }
        merged
    }

    /// Folder root owning `resource`; the deepest root wins when roots nest.
    fn owner_of(&self, resource: &Url) -> Option<Url> {
        self.folders
            .keys()
            .filter(|root| resource_inside(root, resource))
            .max_by_key(|root| root.path().len())
            .cloned()
    }

    fn effective_changes(
        &mut self,
        candidates: &BTreeSet<String>,
        resource: Option<&Url>,
        apply: impl FnOnce(&mut Self),
    ) -> BTreeSet<String> {
        let before: Vec<(String, Option<Value>)> = candidates
            .iter()
            .map(|candidate| (candidate.clone(), self.resolve_candidate(candidate, resource)))
            .collect();
        apply(self);
        before
            .into_iter()
            .filter(|(candidate, old)| self.resolve_candidate(candidate, resource) != *old)
            .map(|(candidate, _)| candidate)
            .collect()
    }

    fn resolve_candidate(&self, candidate: &str, resource: Option<&Url>) -> Option<Value> {
        let (key, ident) = split_candidate(candidate);
        self.resolve(key, resource, ident).cloned()
    }
}

fn layer_value<'a>(
    model: &'a ConfigurationModel,
    key: &str,
    ident: Option<&str>,
) -> Option<&'a Value> {
    match ident {
        Some(ident) => model.get_override_value(key, ident),
        None => model.get_value(key),
    }
}

// "[md].editor.tabSize" -> ("editor.tabSize", Some("md"))
fn split_candidate(candidate: &str) -> (&str, Option<&str>) {
    if let Some(rest) = candidate.strip_prefix('[') {
        if let Some((ident, key)) = rest.split_once("].") {
            return (key, Some(ident));
        }
    }
    (candidate, None)
}

// Same case rule as folder identity: case-insensitive on platforms whose
// default file systems are, exact everywhere else.
fn resource_inside(root: &Url, resource: &Url) -> bool {
    let fold_case = cfg!(any(windows, target_os = "macos"));
    let equal = if fold_case {
        root.as_str().eq_ignore_ascii_case(resource.as_str())
    } else {
        root == resource
    };
    if equal {
        return true;
    }
    if root.scheme() != resource.scheme() {
        return false;
    }
    let root_path = root.path().trim_end_matches('/');
    if fold_case {
        resource
            .path()
            .to_ascii_lowercase()
            .strip_prefix(&root_path.to_ascii_lowercase())
            .is_some_and(|rest| rest.starts_with('/'))
    } else {
        resource
            .path()
            .strip_prefix(root_path)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(flat: Value) -> ConfigurationModel {
        match flat {
            Value::Object(map) => ConfigurationModel::from_flat_map(&map),
            _ => panic!("expected object"),
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn five_layer_config() -> Configuration {
        let mut folders = FxHashMap::default();
        folders.insert(url("file:///ws/app"), model(json!({"k": "folder"})));
        let mut config = Configuration::new(
            model(json!({"k": "default"})),
            model(json!({"k": "user"})),
            model(json!({"k": "workspace"})),
            folders,
        );
        config.update_value("k", Some(json!("memory")), &ConfigurationOverrides::default());
        config
    }

    mod precedence {
        use super::*;

        #[test]
        fn memory_wins_over_everything() {
            let config = five_layer_config();
            let overrides = ConfigurationOverrides::for_resource(url("file:///ws/app/src/x.rs"));
            assert_eq!(config.get_value(Some("k"), &overrides), Some(json!("memory")));
        }

        #[test]
        fn folder_beats_workspace_for_owned_resources() {
            let mut config = five_layer_config();
            config.update_value("k", None, &ConfigurationOverrides::default());
            let overrides = ConfigurationOverrides::for_resource(url("file:///ws/app/src/x.rs"));
            assert_eq!(config.get_value(Some("k"), &overrides), Some(json!("folder")));
        }

        #[test]
        fn workspace_beats_user_without_resource() {
            let mut config = five_layer_config();
            config.update_value("k", None, &ConfigurationOverrides::default());
            assert_eq!(
                config.get_value(Some("k"), &ConfigurationOverrides::default()),
                Some(json!("workspace"))
            );
        }

        #[test]
        fn user_beats_default() {
            let config = Configuration::new(
                model(json!({"k": "default"})),
                model(json!({"k": "user"})),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            assert_eq!(
                config.get_value(Some("k"), &ConfigurationOverrides::default()),
                Some(json!("user"))
            );
        }

        #[test]
        fn default_is_the_floor() {
            let config = Configuration::new(
                model(json!({"k": "default"})),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            assert_eq!(
                config.get_value(Some("k"), &ConfigurationOverrides::default()),
                Some(json!("default"))
            );
        }

        #[test]
        fn resource_outside_any_folder_falls_back() {
            let mut config = five_layer_config();
            config.update_value("k", None, &ConfigurationOverrides::default());
            let overrides = ConfigurationOverrides::for_resource(url("file:///elsewhere/x.rs"));
            assert_eq!(config.get_value(Some("k"), &overrides), Some(json!("workspace")));
        }

        #[cfg(any(windows, target_os = "macos"))]
        #[test]
        fn folder_ownership_ignores_case_on_case_insensitive_platforms() {
            let mut config = five_layer_config();
            config.update_value("k", None, &ConfigurationOverrides::default());
            let overrides = ConfigurationOverrides::for_resource(url("file:///WS/App/src/x.rs"));
            assert_eq!(config.get_value(Some("k"), &overrides), Some(json!("folder")));
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        #[test]
        fn folder_ownership_is_case_sensitive_elsewhere() {
            let mut config = five_layer_config();
            config.update_value("k", None, &ConfigurationOverrides::default());
            let overrides = ConfigurationOverrides::for_resource(url("file:///ws/App/src/x.rs"));
            assert_eq!(config.get_value(Some("k"), &overrides), Some(json!("workspace")));
        }
    }

    mod override_identifiers {
        use super::*;

        #[test]
        fn override_section_preferred_within_layer() {
            let config = Configuration::new(
                model(json!({"tab": 4, "[md]": {"tab": 2}})),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            assert_eq!(
                config.get_value(Some("tab"), &ConfigurationOverrides::for_identifier("md")),
                Some(json!(2))
            );
            assert_eq!(
                config.get_value(Some("tab"), &ConfigurationOverrides::default()),
                Some(json!(4))
            );
        }

        #[test]
        fn lower_layer_override_loses_to_higher_layer_base() {
            // User base beats default override section: override identifiers
            // select within a layer, they do not jump the precedence chain.
            let config = Configuration::new(
                model(json!({"tab": 4, "[md]": {"tab": 2}})),
                model(json!({"tab": 8})),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            assert_eq!(
                config.get_value(Some("tab"), &ConfigurationOverrides::for_identifier("md")),
                Some(json!(8))
            );
        }
    }

    mod compare_and_update {
        use super::*;

        #[test]
        fn reports_keys_whose_effective_value_changed() {
            let mut config = Configuration::new(
                model(json!({"a": 1, "b": 1})),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            let changed = config.compare_and_update_user_configuration(model(json!({"a": 2})));
            assert_eq!(changed, std::iter::once("a".to_string()).collect());
        }

        #[test]
        fn key_reverted_by_lower_layer_is_not_reported() {
            // The user layer changes, but the workspace layer shadows the key,
            // so the effective value is untouched.
            let mut config = Configuration::new(
                ConfigurationModel::default(),
                model(json!({"a": 1})),
                model(json!({"a": 5})),
                FxHashMap::default(),
            );
            let changed = config.compare_and_update_user_configuration(model(json!({"a": 2})));
            assert!(changed.is_empty());
        }

        #[test]
        fn folder_update_scopes_comparison_to_that_resource() {
            let root = url("file:///ws/app");
            let mut config = Configuration::new(
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            let changed =
                config.compare_and_update_folder_configuration(&root, model(json!({"b": 5})));
            assert_eq!(changed, std::iter::once("b".to_string()).collect());

            let overrides = ConfigurationOverrides::for_resource(url("file:///ws/app/x"));
            assert_eq!(config.get_value(Some("b"), &overrides), Some(json!(5)));
        }

        #[test]
        fn delete_folder_masked_by_workspace_reports_nothing() {
            let root = url("file:///ws/app");
            let mut folders = FxHashMap::default();
            folders.insert(root.clone(), model(json!({"b": 5})));
            let mut config = Configuration::new(
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                model(json!({"b": 5})),
                folders,
            );
            let changed = config.compare_and_delete_folder_configuration(&root);
            assert!(changed.is_empty());
            assert!(config.folder(&root).is_none());
        }

        #[test]
        fn delete_missing_folder_is_empty() {
            let mut config = Configuration::default();
            assert!(config
                .compare_and_delete_folder_configuration(&url("file:///nope"))
                .is_empty());
        }

        #[test]
        fn delete_folder_sweeps_nested_memory_entries() {
            let root = url("file:///ws/app");
            let inside = url("file:///ws/app/src/x.rs");
            let outside = url("file:///elsewhere/y.rs");
            let mut folders = FxHashMap::default();
            folders.insert(root.clone(), model(json!({"b": 5})));
            let mut config = Configuration::new(
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                folders,
            );
            config.update_value(
                "m",
                Some(json!(1)),
                &ConfigurationOverrides::for_resource(inside.clone()),
            );
            config.update_value(
                "m",
                Some(json!(2)),
                &ConfigurationOverrides::for_resource(outside.clone()),
            );

            config.compare_and_delete_folder_configuration(&root);

            assert_eq!(
                config.get_value(Some("m"), &ConfigurationOverrides::for_resource(inside)),
                None
            );
            assert_eq!(
                config.get_value(Some("m"), &ConfigurationOverrides::for_resource(outside)),
                Some(json!(2))
            );
        }
    }

    mod memory_layer {
        use super::*;

        #[test]
        fn per_resource_memory_only_affects_that_resource() {
            let mut config = Configuration::default();
            let overrides = ConfigurationOverrides::for_resource(url("file:///ws/app"));
            let changed = config.update_value("x", Some(json!(1)), &overrides);
            assert_eq!(changed, std::iter::once("x".to_string()).collect());

            assert_eq!(config.get_value(Some("x"), &overrides), Some(json!(1)));
            assert_eq!(config.get_value(Some("x"), &ConfigurationOverrides::default()), None);
        }

        #[test]
        fn removing_memory_value_restores_lower_layer() {
            let mut config = Configuration::new(
                model(json!({"x": "default"})),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            config.update_value("x", Some(json!("mem")), &ConfigurationOverrides::default());
            let changed = config.update_value("x", None, &ConfigurationOverrides::default());
            assert_eq!(changed, std::iter::once("x".to_string()).collect());
            assert_eq!(
                config.get_value(Some("x"), &ConfigurationOverrides::default()),
                Some(json!("default"))
            );
        }

        #[test]
        fn write_equal_to_effective_reports_nothing() {
            let mut config = Configuration::new(
                model(json!({"x": 7})),
                ConfigurationModel::default(),
                ConfigurationModel::default(),
                FxHashMap::default(),
            );
            let changed = config.update_value("x", Some(json!(7)), &ConfigurationOverrides::default());
            assert!(changed.is_empty());
        }
    }

    #[test]
    fn inspect_exposes_every_layer() {
        let config = five_layer_config();
        let overrides = ConfigurationOverrides::for_resource(url("file:///ws/app/x"));
        let inspect = config.inspect("k", &overrides);
        assert_eq!(inspect.default_value, Some(json!("default")));
        assert_eq!(inspect.user_value, Some(json!("user")));
        assert_eq!(inspect.workspace_value, Some(json!("workspace")));
        assert_eq!(inspect.workspace_folder_value, Some(json!("folder")));
        assert_eq!(inspect.memory_value, Some(json!("memory")));
        assert_eq!(inspect.value, Some(json!("memory")));
    }

    #[test]
    fn keys_enumerates_per_scope() {
        let config = five_layer_config();
        let keys = config.keys();
        assert_eq!(keys.default, ["k"]);
        assert_eq!(keys.user, ["k"]);
        assert_eq!(keys.workspace, ["k"]);
        assert_eq!(keys.workspace_folder, ["k"]);
    }

    #[test]
    fn to_data_round_trips_through_json() {
        let config = five_layer_config();
        let data = config.to_data();
        let text = serde_json::to_string(&data).unwrap();
        let back: ConfigurationData = serde_json::from_str(&text).unwrap();
        assert_eq!(data, back);
    }

    #[test]
    fn get_value_without_key_returns_consolidated_tree() {
        let mut config = five_layer_config();
        config.update_value("extra", Some(json!(true)), &ConfigurationOverrides::default());
        let tree = config
            .get_value(None, &ConfigurationOverrides::default())
            .unwrap();
        assert_eq!(tree["k"], json!("memory"));
        assert_eq!(tree["extra"], json!(true));
    }
}
