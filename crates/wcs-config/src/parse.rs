//! Settings content parsing.
//!
//! Settings files are flat JSON objects of dotted keys. Bracketed top-level
//! keys hold override sections. Malformed content degrades to an empty
//! contribution: one broken file never blocks the rest of the configuration.

use serde_json::Value;
use tracing::warn;

use crate::model::{override_identifier, ConfigurationModel};
use crate::schema::{SchemaRegistry, SettingsTarget};

/// Parse settings text into a [`ConfigurationModel`], filtering keys whose
/// declared scope is not allowed at `target`.
///
/// Disallowed keys are excluded from the model's contents and recorded as
/// unsupported keys instead. Content errors are non-fatal by design.
#[must_use]
pub fn parse_settings(
    content: &str,
    target: SettingsTarget,
    registry: &dyn SchemaRegistry,
) -> ConfigurationModel {
    let parsed: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "malformed settings content, treating as empty");
            return ConfigurationModel::default();
        }
    };
    let Value::Object(map) = parsed else {
        warn!("settings content is not a JSON object, treating as empty");
        return ConfigurationModel::default();
    };
    settings_model_from_map(&map, target, registry)
}

/// Build a scope-filtered model from an already-parsed flat settings object,
/// e.g. the `settings` section embedded in a workspace definition file.
#[must_use]
pub fn settings_model_from_map(
    map: &serde_json::Map<String, Value>,
    target: SettingsTarget,
    registry: &dyn SchemaRegistry,
) -> ConfigurationModel {
    let mut model = ConfigurationModel::default();
    for (key, value) in map {
        if let Some(identifier) = override_identifier(key) {
            let Value::Object(section) = value else {
                model.push_unsupported(key);
                continue;
            };
            for (k, v) in section {
                if target.allows(registry.scope(k)) {
                    model.insert_override(identifier, k, v.clone());
                } else {
                    model.push_unsupported(k);
                }
            }
        } else if target.allows(registry.scope(key)) {
            model.insert(key, value.clone());
        } else {
            model.push_unsupported(key);
        }
    }
    model
}
