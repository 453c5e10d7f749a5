mod configuration;
mod model;
mod parse;
mod schema;

pub use configuration::{
    Configuration, ConfigurationData, ConfigurationKeys, ConfigurationOverrides,
    ConfigurationTarget, Inspect,
};
pub use model::ConfigurationModel;
pub use parse::{parse_settings, settings_model_from_map};
pub use schema::{SchemaRegistry, SettingScope, SettingsTarget, SimpleSchemaRegistry};
