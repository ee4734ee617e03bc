//! Configuration management for the sensor registry tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (sensor-registry.toml)
//! - Environment variables (SENSOR_REGISTRY__*)
//!
//! ## Example config file (sensor-registry.toml):
//! ```toml
//! [registry]
//! path = "src/config/sensorConfigRegistry.ts"
//! reserved_sensor_types = ["critical", "warning"]
//! fields_key = "fields"
//! alarm_block = "alarmMetrics"
//!
//! [mnemonics]
//! table = "mnemonics.toml"
//!
//! [mnemonics.overrides]
//! speed = "SOG"
//!
//! [validation]
//! consumers = "src/widgets"
//! include = ["*Widget.tsx"]
//! dynamic_files = ["CustomWidget.tsx"]
//!
//! [output]
//! format = "text"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::mnemonic::{MnemonicTable, DEFAULT_ALARM_BLOCK};
use crate::schema::{SchemaExtractor, SchemaMap, DEFAULT_FIELDS_KEY, RESERVED_SENSOR_TYPES};
use crate::validate::{
    MetricKeyValidator, ReferenceScanner, DEFAULT_DYNAMIC_FILES, DEFAULT_DYNAMIC_MARKER,
    DEFAULT_INCLUDE, DEFAULT_METRIC_ATTRIBUTE, DEFAULT_SENSOR_ATTRIBUTE, DEFAULT_VIRTUAL_SUFFIXES,
};

/// Main configuration for the registry tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryToolConfig {
    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub mnemonics: MnemonicSection,

    #[serde(default)]
    pub validation: ValidationSection,

    #[serde(default)]
    pub output: OutputSection,
}

/// Registry file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Path to the registry source file (no implicit default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Top-level identifiers that are never sensor types
    #[serde(default = "default_reserved")]
    pub reserved_sensor_types: Vec<String>,

    /// Name of the field list inside a sensor block
    #[serde(default = "default_fields_key")]
    pub fields_key: String,

    /// Name of the alarm field list
    #[serde(default = "default_alarm_block")]
    pub alarm_block: String,
}

/// Mnemonic table settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MnemonicSection {
    /// TOML file of `key = "CODE"` pairs, replacing the built-in table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<PathBuf>,

    /// Entries applied on top of the table
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

/// Consumer validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Directory of consumer components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumers: Option<PathBuf>,

    /// File name globs to scan
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Files exempt from per-reference checks
    #[serde(default = "default_dynamic_files")]
    pub dynamic_files: Vec<String>,

    /// Comment marker exempting a file, empty to disable
    #[serde(default = "default_dynamic_marker", skip_serializing_if = "Option::is_none")]
    pub dynamic_marker: Option<String>,

    /// Tag attribute naming the sensor type
    #[serde(default = "default_sensor_attribute")]
    pub sensor_attribute: String,

    /// Tag attribute naming the metric key
    #[serde(default = "default_metric_attribute")]
    pub metric_attribute: String,

    /// Derived-view suffixes stripped before lookup
    #[serde(default = "default_virtual_suffixes")]
    pub virtual_suffixes: Vec<String>,
}

/// Report output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    /// Default format when `--format` is not given
    #[serde(default)]
    pub format: OutputFormat,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_reserved() -> Vec<String> {
    to_strings(RESERVED_SENSOR_TYPES)
}

fn default_fields_key() -> String {
    DEFAULT_FIELDS_KEY.to_string()
}

fn default_alarm_block() -> String {
    DEFAULT_ALARM_BLOCK.to_string()
}

fn default_include() -> Vec<String> {
    to_strings(DEFAULT_INCLUDE)
}

fn default_dynamic_files() -> Vec<String> {
    to_strings(DEFAULT_DYNAMIC_FILES)
}

fn default_dynamic_marker() -> Option<String> {
    Some(DEFAULT_DYNAMIC_MARKER.to_string())
}

fn default_sensor_attribute() -> String {
    DEFAULT_SENSOR_ATTRIBUTE.to_string()
}

fn default_metric_attribute() -> String {
    DEFAULT_METRIC_ATTRIBUTE.to_string()
}

fn default_virtual_suffixes() -> Vec<String> {
    to_strings(DEFAULT_VIRTUAL_SUFFIXES)
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            path: None,
            reserved_sensor_types: default_reserved(),
            fields_key: default_fields_key(),
            alarm_block: default_alarm_block(),
        }
    }
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            consumers: None,
            include: default_include(),
            dynamic_files: default_dynamic_files(),
            dynamic_marker: default_dynamic_marker(),
            sensor_attribute: default_sensor_attribute(),
            metric_attribute: default_metric_attribute(),
            virtual_suffixes: default_virtual_suffixes(),
        }
    }
}

impl RegistryToolConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, with an optional explicit file on top
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "sensor-registry.toml",
            ".sensor-registry.toml",
            "config/sensor-registry.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "sensor-registry", "sensor-registry") {
            let xdg_config = dirs.config_dir().join("sensor-registry.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SENSOR_REGISTRY__SECTION__KEY
        builder = builder.add_source(
            Environment::with_prefix("SENSOR_REGISTRY")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("registry.reserved_sensor_types")
                .with_list_parse_key("validation.include")
                .with_list_parse_key("validation.dynamic_files")
                .with_list_parse_key("validation.virtual_suffixes"),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Registry path from the command line, else from config
    pub fn registry_path(&self, cli: Option<PathBuf>) -> Result<PathBuf> {
        cli.or_else(|| self.registry.path.clone())
            .ok_or(RegistryError::MissingInput("registry path (--registry or registry.path)"))
    }

    /// Consumer directory from the command line, else from config
    pub fn consumers_dir(&self, cli: Option<PathBuf>) -> Result<PathBuf> {
        cli.or_else(|| self.validation.consumers.clone())
            .ok_or(RegistryError::MissingInput("consumer directory (--consumers or validation.consumers)"))
    }

    /// The configured table file (or the built-in table) plus overrides
    pub fn mnemonic_table(&self) -> Result<MnemonicTable> {
        let mut table = match &self.mnemonics.table {
            Some(path) => MnemonicTable::load(path)?,
            None => MnemonicTable::builtin(),
        };
        table.extend(self.mnemonics.overrides.clone())?;
        Ok(table)
    }

    pub fn extractor(&self) -> SchemaExtractor {
        SchemaExtractor::new()
            .with_reserved(self.registry.reserved_sensor_types.clone())
            .with_fields_key(self.registry.fields_key.clone())
    }

    pub fn validator<'a>(&self, schema: &'a SchemaMap) -> MetricKeyValidator<'a> {
        let v = &self.validation;
        let scanner = ReferenceScanner::new()
            .with_attributes(v.sensor_attribute.clone(), v.metric_attribute.clone())
            .with_suffixes(v.virtual_suffixes.clone());
        MetricKeyValidator::new(schema)
            .with_scanner(scanner)
            .with_dynamic_files(v.dynamic_files.clone())
            .with_dynamic_marker(v.dynamic_marker.clone().filter(|m| !m.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryToolConfig::default();
        assert!(config.registry.path.is_none());
        assert_eq!(config.registry.alarm_block, "alarmMetrics");
        assert_eq!(config.validation.include, vec!["*Widget.tsx"]);
        assert_eq!(config.validation.virtual_suffixes, vec!["min", "max", "avg"]);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_serialize_config() {
        let config = RegistryToolConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[registry]\npath = \"registry.ts\"\n\n[mnemonics.overrides]\nspeed = \"SOG\"\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = RegistryToolConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.registry.path, Some(PathBuf::from("registry.ts")));
        assert_eq!(config.registry.fields_key, "fields");
        assert_eq!(config.output.format, OutputFormat::Json);

        let table = config.mnemonic_table().unwrap();
        assert_eq!(table.get("speed"), Some("SOG"));
        assert_eq!(table.get("depth"), Some("DPT"));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = RegistryToolConfig::default();
        config
            .mnemonics
            .overrides
            .insert("depth".to_string(), "depth".to_string());
        assert!(matches!(
            config.mnemonic_table(),
            Err(RegistryError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn test_attribute_names_reach_validator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attrs.toml");
        std::fs::write(
            &path,
            "[validation]\nsensor_attribute = \"sensor\"\nmetric_attribute = \"metric\"\n",
        )
        .unwrap();

        let config = RegistryToolConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.validation.sensor_attribute, "sensor");
        assert_eq!(config.output.format, OutputFormat::Text);

        let schema = SchemaMap::from_keys([("engine", vec!["rpm"])]);
        let report = config
            .validator(&schema)
            .validate_sources([("A.tsx", r#"<Cell sensor="engine" metric="boost" />"#)]);
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_cli_path_wins() {
        let mut config = RegistryToolConfig::default();
        assert!(matches!(
            config.registry_path(None),
            Err(RegistryError::MissingInput(_))
        ));
        config.registry.path = Some(PathBuf::from("from-config.ts"));
        assert_eq!(
            config.registry_path(Some(PathBuf::from("cli.ts"))).unwrap(),
            PathBuf::from("cli.ts")
        );
    }
}
