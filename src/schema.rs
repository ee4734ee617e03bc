//! Schema extraction
//!
//! Turns registry text into a [`SchemaMap`]: sensor type → ordered fields.
//!
//! Sensor types are the object-valued properties of a top-level object
//! literal. Each one contributes the entries of its `fields` block, which
//! may be written either as an object keyed by field name or as an array of
//! `{ key: '...', label: '...' }` definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::syntax::{parse_document, Document, ObjectNode, Value};

/// Identifiers reserved for alarm threshold metadata
pub const RESERVED_SENSOR_TYPES: &[&str] = &["critical", "warning"];

/// Default name of the field list inside a sensor block
pub const DEFAULT_FIELDS_KEY: &str = "fields";

/// A single metric field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

impl Field {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
            mnemonic: None,
        }
    }
}

/// Fields of one sensor type, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSchema {
    pub sensor_type: String,
    pub fields: Vec<Field>,
}

impl SensorSchema {
    pub fn field_keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }
}

/// Sensor type → schema, ordered by sensor type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMap {
    sensors: BTreeMap<String, SensorSchema>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(sensor type, field keys)` pairs
    pub fn from_keys<'a, I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, K)>,
        K: IntoIterator<Item = &'a str>,
    {
        let mut map = Self::new();
        for (sensor_type, keys) in entries {
            map.insert(SensorSchema {
                sensor_type: sensor_type.to_string(),
                fields: keys.into_iter().map(Field::new).collect(),
            });
        }
        map
    }

    /// Insert a sensor schema, returning the one it replaced
    pub fn insert(&mut self, schema: SensorSchema) -> Option<SensorSchema> {
        self.sensors.insert(schema.sensor_type.clone(), schema)
    }

    pub fn get(&self, sensor_type: &str) -> Option<&SensorSchema> {
        self.sensors.get(sensor_type)
    }

    pub fn contains(&self, sensor_type: &str) -> bool {
        self.sensors.contains_key(sensor_type)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorSchema> {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

/// Extracts sensor schemas from registry text
#[derive(Debug, Clone)]
pub struct SchemaExtractor {
    reserved: Vec<String>,
    fields_key: String,
}

impl Default for SchemaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaExtractor {
    pub fn new() -> Self {
        Self {
            reserved: RESERVED_SENSOR_TYPES.iter().map(|s| s.to_string()).collect(),
            fields_key: DEFAULT_FIELDS_KEY.to_string(),
        }
    }

    /// Replace the reserved (non-sensor) identifiers
    pub fn with_reserved<I, S>(mut self, reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved = reserved.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fields_key(mut self, key: impl Into<String>) -> Self {
        self.fields_key = key.into();
        self
    }

    pub fn extract(&self, src: &str) -> Result<SchemaMap> {
        let doc = parse_document(src)?;
        Ok(self.extract_document(&doc))
    }

    pub fn extract_document(&self, doc: &Document) -> SchemaMap {
        let mut map = SchemaMap::new();

        for root in doc.root_objects() {
            for prop in root.properties() {
                if !is_sensor_identifier(&prop.key) {
                    continue;
                }
                if self.reserved.iter().any(|r| r == &prop.key) {
                    debug!(sensor_type = %prop.key, "skipping reserved identifier");
                    continue;
                }
                let Some(block) = prop.value.as_object() else {
                    continue;
                };
                let Some(fields) = self.extract_fields(block) else {
                    debug!(sensor_type = %prop.key, "no fields block, skipping");
                    continue;
                };

                let schema = SensorSchema {
                    sensor_type: prop.key.clone(),
                    fields,
                };
                if map.insert(schema).is_some() {
                    warn!(sensor_type = %prop.key, "sensor type defined more than once, using the later definition");
                }
            }
        }

        map
    }

    fn extract_fields(&self, block: &ObjectNode) -> Option<Vec<Field>> {
        match &block.get(&self.fields_key)?.value {
            Value::Object(fields) => Some(
                fields
                    .properties()
                    .map(|p| {
                        let def = p.value.as_object();
                        Field {
                            key: p.key.clone(),
                            label: def.and_then(|d| string_prop(d, "label")),
                            mnemonic: def.and_then(|d| string_prop(d, "mnemonic")),
                        }
                    })
                    .collect(),
            ),
            Value::Array(items) => Some(
                items
                    .items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|def| {
                        Some(Field {
                            key: string_prop(def, "key")?,
                            label: string_prop(def, "label"),
                            mnemonic: string_prop(def, "mnemonic"),
                        })
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

fn string_prop(obj: &ObjectNode, key: &str) -> Option<String> {
    obj.get(key)?.value.as_str().map(str::to_string)
}

/// Lowercase word: `[a-z][a-z0-9_]*`
fn is_sensor_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
export const SENSOR_SCHEMAS = {
  depth: {
    displayName: 'Depth',
    fields: {
      depth: { label: 'Depth', unit: 'm' },
      depthSource: { label: 'Source', mnemonic: 'SRC' },
      offset: { label: 'Offset' },
    },
  },
  engine: {
    fields: [
      { key: 'rpm', label: 'RPM' },
      { key: 'coolantTemp', label: 'Coolant' },
    ],
  },
  critical: {
    fields: { depth: {} },
  },
  display: {
    theme: 'dark',
  },
};
"#;

    #[test]
    fn test_extracts_object_and_array_fields() {
        let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();

        assert_eq!(
            schema.get("depth").unwrap().field_keys(),
            vec!["depth", "depthSource", "offset"]
        );
        assert_eq!(
            schema.get("engine").unwrap().field_keys(),
            vec!["rpm", "coolantTemp"]
        );
        let source = &schema.get("depth").unwrap().fields[1];
        assert_eq!(source.label.as_deref(), Some("Source"));
        assert_eq!(source.mnemonic.as_deref(), Some("SRC"));
    }

    #[test]
    fn test_reserved_identifiers_excluded() {
        let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
        assert!(!schema.contains("critical"));
        assert!(!schema.contains("warning"));
    }

    #[test]
    fn test_missing_fields_block_is_skipped() {
        let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
        assert!(!schema.contains("display"));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_nested_sensor_like_blocks_ignored() {
        let src = "const A = { wrapper: { gps: { fields: { lat: {} } } } };";
        let schema = SchemaExtractor::new().extract(src).unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_non_lowercase_headers_ignored() {
        let src = "const A = { GPS: { fields: { lat: {} } }, gps: { fields: { lat: {} } } };";
        let schema = SchemaExtractor::new().extract(src).unwrap();
        assert_eq!(schema.len(), 1);
        assert!(schema.contains("gps"));
    }

    #[test]
    fn test_custom_reserved_list() {
        let schema = SchemaExtractor::new()
            .with_reserved(["engine"])
            .extract(REGISTRY)
            .unwrap();
        assert!(!schema.contains("engine"));
        assert!(schema.contains("depth"));
    }
}
