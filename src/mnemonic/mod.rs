//! Mnemonic codes
//!
//! - [`table`]: the key → code lookup
//! - [`assign`]: inserting missing codes into field blocks
//! - [`strip`]: removing codes from alarm field lists
//!
//! Codes are never checked for uniqueness during assignment. Two keys may
//! share a code, by table entry or by fallback truncation;
//! [`find_collisions`] reports such cases within a sensor type without
//! changing anything.

pub mod assign;
pub mod strip;
pub mod table;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::SchemaMap;

pub use assign::{assign_mnemonics, AssignOutcome, Assignment, SkipReason, SkippedField};
pub use strip::{strip_alarm_mnemonics, RemovedMnemonic, StripOutcome, DEFAULT_ALARM_BLOCK};
pub use table::{fallback_mnemonic, MnemonicTable, Resolution, MAX_MNEMONIC_LEN};

/// One code shared by several fields of the same sensor type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MnemonicCollision {
    pub sensor_type: String,
    pub mnemonic: String,
    pub keys: Vec<String>,
}

/// Codes used by more than one field key within a sensor type.
///
/// A field's declared mnemonic wins over the table; fields without one are
/// resolved through `table` (including fallback codes).
pub fn find_collisions(schema: &SchemaMap, table: &MnemonicTable) -> Vec<MnemonicCollision> {
    let mut collisions = Vec::new();

    for sensor in schema.sensors() {
        let mut by_code: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for field in &sensor.fields {
            let code = field
                .mnemonic
                .clone()
                .unwrap_or_else(|| table.resolve(&field.key).mnemonic);
            let keys = by_code.entry(code).or_default();
            if !keys.contains(&field.key) {
                keys.push(field.key.clone());
            }
        }

        collisions.extend(
            by_code
                .into_iter()
                .filter(|(_, keys)| keys.len() > 1)
                .map(|(mnemonic, keys)| MnemonicCollision {
                    sensor_type: sensor.sensor_type.clone(),
                    mnemonic,
                    keys,
                }),
        );
    }

    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, SensorSchema};

    #[test]
    fn test_collisions_within_sensor_type() {
        let mut schema = SchemaMap::from_keys([
            ("autopilot", vec!["mode", "offCourse", "positionMode"]),
            ("navigation", vec!["crossTrackError"]),
        ]);
        schema.insert(SensorSchema {
            sensor_type: "engine".to_string(),
            fields: vec![
                Field {
                    mnemonic: Some("RPM".to_string()),
                    ..Field::new("rpm")
                },
                Field::new("rpmTarget"),
                Field::new("rpmTargetMax"),
            ],
        });

        let collisions = find_collisions(&schema, &MnemonicTable::builtin());
        assert_eq!(collisions.len(), 2);

        let autopilot = &collisions[0];
        assert_eq!(autopilot.sensor_type, "autopilot");
        assert_eq!(autopilot.mnemonic, "MODE");
        assert_eq!(autopilot.keys, vec!["mode", "positionMode"]);

        // fallback truncation collides
        let engine = &collisions[1];
        assert_eq!(engine.mnemonic, "RPMTA");
        assert_eq!(engine.keys, vec!["rpmTarget", "rpmTargetMax"]);
    }

    #[test]
    fn test_same_code_across_sensor_types_is_not_a_collision() {
        // XTE is shared by autopilot.offCourse and navigation.crossTrackError
        let schema = SchemaMap::from_keys([
            ("autopilot", vec!["offCourse"]),
            ("navigation", vec!["crossTrackError"]),
        ]);
        assert!(find_collisions(&schema, &MnemonicTable::builtin()).is_empty());
    }
}
