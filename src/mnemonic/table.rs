//! Mnemonic lookup table
//!
//! Field key → short uppercase display code. The table is keyed by field
//! name only, so a key shared by several sensor types always receives the
//! same code.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{RegistryError, Result};

/// Maximum mnemonic length in characters
pub const MAX_MNEMONIC_LEN: usize = 5;

const BUILTIN: &[(&str, &str)] = &[
    // Battery
    ("name", "NAME"),
    ("chemistry", "CHEM"),
    ("capacity", "CAP"),
    ("voltage", "VLT"),
    ("nominalVoltage", "NOM"),
    ("current", "AMP"),
    ("temperature", "TMP"),
    ("stateOfCharge", "SOC"),
    // Depth
    ("depth", "DPT"),
    ("depthSource", "SRC"),
    ("depthReferencePoint", "REF"),
    ("offset", "OFS"),
    // Engine
    ("engineType", "TYPE"),
    ("maxRpm", "MAX"),
    ("rpm", "RPM"),
    ("coolantTemp", "ECT"),
    ("oilPressure", "EOP"),
    ("alternatorVoltage", "ALT"),
    ("fuelRate", "FLOW"),
    ("hours", "EHR"),
    ("shaftRpm", "SRPM"),
    ("engineEfficiency", "EFF"),
    // Wind
    ("speed", "SPD"),
    ("direction", "DIR"),
    ("apparentSpeed", "AWS"),
    ("apparentDirection", "AWA"),
    ("trueDirection", "TWD"),
    // Speed
    ("throughWater", "STW"),
    ("overGround", "SOG"),
    ("trueSpeed", "TS"),
    // Temperature
    ("value", "VAL"),
    ("source", "SRC"),
    ("location", "LOC"),
    // Compass
    ("heading", "HDG"),
    ("magneticHeading", "HDM"),
    ("trueHeading", "HDT"),
    ("variation", "VAR"),
    ("deviation", "DEV"),
    ("pitch", "PTCH"),
    ("roll", "ROLL"),
    ("rateOfTurn", "ROT"),
    // GPS
    ("latitude", "LAT"),
    ("longitude", "LON"),
    ("altitude", "ALT"),
    ("speedOverGround", "SOG"),
    ("courseOverGround", "COG"),
    ("numberOfSatellites", "SATS"),
    ("horizontalDilutionOfPrecision", "HDOP"),
    ("fixQuality", "FIX"),
    ("positionMode", "MODE"),
    // Autopilot
    ("mode", "MODE"),
    ("state", "STAT"),
    ("headingTarget", "TGT"),
    ("headingLocked", "LCK"),
    ("rudderDirection", "RDIR"),
    ("offCourse", "XTE"),
    ("offCourseDirection", "XDIR"),
    // Navigation
    ("crossTrackError", "XTE"),
    ("bearingToWaypoint", "BTW"),
    ("distanceToWaypoint", "DTW"),
    ("bearingOriginToDestination", "BOD"),
    ("waypointId", "WPT"),
    ("eta", "ETA"),
    // Weather
    ("airTemperature", "ATMP"),
    ("barometricPressure", "BARO"),
    ("humidity", "HUM"),
    ("dewPoint", "DEW"),
    ("waterTemperature", "WTMP"),
    ("windSpeed", "WSPD"),
    ("windDirection", "WDIR"),
    ("apparentWindSpeed", "AWS"),
    ("apparentWindDirection", "AWA"),
    ("trueWindSpeed", "TWS"),
    ("trueWindDirection", "TWD"),
    ("gustSpeed", "GUST"),
    ("gustDirection", "GDIR"),
    ("visibility", "VIS"),
    ("cloudCoverage", "CLDS"),
    ("precipitation", "PRCP"),
    // Tank
    ("tankType", "TYPE"),
    ("level", "LVL"),
    ("volume", "VOL"),
    ("remaining", "REM"),
    // Rudder
    ("rudderAngle", "RUD"),
    ("rudderPosition", "POS"),
];

/// How a mnemonic was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mnemonic: String,
    /// True when the key had no table entry and the code was synthesized
    pub fallback: bool,
}

/// Field key → mnemonic lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicTable {
    entries: HashMap<String, String>,
}

impl Default for MnemonicTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Sectioned { mnemonics: BTreeMap<String, String> },
    Flat(BTreeMap<String, String>),
}

impl MnemonicTable {
    /// The table shipped with the crate
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build a table, rejecting malformed codes
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::empty();
        table.extend(entries)?;
        Ok(table)
    }

    /// Parse a TOML table of `key = "CODE"` pairs, either at the top level
    /// or under a `[mnemonics]` section
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let entries = match toml::from_str::<TableFile>(content)? {
            TableFile::Sectioned { mnemonics } => mnemonics,
            TableFile::Flat(entries) => entries,
        };
        Self::from_entries(entries)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Add or replace entries
    pub fn extend<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, mnemonic) in entries {
            let (key, mnemonic) = (key.into(), mnemonic.into());
            validate_mnemonic(&key, &mnemonic)?;
            self.entries.insert(key, mnemonic);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Table entry, or the fallback code for unmapped keys
    pub fn resolve(&self, key: &str) -> Resolution {
        match self.get(key) {
            Some(m) => Resolution {
                mnemonic: m.to_string(),
                fallback: false,
            },
            None => Resolution {
                mnemonic: fallback_mnemonic(key),
                fallback: true,
            },
        }
    }

    /// Entries sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// First five characters of the uppercased key
pub fn fallback_mnemonic(key: &str) -> String {
    key.to_uppercase().chars().take(MAX_MNEMONIC_LEN).collect()
}

fn validate_mnemonic(key: &str, mnemonic: &str) -> Result<()> {
    let valid = !mnemonic.is_empty()
        && mnemonic.chars().count() <= MAX_MNEMONIC_LEN
        && mnemonic
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidMnemonic {
            key: key.to_string(),
            mnemonic: mnemonic.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries_are_valid() {
        let table = MnemonicTable::builtin();
        for (key, mnemonic) in table.iter() {
            assert!(validate_mnemonic(key, mnemonic).is_ok(), "{} -> {}", key, mnemonic);
        }
        assert_eq!(table.get("depth"), Some("DPT"));
        assert_eq!(table.get("trueSpeed"), Some("TS"));
    }

    #[test]
    fn test_fallback_takes_five_uppercase_chars() {
        assert_eq!(fallback_mnemonic("fooBar"), "FOOBA");
        assert_eq!(fallback_mnemonic("eta"), "ETA");

        let resolved = MnemonicTable::empty().resolve("fooBar");
        assert!(resolved.fallback);
        assert_eq!(resolved.mnemonic, "FOOBA");
    }

    #[test]
    fn test_load_flat_and_sectioned_toml() {
        let flat = MnemonicTable::from_toml_str("depth = \"DPT\"\nrpm = \"RPM\"\n").unwrap();
        assert_eq!(flat.len(), 2);

        let sectioned = MnemonicTable::from_toml_str("[mnemonics]\ndepth = \"D\"\n").unwrap();
        assert_eq!(sectioned.get("depth"), Some("D"));
    }

    #[test]
    fn test_rejects_malformed_codes() {
        let err = MnemonicTable::from_entries([("depth", "depth")]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMnemonic { .. }));

        let err = MnemonicTable::from_entries([("depth", "TOOLONG")]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMnemonic { .. }));
    }

    #[test]
    fn test_extend_overrides_entries() {
        let mut table = MnemonicTable::builtin();
        table.extend([("depth", "DEP")]).unwrap();
        assert_eq!(table.resolve("depth").mnemonic, "DEP");
    }
}
