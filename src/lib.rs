//! Sensor Configuration Registry Tools
//!
//! Keeps a declarative sensor configuration registry consistent with the
//! display components that consume it.
//!
//! ## Features
//!
//! - **Schema Extraction**: sensor type → field keys, read from the registry source
//! - **Mnemonic Assignment**: short display codes inserted into field definitions
//! - **Alarm Stripping**: mnemonics removed from alarm threshold field lists
//! - **Reference Validation**: every `(sensorType, metricKey)` in consumer files
//!   checked against the extracted schema
//!
//! ## Architecture
//!
//! ```text
//! registry.ts ──► syntax::parse_document ──► Document (spans)
//!                                              ├─► schema::SchemaExtractor ──► SchemaMap
//!                                              ├─► mnemonic::assign  ─┐
//!                                              └─► mnemonic::strip   ─┴─► edit::apply_edits ──► registry.ts
//!
//! *Widget.tsx ──► validate::ReferenceScanner ──► validate::MetricKeyValidator(SchemaMap) ──► report
//! ```
//!
//! All rewrites are span-based text edits; bytes outside the edited ranges
//! are preserved exactly.

pub mod config;
pub mod edit;
pub mod error;
pub mod mnemonic;
pub mod registry;
pub mod schema;
pub mod syntax;
pub mod validate;

pub use config::{OutputFormat, RegistryToolConfig};
pub use error::{RegistryError, Result};
pub use mnemonic::{
    assign_mnemonics, find_collisions, strip_alarm_mnemonics, MnemonicCollision, MnemonicTable,
};
pub use registry::{RegistryFile, SyncOutcome};
pub use schema::{Field, SchemaExtractor, SchemaMap, SensorSchema};
pub use syntax::SyntaxError;
pub use validate::{MetricKeyValidator, ValidationFinding, ValidationReport};
