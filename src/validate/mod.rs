//! Metric Key Validation
//!
//! Cross-checks every `(sensorType, metricKey)` reference found in consumer
//! files against the extracted [`SchemaMap`].
//!
//! ## Rules
//! 1. **Unknown sensor type**: the sensor type is not in the schema (error)
//! 2. **Unknown metric key**: the base key is not a field of that sensor type
//!    (error, lists the known keys)
//! 3. **Dynamic key**: the file builds its keys at runtime and cannot be
//!    checked statically (warning)
//!
//! References are deduplicated per `(file, sensor type, base key)`.

pub mod references;
pub mod report;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use serde::Serialize;
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::schema::SchemaMap;

pub use references::{
    normalize_metric_key, ExpressionReference, MetricReference, ReferenceScanner, ScanResult,
    DEFAULT_METRIC_ATTRIBUTE, DEFAULT_SENSOR_ATTRIBUTE, DEFAULT_VIRTUAL_SUFFIXES,
};

/// Consumer files known to build metric keys at runtime
pub const DEFAULT_DYNAMIC_FILES: &[&str] = &["CustomWidget.tsx"];

/// Comment marker that exempts a file from static key checks
pub const DEFAULT_DYNAMIC_MARKER: &str = "@metric-keys dynamic";

/// Consumer files scanned by default
pub const DEFAULT_INCLUDE: &[&str] = &["*Widget.tsx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Why a file or site could not be checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DynamicKeyReason {
    /// Listed as dynamic or carrying the marker comment
    ExemptFile,
    /// A single tag whose metric key is an expression
    Expression {
        sensor_type: String,
        expression: String,
        line: usize,
    },
}

/// A single validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFinding {
    UnknownSensorType {
        file: String,
        sensor_type: String,
        metric_key: String,
        line: usize,
    },
    UnknownMetricKey {
        file: String,
        sensor_type: String,
        /// Base key, virtual suffix removed
        metric_key: String,
        known_keys: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
        line: usize,
    },
    DynamicKey {
        file: String,
        reason: DynamicKeyReason,
    },
}

impl ValidationFinding {
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownSensorType { .. } | Self::UnknownMetricKey { .. } => Severity::Error,
            Self::DynamicKey { .. } => Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSensorType {
                file, sensor_type, ..
            } => write!(f, "❌ {}: Unknown sensor type '{}'", file, sensor_type),
            Self::UnknownMetricKey {
                file,
                sensor_type,
                metric_key,
                known_keys,
                suggestion,
                ..
            } => {
                write!(
                    f,
                    "❌ {}: {}.{} does NOT exist in schema\n   Schema has: {}",
                    file,
                    sensor_type,
                    metric_key,
                    known_keys.join(", ")
                )?;
                if let Some(s) = suggestion {
                    write!(f, "\n   Did you mean '{}'?", s)?;
                }
                Ok(())
            }
            Self::DynamicKey {
                file,
                reason: DynamicKeyReason::ExemptFile,
            } => write!(
                f,
                "⚠️  {} uses dynamic metricKey - cannot validate statically",
                file
            ),
            Self::DynamicKey {
                file,
                reason:
                    DynamicKeyReason::Expression {
                        sensor_type,
                        expression,
                        line,
                    },
            } => write!(
                f,
                "⚠️  {}:{}: {} metricKey {{{}}} is computed at runtime - cannot validate statically",
                file, line, sensor_type, expression
            ),
        }
    }
}

/// Findings of one validation run, errors first
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<ValidationFinding>,
    pub files_scanned: usize,
    /// Distinct `(file, sensor type, base key)` references checked
    pub references_checked: usize,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| !f.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// No errors and no warnings
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Validates consumer references against a schema
pub struct MetricKeyValidator<'a> {
    schema: &'a SchemaMap,
    scanner: ReferenceScanner,
    dynamic_files: Vec<String>,
    dynamic_marker: Option<String>,
}

impl<'a> MetricKeyValidator<'a> {
    pub fn new(schema: &'a SchemaMap) -> Self {
        Self {
            schema,
            scanner: ReferenceScanner::new(),
            dynamic_files: DEFAULT_DYNAMIC_FILES.iter().map(|s| s.to_string()).collect(),
            dynamic_marker: Some(DEFAULT_DYNAMIC_MARKER.to_string()),
        }
    }

    pub fn with_scanner(mut self, scanner: ReferenceScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Files exempt from per-reference checks, by file name or relative path
    pub fn with_dynamic_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dynamic_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dynamic_marker(mut self, marker: Option<String>) -> Self {
        self.dynamic_marker = marker;
        self
    }

    /// Validate `(file name, contents)` pairs in the given order
    pub fn validate_sources<I, N, S>(&self, sources: I) -> ValidationReport
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut report = ValidationReport::default();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut expression_seen = HashSet::new();

        for (file, src) in sources {
            let (file, src) = (file.as_ref(), src.as_ref());
            report.files_scanned += 1;

            if self.is_dynamic(file, src) {
                debug!(file, "dynamic consumer, skipping per-reference checks");
                warnings.push(ValidationFinding::DynamicKey {
                    file: file.to_string(),
                    reason: DynamicKeyReason::ExemptFile,
                });
                continue;
            }

            let scan = self.scanner.scan(file, src);
            for reference in scan.references {
                let key = (
                    reference.file.clone(),
                    reference.sensor_type.clone(),
                    reference.base_key.clone(),
                );
                if !seen.insert(key) {
                    continue;
                }
                report.references_checked += 1;
                if let Some(finding) = self.check(reference) {
                    errors.push(finding);
                }
            }

            for e in scan.expressions {
                let key = (e.file.clone(), e.sensor_type.clone(), e.expression.clone());
                if !expression_seen.insert(key) {
                    continue;
                }
                warnings.push(ValidationFinding::DynamicKey {
                    file: e.file,
                    reason: DynamicKeyReason::Expression {
                        sensor_type: e.sensor_type,
                        expression: e.expression,
                        line: e.line,
                    },
                });
            }
        }

        report.findings = errors;
        report.findings.extend(warnings);
        report
    }

    /// Walk `dir` for files matching `include` globs (all files if empty) and
    /// validate them in file-name order
    pub fn validate_directory<S: AsRef<str>>(&self, dir: &Path, include: &[S]) -> Result<ValidationReport> {
        fs::metadata(dir).map_err(|e| RegistryError::io(dir, e))?;

        let mut overrides = OverrideBuilder::new(dir);
        for glob in include {
            overrides.add(glob.as_ref())?;
        }

        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .overrides(overrides.build()?)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut sources = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let name = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
            sources.push((name, content));
        }

        Ok(self.validate_sources(sources))
    }

    fn is_dynamic(&self, file: &str, src: &str) -> bool {
        let name = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file);
        self.dynamic_files.iter().any(|d| d == name || d == file)
            || self
                .dynamic_marker
                .as_deref()
                .is_some_and(|marker| src.contains(marker))
    }

    fn check(&self, reference: MetricReference) -> Option<ValidationFinding> {
        let Some(sensor) = self.schema.get(&reference.sensor_type) else {
            return Some(ValidationFinding::UnknownSensorType {
                file: reference.file,
                sensor_type: reference.sensor_type,
                metric_key: reference.metric_key,
                line: reference.line,
            });
        };

        if sensor.has_field(&reference.base_key) {
            return None;
        }

        let known_keys: Vec<String> = sensor.fields.iter().map(|f| f.key.clone()).collect();
        Some(ValidationFinding::UnknownMetricKey {
            file: reference.file,
            sensor_type: reference.sensor_type,
            suggestion: closest_key(&reference.base_key, &known_keys),
            metric_key: reference.base_key,
            known_keys,
            line: reference.line,
        })
    }
}

/// Best fuzzy match for `key` among `candidates`, in either direction
fn closest_key(key: &str, candidates: &[String]) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    candidates
        .iter()
        .filter_map(|candidate| {
            let score = matcher
                .fuzzy_match(candidate, key)
                .max(matcher.fuzzy_match(key, candidate))?;
            Some((score, candidate))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, candidate)| candidate.clone())
}
