//! Registry file access
//!
//! Every command reads the registry once, runs its whole transform in
//! memory, and writes at most once. Nothing is written when the transform
//! leaves the text unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::edit::unified_diff;
use crate::error::{RegistryError, Result};
use crate::mnemonic::{
    assign::assign_in_document, strip::strip_in_document, AssignOutcome, MnemonicTable,
    StripOutcome,
};
use crate::schema::{SchemaExtractor, SchemaMap};
use crate::syntax::parse_document;

/// The registry source file, read into memory
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
    content: String,
}

/// Assignment followed by alarm stripping
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub assign: AssignOutcome,
    pub strip: StripOutcome,
}

impl SyncOutcome {
    pub fn text(&self) -> &str {
        &self.strip.text
    }
}

impl RegistryFile {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "read registry");
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extract(&self, extractor: &SchemaExtractor) -> Result<SchemaMap> {
        extractor.extract(&self.content)
    }

    pub fn assign(&self, table: &MnemonicTable) -> Result<AssignOutcome> {
        let doc = parse_document(&self.content)?;
        Ok(assign_in_document(&self.content, &doc, table))
    }

    pub fn strip_alarms(&self, alarm_block: &str) -> Result<StripOutcome> {
        let doc = parse_document(&self.content)?;
        Ok(strip_in_document(&self.content, &doc, alarm_block))
    }

    /// Assign, then strip alarm blocks from the assigned text
    pub fn sync(&self, table: &MnemonicTable, alarm_block: &str) -> Result<SyncOutcome> {
        let assign = self.assign(table)?;
        let doc = parse_document(&assign.text)?;
        let strip = strip_in_document(&assign.text, &doc, alarm_block);
        Ok(SyncOutcome { assign, strip })
    }

    /// Stage `updated` as the new file content
    pub fn rewrite(&self, updated: impl Into<String>) -> Rewrite<'_> {
        Rewrite {
            file: self,
            updated: updated.into(),
        }
    }
}

/// A pending replacement of the registry content
#[derive(Debug)]
pub struct Rewrite<'a> {
    file: &'a RegistryFile,
    updated: String,
}

impl Rewrite<'_> {
    pub fn changed(&self) -> bool {
        self.updated != self.file.content
    }

    pub fn diff(&self) -> String {
        unified_diff(
            &self.file.content,
            &self.updated,
            &self.file.path.to_string_lossy(),
        )
    }

    /// Write the new content if it differs. Returns whether a write happened.
    pub fn commit(self) -> Result<bool> {
        if !self.changed() {
            debug!(path = %self.file.path.display(), "registry unchanged, not writing");
            return Ok(false);
        }
        fs::write(&self.file.path, &self.updated).map_err(|e| RegistryError::io(&self.file.path, e))?;
        info!(path = %self.file.path.display(), bytes = self.updated.len(), "registry updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::DEFAULT_ALARM_BLOCK;

    const SRC: &str = "export const SENSOR_CONFIG_REGISTRY = {\n  depth: {\n    fields: [\n      {\n        key: 'depth',\n        label: 'Depth',\n      },\n    ],\n    alarmMetrics: [\n      {\n        key: 'depth',\n        label: 'Depth',\n      },\n    ],\n  },\n};\n";

    fn registry_file(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.ts");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_sync_assigns_fields_only() {
        let (_dir, path) = registry_file(SRC);
        let file = RegistryFile::read(&path).unwrap();
        let outcome = file.sync(&MnemonicTable::builtin(), DEFAULT_ALARM_BLOCK).unwrap();

        assert_eq!(outcome.assign.assigned.len(), 2);
        assert_eq!(outcome.strip.removed.len(), 1);
        assert_eq!(outcome.text().matches("mnemonic: 'DPT'").count(), 1);

        assert!(file.rewrite(outcome.text()).commit().unwrap());
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, outcome.text());
    }

    #[test]
    fn test_unchanged_not_written() {
        let (_dir, path) = registry_file(SRC);
        let file = RegistryFile::read(&path).unwrap();
        let outcome = file.strip_alarms(DEFAULT_ALARM_BLOCK).unwrap();
        let rewrite = file.rewrite(outcome.text);
        assert!(!rewrite.changed());
        assert!(rewrite.diff().is_empty());
        assert!(!rewrite.commit().unwrap());
    }

    #[test]
    fn test_syntax_error_leaves_file_untouched() {
        let broken = "export const R = {\n  depth: { fields: [ { key: 'depth', label: 'Depth' },\n";
        let (_dir, path) = registry_file(broken);
        let file = RegistryFile::read(&path).unwrap();
        assert!(matches!(
            file.assign(&MnemonicTable::builtin()),
            Err(RegistryError::Syntax(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegistryFile::read(dir.path().join("nope.ts")).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
