//! Mnemonic assignment
//!
//! Inserts a `mnemonic: 'CODE',` line right after the label line of every
//! field definition block that lacks one. A field definition block is an
//! object literal whose first property is `key: '<identifier>'`. Blocks are
//! taken in document order and never overlap: a block nested inside another
//! one is part of the outer block.
//!
//! The transform is purely textual; everything outside the inserted lines is
//! preserved byte for byte.

use serde::Serialize;
use tracing::warn;

use super::table::MnemonicTable;
use crate::edit::{apply_edits, TextEdit};
use crate::error::Result;
use crate::syntax::{
    line_end, line_number, line_start, parse_document, Document, Member, ObjectNode, Visit,
};

/// A mnemonic inserted into a field block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub key: String,
    pub mnemonic: String,
    /// Line of the field's label in the input text
    pub line: usize,
    /// The key had no table entry
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The block has no `label` property to anchor the insertion
    MissingLabel,
    /// The label shares a line with the block's closing brace
    SingleLine,
    /// A later member starts on the label line and continues past it
    LabelLineOpensBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    pub key: String,
    pub line: usize,
    pub reason: SkipReason,
}

/// Result of an assignment pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssignOutcome {
    #[serde(skip)]
    pub text: String,
    pub assigned: Vec<Assignment>,
    pub already_present: usize,
    pub skipped: Vec<SkippedField>,
}

impl AssignOutcome {
    pub fn changed(&self) -> bool {
        !self.assigned.is_empty()
    }

    /// Keys that received a fallback code, deduplicated and sorted
    pub fn unmapped(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .assigned
            .iter()
            .filter(|a| a.fallback)
            .map(|a| a.key.as_str())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Add missing mnemonics to every field definition block in `src`
pub fn assign_mnemonics(src: &str, table: &MnemonicTable) -> Result<AssignOutcome> {
    let doc = parse_document(src)?;
    Ok(assign_in_document(src, &doc, table))
}

pub(crate) fn assign_in_document(src: &str, doc: &Document, table: &MnemonicTable) -> AssignOutcome {
    let mut outcome = AssignOutcome::default();
    let mut edits = Vec::new();

    for (key, block) in field_blocks(doc) {
        if block.get("mnemonic").is_some() {
            outcome.already_present += 1;
            continue;
        }

        let Some(label) = block.get("label") else {
            let line = line_number(src, block.span.start);
            warn!(key, line, "field block has no label, mnemonic not assigned");
            outcome.skipped.push(SkippedField {
                key: key.to_string(),
                line,
                reason: SkipReason::MissingLabel,
            });
            continue;
        };

        let label_line = line_number(src, label.key_span.start);
        let value_end = label.value.span().end;
        let eol = line_end(src, value_end);
        if block.close_offset() <= eol {
            warn!(key, line = label_line, "label shares a line with the closing brace, mnemonic not assigned");
            outcome.skipped.push(SkippedField {
                key: key.to_string(),
                line: label_line,
                reason: SkipReason::SingleLine,
            });
            continue;
        }

        if opens_past(block, value_end, eol) {
            warn!(key, line = label_line, "label line opens a multi-line value, mnemonic not assigned");
            outcome.skipped.push(SkippedField {
                key: key.to_string(),
                line: label_line,
                reason: SkipReason::LabelLineOpensBlock,
            });
            continue;
        }

        let resolved = table.resolve(key);
        if resolved.fallback {
            warn!(key, mnemonic = %resolved.mnemonic, "no mnemonic defined for key, using uppercase key prefix");
        }

        let indent = leading_whitespace(src, label.key_span.start);
        let newline = if src[..eol].ends_with('\r') { "\r\n" } else { "\n" };
        if label.comma.is_none() {
            edits.push(TextEdit::insert(value_end, ","));
        }
        edits.push(TextEdit::insert(
            eol + 1,
            format!("{}mnemonic: '{}',{}", indent, resolved.mnemonic, newline),
        ));

        outcome.assigned.push(Assignment {
            key: key.to_string(),
            mnemonic: resolved.mnemonic,
            line: label_line,
            fallback: resolved.fallback,
        });
    }

    outcome.text = apply_edits(src, edits);
    outcome
}

/// Field definition blocks in document order, paired with their key
pub(crate) fn field_blocks(doc: &Document) -> Vec<(&str, &ObjectNode)> {
    let mut blocks = Vec::new();
    doc.walk(&mut |value| {
        let Some(obj) = value.as_object() else {
            return Visit::Descend;
        };
        let key = obj
            .first_property()
            .filter(|p| p.key == "key")
            .and_then(|p| p.value.as_str())
            .filter(|k| is_word(k));
        match key {
            Some(key) => {
                blocks.push((key, obj));
                Visit::Skip
            }
            None => Visit::Descend,
        }
    });
    blocks
}

/// Whether a member starting in `after..eol` ends beyond `eol`
fn opens_past(block: &ObjectNode, after: usize, eol: usize) -> bool {
    block.members.iter().any(|m| {
        let span = match m {
            Member::Property(p) => p.span(),
            Member::Other(v) => v.span(),
        };
        span.start >= after && span.start < eol && span.end > eol
    })
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn leading_whitespace(src: &str, offset: usize) -> &str {
    let start = line_start(src, offset);
    let line = &src[start..];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}
