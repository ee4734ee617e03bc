//! Alarm-section mnemonic stripping
//!
//! Alarm threshold field lists reuse the field-definition shape but are not
//! rendered in the mnemonic-constrained display, so their fields carry no
//! mnemonic. Every `mnemonic` property found anywhere inside an alarm block
//! is removed; mnemonics elsewhere are never touched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::edit::{apply_edits, TextEdit};
use crate::error::Result;
use crate::syntax::{
    line_end, line_number, line_start, parse_document, walk, Document, Member, ObjectNode, Value,
    Visit,
};

/// Default name of the alarm field list
pub const DEFAULT_ALARM_BLOCK: &str = "alarmMetrics";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedMnemonic {
    /// Key of the enclosing field block, if it declares one
    pub key: Option<String>,
    pub mnemonic: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StripOutcome {
    #[serde(skip)]
    pub text: String,
    pub removed: Vec<RemovedMnemonic>,
    /// Number of alarm blocks found
    pub blocks: usize,
}

impl StripOutcome {
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Remove mnemonic declarations from every `block_name` block in `src`
pub fn strip_alarm_mnemonics(src: &str, block_name: &str) -> Result<StripOutcome> {
    let doc = parse_document(src)?;
    Ok(strip_in_document(src, &doc, block_name))
}

pub(crate) fn strip_in_document(src: &str, doc: &Document, block_name: &str) -> StripOutcome {
    let mut outcome = StripOutcome::default();
    let mut seen = BTreeSet::new();
    let mut targets = Vec::new();

    doc.walk(&mut |value| {
        if let Some(obj) = value.as_object() {
            for prop in obj.properties().filter(|p| p.key == block_name) {
                outcome.blocks += 1;
                collect_mnemonics(&prop.value, &mut seen, &mut targets);
            }
        }
        Visit::Descend
    });

    let mut edits = Vec::with_capacity(targets.len());
    for (obj, index) in targets {
        let Some(Member::Property(prop)) = obj.members.get(index) else {
            continue;
        };
        edits.push(TextEdit::delete(removal_range(src, obj, index)));
        outcome.removed.push(RemovedMnemonic {
            key: obj
                .get("key")
                .and_then(|k| k.value.as_str())
                .map(str::to_string),
            mnemonic: prop
                .value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| src[prop.value.span()].to_string()),
            line: line_number(src, prop.key_span.start),
        });
    }

    outcome.text = apply_edits(src, edits);
    outcome
}

/// Objects and member indexes of `mnemonic` properties under `value`
fn collect_mnemonics<'a>(
    value: &'a Value,
    seen: &mut BTreeSet<usize>,
    targets: &mut Vec<(&'a ObjectNode, usize)>,
) {
    walk(value, &mut |v| {
        if let Some(obj) = v.as_object() {
            for (index, member) in obj.members.iter().enumerate() {
                if let Member::Property(p) = member {
                    if p.key == "mnemonic" && seen.insert(p.key_span.start) {
                        targets.push((obj, index));
                    }
                }
            }
        }
        Visit::Descend
    });
}

fn removal_range(src: &str, obj: &ObjectNode, index: usize) -> std::ops::Range<usize> {
    let Some(Member::Property(prop)) = obj.members.get(index) else {
        return 0..0;
    };
    let value_end = prop.value.span().end;
    let end = prop.comma.map(|c| c + 1).unwrap_or(value_end);

    let start_of_line = line_start(src, prop.key_span.start);
    let end_of_line = line_end(src, end);
    let before = &src[start_of_line..prop.key_span.start];
    let after = src[end..end_of_line].trim();

    if before.trim().is_empty() && (after.is_empty() || after.starts_with("//")) {
        if end_of_line < src.len() {
            return start_of_line..end_of_line + 1;
        }
        // last line without a trailing newline: take the preceding line break
        let preceding = if src[..start_of_line].ends_with("\r\n") {
            2
        } else if start_of_line > 0 {
            1
        } else {
            0
        };
        return start_of_line - preceding..end_of_line;
    }

    if prop.comma.is_some() {
        let rest = &src[end..end_of_line];
        let spaces = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        return prop.key_span.start..end + spaces;
    }

    // inline and last: drop the separator before it
    match index.checked_sub(1).and_then(|i| obj.members.get(i)) {
        Some(Member::Property(previous)) if previous.comma.is_some() => {
            previous.comma.unwrap_or(prop.key_span.start)..value_end
        }
        _ => prop.key_span.start..value_end,
    }
}
