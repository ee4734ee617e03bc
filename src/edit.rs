//! Text edits and diff previews

use std::ops::Range;

use similar::TextDiff;

/// Replace `range` of the source with `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            range: offset..offset,
            replacement: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }
}

/// Apply non-overlapping edits to `src`.
///
/// Edits may be given in any order. Insertions at the same offset keep their
/// relative order. An edit overlapping an earlier one is dropped.
pub fn apply_edits(src: &str, mut edits: Vec<TextEdit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut out = String::with_capacity(src.len() + edits.iter().map(|e| e.replacement.len()).sum::<usize>());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            tracing::debug!(range = ?edit.range, "dropping overlapping edit");
            continue;
        }
        out.push_str(&src[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&src[cursor..]);
    out
}

/// Unified diff between two versions of a file
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}
