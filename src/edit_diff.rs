//! Line diff between a file's stored content and its previewed content,
//! grouped into hunks for display next to a pending approval.

use serde::Serialize;
use similar::{ChangeTag, DiffOp, DiffTag, TextDiff};
use std::ops::Range;

pub const DEFAULT_PREVIEW_CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineChange {
    Keep,
    Remove,
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HunkLine {
    pub change: LineChange,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

pub fn diff_hunks(old: &str, new: &str, context_lines: usize) -> Vec<DiffHunk> {
    let diff = TextDiff::from_lines(old, new);

    diff.grouped_ops(context_lines)
        .into_iter()
        .filter(|group| group.iter().any(|op| op.tag() != DiffTag::Equal))
        .filter_map(|group| build_hunk(&diff, &group))
        .collect()
}

/// Renders hunks as `@@ -a,b +c,d @@` blocks with ` `/`-`/`+` markers.
pub fn format_preview_hunks(hunks: &[DiffHunk]) -> String {
    if hunks.is_empty() {
        return "(no changes)\n".to_string();
    }

    let mut out = String::new();
    for hunk in hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for line in &hunk.lines {
            let marker = match line.change {
                LineChange::Keep => ' ',
                LineChange::Remove => '-',
                LineChange::Add => '+',
            };
            out.push(marker);
            out.push_str(&line.text);
            out.push('\n');
        }
    }
    out
}

fn build_hunk<'a>(diff: &TextDiff<'a, 'a, 'a, str>, group: &[DiffOp]) -> Option<DiffHunk> {
    let (first, last) = (group.first()?, group.last()?);
    let old_range = first.old_range().start..last.old_range().end;
    let new_range = first.new_range().start..last.new_range().end;

    let lines = group
        .iter()
        .flat_map(|op| diff.iter_changes(op))
        .map(|change| HunkLine {
            change: match change.tag() {
                ChangeTag::Equal => LineChange::Keep,
                ChangeTag::Delete => LineChange::Remove,
                ChangeTag::Insert => LineChange::Add,
            },
            text: strip_line_ending(change.value()).to_string(),
        })
        .collect();

    // Empty sides point at the line before the change, as unified diffs do.
    Some(DiffHunk {
        old_start: hunk_start(&old_range),
        old_count: old_range.len(),
        new_start: hunk_start(&new_range),
        new_count: new_range.len(),
        lines,
    })
}

fn hunk_start(range: &Range<usize>) -> usize {
    if range.is_empty() {
        range.start
    } else {
        range.start + 1
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
