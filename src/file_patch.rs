//! Pure computation of prospective file content from an edit instruction.
//!
//! Nothing here touches the filesystem; callers fetch the original content
//! and decide whether to persist the result.

use crate::error::PatchError;
use regex::{NoExpand, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchInstruction {
    Overwrite {
        content: String,
    },
    /// `paragraph_index` 0 appends; otherwise the content is inserted before
    /// that 1-based line.
    InsertAt {
        paragraph_index: usize,
        content: String,
    },
    SearchReplace {
        search: String,
        replace: String,
        use_regex: bool,
        ignore_case: bool,
    },
    StructuredDiff {
        blocks: Vec<DiffBlock>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBlock {
    /// 1-based line where the search for `search_lines` begins.
    pub start_line: usize,
    pub search_lines: Vec<String>,
    pub replace_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub content: String,
    /// Indices of diff blocks whose search lines were not found.
    pub skipped_blocks: Vec<usize>,
}

pub fn apply(original: &str, instruction: &PatchInstruction) -> Result<String, PatchError> {
    apply_with_report(original, instruction).map(|report| report.content)
}

pub fn apply_with_report(
    original: &str,
    instruction: &PatchInstruction,
) -> Result<PatchReport, PatchError> {
    let mut skipped_blocks = Vec::new();
    let content = match instruction {
        PatchInstruction::Overwrite { content } => content.clone(),
        PatchInstruction::InsertAt {
            paragraph_index,
            content,
        } => insert_at(original, *paragraph_index, content),
        PatchInstruction::SearchReplace {
            search,
            replace,
            use_regex,
            ignore_case,
        } => search_replace(original, search, replace, *use_regex, *ignore_case)?,
        PatchInstruction::StructuredDiff { blocks } => {
            let (content, skipped) = structured_diff(original, blocks)?;
            skipped_blocks = skipped;
            content
        }
    };

    Ok(PatchReport {
        content,
        skipped_blocks,
    })
}

/// Line view of a text. A trailing newline is remembered rather than
/// counted as an empty last line.
struct Lines {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Lines {
    fn split(text: &str) -> Self {
        if text.is_empty() {
            return Self {
                lines: Vec::new(),
                trailing_newline: false,
            };
        }
        let trailing_newline = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);
        Self {
            lines: body.split('\n').map(str::to_string).collect(),
            trailing_newline,
        }
    }

    fn join(self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn insert_at(original: &str, paragraph_index: usize, content: &str) -> String {
    let mut lines = Lines::split(original);
    let at = if paragraph_index == 0 {
        lines.lines.len()
    } else {
        (paragraph_index - 1).min(lines.lines.len())
    };
    lines.lines.insert(at, content.to_string());
    lines.join()
}

fn search_replace(
    original: &str,
    search: &str,
    replace: &str,
    use_regex: bool,
    ignore_case: bool,
) -> Result<String, PatchError> {
    if search.is_empty() {
        return Err(PatchError::EmptySearch);
    }

    let pattern = if use_regex {
        search.to_string()
    } else {
        regex::escape(search)
    };
    let matcher = RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .build()?;

    let replaced = if use_regex {
        matcher.replace_all(original, replace)
    } else {
        matcher.replace_all(original, NoExpand(replace))
    };
    Ok(replaced.into_owned())
}

fn structured_diff(
    original: &str,
    blocks: &[DiffBlock],
) -> Result<(String, Vec<usize>), PatchError> {
    if let Some(block) = blocks.iter().position(|block| block.search_lines.is_empty()) {
        return Err(PatchError::EmptySearchLines { block });
    }

    let mut lines = Lines::split(original);
    let mut skipped = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let from = block.start_line.saturating_sub(1);
        match find_block(&lines.lines, &block.search_lines, from) {
            Some(at) => {
                lines.lines.splice(
                    at..at + block.search_lines.len(),
                    block.replace_lines.iter().cloned(),
                );
            }
            None => {
                tracing::debug!(
                    block = index,
                    start_line = block.start_line,
                    "diff block search lines not found; skipping"
                );
                skipped.push(index);
            }
        }
    }

    Ok((lines.join(), skipped))
}

fn find_block(lines: &[String], search: &[String], from: usize) -> Option<usize> {
    if search.len() > lines.len() {
        return None;
    }
    (from..=lines.len() - search.len()).find(|&at| {
        lines[at..at + search.len()]
            .iter()
            .zip(search)
            .all(|(line, wanted)| line == wanted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start_line: usize, search: &[&str], replace: &[&str]) -> DiffBlock {
        DiffBlock {
            start_line,
            search_lines: search.iter().map(|s| s.to_string()).collect(),
            replace_lines: replace.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn literal(search: &str, replace: &str) -> PatchInstruction {
        PatchInstruction::SearchReplace {
            search: search.to_string(),
            replace: replace.to_string(),
            use_regex: false,
            ignore_case: false,
        }
    }

    #[test]
    fn test_overwrite_with_original_is_identity() {
        let original = "fn main() {}\n";
        let instruction = PatchInstruction::Overwrite {
            content: original.to_string(),
        };
        assert_eq!(apply(original, &instruction).unwrap(), original);
    }

    #[test]
    fn test_insert_at_zero_appends() {
        let instruction = PatchInstruction::InsertAt {
            paragraph_index: 0,
            content: "END".to_string(),
        };
        assert_eq!(apply("a\nb", &instruction).unwrap(), "a\nb\nEND");
    }

    #[test]
    fn test_insert_at_line_inserts_before_it() {
        let instruction = PatchInstruction::InsertAt {
            paragraph_index: 2,
            content: "mid".to_string(),
        };
        assert_eq!(apply("a\nb\nc", &instruction).unwrap(), "a\nmid\nb\nc");

        let first = PatchInstruction::InsertAt {
            paragraph_index: 1,
            content: "top".to_string(),
        };
        assert_eq!(apply("a\nb", &first).unwrap(), "top\na\nb");
    }

    #[test]
    fn test_insert_at_beyond_end_clamps() {
        let instruction = PatchInstruction::InsertAt {
            paragraph_index: 99,
            content: "tail".to_string(),
        };
        assert_eq!(apply("a\nb", &instruction).unwrap(), "a\nb\ntail");
    }

    #[test]
    fn test_insert_preserves_trailing_newline_and_handles_empty() {
        let instruction = PatchInstruction::InsertAt {
            paragraph_index: 0,
            content: "END".to_string(),
        };
        assert_eq!(apply("a\nb\n", &instruction).unwrap(), "a\nb\nEND\n");
        assert_eq!(apply("", &instruction).unwrap(), "END");
    }

    #[test]
    fn test_lone_newline_survives_unmatched_diff() {
        let instruction = PatchInstruction::StructuredDiff {
            blocks: vec![block(1, &["nowhere"], &["X"])],
        };
        assert_eq!(apply("\n", &instruction).unwrap(), "\n");
        assert_eq!(apply("\n\n", &instruction).unwrap(), "\n\n");
    }

    #[test]
    fn test_literal_replace_hits_all_occurrences() {
        assert_eq!(
            apply("cat hat cat", &literal("cat", "dog")).unwrap(),
            "dog hat dog"
        );
        assert_eq!(apply("a.b.c", &literal(".", "$1")).unwrap(), "a$1b$1c");
    }

    #[test]
    fn test_search_replace_round_trip() {
        let original = "alpha beta alpha";
        let forward = apply(original, &literal("alpha", "gamma")).unwrap();
        assert_eq!(apply(&forward, &literal("gamma", "alpha")).unwrap(), original);
    }

    #[test]
    fn test_regex_replace_with_captures_and_ignore_case() {
        let instruction = PatchInstruction::SearchReplace {
            search: r"LET (\w+)".to_string(),
            replace: "const $1".to_string(),
            use_regex: true,
            ignore_case: true,
        };
        assert_eq!(
            apply("let x = 1;\nLet y = 2;", &instruction).unwrap(),
            "const x = 1;\nconst y = 2;"
        );
    }

    #[test]
    fn test_search_replace_rejects_empty_and_bad_regex() {
        assert!(matches!(
            apply("abc", &literal("", "x")),
            Err(PatchError::EmptySearch)
        ));
        let bad = PatchInstruction::SearchReplace {
            search: "(".to_string(),
            replace: String::new(),
            use_regex: true,
            ignore_case: false,
        };
        assert!(matches!(apply("abc", &bad), Err(PatchError::InvalidRegex(_))));
    }

    #[test]
    fn test_structured_diff_replaces_block() {
        let instruction = PatchInstruction::StructuredDiff {
            blocks: vec![block(1, &["a"], &["X", "Y"])],
        };
        assert_eq!(apply("a\nb", &instruction).unwrap(), "X\nY\nb");
    }

    #[test]
    fn test_structured_diff_missing_search_is_skipped() {
        let instruction = PatchInstruction::StructuredDiff {
            blocks: vec![block(1, &["nowhere"], &["X"])],
        };
        let report = apply_with_report("a\nb\n", &instruction).unwrap();
        assert_eq!(report.content, "a\nb\n");
        assert_eq!(report.skipped_blocks, vec![0]);
    }

    #[test]
    fn test_structured_diff_searches_from_start_line() {
        let instruction = PatchInstruction::StructuredDiff {
            blocks: vec![block(2, &["x"], &["y"])],
        };
        assert_eq!(apply("x\nx\nz", &instruction).unwrap(), "x\ny\nz");

        let too_late = PatchInstruction::StructuredDiff {
            blocks: vec![block(3, &["x"], &["y"])],
        };
        assert_eq!(apply("x\nx\nz", &too_late).unwrap(), "x\nx\nz");
    }

    #[test]
    fn test_structured_diff_blocks_see_earlier_edits() {
        let instruction = PatchInstruction::StructuredDiff {
            blocks: vec![
                block(1, &["one"], &["uno", "extra"]),
                block(3, &["two"], &["dos"]),
                block(1, &["extra"], &[]),
            ],
        };
        assert_eq!(apply("one\ntwo\n", &instruction).unwrap(), "uno\ndos\n");
    }

    #[test]
    fn test_structured_diff_rejects_empty_search_lines() {
        let instruction = PatchInstruction::StructuredDiff {
            blocks: vec![block(1, &["a"], &["b"]), block(1, &[], &["c"])],
        };
        assert!(matches!(
            apply("a", &instruction),
            Err(PatchError::EmptySearchLines { block: 1 })
        ));
    }
}
