use super::{InterruptCoordinator, PatchPreview};
use crate::error::PatchError;
use crate::file_patch::{apply_with_report, DiffBlock, PatchInstruction};
use crate::types::PendingInterrupt;
use crate::util::parse_bool_flag;
use serde_json::Value;

/// Tools whose interrupts get a content preview before approval.
pub const FILE_EDIT_TOOLS: &[&str] = &[
    "write_to_file",
    "insert_content",
    "search_and_replace",
    "apply_diff",
];

pub fn is_file_edit_tool(name: &str) -> bool {
    FILE_EDIT_TOOLS.contains(&name)
}

impl InterruptCoordinator {
    /// Computes the prospective file content for a file-editing interrupt.
    /// Returns `None` for other tools and for instructions that cannot be
    /// read or applied.
    pub(super) fn prepare_preview(&self, interrupt: &PendingInterrupt) -> Option<PatchPreview> {
        if !is_file_edit_tool(&interrupt.tool_name) {
            return None;
        }

        let (path, instruction) =
            match patch_instruction_from_parameters(&interrupt.tool_name, &interrupt.parameters) {
                Ok(parsed) => parsed,
                Err(error) => {
                    tracing::warn!(
                        interrupt_id = %interrupt.id,
                        tool = %interrupt.tool_name,
                        error = %error,
                        "edit instruction unreadable; no preview"
                    );
                    return None;
                }
            };

        let original = match self.file_store.fetch(&path) {
            Ok(content) => content.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(
                    path = %path,
                    error = %format!("{error:#}"),
                    "preview fetch failed"
                );
                return None;
            }
        };

        let report = match apply_with_report(&original, &instruction) {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "preview patch failed");
                return None;
            }
        };
        if !report.skipped_blocks.is_empty() {
            tracing::debug!(
                path = %path,
                skipped = ?report.skipped_blocks,
                "diff blocks skipped; search lines not found"
            );
        }

        Some(PatchPreview::new(path, original, report.content))
    }
}

/// Maps a file-editing tool's parameters to the path it targets and the
/// edit to apply there.
pub fn patch_instruction_from_parameters(
    tool: &str,
    parameters: &Value,
) -> Result<(String, PatchInstruction), PatchError> {
    let path = required_tool_string(parameters, tool, "path", &["path", "file_path"])?;

    let instruction = match tool {
        "write_to_file" => PatchInstruction::Overwrite {
            content: required_tool_string(parameters, tool, "content", &["content"])?,
        },
        "insert_content" => PatchInstruction::InsertAt {
            paragraph_index: first_tool_index(parameters, &["line", "paragraph_index"])
                .ok_or_else(|| missing(tool, "line"))?,
            content: required_tool_string(parameters, tool, "content", &["content"])?,
        },
        "search_and_replace" => PatchInstruction::SearchReplace {
            search: required_tool_string(parameters, tool, "search", &["search"])?,
            replace: first_tool_string(parameters, &["replace"])
                .unwrap_or_default()
                .to_string(),
            use_regex: tool_flag(parameters, "use_regex"),
            ignore_case: tool_flag(parameters, "ignore_case"),
        },
        "apply_diff" => PatchInstruction::StructuredDiff {
            blocks: diff_blocks(parameters, tool)?,
        },
        other => return Err(PatchError::NotAFileTool(other.to_string())),
    };

    Ok((path, instruction))
}

fn diff_blocks(parameters: &Value, tool: &str) -> Result<Vec<DiffBlock>, PatchError> {
    let entries = parameters
        .get("diff")
        .and_then(Value::as_array)
        .ok_or_else(|| missing(tool, "diff"))?;

    entries
        .iter()
        .map(|entry| -> Result<DiffBlock, PatchError> {
            Ok(DiffBlock {
                start_line: first_tool_index(entry, &["start_line"]).unwrap_or(1),
                search_lines: tool_lines(entry.get("search"))
                    .ok_or_else(|| missing(tool, "search"))?,
                replace_lines: tool_lines(entry.get("replace")).unwrap_or_default(),
            })
        })
        .collect()
}

fn first_tool_string<'a>(input: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| input.get(*key).and_then(Value::as_str))
}

fn required_tool_string(
    input: &Value,
    tool: &str,
    canonical_key: &'static str,
    keys: &[&str],
) -> Result<String, PatchError> {
    first_tool_string(input, keys)
        .map(str::to_string)
        .ok_or_else(|| missing(tool, canonical_key))
}

/// Accepts a non-negative number or a numeric string.
fn first_tool_index(input: &Value, keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|key| match input.get(*key)? {
        Value::Number(number) => number.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

fn tool_flag(input: &Value, key: &str) -> bool {
    match input.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => parse_bool_flag(text).unwrap_or(false),
        _ => false,
    }
}

/// A string is split on `\n`; an array keeps its string entries.
fn tool_lines(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::String(text) if text.is_empty() => Some(Vec::new()),
        Value::String(text) => Some(text.split('\n').map(str::to_string).collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

fn missing(tool: &str, parameter: &'static str) -> PatchError {
    PatchError::MissingParameter {
        tool: tool.to_string(),
        parameter,
    }
}
