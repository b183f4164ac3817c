use crate::types::{Invocation, ParsedArguments, ToolCallDelta};
use serde_json::Value;

/// Suffixes tried, in order, to close a truncated argument object for
/// preview purposes.
const SPECULATIVE_COMPLETIONS: [&str; 2] = ["\"}", "}"];

/// Folds one fragment into the invocation list, creating the invocation at
/// `delta.position` on first contact. Argument text only ever grows.
pub fn apply_tool_call_delta(invocations: &mut Vec<Invocation>, delta: &ToolCallDelta) {
    let index = match invocations
        .binary_search_by_key(&delta.position, |invocation| invocation.position)
    {
        Ok(index) => index,
        Err(index) => {
            invocations.insert(index, Invocation::new(delta.position));
            index
        }
    };
    let invocation = &mut invocations[index];

    if let Some(name) = &delta.name {
        invocation.name = Some(name.clone());
    }
    if let Some(id) = &delta.id {
        invocation.id = Some(id.clone());
    }
    if let Some(fragment) = &delta.argument_fragment {
        invocation.raw_arguments.push_str(fragment);
    }

    invocation.parsed_arguments =
        reparse_arguments(&invocation.raw_arguments, &invocation.parsed_arguments);
}

fn reparse_arguments(raw: &str, previous: &ParsedArguments) -> ParsedArguments {
    if let Some(value) = parse_object(raw) {
        return ParsedArguments::Complete(value);
    }

    let speculative = SPECULATIVE_COMPLETIONS
        .iter()
        .find_map(|suffix| parse_object(&format!("{raw}{suffix}")));

    let preview = speculative.or_else(|| match previous {
        ParsedArguments::Complete(value) => Some(value.clone()),
        ParsedArguments::Loading { preview, .. } => preview.clone(),
    });

    ParsedArguments::Loading {
        partial: raw.to_string(),
        preview,
    }
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
