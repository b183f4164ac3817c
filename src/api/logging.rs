use crate::error::DecodeError;
use crate::util::parse_bool_flag;
use serde_json::Value;

const DEBUG_PAYLOAD_ENV: &str = "TURNKIT_DEBUG_PAYLOAD";
const MAX_LOGGED_LINE_CHARS: usize = 240;

/// Request bodies carry user text, so they are only logged on request.
pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::info!(url = %request_url, payload = %formatted_payload, "request payload");
}

pub fn emit_decode_error(line: &[u8], error: &DecodeError) {
    tracing::warn!(
        error = %error,
        line = %truncate_for_log(&String::from_utf8_lossy(line)),
        "dropping malformed stream line"
    );
}

fn truncate_for_log(text: &str) -> String {
    if text.chars().count() <= MAX_LOGGED_LINE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_LOGGED_LINE_CHARS).collect();
    truncated.push('…');
    truncated
}
