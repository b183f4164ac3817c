use reqwest::Url;

/// Parses "true"/"false"/"1"/"0"/"yes"/"no"/"on"/"off".
pub fn parse_bool_flag(value: impl AsRef<str>) -> Option<bool> {
    match value.as_ref().trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim_matches(['[', ']']).to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "::1"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}
