use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::is_local_endpoint_url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TURN_PATH: &str = "/chat/stream";
const DEFAULT_RESUME_PATH: &str = "/chat/resume";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub turn_path: String,
    pub resume_path: String,
    pub working_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = env_or("TURNKIT_API_URL", DEFAULT_API_URL);
        let api_key = std::env::var("TURNKIT_API_KEY").ok().and_then(|v| {
            if v.trim().is_empty() {
                None
            } else {
                Some(v)
            }
        });

        Ok(Self {
            api_key,
            api_url,
            turn_path: env_or("TURNKIT_TURN_PATH", DEFAULT_TURN_PATH),
            resume_path: env_or("TURNKIT_RESUME_PATH", DEFAULT_RESUME_PATH),
            working_dir: std::env::current_dir()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid TURNKIT_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !is_local_endpoint_url(&self.api_url) && self.api_key.is_none() {
            bail!(
                "TURNKIT_API_KEY must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        for (name, path) in [
            ("TURNKIT_TURN_PATH", &self.turn_path),
            ("TURNKIT_RESUME_PATH", &self.resume_path),
        ] {
            if !path.starts_with('/') {
                bail!("Invalid {name} '{path}': expected a path starting with '/'");
            }
        }

        Ok(())
    }

    pub fn turn_url(&self) -> String {
        join_url(&self.api_url, &self.turn_path)
    }

    pub fn resume_url(&self) -> String {
        join_url(&self.api_url, &self.resume_path)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
