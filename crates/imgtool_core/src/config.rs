use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "imgtool/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const DEFAULT_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ToolConfig {
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub documents: DocumentsSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FetchSection {
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct DocumentsSection {
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl ToolConfig {
    /// Resolve the fetch user agent: env IMGTOOL_USER_AGENT > config > default.
    pub fn user_agent(&self) -> String {
        if let Ok(value) = env::var("IMGTOOL_USER_AGENT") {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                return trimmed;
            }
        }
        self.fetch
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn timeout_ms(&self) -> u64 {
        self.fetch.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    /// Markdown extensions that mark a file as a document.
    pub fn extensions(&self) -> Vec<String> {
        if self.documents.extensions.is_empty() {
            return DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect();
        }
        self.documents.extensions.clone()
    }
}

/// Load and parse a ToolConfig from a TOML file. Returns default if the file
/// doesn't exist.
pub fn load_config(config_path: &Path) -> Result<ToolConfig> {
    if !config_path.exists() {
        return Ok(ToolConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ToolConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}
