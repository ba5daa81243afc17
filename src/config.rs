use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub sheet: SheetConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetConfig {
    /// Spreadsheet identifier (the long id from the sheet URL).
    pub spreadsheet_id: String,
    /// Worksheet (tab) holding the analyzed-video records.
    pub worksheet: String,
    #[serde(default = "default_sheet_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_sheet_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            timeout_secs: default_model_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_model_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f64 {
    0.4
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// How many matched records to send to the model (most recent wins).
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    /// How many recent records to fall back to when nothing matches.
    #[serde(default = "default_fallback_recent")]
    pub fallback_recent: usize,
    /// Lifetime of the memoized sheet snapshot.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
            fallback_recent: default_fallback_recent(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_max_matches() -> usize {
    5
}
fn default_fallback_recent() -> usize {
    3
}
fn default_cache_ttl_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.sheet.spreadsheet_id.trim().is_empty() {
        anyhow::bail!("sheet.spreadsheet_id must not be empty");
    }
    if config.sheet.worksheet.trim().is_empty() {
        anyhow::bail!("sheet.worksheet must not be empty");
    }

    if config.retrieval.max_matches < 1 {
        anyhow::bail!("retrieval.max_matches must be >= 1");
    }
    if config.retrieval.fallback_recent < 1 {
        anyhow::bail!("retrieval.fallback_recent must be >= 1");
    }
    if config.retrieval.cache_ttl_secs == 0 {
        anyhow::bail!("retrieval.cache_ttl_secs must be > 0");
    }

    match config.model.provider.as_str() {
        "gemini" => {}
        other => anyhow::bail!("Unknown model provider: '{}'. Only gemini is supported.", other),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let file = write_config(
            r#"[sheet]
spreadsheet_id = "abc123"
worksheet = "analyses"

[server]
bind = "127.0.0.1:7430"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.model.provider, "gemini");
        assert_eq!(config.model.model, "gemini-2.5-flash");
        assert_eq!(config.retrieval.max_matches, 5);
        assert_eq!(config.retrieval.fallback_recent, 3);
        assert_eq!(config.retrieval.cache_ttl_secs, 600);
    }

    #[test]
    fn test_empty_spreadsheet_id_rejected() {
        let file = write_config(
            r#"[sheet]
spreadsheet_id = ""
worksheet = "analyses"

[server]
bind = "127.0.0.1:7430"
"#,
        );
        let err = load_config(file.path()).unwrap_err().to_string();
        assert!(err.contains("spreadsheet_id"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let file = write_config(
            r#"[sheet]
spreadsheet_id = "abc123"
worksheet = "analyses"

[model]
provider = "palm"

[server]
bind = "127.0.0.1:7430"
"#,
        );
        let err = load_config(file.path()).unwrap_err().to_string();
        assert!(err.contains("Unknown model provider"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let file = write_config(
            r#"[sheet]
spreadsheet_id = "abc123"
worksheet = "analyses"

[retrieval]
cache_ttl_secs = 0

[server]
bind = "127.0.0.1:7430"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }
}
