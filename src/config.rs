use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_prefix() -> String {
    "/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_max_chunk_lines")]
    pub max_chunk_lines: usize,
    #[serde(default = "default_show_layers")]
    pub show_layers: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_chunk_lines: default_max_chunk_lines(),
            show_layers: default_show_layers(),
        }
    }
}

fn default_max_chunk_lines() -> usize {
    12
}
fn default_show_layers() -> bool {
    true
}

impl BackendConfig {
    /// Full URL of one endpoint, e.g. `endpoint("search")`.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", base, path)
        } else {
            format!("{}/{}/{}", base, prefix, path)
        }
    }
}

impl Config {
    /// Settings for a backend on localhost, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                api_prefix: default_api_prefix(),
                timeout_secs: default_timeout_secs(),
            },
            render: RenderConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate backend
    let url = config.backend.base_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "backend.base_url must start with http:// or https://, got '{}'",
            url
        );
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }

    // Validate render
    if config.render.max_chunk_lines == 0 {
        anyhow::bail!("render.max_chunk_lines must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = parse("[backend]\nbase_url = \"http://localhost:8000\"\n").unwrap();
        assert_eq!(config.backend.api_prefix, "/api");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.render.max_chunk_lines, 12);
        assert!(config.render.show_layers);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = parse("[backend]\nbase_url = \"localhost:8000\"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = parse("[backend]\nbase_url = \"http://x\"\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_zero_chunk_lines() {
        let src = "[backend]\nbase_url = \"http://x\"\n[render]\nmax_chunk_lines = 0\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn endpoint_joins_prefix() {
        let mut backend = Config::minimal().backend;
        backend.base_url = "http://host:9000/".to_string();
        assert_eq!(backend.endpoint("search"), "http://host:9000/api/search");

        backend.api_prefix = String::new();
        assert_eq!(backend.endpoint("clear"), "http://host:9000/clear");

        backend.api_prefix = "/v2/".to_string();
        assert_eq!(backend.endpoint("import"), "http://host:9000/v2/import");
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/codemap.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
