//! Service configuration
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables (a `.env` file is loaded into the environment first).

use crate::llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Search index (Azure AI Search) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub api_version: String,
    /// Maximum documents returned per query
    pub top: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index_name: String::new(),
            api_version: "2023-11-01".to_string(),
            top: 50,
        }
    }
}

/// Graph database (Gremlin API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    pub password: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 443,
            database: String::new(),
            collection: String::new(),
            password: String::new(),
        }
    }
}

impl GraphConfig {
    pub fn url(&self) -> String {
        format!("wss://{}:{}/", self.host, self.port)
    }

    /// SASL username, in the resource-path form the graph service expects
    pub fn username(&self) -> String {
        format!("/dbs/{}/colls/{}", self.database, self.collection)
    }
}

/// LLM settings for summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub system_prompt: Option<String>,
    /// Number of summaries kept in memory
    pub cache_capacity: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Groq,
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            api_base_url: None,
            system_prompt: None,
            cache_capacity: 256,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub graph: GraphConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load `.env`, the optional YAML file and the process environment, then validate.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }

        let base = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        base.with_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_yaml_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Build from defaults plus the given variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_lookup(lookup)
    }

    /// Overlay environment-style variables onto `self` and validate the result.
    pub fn with_lookup<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AZURE_SEARCH_SERVICE_ENDPOINT") {
            self.search.endpoint = v;
        }
        if let Some(v) = get("AZURE_SEARCH_API_KEY") {
            self.search.api_key = v;
        }
        if let Some(v) = get("AZURE_SEARCH_INDEX_NAME") {
            self.search.index_name = v;
        }
        if let Some(v) = get("AZURE_SEARCH_API_VERSION") {
            self.search.api_version = v;
        }
        if let Some(v) = get("AZURE_SEARCH_TOP") {
            self.search.top = parse_number("AZURE_SEARCH_TOP", &v)?;
        }

        if let Some(v) = get("GREMLIN_HOST") {
            self.graph.host = v;
        }
        if let Some(v) = get("GREMLIN_PORT") {
            self.graph.port = parse_number("GREMLIN_PORT", &v)?;
        }
        if let Some(v) = get("GREMLIN_DATABASE") {
            self.graph.database = v;
        }
        if let Some(v) = get("GREMLIN_COLLECTION") {
            self.graph.collection = v;
        }
        if let Some(v) = get("GREMLIN_PASSWORD") {
            self.graph.password = v;
        }

        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v.parse().map_err(|message| ConfigError::Invalid {
                key: "LLM_PROVIDER".to_string(),
                message,
            })?;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_API_BASE_URL") {
            self.llm.api_base_url = Some(v);
        }
        let key_var = match self.llm.provider {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Groq => Some("GROQ_API_KEY"),
            LlmProvider::Ollama | LlmProvider::Mock => None,
        };
        if let Some(v) = key_var.and_then(|k| get(k)) {
            self.llm.api_key = Some(v);
        }

        if let Some(v) = get("DOCSEARCH_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("DOCSEARCH_PORT") {
            self.server.port = parse_number("DOCSEARCH_PORT", &v)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check that every required setting is present, reporting all gaps at once.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut missing = Vec::new();
        let mut require = |value: &str, name: &str| {
            if value.trim().is_empty() {
                missing.push(name.to_string());
            }
        };

        require(&self.search.endpoint, "AZURE_SEARCH_SERVICE_ENDPOINT");
        require(&self.search.api_key, "AZURE_SEARCH_API_KEY");
        require(&self.search.index_name, "AZURE_SEARCH_INDEX_NAME");
        require(&self.graph.host, "GREMLIN_HOST");
        require(&self.graph.database, "GREMLIN_DATABASE");
        require(&self.graph.collection, "GREMLIN_COLLECTION");
        require(&self.graph.password, "GREMLIN_PASSWORD");

        let api_key = self.llm.api_key.as_deref().unwrap_or("");
        match self.llm.provider {
            LlmProvider::Groq => require(api_key, "GROQ_API_KEY"),
            LlmProvider::OpenAI => require(api_key, "OPENAI_API_KEY"),
            LlmProvider::Ollama | LlmProvider::Mock => {}
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("expected a number, got '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AZURE_SEARCH_SERVICE_ENDPOINT", "https://docs.search.windows.net"),
            ("AZURE_SEARCH_API_KEY", "search-key"),
            ("AZURE_SEARCH_INDEX_NAME", "documents"),
            ("GREMLIN_HOST", "graph.gremlin.cosmos.azure.com"),
            ("GREMLIN_DATABASE", "docs"),
            ("GREMLIN_COLLECTION", "entities"),
            ("GREMLIN_PASSWORD", "secret"),
            ("GROQ_API_KEY", "groq-key"),
        ])
    }

    #[test]
    fn test_from_lookup_applies_defaults() {
        let env = full_env();
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.search.index_name, "documents");
        assert_eq!(config.search.api_version, "2023-11-01");
        assert_eq!(config.graph.port, 443);
        assert_eq!(config.graph.url(), "wss://graph.gremlin.cosmos.azure.com:443/");
        assert_eq!(config.graph.username(), "/dbs/docs/colls/entities");
        assert_eq!(config.llm.provider, LlmProvider::Groq);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.api_key.as_deref(), Some("groq-key"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_missing_settings_are_all_reported() {
        let err = AppConfig::from_lookup(|_| None).unwrap_err();
        match err {
            ConfigError::Missing(names) => {
                assert!(names.contains(&"AZURE_SEARCH_SERVICE_ENDPOINT".to_string()));
                assert!(names.contains(&"GREMLIN_PASSWORD".to_string()));
                assert!(names.contains(&"GROQ_API_KEY".to_string()));
                assert_eq!(names.len(), 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut env = full_env();
        env.insert("AZURE_SEARCH_API_KEY", "   ");
        let err = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(err.to_string().contains("AZURE_SEARCH_API_KEY"));
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut env = full_env();
        env.remove("GROQ_API_KEY");
        env.insert("LLM_PROVIDER", "mock");
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Mock);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut env = full_env();
        env.insert("GREMLIN_PORT", "not-a-port");
        let err = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "GREMLIN_PORT"));
    }

    #[test]
    fn test_yaml_file_is_overridden_by_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "search:\n  endpoint: https://yaml.search.windows.net\n  top: 10\nserver:\n  port: 9000\nllm:\n  provider: ollama\n  model: llama3"
        )
        .unwrap();

        let base = AppConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(base.search.top, 10);
        assert_eq!(base.llm.provider, LlmProvider::Ollama);

        let mut env = full_env();
        env.remove("GROQ_API_KEY");
        env.insert("DOCSEARCH_PORT", "9100");
        let config = base.with_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.search.endpoint, "https://docs.search.windows.net");
        assert_eq!(config.search.top, 10);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.llm.model, "llama3");
    }
}
