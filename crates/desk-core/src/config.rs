use crate::error::DeskError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub retrieval: RetrievalConfig,
    pub booking: BookingStoreConfig,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
            booking: BookingStoreConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.config/gym-desk/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gym-desk")
            .join("config.toml")
    }

    /// Data directory for sessions, the document index, and input history.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gym-desk")
    }
}

/// LLM provider configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the chat/embeddings API.
    pub api_base: String,
    /// Chat model name.
    pub model: String,
    /// API key; falls back to the OPENAI_API_KEY environment variable.
    pub api_key: Option<String>,
    /// Maximum tokens to generate per completion.
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            api_key: None,
            max_tokens: 1024,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key: config value first, then environment.
    pub fn resolve_api_key(&self) -> Result<String, DeskError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                DeskError::Config(
                    "Missing provider API key: set provider.api_key in the config file \
                     or the OPENAI_API_KEY environment variable"
                        .into(),
                )
            })
    }
}

/// Document retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Embedding model name for the /embeddings endpoint.
    pub embedding_model: String,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of passages returned per query.
    pub top_k: usize,
    /// Index file location; defaults to <data_dir>/index.json.
    pub index_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-small".into(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            index_path: None,
        }
    }
}

impl RetrievalConfig {
    /// Resolved location of the persisted document index.
    pub fn index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| AppConfig::data_dir().join("index.json"))
    }
}

/// Bookings datastore configuration (PostgREST-style REST API).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BookingStoreConfig {
    /// Base URL; falls back to the SUPABASE_URL environment variable.
    pub url: Option<String>,
    /// Service-role key; falls back to SUPABASE_SERVICE_ROLE_KEY.
    pub service_role_key: Option<String>,
}

impl BookingStoreConfig {
    /// Resolve the store credentials: config values first, then environment.
    /// Missing credentials are a startup-fatal configuration error.
    pub fn resolve(&self) -> Result<(String, String), DeskError> {
        let url = self
            .url
            .clone()
            .or_else(|| std::env::var("SUPABASE_URL").ok());
        let key = self
            .service_role_key
            .clone()
            .or_else(|| std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok());
        match (url, key) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(DeskError::Config(
                "Missing bookings datastore credentials: set booking.url and \
                 booking.service_role_key in the config file, or the SUPABASE_URL and \
                 SUPABASE_SERVICE_ROLE_KEY environment variables"
                    .into(),
            )),
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory for persisted sessions; defaults to <data_dir>/sessions.
    pub history_dir: Option<PathBuf>,
    /// Maximum messages to keep in the context window.
    pub max_history: usize,
    /// Save the session after each turn.
    pub auto_save: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_dir: None,
            max_history: 100,
            auto_save: true,
        }
    }
}

impl SessionConfig {
    /// Resolved sessions directory.
    pub fn sessions_dir(&self) -> PathBuf {
        self.history_dir
            .clone()
            .unwrap_or_else(|| AppConfig::data_dir().join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("text-embedding-3-small"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.retrieval.chunk_size, config.retrieval.chunk_size);
        assert_eq!(parsed.retrieval.top_k, config.retrieval.top_k);
        assert_eq!(parsed.session.max_history, config.session.max_history);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [provider]
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.provider.model, "gpt-4o-mini");
        assert_eq!(parsed.retrieval.chunk_overlap, 200);
        assert!(parsed.session.auto_save);
    }

    #[test]
    fn test_booking_config_values_win_over_env() {
        let config = BookingStoreConfig {
            url: Some("https://db.example.com".into()),
            service_role_key: Some("svc-key".into()),
        };
        let (url, key) = config.resolve().unwrap();
        assert_eq!(url, "https://db.example.com");
        assert_eq!(key, "svc-key");
    }

    #[test]
    fn test_index_path_override() {
        let config = RetrievalConfig {
            index_path: Some(PathBuf::from("/tmp/idx.json")),
            ..Default::default()
        };
        assert_eq!(config.index_path(), PathBuf::from("/tmp/idx.json"));
    }
}
