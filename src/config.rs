//! # Configuration Management
//!
//! Loads the gateway configuration from several layered sources:
//! - Default values (built into the code)
//! - TOML configuration file (config.toml)
//! - Environment variables (with APP_ prefix)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (deployment platforms)
//! 2. Environment variables (`APP_SERVER__PORT`, `APP_REMOTE__BASE_URL`, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Nested keys use a double underscore because several field names contain
//! a single one.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub remote: RemoteConfig,
    pub audio: AudioConfig,
}

/// Where the gateway listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// The remote chatbot API that owns transcription and conversation logic.
///
/// ## Fields:
/// - `base_url`: Root of the API; `/chat` and `/audio/transcribe` are appended
/// - `language`: Language tag sent with every transcription upload
/// - `timeout_secs`: Per-request timeout for calls to the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub language: String,
    pub timeout_secs: u64,
}

/// Audio pipeline settings.
///
/// ## Fields:
/// - `target_sample_rate`: Rate of the WAV sent for transcription (Hz)
/// - `max_upload_bytes`: Largest recording a capture session accepts
/// - `max_output_bytes`: Largest WAV a conversion may produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub target_sample_rate: u32,
    pub max_upload_bytes: usize,
    pub max_output_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            remote: RemoteConfig {
                base_url: "http://127.0.0.1:9000".to_string(),
                language: "ar-MA".to_string(),
                timeout_secs: 30,
            },
            audio: AudioConfig {
                target_sample_rate: 16000,              // What the transcription service expects
                max_upload_bytes: 25 * 1024 * 1024,     // 25MB
                max_output_bytes: 100 * 1024 * 1024,    // 100MB
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_REMOTE__BASE_URL=https://api.example.org`: Point at another API
    /// - `APP_AUDIO__TARGET_SAMPLE_RATE=8000`: Change the upload rate
    /// - `HOST=0.0.0.0` / `PORT=3000`: Deployment platform overrides
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let base_url = self.remote.base_url.trim();
        if base_url.is_empty() {
            return Err(anyhow::anyhow!("Remote base URL cannot be empty"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "Remote base URL must start with http:// or https://, got '{}'",
                base_url
            ));
        }

        if self.remote.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Remote timeout must be greater than 0"));
        }

        if self.audio.target_sample_rate == 0 {
            return Err(anyhow::anyhow!("Target sample rate must be greater than 0"));
        }

        if self.audio.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.audio.max_output_bytes == 0 {
            return Err(anyhow::anyhow!("Max output size must be greater than 0"));
        }

        Ok(())
    }

    /// Apply a partial update from JSON, e.g. `{"remote": {"language": "fr-FR"}}`.
    ///
    /// Only the fields present are changed; the result is validated.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = u16::try_from(port)
                    .map_err(|_| anyhow::anyhow!("Server port {} is out of range", port))?;
            }
        }

        if let Some(remote) = partial_config.get("remote") {
            if let Some(base_url) = remote.get("base_url").and_then(|v| v.as_str()) {
                self.remote.base_url = base_url.to_string();
            }
            if let Some(language) = remote.get("language").and_then(|v| v.as_str()) {
                self.remote.language = language.to_string();
            }
            if let Some(timeout) = remote.get("timeout_secs").and_then(|v| v.as_u64()) {
                self.remote.timeout_secs = timeout;
            }
        }

        if let Some(audio) = partial_config.get("audio") {
            if let Some(rate) = audio.get("target_sample_rate").and_then(|v| v.as_u64()) {
                self.audio.target_sample_rate = u32::try_from(rate)
                    .map_err(|_| anyhow::anyhow!("Sample rate {} is out of range", rate))?;
            }
            if let Some(limit) = audio.get("max_upload_bytes").and_then(|v| v.as_u64()) {
                self.audio.max_upload_bytes = limit as usize;
            }
            if let Some(limit) = audio.get("max_output_bytes").and_then(|v| v.as_u64()) {
                self.audio.max_output_bytes = limit as usize;
            }
        }

        self.validate()?;
        Ok(())
    }

    /// Full URL of a remote API route, e.g. `endpoint("/chat")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.remote.base_url.trim_end_matches('/'), path)
    }
}
