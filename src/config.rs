//! Configuration management for bwiize-proxy.
//!
//! Loads config from the first YAML file found on the bwiize search path
//! (`--config`, `./config.yaml`, `~/.config/bwiize/`, `/etc/bwiize/`).
//! Bearer tokens may also come from the environment so they stay out of
//! checked-in files.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TTS_TOKEN_ENV: &str = "BWIIZE_TTS_TOKEN";
pub const VIDEO_TOKEN_ENV: &str = "BWIIZE_VIDEO_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed browser origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            cors_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub endpoint: String,
    pub api_token: String,
    pub content_type: String,
    pub timeout_secs: u64,
    pub max_chars: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/espnet/kan-bayashi_ljspeech_vits"
                .into(),
            api_token: String::new(),
            content_type: "audio/flac".into(),
            timeout_secs: 60,
            max_chars: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enabled: bool,
    pub api_base: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://ws.api.video".into(),
            api_token: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tts: TtsConfig,
    pub video: VideoConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/bwiize/config.yaml
    /// 3. /etc/bwiize/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::load_file(path);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_file(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/bwiize/config.yaml")),
                Some(PathBuf::from("/etc/bwiize/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    /// Override tokens from the environment. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TTS_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.tts.api_token = token;
        }
        if let Some(token) = lookup(VIDEO_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.video.api_token = token;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
