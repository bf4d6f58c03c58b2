//! Configuration management.
//!
//! Config is stored at `~/.config/toolhub/config.toml` (or `--config <path>`)
//! and contains:
//! - server settings (bind address, database path, cron secret)
//! - the plan catalog and the daily limit table
//! - provider API keys and endpoints

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::quota::{LimitTable, LimitsConfig, PlanCatalog};
use crate::types::{ResetPolicy, Tier};

const CONFIG_DIR: &str = "toolhub";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolhubConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Shared secret the scheduler presents to trigger the daily reset.
    #[serde(default)]
    pub cron_secret: Option<String>,

    /// Whether counters from a previous day are ignored before the reset runs.
    #[serde(default)]
    pub reset_policy: ResetPolicy,

    /// Payment-provider plan id -> tier.
    #[serde(default = "default_plans")]
    pub plans: BTreeMap<String, Tier>,

    /// Feature -> tier -> daily limit. Must cover every combination.
    #[serde(default = "LimitTable::default_config")]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub providers: ProviderConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("toolhub.sqlite")
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_plans() -> BTreeMap<String, Tier> {
    BTreeMap::from([
        ("pro_monthly".to_string(), Tier::Pro),
        ("pro_yearly".to_string(), Tier::Pro),
        ("master_monthly".to_string(), Tier::Master),
        ("master_yearly".to_string(), Tier::Master),
    ])
}

impl Default for ToolhubConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            cron_secret: None,
            reset_policy: ResetPolicy::default(),
            plans: default_plans(),
            limits: LimitTable::default_config(),
            providers: ProviderConfig::default(),
        }
    }
}

/// Credentials and endpoints for the external APIs behind each tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Groq API key (chat and translation).
    #[serde(default)]
    pub groq_api_key: Option<String>,

    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// RapidAPI key shared by the detector, SEO and code execution APIs.
    #[serde(default)]
    pub rapidapi_key: Option<String>,

    #[serde(default = "default_detector_host")]
    pub detector_host: String,

    #[serde(default = "default_seo_host")]
    pub seo_host: String,

    #[serde(default = "default_judge0_host")]
    pub judge0_host: String,

    /// Override for the RapidAPI endpoints (scheme + host). Defaults to `https://{host}`.
    #[serde(default)]
    pub rapidapi_base_url: Option<String>,

    #[serde(default)]
    pub elevenlabs_api_key: Option<String>,

    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_speech_model")]
    pub speech_model: String,

    #[serde(default)]
    pub tinyurl_api_token: Option<String>,

    #[serde(default = "default_tinyurl_base_url")]
    pub tinyurl_base_url: String,

    /// Per-request timeout for every provider call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai".to_string()
}

fn default_chat_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_detector_host() -> String {
    "ai-content-detector-ai-gpt.p.rapidapi.com".to_string()
}

fn default_seo_host() -> String {
    "website-seo-analyzer.p.rapidapi.com".to_string()
}

fn default_judge0_host() -> String {
    "judge0-ce.p.rapidapi.com".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_speech_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_tinyurl_base_url() -> String {
    "https://api.tinyurl.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_base_url: default_groq_base_url(),
            chat_model: default_chat_model(),
            rapidapi_key: None,
            detector_host: default_detector_host(),
            seo_host: default_seo_host(),
            judge0_host: default_judge0_host(),
            rapidapi_base_url: None,
            elevenlabs_api_key: None,
            elevenlabs_base_url: default_elevenlabs_base_url(),
            voice_id: default_voice_id(),
            speech_model: default_speech_model(),
            tinyurl_api_token: None,
            tinyurl_base_url: default_tinyurl_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    /// Base URL for a RapidAPI-hosted service.
    pub fn rapidapi_url(&self, host: &str) -> String {
        self.rapidapi_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", host))
    }

    pub fn groq_api_key_secret(&self) -> Option<SecretString> {
        non_empty_secret(&self.groq_api_key)
    }

    pub fn rapidapi_key_secret(&self) -> Option<SecretString> {
        non_empty_secret(&self.rapidapi_key)
    }

    pub fn elevenlabs_api_key_secret(&self) -> Option<SecretString> {
        non_empty_secret(&self.elevenlabs_api_key)
    }

    pub fn tinyurl_api_token_secret(&self) -> Option<SecretString> {
        non_empty_secret(&self.tinyurl_api_token)
    }
}

fn non_empty_secret(value: &Option<String>) -> Option<SecretString> {
    value
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.clone()))
}

impl ToolhubConfig {
    /// Load config from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to `path`, or to the default location when `None`.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, content).context("Failed to write config file")
    }

    /// Validate the limit table. Every (feature, tier) pair must be present.
    pub fn limit_table(&self) -> Result<LimitTable> {
        LimitTable::from_config(&self.limits).context("Invalid [limits] configuration")
    }

    pub fn plan_catalog(&self) -> PlanCatalog {
        PlanCatalog::new(self.plans.clone())
    }

    pub fn cron_secret(&self) -> Option<SecretString> {
        non_empty_secret(&self.cron_secret)
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }
}
