use crate::error::{ImageGenError, Result};
use serde::{Deserialize, Deserializer};
use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api-inference.modelscope.cn/";
pub const DEFAULT_MODEL: &str = "MusePublic/489_ckpt_FLUX_1";
pub const DEFAULT_SIZE: &str = "1080x1920";
pub const DEFAULT_PROVIDER: &str = "ms";
pub const DEFAULT_INFERENCE_STEPS: &str = "30";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    ModelScope,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::ModelScope => "modelscope",
        }
    }
}

impl FromStr for Provider {
    type Err = ImageGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "modelscope" => Ok(Provider::ModelScope),
            other => Err(ImageGenError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static plugin configuration, read once when the client is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub size: String,
    pub api_url: String,
    pub provider: String,
    #[serde(deserialize_with = "string_or_number")]
    pub seed: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub num_inference_steps: Option<String>,
    pub max_poll_attempts: Option<u32>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        PluginConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            size: DEFAULT_SIZE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            seed: None,
            num_inference_steps: None,
            max_poll_attempts: None,
        }
    }
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `MS_AIIMG_*` variables, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        PluginConfig {
            api_key: env::var("MS_AIIMG_API_KEY").ok(),
            model: env::var("MS_AIIMG_MODEL").unwrap_or(defaults.model),
            size: env::var("MS_AIIMG_SIZE").unwrap_or(defaults.size),
            api_url: env::var("MS_AIIMG_API_URL").unwrap_or(defaults.api_url),
            provider: env::var("MS_AIIMG_PROVIDER").unwrap_or(defaults.provider),
            seed: env::var("MS_AIIMG_SEED").ok(),
            num_inference_steps: env::var("MS_AIIMG_NUM_INFERENCE_STEPS").ok(),
            max_poll_attempts: env::var("MS_AIIMG_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|v| parse_poll_attempts(&v)),
        }
    }

    /// Builds a config from the JSON object a host framework hands to the plugin.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ImageGenError::Config(e.to_string()))
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_num_inference_steps(mut self, steps: impl Into<String>) -> Self {
        self.num_inference_steps = Some(steps.into());
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = Some(attempts);
        self
    }

    /// Checks the fields without which no request can be made.
    pub fn validate(&self) -> Result<()> {
        match self.api_key.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ImageGenError::Config("api_key must be configured".into()))
            }
            Some(_) => {}
        }

        if self.api_url.trim().is_empty() {
            return Err(ImageGenError::Config("api_url must not be empty".into()));
        }

        if self.size.trim().is_empty() {
            return Err(ImageGenError::Config("size must not be empty".into()));
        }

        if self.model.trim().is_empty() {
            return Err(ImageGenError::Config("model must not be empty".into()));
        }

        if self.max_poll_attempts == Some(0) {
            return Err(ImageGenError::Config(
                "max_poll_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn provider(&self) -> Result<Provider> {
        self.provider.parse()
    }

    /// Base URL with exactly one trailing slash, so paths can be appended directly.
    pub fn base_url(&self) -> String {
        format!("{}/", self.api_url.trim().trim_end_matches('/'))
    }

    pub fn inference_steps(&self) -> &str {
        self.num_inference_steps
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_INFERENCE_STEPS)
    }
}

fn parse_poll_attempts(raw: &str) -> Option<u32> {
    match raw.trim().parse() {
        Ok(attempts) => Some(attempts),
        Err(_) => {
            log::warn!(
                "Unparsable MS_AIIMG_MAX_POLL_ATTEMPTS {:?}, polling without a limit",
                raw
            );
            None
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
