//! Configuration for Sambaverse and SambaStudio completions
//!
//! Configs are plain serde structs. Empty fields can be filled from the
//! environment with `resolve_env`; explicit values always win.

use serde::{Deserialize, Serialize};
use log::debug;

use crate::error::Error;
use crate::params::TuningOptions;

pub const DEFAULT_SAMBAVERSE_URL: &str = "https://sambaverse.sambanova.ai";

pub const SAMBAVERSE_URL_ENV: &str = "SAMBAVERSE_URL";
pub const SAMBAVERSE_API_KEY_ENV: &str = "SAMBAVERSE_API_KEY";
pub const SAMBAVERSE_MODEL_NAME_ENV: &str = "SAMBAVERSE_MODEL_NAME";

pub const SAMBASTUDIO_BASE_URL_ENV: &str = "SAMBASTUDIO_BASE_URL";
pub const SAMBASTUDIO_PROJECT_ID_ENV: &str = "SAMBASTUDIO_PROJECT_ID";
pub const SAMBASTUDIO_ENDPOINT_ID_ENV: &str = "SAMBASTUDIO_ENDPOINT_ID";
pub const SAMBASTUDIO_API_KEY_ENV: &str = "SAMBASTUDIO_API_KEY";

/// Settings shared by both backends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings
{   /// Default model options sent with every request
    pub model_kwargs: Option<TuningOptions>
  , /// Stream the response instead of one batch call
    pub streaming: bool
  , /// Request timeout in seconds
    pub timeout_secs: Option<u64>
}

/// Sambaverse configuration
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SambaverseConfig
{   pub url: String
  , pub api_key: String
  , pub model_name: String
  , #[serde(flatten)]
    pub settings: CompletionSettings
}

/// SambaStudio configuration
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SambaStudioConfig
{   pub base_url: String
  , pub project_id: String
  , pub endpoint_id: String
  , pub api_key: String
  , #[serde(flatten)]
    pub settings: CompletionSettings
}

/// Explicit non-empty value, else the environment variable, else `default`
pub fn get_from_env_or(
  explicit: &str
, env_var: &str
, default: Option<&str>
) -> Option<String>
{   if !explicit.is_empty()
    {   return Some(explicit.to_string());
    }
    match std::env::var(env_var)
    {   Ok(value) if !value.is_empty() => {
          debug!("Using {} from environment", env_var);
          Some(value)
        }
      , _ => default.map(str::to_string)
    }
}

/// Fail with a configuration error naming `field` and its env var
pub(crate) fn require(field: &str, value: &str, env_var: &str) -> Result<(), Error>
{   if value.trim().is_empty()
    {   return Err(Error::InvalidConfiguration(format!(
          "{} is empty; pass it explicitly or set {}", field, env_var
        )));
    }
    Ok(())
}

impl SambaverseConfig
{   pub fn new(
      api_key: impl Into<String>
    , model_name: impl Into<String>
    ) -> Self
    {   SambaverseConfig
        {   url: DEFAULT_SAMBAVERSE_URL.to_string()
          , api_key: api_key.into()
          , model_name: model_name.into()
          , settings: CompletionSettings::default()
        }
    }

    /// Everything from the environment
    pub fn from_env() -> Result<Self, Error>
    {   SambaverseConfig::default().resolve_env()
    }

    /// Fill empty fields from the environment, then validate
    pub fn resolve_env(mut self) -> Result<Self, Error>
    {   self.url = get_from_env_or(
            &self.url
          , SAMBAVERSE_URL_ENV
          , Some(DEFAULT_SAMBAVERSE_URL)
          )
          .unwrap_or_default();
        self.api_key = get_from_env_or(&self.api_key, SAMBAVERSE_API_KEY_ENV, None)
          .unwrap_or_default();
        self.model_name = get_from_env_or(
            &self.model_name
          , SAMBAVERSE_MODEL_NAME_ENV
          , None
          )
          .unwrap_or_default();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error>
    {   require("sambaverse_url", &self.url, SAMBAVERSE_URL_ENV)?;
        if self.api_key.trim().is_empty()
        {   return Err(Error::MissingApiKey(format!(
              "Sambaverse (set {})", SAMBAVERSE_API_KEY_ENV
            )));
        }
        require("sambaverse_model_name", &self.model_name, SAMBAVERSE_MODEL_NAME_ENV)
    }

    pub fn with_model_kwargs(mut self, model_kwargs: TuningOptions) -> Self
    {   self.settings.model_kwargs = Some(model_kwargs);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self
    {   self.settings.streaming = streaming;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self
    {   self.settings.timeout_secs = Some(timeout_secs);
        self
    }
}

impl SambaStudioConfig
{   pub fn new(
      base_url: impl Into<String>
    , project_id: impl Into<String>
    , endpoint_id: impl Into<String>
    , api_key: impl Into<String>
    ) -> Self
    {   SambaStudioConfig
        {   base_url: base_url.into()
          , project_id: project_id.into()
          , endpoint_id: endpoint_id.into()
          , api_key: api_key.into()
          , settings: CompletionSettings::default()
        }
    }

    /// Everything from the environment
    pub fn from_env() -> Result<Self, Error>
    {   SambaStudioConfig::default().resolve_env()
    }

    /// Fill empty fields from the environment, then validate
    pub fn resolve_env(mut self) -> Result<Self, Error>
    {   self.base_url = get_from_env_or(&self.base_url, SAMBASTUDIO_BASE_URL_ENV, None)
          .unwrap_or_default();
        self.project_id = get_from_env_or(
            &self.project_id
          , SAMBASTUDIO_PROJECT_ID_ENV
          , None
          )
          .unwrap_or_default();
        self.endpoint_id = get_from_env_or(
            &self.endpoint_id
          , SAMBASTUDIO_ENDPOINT_ID_ENV
          , None
          )
          .unwrap_or_default();
        self.api_key = get_from_env_or(&self.api_key, SAMBASTUDIO_API_KEY_ENV, None)
          .unwrap_or_default();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error>
    {   require("sambastudio_base_url", &self.base_url, SAMBASTUDIO_BASE_URL_ENV)?;
        require(
          "sambastudio_project_id"
        , &self.project_id
        , SAMBASTUDIO_PROJECT_ID_ENV
        )?;
        require(
          "sambastudio_endpoint_id"
        , &self.endpoint_id
        , SAMBASTUDIO_ENDPOINT_ID_ENV
        )?;
        if self.api_key.trim().is_empty()
        {   return Err(Error::MissingApiKey(format!(
              "SambaStudio (set {})", SAMBASTUDIO_API_KEY_ENV
            )));
        }
        Ok(())
    }

    pub fn with_model_kwargs(mut self, model_kwargs: TuningOptions) -> Self
    {   self.settings.model_kwargs = Some(model_kwargs);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self
    {   self.settings.streaming = streaming;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self
    {   self.settings.timeout_secs = Some(timeout_secs);
        self
    }
}

impl std::fmt::Debug for SambaverseConfig
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("SambaverseConfig")
          .field("url", &self.url)
          .field("api_key", &"***")
          .field("model_name", &self.model_name)
          .field("settings", &self.settings)
          .finish()
    }
}

impl std::fmt::Debug for SambaStudioConfig
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("SambaStudioConfig")
          .field("base_url", &self.base_url)
          .field("project_id", &self.project_id)
          .field("endpoint_id", &self.endpoint_id)
          .field("api_key", &"***")
          .field("settings", &self.settings)
          .finish()
    }
}
