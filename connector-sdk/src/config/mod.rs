//! Configuration management for service clients
//!
//! Keys are lower-case names such as `llm_api_key`. The environment provider
//! maps them to `REFINERY_LLM_API_KEY`; tests use the in-memory provider.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value
            .parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Non-negative integer value; missing, malformed, negative or
    /// out-of-range values yield `default`
    fn get_count_or<T>(&self, key: &str, default: T) -> T
    where
        T: TryFrom<i64>,
    {
        self.get_int(key)
            .ok()
            .and_then(|value| T::try_from(value).ok())
            .unwrap_or(default)
    }

    /// Get a float configuration value with a default
    fn get_float_or(&self, key: &str, default: f64) -> f64 {
        self.get_float(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    fn validate(&self) -> Result<()>;
}

/// Configuration for the OpenAI-compatible completion API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,

    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sent as `HTTP-Referer`
    pub referer: String,

    /// Sent as `X-Title`
    pub app_title: String,

    /// Default timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "mistralai/mistral-small-3.2-24b-instruct".to_string(),
            referer: "https://blackbird-labs.com".to_string(),
            app_title: "HU Refinery".to_string(),
            timeout_seconds: 90,
        }
    }
}

impl LlmConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            api_key: provider.get_string("llm_api_key")?,
            base_url: provider.get_string_or("llm_base_url", &defaults.base_url),
            model: provider.get_string_or("llm_model", &defaults.model),
            referer: provider.get_string_or("llm_referer", &defaults.referer),
            app_title: provider.get_string_or("llm_app_title", &defaults.app_title),
            timeout_seconds: provider.get_count_or("llm_timeout_seconds", defaults.timeout_seconds),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for LlmConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("LLM API key is required"));
        }

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("LLM base URL is required"));
        }

        if self.model.is_empty() {
            return Err(ServiceError::configuration("LLM model is required"));
        }

        Ok(())
    }
}

/// Configuration for the Azure DevOps work item API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDevOpsConfig {
    /// Personal access token
    pub token: String,

    /// Organization name
    pub organization: String,

    /// Project name (may contain spaces)
    pub project: String,

    /// Base URL of the service
    pub base_url: String,

    /// REST API version
    pub api_version: String,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            organization: String::new(),
            project: String::new(),
            base_url: "https://dev.azure.com".to_string(),
            api_version: "7.1".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl AzureDevOpsConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            token: provider.get_string("azure_devops_token")?,
            organization: provider.get_string("azure_org")?,
            project: provider.get_string("azure_project")?,
            base_url: provider.get_string_or("azure_base_url", &defaults.base_url),
            api_version: provider.get_string_or("azure_api_version", &defaults.api_version),
            timeout_seconds: provider.get_count_or("azure_timeout_seconds", defaults.timeout_seconds),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for AzureDevOpsConfig {
    fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(ServiceError::configuration("Azure DevOps token is required"));
        }

        if self.organization.is_empty() || self.project.is_empty() {
            return Err(ServiceError::configuration(
                "Azure DevOps organization and project are required",
            ));
        }

        Ok(())
    }
}

/// Configuration for the XRay cloud API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrayConfig {
    /// API client id
    pub client_id: String,

    /// API client secret
    pub client_secret: String,

    /// Token endpoint
    pub auth_url: String,

    /// Bulk test import endpoint
    pub import_url: String,

    /// Timeout for token requests in seconds
    pub auth_timeout_seconds: u64,
}

impl Default for XrayConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: "https://xray.cloud.getxray.app/api/v2/authenticate".to_string(),
            import_url: "https://xray.cloud.getxray.app/api/v2/import/test/bulk".to_string(),
            auth_timeout_seconds: 30,
        }
    }
}

impl XrayConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            client_id: provider.get_string("xray_client_id")?,
            client_secret: provider.get_string("xray_client_secret")?,
            auth_url: provider.get_string_or("xray_auth_url", &defaults.auth_url),
            import_url: provider.get_string_or("xray_import_url", &defaults.import_url),
            auth_timeout_seconds: provider
                .get_count_or("xray_auth_timeout_seconds", defaults.auth_timeout_seconds),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for XrayConfig {
    fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ServiceError::configuration("XRay client id and secret are required"));
        }

        if self.auth_url.is_empty() || self.import_url.is_empty() {
            return Err(ServiceError::configuration("XRay auth and import URLs are required"));
        }

        Ok(())
    }
}
