//! XRay cloud client
//!
//! Token acquisition from client credentials and bulk test import.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::XrayConfig;
use crate::core::{ClientBuilder, TestImporter};
use crate::error::{ErrorContext, Result, ServiceError};
use crate::services::common::{parse_error_response, UserAgent};

const SERVICE_NAME: &str = "xray";

/// XRay cloud API client
pub struct XrayClient {
    http_client: Client,
    config: XrayConfig,
}

impl XrayClient {
    /// Create a client from explicit configuration
    pub fn new_with_config(config: XrayConfig) -> Result<Self> {
        crate::config::ServiceConfig::validate(&config)?;

        let http_client = ClientBuilder::new()
            .user_agent(UserAgent::for_client("xray").to_string())
            .timeout(Duration::from_secs(config.auth_timeout_seconds))
            .build_http_client()?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

/// The token endpoint answers either a bare JSON string or an object
fn extract_token(body: &Value) -> Option<String> {
    match body {
        Value::String(token) if !token.is_empty() => Some(token.clone()),
        Value::Object(map) => ["access_token", "token", "jwt"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .filter(|token| !token.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl TestImporter for XrayClient {
    async fn authenticate(&self) -> Result<String> {
        debug!("Requesting {} token", SERVICE_NAME);
        let response = self
            .http_client
            .post(&self.config.auth_url)
            .json(&json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let context = ErrorContext::for_service(SERVICE_NAME)
                .endpoint("authenticate")
                .status_code(status.as_u16());
            let body = response.text().await.unwrap_or_default();
            warn!("{} authentication rejected with {}", SERVICE_NAME, status);
            return Err(ServiceError::authentication(format!(
                "token request rejected ({}): {}",
                status,
                crate::util::truncate_string(&body, 200)
            ))
            .with_context(context));
        }

        let body: Value = response.json().await?;
        extract_token(&body).ok_or_else(|| {
            ServiceError::authentication("token response did not contain a token")
                .with_context(ErrorContext::for_service(SERVICE_NAME).endpoint("authenticate"))
        })
    }

    async fn import_tests(
        &self,
        token: &str,
        tests: &[XrayTest],
        timeout: Duration,
    ) -> Result<ImportReceipt> {
        debug!("Importing {} test(s) into {}", tests.len(), SERVICE_NAME);
        let response = self
            .http_client
            .post(&self.config.import_url)
            .bearer_auth(token)
            .timeout(timeout)
            .json(tests)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(parse_error_response(SERVICE_NAME, "import/test/bulk", response).await);
        }

        let body = response.text().await?;
        let raw = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        Ok(ImportReceipt::from_body(raw))
    }
}
