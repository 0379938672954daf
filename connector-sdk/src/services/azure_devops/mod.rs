//! Azure DevOps work item client
//!
//! Reads work items and applies JSON-patch documents guarded by a revision
//! test. Organization and project are percent-encoded path segments, since
//! project names routinely contain spaces.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::config::AzureDevOpsConfig;
use crate::core::{ClientBuilder, WorkItemTracker};
use crate::error::{ErrorContext, Result, ServiceError};
use crate::services::common::{parse_error_response, UserAgent};

const SERVICE_NAME: &str = "azure_devops";

/// Azure DevOps REST client scoped to one organization and project
pub struct AzureDevOpsClient {
    http_client: Client,
    config: AzureDevOpsConfig,
}

impl AzureDevOpsClient {
    /// Create a client from explicit configuration
    pub fn new_with_config(config: AzureDevOpsConfig) -> Result<Self> {
        crate::config::ServiceConfig::validate(&config)?;

        let http_client = ClientBuilder::new()
            .auth_token(config.token.clone())
            .auth_type("Bearer")
            .header(ACCEPT.as_str(), "application/json")
            .user_agent(UserAgent::for_client("azure-devops").to_string())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build_http_client()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// `{base}/{org}/{project}/_apis/wit/workitems[/{id}]`
    fn work_items_url(&self, id: Option<u64>) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ServiceError::configuration(format!("Invalid Azure DevOps base URL: {}", e)))?;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ServiceError::configuration("Azure DevOps base URL cannot carry a path")
            })?;
            segments
                .pop_if_empty()
                .push(&self.config.organization)
                .push(&self.config.project)
                .push("_apis")
                .push("wit")
                .push("workitems");
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }

        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(SERVICE_NAME, endpoint, response).await);
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            ServiceError::parsing(format!("Unexpected work item payload: {}", e)).with_context(
                ErrorContext::for_service(SERVICE_NAME)
                    .endpoint(endpoint)
                    .status_code(status.as_u16()),
            )
        })
    }
}

#[async_trait]
impl WorkItemTracker for AzureDevOpsClient {
    async fn query_work_item(&self, id: u64) -> Result<Option<WorkItem>> {
        let mut url = self.work_items_url(None)?;
        url.query_pairs_mut()
            .append_pair("ids", &id.to_string())
            .append_pair("$expand", "all");
        debug!("Fetching work item {} from {}", id, SERVICE_NAME);

        let response = self.http_client.get(url).send().await?;
        let batch: WorkItemBatch = self.read_json("workitems?ids", response).await?;
        Ok(batch.value.into_iter().next())
    }

    async fn get_work_item(&self, id: u64) -> Result<WorkItem> {
        let url = self.work_items_url(Some(id))?;
        let response = self.http_client.get(url).send().await?;
        self.read_json("workitems/{id}", response).await
    }

    async fn patch_work_item(&self, id: u64, operations: &[PatchOperation]) -> Result<WorkItem> {
        let url = self.work_items_url(Some(id))?;
        let body = serde_json::to_vec(operations)?;
        debug!(
            "Patching work item {} with {} operation(s)",
            id,
            operations.len()
        );

        let response = self
            .http_client
            .patch(url)
            .header(CONTENT_TYPE, "application/json-patch+json")
            .body(body)
            .send()
            .await?;
        self.read_json("workitems/{id} PATCH", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AzureDevOpsConfig {
        AzureDevOpsConfig {
            token: "pat".to_string(),
            organization: "blackbird-labs-org".to_string(),
            project: "DeUna Dropshipping".to_string(),
            ..AzureDevOpsConfig::default()
        }
    }

    #[test]
    fn test_project_name_is_percent_encoded() {
        let client = AzureDevOpsClient::new_with_config(config()).unwrap();
        let url = client.work_items_url(Some(129)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/blackbird-labs-org/DeUna%20Dropshipping/_apis/wit/workitems/129?api-version=7.1"
        );
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let config = AzureDevOpsConfig {
            token: String::new(),
            ..config()
        };
        assert!(matches!(
            AzureDevOpsClient::new_with_config(config),
            Err(ServiceError::Configuration(_))
        ));
    }
}
