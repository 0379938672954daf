//! Project-scoped connector construction
//!
//! Clients are never global: every operation builds its tracker and test
//! system clients from the credentials of the active project.

use std::sync::Arc;

use connector_sdk::azure_devops::AzureDevOpsClient;
use connector_sdk::config::{AzureDevOpsConfig, XrayConfig};
use connector_sdk::xray::XrayClient;
use connector_sdk::{ConfigProvider, ConfigProviderExt, TestImporter, WorkItemTracker};

use crate::error::Result;
use crate::models::Project;

/// Clients for one project
#[derive(Clone)]
pub struct Connectors {
    pub tracker: Arc<dyn WorkItemTracker>,
    pub importer: Arc<dyn TestImporter>,
}

pub trait ConnectorFactory: Send + Sync {
    fn connect(&self, project: &Project) -> Result<Connectors>;
}

/// Builds the HTTP clients from project credentials plus endpoint settings
#[derive(Debug, Clone, Default)]
pub struct HttpConnectorFactory {
    tracker_defaults: AzureDevOpsConfig,
    test_system_defaults: XrayConfig,
}

impl HttpConnectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint and timeout overrides; credentials always come from the project
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        let azure = AzureDevOpsConfig::default();
        let xray = XrayConfig::default();

        Self {
            tracker_defaults: AzureDevOpsConfig {
                base_url: provider.get_string_or("azure_base_url", &azure.base_url),
                api_version: provider.get_string_or("azure_api_version", &azure.api_version),
                timeout_seconds: provider.get_count_or("azure_timeout_seconds", azure.timeout_seconds),
                ..azure
            },
            test_system_defaults: XrayConfig {
                auth_url: provider.get_string_or("xray_auth_url", &xray.auth_url),
                import_url: provider.get_string_or("xray_import_url", &xray.import_url),
                auth_timeout_seconds: provider
                    .get_count_or("xray_auth_timeout_seconds", xray.auth_timeout_seconds),
                ..xray
            },
        }
    }

    pub fn tracker_config(&self, project: &Project) -> AzureDevOpsConfig {
        AzureDevOpsConfig {
            token: project.tracker.token.clone(),
            organization: project.tracker.organization.clone(),
            project: project.tracker.project.clone(),
            ..self.tracker_defaults.clone()
        }
    }

    pub fn test_system_config(&self, project: &Project) -> XrayConfig {
        XrayConfig {
            client_id: project.test_system.client_id.clone(),
            client_secret: project.test_system.client_secret.clone(),
            ..self.test_system_defaults.clone()
        }
    }
}

impl ConnectorFactory for HttpConnectorFactory {
    fn connect(&self, project: &Project) -> Result<Connectors> {
        let tracker = AzureDevOpsClient::new_with_config(self.tracker_config(project))?;
        let importer = XrayClient::new_with_config(self.test_system_config(project))?;

        Ok(Connectors {
            tracker: Arc::new(tracker),
            importer: Arc::new(importer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{TestSystemCredentials, TrackerCredentials};
    use connector_sdk::config::MemoryConfigProvider;

    fn project(token: &str) -> Project {
        Project::new(
            "owner-1",
            "Dropshipping",
            TrackerCredentials {
                token: token.to_string(),
                organization: "blackbird".to_string(),
                project: "DeUna Dropshipping".to_string(),
            },
            TestSystemCredentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            },
        )
    }

    #[test]
    fn test_configs_combine_credentials_and_endpoints() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("azure_base_url", "http://localhost:9000");
        provider.set("xray_import_url", "http://localhost:9001/import");

        let factory = HttpConnectorFactory::from_provider(&provider);
        let tracker = factory.tracker_config(&project("pat"));
        assert_eq!(tracker.base_url, "http://localhost:9000");
        assert_eq!(tracker.project, "DeUna Dropshipping");
        assert_eq!(tracker.api_version, "7.1");

        let xray = factory.test_system_config(&project("pat"));
        assert_eq!(xray.import_url, "http://localhost:9001/import");
        assert_eq!(xray.client_secret, "secret");
    }

    #[test]
    fn test_negative_timeouts_keep_defaults() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("azure_timeout_seconds", "-1");
        provider.set("xray_auth_timeout_seconds", "-30");

        let factory = HttpConnectorFactory::from_provider(&provider);
        assert_eq!(factory.tracker_config(&project("pat")).timeout_seconds, 30);
        assert_eq!(factory.test_system_config(&project("pat")).auth_timeout_seconds, 30);
    }

    #[test]
    fn test_connect_validates_credentials() {
        let factory = HttpConnectorFactory::new();
        assert!(factory.connect(&project("pat")).is_ok());

        let err = factory.connect(&project("")).err().unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
