//! Shared fixtures for the end-to-end tests
//!
//! The tracker and the test system are wiremock servers reached through the
//! real HTTP clients; the language model is a scripted provider.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use connector_sdk::config::MemoryConfigProvider;
use connector_sdk::{CompletionProvider, CompletionRequest, ServiceError};
use hu_pipeline::models::{Project, TestSystemCredentials, TrackerCredentials};
use hu_pipeline::{
    HttpConnectorFactory, InMemoryProjectStore, InMemoryTicketStore, PipelineCoordinator,
    PipelineSettings, ProjectStore,
};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const OWNER: &str = "qa-lead";
pub const ITEMS_PATH: &str = "/blackbird/Dropshipping/_apis/wit/workitems";
pub const AUTH_PATH: &str = "/api/v2/authenticate";
pub const IMPORT_PATH: &str = "/api/v2/import/test/bulk";

/// Completion provider answering from a queue
#[derive(Default)]
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<String, ServiceError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(answers: Vec<Result<String, ServiceError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> connector_sdk::Result<String> {
        self.prompts.lock().unwrap().push(request.prompt);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::network("model unavailable")))
    }
}

/// Tracker, test system and stores for one test
pub struct Harness {
    pub tracker: MockServer,
    pub test_system: MockServer,
    pub tickets: Arc<InMemoryTicketStore>,
    pub projects: InMemoryProjectStore,
}

impl Harness {
    pub async fn start() -> Self {
        let projects = InMemoryProjectStore::new();
        let mut project = Project::new(
            OWNER,
            "Dropshipping",
            TrackerCredentials {
                token: "pat-token".to_string(),
                organization: "blackbird".to_string(),
                project: "Dropshipping".to_string(),
            },
            TestSystemCredentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            },
        );
        project.is_active = true;
        projects.insert(project).await.unwrap();

        Self {
            tracker: MockServer::start().await,
            test_system: MockServer::start().await,
            tickets: Arc::new(InMemoryTicketStore::new()),
            projects,
        }
    }

    pub async fn pipeline(&self, model: Arc<ScriptedModel>) -> PipelineCoordinator {
        let mut endpoints = MemoryConfigProvider::new();
        endpoints.set("azure_base_url", self.tracker.uri());
        endpoints.set("xray_auth_url", format!("{}{}", self.test_system.uri(), AUTH_PATH));
        endpoints.set("xray_import_url", format!("{}{}", self.test_system.uri(), IMPORT_PATH));

        PipelineCoordinator::for_active_project(
            OWNER,
            &self.projects,
            self.tickets.clone(),
            &HttpConnectorFactory::from_provider(&endpoints),
            model,
            &PipelineSettings::fast(),
        )
        .await
        .unwrap()
    }
}

/// Batch answer of the work-item query endpoint
pub fn work_item_batch(id: u64, rev: u64, fields: Value) -> Value {
    json!({ "count": 1, "value": [{ "id": id, "rev": rev, "fields": fields }] })
}

pub fn work_item(id: u64, rev: u64) -> Value {
    json!({ "id": id, "rev": rev, "fields": {} })
}

/// One test object as the model writes it
pub fn generated_test(summary: &str) -> Value {
    json!({
        "testtype": "Manual",
        "fields": {
            "summary": summary,
            "description": format!("Verifica {}", summary),
            "project": { "key": "DEUN" },
            "issuetype": { "name": "Test" }
        },
        "steps": [
            { "action": "DADO que el usuario abre la app", "data": "", "result": "ENTONCES ve el inicio" }
        ],
        "testPath": "DEUN"
    })
}

/// Refined story above the length floor, with one scenario per tier
pub fn refined_story() -> String {
    let mut text = String::from(
        "## HISTORIA DE USUARIO REFINADA\n\
**Como** usuario nuevo, **quiero** registrarme con Google, **para** acceder rápido.\n\n\
## CRITERIOS DE ACEPTACIÓN DETALLADOS\n\
**Escenario Principal**: Registro exitoso con Google\n\
**Dado** que el usuario tiene cuenta de Google\n\
**Cuando** autoriza el acceso\n\
**Entonces** entra al dashboard\n\
**Escenario Alternativo**: Usuario ya registrado\n\
**Dado** que el correo ya existe\n\
**Cuando** inicia sesión con Google\n\
**Entonces** se vincula la cuenta existente\n\
**Escenario Edge**: Google no responde\n\
**Dado** que el proveedor está caído\n\
**Cuando** el usuario intenta autenticarse\n\
**Entonces** ve un mensaje de error claro\n\n\
## CONSIDERACIONES TÉCNICAS\n",
    );
    while text.len() < 1200 {
        text.push_str("- Registrar métricas de autenticación y tiempos de respuesta del proveedor.\n");
    }
    text
}
