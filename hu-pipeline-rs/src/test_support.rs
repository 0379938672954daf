//! Test doubles shared by the unit tests of this crate

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use connector_sdk::azure_devops::{PatchOperation, WorkItem};
use connector_sdk::xray::{ImportReceipt, KeyRef, NameRef, XrayStep, XrayTest, XrayTestFields};
use connector_sdk::{CompletionProvider, CompletionRequest, ServiceError, TestImporter, WorkItemTracker};
use mockall::mock;
use serde_json::{json, Value};

mock! {
    pub Provider {}

    #[async_trait]
    impl CompletionProvider for Provider {
        async fn complete(&self, request: CompletionRequest) -> connector_sdk::Result<String>;
    }
}

mock! {
    pub Tracker {}

    #[async_trait]
    impl WorkItemTracker for Tracker {
        async fn query_work_item(&self, id: u64) -> connector_sdk::Result<Option<WorkItem>>;
        async fn get_work_item(&self, id: u64) -> connector_sdk::Result<WorkItem>;
        async fn patch_work_item(
            &self,
            id: u64,
            operations: &[PatchOperation],
        ) -> connector_sdk::Result<WorkItem>;
    }
}

mock! {
    pub Importer {}

    #[async_trait]
    impl TestImporter for Importer {
        async fn authenticate(&self) -> connector_sdk::Result<String>;
        async fn import_tests(
            &self,
            token: &str,
            tests: &[XrayTest],
            timeout: Duration,
        ) -> connector_sdk::Result<ImportReceipt>;
    }
}

/// Provider replaying queued answers in order and recording every request
#[derive(Default)]
pub struct ScriptedProvider {
    answers: Mutex<VecDeque<connector_sdk::Result<String>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(answers: Vec<connector_sdk::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].prompt.clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> connector_sdk::Result<String> {
        self.requests.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::internal("no scripted answer left")))
    }
}

pub fn work_item(id: u64, rev: u64, fields: Value) -> WorkItem {
    WorkItem {
        id,
        rev,
        fields: fields.as_object().cloned().unwrap_or_default(),
    }
}

/// A valid test object as the model would emit it
pub fn test_json(summary: &str) -> Value {
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
        "testPath": "placeholder"
    })
}

pub fn xray_test(summary: &str, path: &str) -> XrayTest {
    XrayTest {
        testtype: "Manual".to_string(),
        fields: XrayTestFields {
            summary: summary.to_string(),
            description: String::new(),
            project: KeyRef {
                key: "DEUN".to_string(),
            },
            issuetype: NameRef {
                name: "Test".to_string(),
            },
            ..Default::default()
        },
        steps: vec![XrayStep {
            action: "DADO".to_string(),
            data: String::new(),
            result: "ENTONCES".to_string(),
        }],
        test_path: path.to_string(),
        xray_test_sets: Vec::new(),
    }
}

/// Refined text long enough to pass the length floor, with labeled scenarios
pub fn refined_text() -> String {
    let mut text = String::from(
        "## EVALUACIÓN AUTOMÁTICA DE CRITICIDAD\n\
**PUNTUACIÓN TOTAL**: 18/25\n\n\
## HISTORIA DE USUARIO REFINADA\n\
**Como** usuario nuevo, **quiero** registrarme con Google, **para** acceder rápido.\n\n\
## CRITERIOS DE ACEPTACIÓN DETALLADOS\n\
### 1. Intención Macro\n\
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
**Entonces** ve un mensaje de error claro\n\
**ModoVerificación**: Manual\n\n\
## CONSIDERACIONES TÉCNICAS\n",
    );
    while text.len() < 1200 {
        text.push_str("- Registrar métricas de autenticación y tiempos de respuesta del proveedor.\n");
    }
    text
}
