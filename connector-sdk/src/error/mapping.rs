//! Error mapping for service-specific APIs
//!
//! One function per upstream API turns a failed response into a
//! `ServiceError`. Retry decisions are made on the resulting variant.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Marker the test system puts in a 400 body when an earlier import job is still running
const IMPORT_IN_PROGRESS_MARKER: &str = "already in progress";

/// Map an OpenAI-compatible chat-completions error to a ServiceError
pub fn map_openrouter_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "openrouter".to_string();

    let error = json.get("error").unwrap_or(json);

    if let Some(code) = error.get("code") {
        let code = match code {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        context.error_code = Some(code);
    }

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown completion API error");

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        _ => ServiceError::upstream(status.as_u16(), message),
    }
}

/// Map an Azure DevOps REST error to a ServiceError
pub fn map_azure_devops_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "azure_devops".to_string();

    if let Some(type_key) = json.get("typeKey").and_then(|t| t.as_str()) {
        context.error_code = Some(type_key.to_string());
    }

    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown Azure DevOps error");

    match status {
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ServiceError::conflict(message),
        _ => ServiceError::upstream(status.as_u16(), message),
    }
}

/// Classify a failed XRay import response.
///
/// This is the only place that inspects the body text of an import
/// rejection: a 400 carrying the in-progress marker becomes
/// `ImportInProgress`, any other 400 is a terminal `Validation` error,
/// and everything else is an `Upstream` error carrying the status.
pub fn classify_import_rejection(status: StatusCode, body: &str) -> ServiceError {
    if status == StatusCode::BAD_REQUEST {
        if body.to_lowercase().contains(IMPORT_IN_PROGRESS_MARKER) {
            return ServiceError::import_in_progress(extract_message(body));
        }
        return ServiceError::validation(extract_message(body));
    }

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(extract_message(body)),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(extract_message(body)),
        _ => ServiceError::upstream(status.as_u16(), extract_message(body)),
    }
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match context.service.as_str() {
            "openrouter" => return map_openrouter_error(status, &json, context),
            "azure_devops" => return map_azure_devops_error(status, &json, context),
            "xray" => return classify_import_rejection(status, body),
            _ => {}
        }
    } else if context.service == "xray" {
        return classify_import_rejection(status, body);
    }

    let message = extract_message(body);
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        _ => ServiceError::upstream(status.as_u16(), message),
    }
}

/// Pull a readable message out of an error body, JSON or not
fn extract_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = json
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
            .or_else(|| json.get("message").and_then(|m| m.as_str()));
        if let Some(message) = message {
            return message.to_string();
        }
    }

    if body.is_empty() {
        "empty response body".to_string()
    } else {
        crate::util::truncate_string(body, 200)
    }
}
