//! Feature and module resolution from tracker fields

use connector_sdk::azure_devops::fields;
use serde_json::{Map, Value};

pub const NO_FEATURE: &str = "Sin Feature";
pub const NO_MODULE: &str = "Sin Módulo";

/// Feature and module tags of a work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    pub feature: String,
    pub module: String,
}

/// Resolve feature and module from a work item's fields.
///
/// Sources in order of precedence: the area path, then `feature:`/`module:`
/// tags, then the value area for the module. Unresolved halves get the
/// "Sin Feature" / "Sin Módulo" sentinels.
pub fn resolve_feature_module(item_fields: &Map<String, Value>) -> Taxonomy {
    let text = |name: &str| {
        item_fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let mut feature: Option<String> = None;
    let mut module: Option<String> = None;

    if let Some(area_path) = text(fields::AREA_PATH) {
        let parts: Vec<&str> = area_path
            .split('\\')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() >= 2 {
            module = Some(parts[1].to_string());
            feature = Some(parts.get(2).unwrap_or(&parts[1]).to_string());
        }
    }

    if feature.is_none() {
        if let Some(tags) = text(fields::TAGS) {
            for tag in tags.split(';').map(str::trim) {
                let lower = tag.to_lowercase();
                let value = tag.splitn(2, ':').nth(1).map(str::trim).filter(|v| !v.is_empty());

                let Some(value) = value else { continue };

                if lower.starts_with("feature") && feature.is_none() {
                    feature = Some(value.to_string());
                } else if (lower.starts_with("module") || lower.starts_with("módulo")) && module.is_none() {
                    module = Some(value.to_string());
                }
            }
        }
    }

    if module.is_none() {
        module = text(fields::VALUE_AREA).map(str::to_string);
    }

    Taxonomy {
        feature: feature.unwrap_or_else(|| NO_FEATURE.to_string()),
        module: module.unwrap_or_else(|| NO_MODULE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_area_path_segments() {
        let t = resolve_feature_module(&map(json!({
            "System.AreaPath": "DeUna\\Auth\\Login Social"
        })));
        assert_eq!(t.module, "Auth");
        assert_eq!(t.feature, "Login Social");

        let t = resolve_feature_module(&map(json!({ "System.AreaPath": "DeUna\\Pagos" })));
        assert_eq!(t.module, "Pagos");
        assert_eq!(t.feature, "Pagos");
    }

    #[test]
    fn test_area_path_wins_over_tags() {
        let t = resolve_feature_module(&map(json!({
            "System.AreaPath": "DeUna\\Auth\\Login Social",
            "System.Tags": "feature: Otro; module: Otro"
        })));
        assert_eq!(t.feature, "Login Social");
        assert_eq!(t.module, "Auth");
    }

    #[test]
    fn test_tags_fill_only_missing_fields() {
        let t = resolve_feature_module(&map(json!({
            "System.AreaPath": "DeUna",
            "System.Tags": "urgent; Feature: Checkout; Módulo: Pagos"
        })));
        assert_eq!(t.feature, "Checkout");
        assert_eq!(t.module, "Pagos");
    }

    #[test]
    fn test_value_area_and_sentinels() {
        let t = resolve_feature_module(&map(json!({
            "Microsoft.VSTS.Common.ValueArea": "Business"
        })));
        assert_eq!(t.feature, NO_FEATURE);
        assert_eq!(t.module, "Business");

        let t = resolve_feature_module(&Map::new());
        assert_eq!(t.feature, NO_FEATURE);
        assert_eq!(t.module, NO_MODULE);
    }
}
