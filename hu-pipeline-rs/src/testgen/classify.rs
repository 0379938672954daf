//! Classification of generator output into tiers
//!
//! Accepts either an object keyed by tier or a flat list, stamps every test
//! with its tier folder and validates it. Every failure is a
//! `ServiceError::Parsing` so the attempt loop treats it like any other bad
//! answer.

use connector_sdk::util::{extract_json_fragment, strip_code_fences};
use connector_sdk::xray::XrayTest;
use connector_sdk::{Result, ServiceError};
use serde_json::{Map, Value};

use crate::models::{Bucket, ClassifiedTestSuite};

/// Keys every generated test object must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["testtype", "fields", "steps", "testPath"];

/// Folder for `bucket` under `target_path`
pub fn bucket_path(target_path: &str, bucket: Bucket) -> String {
    format!("{}/{}", target_path.trim_end_matches('/'), bucket.path_suffix())
}

/// Sizes of the positional split of a flat list of `n` tests
pub fn positional_split(n: usize) -> [usize; 3] {
    let first = n / 3;
    let second = 2 * n / 3;
    [first, second - first, n - second]
}

fn parse_answer(answer: &str) -> Result<Value> {
    let body = strip_code_fences(answer);

    serde_json::from_str::<Value>(body)
        .ok()
        .or_else(|| {
            extract_json_fragment(body, '{', '}').and_then(|f| serde_json::from_str(f).ok())
        })
        .or_else(|| {
            extract_json_fragment(body, '[', ']').and_then(|f| serde_json::from_str(f).ok())
        })
        .ok_or_else(|| ServiceError::parsing("generator answer is not JSON"))
}

/// Items per tier, in tier order
fn tiers(value: Value) -> Result<[Vec<Value>; 3]> {
    match value {
        Value::Array(mut items) => {
            let [first, second, _] = positional_split(items.len());
            let optional = items.split_off(first + second);
            let important = items.split_off(first);
            Ok([items, important, optional])
        }
        Value::Object(map) => Ok(Bucket::ALL.map(|bucket| tier_from_object(&map, bucket))),
        other => Err(ServiceError::parsing(format!(
            "generator answer must be an object or a list, got {}",
            json_kind(&other)
        ))),
    }
}

/// First accepted key holding a list; missing or non-list values count as empty
fn tier_from_object(map: &Map<String, Value>, bucket: Bucket) -> Vec<Value> {
    bucket
        .keys()
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn into_test(item: Value, path: &str, bucket: Bucket, position: usize) -> Result<XrayTest> {
    let Value::Object(mut object) = item else {
        return Err(ServiceError::parsing(format!(
            "{} test #{} is not an object",
            bucket,
            position + 1
        )));
    };

    object.insert("testPath".to_string(), Value::String(path.to_string()));

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|field| !object.contains_key(**field)) {
        return Err(ServiceError::parsing(format!(
            "{} test #{} lacks required field '{}'",
            bucket,
            position + 1,
            missing
        )));
    }

    serde_json::from_value(Value::Object(object)).map_err(|e| {
        ServiceError::parsing(format!("{} test #{} is malformed: {}", bucket, position + 1, e))
    })
}

/// Classify a raw generator answer into a suite filed under `target_path`
pub fn classify_answer(answer: &str, target_path: &str) -> Result<ClassifiedTestSuite> {
    let value = parse_answer(answer)?;
    let mut suite = ClassifiedTestSuite::default();

    for (bucket, items) in Bucket::ALL.into_iter().zip(tiers(value)?) {
        let path = bucket_path(target_path, bucket);
        let tests = items
            .into_iter()
            .enumerate()
            .map(|(position, item)| into_test(item, &path, bucket, position))
            .collect::<Result<Vec<_>>>()?;
        *suite.bucket_mut(bucket) = tests;
    }

    if suite.is_empty() {
        return Err(ServiceError::parsing("generator answer contains no tests"));
    }

    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_json;
    use serde_json::json;

    fn flat(n: usize) -> String {
        let items: Vec<Value> = (0..n).map(|i| test_json(&format!("Caso {}", i))).collect();
        Value::Array(items).to_string()
    }

    #[test]
    fn test_positional_split_sizes() {
        assert_eq!(positional_split(1), [0, 0, 1]);
        assert_eq!(positional_split(3), [1, 1, 1]);
        assert_eq!(positional_split(9), [3, 3, 3]);
        assert_eq!(positional_split(10), [3, 3, 4]);
        assert_eq!(positional_split(0), [0, 0, 0]);
    }

    #[test]
    fn test_flat_list_of_nine() {
        let suite = classify_answer(&flat(9), "DEUN/Login").unwrap();

        assert_eq!(suite.critical.len(), 3);
        assert_eq!(suite.important.len(), 3);
        assert_eq!(suite.optional.len(), 3);
        assert!(suite.critical.iter().all(|t| t.test_path == "DEUN/Login/Criticos"));
        assert!(suite.important.iter().all(|t| t.test_path == "DEUN/Login/Importantes"));
        assert!(suite.optional.iter().all(|t| t.test_path == "DEUN/Login/Opcionales"));
        // Order is preserved across the split
        assert_eq!(suite.critical[0].fields.summary, "Caso 0");
        assert_eq!(suite.important[0].fields.summary, "Caso 3");
        assert_eq!(suite.optional[2].fields.summary, "Caso 8");
    }

    #[test]
    fn test_flat_list_of_one_goes_to_optional() {
        let suite = classify_answer(&flat(1), "DEUN/Login/").unwrap();
        assert!(suite.critical.is_empty());
        assert!(suite.important.is_empty());
        assert_eq!(suite.optional[0].test_path, "DEUN/Login/Opcionales");
    }

    #[test]
    fn test_object_with_spanish_keys_and_bad_tiers() {
        let answer = json!({
            "criticos": [test_json("Login OK")],
            "important": "not a list",
        })
        .to_string();

        let suite = classify_answer(&answer, "DEUN/Login").unwrap();
        assert_eq!(suite.critical.len(), 1);
        assert!(suite.important.is_empty());
        assert!(suite.optional.is_empty());
    }

    #[test]
    fn test_answer_wrapped_in_prose_and_fences() {
        let answer = format!(
            "Aquí están los tests:\n```json\n{}\n```",
            json!({ "critical": [test_json("A")], "important": [test_json("B")], "optional": [] })
        );
        let suite = classify_answer(&answer, "X").unwrap();
        assert_eq!(suite.total(), 2);
    }

    #[test]
    fn test_invalid_answers_fail() {
        assert!(classify_answer("no json here", "X").is_err());
        assert!(classify_answer("[]", "X").is_err());
        assert!(classify_answer(r#"{"critical": []}"#, "X").is_err());
        assert!(classify_answer("\"just a string\"", "X").is_err());

        let mut incomplete = test_json("A");
        incomplete.as_object_mut().unwrap().remove("steps");
        let answer = json!({ "critical": [test_json("B"), incomplete] }).to_string();
        let err = classify_answer(&answer, "X").unwrap_err();
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn test_missing_test_path_is_stamped() {
        let mut test = test_json("A");
        test.as_object_mut().unwrap().remove("testPath");
        let suite = classify_answer(&json!([test]).to_string(), "DEUN").unwrap();
        assert_eq!(suite.optional[0].test_path, "DEUN/Opcionales");
    }
}
