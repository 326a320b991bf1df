//! Loading schema, payload and manifest documents from disk.
//!
//! `.yaml` / `.yml` files are parsed as YAML and converted to the JSON value
//! model; everything else is parsed as JSON.

use std::path::Path;

use serde_json::{Map, Value};
use serde_yaml::Value as Yaml;

use crate::compile::SchemaError;

/// Read a JSON or YAML document into a JSON value.
pub fn load_document(path: &Path) -> Result<Value, SchemaError> {
    let load_error = |reason: String| SchemaError::DocumentLoad {
        path: path.display().to_string(),
        reason,
    };

    let content =
        std::fs::read_to_string(path).map_err(|e| load_error(format!("cannot read file: {e}")))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yaml" | "yml" => parse_yaml(&content).map_err(load_error),
        _ => serde_json::from_str(&content).map_err(|e| load_error(format!("invalid JSON: {e}"))),
    }
}

/// Parse YAML text into a JSON value.
///
/// Merge keys (`<<: *anchor`) are resolved first, so manifests can share
/// schema fragments between routes.
pub fn parse_yaml(content: &str) -> Result<Value, String> {
    let mut yaml: Yaml = serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {e}"))?;
    yaml.apply_merge().map_err(|e| format!("invalid YAML merge: {e}"))?;
    into_json(yaml)
}

/// Convert an owned YAML tree. Tags are dropped.
fn into_json(yaml: Yaml) -> Result<Value, String> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => Value::Number(json_number(&n)?),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => {
            Value::Array(items.into_iter().map(into_json).collect::<Result<Vec<Value>, String>>()?)
        }
        Yaml::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| -> Result<(String, Value), String> { Ok((object_key(k)?, into_json(v)?)) })
                .collect::<Result<Map<String, Value>, String>>()?,
        ),
        Yaml::Tagged(tagged) => into_json(tagged.value)?,
    })
}

fn json_number(n: &serde_yaml::Number) -> Result<serde_json::Number, String> {
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    n.as_f64()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| format!("{n} has no JSON representation"))
}

/// JSON object key for a YAML mapping key. Scalars are stringified, so a
/// response table written with bare `200:` keys comes out keyed `"200"`.
fn object_key(key: Yaml) -> Result<String, String> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Tagged(tagged) => object_key(tagged.value),
        other => Err(format!("mapping key must be a scalar, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_json_by_default() {
        let file = write_temp(".json", r#"{ "type": "object", "required": ["id"] }"#);
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc, json!({ "type": "object", "required": ["id"] }));
    }

    #[test]
    fn loads_yaml_with_numeric_keys() {
        let file = write_temp(
            ".yaml",
            "200:\n  type: object\n  properties:\n    ratio: { type: number, maximum: 1.5 }\n",
        );
        let doc = load_document(file.path()).unwrap();
        assert_eq!(
            doc,
            json!({ "200": { "type": "object", "properties": { "ratio": { "type": "number", "maximum": 1.5 } } } })
        );
    }

    #[test]
    fn tags_are_ignored() {
        assert_eq!(parse_yaml("!custom 42").unwrap(), json!(42));
    }

    #[test]
    fn merge_keys_share_fragments() {
        let doc = parse_yaml(
            "base: &id { type: integer, minimum: 1 }\nuser:\n  <<: *id\n  maximum: 9\n",
        )
        .unwrap();
        assert_eq!(doc["user"], json!({ "type": "integer", "minimum": 1, "maximum": 9 }));
    }

    #[test]
    fn non_scalar_keys_are_rejected() {
        assert!(parse_yaml("? [a, b]\n: 1\n").is_err());
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(parse_yaml(".nan").is_err());
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let file = write_temp(".json", "{ not json");
        let err = load_document(file.path()).unwrap_err();
        match err {
            SchemaError::DocumentLoad { path, reason } => {
                assert!(path.ends_with(".json"));
                assert!(reason.starts_with("invalid JSON"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_document(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read file"));
    }
}
