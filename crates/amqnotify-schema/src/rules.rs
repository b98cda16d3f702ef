use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// Environment variable naming the key-rule file for ClassAd documents.
pub const CLASSADS_SCHEMA_ENV: &str = "CLASSADS_SCHEMA";

/// Per-key lookup of what a schema allows.
pub trait SchemaSource {
    /// The rule registered for `key`, if any.
    fn lookup(&self, key: &str) -> Option<&Value>;

    /// Whether `value` satisfies the rule for `key`. Unknown keys are never allowed.
    fn is_allowed(&self, key: &str, value: &Value) -> bool {
        self.lookup(key).is_some_and(|rule| rule_allows(rule, value))
    }
}

/// Check one value against one rule.
///
/// An array rule lists the allowed values. Any other rule is an example
/// value whose JSON type the document value must share; integer examples
/// only accept integers, float examples accept any number.
pub fn rule_allows(rule: &Value, value: &Value) -> bool {
    match (rule, value) {
        (Value::Array(allowed), value) => allowed.contains(value),
        (Value::Null, Value::Null)
        | (Value::Bool(_), Value::Bool(_))
        | (Value::String(_), Value::String(_))
        | (Value::Object(_), Value::Object(_)) => true,
        (Value::Number(example), Value::Number(actual)) => example.is_f64() || !actual.is_f64(),
        _ => false,
    }
}

/// A flat key-rule schema: a JSON object mapping keys to rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyRules {
    rules: Map<String, Value>,
}

impl KeyRules {
    /// Build from an already parsed schema object.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(rules) => Ok(Self { rules }),
            other => Err(SchemaError::malformed(
                name,
                format!("expected a JSON object, found {}", json_kind(&other)),
            )),
        }
    }

    /// Parse schema text.
    pub fn from_json(name: &str, text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| SchemaError::malformed(name, err.to_string()))?;
        Self::from_value(name, value)
    }

    /// Load from a file. An empty path is a configuration error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(SchemaError::Config("unknown schema: empty path".to_string()));
        }
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{name}: {err}")))?;
        Self::from_json(&name, &text)
    }

    /// Load from the file named by environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var_os(var).filter(|path| !path.is_empty()) {
            Some(path) => Self::from_path(path),
            None => Err(SchemaError::Config(format!(
                "unknown schema: {var} is not set"
            ))),
        }
    }

    /// Load the ClassAd rules named by `CLASSADS_SCHEMA`.
    pub fn classads() -> Result<Self> {
        Self::from_env(CLASSADS_SCHEMA_ENV)
    }

    /// Keys covered by this schema, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl SchemaSource for KeyRules {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.rules.get(key)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status_rules() -> KeyRules {
        KeyRules::from_value(
            "status",
            json!({"status": ["ok", "fail"], "site": "T2_CH_CERN", "cpus": 4, "eff": 0.5}),
        )
        .unwrap()
    }

    #[test]
    fn allowed_values_membership() {
        let rules = status_rules();
        assert!(rules.is_allowed("status", &json!("ok")));
        assert!(!rules.is_allowed("status", &json!("bad")));
        assert!(!rules.is_allowed("missing", &json!("ok")));
    }

    #[test]
    fn example_values_match_by_type() {
        let rules = status_rules();
        assert!(rules.is_allowed("site", &json!("T1_US_FNAL")));
        assert!(!rules.is_allowed("site", &json!(1)));
        assert!(rules.is_allowed("cpus", &json!(8)));
        assert!(!rules.is_allowed("cpus", &json!(1.5)));
        assert!(rules.is_allowed("eff", &json!(1)));
        assert!(rules.is_allowed("eff", &json!(0.75)));
    }

    #[test]
    fn non_object_schema_is_malformed() {
        assert!(matches!(
            KeyRules::from_json("list", "[1, 2]"),
            Err(SchemaError::Malformed { .. })
        ));
        assert!(matches!(
            KeyRules::from_json("broken", "{not json"),
            Err(SchemaError::Malformed { .. })
        ));
    }

    #[test]
    fn from_path_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classads.json");
        std::fs::write(&path, r#"{"JobStatus": [1, 2, 4]}"#).unwrap();

        let rules = KeyRules::from_path(&path).unwrap();
        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["JobStatus"]);
        assert!(rules.is_allowed("JobStatus", &json!(4)));
    }

    #[test]
    fn empty_path_is_config_error() {
        assert!(matches!(
            KeyRules::from_path(""),
            Err(SchemaError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            KeyRules::from_path(dir.path().join("absent.json")),
            Err(SchemaError::LoadFailed(_))
        ));
    }

    #[test]
    fn from_env_reads_named_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"Site": "x"}"#).unwrap();

        let var = "AMQNOTIFY_TEST_RULES_FROM_ENV";
        std::env::set_var(var, &path);
        let rules = KeyRules::from_env(var).unwrap();
        std::env::remove_var(var);

        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn from_env_unset_is_config_error() {
        assert!(matches!(
            KeyRules::from_env("AMQNOTIFY_TEST_RULES_UNSET"),
            Err(SchemaError::Config(msg)) if msg.contains("AMQNOTIFY_TEST_RULES_UNSET")
        ));
    }
}
