use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::rules::{json_kind, rule_allows, KeyRules, SchemaSource};

const JSON_SCHEMA_SUFFIX: &str = ".schema.json";

/// Keys of a document that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Keys whose value the schema does not allow, in document order.
    pub offending: Vec<String>,
    /// Keys the schema does not know, in document order.
    pub unknown: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.offending.is_empty() && self.unknown.is_empty()
    }
}

/// A loaded schema, in one of the two supported formats.
pub enum SchemaDocument {
    /// Flat key-rule object (see [`KeyRules`]).
    Keys(KeyRules),
    /// JSON Schema whose top-level `properties` are checked per key.
    Json(JsonProperties),
}

/// Compiled top-level property schemas of a JSON Schema document.
pub struct JsonProperties {
    properties: BTreeMap<String, jsonschema::Validator>,
}

impl SchemaDocument {
    /// True for file names using the JSON Schema suffix.
    pub fn is_json_schema_name(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(JSON_SCHEMA_SUFFIX)
    }

    /// Parse schema text, choosing the format from `name`.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| SchemaError::malformed(name, err.to_string()))?;
        if Self::is_json_schema_name(name) {
            Self::json_schema(name, &value)
        } else {
            KeyRules::from_value(name, value).map(SchemaDocument::Keys)
        }
    }

    /// Compile every `properties.<key>` sub-schema of a JSON Schema document.
    pub fn json_schema(name: &str, schema: &Value) -> Result<Self> {
        let Value::Object(root) = schema else {
            return Err(SchemaError::malformed(
                name,
                format!("expected a JSON object, found {}", json_kind(schema)),
            ));
        };

        let mut properties = BTreeMap::new();
        if let Some(declared) = root.get("properties") {
            let Value::Object(declared) = declared else {
                return Err(SchemaError::malformed(name, "`properties` is not an object"));
            };
            for (key, sub_schema) in declared {
                let compiled = jsonschema::validator_for(sub_schema).map_err(|err| {
                    SchemaError::malformed(name, format!("property {key}: {err}"))
                })?;
                properties.insert(key.clone(), compiled);
            }
        }
        Ok(SchemaDocument::Json(JsonProperties { properties }))
    }

    /// Classify every key of `document`.
    pub fn validate(&self, document: &Map<String, Value>) -> ValidationReport {
        let mut report = ValidationReport::default();
        for (key, value) in document {
            let allowed = match self {
                SchemaDocument::Keys(rules) => rules.lookup(key).map(|rule| rule_allows(rule, value)),
                SchemaDocument::Json(json) => json
                    .properties
                    .get(key)
                    .map(|validator| validator.is_valid(value)),
            };
            match allowed {
                None => report.unknown.push(key.clone()),
                Some(false) => report.offending.push(key.clone()),
                Some(true) => {}
            }
        }
        report
    }

    /// Number of keys the schema covers.
    pub fn key_count(&self) -> usize {
        match self {
            SchemaDocument::Keys(rules) => rules.len(),
            SchemaDocument::Json(json) => json.properties.len(),
        }
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            SchemaDocument::Keys(_) => "keys",
            SchemaDocument::Json(_) => "json-schema",
        }
    }
}

impl fmt::Debug for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDocument::Keys(rules) => f.debug_tuple("Keys").field(rules).finish(),
            SchemaDocument::Json(json) => f
                .debug_struct("Json")
                .field("properties", &json.properties.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}
