use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use amqnotify_schema::{RegistryConfig, SchemaRegistry, SchemaValidator};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PublisherConfig;
use crate::notification::{Body, Headers, Metadata, Notification};

/// Header names owned by the envelope or the transport.
const RESERVED_HEADERS: &[&str] = &[
    "type",
    "version",
    "producer",
    "destination",
    "ack",
    "content-type",
    "content-length",
    "receipt",
    "transaction",
];

/// Per-call overrides for [`NotificationBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Document id; defaults to the generated uuid.
    pub doc_id: Option<String>,
    /// Producer override.
    pub producer: Option<String>,
    /// Epoch seconds; defaults to now.
    pub timestamp: Option<i64>,
    /// Caller metadata, overriding generated fields.
    pub metadata: Map<String, Value>,
    /// Body key holding the payload. `None` or empty merges the payload into the body.
    pub data_subfield: Option<String>,
    /// Schema override.
    pub schema: Option<String>,
    pub drop_offending_keys: bool,
    pub drop_unknown_keys: bool,
    /// Additional string headers. Reserved names are ignored.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            doc_id: None,
            producer: None,
            timestamp: None,
            metadata: Map::new(),
            data_subfield: Some("data".to_string()),
            schema: None,
            drop_offending_keys: false,
            drop_unknown_keys: false,
            extra_headers: BTreeMap::new(),
        }
    }
}

/// A built notification and the schema findings for its payload.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub notification: Notification,
    pub offending_keys: Vec<String>,
    pub unknown_keys: Vec<String>,
}

/// Wraps payloads into notifications, validating them when a schema applies.
pub struct NotificationBuilder {
    producer: String,
    schema: Option<String>,
    validator: Arc<SchemaValidator>,
}

impl NotificationBuilder {
    /// Builder with no default schema, resolving schemas through a registry
    /// configured from the environment.
    pub fn new(producer: impl Into<String>) -> Self {
        let registry = SchemaRegistry::with_config(RegistryConfig::from_env());
        Self {
            producer: producer.into(),
            schema: None,
            validator: Arc::new(SchemaValidator::new(Arc::new(registry))),
        }
    }

    /// Producer, default schema and validation level taken from `config`.
    pub fn from_config(config: &PublisherConfig) -> Self {
        let registry = SchemaRegistry::with_config(RegistryConfig::from_env());
        let validator =
            SchemaValidator::new(Arc::new(registry)).with_level(config.validation_level);
        Self {
            producer: config.producer.clone(),
            schema: config.validation_schema.clone(),
            validator: Arc::new(validator),
        }
    }

    /// Schema applied when [`BuildOptions::schema`] is unset.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into()).filter(|schema| !schema.is_empty());
        self
    }

    pub fn with_validator(mut self, validator: Arc<SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn validator(&self) -> &Arc<SchemaValidator> {
        &self.validator
    }

    /// Build a notification of `doc_type` around `payload`.
    ///
    /// With a schema in effect, keys it rejects are reported and, when the
    /// matching drop flag is set, removed from `payload` before the body is
    /// assembled. An unresolvable schema yields empty key lists.
    pub fn build(
        &self,
        payload: &mut Map<String, Value>,
        doc_type: &str,
        options: &BuildOptions,
    ) -> BuildOutput {
        let producer = options
            .producer
            .clone()
            .unwrap_or_else(|| self.producer.clone());
        let timestamp = options.timestamp.unwrap_or_else(now_epoch_seconds);
        let uuid = Uuid::new_v4().to_string();
        let id = options.doc_id.clone().unwrap_or_else(|| uuid.clone());

        let mut offending_keys = Vec::new();
        let mut unknown_keys = Vec::new();
        let schema = options
            .schema
            .as_deref()
            .filter(|schema| !schema.is_empty())
            .or(self.schema.as_deref())
            .filter(|schema| !schema.is_empty());
        if let Some(schema) = schema {
            if let Some(report) = self.validator.validate(payload, schema) {
                offending_keys = report.offending;
                unknown_keys = report.unknown;
            }

            if !offending_keys.is_empty() {
                warn!(schema, keys = ?offending_keys, "document conflicts with schema");
                if options.drop_offending_keys {
                    remove_keys(payload, &offending_keys);
                }
            }
            if !unknown_keys.is_empty() {
                warn!(schema, keys = ?unknown_keys, "document keys not in schema");
                if options.drop_unknown_keys {
                    remove_keys(payload, &unknown_keys);
                }
            }
        }

        let mut headers = Headers::new(doc_type, producer.clone());
        for (name, value) in &options.extra_headers {
            if RESERVED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                warn!(header = %name, "ignoring reserved header");
                continue;
            }
            headers.extra.insert(name.clone(), value.clone());
        }

        let metadata = Metadata {
            timestamp,
            producer,
            id,
            uuid,
            extra: options.metadata.clone(),
        };
        let body = Body::new(options.data_subfield.as_deref(), payload.clone());
        debug!(doc_type, id = %metadata.id, "built notification");

        BuildOutput {
            notification: Notification {
                headers,
                body,
                metadata,
            },
            offending_keys,
            unknown_keys,
        }
    }
}

fn remove_keys(payload: &mut Map<String, Value>, keys: &[String]) {
    for key in keys {
        payload.remove(key);
    }
}

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn builder_with_schema(name: &str, schema: &str) -> NotificationBuilder {
        let registry = SchemaRegistry::from_embedded(&[(name, schema)]).unwrap();
        NotificationBuilder::new("crab")
            .with_validator(Arc::new(SchemaValidator::new(Arc::new(registry))))
    }

    #[test]
    fn no_schema_leaves_payload_untouched() {
        let builder = NotificationBuilder::new("crab");
        let mut payload = object(json!({"a": 1, "b": "two"}));
        let before = payload.clone();

        let options = BuildOptions {
            drop_offending_keys: true,
            drop_unknown_keys: true,
            ..BuildOptions::default()
        };
        let output = builder.build(&mut payload, "cms_job", &options);

        assert!(output.offending_keys.is_empty());
        assert!(output.unknown_keys.is_empty());
        assert_eq!(payload, before);
    }

    #[test]
    fn uuid_is_fresh_and_defaults_the_id() {
        let builder = NotificationBuilder::new("crab");
        let first = builder.build(&mut Map::new(), "t", &BuildOptions::default());
        let second = builder.build(&mut Map::new(), "t", &BuildOptions::default());

        assert_ne!(first.notification.metadata.uuid, second.notification.metadata.uuid);
        assert_eq!(first.notification.metadata.id, first.notification.metadata.uuid);
    }

    #[test]
    fn explicit_doc_id_keeps_distinct_uuid() {
        let builder = NotificationBuilder::new("crab");
        let options = BuildOptions {
            doc_id: Some("job-42".to_string()),
            ..BuildOptions::default()
        };
        let first = builder.build(&mut Map::new(), "t", &options).notification;
        let second = builder.build(&mut Map::new(), "t", &options).notification;

        assert_eq!(first.id(), "job-42");
        assert_eq!(second.id(), "job-42");
        assert_ne!(first.metadata.uuid, second.metadata.uuid);
        assert_ne!(first.metadata.uuid, "job-42");
    }

    #[test]
    fn data_subfield_controls_body_layout() {
        let builder = NotificationBuilder::new("crab");

        let nested = builder
            .build(&mut object(json!({"a": 1})), "t", &BuildOptions::default())
            .notification
            .body_value();
        assert_eq!(nested["data"], json!({"a": 1}));
        assert!(nested["metadata"].is_object());

        let merged_options = BuildOptions {
            data_subfield: None,
            ..BuildOptions::default()
        };
        let merged = builder
            .build(&mut object(json!({"a": 1})), "t", &merged_options)
            .notification
            .body_value();
        assert_eq!(merged["a"], json!(1));
        assert!(merged.get("data").is_none());
        assert!(merged["metadata"].is_object());
    }

    #[test]
    fn headers_and_metadata_are_populated() {
        let builder = NotificationBuilder::new("crab");
        let options = BuildOptions {
            producer: Some("wmagent".to_string()),
            timestamp: Some(1_600_000_000),
            metadata: object(json!({"_id": "forced", "site": "T2_CH_CERN"})),
            extra_headers: BTreeMap::from([
                ("persistent".to_string(), "true".to_string()),
                ("destination".to_string(), "/topic/elsewhere".to_string()),
            ]),
            ..BuildOptions::default()
        };
        let notification = builder.build(&mut Map::new(), "cms_job", &options).notification;

        let headers = notification.wire_headers();
        assert_eq!(headers["type"], "cms_job");
        assert_eq!(headers["version"], "0.3");
        assert_eq!(headers["producer"], "wmagent");
        assert_eq!(headers["persistent"], "true");
        assert!(!headers.contains_key("destination"));

        let metadata = notification.metadata.to_map();
        assert_eq!(metadata["timestamp"], json!(1_600_000_000));
        assert_eq!(metadata["producer"], json!("wmagent"));
        assert_eq!(metadata["_id"], json!("forced"));
        assert_eq!(metadata["site"], json!("T2_CH_CERN"));
    }

    #[test]
    fn schema_findings_are_reported_without_dropping() {
        let builder = builder_with_schema("status.json", r#"{"status": ["ok", "fail"]}"#);
        let mut payload = object(json!({"status": "bad", "extra": 1}));
        let options = BuildOptions {
            schema: Some("status".to_string()),
            ..BuildOptions::default()
        };

        let output = builder.build(&mut payload, "t", &options);
        assert_eq!(output.offending_keys, vec!["status"]);
        assert_eq!(output.unknown_keys, vec!["extra"]);
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn drop_flags_remove_reported_keys() {
        let builder = builder_with_schema("status.json", r#"{"status": ["ok", "fail"]}"#)
            .with_schema("status");
        let mut payload = object(json!({"status": "bad", "extra": 1}));
        let options = BuildOptions {
            drop_offending_keys: true,
            drop_unknown_keys: true,
            ..BuildOptions::default()
        };

        let output = builder.build(&mut payload, "t", &options);
        assert_eq!(output.offending_keys, vec!["status"]);
        assert_eq!(output.unknown_keys, vec!["extra"]);
        assert!(payload.is_empty());
        assert_eq!(output.notification.body.payload().len(), 0);
    }

    #[test]
    fn empty_schema_option_falls_back_to_builder_default() {
        let builder = builder_with_schema("status.json", r#"{"status": ["ok", "fail"]}"#)
            .with_schema("status");
        let mut payload = object(json!({"status": "bad"}));
        let options = BuildOptions {
            schema: Some(String::new()),
            ..BuildOptions::default()
        };

        let output = builder.build(&mut payload, "t", &options);
        assert_eq!(output.offending_keys, vec!["status"]);
    }

    #[test]
    fn only_unknown_keys_dropped_when_requested() {
        let builder = builder_with_schema("status.json", r#"{"status": ["ok", "fail"]}"#);
        let mut payload = object(json!({"status": "bad", "extra": 1}));
        let options = BuildOptions {
            schema: Some("status.json".to_string()),
            drop_unknown_keys: true,
            ..BuildOptions::default()
        };

        builder.build(&mut payload, "t", &options);
        assert_eq!(payload, object(json!({"status": "bad"})));
    }

    #[test]
    fn unresolved_schema_yields_empty_lists() {
        let builder = NotificationBuilder::new("crab").with_schema("does-not-exist");
        let mut payload = object(json!({"a": 1}));
        let options = BuildOptions {
            drop_unknown_keys: true,
            ..BuildOptions::default()
        };

        let output = builder.build(&mut payload, "t", &options);
        assert!(output.offending_keys.is_empty());
        assert!(output.unknown_keys.is_empty());
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn builder_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NotificationBuilder>();
    }
}
