use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

/// Envelope format version carried in every notification header.
pub const NOTIFICATION_VERSION: &str = "0.3";

/// Key under which metadata is stored in every body.
pub const METADATA_KEY: &str = "metadata";

/// Notification headers sent alongside the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    /// Serialized as `type`.
    pub doc_type: String,
    pub version: String,
    pub producer: String,
    pub extra: BTreeMap<String, String>,
}

impl Headers {
    pub fn new(doc_type: impl Into<String>, producer: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            version: NOTIFICATION_VERSION.to_string(),
            producer: producer.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Headers as sent on the wire. Caller headers never shadow the envelope ones.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        map.insert("type".to_string(), self.doc_type.clone());
        map.insert("version".to_string(), self.version.clone());
        map.insert("producer".to_string(), self.producer.clone());
        map
    }
}

/// Generated notification metadata plus caller-supplied entries.
///
/// Caller entries in `extra` override generated fields of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub producer: String,
    /// Document id, serialized as `_id`.
    pub id: String,
    /// Fresh v4 UUID, unique per notification.
    pub uuid: String,
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        map.insert("producer".to_string(), Value::from(self.producer.as_str()));
        map.insert("_id".to_string(), Value::from(self.id.as_str()));
        map.insert("uuid".to_string(), Value::from(self.uuid.as_str()));
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

/// Where the payload lives in the body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `{field: payload, "metadata": ...}`
    Nested { field: String, payload: Map<String, Value> },
    /// Payload keys at the top level next to `"metadata"`.
    Merged { payload: Map<String, Value> },
}

impl Body {
    /// Choose the layout from an optional data subfield; empty means merged.
    pub fn new(data_subfield: Option<&str>, payload: Map<String, Value>) -> Self {
        match data_subfield.filter(|field| !field.is_empty()) {
            Some(field) => Body::Nested {
                field: field.to_string(),
                payload,
            },
            None => Body::Merged { payload },
        }
    }

    pub fn payload(&self) -> &Map<String, Value> {
        match self {
            Body::Nested { payload, .. } | Body::Merged { payload } => payload,
        }
    }
}

/// One outbound message: headers, body and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub headers: Headers,
    pub body: Body,
    pub metadata: Metadata,
}

impl Notification {
    pub fn doc_type(&self) -> &str {
        &self.headers.doc_type
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn wire_headers(&self) -> BTreeMap<String, String> {
        self.headers.to_map()
    }

    /// The body document, with metadata under `"metadata"`.
    ///
    /// A payload key named `metadata` is overwritten.
    pub fn body_value(&self) -> Value {
        let mut body = match &self.body {
            Body::Nested { field, payload } => {
                let mut body = Map::new();
                body.insert(field.clone(), Value::Object(payload.clone()));
                body
            }
            Body::Merged { payload } => payload.clone(),
        };
        body.insert(METADATA_KEY.to_string(), Value::Object(self.metadata.to_map()));
        Value::Object(body)
    }

    pub fn body_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.body_value())
    }
}

impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("headers", &self.headers)?;
        map.serialize_entry("body", &self.body_value())?;
        map.end()
    }
}
