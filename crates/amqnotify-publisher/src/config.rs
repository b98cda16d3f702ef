use std::path::PathBuf;

use amqnotify_schema::ValidationLevel;
use amqnotify_transport::{Credentials, Endpoint, TlsIdentity};
use tracing::debug;

use crate::error::{PublishError, Result};

/// Broker used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: (&str, u16) = ("agileinf-mb.cern.ch", 61213);

/// How the publisher authenticates to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Login and passcode in the CONNECT frame.
    Credentials(Credentials),
    /// TLS client certificate, no login.
    Certificate(TlsIdentity),
}

/// Immutable publisher settings, reused across many sends.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub auth: Auth,
    pub producer: String,
    pub topic: String,
    pub endpoints: Vec<Endpoint>,
    pub validation_schema: Option<String>,
    pub validation_level: ValidationLevel,
}

impl PublisherConfig {
    pub fn builder(producer: impl Into<String>, topic: impl Into<String>) -> PublisherConfigBuilder {
        PublisherConfigBuilder::new(producer, topic)
    }
}

/// Validating builder for [`PublisherConfig`].
#[derive(Debug, Clone)]
pub struct PublisherConfigBuilder {
    producer: String,
    topic: String,
    credentials: Option<Credentials>,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    ca_file: Option<PathBuf>,
    endpoints: Option<Vec<Endpoint>>,
    validation_schema: Option<String>,
    validation_level: ValidationLevel,
}

impl PublisherConfigBuilder {
    pub fn new(producer: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            topic: topic.into(),
            credentials: None,
            cert_file: None,
            key_file: None,
            ca_file: None,
            endpoints: None,
            validation_schema: None,
            validation_level: ValidationLevel::default(),
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(path.into());
        self
    }

    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Trust anchors for verifying the broker in certificate mode.
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Add one broker endpoint. The first call replaces the default broker.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.get_or_insert_with(Vec::new).push(endpoint);
        self
    }

    /// Replace the endpoint list.
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints = Some(endpoints.into_iter().collect());
        self
    }

    /// Schema applied by builders created from this config.
    pub fn validation_schema(mut self, schema: impl Into<String>) -> Self {
        self.validation_schema = Some(schema.into());
        self
    }

    pub fn validation_level(mut self, level: ValidationLevel) -> Self {
        self.validation_level = level;
        self
    }

    pub fn build(self) -> Result<PublisherConfig> {
        if self.producer.trim().is_empty() {
            return Err(PublishError::Config("producer must not be empty".to_string()));
        }
        if self.topic.trim().is_empty() {
            return Err(PublishError::Config("topic must not be empty".to_string()));
        }

        let endpoints = self
            .endpoints
            .unwrap_or_else(|| vec![Endpoint::new(DEFAULT_ENDPOINT.0, DEFAULT_ENDPOINT.1)]);
        if endpoints.is_empty() {
            return Err(PublishError::Config("at least one endpoint is required".to_string()));
        }

        let auth = match (self.cert_file, self.key_file, self.credentials) {
            (Some(cert_file), Some(key_file), credentials) => {
                if let Some(credentials) = credentials {
                    debug!(
                        username = %credentials.username,
                        "client certificate configured, ignoring credentials"
                    );
                }
                Auth::Certificate(TlsIdentity {
                    cert_file,
                    key_file,
                    ca_file: self.ca_file,
                })
            }
            (Some(_), None, _) => {
                return Err(PublishError::Config("client certificate given without a key".to_string()))
            }
            (None, Some(_), _) => {
                return Err(PublishError::Config("client key given without a certificate".to_string()))
            }
            (None, None, Some(credentials)) => Auth::Credentials(credentials),
            (None, None, None) => {
                return Err(PublishError::Config(
                    "either credentials or a client certificate is required".to_string(),
                ))
            }
        };

        Ok(PublisherConfig {
            auth,
            producer: self.producer,
            topic: self.topic,
            endpoints,
            validation_schema: self.validation_schema.filter(|schema| !schema.is_empty()),
            validation_level: self.validation_level,
        })
    }
}
