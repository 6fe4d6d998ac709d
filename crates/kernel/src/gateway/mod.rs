//! Capability interfaces for the hosted backend: document database, blob
//! storage and authentication.
//!
//! Components receive these as `Arc<dyn ..>` through their constructors and
//! never reach for a global client, so tests swap in the in-memory versions
//! from [`memory`].

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// One document from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }
}

/// Collection query: equality filters plus an optional ascending sort field.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Whether `fields` satisfies every equality filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("blob {0} not found")]
    BlobNotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, GatewayError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, GatewayError>;

    /// Store a new document and return the id the store assigned to it.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, GatewayError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields)
        -> Result<(), GatewayError>;

    /// Delete a document; deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` under `path` and return the public download URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, GatewayError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, GatewayError>;
}

/// The signed-in account as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("password is too weak")]
    WeakPassword,
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("an account with this email already exists")]
    UserExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no account with this email")]
    UserNotFound,
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("auth backend failure: {0}")]
    Backend(String),
}

/// Session-scoped authentication: at most one user is signed in at a time.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn send_email_verification(&self) -> Result<(), AuthError>;

    async fn reauthenticate(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn delete_current_user(&self) -> Result<(), AuthError>;

    fn current_user(&self) -> Option<AuthUser>;
}

/// The full set of backend capabilities handed to modules.
#[derive(Clone)]
pub struct Gateways {
    pub auth: Arc<dyn AuthGateway>,
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Gateways {
    /// In-process gateways configured from `settings`.
    pub fn in_memory(settings: &crate::settings::BackendSettings) -> Self {
        Self {
            auth: Arc::new(memory::MemoryAuthGateway::new(settings.min_password_length)),
            documents: Arc::new(memory::MemoryDocumentStore::new()),
            blobs: Arc::new(memory::MemoryBlobStore::new(settings.blob_base_url.clone())),
        }
    }
}
