//! In-process gateways used for the `local` environment and in tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use uuid::Uuid;

use super::{
    AuthError, AuthGateway, AuthUser, BlobStore, Document, DocumentStore, Fields, GatewayError,
    Query,
};

/// Document store keeping every collection in memory.
///
/// Ids are UUIDv7, so unordered queries return documents in creation order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document under a caller-chosen id, replacing any existing one.
    pub fn insert_with_id(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, GatewayError> {
        let collections = self.collections.read();
        let mut documents: Vec<Document> = collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some(field) = &query.order_by {
            documents.sort_by(|a, b| compare_values(a.fields.get(field), b.fields.get(field)));
        }

        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, GatewayError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, GatewayError> {
        let id = Uuid::now_v7().simple().to_string();
        self.insert_with_id(collection, &id, fields);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), GatewayError> {
        let mut collections = self.collections.write();
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| GatewayError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        existing.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), GatewayError> {
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Blob store keeping uploads in memory and handing out `{base_url}/{path}`.
pub struct MemoryBlobStore {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, GatewayError> {
        self.objects.write().insert(path.to_string(), bytes);
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| GatewayError::BlobNotFound(path.to_string()))
    }
}

struct Account {
    uid: String,
    password: String,
    email_verified: bool,
}

/// Email/password auth provider with a single active session.
pub struct MemoryAuthGateway {
    min_password_length: usize,
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<AuthUser>>,
    verifications: Mutex<Vec<String>>,
}

impl MemoryAuthGateway {
    pub fn new(min_password_length: usize) -> Self {
        Self {
            min_password_length,
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            verifications: Mutex::new(Vec::new()),
        }
    }

    /// Emails a verification message has been sent to, oldest first.
    pub fn verification_requests(&self) -> Vec<String> {
        self.verifications.lock().clone()
    }

    fn signed_in(&self) -> Result<AuthUser, AuthError> {
        self.current.read().clone().ok_or(AuthError::NotSignedIn)
    }
}

/// Accepts `local@domain.tld` shapes; the hosted provider does the real check.
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[async_trait]
impl AuthGateway for MemoryAuthGateway {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword);
        }

        let mut accounts = self.accounts.write();
        if accounts.contains_key(email) {
            return Err(AuthError::UserExists);
        }

        let uid = Uuid::new_v4().simple().to_string();
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
                email_verified: false,
            },
        );

        let user = AuthUser {
            uid,
            email: email.to_string(),
            email_verified: false,
        };
        *self.current.write() = Some(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidCredentials);
        }

        let accounts = self.accounts.read();
        let account = accounts.get(email).ok_or(AuthError::UserNotFound)?;
        if account.password != password {
            return Err(AuthError::InvalidCredentials);
        }

        let user = AuthUser {
            uid: account.uid.clone(),
            email: email.to_string(),
            email_verified: account.email_verified,
        };
        *self.current.write() = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.current.write() = None;
        Ok(())
    }

    async fn send_email_verification(&self) -> Result<(), AuthError> {
        let user = self.signed_in()?;
        self.verifications.lock().push(user.email);
        Ok(())
    }

    async fn reauthenticate(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let user = self.signed_in()?;
        let accounts = self.accounts.read();
        match accounts.get(email) {
            Some(account)
                if user.email == email && account.uid == user.uid && account.password == password =>
            {
                Ok(())
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn delete_current_user(&self) -> Result<(), AuthError> {
        let user = self.signed_in()?;
        self.accounts.write().remove(&user.email);
        *self.current.write() = None;
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryDocumentStore::new();
        store
            .add("categories", fields(json!({"name": "Poetry", "isActive": true})))
            .await
            .unwrap();
        store
            .add("categories", fields(json!({"name": "Drama", "isActive": false})))
            .await
            .unwrap();
        store
            .add("categories", fields(json!({"name": "Classics", "isActive": true})))
            .await
            .unwrap();

        let active = store
            .query(
                "categories",
                &Query::new().where_eq("isActive", true).order_by("name"),
            )
            .await
            .unwrap();
        let names: Vec<_> = active.iter().filter_map(|d| d.get_str("name")).collect();
        assert_eq!(names, vec!["Classics", "Poetry"]);
    }

    #[tokio::test]
    async fn update_merges_and_requires_document() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add("categories", fields(json!({"name": "IT", "bookCount": 1})))
            .await
            .unwrap();

        store
            .update("categories", &id, fields(json!({"bookCount": 2})))
            .await
            .unwrap();
        let doc = store.get("categories", &id).await.unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("IT"));
        assert_eq!(doc.get_i64("bookCount"), Some(2));

        let err = store
            .update("categories", "missing", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { .. }));

        store.delete("categories", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn blob_upload_returns_url() {
        let blobs = MemoryBlobStore::new("memory://images/");
        let url = blobs.upload("covers/a.jpg", vec![1, 2]).await.unwrap();

        assert_eq!(url, "memory://images/covers/a.jpg");
        assert_eq!(blobs.download("covers/a.jpg").await.unwrap(), vec![1, 2]);
        assert!(blobs.download("covers/b.jpg").await.is_err());
    }

    #[tokio::test]
    async fn sign_up_rules() {
        let auth = MemoryAuthGateway::new(6);

        assert_eq!(
            auth.sign_up("reader", "secret1").await.unwrap_err(),
            AuthError::InvalidEmail
        );
        assert_eq!(
            auth.sign_up("reader@example.com", "123").await.unwrap_err(),
            AuthError::WeakPassword
        );

        let user = auth.sign_up("reader@example.com", "secret1").await.unwrap();
        assert_eq!(auth.current_user(), Some(user));
        assert_eq!(
            auth.sign_up("reader@example.com", "secret1").await.unwrap_err(),
            AuthError::UserExists
        );
    }

    #[tokio::test]
    async fn sign_in_and_delete() {
        let auth = MemoryAuthGateway::new(6);
        auth.sign_up("reader@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current_user().is_none());

        assert_eq!(
            auth.sign_in("reader@example.com", "wrong!!").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            auth.sign_in("other@example.com", "secret1").await.unwrap_err(),
            AuthError::UserNotFound
        );

        auth.sign_in("reader@example.com", "secret1").await.unwrap();
        assert!(auth
            .reauthenticate("reader@example.com", "nope")
            .await
            .is_err());
        auth.reauthenticate("reader@example.com", "secret1")
            .await
            .unwrap();
        auth.delete_current_user().await.unwrap();

        assert!(auth.current_user().is_none());
        assert_eq!(
            auth.sign_in("reader@example.com", "secret1").await.unwrap_err(),
            AuthError::UserNotFound
        );
    }

    #[tokio::test]
    async fn verification_requires_session() {
        let auth = MemoryAuthGateway::new(6);
        assert_eq!(
            auth.send_email_verification().await.unwrap_err(),
            AuthError::NotSignedIn
        );

        auth.sign_up("reader@example.com", "secret1").await.unwrap();
        auth.send_email_verification().await.unwrap();
        assert_eq!(auth.verification_requests(), vec!["reader@example.com"]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.io"));
        assert!(!is_valid_email("@b.io"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.io"));
        assert!(!is_valid_email("a@b@c.io"));
    }
}
