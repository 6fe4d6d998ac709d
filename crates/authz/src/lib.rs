//! Administrator checks.
//!
//! A signed-in user is an administrator when the `admin` collection holds a
//! document keyed by the user's uid.

use std::sync::Arc;

use bookstore_kernel::gateway::{AuthGateway, AuthUser, DocumentStore};
use thiserror::Error;

/// Collection whose document ids are administrator uids.
pub const ADMIN_COLLECTION: &str = "admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("sign in required")]
    NotSignedIn,
    #[error("administrator privileges required")]
    Forbidden,
}

#[derive(Clone)]
pub struct AdminChecker {
    auth: Arc<dyn AuthGateway>,
    documents: Arc<dyn DocumentStore>,
}

impl AdminChecker {
    pub fn new(auth: Arc<dyn AuthGateway>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { auth, documents }
    }

    /// Whether the current user is an administrator. Lookup failures count
    /// as "no".
    pub async fn is_admin(&self) -> bool {
        match self.auth.current_user() {
            Some(user) => self.lookup(&user).await,
            None => {
                tracing::debug!(target: "bookstore-authz", "user not authenticated");
                false
            }
        }
    }

    /// Fail unless the current user is an administrator.
    pub async fn require_admin(&self) -> Result<AuthUser, AuthzError> {
        let user = self.auth.current_user().ok_or(AuthzError::NotSignedIn)?;
        if self.lookup(&user).await {
            Ok(user)
        } else {
            Err(AuthzError::Forbidden)
        }
    }

    async fn lookup(&self, user: &AuthUser) -> bool {
        match self.documents.get(ADMIN_COLLECTION, &user.uid).await {
            Ok(document) => {
                let is_admin = document.is_some();
                tracing::debug!(target: "bookstore-authz", uid = %user.uid, is_admin, "admin lookup");
                is_admin
            }
            Err(err) => {
                tracing::error!(target: "bookstore-authz", uid = %user.uid, error = %err, "admin lookup failed");
                false
            }
        }
    }
}
