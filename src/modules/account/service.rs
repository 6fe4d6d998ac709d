use std::sync::Arc;

use bookstore_authz::AdminChecker;
use bookstore_kernel::gateway::{AuthError, AuthGateway, AuthUser};
use serde::Serialize;
use thiserror::Error;

use crate::modules::favorites::{FavoritesError, FavoritesRepository};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Favorites(#[from] FavoritesError),
}

/// The signed-in user as shown on the profile page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: AuthUser,
    pub is_admin: bool,
}

/// Account lifecycle on top of the auth provider. Leaving an account always
/// empties the local favorites cache so nothing carries over to the next
/// user of the device.
pub struct AccountService {
    auth: Arc<dyn AuthGateway>,
    favorites: Arc<FavoritesRepository>,
    admin: AdminChecker,
}

impl AccountService {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        favorites: Arc<FavoritesRepository>,
        admin: AdminChecker,
    ) -> Self {
        Self {
            auth,
            favorites,
            admin,
        }
    }

    /// Create the account and request a verification email. Failing to send
    /// the email does not fail the sign-up.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AccountError> {
        let user = self.auth.sign_up(email, password).await?;
        tracing::info!(uid = %user.uid, "account created");

        if let Err(err) = self.auth.send_email_verification().await {
            tracing::warn!(uid = %user.uid, error = %err, "verification email not sent");
        }
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AccountError> {
        let user = self.auth.sign_in(email, password).await?;
        tracing::info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), AccountError> {
        self.auth.sign_out().await?;
        self.favorites.clear().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Re-authenticate with the given credentials, then delete the account.
    pub async fn delete_account(&self, email: &str, password: &str) -> Result<(), AccountError> {
        self.auth.reauthenticate(email, password).await?;
        self.auth.delete_current_user().await?;
        self.favorites.clear().await?;
        tracing::info!("account deleted");
        Ok(())
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.auth.current_user()
    }

    pub async fn profile(&self) -> Option<Profile> {
        let user = self.auth.current_user()?;
        let is_admin = self.admin.is_admin().await;
        Some(Profile { user, is_admin })
    }
}
