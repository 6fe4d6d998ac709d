pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bookstore_authz::AdminChecker;
use bookstore_http::error::AppError;
use bookstore_kernel::gateway::{AuthError, AuthUser, Gateways};
use bookstore_kernel::{InitCtx, Module};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::json;

use crate::modules::favorites::FavoritesModule;
pub use service::{AccountError, AccountService, Profile};

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Auth(auth) => auth_error(auth),
            AccountError::Favorites(favorites) => favorites.into(),
        }
    }
}

fn auth_error(err: AuthError) -> AppError {
    match err {
        AuthError::UserExists => AppError::conflict(
            vec![json!({"field": "email", "error": "taken"})],
            err.to_string(),
        ),
        AuthError::WeakPassword => AppError::validation(
            vec![json!({"field": "password", "error": "too_weak"})],
            err.to_string(),
        ),
        AuthError::InvalidEmail => AppError::validation(
            vec![json!({"field": "email", "error": "malformed"})],
            err.to_string(),
        ),
        AuthError::InvalidCredentials | AuthError::UserNotFound | AuthError::NotSignedIn => {
            AppError::unauthorized(err.to_string())
        }
        AuthError::Backend(_) => AppError::Internal(err.into()),
    }
}

/// Sign-up, sign-in and account removal. Depends on the favorites module,
/// whose cache it clears when a user leaves.
pub struct AccountModule {
    auth: Arc<dyn bookstore_kernel::gateway::AuthGateway>,
    admin: AdminChecker,
    favorites: Arc<FavoritesModule>,
    service: OnceCell<Arc<AccountService>>,
}

impl AccountModule {
    pub fn new(gateways: &Gateways, favorites: Arc<FavoritesModule>) -> Self {
        Self {
            auth: gateways.auth.clone(),
            admin: AdminChecker::new(gateways.auth.clone(), gateways.documents.clone()),
            favorites,
            service: OnceCell::new(),
        }
    }

    pub fn service(&self) -> Option<Arc<AccountService>> {
        self.service.get().cloned()
    }
}

#[async_trait]
impl Module for AccountModule {
    fn name(&self) -> &'static str {
        "account"
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let Some(favorites) = self.favorites.repository() else {
            anyhow::bail!("favorites module must be started before the account module");
        };

        let service = AccountService::new(self.auth.clone(), favorites, self.admin.clone());
        if self.service.set(Arc::new(service)).is_err() {
            anyhow::bail!("account module started twice");
        }

        tracing::info!(module = self.name(), "account module started");
        Ok(())
    }

    fn routes(&self) -> Router {
        let Some(service) = self.service() else {
            tracing::warn!(module = self.name(), "routes requested before start; serving none");
            return Router::new();
        };

        Router::new()
            .route("/sign-up", post(sign_up))
            .route("/sign-in", post(sign_in))
            .route("/sign-out", post(sign_out))
            .route("/delete", post(delete_account))
            .route("/me", get(me))
            .with_state(service)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let credentials = json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Credentials" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/sign-up": {
                    "post": {
                        "summary": "Create an account and send a verification email",
                        "tags": ["Account"],
                        "requestBody": credentials,
                        "responses": {
                            "201": { "description": "Signed up and signed in" },
                            "409": { "description": "Email already registered" },
                            "422": { "description": "Weak password or malformed email" }
                        }
                    }
                },
                "/sign-in": {
                    "post": {
                        "summary": "Sign in",
                        "tags": ["Account"],
                        "requestBody": credentials,
                        "responses": {
                            "200": { "description": "Signed in" },
                            "401": { "description": "Invalid credentials" }
                        }
                    }
                },
                "/sign-out": {
                    "post": {
                        "summary": "Sign out and clear cached favorites",
                        "tags": ["Account"],
                        "responses": { "204": { "description": "Signed out" } }
                    }
                },
                "/delete": {
                    "post": {
                        "summary": "Re-authenticate and delete the account",
                        "tags": ["Account"],
                        "requestBody": credentials,
                        "responses": {
                            "204": { "description": "Deleted" },
                            "401": { "description": "Re-authentication failed" }
                        }
                    }
                },
                "/me": {
                    "get": {
                        "summary": "Current user and admin flag",
                        "tags": ["Account"],
                        "responses": {
                            "200": { "description": "Profile" },
                            "401": { "description": "Not signed in" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Credentials": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string" },
                            "password": { "type": "string", "format": "password" }
                        },
                        "required": ["email", "password"]
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn sign_up(
    State(service): State<Arc<AccountService>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthUser>), AppError> {
    let user = service
        .sign_up(credentials.email.trim(), &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn sign_in(
    State(service): State<Arc<AccountService>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthUser>, AppError> {
    let user = service
        .sign_in(credentials.email.trim(), &credentials.password)
        .await?;
    Ok(Json(user))
}

async fn sign_out(State(service): State<Arc<AccountService>>) -> Result<StatusCode, AppError> {
    service.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
    State(service): State<Arc<AccountService>>,
    Json(credentials): Json<Credentials>,
) -> Result<StatusCode, AppError> {
    service
        .delete_account(credentials.email.trim(), &credentials.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(service): State<Arc<AccountService>>) -> Result<Json<Profile>, AppError> {
    service
        .profile()
        .await
        .map(Json)
        .ok_or_else(|| AppError::unauthorized("sign in required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use bookstore_db::Database;
    use bookstore_kernel::settings::Settings;
    use tower::ServiceExt;

    async fn started() -> AccountModule {
        let settings = Settings::default();
        let gateways = Gateways::in_memory(&settings.backend);
        let db = Database::open_in_memory().unwrap();

        let favorites = Arc::new(FavoritesModule::new());
        let account = AccountModule::new(&gateways, Arc::clone(&favorites));
        let migrations: Vec<_> = favorites
            .migrations()
            .into_iter()
            .map(|m| ("favorites".to_string(), m))
            .collect();
        db.migrate(&migrations).await.unwrap();

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        favorites.start(&ctx).await.unwrap();
        account.start(&ctx).await.unwrap();
        account
    }

    fn post(uri: &str, body: serde_json::Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn start_requires_started_favorites() {
        let settings = Settings::default();
        let gateways = Gateways::in_memory(&settings.backend);
        let db = Database::open_in_memory().unwrap();
        let account = AccountModule::new(&gateways, Arc::new(FavoritesModule::new()));

        let err = account
            .start(&InitCtx {
                settings: &settings,
                db: &db,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("favorites module"));
    }

    #[tokio::test]
    async fn auth_failures_map_to_statuses() {
        let account = started().await;
        let credentials = json!({"email": "reader@example.com", "password": "secret1"});

        let response = account
            .routes()
            .oneshot(post("/sign-up", credentials.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = account
            .routes()
            .oneshot(post("/sign-up", credentials))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = account
            .routes()
            .oneshot(post(
                "/sign-up",
                json!({"email": "not-an-email", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = account
            .routes()
            .oneshot(post(
                "/sign-in",
                json!({"email": "reader@example.com", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_requires_a_session() {
        let account = started().await;

        let request = HttpRequest::builder().uri("/me").body(Body::empty()).unwrap();
        let response = account.routes().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
