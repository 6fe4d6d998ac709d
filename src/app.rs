//! Application bootstrap: database, module lifecycle and the HTTP server.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bookstore_db::{Database, SqliteFavoriteStore, FAVORITES_MIGRATION};
use bookstore_kernel::gateway::Gateways;
use bookstore_kernel::settings::{DatabaseSettings, Settings};
use bookstore_kernel::{InitCtx, ModuleRegistry};

use crate::modules::{self, favorites::FavoritesRepository};

/// Open the configured favorites database.
pub fn open_database(settings: &DatabaseSettings) -> anyhow::Result<Database> {
    let db = if settings.is_in_memory() {
        Database::open_in_memory()
    } else {
        Database::open(Path::new(&settings.path))
    };
    db.with_context(|| format!("failed to open database '{}'", settings.path))
}

/// Apply every pending migration contributed by `registry`.
pub async fn migrate(db: &Database, registry: &ModuleRegistry) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = db
        .migrate(&migrations)
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, total = migrations.len(), "migrations applied");
    Ok(applied)
}

/// Favorites repository over the configured database, without starting the
/// rest of the application.
pub async fn open_favorites(settings: &Settings) -> anyhow::Result<FavoritesRepository> {
    let db = open_database(&settings.database)?;
    db.migrate(&[("favorites".to_string(), FAVORITES_MIGRATION)])
        .await
        .context("failed to apply favorites migration")?;
    let store = SqliteFavoriteStore::open(db)
        .await
        .context("failed to open favorites store")?;
    Ok(FavoritesRepository::new(Arc::new(store)))
}

/// A fully started application.
pub struct App {
    settings: Settings,
    registry: ModuleRegistry,
    db: Database,
}

impl App {
    /// Register modules, then init, migrate and start them.
    pub async fn bootstrap(settings: Settings, gateways: Gateways) -> anyhow::Result<Self> {
        let db = open_database(&settings.database)?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &gateways);

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_modules(&ctx).await?;
        migrate(&db, &registry).await?;
        registry.start_modules(&ctx).await?;

        tracing::info!(
            modules = registry.module_count(),
            database = %settings.database.path,
            "application started"
        );
        Ok(Self {
            settings,
            registry,
            db,
        })
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn router(&self) -> Router {
        bookstore_http::build_router(&self.registry, &self.settings)
    }

    /// Serve HTTP until `shutdown` resolves, then stop every module.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = bookstore_http::start_server(&self.registry, &self.settings, shutdown).await;
        let stopped = self.registry.stop_modules().await;
        served?;
        stopped
    }
}

/// Start the application and serve until ctrl-c.
pub async fn run(settings: Settings, gateways: Gateways) -> anyhow::Result<()> {
    App::bootstrap(settings, gateways)
        .await?
        .serve(shutdown_signal())
        .await
}

/// Resolves on ctrl-c. If the handler cannot be installed the server keeps
/// running until killed.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use bookstore_kernel::settings::IN_MEMORY_DATABASE;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn in_memory_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.path = IN_MEMORY_DATABASE.to_string();
        settings
    }

    async fn app() -> App {
        let settings = in_memory_settings();
        let gateways = Gateways::in_memory(&settings.backend);
        App::bootstrap(settings, gateways).await.unwrap()
    }

    async fn send(router: &Router, request: HttpRequest<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_once() {
        let app = app().await;
        assert_eq!(app.registry().module_count(), 4);
        assert_eq!(migrate(app.database(), app.registry()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn favorites_round_trip_over_http() {
        let app = app().await;
        let router = app.router();

        let add = HttpRequest::builder()
            .method("POST")
            .uri("/api/favorites")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"id": "1", "title": "War and Peace", "author": "Tolstoy", "price": 24.99})
                    .to_string(),
            ))
            .unwrap();
        let (status, _) = send(&router, add).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let mut visible = false;
        for _ in 0..50 {
            let status = HttpRequest::builder()
                .uri("/api/favorites/1/status")
                .body(Body::empty())
                .unwrap();
            let (_, body) = send(&router, status).await;
            if body["favorite"] == true {
                visible = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(visible, "favorite never became visible");

        let missing = HttpRequest::builder()
            .uri("/api/books/unknown")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, missing).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn sign_out_clears_cached_favorites() {
        let app = app().await;
        let router = app.router();

        let sign_up = HttpRequest::builder()
            .method("POST")
            .uri("/api/account/sign-up")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"email": "reader@example.com", "password": "secret1"}).to_string(),
            ))
            .unwrap();
        let (status, user) = send(&router, sign_up).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["email"], "reader@example.com");

        let repository = open_favorites_for(&app).await;
        repository
            .add(&crate::modules::books::models::Book {
                id: "1".into(),
                title: "War and Peace".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let sign_out = HttpRequest::builder()
            .method("POST")
            .uri("/api/account/sign-out")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, sign_out).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!repository.is_favorite("1").await.unwrap());
    }

    async fn open_favorites_for(app: &App) -> FavoritesRepository {
        let store = SqliteFavoriteStore::open(app.database().clone())
            .await
            .unwrap();
        FavoritesRepository::new(Arc::new(store))
    }
}
