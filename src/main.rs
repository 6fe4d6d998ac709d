use anyhow::Context;
use bookstore_kernel::{gateway::Gateways, settings::Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "bookstore-app bootstrap starting"
    );
    tracing::warn!("using in-memory auth, document and blob gateways");

    let gateways = Gateways::in_memory(&settings.backend);
    bookstore_app::run(settings, gateways).await
}
