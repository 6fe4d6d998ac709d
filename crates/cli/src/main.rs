//! Bookstore command-line entrypoint: run the server, apply migrations and
//! inspect the local favorites cache.

use anyhow::Context;
use bookstore_app::app;
use bookstore_kernel::{gateway::Gateways, settings::Settings, ModuleRegistry};
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(about = "Bookstore server and favorites cache tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Favorites database path, overriding configuration (`:memory:` allowed)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Inspect or reset the local favorites cache
    #[command(subcommand)]
    Favorites(FavoritesCommand),
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// Print cached favorites as JSON
    List,
    /// Remove every cached favorite
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    if let Some(path) = cli.database {
        settings.database.path = path;
    }
    if cli.verbose {
        settings.telemetry.filter = "debug".to_string();
    } else if !matches!(cli.command, Command::Serve) {
        settings.telemetry.filter = "warn".to_string();
    }
    bookstore_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => {
            tracing::warn!("using in-memory auth, document and blob gateways");
            let gateways = Gateways::in_memory(&settings.backend);
            app::run(settings, gateways).await
        }
        Command::Migrate => migrate(&settings).await,
        Command::Favorites(FavoritesCommand::List) => list_favorites(&settings).await,
        Command::Favorites(FavoritesCommand::Clear) => clear_favorites(&settings).await,
    }
}

async fn migrate(settings: &Settings) -> anyhow::Result<()> {
    let db = app::open_database(&settings.database)?;
    let mut registry = ModuleRegistry::new();
    bookstore_app::register_all(&mut registry, &Gateways::in_memory(&settings.backend));

    let applied = app::migrate(&db, &registry).await?;
    println!("applied {applied} migration(s) to {}", settings.database.path);
    Ok(())
}

async fn list_favorites(settings: &Settings) -> anyhow::Result<()> {
    let repository = app::open_favorites(settings).await?;
    let books = repository
        .all_favorites()
        .next()
        .await
        .context("favorites stream closed before the first snapshot")?;

    let json = serde_json::to_string_pretty(&books).context("failed to encode favorites")?;
    println!("{json}");
    Ok(())
}

async fn clear_favorites(settings: &Settings) -> anyhow::Result<()> {
    let repository = app::open_favorites(settings).await?;
    repository.clear().await?;
    println!("favorites cleared");
    Ok(())
}
