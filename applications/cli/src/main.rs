/// Cadence - interactive playback coordinator host
use anyhow::Context;
use cadence_cli::{display, AppConfig, Command, Driver, LibrarySettings, Outcome};
use cadence_playback::{
    BundleResolver, PlaybackCoordinator, VirtualConnector, VirtualEngine,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence playback coordinator driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a catalog and drive playback from line commands
    Play {
        /// Catalog file (TOML); defaults to the bundled sample catalog
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Track to start at (1-based)
        #[arg(short, long, default_value_t = 1)]
        start: usize,

        /// Configuration file path
        #[arg(long, env = "CADENCE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Search a catalog by title or artist
    Search {
        /// Text to look for
        query: String,

        /// Catalog file (TOML); defaults to the bundled sample catalog
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadence_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            catalog,
            start,
            config,
        } => {
            play(catalog, start, config.as_deref()).await?;
        }
        Commands::Search { query, catalog } => {
            search(&query, catalog.as_deref())?;
        }
    }

    Ok(())
}

fn search(query: &str, catalog: Option<&Path>) -> anyhow::Result<()> {
    let catalog = LibrarySettings::default()
        .load_catalog(catalog)
        .context("Failed to load catalog")?;
    let hits = catalog.search(query);

    if hits.is_empty() {
        println!("No tracks match \"{}\"", query.trim());
    }
    for track in hits {
        println!("{}", track);
    }
    Ok(())
}

async fn play(catalog: Option<PathBuf>, start: usize, config: Option<&Path>) -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load(config)?;
    config.validate()?;

    let catalog = config
        .library
        .load_catalog(catalog.as_deref())
        .context("Failed to load catalog")?;
    tracing::info!("Catalog has {} tracks", catalog.len());

    let mut resolver = BundleResolver::new();
    if let Some(dir) = &config.library.bundle_dir {
        resolver = resolver.with_bundle_dir(dir);
    }

    let engine = VirtualEngine::spawn(config.engine.clone());
    let connector = Arc::new(VirtualConnector::new(engine));
    let coordinator = PlaybackCoordinator::with_resolver(
        connector,
        Arc::new(resolver),
        config.coordinator.clone(),
    );
    coordinator.load_playlist(catalog.to_playlist(), start.saturating_sub(1));

    let mut driver = Driver::new(coordinator.clone());
    let mut updates = coordinator.subscribe();
    let mut previous = updates.borrow_and_update().clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type \"help\" for commands.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(Some(command)) => match driver.handle(command) {
                        Outcome::Continue(Some(reply)) => println!("{}", reply),
                        Outcome::Continue(None) => {}
                        Outcome::Quit => break,
                    },
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                for notice in display::describe_change(&previous, &current) {
                    println!("{}", notice);
                }
                previous = current;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    drop(driver);
    coordinator.shutdown().await;
    Ok(())
}
