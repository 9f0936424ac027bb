//! # Server Binary Entry Point
//!
//! Thin wrapper that wires the CMS together and serves it.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin server -- --config config/cms.toml
//! ```
//!
//! The server will:
//! 1. Load configuration from the specified TOML file
//! 2. Open the database and create the main user and site on first start
//! 3. Load the available themes
//! 4. Build the mailer and the image pipeline
//! 5. Start the session sweeper and the HTTP listener

use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;
use std::sync::Arc;

use onepage_cms::common::config::CmsConfig;
use onepage_cms::mail::mailer_from_config;
use onepage_cms::processing::JpegBackend;
use onepage_cms::server::themes::ThemeRegistry;
use onepage_cms::server::{build_router, AppState};
use onepage_cms::store::{Database, MAIN_SITE_ID};

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    #[arg(short, long, default_value = "config/cms.toml")]
    config: String,
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// INFO by default, overridable through `RUST_LOG`.
/// Format: `[HH:MM:SS] [LEVEL] message`
fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let config = CmsConfig::from_file(&args.config)?;
    info!("🚀 Starting CMS with {}", args.config);

    let db = Database::open(&config.database.path)?;
    let (user, site) = db.bootstrap(&config.bootstrap)?;
    info!("🏠 Main site {} owned by {}", site.id, user.email);
    config.images.site_dir(MAIN_SITE_ID)?;

    let themes = ThemeRegistry::load(&config.themes.dir)?;
    let mailer = mailer_from_config(&config.mail);
    let backend = Arc::new(JpegBackend::new(config.images.jpeg_quality));

    let address = config.server.address.clone();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(db),
        mailer,
        backend,
        themes,
    ));
    state.sessions.spawn_sweeper();

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 Web server running on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
