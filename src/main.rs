//! pinsmith - Pinterest pin-publishing automation
//!
//! Wires configuration, tracing, and the publishing engine behind a small
//! CLI: `login` establishes and persists a session, `publish` creates a
//! pin with board resolution, `status` reports the stored session.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pinsmith_config::{Config, ConfigLoader};
use pinsmith_matcher::GeminiBoardMatcher;
use pinsmith_media::MediaStager;
use pinsmith_protocols::matcher::{BoardMatcher, NoSemanticMatch};
use pinsmith_protocols::types::{Credentials, PinRequest};
use pinsmith_publisher::{EngineConfig, PublishEngine};
use pinsmith_session::FileSessionStore;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = if cli.config.exists() {
        ConfigLoader::load(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "no config file; using defaults");
        Config::default()
    };

    let store = Arc::new(FileSessionStore::new(config.session.resolved_dir()));
    let matcher: Arc<dyn BoardMatcher> = match config.matcher.api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            Arc::new(GeminiBoardMatcher::new(key, config.matcher.model.clone()))
        }
        _ => {
            warn!("no matcher API key configured; semantic board matching disabled");
            Arc::new(NoSemanticMatch)
        }
    };
    let stager = MediaStager::new(config.media.min_width);
    let engine = PublishEngine::new(engine_config(&config), store, matcher, stager);

    match cli.command {
        Commands::Login {
            user,
            email,
            password_env,
        } => {
            let password = std::env::var(&password_env).map_err(|_| {
                anyhow::anyhow!("environment variable {password_env} is not set")
            })?;
            engine.login(&user, &Credentials { email, password }).await?;
            println!("Session saved for {user}");
        }

        Commands::Publish {
            user,
            title,
            board,
            description,
            image,
            scheduled_at,
        } => {
            let request = PinRequest {
                title,
                description,
                image_ref: image,
                board,
                scheduled_time: scheduled_at,
            };
            engine.publish(&user, &request).await?;
            println!("Pin published for {user}");
        }

        Commands::Status { user } => {
            let status = engine.session_status(&user).await?;
            if status.active {
                match status.last_modified {
                    Some(at) => println!("Session present for {user} (saved {at})"),
                    None => println!("Session present for {user}"),
                }
            } else {
                println!("No session for {user}; run `pinsmith login` first");
            }
        }
    }

    Ok(())
}

fn engine_config(config: &Config) -> EngineConfig {
    EngineConfig {
        home_url: config.pinterest.home_url(),
        login_url: config.pinterest.login_url(),
        composer_url: config.pinterest.composer_url(),
        chrome_path: config.browser.chrome_path.clone(),
        headless: config.browser.headless,
        navigation_timeout: config.browser.navigation_timeout(),
        selector_timeout: config.browser.selector_timeout(),
        probe_timeout: config.browser.probe_timeout(),
        settle: config.browser.settle(),
    }
}

fn pinsmith_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pinsmith")
}

fn init_tracing() -> anyhow::Result<()> {
    let log_dir = pinsmith_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pinsmith")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard must outlive the program for buffered lines to flush
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(())
}
