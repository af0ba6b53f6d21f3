//! CLI entry point for the SMHI weather-warning monitor.
//!
//! Provides subcommands for watching the warning feed continuously, running
//! a single filtered check, and listing districts and message categories.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use smhi_alerts::{
    aggregate::build_snapshot,
    categories::MESSAGE_EVENT_CATEGORIES,
    config::{
        CoordinatorSettings, FilterConfig, FilterMode, Language, REQUEST_TIMEOUT,
        WARNINGS_URL, resolve_message_types,
    },
    coordinator::Coordinator,
    districts::fetch_districts,
    fetch::BasicClient,
    filter::ActiveFilter,
    output::print_json,
    parser::parse_feed,
    registry::CoordinatorRegistry,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "smhi_alerts")]
#[command(about = "Monitor SMHI weather warnings for a district or location", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh on a timer and log every published snapshot until Ctrl-C
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Run one refresh cycle against the live feed, a URL, or a local file
    Check {
        #[command(flatten)]
        filter: FilterArgs,

        /// Path to file or URL to fetch (defaults to the SMHI warning feed)
        #[arg(short, long, value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// Print coordinator diagnostics instead of the snapshot
        #[arg(short, long, default_value_t = false)]
        diagnostics: bool,
    },
    /// List warning districts known to SMHI
    Districts,
    /// List message categories that can be selected
    Categories,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Match by district code or by coordinate and radius
    #[arg(long, env = "SMHI_MODE", value_enum, default_value_t = FilterMode::District)]
    mode: FilterMode,

    /// District code, or "all"
    #[arg(long, env = "SMHI_DISTRICT", default_value = "all")]
    district: String,

    #[arg(long, env = "SMHI_LANGUAGE", value_enum, default_value_t = Language::Sv)]
    language: Language,

    #[arg(long, env = "SMHI_LATITUDE", default_value_t = 59.3293, allow_negative_numbers = true)]
    latitude: f64,

    #[arg(long, env = "SMHI_LONGITUDE", default_value_t = 18.0686, allow_negative_numbers = true)]
    longitude: f64,

    /// Search radius in kilometres (coordinate mode)
    #[arg(long, env = "SMHI_RADIUS_KM", default_value_t = smhi_alerts::config::DEFAULT_RADIUS_KM)]
    radius_km: f64,

    /// Ignore warnings for sea areas
    #[arg(long, env = "SMHI_EXCLUDE_SEA", default_value_t = false)]
    exclude_sea: bool,

    /// Include message-tier items such as fire-risk notices
    #[arg(long, env = "SMHI_INCLUDE_MESSAGES", default_value_t = false)]
    include_messages: bool,

    /// Message categories to include (comma separated)
    #[arg(long, env = "SMHI_MESSAGE_TYPES", value_delimiter = ',')]
    message_types: Vec<String>,

    /// Message categories to exclude from the defaults (comma separated)
    #[arg(long, env = "SMHI_EXCLUDED_MESSAGE_TYPES", value_delimiter = ',')]
    excluded_message_types: Vec<String>,
}

impl FilterArgs {
    fn into_config(self) -> Result<FilterConfig> {
        let config = FilterConfig {
            mode: self.mode,
            district: self.district,
            language: self.language,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_km: self.radius_km,
            exclude_sea: self.exclude_sea,
            include_messages: self.include_messages,
            message_types: resolve_message_types(&self.message_types, &self.excluded_message_types),
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/smhi_alerts.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("smhi_alerts.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { filter } => watch(filter.into_config()?).await?,
        Commands::Check {
            filter,
            source,
            diagnostics,
        } => check(filter.into_config()?, source, diagnostics).await?,
        Commands::Districts => {
            let client = BasicClient::new(REQUEST_TIMEOUT)?;
            let districts = fetch_districts(&client).await;
            info!(total = districts.len(), "District list fetched");
            print_json(&districts)?;
        }
        Commands::Categories => {
            print_json(&MESSAGE_EVENT_CATEGORIES)?;
        }
    }

    Ok(())
}

/// Registers a coordinator for `config` and refreshes until Ctrl-C.
#[tracing::instrument(skip(config), fields(unique_id = %config.unique_id()))]
async fn watch(config: FilterConfig) -> Result<()> {
    let client = BasicClient::new(REQUEST_TIMEOUT)?;
    let id = config.unique_id();
    info!(title = %config.title(), "Starting watch");

    let mut registry = CoordinatorRegistry::new();
    registry.insert(
        id.clone(),
        Arc::new(Coordinator::new(client, CoordinatorSettings::default(), config)),
    );
    let coordinator = registry
        .get(&id)
        .context("coordinator missing right after registration")?;
    info!(registered = ?registry.ids().collect::<Vec<_>>(), "Coordinators registered");

    match coordinator.request_refresh().await {
        Ok(outcome) => {
            info!(?outcome, "Initial refresh complete");
            print_json(&*coordinator.current_snapshot())?;
        }
        Err(e) => warn!(error = %e, "Initial refresh failed, will retry"),
    }

    tokio::select! {
        _ = coordinator.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Ctrl-C received, stopping");
        }
    }

    registry.remove(&id);
    Ok(())
}

/// Runs a single refresh cycle and prints the result.
#[tracing::instrument(skip(config))]
async fn check(config: FilterConfig, source: Option<String>, diagnostics: bool) -> Result<()> {
    let url = source.unwrap_or_else(|| WARNINGS_URL.to_string());

    if !url.starts_with("http") {
        let bytes = std::fs::read(&url).with_context(|| format!("reading {url}"))?;
        let feed = parse_feed(&bytes)?;
        let snapshot = build_snapshot(&feed, &ActiveFilter::new(config), Utc::now(), &Local);
        print_json(&snapshot)?;
        return Ok(());
    }

    let client = BasicClient::new(REQUEST_TIMEOUT)?;
    let settings = CoordinatorSettings {
        url,
        ..Default::default()
    };
    let coordinator = Coordinator::new(client, settings, config);

    let result = coordinator.request_refresh().await;
    if diagnostics {
        print_json(&coordinator.diagnostics())?;
    } else {
        print_json(&*coordinator.current_snapshot())?;
    }
    result?;
    Ok(())
}
