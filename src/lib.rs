pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod parser;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use services::CacheSweeper;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists.");
        }
        return Ok(());
    }

    config.validate()?;

    let serving = matches!(cli.command, None | Some(Commands::Serve));

    let prometheus_handle = if serving && config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_daemon(config, prometheus_handle).await,

        Commands::Search { query, limit } => {
            let query = query.join(" ");
            cli::cmd_search_products(config, &query, limit).await
        }

        Commands::Stats => cli::cmd_stats(&config).await,

        Commands::Purge => cli::cmd_purge(&config).await,

        Commands::Init => Ok(()),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let json = config.observability.json_logs;

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer));

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.extra_field("env", "production")?.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Shopper v{} starting...", env!("CARGO_PKG_VERSION"));

    let shared = Arc::new(SharedState::new(config.clone()).await?);

    let sweeper_handle = CacheSweeper::new(
        shared.system_service.clone(),
        config.cache.purge_interval_minutes,
    )
    .start();

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting Web API on port {}", port);

        let app = api::router(api::create_app_state(shared.clone(), prometheus_handle));
        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("Web Server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    if let Some(handle) = sweeper_handle {
        handle.abort();
    }
    if let Some(handle) = server_handle {
        handle.abort();
    }
    shared.shutdown();
    info!("Stopped");

    Ok(())
}
