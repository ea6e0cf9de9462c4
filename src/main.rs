//! icpulse
//!
//! Command-line entry point:
//! - `serve`: poll every configured metric and expose them over HTTP
//! - `watch`: print one metric's card text whenever it changes
//! - `chart`: fetch the messages chart once
//! - `config`: print or write the default config file

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use icpulse::api::{self, AppState};
use icpulse::client::{HttpMetricsClient, MetricsClient};
use icpulse::config::{generate_default_config, Config, LoggingConfig};
use icpulse::dashboard::Dashboard;
use icpulse::display::{chart_title, format_axis_tick, format_count, DisplayValue};

#[derive(Parser)]
#[command(name = "icpulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live network metrics dashboard backend")]
#[command(long_about = "icpulse polls a public ledger metrics API on fixed intervals and serves\nanimated, error-aware display state for dashboard cards and charts.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pollers and the HTTP API
    Serve,

    /// Print a metric whenever its display changes
    Watch {
        /// Metric name, e.g. block_height
        metric: String,
    },

    /// Fetch the hourly messages chart for the last day
    Chart,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load_with_env(path)?;
            init_tracing(&config.logging);
            tracing::info!("Loaded config from {:?}", path);
            config
        }
        None => {
            let outcome = Config::load_default();
            init_tracing(&outcome.config.logging);
            outcome.log();
            outcome.config
        }
    };

    let client: Arc<dyn MetricsClient> =
        Arc::new(HttpMetricsClient::new(config.source.client_config())?);

    match cli.command {
        Commands::Serve => serve(config, client).await,
        Commands::Watch { metric } => watch(config, client, &metric).await,
        Commands::Chart => chart(config, client).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("icpulse={},tower_http=info", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn write_default_config(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            println!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

async fn serve(
    config: Config,
    client: Arc<dyn MetricsClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting icpulse v{}", env!("CARGO_PKG_VERSION"));

    let dashboard = Arc::new(Dashboard::mount(config.metrics, client, config.source.base_url).await?);
    let api_config = api::ApiConfig::from(&config.api);
    let state = AppState::new(Arc::clone(&dashboard), api_config.clone());

    let result = api::serve(state, &api_config).await;
    dashboard.shutdown();
    result?;

    Ok(())
}

async fn watch(
    config: Config,
    client: Arc<dyn MetricsClient>,
    metric: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings: Vec<_> = config
        .metrics
        .into_iter()
        .filter(|m| m.name == metric)
        .collect();
    if settings.is_empty() {
        return Err(format!("unknown metric '{}'", metric).into());
    }

    let dashboard = Dashboard::mount(settings, client, config.source.base_url).await?;
    let handle = dashboard
        .handle(metric)
        .ok_or_else(|| format!("metric '{}' failed to mount", metric))?;
    let mut updates = handle.subscribe();

    let shutdown = api::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        if let Some(snapshot) = dashboard.get(metric) {
            match snapshot.display {
                DisplayValue::Value { from, to } if from != to => println!(
                    "{}: {} ({} -> {})",
                    snapshot.title,
                    snapshot.display.text(),
                    format_count(from),
                    format_count(to)
                ),
                _ => println!("{}: {}", snapshot.title, snapshot.display.text()),
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }

    dashboard.shutdown();
    Ok(())
}

async fn chart(
    config: Config,
    client: Arc<dyn MetricsClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = Dashboard::mount(Vec::new(), client, config.source.base_url).await?;

    match dashboard.messages_chart().await {
        Ok(buckets) => {
            println!("{}", chart_title("Messages", false));
            for bucket in buckets {
                println!(
                    "{}  {:>10}  {}",
                    bucket.timestamp.format("%Y-%m-%d %H:%M"),
                    format_count(bucket.value),
                    format_axis_tick(bucket.value)
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", chart_title("Messages", true));
            Err(e.into())
        }
    }
}
