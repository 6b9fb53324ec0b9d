use std::sync::Arc;

use clap::{Parser, Subcommand};
use gitscope::{
    config::AppConfig,
    github::GitHubSearcher,
    monitor::cycle::MonitorCycle,
    notification::TelegramNotifier,
    scheduler::run_scheduler,
    state::StateStore,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing app.yaml.
    #[arg(long)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the monitoring scheduler.
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run(cli.config_dir.as_deref()).await?,
    }

    Ok(())
}

async fn run(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::info!(
        keywords = ?config.keywords,
        state_file = %config.state_file_path.display(),
        polling_interval_secs = config.polling_interval_secs.as_secs(),
        "Configuration loaded"
    );

    let mut store = StateStore::new(&config.state_file_path);
    store.load().await;
    tracing::info!(
        repo_count = store.state().repos.len(),
        version = store.state().meta.version,
        "GitScope initialized"
    );

    let searcher = Arc::new(GitHubSearcher::new(&config.github_token, &config.http_retry)?);
    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram_bot_token,
        &config.telegram_chat_id,
        &config.http_retry,
    )?);

    let mut cycle = MonitorCycle::new(&config, searcher, notifier, store);

    // Listen for SIGINT/SIGTERM and cancel the scheduler on either.
    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to register SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
            _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
        }

        signal_token.cancel();
    });

    run_scheduler(config.polling_interval_secs, cancellation_token, &mut cycle).await;

    cycle.shutdown().await;
    tracing::info!("GitScope shutdown complete");
    Ok(())
}
