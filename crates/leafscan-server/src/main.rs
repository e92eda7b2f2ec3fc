use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use leafscan_ai::LabelSet;
use leafscan_server::{
    Cli, Command, ServeArgs, build_state, load_classifier, models, router, serve_until,
};
use leafscan_store::{UsageLedger, UsageTracker};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Models(args) => models::run(&args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("leafscan v{}", env!("CARGO_PKG_VERSION"));

    let labels = Arc::new(LabelSet::load(&args.species_labels, &args.disease_labels));
    let classifier = load_classifier(&args, Arc::clone(&labels));
    let tracker = Arc::new(UsageTracker::open(&args.stats_file));
    let usage: Arc<dyn UsageLedger> = tracker.clone();

    let state = build_state(&args, labels, classifier, usage);
    info!(
        model_loaded = state.model_loaded(),
        species = state.labels.species_count(),
        diseases = state.labels.disease_count(),
        ai_takeover = state.settings.ai_takeover,
        threshold = state.settings.fallback_threshold,
        ml_enabled = state.settings.ml_enabled,
        "service configured"
    );

    let app = router(Arc::new(state));
    let addr = args.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");

    let checkpoint_every = (args.stats_save_secs > 0).then(|| Duration::from_secs(args.stats_save_secs));
    serve_until(listener, app, tracker, checkpoint_every, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
