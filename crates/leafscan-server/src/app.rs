use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use leafscan_ai::{ClassifierAdapter, LabelSet, Preprocessor};
use leafscan_remote::{GeminiClient, RemoteAnalyzer};
use leafscan_store::{UsageLedger, UsageTracker};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServeArgs;
use crate::routes;
use crate::state::{AppState, SharedState};

pub const DASHBOARD_PATH: &str = "/secret-stats-dashboard-x9k2m";

pub fn router(state: SharedState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/labels", get(routes::labels))
        .route("/predict", post(routes::predict))
        .route("/chat", post(routes::chat))
        .route(DASHBOARD_PATH, get(routes::stats_dashboard))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Assemble state from configuration and an already-loaded classifier.
pub fn build_state(
    args: &ServeArgs,
    labels: Arc<LabelSet>,
    classifier: Option<ClassifierAdapter>,
    usage: Arc<dyn UsageLedger>,
) -> AppState {
    let remote = GeminiClient::from_config(args.llm_url.as_deref(), args.llm_api_key.as_deref())
        .map(|c| {
            info!(url = %c.url(), "remote analysis configured");
            Arc::new(c) as Arc<dyn RemoteAnalyzer>
        });
    if remote.is_none() {
        warn!("remote analysis not configured (set LLM_URL and LLM_API_KEY)");
    }

    AppState {
        classifier,
        labels,
        preprocessor: Preprocessor::new(args.image_size).with_scale(args.pixel_scale.into()),
        remote,
        usage,
        settings: args.settings(),
    }
}

/// Load the local classifier, or `None` when inference is disabled or the
/// model cannot be loaded.
pub fn load_classifier(args: &ServeArgs, labels: Arc<LabelSet>) -> Option<ClassifierAdapter> {
    if !args.ml_enabled {
        info!("local inference disabled, model not loaded");
        return None;
    }

    #[cfg(feature = "onnx")]
    {
        match leafscan_ai::OnnxModel::load(&args.model) {
            Ok(model) => Some(ClassifierAdapter::new(Arc::new(model), labels)),
            Err(e) => {
                tracing::error!(model = %args.model.display(), error = %e, "failed to load model");
                None
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = labels;
        warn!(
            model = %args.model.display(),
            "built without the `onnx` feature, local inference unavailable"
        );
        None
    }
}

/// Serve `app` until `shutdown` resolves, then fold the session into the
/// lifetime usage file.
///
/// With `checkpoint_every`, usage is also saved on that interval while the
/// server runs. The final fold happens even when the server fails; its error
/// is returned afterwards.
pub async fn serve_until(
    listener: TcpListener,
    app: Router,
    tracker: Arc<UsageTracker>,
    checkpoint_every: Option<Duration>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let checkpoints =
        checkpoint_every.map(|every| tokio::spawn(checkpoint(Arc::clone(&tracker), every)));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    if let Err(e) = &served {
        error!(error = %e, "server stopped with an error");
    }
    if let Some(task) = checkpoints {
        task.abort();
        // A checkpoint racing the final fold would write the session twice.
        let _ = task.await;
    }

    match tracker.finalize() {
        Ok(()) => info!(path = ?tracker.path(), "usage stats saved"),
        Err(e) => error!(path = ?tracker.path(), error = %e, "failed to save usage stats"),
    }
    served
}

async fn checkpoint(tracker: Arc<UsageTracker>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Err(e) = tracker.save() {
            warn!(error = %e, "usage checkpoint failed");
        }
    }
}
