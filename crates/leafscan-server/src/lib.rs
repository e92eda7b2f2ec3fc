//! leafscan HTTP service: local classification with a remote fallback,
//! usage accounting and a stats dashboard.

pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod policy;
pub mod routes;
pub mod state;

pub use app::{build_state, load_classifier, router, serve_until};
pub use config::{Cli, Command, ServeArgs, Settings};
pub use error::ApiError;
pub use state::{AppState, SharedState};
