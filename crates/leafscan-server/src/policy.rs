//! Local-versus-remote arbitration.
//!
//! The local classifier is trusted when the mean of its species and disease
//! confidences reaches the fallback threshold. Below it, and when takeover is
//! enabled, the remote model gets the raw image and the local guess. A remote
//! failure of any kind degrades to the local result with a note attached.
//!
//! Every arbitrated request bumps exactly one of `ai_takeovers` or
//! `ml_predictions`.

use std::time::Duration;

use leafscan_ai::{DualPrediction, dual_model_analysis};
use leafscan_core::ClassificationResult;
use leafscan_remote::{RemoteAnalyzer, parse_analysis, plant_analysis_request};
use leafscan_store::{Counter, UsageLedger};
use tracing::{info, warn};

use crate::error::ApiError;

pub const REMOTE_UNAVAILABLE_NOTE: &str = "AI analysis unavailable - using ML prediction";

/// Guess sent to the remote model when there is no local prediction.
const NO_LOCAL_GUESS: &str = "Unknown - Unknown";

/// Raw upload as forwarded to the remote model.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

pub struct Policy<'a> {
    pub threshold: f64,
    pub takeover: bool,
    pub remote: Option<&'a dyn RemoteAnalyzer>,
    pub timeout: Duration,
    pub usage: &'a dyn UsageLedger,
}

impl Policy<'_> {
    /// Whether a request with no local prediction can still be served.
    pub fn can_serve_without_local(&self) -> bool {
        self.takeover && self.remote.is_some()
    }

    /// Decide between a local prediction and the remote model.
    pub async fn arbitrate(&self, local: &DualPrediction, upload: Upload<'_>) -> ClassificationResult {
        let combined = local.combined_confidence();

        if self.takeover && combined < self.threshold {
            self.usage.record(Counter::AiTakeovers);
            info!(
                combined,
                threshold = self.threshold,
                "low local confidence, handing over to remote model"
            );
            if let Some(result) = self.remote_analysis(upload, &local.guess(), combined).await {
                return result;
            }
            warn!("remote analysis unavailable, falling back to local prediction");
            return dual_model_analysis(local).with_note(REMOTE_UNAVAILABLE_NOTE);
        }

        self.usage.record(Counter::MlPredictions);
        if self.takeover {
            info!(combined, "local confidence sufficient");
        } else {
            info!(combined, "remote takeover disabled, using local prediction");
        }
        dual_model_analysis(local)
    }

    /// Serve a request with no local prediction available.
    pub async fn remote_only(&self, upload: Upload<'_>) -> Result<ClassificationResult, ApiError> {
        if !self.can_serve_without_local() {
            return Err(ApiError::Unavailable("Model not available".into()));
        }
        self.usage.record(Counter::AiTakeovers);
        self.remote_analysis(upload, NO_LOCAL_GUESS, 0.0)
            .await
            .ok_or_else(|| {
                ApiError::Unavailable("AI analysis failed and no local model is available".into())
            })
    }

    /// One remote attempt. Every failure is logged and reported as `None`.
    ///
    /// Token usage is recorded whenever the response carries it, even if the
    /// text then fails to parse.
    pub async fn remote_analysis(
        &self,
        upload: Upload<'_>,
        guess: &str,
        confidence: f64,
    ) -> Option<ClassificationResult> {
        let remote = self.remote?;
        let request = plant_analysis_request(upload.bytes, upload.mime_type, guess, confidence);

        let generation = match remote.generate(&request, self.timeout).await {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "remote analysis failed");
                return None;
            }
        };
        if let Some(usage) = generation.usage {
            self.usage.record_tokens(usage);
        }

        let Some(text) = generation.text else {
            warn!("remote response has no text");
            return None;
        };
        parse_analysis(&text)
    }
}
