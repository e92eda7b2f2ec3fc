use std::sync::Arc;

use leafscan_ai::{ClassifierAdapter, LabelSet, Preprocessor};
use leafscan_remote::RemoteAnalyzer;
use leafscan_store::UsageLedger;

use crate::config::Settings;
use crate::policy::Policy;

/// Everything a handler can reach. Built once at startup.
pub struct AppState {
    /// `None` when local inference is disabled or the model failed to load.
    pub classifier: Option<ClassifierAdapter>,
    pub labels: Arc<LabelSet>,
    pub preprocessor: Preprocessor,
    /// `None` unless both endpoint URL and key are configured.
    pub remote: Option<Arc<dyn RemoteAnalyzer>>,
    pub usage: Arc<dyn UsageLedger>,
    pub settings: Settings,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn remote_available(&self) -> bool {
        self.remote.is_some()
    }

    /// The classifier, if local inference should run for this request.
    pub fn local_classifier(&self) -> Option<&ClassifierAdapter> {
        if self.settings.ml_enabled {
            self.classifier.as_ref()
        } else {
            None
        }
    }

    pub fn policy(&self) -> Policy<'_> {
        Policy {
            threshold: self.settings.fallback_threshold,
            takeover: self.settings.ai_takeover,
            remote: self.remote.as_deref(),
            timeout: self.settings.analysis_timeout,
            usage: self.usage.as_ref(),
        }
    }
}
