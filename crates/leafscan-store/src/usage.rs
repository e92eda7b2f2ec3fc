//! Request and token counters.
//!
//! Session counters live in atomics and are bumped from request handlers
//! without locking. Lifetime totals come from the stats file at startup and
//! are only written back on save. The file layout is flat JSON:
//!
//! ```json
//! {
//!   "predictions": 3, "chat_messages": 1, "ai_takeovers": 1, "ml_predictions": 2,
//!   "total_requests": 9, "errors": 0,
//!   "tokens_used": 1400, "tokens_input": 1300, "tokens_output": 100,
//!   "start_time": "2026-10-19T08:12:00+00:00",
//!   "total_lifetime": { "predictions": 120, ... }
//! }
//! ```
//!
//! Only `total_lifetime` is read back; the top-level session figures are
//! informational.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use leafscan_core::TokenUsage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::StoreError;

/// A single-step counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Predictions,
    ChatMessages,
    AiTakeovers,
    MlPredictions,
    TotalRequests,
    Errors,
}

/// A full set of usage figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageCounters {
    pub predictions: u64,
    pub chat_messages: u64,
    pub ai_takeovers: u64,
    pub ml_predictions: u64,
    pub total_requests: u64,
    pub errors: u64,
    pub tokens_used: u64,
    pub tokens_input: u64,
    pub tokens_output: u64,
}

impl UsageCounters {
    pub fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Predictions => self.predictions,
            Counter::ChatMessages => self.chat_messages,
            Counter::AiTakeovers => self.ai_takeovers,
            Counter::MlPredictions => self.ml_predictions,
            Counter::TotalRequests => self.total_requests,
            Counter::Errors => self.errors,
        }
    }

    /// Field-wise saturating sum.
    pub fn merged(&self, other: &UsageCounters) -> UsageCounters {
        UsageCounters {
            predictions: self.predictions.saturating_add(other.predictions),
            chat_messages: self.chat_messages.saturating_add(other.chat_messages),
            ai_takeovers: self.ai_takeovers.saturating_add(other.ai_takeovers),
            ml_predictions: self.ml_predictions.saturating_add(other.ml_predictions),
            total_requests: self.total_requests.saturating_add(other.total_requests),
            errors: self.errors.saturating_add(other.errors),
            tokens_used: self.tokens_used.saturating_add(other.tokens_used),
            tokens_input: self.tokens_input.saturating_add(other.tokens_input),
            tokens_output: self.tokens_output.saturating_add(other.tokens_output),
        }
    }

    /// `count` as a percentage of `predictions`; zero when there are none.
    pub fn share_of_predictions(&self, count: u64) -> f64 {
        if self.predictions == 0 {
            0.0
        } else {
            count as f64 / self.predictions as f64 * 100.0
        }
    }
}

/// Point-in-time view for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSnapshot {
    pub session: UsageCounters,
    pub lifetime: UsageCounters,
    pub started_at: DateTime<Utc>,
}

/// Where handlers report usage.
pub trait UsageLedger: Send + Sync {
    fn record(&self, counter: Counter);
    fn record_tokens(&self, usage: TokenUsage);
    fn snapshot(&self) -> UsageSnapshot;
}

/// Lock-free session counters.
#[derive(Debug, Default)]
pub struct AtomicCounters {
    predictions: AtomicU64,
    chat_messages: AtomicU64,
    ai_takeovers: AtomicU64,
    ml_predictions: AtomicU64,
    total_requests: AtomicU64,
    errors: AtomicU64,
    tokens_used: AtomicU64,
    tokens_input: AtomicU64,
    tokens_output: AtomicU64,
}

impl AtomicCounters {
    fn slot(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Predictions => &self.predictions,
            Counter::ChatMessages => &self.chat_messages,
            Counter::AiTakeovers => &self.ai_takeovers,
            Counter::MlPredictions => &self.ml_predictions,
            Counter::TotalRequests => &self.total_requests,
            Counter::Errors => &self.errors,
        }
    }

    pub fn incr(&self, counter: Counter) {
        self.slot(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tokens(&self, usage: TokenUsage) {
        self.tokens_used.fetch_add(usage.total, Ordering::Relaxed);
        self.tokens_input.fetch_add(usage.input, Ordering::Relaxed);
        self.tokens_output.fetch_add(usage.output, Ordering::Relaxed);
    }

    pub fn load(&self) -> UsageCounters {
        self.read(|a| a.load(Ordering::Relaxed))
    }

    /// Read every counter and reset it to zero.
    pub fn drain(&self) -> UsageCounters {
        self.read(|a| a.swap(0, Ordering::Relaxed))
    }

    fn read(&self, f: impl Fn(&AtomicU64) -> u64) -> UsageCounters {
        UsageCounters {
            predictions: f(&self.predictions),
            chat_messages: f(&self.chat_messages),
            ai_takeovers: f(&self.ai_takeovers),
            ml_predictions: f(&self.ml_predictions),
            total_requests: f(&self.total_requests),
            errors: f(&self.errors),
            tokens_used: f(&self.tokens_used),
            tokens_input: f(&self.tokens_input),
            tokens_output: f(&self.tokens_output),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct StatsFile {
    #[serde(flatten)]
    session: UsageCounters,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    total_lifetime: UsageCounters,
}

/// Session counters plus persisted lifetime totals.
pub struct UsageTracker {
    session: AtomicCounters,
    lifetime: Mutex<UsageCounters>,
    started_at: DateTime<Utc>,
    path: Option<PathBuf>,
}

impl UsageTracker {
    /// Tracker backed by `path`. Lifetime totals are read from it when it
    /// exists; a missing or unreadable file starts from zero.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lifetime = match read_lifetime(&path) {
            Ok(Some(lifetime)) => {
                info!(
                    path = %path.display(),
                    predictions = lifetime.predictions,
                    "loaded lifetime usage"
                );
                lifetime
            }
            Ok(None) => UsageCounters::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not load usage stats, starting from zero");
                UsageCounters::default()
            }
        };
        Self::with_lifetime(lifetime, Some(path))
    }

    /// Tracker that never touches disk.
    pub fn in_memory() -> Self {
        Self::with_lifetime(UsageCounters::default(), None)
    }

    fn with_lifetime(lifetime: UsageCounters, path: Option<PathBuf>) -> Self {
        Self {
            session: AtomicCounters::default(),
            lifetime: Mutex::new(lifetime),
            started_at: Utc::now(),
            path,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lifetime(&self) -> UsageCounters {
        match self.lifetime.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Checkpoint the file without folding in memory.
    ///
    /// The written `total_lifetime` already includes the running session, so
    /// a crash after a checkpoint loses at most what came after it. In-memory
    /// lifetime totals are untouched and `finalize` still counts the session
    /// once.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let session = self.session.load();
        let file = StatsFile {
            session,
            start_time: Some(self.started_at.to_rfc3339()),
            total_lifetime: self.lifetime().merged(&session),
        };
        write_atomic(path, &serde_json::to_vec_pretty(&file)?)?;
        Ok(())
    }

    /// Fold the session into the lifetime totals and save.
    ///
    /// The session is reset as it is folded, so calling this twice does not
    /// double-count.
    pub fn finalize(&self) -> Result<(), StoreError> {
        let session = self.session.drain();
        let lifetime = {
            let mut guard = match self.lifetime.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = guard.merged(&session);
            *guard
        };
        info!(
            session_predictions = session.predictions,
            lifetime_predictions = lifetime.predictions,
            "folded session usage into lifetime"
        );

        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = StatsFile {
            session,
            start_time: Some(self.started_at.to_rfc3339()),
            total_lifetime: lifetime,
        };
        write_atomic(path, &serde_json::to_vec_pretty(&file)?)?;
        Ok(())
    }
}

impl UsageLedger for UsageTracker {
    fn record(&self, counter: Counter) {
        self.session.incr(counter);
    }

    fn record_tokens(&self, usage: TokenUsage) {
        self.session.add_tokens(usage);
    }

    fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            session: self.session.load(),
            lifetime: self.lifetime(),
            started_at: self.started_at,
        }
    }
}

fn read_lifetime(path: &Path) -> Result<Option<UsageCounters>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let file: StatsFile = serde_json::from_slice(&bytes)?;
    Ok(Some(file.total_lifetime))
}

/// Write via a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
