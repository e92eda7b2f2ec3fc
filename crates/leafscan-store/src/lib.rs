//! Usage accounting: per-process session counters and lifetime totals kept
//! in a flat JSON file across restarts.

mod error;
pub use error::StoreError;

pub mod usage;
pub use usage::{AtomicCounters, Counter, UsageCounters, UsageLedger, UsageSnapshot, UsageTracker};
