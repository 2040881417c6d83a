// Event pipeline: link discovery, filtering, dedup/merge, store reconciliation and orchestration

pub mod analysis;
pub mod dedup;
pub mod enrich;
pub mod filter;
pub mod merge;
pub mod notes;
pub mod orchestrator;
pub mod urls;

// Re-export the entry points hosts call directly
pub use analysis::{analyze_event_action, reconcile, Decision, EventAnalysis};
pub use dedup::{create_event_key, deduplicate_events};
pub use filter::{filter_bear_events, filter_future_events};
pub use merge::{merge_events, MergeDiff};
pub use orchestrator::{ParserRunResult, ProcessingResults, SharedCore};
