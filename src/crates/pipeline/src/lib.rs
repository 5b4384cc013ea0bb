//! Detection runs: the graph session, the staged detector and the summary report.

pub mod report;
pub mod runner;
pub mod session;

pub use report::{DetectionRatings, RunReport, SUMMARY_FILE, StageMillis, append_section};
pub use runner::{DetectionOutcome, Detector, PipelineError, StageTimings};
pub use session::GraphSession;
