pub mod completion_service;
pub mod content_service;
pub mod heart_service;
pub mod report_service;
pub mod scoring_service;
pub mod session_service;
pub mod stats_service;

pub use completion_service::CompletionTracker;
pub use content_service::{ContentProvider, HttpContentProvider};
pub use heart_service::{HeartAccountant, HeartAuthority, HttpHeartAuthority};
pub use report_service::{CompletionReport, HttpProgressReporter, ProgressReporter, ReportService};
pub use scoring_service::compute_score;
pub use session_service::SessionEngine;
pub use stats_service::StatsService;
