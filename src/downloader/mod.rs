pub mod batch;
pub mod progress;
pub mod task;

pub use batch::{BatchDownloader, DEFAULT_WINDOW};
pub use progress::MilestoneTracker;
pub use task::{BatchReport, DownloadTask, ProgressMode};
