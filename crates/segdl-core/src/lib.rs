pub mod config;
pub mod logging;

pub mod control;
pub mod job;
pub mod resume;
pub mod retry;
pub mod scheduler;
pub mod segmenter;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use control::JobState;
pub use job::{DownloadJob, JobError, JobOptions};
