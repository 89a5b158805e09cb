pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod engine;
pub mod fetcher;
pub mod merge;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod staging;
pub mod status;

pub use control::CancelToken;
pub use engine::{run, ChaosPlan, DownloadReport, DownloadRequest, EngineError};
pub use progress::ProgressSnapshot;
