use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Config JSON error: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("Config JSON5 error: {0}")]
    ConfigJson5(#[from] json5::Error),
    #[error("Detector backend error: {0}")]
    Backend(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Session closed")]
    SessionClosed,
}

impl ScanError {
    pub fn backend<E: std::fmt::Display>(e: E) -> Self {
        ScanError::Backend(e.to_string())
    }
}
