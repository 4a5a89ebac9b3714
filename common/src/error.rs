use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("failed to read response body: {0}")]
    Body(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Temperature data not found")]
    MarkerNotFound,
    #[error("End tag not found")]
    TerminatorNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("HTTP GET failed {attempts} times, restarting")]
    RetriesExhausted { attempts: u32 },
}
