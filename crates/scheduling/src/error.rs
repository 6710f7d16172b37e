//! Error taxonomy for schedule configuration and invocation.

/// Errors raised while configuring or invoking a schedule entry.
///
/// Configuration errors ([`InvalidCron`](ScheduleError::InvalidCron),
/// [`InvalidInterval`](ScheduleError::InvalidInterval)) surface synchronously
/// at build time, never during a tick. Invoke-time errors propagate to the
/// driver uncaught; the entry performs no retries of its own.
#[derive(thiserror::Error, Debug)]
pub enum ScheduleError {
    /// Malformed 5-field cron expression.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Sub-minute interval outside 1..=59 seconds.
    #[error("invalid interval: {0}s (must be 1-59)")]
    InvalidInterval(u32),

    /// The resolver could not produce a job instance for the configured tag.
    #[error("resolution failed for job '{tag}': {message}")]
    Resolution { tag: String, message: String },

    /// The invoked work itself failed.
    #[error("job execution failed: {0}")]
    Execution(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
