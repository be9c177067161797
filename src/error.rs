/// Failure of a single browser interaction.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("webdriver transport failed: {0}")]
    Transport(String),

    #[error("webdriver error {name}: {message}")]
    Protocol { name: String, message: String },

    #[error("webdriver HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{action} timed out after {millis}ms")]
    Timeout { action: &'static str, millis: u64 },

    #[error("webdriver response decode failed: {0}")]
    Decode(String),

    #[error("webdriver startup failed: {0}")]
    Startup(String),

    #[error("stale or unknown element: {0}")]
    StaleElement(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Run-aborting failures.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
