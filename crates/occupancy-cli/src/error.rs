use thiserror::Error;

/// Main error type for the occupancy monitor
#[derive(Error, Debug)]
pub enum OccupancyError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: expected 6 locations, found {found}")]
    ParseIncomplete { found: usize },

    #[error("Parse error: {0}")]
    ParseValue(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Startup data error: {0}")]
    StartupData(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OccupancyError>;

impl OccupancyError {
    /// Create a fetch error from a message
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a publish error from a message
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Create a startup data error from a message
    pub fn startup_data(msg: impl Into<String>) -> Self {
        Self::StartupData(msg.into())
    }

    /// Create a storage error from a message
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Render an error for terminal output
pub fn format_user_error(err: &OccupancyError) -> String {
    match err {
        OccupancyError::StartupData(msg) => format!(
            "{msg}\nThe remote dataset cannot be trusted; refusing to continue."
        ),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OccupancyError::fetch("session start failed");
        assert_eq!(err.to_string(), "Fetch error: session start failed");
    }

    #[test]
    fn test_parse_incomplete_display() {
        let err = OccupancyError::ParseIncomplete { found: 4 };
        assert_eq!(err.to_string(), "Parse error: expected 6 locations, found 4");
    }

    #[test]
    fn test_error_constructors() {
        let fetch_err = OccupancyError::fetch("timeout");
        assert!(matches!(fetch_err, OccupancyError::Fetch(_)));

        let publish_err = OccupancyError::publish("sink down");
        assert!(matches!(publish_err, OccupancyError::Publish(_)));

        let startup_err = OccupancyError::startup_data("bad column");
        assert!(matches!(startup_err, OccupancyError::StartupData(_)));

        let config_err = OccupancyError::config("missing url");
        assert!(matches!(config_err, OccupancyError::Config(_)));
    }

    #[test]
    fn test_startup_error_user_format() {
        let err = OccupancyError::startup_data("corrupt column");
        let rendered = format_user_error(&err);
        assert!(rendered.contains("corrupt column"));
        assert!(rendered.contains("refusing to continue"));
    }
}
