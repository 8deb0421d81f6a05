use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Local form/input check failed; the message is shown to the user as is.
    #[error("{0}")]
    Validation(String),
    /// The backend answered but refused the request (bad credentials, taken username, ...).
    #[error("{0}")]
    Rejected(String),
    #[error("HTTP {0}")]
    Http(u16),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("real-time channel is closed")]
    ChannelClosed,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Text suitable for a toast. Transport failures collapse to a generic line.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::Rejected(msg) => msg.clone(),
            _ => "An error occurred. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_transport_details() {
        assert_eq!(Error::validation("Username is required").user_message(), "Username is required");
        assert_eq!(Error::Rejected("Incorrect Username or Password".into()).user_message(), "Incorrect Username or Password");
        assert_eq!(Error::Http(500).user_message(), "An error occurred. Please try again.");
        assert!(Error::validation("x").is_validation());
        assert!(!Error::ChannelClosed.is_validation());
    }
}
