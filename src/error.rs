use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Malformed topic '{0}': expected <type>/<location>/<client>")]
    MalformedTopic(String),
    #[error("Cannot encode outbound message: {0}")]
    Encoding(String),
    #[error("Delivery error on '{topic}': {reason}")]
    Delivery { topic: String, reason: String },
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Agent task failed: {0}")]
    TaskFailed(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AgentError {
    pub fn delivery(topic: impl Into<String>, reason: impl ToString) -> Self {
        Self::Delivery {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors caused by a single message or send. Anything else points at the
    /// agent's own environment and is logged at error level.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload(_)
                | Self::MalformedTopic(_)
                | Self::Encoding(_)
                | Self::Delivery { .. }
        )
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
