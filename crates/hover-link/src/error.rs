use std::time::Duration;

use hover_proto::CommandError;

/// Failures of the command link. Callers branch on these; none of them is
/// fatal on its own.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("command socket not open")]
    NotConnected,

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("malformed: {0}")]
    Malformed(String),
}

impl From<CommandError> for TransportError {
    fn from(e: CommandError) -> Self {
        TransportError::Malformed(e.to_string())
    }
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}
