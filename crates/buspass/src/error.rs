use std::fmt;

/// Exit status for usage errors (missing or invalid flag values).
pub const EXIT_USAGE: u8 = 1;
/// Exit status for every other failure.
pub const EXIT_FATAL: u8 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum BuspassError {
    /// A required flag value is missing or out of range.
    Usage {
        message: String,
    },
    /// The message body could not be read.
    Payload {
        context: String,
        reason: String,
    },
    /// No credential source produced a token.
    Credential {
        context: String,
        reason: String,
    },
    /// Client or sender construction failed.
    Connection {
        context: String,
        reason: String,
    },
    Send {
        entity: String,
        attempt: u32,
        repeat: u32,
        reason: String,
    },
    /// A client or sender was used after being closed.
    Closed {
        resource: String,
    },
}

impl fmt::Display for BuspassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuspassError::Usage { message } => write!(f, "{message}"),
            BuspassError::Payload { context, reason } => {
                write!(f, "Failed to read message body from {context}: {reason}")
            }
            BuspassError::Credential { context, reason } => {
                write!(f, "Credential error in {context}: {reason}")
            }
            BuspassError::Connection { context, reason } => {
                write!(f, "Connection error in {context}: {reason}")
            }
            BuspassError::Send {
                entity,
                attempt,
                repeat,
                reason,
            } => {
                write!(
                    f,
                    "Send {attempt} of {repeat} to '{entity}' failed: {reason}"
                )
            }
            BuspassError::Closed { resource } => write!(f, "{resource} is already closed"),
        }
    }
}

impl std::error::Error for BuspassError {}

impl BuspassError {
    pub fn usage(message: impl Into<String>) -> Self {
        BuspassError::Usage {
            message: message.into(),
        }
    }

    pub fn from_io_error(e: std::io::Error, context: &str) -> Self {
        BuspassError::Payload {
            context: context.to_string(),
            reason: format!("{e} ({:?})", e.kind()),
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, BuspassError::Usage { .. })
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_usage() {
            EXIT_USAGE
        } else {
            EXIT_FATAL
        }
    }
}
