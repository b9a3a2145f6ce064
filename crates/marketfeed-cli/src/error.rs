use marketfeed_core::{SourceError, SourceErrorKind, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Argument(_) => 2,
            Self::Source(error) => match error.kind() {
                SourceErrorKind::UnsupportedParameter
                | SourceErrorKind::InvalidRequest
                | SourceErrorKind::Validation => 2,
                SourceErrorKind::UnsupportedCapability => 3,
                SourceErrorKind::UnknownProvider | SourceErrorKind::MissingCredential => 4,
                SourceErrorKind::Transport
                | SourceErrorKind::RateLimited
                | SourceErrorKind::Internal => 1,
            },
            Self::Csv(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
