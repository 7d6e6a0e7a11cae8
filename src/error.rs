use bluer::Address;
use thiserror::Error;

use crate::bluetooth::LinkError;
use crate::status::CommandFailed;

/// A frame passed validation but its content breaks the payload contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("power state index {state} is outside the 5-entry state table")]
    StateOutOfRange { state: u8 },

    #[error("frame truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Reasons a session ends with a non-zero exit indication
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open link: {0}")]
    LinkOpen(#[source] LinkError),

    #[error(transparent)]
    Command(#[from] CommandFailed),

    #[error("device unreachable after {attempts} reset attempts")]
    Unreachable { attempts: u32 },

    #[error("decode violation in frame from {address}: {source}")]
    Decode {
        address: Address,
        #[source]
        source: DecodeError,
    },

    #[error("link failure: {0}")]
    Link(#[source] LinkError),
}

impl SessionError {
    /// Process exit code for this failure; zero is reserved for a clean stop
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionError::LinkOpen(_) => 2,
            SessionError::Command(_) => 3,
            SessionError::Unreachable { .. } => 4,
            SessionError::Decode { .. } => 5,
            SessionError::Link(_) => 6,
        }
    }
}

impl From<LinkError> for SessionError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Command(failed) => SessionError::Command(failed),
            other => SessionError::Link(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
