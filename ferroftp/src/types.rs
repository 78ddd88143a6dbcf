//! # Types
//!
//! Error type and the small value types shared by the whole library

use std::fmt;

use thiserror::Error;

use crate::reply::Reply;

/// A shorthand for a Result whose error type is always an FtpError.
pub type FtpResult<T> = std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using FTP.
#[derive(Debug, Error)]
pub enum FtpError {
    /// Socket, listener or local file error
    #[error("Connection error: {0}")]
    ConnectionError(std::io::Error),
    /// There was an error with the secure stream
    #[error("Secure error: {0}")]
    SecureError(String),
    /// The reply, or its payload, has an invalid syntax
    #[error("Bad response: {0}")]
    BadResponse(String),
    /// The server replied with a code other than the one the command requires
    #[error("unexpected code, want {expected}, got {got}")]
    UnexpectedCode { expected: u32, got: u32 },
    /// The server reported an error (5xx or 450)
    #[error("Server error: {0}")]
    ServerError(Reply),
    /// The control connection has been closed
    #[error("Not connected")]
    NotConnected,
    /// A background transfer owns the control connection until it ends
    #[error("A transfer is in progress")]
    Busy,
    /// The address provided was invalid
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// No local port could be bound for an active mode listener
    #[error("No local port available for active mode")]
    NoAvailablePort,
    /// `AUTH SSL` requires an explicit opt-in
    #[error("AUTH SSL is not allowed by the session configuration")]
    SslNotAllowed,
    /// The session default mode can't be set to `Mode::Default`
    #[error("Invalid default mode")]
    InvalidMode,
}

impl FtpError {
    /// Reply code carried by the error, if the server sent one
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::UnexpectedCode { got, .. } => Some(*got),
            Self::ServerError(reply) => Some(reply.code),
            _ => None,
        }
    }
}

/// Connection mode for data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The client listens and the server connects to it (PORT)
    Active,
    /// The server listens and the client connects to it (PASV)
    Passive,
    /// Whatever the session default mode is
    Default,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Passive => write!(f, "passive"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// File Type used in `TYPE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// ASCII text, non-print format control
    Ascii,
    /// Image (binary)
    Binary,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii => write!(f, "A N"),
            Self::Binary => write!(f, "I"),
        }
    }
}
