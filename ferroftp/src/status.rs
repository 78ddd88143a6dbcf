//! # Status
//!
//! The reply codes the session and transfer engine act upon

use thiserror::Error;

/// Meaning of a reply code.
///
/// Codes the engine never branches on map to [`Status::Unknown`]; the numeric code is always
/// available on the reply itself.
#[derive(Debug, Copy, Clone, Error, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Status {
    // preliminary
    #[error("data connection already open; transfer starting")]
    AlreadyOpen = 125,
    #[error("file status okay; about to open data connection")]
    AboutToSend = 150,
    // completion
    #[error("command okay")]
    CommandOk = 200,
    #[error("file status")]
    File = 213,
    #[error("service ready for new user")]
    Ready = 220,
    #[error("service closing control connection")]
    Closing = 221,
    #[error("closing data connection; transfer complete")]
    TransferComplete = 226,
    #[error("entering passive mode")]
    PassiveMode = 227,
    #[error("user logged in")]
    LoggedIn = 230,
    #[error("security exchange complete; ready for TLS")]
    AuthOk = 234,
    #[error("requested file action completed")]
    RequestedFileActionOk = 250,
    #[error("pathname created")]
    PathCreated = 257,
    // intermediate
    #[error("user name okay; need password")]
    NeedPassword = 331,
    // transient failures
    #[error("can't open data connection")]
    CannotOpenDataConnection = 425,
    #[error("connection closed; transfer aborted")]
    TransferAborted = 426,
    #[error("file unavailable")]
    FileUnavailable = 450,
    // permanent failures
    #[error("file not found or no access")]
    ActionNotTaken = 550,
    #[error("unknown status code")]
    Unknown = 0,
}

impl Status {
    /// Numeric reply code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Human readable meaning
    pub fn desc(&self) -> String {
        self.to_string()
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        match code {
            125 => Self::AlreadyOpen,
            150 => Self::AboutToSend,
            200 => Self::CommandOk,
            213 => Self::File,
            220 => Self::Ready,
            221 => Self::Closing,
            226 => Self::TransferComplete,
            227 => Self::PassiveMode,
            230 => Self::LoggedIn,
            234 => Self::AuthOk,
            250 => Self::RequestedFileActionOk,
            257 => Self::PathCreated,
            331 => Self::NeedPassword,
            425 => Self::CannotOpenDataConnection,
            426 => Self::TransferAborted,
            450 => Self::FileUnavailable,
            550 => Self::ActionNotTaken,
            _ => Self::Unknown,
        }
    }
}
