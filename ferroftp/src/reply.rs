//! # Reply
//!
//! Parsing and validation of server replies

use std::fmt;

use crate::{FtpError, FtpResult, Status};

/// One reply read from the control connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code
    pub code: u32,
    /// Text following the code; may be empty
    pub message: String,
}

impl Reply {
    /// Instantiates a new `Reply`
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the status matching the reply code
    pub fn status(&self) -> Status {
        Status::from(self.code)
    }

    /// Whether the reply carries a server-reported error
    pub fn is_error(&self) -> bool {
        is_error(self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}: {}", self.code, self.message)
    }
}

/// Parse a single reply line.
///
/// The code is taken from the first three characters, the message starts after the
/// separator character that follows it.
pub fn parse_reply(line: &str) -> FtpResult<Reply> {
    let line = line.trim_end_matches(['\r', '\n']);
    let code = line
        .get(0..3)
        .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| FtpError::BadResponse(format!("invalid reply line: {line:?}")))?;
    let code = code
        .parse::<u32>()
        .map_err(|e| FtpError::BadResponse(e.to_string()))?;
    let message: String = line[3..].chars().skip(1).collect();

    Ok(Reply::new(code, message))
}

/// Returns whether `code` is a server-reported error: any 5xx code, plus 450 (file unavailable)
pub fn is_error(code: u32) -> bool {
    (500..600).contains(&code) || code == Status::FileUnavailable.code()
}

/// Validate `reply` against the code the command requires
pub fn expect(expected: Status, reply: Reply) -> FtpResult<Reply> {
    expect_in(&[expected], reply)
}

/// Validate `reply` against any of the `expected` codes.
///
/// The error reports the first of the expected codes.
pub fn expect_in(expected: &[Status], reply: Reply) -> FtpResult<Reply> {
    if expected.iter().any(|s| s.code() == reply.code) {
        Ok(reply)
    } else {
        Err(FtpError::UnexpectedCode {
            expected: expected.first().map(Status::code).unwrap_or_default(),
            got: reply.code,
        })
    }
}
