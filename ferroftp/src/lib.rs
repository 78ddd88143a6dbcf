#![crate_name = "ferroftp"]
#![crate_type = "lib"]

//! # ferroftp
//!
//! ferroftp is an async FTP client library built on tokio, with FTPS support through rustls.
//!
//! - A session handle which can be cloned and shared between tasks
//! - STOR and RETR transfers running in the background, with progress reporting and abort
//! - Active (PORT) and passive (PASV) data connections
//! - Explicit (`AUTH TLS`) and implicit FTPS, with optional protection of the data channel
//! - Directory and metadata commands: CWD, PWD, MKD, RMD, DELE, RNFR/RNTO, SIZE, MDTM, LIST
//!
//! ## Get started
//!
//! To get started, first add **ferroftp** to your dependencies:
//!
//! ```toml
//! ferroftp = "^0.4"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ferroftp::{FtpSession, Mode, SessionConfig, TransferDescriptor};
//!
//! # async fn run() -> ferroftp::FtpResult<()> {
//! let config = SessionConfig::default().credentials("test", "test");
//! let session = FtpSession::dial_and_authenticate("127.0.0.1:10021", config).await?;
//! session.mkdir("backup").await?;
//! session.cwd("backup").await?;
//! session
//!     .store_simple(TransferDescriptor::new("/tmp/data.bin", "data.bin").mode(Mode::Passive))
//!     .await?;
//! for line in session.list(Mode::Default, None).await? {
//!     println!("{line}");
//! }
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Background transfers
//!
//! `store` and `retrieve` spawn the transfer and return immediately. The transfer reports
//! back through a [`TransferHandle`]: whether it started, how many bytes each chunk moved and
//! its outcome. It can be aborted at any time; quitting the session aborts it too.
//!
//! ```rust,no_run
//! use ferroftp::{FtpSession, TransferDescriptor, TransferSignals};
//!
//! # async fn run(session: FtpSession) -> ferroftp::FtpResult<()> {
//! let (signals, mut handle) = TransferSignals::with_progress();
//! session.retrieve(TransferDescriptor::new("/tmp/big.iso", "big.iso"), signals);
//! if handle.started().await {
//!     let mut progress = handle.take_progress().unwrap();
//!     let mut total = 0;
//!     while let Some(bytes) = progress.recv().await {
//!         total += bytes;
//!         if total > 1024 * 1024 {
//!             handle.abort();
//!         }
//!     }
//! }
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## FTPS
//!
//! ```rust,no_run
//! use ferroftp::{FtpSession, SessionConfig, TlsOptions};
//!
//! # async fn run() -> ferroftp::FtpResult<()> {
//! let config = SessionConfig::default()
//!     .credentials("demo", "password")
//!     .tls(TlsOptions::explicit().protect_data(true));
//! let session = FtpSession::dial_and_authenticate("test.rebex.net:21", config).await?;
//! assert!(session.is_secure().await);
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```
//!

// -- common deps
#[macro_use]
extern crate lazy_regex;
#[macro_use]
extern crate log;

// -- private
mod address;
pub(crate) mod command;
mod config;
mod data_channel;
mod data_stream;
mod ops;
mod port;
mod regex;
mod reply;
mod session;
mod status;
mod tls;
mod transfer;
#[cfg(test)]
mod test_server;

// -- public
pub mod types;

// -- secure deps
pub extern crate rustls_crate as rustls;

// -- export
pub use address::{format_port, parse_date, parse_pasv, parse_pwd, parse_size};
pub use config::{
    SessionConfig, TlsOptions, DEFAULT_BUFFER_SIZE, DEFAULT_FTP_PORT, MAX_BUFFER_SIZE,
};
pub use port::{AllocatedPort, PortAllocator};
pub use reply::{expect, expect_in, is_error, parse_reply, Reply};
pub use session::FtpSession;
pub use status::Status;
pub use tls::cipher_suites;
pub use transfer::{TransferDescriptor, TransferHandle, TransferSignals};
pub use types::{FileType, FtpError, FtpResult, Mode};

// -- test logging
#[cfg(test)]
pub fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
