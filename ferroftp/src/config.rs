//! # Config
//!
//! Session configuration

use std::net::IpAddr;

use crate::types::{FileType, Mode};

/// Transfer buffer used when neither the session nor the transfer asks for another size
pub const DEFAULT_BUFFER_SIZE: usize = 1024;
/// Largest transfer buffer a transfer may ask for
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 5;
/// Well known FTP control port
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Configuration of one [`crate::FtpSession`]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) default_mode: Mode,
    pub(crate) local_ip: Option<IpAddr>,
    pub(crate) local_port: u16,
    pub(crate) first_port: u16,
    pub(crate) buffer_size: usize,
    pub(crate) transfer_type: Option<FileType>,
    pub(crate) nat_workaround: bool,
    pub(crate) tls: TlsOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: String::from("anonymous"),
            password: String::new(),
            default_mode: Mode::Passive,
            local_ip: None,
            local_port: 0,
            first_port: 1023,
            buffer_size: DEFAULT_BUFFER_SIZE,
            transfer_type: None,
            nat_workaround: false,
            tls: TlsOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Set the credentials used by `authenticate`
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the mode used by transfers which don't choose one.
    /// `Mode::Default` is ignored.
    pub fn default_mode(mut self, mode: Mode) -> Self {
        if mode != Mode::Default {
            self.default_mode = mode;
        }
        self
    }

    /// Bind the control socket and the active mode listeners to `ip`
    pub fn local_ip(mut self, ip: IpAddr) -> Self {
        self.local_ip = Some(ip);
        self
    }

    /// Bind the control socket to `port`
    pub fn local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Active mode ports are searched starting right after `port`
    pub fn first_port(mut self, port: u16) -> Self {
        self.first_port = port;
        self
    }

    /// Session default transfer buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = effective_buffer_size(size, DEFAULT_BUFFER_SIZE);
        self
    }

    /// Send `TYPE` right after login
    pub fn transfer_type(mut self, file_type: FileType) -> Self {
        self.transfer_type = Some(file_type);
        self
    }

    /// Replace private addresses returned by PASV with the address of the server
    pub fn passive_nat_workaround(mut self, enabled: bool) -> Self {
        self.nat_workaround = enabled;
        self
    }

    /// Set the TLS policy
    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    pub fn get_default_mode(&self) -> Mode {
        self.default_mode
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_tls(&self) -> &TlsOptions {
        &self.tls
    }
}

/// TLS policy of a session
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Wrap the control socket in TLS as soon as it is connected (FTPS implicit mode)
    pub implicit: bool,
    /// Send `AUTH TLS` right after the greeting
    pub auth_tls_on_first: bool,
    /// Allow the legacy `AUTH SSL` command
    pub allow_ssl: bool,
    /// Keep going in plain text if the server refuses `AUTH TLS` on first command
    pub continue_if_no_tls: bool,
    /// Don't verify the server certificate
    pub skip_verify: bool,
    /// Name used for SNI and certificate verification; defaults to the dialed host
    pub server_name: Option<String>,
    /// Protect the data channel too (`PBSZ 0`, `PROT P`)
    pub protect_data: bool,
}

impl TlsOptions {
    /// Explicit TLS, upgraded with `AUTH TLS` right after the greeting
    pub fn explicit() -> Self {
        Self {
            auth_tls_on_first: true,
            ..Self::default()
        }
    }

    /// Implicit TLS
    pub fn implicit() -> Self {
        Self {
            implicit: true,
            ..Self::default()
        }
    }

    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    pub fn allow_ssl(mut self, allow: bool) -> Self {
        self.allow_ssl = allow;
        self
    }

    pub fn continue_if_no_tls(mut self, allow: bool) -> Self {
        self.continue_if_no_tls = allow;
        self
    }

    pub fn protect_data(mut self, protect: bool) -> Self {
        self.protect_data = protect;
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// `requested` if it is within `1..=MAX_BUFFER_SIZE`, `fallback` otherwise
pub(crate) fn effective_buffer_size(requested: usize, fallback: usize) -> usize {
    if requested > 0 && requested <= MAX_BUFFER_SIZE {
        requested
    } else {
        fallback
    }
}
