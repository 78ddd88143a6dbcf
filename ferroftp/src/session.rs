//! # Session
//!
//! The control connection and the session handle built around it.
//!
//! [`FtpSession`] is a cheap handle: cloning it shares the same control connection. Every
//! exchange on the control connection holds its lock, so commands never interleave; a transfer
//! keeps the lock until its final reply has been read. While a transfer owns the connection,
//! other commands fail with [`FtpError::Busy`] instead of queueing behind it.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{lookup_host, TcpSocket};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::command::{Command, ProtectionLevel};
use crate::config::{SessionConfig, DEFAULT_FTP_PORT};
use crate::data_stream::DataStream;
use crate::port::PortAllocator;
use crate::reply::{expect, expect_in, parse_reply, Reply};
use crate::tls::{self, TlsContext};
use crate::{FtpError, FtpResult, Mode, Status};

type ControlStream = BufReader<BufWriter<DataStream>>;

/// The control connection: a buffered line reader and writer over one [`DataStream`]
#[derive(Debug)]
pub(crate) struct ControlChannel {
    stream: ControlStream,
    tls: Option<TlsContext>,
    protect_data: bool,
    authenticated: bool,
}

impl ControlChannel {
    fn new(stream: DataStream, tls: Option<TlsContext>) -> Self {
        Self {
            stream: BufReader::new(BufWriter::new(stream)),
            tls,
            protect_data: false,
            authenticated: false,
        }
    }

    /// Returns a reference to the underlying stream
    pub(crate) fn data_stream(&self) -> &DataStream {
        self.stream.get_ref().get_ref()
    }

    pub(crate) fn local_addr(&self) -> FtpResult<SocketAddr> {
        self.data_stream()
            .get_ref()
            .local_addr()
            .map_err(FtpError::ConnectionError)
    }

    pub(crate) fn peer_addr(&self) -> FtpResult<SocketAddr> {
        self.data_stream()
            .get_ref()
            .peer_addr()
            .map_err(FtpError::ConnectionError)
    }

    /// TLS context to wrap data connections with, if the data channel is protected
    pub(crate) fn data_protection(&self) -> Option<&TlsContext> {
        self.tls.as_ref().filter(|_| self.protect_data)
    }

    /// Write a command and flush it
    pub(crate) async fn write_command(&mut self, command: &Command) -> FtpResult<()> {
        trace!("CC OUT: {}", command.redacted());
        let stream = self.stream.get_mut();
        stream
            .write_all(command.to_string().as_bytes())
            .await
            .map_err(FtpError::ConnectionError)?;
        stream.flush().await.map_err(FtpError::ConnectionError)
    }

    /// Read one reply. Server errors (5xx, 450) are returned as [`FtpError::ServerError`].
    pub(crate) async fn read_reply(&mut self) -> FtpResult<Reply> {
        let line = self.read_line().await?;
        let mut reply = parse_reply(&line)?;
        if line.as_bytes().get(3) == Some(&b'-') {
            let code = format!("{:03}", reply.code);
            loop {
                let next = self.read_line().await?;
                let last = next.starts_with(&code)
                    && matches!(next.as_bytes().get(3), None | Some(b' '));
                reply.message.push('\n');
                if last {
                    reply.message.push_str(next.get(4..).unwrap_or_default());
                    break;
                }
                reply.message.push_str(next.trim_start());
            }
        }
        trace!("Reply parsed: {}", reply);

        if reply.is_error() {
            Err(FtpError::ServerError(reply))
        } else {
            Ok(reply)
        }
    }

    /// Write `command` and read its reply
    pub(crate) async fn command(&mut self, command: Command) -> FtpResult<Reply> {
        self.write_command(&command).await?;
        self.read_reply().await
    }

    /// Write `command` and require its reply to carry `expected`
    pub(crate) async fn command_expect(
        &mut self,
        command: Command,
        expected: Status,
    ) -> FtpResult<Reply> {
        let reply = self.command(command).await?;
        expect(expected, reply)
    }

    async fn read_line(&mut self) -> FtpResult<String> {
        let mut line = Vec::new();
        let read = self
            .stream
            .read_until(b'\n', &mut line)
            .await
            .map_err(FtpError::ConnectionError)?;
        if read == 0 {
            return Err(FtpError::ConnectionError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "control connection closed by server",
            )));
        }
        let line = String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        trace!("CC IN: {}", line);
        Ok(line)
    }

    /// Read the final reply left pending by a failed transfer, so the next command is not
    /// answered with it
    pub(crate) async fn settle(&mut self) {
        let reply = match self.read_reply().await {
            Ok(reply) => reply,
            Err(err) => {
                debug!("Transfer closed by server: {}", err);
                return;
            }
        };
        match expect_in(&[Status::TransferComplete, Status::TransferAborted], reply) {
            Ok(reply) => debug!("Transfer closed by server: {}", reply),
            Err(err) => warn!("Unexpected reply after failed transfer: {}", err),
        }
    }

    /// Rebuild the channel over a TLS stream wrapping the current socket.
    /// Bytes buffered before the upgrade are plaintext and never reach the secure channel.
    async fn into_secure(self, tls: TlsContext) -> FtpResult<Self> {
        let pending = self.stream.buffer().len();
        if pending > 0 {
            warn!("Discarding {pending} plaintext bytes received before the TLS upgrade");
        }
        let authenticated = self.authenticated;
        let stream = self.stream.into_inner().into_inner().upgrade(&tls).await?;
        debug!("Control connection is now secure");
        let mut channel = Self::new(stream, Some(tls));
        channel.authenticated = authenticated;
        Ok(channel)
    }

    async fn close(mut self) {
        if let Err(err) = self.stream.get_mut().shutdown().await {
            debug!("Failed to shutdown control connection: {}", err);
        }
    }
}

/// Which `AUTH` command to upgrade the control connection with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMechanism {
    Tls { failback: bool },
    Ssl,
}

struct SessionInner {
    control: Mutex<Option<ControlChannel>>,
    config: SessionConfig,
    host: String,
    welcome: Reply,
    ports: PortAllocator,
    default_mode: StdMutex<Mode>,
    cancel: CancellationToken,
    transferring: AtomicBool,
}

/// Clears the transfer claim when dropped
struct TransferClaim<'a>(&'a AtomicBool);

impl Drop for TransferClaim<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The control connection, locked by a transfer for its whole run
pub(crate) struct TransferControl<'a> {
    control: MappedMutexGuard<'a, ControlChannel>,
    _claim: TransferClaim<'a>,
}

impl Deref for TransferControl<'_> {
    type Target = ControlChannel;

    fn deref(&self) -> &Self::Target {
        &self.control
    }
}

impl DerefMut for TransferControl<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.control
    }
}

/// Handle to one FTP session.
///
/// Cloning the handle is cheap and every clone drives the same control connection; this is how
/// transfers run in the background while the caller keeps using the session.
#[derive(Clone)]
pub struct FtpSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for FtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpSession")
            .field("host", &self.inner.host)
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl FtpSession {
    /// Connect to `remote` (`host[:port]`, port defaults to 21) and read the greeting.
    ///
    /// With implicit TLS the socket is wrapped before the greeting is read. With
    /// `auth_tls_on_first`, `AUTH TLS` is sent right after the greeting; if the server refuses
    /// it the session either fails or goes on in plain text, depending on `continue_if_no_tls`.
    pub async fn dial(remote: &str, config: SessionConfig) -> FtpResult<(Self, Reply)> {
        let (host, addr) = resolve(remote).await?;
        debug!("Connecting to server {} ({})", remote, addr);
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(FtpError::ConnectionError)?;
        if config.local_ip.is_some() || config.local_port != 0 {
            let ip = config.local_ip.unwrap_or(match addr {
                SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            });
            socket
                .bind(SocketAddr::new(ip, config.local_port))
                .map_err(FtpError::ConnectionError)?;
        }
        let stream = socket
            .connect(addr)
            .await
            .map_err(FtpError::ConnectionError)?;
        debug!("Established connection with server");

        let mut control = if config.tls.implicit {
            let tls = TlsContext::new(&config.tls, &host)?;
            let stream = DataStream::from(stream).upgrade(&tls).await?;
            ControlChannel::new(stream, Some(tls))
        } else {
            ControlChannel::new(DataStream::from(stream), None)
        };

        debug!("Reading server response...");
        let welcome = control
            .read_reply()
            .await
            .and_then(|reply| expect(Status::Ready, reply))?;
        debug!("Server READY; response: {}", welcome.message);

        let session = Self {
            inner: Arc::new(SessionInner {
                control: Mutex::new(Some(control)),
                ports: PortAllocator::new(config.first_port),
                default_mode: StdMutex::new(config.default_mode),
                cancel: CancellationToken::new(),
                transferring: AtomicBool::new(false),
                welcome: welcome.clone(),
                host,
                config,
            }),
        };

        if session.inner.config.tls.auth_tls_on_first && !session.inner.config.tls.implicit {
            if let Err(err) = session.auth_tls(true).await {
                if !session.inner.config.tls.continue_if_no_tls || !session.is_connected().await {
                    return Err(err);
                }
                warn!("Server refused TLS, going on in plain text: {}", err);
            }
        }

        Ok((session, welcome))
    }

    /// [`FtpSession::dial`] followed by [`FtpSession::authenticate`]
    pub async fn dial_and_authenticate(remote: &str, config: SessionConfig) -> FtpResult<Self> {
        let (session, _) = Self::dial(remote, config).await?;
        session.authenticate().await?;
        Ok(session)
    }

    /// Log in with the configured credentials.
    /// `USER` must be answered with 331 and `PASS` with 230.
    pub async fn authenticate(&self) -> FtpResult<Reply> {
        let config = &self.inner.config;
        let mut control = self.control().await?;
        debug!("Signin in with user '{}'", config.username);
        control
            .command_expect(Command::User(config.username.clone()), Status::NeedPassword)
            .await?;
        let reply = control
            .command_expect(Command::Pass(config.password.clone()), Status::LoggedIn)
            .await?;
        control.authenticated = true;
        debug!("Login OK");
        if let Some(file_type) = config.transfer_type {
            debug!("Setting transfer type {}", file_type);
            control
                .command_expect(Command::Type(file_type), Status::CommandOk)
                .await?;
        }
        Ok(reply)
    }

    /// Upgrade the control connection with `AUTH TLS`.
    ///
    /// If the server refuses and `failback` is set, `AUTH SSL` is tried instead, which
    /// requires `allow_ssl`. If the handshake itself fails the session is closed.
    pub async fn auth_tls(&self, failback: bool) -> FtpResult<Reply> {
        self.upgrade(AuthMechanism::Tls { failback }).await
    }

    /// Upgrade the control connection with `AUTH SSL`; requires `allow_ssl`
    pub async fn auth_ssl(&self) -> FtpResult<Reply> {
        self.upgrade(AuthMechanism::Ssl).await
    }

    /// Send `QUIT` and close the control connection.
    ///
    /// The session cancellation signal fires first, so a transfer running in the background
    /// aborts and hands the control connection back before `QUIT` is written.
    pub async fn quit(&self) -> FtpResult<Reply> {
        debug!("Quitting stream");
        self.inner.cancel.cancel();
        let mut guard = self.inner.control.lock().await;
        let mut control = guard.take().ok_or(FtpError::NotConnected)?;
        let reply = control.command_expect(Command::Quit, Status::Closing).await;
        control.close().await;
        reply
    }

    /// Greeting sent by the server
    pub fn welcome(&self) -> &Reply {
        &self.inner.welcome
    }

    /// Mode used by transfers asking for `Mode::Default`
    pub fn default_mode(&self) -> Mode {
        *self
            .inner
            .default_mode
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Change the mode used by transfers asking for `Mode::Default`
    pub fn set_default_mode(&self, mode: Mode) -> FtpResult<()> {
        if mode == Mode::Default {
            return Err(FtpError::InvalidMode);
        }
        debug!("Changing default mode to {}", mode);
        *self
            .inner
            .default_mode
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = mode;
        Ok(())
    }

    /// Whether the control connection is still open
    pub async fn is_connected(&self) -> bool {
        self.inner.control.lock().await.is_some()
    }

    /// Whether the control connection runs over TLS
    pub async fn is_secure(&self) -> bool {
        self.inner
            .control
            .lock()
            .await
            .as_ref()
            .map(|c| c.data_stream().is_secure())
            .unwrap_or_default()
    }

    /// Whether `authenticate` succeeded
    pub async fn is_authenticated(&self) -> bool {
        self.inner
            .control
            .lock()
            .await
            .as_ref()
            .map(|c| c.authenticated)
            .unwrap_or_default()
    }

    /// Cipher suites offered when upgrading to TLS
    pub fn cipher_suites(&self) -> Vec<String> {
        tls::cipher_suites()
    }

    /// Cipher suite negotiated on the control connection
    pub async fn negotiated_cipher_suite(&self) -> Option<String> {
        self.inner
            .control
            .lock()
            .await
            .as_ref()
            .and_then(|c| c.data_stream().negotiated_cipher_suite())
    }

    // -- crate

    /// Lock the control connection for one command exchange.
    /// Fails with [`FtpError::Busy`] while a transfer owns it.
    pub(crate) async fn control(&self) -> FtpResult<MappedMutexGuard<'_, ControlChannel>> {
        if self.is_transferring() {
            return Err(FtpError::Busy);
        }
        self.lock_control().await
    }

    /// Claim the control connection for a transfer; only one transfer runs at a time
    pub(crate) async fn transfer_control(&self) -> FtpResult<TransferControl<'_>> {
        if self.inner.transferring.swap(true, Ordering::AcqRel) {
            return Err(FtpError::Busy);
        }
        let claim = TransferClaim(&self.inner.transferring);
        let control = self.lock_control().await?;
        Ok(TransferControl {
            control,
            _claim: claim,
        })
    }

    /// Whether a transfer owns the control connection
    pub fn is_transferring(&self) -> bool {
        self.inner.transferring.load(Ordering::Acquire)
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub(crate) fn ports(&self) -> &PortAllocator {
        &self.inner.ports
    }

    /// Session-wide cancellation signal, fired by `quit`
    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Replace `Mode::Default` with the session default mode
    pub(crate) fn resolve_mode(&self, mode: Mode) -> Mode {
        match mode {
            Mode::Default => self.default_mode(),
            mode => mode,
        }
    }

    // -- private

    async fn lock_control(&self) -> FtpResult<MappedMutexGuard<'_, ControlChannel>> {
        MutexGuard::try_map(self.inner.control.lock().await, |c| c.as_mut())
            .map_err(|_| FtpError::NotConnected)
    }

    async fn upgrade(&self, mechanism: AuthMechanism) -> FtpResult<Reply> {
        if self.is_transferring() {
            return Err(FtpError::Busy);
        }
        let tls = TlsContext::new(&self.inner.config.tls, &self.inner.host)?;
        let mut guard = self.inner.control.lock().await;
        let mut control = guard.take().ok_or(FtpError::NotConnected)?;
        let reply = match self.request_auth(&mut control, mechanism).await {
            Ok(reply) => reply,
            Err(err) => {
                *guard = Some(control);
                return Err(err);
            }
        };
        debug!("Server accepted AUTH; starting TLS handshake");
        let mut control = match control.into_secure(tls).await {
            Ok(control) => control,
            Err(err) => {
                error!("TLS handshake failed; closing session: {}", err);
                self.inner.cancel.cancel();
                return Err(err);
            }
        };
        let protected = if self.inner.config.tls.protect_data {
            Self::protect_data(&mut control).await
        } else {
            Ok(())
        };
        *guard = Some(control);
        protected.map(|_| reply)
    }

    async fn request_auth(
        &self,
        control: &mut ControlChannel,
        mechanism: AuthMechanism,
    ) -> FtpResult<Reply> {
        let failback = match mechanism {
            AuthMechanism::Tls { failback } => failback,
            AuthMechanism::Ssl => return self.request_auth_ssl(control).await,
        };
        match control.command(Command::AuthTls).await {
            Ok(reply) if reply.status() == Status::AuthOk => Ok(reply),
            Ok(_) | Err(FtpError::ServerError(_)) if failback => {
                debug!("AUTH TLS refused; trying AUTH SSL");
                self.request_auth_ssl(control).await
            }
            Ok(reply) => expect(Status::AuthOk, reply),
            Err(err) => Err(err),
        }
    }

    async fn request_auth_ssl(&self, control: &mut ControlChannel) -> FtpResult<Reply> {
        if !self.inner.config.tls.allow_ssl {
            return Err(FtpError::SslNotAllowed);
        }
        control
            .command_expect(Command::AuthSsl, Status::AuthOk)
            .await
    }

    /// `PBSZ 0` and `PROT P`: data connections are wrapped in TLS from now on
    async fn protect_data(control: &mut ControlChannel) -> FtpResult<()> {
        debug!("Protecting data channel");
        control
            .command_expect(Command::Pbsz(0), Status::CommandOk)
            .await?;
        control
            .command_expect(Command::Prot(ProtectionLevel::Private), Status::CommandOk)
            .await?;
        control.protect_data = true;
        Ok(())
    }
}

/// Split `remote` into the host name and a resolved socket address
async fn resolve(remote: &str) -> FtpResult<(String, SocketAddr)> {
    let (host, target) = if let Some(rest) = remote.strip_prefix('[') {
        let host = rest.split(']').next().unwrap_or_default().to_string();
        let target = if rest.contains("]:") {
            remote.to_string()
        } else {
            format!("[{host}]:{DEFAULT_FTP_PORT}")
        };
        (host, target)
    } else {
        match remote.rsplit_once(':') {
            Some((host, _)) => (host.to_string(), remote.to_string()),
            None => (remote.to_string(), format!("{remote}:{DEFAULT_FTP_PORT}")),
        }
    };
    let addr = lookup_host(target.as_str())
        .await
        .map_err(|e| FtpError::InvalidAddress(format!("{remote}: {e}")))?
        .next()
        .ok_or_else(|| FtpError::InvalidAddress(format!("{remote}: no address found")))?;
    Ok((host, addr))
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::config::TlsOptions;
    use crate::test_server::TestServer;

    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn should_resolve_remote() {
        let (host, addr) = resolve("127.0.0.1:2121").await.unwrap();
        assert_eq!(host.as_str(), "127.0.0.1");
        assert_eq!(addr, "127.0.0.1:2121".parse::<SocketAddr>().unwrap());
        let (host, addr) = resolve("127.0.0.1").await.unwrap();
        assert_eq!(host.as_str(), "127.0.0.1");
        assert_eq!(addr.port(), DEFAULT_FTP_PORT);
        let (host, addr) = resolve("[::1]:2121").await.unwrap();
        assert_eq!(host.as_str(), "::1");
        assert_eq!(addr.port(), 2121);
    }

    #[tokio::test]
    async fn should_dial_and_read_greeting() {
        crate::log_init();
        let server = TestServer::start().await;
        let (session, greeting) = FtpSession::dial(&server.addr(), SessionConfig::default())
            .await
            .unwrap();
        assert_eq!(greeting.status(), Status::Ready);
        assert_eq!(session.welcome(), &greeting);
        assert!(session.is_connected().await);
        assert!(!session.is_secure().await);
        assert!(!session.is_authenticated().await);
        assert_eq!(session.quit().await.unwrap().status(), Status::Closing);
    }

    #[tokio::test]
    async fn should_authenticate() {
        crate::log_init();
        let server = TestServer::start().await;
        let session = FtpSession::dial_and_authenticate(&server.addr(), server.config())
            .await
            .unwrap();
        assert!(session.is_authenticated().await);
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn should_not_authenticate_with_bad_password() {
        crate::log_init();
        let server = TestServer::start().await;
        let (session, _) = FtpSession::dial(
            &server.addr(),
            SessionConfig::default().credentials("test", "wrong"),
        )
        .await
        .unwrap();
        let err = session.authenticate().await.unwrap_err();
        assert_eq!(err.code(), Some(530));
        assert!(!session.is_authenticated().await);
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn should_fail_dial_when_tls_refused() {
        crate::log_init();
        let server = TestServer::start().await;
        let config = server.config().tls(TlsOptions::explicit());
        assert!(FtpSession::dial(&server.addr(), config).await.is_err());
    }

    #[tokio::test]
    async fn should_continue_in_plain_text_when_tls_refused() {
        crate::log_init();
        let server = TestServer::start().await;
        let config = server
            .config()
            .tls(TlsOptions::explicit().continue_if_no_tls(true));
        let (session, _) = FtpSession::dial(&server.addr(), config).await.unwrap();
        assert!(!session.is_secure().await);
        assert_eq!(session.negotiated_cipher_suite().await, None);
        session.authenticate().await.unwrap();
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn should_refuse_ssl_without_opt_in() {
        crate::log_init();
        let server = TestServer::start().await;
        let (session, _) = FtpSession::dial(&server.addr(), server.config())
            .await
            .unwrap();
        assert!(matches!(
            session.auth_tls(true).await,
            Err(FtpError::SslNotAllowed)
        ));
        assert!(matches!(
            session.auth_ssl().await,
            Err(FtpError::SslNotAllowed)
        ));
        let err = session.auth_tls(false).await.unwrap_err();
        assert_eq!(err.code(), Some(502));
        // the session is still usable
        assert!(session.is_connected().await);
        session.authenticate().await.unwrap();
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn should_read_multiline_greeting() {
        crate::log_init();
        let server = TestServer::start().await;
        let (session, greeting) = FtpSession::dial(&server.addr(), server.config())
            .await
            .unwrap();
        assert_eq!(greeting.code, 220);
        assert_eq!(
            greeting.message.as_str(),
            "ferroftp test server\nready"
        );
        // the next exchange is not shifted by the extra greeting line
        assert_eq!(session.noop().await.unwrap().code, 200);
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn should_get_and_set_default_mode() {
        crate::log_init();
        let server = TestServer::start().await;
        let (session, _) = FtpSession::dial(
            &server.addr(),
            server.config().default_mode(Mode::Active),
        )
        .await
        .unwrap();
        assert_eq!(session.default_mode(), Mode::Active);
        assert_eq!(session.resolve_mode(Mode::Default), Mode::Active);
        session.set_default_mode(Mode::Passive).unwrap();
        assert_eq!(session.default_mode(), Mode::Passive);
        assert!(matches!(
            session.set_default_mode(Mode::Default),
            Err(FtpError::InvalidMode)
        ));
        assert_eq!(session.resolve_mode(Mode::Active), Mode::Active);
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn should_not_quit_twice() {
        crate::log_init();
        let server = TestServer::start().await;
        let (session, _) = FtpSession::dial(&server.addr(), server.config())
            .await
            .unwrap();
        session.quit().await.unwrap();
        assert!(session.cancellation().is_cancelled());
        assert!(matches!(session.quit().await, Err(FtpError::NotConnected)));
        assert!(matches!(session.noop().await, Err(FtpError::NotConnected)));
    }

    #[test]
    fn should_list_cipher_suites() {
        assert!(!tls::cipher_suites().is_empty());
    }
}
