use std::fmt;
use std::io;
use std::path::PathBuf;

use ferroftp::{
    FileType, FtpError, FtpResult, FtpSession, Mode, Reply, SessionConfig, TlsOptions,
    TransferDescriptor, TransferHandle, TransferSignals,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Command;

/// Progress is printed every time this many more bytes have been moved
const PROGRESS_STEP: usize = 1024 * 1024;

/// Result of an action
pub enum Outcome {
    None,
    Reply(Reply),
    Text(String),
    Lines(Vec<String>),
    Pair(String, String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "OK"),
            Self::Reply(reply) => write!(f, "OK: {reply}"),
            Self::Text(text) => write!(f, "OK: {text}"),
            Self::Lines(lines) => write!(f, "{}", lines.join("\n")),
            Self::Pair(key, value) => write!(f, "OK: {key}: {value}"),
        }
    }
}

/// A transfer running in the background
struct Transfer {
    abort: CancellationToken,
    monitor: JoinHandle<()>,
}

#[derive(Default)]
pub struct State {
    session: Option<FtpSession>,
    transfer: Option<Transfer>,
}

impl State {
    fn session(&self) -> FtpResult<&FtpSession> {
        self.session.as_ref().ok_or(FtpError::NotConnected)
    }

    fn transfer_running(&self) -> bool {
        self.transfer
            .as_ref()
            .is_some_and(|transfer| !transfer.monitor.is_finished())
    }
}

pub async fn perform(state: &mut State, command: Command) -> FtpResult<Outcome> {
    match command {
        Command::Abort => abort(state),
        Command::Auth => auth(state).await,
        Command::Ciphers => Ok(Outcome::Lines(ferroftp::cipher_suites())),
        Command::Connect(remote, secure) => connect(state, &remote, secure).await,
        Command::Cwd(dir) => state.session()?.cwd(&dir).await.map(Outcome::Reply),
        Command::Get(file, dest) => get(state, file, dest),
        Command::List(dir) => state
            .session()?
            .list(Mode::Default, dir.as_deref())
            .await
            .map(Outcome::Lines),
        Command::Mdtm(file) => {
            let (_, time) = state.session()?.mdtm(&file).await?;
            Ok(Outcome::Pair(file, time.to_rfc3339()))
        }
        Command::Mkdir(dir) => state.session()?.mkdir(&dir).await.map(Outcome::Reply),
        Command::Mode(mode) => {
            state.session()?.set_default_mode(mode)?;
            Ok(Outcome::None)
        }
        Command::Noop => state.session()?.noop().await.map(Outcome::Reply),
        Command::Put(src, dest) => put(state, src, dest),
        Command::Pwd => {
            let (_, path) = state.session()?.pwd().await?;
            Ok(Outcome::Text(path))
        }
        Command::Quit => quit(state).await,
        Command::Rename(src, dest) => state
            .session()?
            .rename(&src, &dest)
            .await
            .map(Outcome::Reply),
        Command::Rm(file) => state.session()?.delete(&file).await.map(Outcome::Reply),
        Command::Rmdir(dir) => state.session()?.rmdir(&dir).await.map(Outcome::Reply),
        Command::Size(file) => {
            let (_, size) = state.session()?.size(&file).await?;
            Ok(Outcome::Pair(file, size.to_string()))
        }
        Command::Help => Ok(Outcome::None),
    }
}

async fn connect(state: &mut State, remote: &str, secure: bool) -> FtpResult<Outcome> {
    if state.session.is_some() {
        if let Err(err) = quit(state).await {
            warn!("Failed to disconnect from previous remote: {}", err);
        }
    }
    let (username, password) = prompt_credentials().await?;
    let tls = if secure {
        TlsOptions::explicit()
    } else {
        TlsOptions::default()
    };
    let config = SessionConfig::default()
        .credentials(username, password)
        .transfer_type(FileType::Binary)
        .tls(tls.skip_verify(true));
    let session = FtpSession::dial_and_authenticate(remote, config).await?;
    let welcome = session.welcome().clone();
    state.session = Some(session);
    Ok(Outcome::Reply(welcome))
}

async fn prompt_credentials() -> FtpResult<(String, String)> {
    tokio::task::spawn_blocking(|| {
        let username = rpassword::prompt_password("Username: ")?;
        let password = rpassword::prompt_password("Password: ")?;
        Ok::<_, io::Error>((username, password))
    })
    .await
    .map_err(|err| FtpError::ConnectionError(io::Error::other(err)))?
    .map_err(FtpError::ConnectionError)
}

async fn auth(state: &mut State) -> FtpResult<Outcome> {
    let session = state.session()?;
    let reply = session.auth_tls(false).await?;
    if let Some(suite) = session.negotiated_cipher_suite().await {
        info!("Negotiated cipher suite {}", suite);
    }
    Ok(Outcome::Reply(reply))
}

async fn quit(state: &mut State) -> FtpResult<Outcome> {
    let Some(session) = state.session.take() else {
        return Ok(Outcome::None);
    };
    let reply = session.quit().await;
    // let the transfer monitor report the aborted transfer
    if let Some(transfer) = state.transfer.take() {
        let _ = transfer.monitor.await;
    }
    reply.map(Outcome::Reply)
}

fn abort(state: &mut State) -> FtpResult<Outcome> {
    match state.transfer.take() {
        Some(transfer) if !transfer.monitor.is_finished() => {
            transfer.abort.cancel();
            Ok(Outcome::None)
        }
        _ => Ok(Outcome::Text(String::from("no transfer running"))),
    }
}

fn put(state: &mut State, src: PathBuf, dest: String) -> FtpResult<Outcome> {
    if state.transfer_running() {
        return Ok(Outcome::Text(String::from("a transfer is already running")));
    }
    let session = state.session()?;
    let (signals, handle) = TransferSignals::with_progress();
    session.store(TransferDescriptor::new(src, dest.as_str()), signals);
    state.transfer = Some(monitor("PUT", dest, handle));
    Ok(Outcome::Text(String::from("transfer started")))
}

fn get(state: &mut State, file: String, dest: PathBuf) -> FtpResult<Outcome> {
    if state.transfer_running() {
        return Ok(Outcome::Text(String::from("a transfer is already running")));
    }
    let session = state.session()?;
    let (signals, handle) = TransferSignals::with_progress();
    session.retrieve(TransferDescriptor::new(dest, file.as_str()), signals);
    state.transfer = Some(monitor("GET", file, handle));
    Ok(Outcome::Text(String::from("transfer started")))
}

/// Print the progress and the outcome of a transfer
fn monitor(name: &'static str, remote: String, mut handle: TransferHandle) -> Transfer {
    let abort = handle.abort_token();
    let monitor = tokio::spawn(async move {
        if let Some(mut progress) = handle.take_progress() {
            let mut total = 0;
            let mut next_report = PROGRESS_STEP;
            while let Some(bytes) = progress.recv().await {
                total += bytes;
                if total >= next_report {
                    println!("{name} {remote}: {total} bytes");
                    next_report = total + PROGRESS_STEP;
                }
            }
            debug!("{} {}: {} bytes moved", name, remote, total);
        }
        match handle.wait().await {
            Ok(()) => println!("{name} {remote}: OK"),
            Err(err) => eprintln!("{name} error: {err}"),
        }
    });
    Transfer { abort, monitor }
}
