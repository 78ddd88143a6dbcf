//! # Transfer
//!
//! Background STOR and RETR transfers.
//!
//! A transfer runs as its own task and reports back through the signals created with
//! [`TransferSignals::new`]:
//!
//! - `done` receives exactly one outcome, `Ok(())` when the transfer completed or was aborted
//!   cleanly, the error otherwise;
//! - `started` fires at most once, after the server accepted the command and before any byte
//!   is moved;
//! - `progress`, if requested, receives the number of bytes moved by each chunk and is closed
//!   when the transfer ends;
//! - the abort token may be cancelled by the caller at any time. Quitting the session has the
//!   same effect on a running transfer.
//!
//! An aborted transfer runs the ABOR handshake: the data connection is closed, `ABOR` is sent
//! and the server must answer 426 then 226. Some servers answer 226 twice; that is accepted too.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::config::effective_buffer_size;
use crate::reply::expect;
use crate::session::{ControlChannel, FtpSession};
use crate::{FtpError, FtpResult, Mode, Status};

/// Parameters of one STOR or RETR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub mode: Mode,
    pub local: PathBuf,
    pub remote: String,
    /// Buffer size override; used when within `1..=MAX_BUFFER_SIZE`
    pub buffer_size: usize,
    /// Delete the remote file when a STOR is aborted
    pub delete_on_abort: bool,
}

impl TransferDescriptor {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            mode: Mode::Default,
            local: local.into(),
            remote: remote.into(),
            buffer_size: 0,
            delete_on_abort: false,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn delete_on_abort(mut self, delete: bool) -> Self {
        self.delete_on_abort = delete;
        self
    }
}

/// Engine side of the signals of one transfer
#[derive(Debug)]
pub struct TransferSignals {
    done: oneshot::Sender<FtpResult<()>>,
    started: Option<oneshot::Sender<()>>,
    progress: Option<mpsc::UnboundedSender<usize>>,
    abort: CancellationToken,
}

/// Caller side of the signals of one transfer.
///
/// The started signal and the outcome are kept once received, so they can be queried again.
#[derive(Debug)]
pub struct TransferHandle {
    done: oneshot::Receiver<FtpResult<()>>,
    outcome: Option<FtpResult<()>>,
    started: Option<oneshot::Receiver<()>>,
    has_started: bool,
    progress: Option<mpsc::UnboundedReceiver<usize>>,
    abort: CancellationToken,
}

impl TransferSignals {
    /// Signals without progress reporting
    pub fn new() -> (Self, TransferHandle) {
        Self::build(false)
    }

    /// Signals with progress reporting
    pub fn with_progress() -> (Self, TransferHandle) {
        Self::build(true)
    }

    fn build(progress: bool) -> (Self, TransferHandle) {
        let (done_tx, done_rx) = oneshot::channel();
        let (started_tx, started_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = match progress {
            true => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Some(tx), Some(rx))
            }
            false => (None, None),
        };
        let abort = CancellationToken::new();
        (
            Self {
                done: done_tx,
                started: Some(started_tx),
                progress: progress_tx,
                abort: abort.clone(),
            },
            TransferHandle {
                done: done_rx,
                outcome: None,
                started: Some(started_rx),
                has_started: false,
                progress: progress_rx,
                abort,
            },
        )
    }

    fn start(&mut self) {
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }
    }

    fn progress(&self, bytes: usize) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(bytes);
        }
    }

    /// Close the progress channel, then report the outcome
    fn finish(self, result: FtpResult<()>) {
        let Self { done, progress, .. } = self;
        drop(progress);
        if let Err(err) = &result {
            error!("Transfer failed: {}", err);
        }
        let _ = done.send(result);
    }
}

impl TransferHandle {
    /// Ask the transfer to abort. It is a no-op once the transfer has ended.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    /// Token aborting the transfer when cancelled
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Wait for the transfer to start. Returns `false` if it ended before starting.
    pub async fn started(&mut self) -> bool {
        if let Some(started) = self.started.as_mut() {
            self.has_started = started.await.is_ok();
            self.started = None;
        }
        self.has_started
    }

    /// Receiver of the bytes moved by each chunk, if progress was requested
    pub fn progress(&mut self) -> Option<&mut mpsc::UnboundedReceiver<usize>> {
        self.progress.as_mut()
    }

    /// Take the progress receiver, if progress was requested
    pub fn take_progress(&mut self) -> Option<mpsc::UnboundedReceiver<usize>> {
        self.progress.take()
    }

    /// Outcome of the transfer, if it has ended
    pub fn try_outcome(&mut self) -> Option<&FtpResult<()>> {
        if self.outcome.is_none() {
            self.outcome = match self.done.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Err(no_outcome())),
            };
        }
        self.outcome.as_ref()
    }

    /// Wait for the outcome of the transfer
    pub async fn wait(self) -> FtpResult<()> {
        match self.outcome {
            Some(outcome) => outcome,
            None => self.done.await.unwrap_or_else(|_| Err(no_outcome())),
        }
    }
}

fn no_outcome() -> FtpError {
    FtpError::ConnectionError(io::Error::other(
        "transfer ended without reporting an outcome",
    ))
}

/// How the chunk loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pumped {
    Completed(u64),
    Aborted,
}

impl FtpSession {
    /// Upload `descriptor.local` to `descriptor.remote` in the background
    pub fn store(&self, descriptor: TransferDescriptor, signals: TransferSignals) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut signals = signals;
            let result = session.run_store(&descriptor, &mut signals).await;
            signals.finish(result);
        })
    }

    /// Download `descriptor.remote` to `descriptor.local` in the background
    pub fn retrieve(
        &self,
        descriptor: TransferDescriptor,
        signals: TransferSignals,
    ) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut signals = signals;
            let result = session.run_retrieve(&descriptor, &mut signals).await;
            signals.finish(result);
        })
    }

    /// Upload and wait for the outcome
    pub async fn store_simple(&self, descriptor: TransferDescriptor) -> FtpResult<()> {
        let (signals, handle) = TransferSignals::new();
        self.store(descriptor, signals);
        handle.wait().await
    }

    /// Download and wait for the outcome
    pub async fn retrieve_simple(&self, descriptor: TransferDescriptor) -> FtpResult<()> {
        let (signals, handle) = TransferSignals::new();
        self.retrieve(descriptor, signals);
        handle.wait().await
    }

    async fn run_store(
        &self,
        descriptor: &TransferDescriptor,
        signals: &mut TransferSignals,
    ) -> FtpResult<()> {
        let mut control = self.transfer_control().await?;
        let mut file = File::open(&descriptor.local)
            .await
            .map_err(FtpError::ConnectionError)?;
        let size = file
            .metadata()
            .await
            .map_err(FtpError::ConnectionError)?
            .len();
        debug!(
            "Storing {} ({} bytes) to {}",
            descriptor.local.display(),
            size,
            descriptor.remote
        );
        let (mut data, _) = self
            .open_data_channel(
                &mut control,
                descriptor.mode,
                Command::Store(descriptor.remote.clone()),
            )
            .await?;
        signals.start();

        let pumped = pump(
            &mut file,
            &mut data.stream,
            Some(size),
            self.buffer_size(descriptor),
            self.cancellation(),
            signals,
        )
        .await;
        match pumped {
            Ok(Pumped::Completed(written)) => {
                if let Err(err) = data.close().await {
                    control.settle().await;
                    return Err(err);
                }
                let reply = control.read_reply().await?;
                expect(Status::TransferComplete, reply)?;
                debug!("Stored {} bytes to {}", written, descriptor.remote);
                Ok(())
            }
            Ok(Pumped::Aborted) => {
                drop(data);
                abort_handshake(&mut control).await?;
                if descriptor.delete_on_abort {
                    debug!("Removing aborted upload {}", descriptor.remote);
                    control
                        .command_expect(
                            Command::Dele(descriptor.remote.clone()),
                            Status::RequestedFileActionOk,
                        )
                        .await?;
                }
                Ok(())
            }
            Err(err) => {
                drop(data);
                control.settle().await;
                Err(err)
            }
        }
    }

    async fn run_retrieve(
        &self,
        descriptor: &TransferDescriptor,
        signals: &mut TransferSignals,
    ) -> FtpResult<()> {
        let mut control = self.transfer_control().await?;
        debug!(
            "Retrieving {} to {}",
            descriptor.remote,
            descriptor.local.display()
        );
        let (mut data, _) = self
            .open_data_channel(
                &mut control,
                descriptor.mode,
                Command::Retr(descriptor.remote.clone()),
            )
            .await?;
        let mut file = match File::create(&descriptor.local).await {
            Ok(file) => file,
            Err(err) => {
                drop(data);
                control.settle().await;
                return Err(FtpError::ConnectionError(err));
            }
        };
        signals.start();

        let pumped = pump(
            &mut data.stream,
            &mut file,
            None,
            self.buffer_size(descriptor),
            self.cancellation(),
            signals,
        )
        .await;
        match pumped {
            Ok(Pumped::Completed(read)) => {
                drop(data);
                if let Err(err) = file.flush().await {
                    control.settle().await;
                    return Err(FtpError::ConnectionError(err));
                }
                let reply = control.read_reply().await?;
                expect(Status::TransferComplete, reply)?;
                debug!("Retrieved {} bytes from {}", read, descriptor.remote);
                Ok(())
            }
            Ok(Pumped::Aborted) => {
                drop(data);
                drop(file);
                let handshake = abort_handshake(&mut control).await;
                let removed = remove_partial(&descriptor.local).await;
                handshake.and(removed)
            }
            Err(err) => {
                drop(data);
                control.settle().await;
                Err(err)
            }
        }
    }

    fn buffer_size(&self, descriptor: &TransferDescriptor) -> usize {
        effective_buffer_size(descriptor.buffer_size, self.config().buffer_size)
    }
}

/// Move bytes from `source` to `sink` one buffer at a time, until `limit` bytes have been
/// moved or, without a limit, until `source` is exhausted.
///
/// Before every read and write the abort signal and the session cancellation are checked;
/// a session cancellation is forwarded to the abort signal.
async fn pump<R, W>(
    source: &mut R,
    sink: &mut W,
    limit: Option<u64>,
    buffer_size: usize,
    cancel: &CancellationToken,
    signals: &TransferSignals,
) -> FtpResult<Pumped>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let abort = &signals.abort;
    let mut buffer = vec![0u8; buffer_size];
    let mut moved: u64 = 0;
    loop {
        if limit.is_some_and(|limit| moved >= limit) {
            return Ok(Pumped::Completed(moved));
        }
        let read = tokio::select! {
            biased;
            _ = interrupted(cancel, abort) => return Ok(Pumped::Aborted),
            read = source.read(&mut buffer) => read.map_err(FtpError::ConnectionError)?,
        };
        if read == 0 {
            return match limit {
                None => Ok(Pumped::Completed(moved)),
                Some(limit) => Err(FtpError::ConnectionError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended after {moved} of {limit} bytes"),
                ))),
            };
        }
        tokio::select! {
            biased;
            _ = interrupted(cancel, abort) => return Ok(Pumped::Aborted),
            written = sink.write_all(&buffer[..read]) => written.map_err(FtpError::ConnectionError)?,
        }
        moved += read as u64;
        signals.progress(read);
    }
}

/// Resolves when the transfer must abort
async fn interrupted(cancel: &CancellationToken, abort: &CancellationToken) {
    tokio::select! {
        biased;
        _ = abort.cancelled() => debug!("Transfer aborted by caller"),
        _ = cancel.cancelled() => {
            debug!("Session cancelled; aborting transfer");
            abort.cancel();
        }
    }
}

/// ABOR handshake, run once the data connection has been closed
async fn abort_handshake(control: &mut ControlChannel) -> FtpResult<()> {
    debug!("Aborting transfer");
    control.write_command(&Command::Abor).await?;
    let first = control.read_reply().await?;
    match first.status() {
        Status::TransferAborted => {}
        Status::TransferComplete => {
            warn!("Server answered ABOR with 226 instead of 426");
        }
        _ => {
            return Err(FtpError::UnexpectedCode {
                expected: Status::TransferAborted.code(),
                got: first.code,
            })
        }
    }
    let second = control.read_reply().await?;
    expect(Status::TransferComplete, second)?;
    debug!("Transfer aborted");
    Ok(())
}

async fn remove_partial(path: &Path) -> FtpResult<()> {
    debug!("Removing partial download {}", path.display());
    tokio::fs::remove_file(path)
        .await
        .map_err(FtpError::ConnectionError)
}
