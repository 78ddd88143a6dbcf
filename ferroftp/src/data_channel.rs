//! # Data Channel
//!
//! Opening the data connection of a LIST, STOR or RETR command, in active or passive mode

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::address::{format_port, parse_pasv};
use crate::command::Command;
use crate::data_stream::DataStream;
use crate::reply::{expect_in, Reply};
use crate::session::{ControlChannel, FtpSession};
use crate::{FtpError, FtpResult, Mode, Status};

/// An open data connection and, in active mode, the listener it was accepted from.
/// Both are closed when the connection is dropped.
#[derive(Debug)]
pub(crate) struct DataConnection {
    pub stream: DataStream,
    listener: Option<TcpListener>,
}

impl DataConnection {
    /// Flush and shutdown the write side, then release the socket and the listener
    pub async fn close(mut self) -> FtpResult<()> {
        self.stream
            .shutdown()
            .await
            .map_err(FtpError::ConnectionError)?;
        drop(self.listener.take());
        Ok(())
    }
}

impl FtpSession {
    /// Open the data connection for `command`.
    ///
    /// The service command is written before the data connection is accepted (active) or
    /// dialed (passive); its preliminary reply is awaited alongside, so a refusal such as
    /// 450 or 550 is reported without waiting for a connection that will never come.
    pub(crate) async fn open_data_channel(
        &self,
        control: &mut ControlChannel,
        mode: Mode,
        command: Command,
    ) -> FtpResult<(DataConnection, Reply)> {
        let (stream, listener, reply) = match self.resolve_mode(mode) {
            Mode::Active => {
                let listener = self.active(control).await?;
                control.write_command(&command).await?;
                let (reply, (stream, addr)) = Self::connect_alongside(control, async {
                    listener.accept().await.map_err(FtpError::ConnectionError)
                })
                .await?;
                debug!("Connection received from {}", addr);
                (stream, Some(listener), reply)
            }
            Mode::Passive | Mode::Default => {
                let addr = self.pasv(control).await?;
                control.write_command(&command).await?;
                let (reply, stream) = Self::connect_alongside(control, async {
                    TcpStream::connect(addr)
                        .await
                        .map_err(FtpError::ConnectionError)
                })
                .await?;
                debug!("Connected to {}", addr);
                (stream, None, reply)
            }
        };

        let stream = match control.data_protection().cloned() {
            Some(tls) => match DataStream::from(stream).upgrade(&tls).await {
                Ok(stream) => stream,
                Err(err) => {
                    control.settle().await;
                    return Err(err);
                }
            },
            None => DataStream::from(stream),
        };

        Ok((DataConnection { stream, listener }, reply))
    }

    /// Await the preliminary reply of the service command and the data connection together.
    ///
    /// A refused command ends the attempt at once. Once the server has accepted the command, a
    /// failed connection still leaves its final reply pending, which is read before returning.
    async fn connect_alongside<T, F>(
        control: &mut ControlChannel,
        connect: F,
    ) -> FtpResult<(Reply, T)>
    where
        F: Future<Output = FtpResult<T>>,
    {
        tokio::pin!(connect);
        let reply = tokio::select! {
            reply = Self::service_reply(control) => reply?,
            connected = &mut connect => {
                let reply = Self::service_reply(control).await?;
                return Self::connected_or_settle(control, reply, connected).await;
            }
        };
        let connected = connect.await;
        Self::connected_or_settle(control, reply, connected).await
    }

    async fn connected_or_settle<T>(
        control: &mut ControlChannel,
        reply: Reply,
        connected: FtpResult<T>,
    ) -> FtpResult<(Reply, T)> {
        match connected {
            Ok(connection) => Ok((reply, connection)),
            Err(err) => {
                debug!("Data connection failed after {}: {}", reply, err);
                control.settle().await;
                Err(err)
            }
        }
    }

    /// Preliminary reply of a service command
    async fn service_reply(control: &mut ControlChannel) -> FtpResult<Reply> {
        let reply = control.read_reply().await?;
        expect_in(&[Status::AboutToSend, Status::AlreadyOpen], reply)
    }

    /// Runs the PASV command
    async fn pasv(&self, control: &mut ControlChannel) -> FtpResult<SocketAddr> {
        debug!("PASV command");
        let reply = control
            .command_expect(Command::Pasv, Status::PassiveMode)
            .await?;
        let addr = parse_pasv(&reply.message)?;
        trace!("Passive address: {}", addr);
        if self.config().nat_workaround && addr.ip().is_private() {
            let mut remote = control.peer_addr()?;
            remote.set_port(addr.port());
            trace!("Replacing site local address {} with {}", addr, remote);
            Ok(remote)
        } else {
            Ok(SocketAddr::V4(addr))
        }
    }

    /// Bind a local listener on the next free port and send a PORT command for it
    async fn active(&self, control: &mut ControlChannel) -> FtpResult<TcpListener> {
        let ip = match self.config().local_ip {
            Some(ip) => ip,
            None => control.local_addr()?.ip(),
        };
        let IpAddr::V4(ipv4) = ip else {
            return Err(FtpError::InvalidAddress(format!(
                "active mode requires an IPv4 address, got {ip}"
            )));
        };
        let port = self.ports().next_port(ip)?;
        let listener = TcpListener::bind((ip, port.port))
            .await
            .map_err(FtpError::ConnectionError)?;
        debug!("Active mode, listening on {}:{}", ip, port.port);

        debug!("Running PORT command");
        control
            .command_expect(
                Command::Port(format_port(ipv4, port.n1, port.n2)),
                Status::CommandOk,
            )
            .await?;

        Ok(listener)
    }
}
