//! # Operations
//!
//! Directory and metadata commands. Each one is a single command and reply pair, except for
//! rename (RNFR, RNTO) and LIST, which reads its output from a data connection.

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use crate::address::{parse_date, parse_pwd, parse_size};
use crate::command::Command;
use crate::data_stream::DataStream;
use crate::reply::{expect_in, Reply};
use crate::session::FtpSession;
use crate::types::FileType;
use crate::{FtpError, FtpResult, Mode, Status};

impl FtpSession {
    /// Change the current directory to `path`
    pub async fn cwd(&self, path: &str) -> FtpResult<Reply> {
        debug!("Changing working directory to {}", path);
        self.control()
            .await?
            .command_expect(Command::Cwd(path.to_string()), Status::RequestedFileActionOk)
            .await
    }

    /// Get the current directory
    pub async fn pwd(&self) -> FtpResult<(Reply, String)> {
        debug!("Getting working directory");
        let reply = self
            .control()
            .await?
            .command_expect(Command::Pwd, Status::PathCreated)
            .await?;
        let path = parse_pwd(&reply.message)?;
        Ok((reply, path))
    }

    /// Create a directory
    pub async fn mkdir(&self, path: &str) -> FtpResult<Reply> {
        debug!("Creating directory at {}", path);
        self.control()
            .await?
            .command_expect(Command::Mkd(path.to_string()), Status::PathCreated)
            .await
    }

    /// Remove a directory
    pub async fn rmdir(&self, path: &str) -> FtpResult<Reply> {
        debug!("Removing directory {}", path);
        self.control()
            .await?
            .command_expect(Command::Rmd(path.to_string()), Status::RequestedFileActionOk)
            .await
    }

    /// Remove a file
    pub async fn delete(&self, path: &str) -> FtpResult<Reply> {
        debug!("Removing file {}", path);
        self.control()
            .await?
            .command_expect(Command::Dele(path.to_string()), Status::RequestedFileActionOk)
            .await
    }

    /// Rename `from` to `to`.
    ///
    /// Only the RNTO reply is validated; nothing is undone if RNTO fails after RNFR succeeded.
    pub async fn rename(&self, from: &str, to: &str) -> FtpResult<Reply> {
        debug!("Renaming '{}' to '{}'", from, to);
        let mut control = self.control().await?;
        control.command(Command::RenameFrom(from.to_string())).await?;
        control
            .command_expect(Command::RenameTo(to.to_string()), Status::RequestedFileActionOk)
            .await
    }

    /// Size of a file in bytes
    pub async fn size(&self, path: &str) -> FtpResult<(Reply, u64)> {
        debug!("Getting file size for {}", path);
        let reply = self
            .control()
            .await?
            .command_expect(Command::Size(path.to_string()), Status::File)
            .await?;
        let size = parse_size(&reply.message)?;
        Ok((reply, size))
    }

    /// Last modification time of a file
    pub async fn mdtm(&self, path: &str) -> FtpResult<(Reply, DateTime<Utc>)> {
        debug!("Getting modification time for {}", path);
        let reply = self
            .control()
            .await?
            .command_expect(Command::Mdtm(path.to_string()), Status::File)
            .await?;
        let time = parse_date(&reply.message)?;
        Ok((reply, time))
    }

    /// Ping the server
    pub async fn noop(&self) -> FtpResult<Reply> {
        debug!("Pinging server");
        self.control()
            .await?
            .command_expect(Command::Noop, Status::CommandOk)
            .await
    }

    /// Set the transfer type
    pub async fn transfer_type(&self, file_type: FileType) -> FtpResult<Reply> {
        debug!("Setting transfer type {}", file_type);
        self.control()
            .await?
            .command_expect(Command::Type(file_type), Status::CommandOk)
            .await
    }

    /// List `path`, or the current directory, one entry per line
    pub async fn list(&self, mode: Mode, path: Option<&str>) -> FtpResult<Vec<String>> {
        debug!("Reading {} directory content", path.unwrap_or("working"));
        let mut control = self.control().await?;
        let (data, _) = self
            .open_data_channel(&mut control, mode, Command::List(path.map(String::from)))
            .await?;
        let mut reader = BufReader::new(data.stream);
        let lines = get_lines_from_stream(&mut reader).await;
        drop(reader);
        let reply = control.read_reply().await?;
        expect_in(
            &[Status::TransferComplete, Status::RequestedFileActionOk],
            reply,
        )?;
        lines
    }

    /// Run [`FtpSession::list`] in the background; the listing is sent on the returned channel
    pub fn spawn_list(
        &self,
        mode: Mode,
        path: Option<String>,
    ) -> oneshot::Receiver<FtpResult<Vec<String>>> {
        let (tx, rx) = oneshot::channel();
        let session = self.clone();
        tokio::spawn(async move {
            let _ = tx.send(session.list(mode, path.as_deref()).await);
        });
        rx
    }
}

/// Read lines from the data stream until it ends; empty lines are skipped
async fn get_lines_from_stream(data_stream: &mut BufReader<DataStream>) -> FtpResult<Vec<String>> {
    let mut lines: Vec<String> = Vec::new();

    loop {
        let mut line = String::new();
        match data_stream.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let line = line.trim_end_matches(['\r', '\n']);
                if line.is_empty() {
                    continue;
                }
                lines.push(line.to_string());
            }
            Err(err) => return Err(FtpError::ConnectionError(err)),
        }
    }
    trace!("Lines from stream {:?}", lines);
    Ok(lines)
}
