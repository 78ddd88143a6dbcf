//! # Test server
//!
//! A small FTP server serving a temporary directory, used by the session tests

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::{FtpSession, SessionConfig};

const USERNAME: &str = "test";
const PASSWORD: &str = "test";
const GREETING: &str = "220-ferroftp test server\r\n220 ready\r\n";

/// Each configuration hands out its own range of active mode ports, so tests running in
/// parallel don't race for the same port
static NEXT_FIRST_PORT: AtomicU16 = AtomicU16::new(30000);

/// Files whose name starts with this prefix are sent in small throttled chunks
const SLOW_PREFIX: &str = "slow";
/// Transfers of files whose name starts with this prefix never complete on their own: the data
/// connection is held open until ABOR
const HOLD_PREFIX: &str = "hold";
/// Bytes sent before a held download stalls
const HOLD_SENT: usize = 4096;

/// Deviations from the regular behaviour, shared by every connection
#[derive(Default)]
struct Script {
    abort_replies: Option<Vec<String>>,
    refuse_data: bool,
}

pub struct TestServer {
    addr: SocketAddr,
    root: TempDir,
    script: Arc<Mutex<Script>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start serving an empty temporary directory on a random localhost port
    pub async fn start() -> Self {
        let root = TempDir::new().unwrap();
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let path = root.path().to_path_buf();
        let script = Arc::new(Mutex::new(Script::default()));
        let shared = script.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let connection = Connection::new(path.clone(), shared.clone());
                tokio::spawn(async move {
                    if let Err(err) = connection.serve(stream).await {
                        debug!("test server connection closed: {}", err);
                    }
                });
            }
        });
        Self {
            addr,
            root,
            script,
            task,
        }
    }

    /// Answer every ABOR with `replies` instead of the regular handshake
    pub fn abort_replies(&self, replies: &[&str]) {
        self.script.lock().unwrap().abort_replies =
            Some(replies.iter().map(|r| r.to_string()).collect());
    }

    /// Advertise passive ports nobody listens on
    pub fn refuse_data_connections(&self) {
        self.script.lock().unwrap().refuse_data = true;
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Session configuration with valid credentials
    pub fn config(&self) -> SessionConfig {
        SessionConfig::default()
            .credentials(USERNAME, PASSWORD)
            .first_port(NEXT_FIRST_PORT.fetch_add(64, Ordering::Relaxed))
    }

    /// Dial and log in
    pub async fn session(&self) -> FtpSession {
        FtpSession::dial_and_authenticate(&self.addr(), self.config())
            .await
            .unwrap()
    }

    /// Local path of `name` in the served directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    pub fn write_file(&self, name: &str, data: &[u8]) {
        std::fs::write(self.path(name), data).unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// State of one client connection
struct Connection {
    root: PathBuf,
    script: Arc<Mutex<Script>>,
    cwd: String,
    username: Option<String>,
    passive: Option<TcpListener>,
    active: Option<SocketAddr>,
    rename_from: Option<PathBuf>,
    held: Option<TcpStream>,
}

impl Connection {
    fn new(root: PathBuf, script: Arc<Mutex<Script>>) -> Self {
        Self {
            root,
            script,
            cwd: String::from("/"),
            username: None,
            passive: None,
            active: None,
            rename_from: None,
            held: None,
        }
    }

    async fn serve(mut self, stream: TcpStream) -> io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        writer.write_all(GREETING.as_bytes()).await?;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            let line = line.trim_end_matches(['\r', '\n']);
            let (command, arg) = match line.split_once(' ') {
                Some((command, arg)) => (command.to_ascii_uppercase(), arg.to_string()),
                None => (line.to_ascii_uppercase(), String::new()),
            };
            if command == "QUIT" {
                reply(&mut writer, "221 goodbye").await?;
                return writer.shutdown().await;
            }
            self.dispatch(&mut writer, &command, &arg).await?;
        }
    }

    async fn dispatch(&mut self, w: &mut OwnedWriteHalf, command: &str, arg: &str) -> io::Result<()> {
        match command {
            "USER" => {
                self.username = Some(arg.to_string());
                reply(w, "331 password required").await
            }
            "PASS" if self.username.as_deref() == Some(USERNAME) && arg == PASSWORD => {
                reply(w, "230 logged in").await
            }
            "PASS" => reply(w, "530 login incorrect").await,
            "AUTH" => reply(w, "502 security extensions not implemented").await,
            "NOOP" | "TYPE" => reply(w, "200 ok").await,
            "ABOR" => self.abort(w).await,
            "PWD" => reply(w, &format!("257 \"{}\" is the current directory", self.cwd)).await,
            "CWD" => {
                let cwd = self.virtual_path(arg);
                if self.local_path(&cwd).is_dir() {
                    self.cwd = cwd;
                    reply(w, "250 directory changed").await
                } else {
                    reply(w, "550 no such directory").await
                }
            }
            "MKD" => match tokio::fs::create_dir(self.resolve(arg)).await {
                Ok(()) => reply(w, &format!("257 \"{arg}\" created")).await,
                Err(_) => reply(w, "550 cannot create directory").await,
            },
            "RMD" => match tokio::fs::remove_dir(self.resolve(arg)).await {
                Ok(()) => reply(w, "250 directory removed").await,
                Err(_) => reply(w, "550 cannot remove directory").await,
            },
            "DELE" => match tokio::fs::remove_file(self.resolve(arg)).await {
                Ok(()) => reply(w, "250 file removed").await,
                Err(_) => reply(w, "550 cannot remove file").await,
            },
            "RNFR" => {
                let from = self.resolve(arg);
                if from.exists() {
                    self.rename_from = Some(from);
                    reply(w, "350 ready for RNTO").await
                } else {
                    reply(w, "550 no such file").await
                }
            }
            "RNTO" => match self.rename_from.take() {
                Some(from) => match tokio::fs::rename(from, self.resolve(arg)).await {
                    Ok(()) => reply(w, "250 rename successful").await,
                    Err(_) => reply(w, "550 rename failed").await,
                },
                None => reply(w, "503 RNFR required first").await,
            },
            "SIZE" => match tokio::fs::metadata(self.resolve(arg)).await {
                Ok(meta) if meta.is_file() => reply(w, &format!("213 {}", meta.len())).await,
                _ => reply(w, "550 no such file").await,
            },
            "MDTM" => match tokio::fs::metadata(self.resolve(arg)).await {
                Ok(meta) if meta.is_file() => {
                    let modified: DateTime<Utc> = meta.modified()?.into();
                    reply(w, &format!("213 {}", modified.format("%Y%m%d%H%M%S%.3f"))).await
                }
                _ => reply(w, "550 no such file").await,
            },
            "PASV" => {
                let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
                let port = listener.local_addr()?.port();
                self.passive = match self.script.lock().unwrap().refuse_data {
                    true => None,
                    false => Some(listener),
                };
                self.active = None;
                reply(
                    w,
                    &format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})",
                        port >> 8,
                        port & 0xff
                    ),
                )
                .await
            }
            "PORT" => match parse_port(arg) {
                Some(addr) => {
                    self.active = Some(SocketAddr::V4(addr));
                    self.passive = None;
                    reply(w, "200 PORT command successful").await
                }
                None => reply(w, "501 bad PORT argument").await,
            },
            "LIST" => self.list(w, arg).await,
            "STOR" => self.store(w, arg).await,
            "RETR" => self.retrieve(w, arg).await,
            _ => reply(w, "502 command not implemented").await,
        }
    }

    async fn list(&mut self, w: &mut OwnedWriteHalf, arg: &str) -> io::Result<()> {
        let dir = self.resolve(if arg.is_empty() { "." } else { arg });
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            self.reset_data();
            return reply(w, "450 no such directory").await;
        };
        let mut lines = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            let kind = if meta.is_dir() { 'd' } else { '-' };
            lines.push(format!(
                "{kind}rw-r--r-- 1 test test {:>8} Jan 01 00:00 {}\r\n",
                meta.len(),
                entry.file_name().to_string_lossy()
            ));
        }
        lines.sort_by(|a, b| a.rsplit(' ').next().cmp(&b.rsplit(' ').next()));
        reply(w, "150 here comes the directory listing").await?;
        let Ok(mut data) = self.data_connection().await else {
            return reply(w, "425 can't open data connection").await;
        };
        for line in lines {
            data.write_all(line.as_bytes()).await?;
        }
        data.shutdown().await?;
        reply(w, "226 directory send OK").await
    }

    async fn store(&mut self, w: &mut OwnedWriteHalf, arg: &str) -> io::Result<()> {
        let path = self.resolve(arg);
        reply(w, "150 ok to send data").await?;
        let Ok(mut data) = self.data_connection().await else {
            return reply(w, "425 can't open data connection").await;
        };
        if is_held(arg) {
            tokio::fs::write(path, b"").await?;
            self.held = Some(data);
            return Ok(());
        }
        let mut content = Vec::new();
        match data.read_to_end(&mut content).await {
            Ok(_) => {
                tokio::fs::write(path, content).await?;
                reply(w, "226 transfer complete").await
            }
            Err(_) => {
                tokio::fs::write(path, content).await?;
                reply(w, "426 connection closed; transfer aborted").await
            }
        }
    }

    async fn retrieve(&mut self, w: &mut OwnedWriteHalf, arg: &str) -> io::Result<()> {
        let path = self.resolve(arg);
        let Ok(content) = tokio::fs::read(&path).await else {
            self.reset_data();
            return reply(w, "550 no such file").await;
        };
        let slow = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(SLOW_PREFIX));
        reply(w, "150 opening data connection").await?;
        let Ok(mut data) = self.data_connection().await else {
            return reply(w, "425 can't open data connection").await;
        };
        if is_held(arg) {
            let _ = data.write_all(&content[..content.len().min(HOLD_SENT)]).await;
            self.held = Some(data);
            return Ok(());
        }
        let sent = if slow {
            send_slowly(&mut data, &content).await
        } else {
            data.write_all(&content).await
        };
        match sent.and(data.shutdown().await) {
            Ok(()) => reply(w, "226 transfer complete").await,
            Err(_) => reply(w, "426 connection closed; transfer aborted").await,
        }
    }

    /// Reply to ABOR and release a held data connection
    async fn abort(&mut self, w: &mut OwnedWriteHalf) -> io::Result<()> {
        let held = self.held.take();
        let scripted = self.script.lock().unwrap().abort_replies.clone();
        let replies = match (scripted, &held) {
            (Some(replies), _) => replies,
            (None, Some(_)) => vec![
                String::from("426 transfer aborted"),
                String::from("226 abort successful"),
            ],
            (None, None) => vec![String::from("226 abort successful")],
        };
        drop(held);
        for line in replies {
            reply(w, &line).await?;
        }
        Ok(())
    }

    /// Accept the passive connection or dial the active address
    async fn data_connection(&mut self) -> io::Result<TcpStream> {
        if let Some(listener) = self.passive.take() {
            return listener.accept().await.map(|(stream, _)| stream);
        }
        match self.active.take() {
            Some(addr) => TcpStream::connect(addr).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no PASV or PORT before transfer",
            )),
        }
    }

    fn reset_data(&mut self) {
        self.passive = None;
        self.active = None;
    }

    /// Absolute virtual path of `arg`
    fn virtual_path(&self, arg: &str) -> String {
        let mut parts: Vec<&str> = if arg.starts_with('/') {
            Vec::new()
        } else {
            self.cwd.split('/').filter(|p| !p.is_empty()).collect()
        };
        for part in arg.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if part == ".." {
                parts.pop();
            } else {
                parts.push(part);
            }
        }
        format!("/{}", parts.join("/"))
    }

    fn local_path(&self, virtual_path: &str) -> PathBuf {
        self.root.join(virtual_path.trim_start_matches('/'))
    }

    fn resolve(&self, arg: &str) -> PathBuf {
        self.local_path(&self.virtual_path(arg))
    }
}

fn is_held(arg: &str) -> bool {
    arg.rsplit('/').next().is_some_and(|name| name.starts_with(HOLD_PREFIX))
}

async fn reply(w: &mut OwnedWriteHalf, line: &str) -> io::Result<()> {
    w.write_all(format!("{line}\r\n").as_bytes()).await?;
    w.flush().await
}

async fn send_slowly(data: &mut TcpStream, content: &[u8]) -> io::Result<()> {
    for chunk in content.chunks(1024) {
        data.write_all(chunk).await?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

fn parse_port(arg: &str) -> Option<SocketAddrV4> {
    let fields = arg
        .split(',')
        .map(|f| f.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .ok()?;
    let [a, b, c, d, p1, p2] = fields[..] else {
        return None;
    };
    Some(SocketAddrV4::new(
        Ipv4Addr::new(a, b, c, d),
        (u16::from(p1) << 8) | u16::from(p2),
    ))
}
