//! # Data Stream
//!
//! Byte stream used by both the control and the data connections. It is either a plain TCP
//! stream or the same stream wrapped in a TLS client session.

use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf, Result};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::tls::TlsContext;
use crate::FtpResult;

/// Data Stream used for communications. It can be both of type Tcp in case of plain communication or Tls in case of FTPS
#[derive(Debug)]
#[pin_project(project = DataStreamProj)]
pub enum DataStream {
    Tcp(#[pin] TcpStream),
    Tls(#[pin] Box<TlsStream<TcpStream>>),
}

impl DataStream {
    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        match self {
            DataStream::Tcp(stream) => stream,
            DataStream::Tls(stream) => stream.get_ref().0,
        }
    }

    /// Whether the stream is wrapped in TLS
    pub fn is_secure(&self) -> bool {
        matches!(self, DataStream::Tls(_))
    }

    /// Name of the cipher suite negotiated for this stream, if it's secure
    pub fn negotiated_cipher_suite(&self) -> Option<String> {
        match self {
            DataStream::Tcp(_) => None,
            DataStream::Tls(stream) => stream
                .get_ref()
                .1
                .negotiated_cipher_suite()
                .map(|suite| format!("{:?}", suite.suite())),
        }
    }

    /// Wrap a plain stream in TLS, running the client handshake.
    /// The stream is returned as-is if it is already secure.
    pub async fn upgrade(self, tls: &TlsContext) -> FtpResult<Self> {
        match self {
            DataStream::Tcp(stream) => {
                let stream = tls.connect(stream).await?;
                Ok(DataStream::Tls(Box::new(stream)))
            }
            secure @ DataStream::Tls(_) => Ok(secure),
        }
    }
}

impl From<TcpStream> for DataStream {
    fn from(stream: TcpStream) -> Self {
        DataStream::Tcp(stream)
    }
}

impl AsyncRead for DataStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        match self.project() {
            DataStreamProj::Tcp(stream) => stream.poll_read(cx, buf),
            DataStreamProj::Tls(stream) => stream.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for DataStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>> {
        match self.project() {
            DataStreamProj::Tcp(stream) => stream.poll_write(cx, buf),
            DataStreamProj::Tls(stream) => stream.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        match self.project() {
            DataStreamProj::Tcp(stream) => stream.poll_flush(cx),
            DataStreamProj::Tls(stream) => stream.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        match self.project() {
            DataStreamProj::Tcp(stream) => stream.poll_shutdown(cx),
            DataStreamProj::Tls(stream) => stream.poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod test {

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn should_pipe_plain_stream() {
        crate::log_init();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            buf
        });
        let mut stream = DataStream::from(TcpStream::connect(addr).await.unwrap());
        assert!(!stream.is_secure());
        assert_eq!(stream.negotiated_cipher_suite(), None);
        assert_eq!(stream.get_ref().peer_addr().unwrap(), addr);
        stream.write_all(b"hello").await.unwrap();
        stream.shutdown().await.unwrap();
        assert_eq!(server.await.unwrap(), b"hello".to_vec());
    }
}
