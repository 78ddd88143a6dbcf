//! # TLS
//!
//! rustls client configuration built from the session [`TlsOptions`]

use std::fmt;
use std::sync::Arc;

use rustls_crate::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls_crate::crypto::{self, CryptoProvider};
use rustls_crate::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::TlsOptions;
use crate::{FtpError, FtpResult};

/// Connector and server name shared by the control connection and the data connections of
/// one session
#[derive(Clone)]
pub struct TlsContext {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Build the client configuration for `host` (overridden by `options.server_name`)
    pub fn new(options: &TlsOptions, host: &str) -> FtpResult<Self> {
        let domain = options.server_name.as_deref().unwrap_or(host).to_string();
        let server_name =
            ServerName::try_from(domain).map_err(|e| FtpError::SecureError(e.to_string()))?;
        let provider = Arc::new(provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| FtpError::SecureError(e.to_string()))?;
        let config = if options.skip_verify {
            warn!("server certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification(provider)))
                .with_no_client_auth()
        } else {
            let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        };

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
        })
    }

    /// Run the client handshake over `stream`
    pub async fn connect(&self, stream: TcpStream) -> FtpResult<TlsStream<TcpStream>> {
        debug!("TLS handshake with {:?}", self.server_name);
        self.connector
            .connect(self.server_name.clone(), stream)
            .await
            .map_err(|e| FtpError::SecureError(e.to_string()))
    }
}

/// Names of the cipher suites the client offers, most preferred first
pub fn cipher_suites() -> Vec<String> {
    provider()
        .cipher_suites
        .iter()
        .map(|suite| format!("{:?}", suite.suite()))
        .collect()
}

fn provider() -> CryptoProvider {
    crypto::ring::default_provider()
}

/// Accepts any server certificate, still checking handshake signatures
#[derive(Debug)]
struct NoVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls_crate::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls_crate::Error> {
        crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls_crate::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
