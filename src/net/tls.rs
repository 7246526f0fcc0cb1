//! TLS configuration and certificate loading.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("cannot read TLS identity {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS identity {0} contains no certificate")]
    NoCertificate(PathBuf),

    #[error("TLS identity {0} contains no private key")]
    NoPrivateKey(PathBuf),

    #[error("cannot generate TLS identity: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("invalid client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

/// Server identity: certificate chain plus private key.
#[derive(Clone)]
pub struct SecurityContext {
    source: Option<PathBuf>,
    certs: Vec<CertificateDer<'static>>,
    key: Arc<PrivateKeyDer<'static>>,
}

impl SecurityContext {
    pub fn new(certs: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
        Self {
            source: None,
            certs,
            key: Arc::new(key),
        }
    }

    /// Load a PEM bundle holding the certificate chain and the private key.
    pub fn from_pem_file(path: &Path) -> Result<Self, TlsError> {
        let io_err = |source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        if certs.is_empty() {
            return Err(TlsError::NoCertificate(path.to_path_buf()));
        }

        let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
        let key = rustls_pemfile::private_key(&mut reader)
            .map_err(io_err)?
            .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))?;

        Ok(Self {
            source: Some(path.to_path_buf()),
            certs,
            key: Arc::new(key),
        })
    }

    /// Generate a self-signed identity for the given host names.
    pub fn self_signed(hosts: Vec<String>) -> Result<Self, TlsError> {
        let rcgen::CertifiedKey { cert, key_pair } = rcgen::generate_simple_self_signed(hosts)?;
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        Ok(Self::new(vec![cert.der().clone()], key))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certs
    }

    /// Build the acceptor configuration for the connector.
    ///
    /// With `client_authentication`, clients must present a certificate that
    /// chains to one of the identity's own certificates.
    pub fn server_config(&self, client_authentication: bool) -> Result<RustlsConfig, TlsError> {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let builder = ServerConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;
        let builder = if client_authentication {
            let mut roots = RootCertStore::empty();
            for cert in &self.certs {
                roots.add(cert.clone())?;
            }
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider).build()?;
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        let mut config = builder.with_single_cert(self.certs.clone(), self.key.clone_key())?;
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        tracing::debug!(
            client_authentication,
            certificates = self.certs.len(),
            "TLS acceptor configured"
        );
        Ok(RustlsConfig::from_config(Arc::new(config)))
    }
}

impl PartialEq for SecurityContext {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.certs == other.certs
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("source", &self.source)
            .field("certificates", &self.certs.len())
            .finish_non_exhaustive()
    }
}
