use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use tonic::{
    metadata::{Ascii, MetadataValue},
    service::Interceptor,
    transport::{Certificate, ClientTlsConfig},
    Request, Status,
};
use tracing::{debug, warn};

/// Metadata key LND reads the hex macaroon from.
pub const MACAROON_METADATA_KEY: &str = "macaroon";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("tls cert file not found at path: {}", .0.display())]
    MissingCertificate(PathBuf),
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("macaroon is not valid ascii metadata")]
    InvalidMacaroon,
}

/// TLS certificate plus optional macaroon, combined into one channel credential.
///
/// A value is built once per client generation and replaced wholesale when the
/// daemon's files change (the macaroon only appears after the wallet has been
/// created or unlocked).
#[derive(Clone, PartialEq, Eq)]
pub struct ChannelCredentials {
    tls_cert: Vec<u8>,
    macaroon_hex: Option<String>,
}

impl ChannelCredentials {
    /// Read the certificate (required) and macaroon (optional) from disk.
    ///
    /// A missing macaroon is not an error: LND can run with `--no-macaroons`,
    /// and the file does not exist before the wallet is initialized.
    ///
    /// # Errors
    /// Returns [`CredentialError::MissingCertificate`] when `tls_cert_path` does
    /// not exist, or [`CredentialError::Read`] when either file is unreadable.
    pub fn load(
        tls_cert_path: &Path,
        macaroon_path: Option<&Path>,
    ) -> Result<Self, CredentialError> {
        if !tls_cert_path.exists() {
            return Err(CredentialError::MissingCertificate(
                tls_cert_path.to_path_buf(),
            ));
        }
        let tls_cert = fs::read(tls_cert_path).map_err(|source| CredentialError::Read {
            path: tls_cert_path.to_path_buf(),
            source,
        })?;

        let macaroon_hex = match macaroon_path {
            Some(path) if path.exists() => {
                let raw = fs::read(path).map_err(|source| CredentialError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!(
                    target: "lnd_engine::credentials",
                    path = %path.display(),
                    macaroon_len = raw.len(),
                    "macaroon loaded"
                );
                Some(hex::encode(raw))
            }
            Some(path) => {
                warn!(
                    target: "lnd_engine::credentials",
                    path = %path.display(),
                    "macaroon path not found; continuing with tls-only credentials"
                );
                None
            }
            None => {
                warn!(
                    target: "lnd_engine::credentials",
                    "no macaroon path configured; continuing with tls-only credentials"
                );
                None
            }
        };

        Ok(Self {
            tls_cert,
            macaroon_hex,
        })
    }

    /// Build credentials from in-memory material.
    #[must_use]
    pub fn from_parts(tls_cert: Vec<u8>, macaroon_hex: Option<String>) -> Self {
        Self {
            tls_cert,
            macaroon_hex,
        }
    }

    #[must_use]
    pub fn tls_cert(&self) -> &[u8] {
        &self.tls_cert
    }

    #[must_use]
    pub fn macaroon_hex(&self) -> Option<&str> {
        self.macaroon_hex.as_deref()
    }

    #[must_use]
    pub fn has_macaroon(&self) -> bool {
        self.macaroon_hex.is_some()
    }

    /// Transport layer: trust the daemon's self-signed certificate as the CA.
    #[must_use]
    pub fn tls_config(&self, domain_name: Option<&str>) -> ClientTlsConfig {
        let tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(&self.tls_cert));
        match domain_name {
            Some(domain) => tls.domain_name(domain),
            None => tls,
        }
    }

    /// Per-call layer: attaches the macaroon to every request.
    ///
    /// # Errors
    /// Returns [`CredentialError::InvalidMacaroon`] if the hex string cannot be
    /// carried as ASCII metadata.
    pub fn interceptor(&self) -> Result<MacaroonInterceptor, CredentialError> {
        let macaroon = match &self.macaroon_hex {
            Some(hex) => Some(
                MetadataValue::try_from(hex.as_str())
                    .map_err(|_| CredentialError::InvalidMacaroon)?,
            ),
            None => None,
        };
        Ok(MacaroonInterceptor { macaroon })
    }
}

impl fmt::Debug for ChannelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCredentials")
            .field("tls_cert_len", &self.tls_cert.len())
            .field("macaroon", &self.macaroon_hex.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Interceptor carrying the application-layer (macaroon) credential.
#[derive(Clone, Debug, Default)]
pub struct MacaroonInterceptor {
    macaroon: Option<MetadataValue<Ascii>>,
}

impl Interceptor for MacaroonInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        if let Some(macaroon) = &self.macaroon {
            req.metadata_mut()
                .insert(MACAROON_METADATA_KEY, macaroon.clone());
        }
        Ok(req)
    }
}
