use std::time::Duration;

use tonic::transport::Endpoint;

use super::{Transport, TransportError};
use crate::{client::LndClient, credentials::ChannelCredentials};

/// Default deadline applied to every RPC.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default budget for establishing the TCP + TLS connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Direct TLS gRPC connection to LND.
///
/// The daemon's own `tls.cert` is installed as the only trusted CA. Channels
/// are connected lazily, so [`Transport::open`] never blocks on the network;
/// connection failures surface as `Unavailable` statuses on the first call.
#[derive(Clone, Debug)]
pub struct DirectGrpc {
    domain_name: Option<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Default for DirectGrpc {
    fn default() -> Self {
        Self {
            domain_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl DirectGrpc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the TLS server name checked against the certificate.
    ///
    /// LND's generated certificate lists `localhost` plus the configured
    /// `tlsextraip`/`tlsextradomain` values; dialing an address not in that
    /// list needs an override.
    #[must_use]
    pub fn with_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.domain_name = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}

/// LND hosts are configured as `host:port`; tonic wants a full URI.
pub(crate) fn endpoint_uri(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

impl Transport for DirectGrpc {
    type Rpc = LndClient;

    fn open(
        &self,
        host: &str,
        credentials: &ChannelCredentials,
    ) -> Result<Self::Rpc, TransportError> {
        if host.trim().is_empty() {
            return Err(TransportError::EmptyHost);
        }
        let uri = endpoint_uri(host);
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|source| TransportError::InvalidEndpoint { uri, source })?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .tls_config(credentials.tls_config(self.domain_name.as_deref()))
            .map_err(TransportError::Tls)?;
        let interceptor = credentials.interceptor()?;
        Ok(LndClient::new(endpoint.connect_lazy(), interceptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https_scheme() {
        assert_eq!(endpoint_uri("127.0.0.1:10009"), "https://127.0.0.1:10009");
        assert_eq!(endpoint_uri("https://lnd:10009"), "https://lnd:10009");
    }

    #[test]
    fn invalid_host_is_rejected_before_tls() {
        let creds = ChannelCredentials::from_parts(Vec::new(), None);
        let err = DirectGrpc::new().open("lnd host:10009", &creds).err();
        assert!(matches!(
            err,
            Some(TransportError::InvalidEndpoint { ref uri, .. }) if uri == "https://lnd host:10009"
        ));
    }

    #[test]
    fn empty_host_is_rejected() {
        let creds = ChannelCredentials::from_parts(Vec::new(), None);
        let err = DirectGrpc::new().open("  ", &creds).err();
        assert!(matches!(err, Some(TransportError::EmptyHost)));
    }
}
