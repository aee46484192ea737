use crate::{
    client::NodeRpc,
    credentials::{ChannelCredentials, CredentialError},
};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("empty daemon host")]
    EmptyHost,
    #[error("invalid gRPC endpoint {uri}")]
    InvalidEndpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("invalid TLS client config")]
    Tls(#[source] tonic::transport::Error),
}

/// Produces RPC handles bound to a daemon address and a credential set.
///
/// The engine calls [`open`](Self::open) at the start of every validation
/// attempt, so implementations must not cache handles across calls.
pub trait Transport: Send + Sync {
    /// RPC handle produced for each client generation.
    type Rpc: NodeRpc + 'static;

    /// Build a fresh handle for `host` authenticated with `credentials`.
    fn open(
        &self,
        host: &str,
        credentials: &ChannelCredentials,
    ) -> Result<Self::Rpc, TransportError>;
}

pub mod direct;
