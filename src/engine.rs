use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::{sync::Mutex, time::error::Elapsed};
use tonic::Status;
use tracing::{debug, error, info, warn};

use crate::{
    client::NodeRpc,
    config::{CurrencyConfig, EngineConfig},
    credentials::{ChannelCredentials, CredentialError},
    liquidity::{self, Direction},
    probe::{self, ProbeResult, SERVICE_DISABLED_CODE},
    proto::lnrpc,
    retry::{self, RetryPolicy},
    status::{EngineStatus, StatusHandle, ValidationEvent},
    transport::{direct::DirectGrpc, Transport, TransportError},
};

/// Errors surfaced by [`LndEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("host is required for lnd-engine initialization")]
    MissingHost,
    #[error("{0} is not a valid symbol for this engine")]
    UnknownSymbol(String),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("wallet is locked")]
    Locked,
    #[error("daemon unreachable: {0}")]
    Unreachable(#[source] Box<Status>),
    #[error("LND has no chains configured")]
    NoChains,
    #[error("LND can have at most one chain active, found: {}", .0.join(", "))]
    MultipleChains(Vec<String>),
    #[error("mismatched configuration: engine is configured for {expected}, LND is configured for {found}")]
    ChainMismatch { expected: String, found: String },
    #[error("engine configuration is invalid for this daemon; not retrying")]
    InvalidConfiguration,
    #[error("engine not ready: status is {0}")]
    NotReady(EngineStatus),
    #[error("validation budget ran out during an attempt")]
    TimedOut(#[from] Elapsed),
    #[error(transparent)]
    Rpc(#[from] Box<Status>),
}

impl From<Status> for EngineError {
    fn from(status: Status) -> Self {
        Self::Rpc(Box::new(status))
    }
}

impl EngineError {
    /// Whether a later validation attempt may succeed where this one failed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Locked
                | EngineError::Unreachable(_)
                | EngineError::NoChains
                | EngineError::Rpc(_)
        )
    }
}

/// Result alias that defaults to [`EngineError`].
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Compare the chains reported by `GetInfo` with the engine's currency.
///
/// # Errors
/// [`EngineError::NoChains`] (retryable) when the daemon reports nothing yet,
/// [`EngineError::MultipleChains`] or [`EngineError::ChainMismatch`] otherwise.
pub fn check_chains(chains: &[lnrpc::Chain], currency: &CurrencyConfig) -> Result<()> {
    match chains {
        [] => Err(EngineError::NoChains),
        [only] if only.chain == currency.chain_name => Ok(()),
        [only] => Err(EngineError::ChainMismatch {
            expected: currency.chain_name.to_string(),
            found: only.chain.clone(),
        }),
        many => Err(EngineError::MultipleChains(
            many.iter().map(|c| c.chain.clone()).collect(),
        )),
    }
}

/// Lock-aware handle on one LND daemon.
///
/// The engine owns its [`EngineStatus`] and the current RPC handle. Only
/// [`validate`](Self::validate) moves the status; readers take snapshots.
pub struct LndEngine<T: Transport = DirectGrpc> {
    config: EngineConfig,
    currency: &'static CurrencyConfig,
    transport: T,
    status: StatusHandle,
    rpc: RwLock<Option<Arc<T::Rpc>>>,
    // Serializes validation attempts across callers.
    validation: Mutex<()>,
}

impl LndEngine<DirectGrpc> {
    /// Build an engine that talks to LND over direct TLS gRPC.
    ///
    /// # Errors
    /// Fails on a missing host, an unknown currency symbol, or a missing TLS certificate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_transport(config, DirectGrpc::new())
    }
}

impl<T: Transport> LndEngine<T> {
    /// Build an engine over a caller-supplied [`Transport`].
    ///
    /// No connection is opened here; the first handle is built by
    /// [`validate`](Self::validate) or [`reload`](Self::reload).
    ///
    /// # Errors
    /// Fails on a missing host, an unknown currency symbol, or a missing TLS certificate.
    pub fn with_transport(config: EngineConfig, transport: T) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(EngineError::MissingHost);
        }
        let currency = CurrencyConfig::find(&config.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(config.symbol.clone()))?;
        if !config.tls_cert_path.exists() {
            return Err(CredentialError::MissingCertificate(config.tls_cert_path.clone()).into());
        }
        Ok(Self {
            config,
            currency,
            transport,
            status: StatusHandle::new(),
            rpc: RwLock::new(None),
            validation: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn currency(&self) -> &'static CurrencyConfig {
        self.currency
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status.get()
    }

    /// Cloneable status reader for other tasks.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.status() == EngineStatus::Validated
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status() == EngineStatus::Locked
    }

    /// Re-read credentials from disk and replace the RPC handle.
    ///
    /// The macaroon only exists once the wallet has been created, so a handle
    /// built while locked may lack it. On failure the previous handle is
    /// dropped and the status falls back to [`EngineStatus::Unknown`].
    ///
    /// # Errors
    /// Credential or transport configuration errors.
    pub fn reload(&self) -> Result<Arc<T::Rpc>> {
        match self.open_client() {
            Ok(rpc) => {
                *self.rpc.write() = Some(Arc::clone(&rpc));
                Ok(rpc)
            }
            Err(err) => {
                self.rpc.write().take();
                self.transition(ValidationEvent::ClientUnavailable);
                Err(err)
            }
        }
    }

    fn open_client(&self) -> Result<Arc<T::Rpc>> {
        let credentials = ChannelCredentials::load(
            &self.config.tls_cert_path,
            self.config.macaroon_path.as_deref(),
        )?;
        Ok(Arc::new(self.transport.open(&self.config.host, &credentials)?))
    }

    /// Validate with the configured [`RetryPolicy`].
    ///
    /// # Errors
    /// See [`validate_with`](Self::validate_with).
    pub async fn validate(&self) -> Result<EngineStatus> {
        self.validate_with(&self.config.retry).await
    }

    /// Probe the daemon and check its chain until the engine is validated.
    ///
    /// Locked, unreachable and still-initializing daemons are retried under
    /// `policy`; the last error is returned once the budget runs out. Chain
    /// mismatches fail immediately and leave the engine in
    /// [`EngineStatus::InvalidConfiguration`] for good.
    ///
    /// An attempt still in flight when `max_elapsed` runs out is abandoned
    /// with [`EngineError::TimedOut`] and the engine is marked unreachable.
    ///
    /// # Errors
    /// The fatal error, or the last retryable one on exhaustion.
    pub async fn validate_with(&self, policy: &RetryPolicy) -> Result<EngineStatus> {
        let _attempts = self.validation.lock().await;
        if self.status().is_terminal() {
            return Err(EngineError::InvalidConfiguration);
        }

        let result = retry::retry(
            policy,
            EngineError::is_retryable,
            |attempt, err| {
                warn!(
                    target: "lnd_engine::validate",
                    attempt,
                    status = %self.status(),
                    error = %err,
                    "validation attempt failed"
                );
            },
            |attempt| self.validate_once(attempt),
        )
        .await;

        if let Err(err) = &result {
            if matches!(err, EngineError::TimedOut(_)) {
                // The daemon never answered within the budget.
                self.transition(ValidationEvent::DaemonUnreachable);
            }
            if !err.is_retryable() {
                error!(
                    target: "lnd_engine::validate",
                    status = %self.status(),
                    error = %err,
                    "engine validation failed"
                );
            }
        }
        result
    }

    async fn validate_once(&self, attempt: u32) -> Result<EngineStatus> {
        debug!(
            target: "lnd_engine::validate",
            attempt,
            status = %self.status(),
            "starting validation attempt"
        );
        let rpc = self.reload()?;

        match probe::probe(&*rpc).await {
            ProbeResult::Available => self.validate_node_config(&rpc).await,
            ProbeResult::Disabled => self.locked_or_unreachable(&rpc).await,
            ProbeResult::TransientError(status) => {
                self.transition(ValidationEvent::DaemonUnreachable);
                Err(EngineError::Unreachable(Box::new(status)))
            }
        }
    }

    async fn validate_node_config(&self, rpc: &T::Rpc) -> Result<EngineStatus> {
        let info = match rpc.get_info().await {
            Ok(info) => info,
            Err(status) if status.code() == SERVICE_DISABLED_CODE => {
                return self.locked_or_unreachable(rpc).await;
            }
            Err(status) => {
                self.transition(ValidationEvent::DaemonUnreachable);
                return Err(EngineError::Unreachable(Box::new(status)));
            }
        };

        match check_chains(&info.chains, self.currency) {
            Ok(()) => {
                let status = self.transition(ValidationEvent::ConfigMatched);
                info!(
                    target: "lnd_engine::validate",
                    symbol = self.currency.symbol,
                    chain = self.currency.chain_name,
                    alias = %info.alias,
                    version = %info.version,
                    "engine validated"
                );
                Ok(status)
            }
            Err(EngineError::NoChains) => {
                self.transition(ValidationEvent::ChainsPending);
                Err(EngineError::NoChains)
            }
            Err(err) => {
                self.transition(ValidationEvent::ConfigMismatched);
                Err(err)
            }
        }
    }

    /// `Lightning` is off; the wallet only counts as locked if `WalletUnlocker` answers.
    async fn locked_or_unreachable(&self, rpc: &T::Rpc) -> Result<EngineStatus> {
        match rpc.gen_seed().await {
            Ok(_) => {
                self.transition(ValidationEvent::WalletLocked);
                Err(EngineError::Locked)
            }
            Err(status) => {
                self.transition(ValidationEvent::DaemonUnreachable);
                Err(EngineError::Unreachable(Box::new(status)))
            }
        }
    }

    fn transition(&self, event: ValidationEvent) -> EngineStatus {
        let (previous, next) = self.status.apply(event);
        if previous != next {
            debug!(
                target: "lnd_engine::validate",
                from = %previous,
                to = %next,
                ?event,
                "status changed"
            );
        }
        next
    }

    /// Gated view over the current RPC handle.
    ///
    /// # Errors
    /// [`EngineError::NotReady`] unless the engine is validated.
    pub fn gated(&self) -> Result<Gated<T::Rpc>> {
        let status = self.status();
        if status != EngineStatus::Validated {
            return Err(EngineError::NotReady(status));
        }
        let rpc = self
            .rpc
            .read()
            .clone()
            .ok_or(EngineError::NotReady(status))?;
        Ok(Gated {
            status: self.status.clone(),
            rpc,
        })
    }

    /// `GetInfo`, gated on validation.
    ///
    /// # Errors
    /// [`EngineError::NotReady`] before validation, RPC errors after.
    pub async fn get_info(&self) -> Result<lnrpc::GetInfoResponse> {
        self.gated()?.get_info().await
    }

    /// `ListChannels`, gated on validation.
    ///
    /// # Errors
    /// [`EngineError::NotReady`] before validation, RPC errors after.
    pub async fn list_channels(&self) -> Result<lnrpc::ListChannelsResponse> {
        self.gated()?
            .list_channels(lnrpc::ListChannelsRequest::default())
            .await
    }

    /// `WalletBalance`, gated on validation.
    ///
    /// # Errors
    /// [`EngineError::NotReady`] before validation, RPC errors after.
    pub async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse> {
        self.gated()?.wallet_balance().await
    }

    /// Whether an active channel with `peer` holds at least `min_value`
    /// satoshis on the `direction` side. Channels are fetched fresh.
    ///
    /// # Errors
    /// [`EngineError::NotReady`] before validation, RPC errors after.
    pub async fn is_balance_sufficient(
        &self,
        peer: &str,
        min_value: i64,
        direction: Direction,
    ) -> Result<bool> {
        self.gated()?
            .is_balance_sufficient(peer, min_value, direction)
            .await
    }

    /// `WalletUnlocker.ChangePassword`. Not gated: only meaningful while locked.
    ///
    /// # Errors
    /// Credential/transport errors building a handle, or the RPC error.
    pub async fn change_password(
        &self,
        current_password: &[u8],
        new_password: &[u8],
    ) -> Result<lnrpc::ChangePasswordResponse> {
        let existing = self.rpc.read().clone();
        let rpc = match existing {
            Some(rpc) => rpc,
            None => self.reload()?,
        };
        let res = rpc
            .change_password(lnrpc::ChangePasswordRequest {
                current_password: current_password.to_vec(),
                new_password: new_password.to_vec(),
                ..Default::default()
            })
            .await?;
        Ok(res)
    }
}

/// RPC handle that refuses to dispatch unless the engine is validated.
///
/// The status is re-read on every call, so a handle taken while validated
/// stops working as soon as a later validation attempt demotes the engine.
pub struct Gated<R> {
    status: StatusHandle,
    rpc: Arc<R>,
}

impl<R> Clone for Gated<R> {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            rpc: Arc::clone(&self.rpc),
        }
    }
}

impl<R: NodeRpc> Gated<R> {
    fn ready(&self) -> Result<&R> {
        match self.status.get() {
            EngineStatus::Validated => Ok(self.rpc.as_ref()),
            other => Err(EngineError::NotReady(other)),
        }
    }

    /// # Errors
    /// [`EngineError::NotReady`] or the RPC error.
    pub async fn get_info(&self) -> Result<lnrpc::GetInfoResponse> {
        let rpc = self.ready()?;
        Ok(rpc.get_info().await?)
    }

    /// # Errors
    /// [`EngineError::NotReady`] or the RPC error.
    pub async fn list_channels(
        &self,
        request: lnrpc::ListChannelsRequest,
    ) -> Result<lnrpc::ListChannelsResponse> {
        let rpc = self.ready()?;
        Ok(rpc.list_channels(request).await?)
    }

    /// # Errors
    /// [`EngineError::NotReady`] or the RPC error.
    pub async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse> {
        let rpc = self.ready()?;
        Ok(rpc.wallet_balance().await?)
    }

    /// See [`LndEngine::is_balance_sufficient`].
    ///
    /// # Errors
    /// [`EngineError::NotReady`] or the `ListChannels` error.
    pub async fn is_balance_sufficient(
        &self,
        peer: &str,
        min_value: i64,
        direction: Direction,
    ) -> Result<bool> {
        let rpc = self.ready()?;
        let channels = rpc
            .list_channels(lnrpc::ListChannelsRequest::default())
            .await?
            .channels;

        if !liquidity::has_active_channel(Some(&channels)) {
            debug!(
                target: "lnd_engine::liquidity",
                peer,
                total = channels.len(),
                "no active channels are available"
            );
            return Ok(false);
        }

        let sufficient =
            liquidity::has_sufficient_balance(Some(&channels), peer, min_value, direction);
        debug!(
            target: "lnd_engine::liquidity",
            peer,
            min_value,
            %direction,
            sufficient,
            "channel balance checked"
        );
        Ok(sufficient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chains(names: &[&str]) -> Vec<lnrpc::Chain> {
        names
            .iter()
            .map(|name| lnrpc::Chain {
                chain: (*name).to_string(),
                network: "regtest".to_string(),
            })
            .collect()
    }

    fn btc() -> &'static CurrencyConfig {
        CurrencyConfig::find("BTC").unwrap()
    }

    #[test]
    fn single_matching_chain_passes() {
        assert!(check_chains(&chains(&["bitcoin"]), btc()).is_ok());
    }

    #[test]
    fn no_chains_is_retryable() {
        let err = check_chains(&[], btc()).unwrap_err();
        assert!(matches!(err, EngineError::NoChains));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("no chains configured"));
    }

    #[test]
    fn multiple_chains_are_fatal() {
        let err = check_chains(&chains(&["bitcoin", "litecoin"]), btc()).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "LND can have at most one chain active, found: bitcoin, litecoin"
        );
    }

    #[test]
    fn mismatched_chain_is_fatal() {
        let err = check_chains(&chains(&["litecoin"]), btc()).unwrap_err();
        assert!(!err.is_retryable());
        match err {
            EngineError::ChainMismatch { expected, found } => {
                assert_eq!(expected, "bitcoin");
                assert_eq!(found, "litecoin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn not_ready_names_status() {
        let err = EngineError::NotReady(EngineStatus::Locked);
        assert_eq!(err.to_string(), "engine not ready: status is LOCKED");
        assert!(!err.is_retryable());
    }

    #[test]
    fn status_errors_convert() {
        let err = EngineError::from(Status::unavailable("down"));
        assert!(matches!(err, EngineError::Rpc(_)));
        assert!(err.is_retryable());
    }
}
