//! Wallet-state inference from the `Lightning` service's availability.
//!
//! LND registers the `Lightning` service at startup but answers every call with
//! gRPC `UNIMPLEMENTED` until the wallet is unlocked. That status code is the
//! only signal treated as "disabled"; every other failure is indeterminate.

use tonic::{Code, Status};
use tracing::debug;

use crate::client::NodeRpc;

/// gRPC code LND returns for RPCs that exist in the schema but are not enabled.
pub const SERVICE_DISABLED_CODE: Code = Code::Unimplemented;

/// Result of a capability probe.
#[derive(Debug)]
pub enum ProbeResult {
    /// The call succeeded: the wallet is unlocked.
    Available,
    /// The call was rejected as unimplemented: the wallet is locked.
    Disabled,
    /// Anything else (connection refused, timeout, auth failure, ...).
    TransientError(Status),
}

impl ProbeResult {
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeResult::Available)
    }
}

/// Classify the outcome of a probe call.
pub fn classify<T>(outcome: Result<T, Status>) -> ProbeResult {
    match outcome {
        Ok(_) => ProbeResult::Available,
        Err(status) if status.code() == SERVICE_DISABLED_CODE => ProbeResult::Disabled,
        Err(status) => ProbeResult::TransientError(status),
    }
}

/// Issue a `GetInfo` against the primary service and classify the outcome.
///
/// Never retries and never touches engine state.
pub async fn probe<R: NodeRpc + ?Sized>(rpc: &R) -> ProbeResult {
    let result = classify(rpc.get_info().await);
    debug!(target: "lnd_engine::probe", ?result, "lightning service probed");
    result
}
