//! Engine lifecycle status and its transition function.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Where the engine believes the daemon is, as of the last validation attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStatus {
    /// No validation attempted yet.
    #[default]
    Unknown,
    /// Daemon reachable, wallet locked (only `WalletUnlocker` is served).
    Locked,
    /// Daemon reachable, wallet unlocked, chain matches the engine's currency.
    Validated,
    /// Daemon is configured for a different (or more than one) chain. Terminal.
    InvalidConfiguration,
    /// Daemon could not be reached.
    Unreachable,
}

/// Outcome of one validation step, fed to [`EngineStatus::transition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationEvent {
    /// `Lightning` is disabled but `WalletUnlocker` answered.
    WalletLocked,
    /// Neither service answered, or the probe failed for a non-capability reason.
    DaemonUnreachable,
    /// Wallet unlocked but the daemon reports no chains yet.
    ChainsPending,
    /// Exactly one chain, equal to the configured one.
    ConfigMatched,
    /// Several chains, or one that differs from the configured one.
    ConfigMismatched,
    /// Credentials or the transport could not be rebuilt for a new attempt.
    ClientUnavailable,
}

impl EngineStatus {
    /// Pure transition function.
    ///
    /// `InvalidConfiguration` absorbs every event. `ChainsPending` keeps the
    /// previous status, except that a validated engine drops back to `Unknown`
    /// since the daemon no longer reports a usable chain. `ClientUnavailable`
    /// always falls back to `Unknown`: nothing was learned about the daemon.
    #[must_use]
    pub fn transition(self, event: ValidationEvent) -> Self {
        use EngineStatus::{InvalidConfiguration, Locked, Unknown, Unreachable, Validated};
        use ValidationEvent::{
            ChainsPending, ClientUnavailable, ConfigMatched, ConfigMismatched, DaemonUnreachable,
            WalletLocked,
        };

        match (self, event) {
            (InvalidConfiguration, _) => InvalidConfiguration,
            (_, WalletLocked) => Locked,
            (_, DaemonUnreachable) => Unreachable,
            (Validated, ChainsPending) => Unknown,
            (current, ChainsPending) => current,
            (_, ConfigMatched) => Validated,
            (_, ConfigMismatched) => InvalidConfiguration,
            (_, ClientUnavailable) => Unknown,
        }
    }

    /// Whether no further validation attempt can change this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineStatus::InvalidConfiguration)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EngineStatus::Unknown => "UNKNOWN",
            EngineStatus::Locked => "LOCKED",
            EngineStatus::Validated => "VALIDATED",
            EngineStatus::InvalidConfiguration => "INVALID_CONFIGURATION",
            EngineStatus::Unreachable => "UNREACHABLE",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, cheaply cloneable view of an engine's status.
///
/// Readers never block on validation; only the engine applies events.
#[derive(Clone, Debug, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<EngineStatus>>,
}

impl StatusHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> EngineStatus {
        *self.inner.read()
    }

    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.get() == EngineStatus::Validated
    }

    /// Apply `event` and return the `(previous, next)` pair.
    pub(crate) fn apply(&self, event: ValidationEvent) -> (EngineStatus, EngineStatus) {
        let mut guard = self.inner.write();
        let previous = *guard;
        *guard = previous.transition(event);
        (previous, *guard)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineStatus::*, ValidationEvent::*, *};

    #[test]
    fn default_is_unknown() {
        assert_eq!(EngineStatus::default(), Unknown);
        assert_eq!(StatusHandle::new().get(), Unknown);
    }

    #[test]
    fn probe_outcomes_drive_status() {
        assert_eq!(Unknown.transition(WalletLocked), Locked);
        assert_eq!(Unknown.transition(DaemonUnreachable), Unreachable);
        assert_eq!(Locked.transition(ConfigMatched), Validated);
        assert_eq!(Unreachable.transition(ConfigMismatched), InvalidConfiguration);
        assert_eq!(Validated.transition(WalletLocked), Locked);
    }

    #[test]
    fn pending_chains_are_not_terminal() {
        assert_eq!(Unknown.transition(ChainsPending), Unknown);
        assert_eq!(Locked.transition(ChainsPending), Locked);
        assert_eq!(Validated.transition(ChainsPending), Unknown);
        assert!(!Unknown.transition(ChainsPending).is_terminal());
    }

    #[test]
    fn unusable_client_demotes_to_unknown() {
        assert_eq!(Validated.transition(ClientUnavailable), Unknown);
        assert_eq!(Locked.transition(ClientUnavailable), Unknown);
        assert_eq!(Unreachable.transition(ClientUnavailable), Unknown);
        assert!(!Validated.transition(ClientUnavailable).is_terminal());
    }

    #[test]
    fn invalid_configuration_is_sticky() {
        for event in [
            WalletLocked,
            DaemonUnreachable,
            ChainsPending,
            ConfigMatched,
            ConfigMismatched,
            ClientUnavailable,
        ] {
            assert_eq!(InvalidConfiguration.transition(event), InvalidConfiguration);
        }
        assert!(InvalidConfiguration.is_terminal());
    }

    #[test]
    fn handle_apply_reports_previous_and_next() {
        let handle = StatusHandle::new();
        let reader = handle.clone();
        assert_eq!(handle.apply(WalletLocked), (Unknown, Locked));
        assert_eq!(handle.apply(ConfigMatched), (Locked, Validated));
        assert!(reader.is_validated());
    }

    #[test]
    fn serializes_as_upper_snake_case() {
        let json = serde_json::to_string(&InvalidConfiguration).unwrap();
        assert_eq!(json, "\"INVALID_CONFIGURATION\"");
        assert_eq!(Validated.to_string(), "VALIDATED");
    }
}
