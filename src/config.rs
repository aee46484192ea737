use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::retry::RetryPolicy;

/// Default LND gRPC port.
pub const DEFAULT_RPC_PORT: u16 = 10009;

/// Static per-currency constants the engine validates the daemon against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CurrencyConfig {
    /// Display name (e.g. `Bitcoin`).
    pub name: &'static str,
    /// Ticker symbol (e.g. `BTC`).
    pub symbol: &'static str,
    /// Chain name LND reports in `GetInfo.chains` (e.g. `bitcoin`).
    pub chain_name: &'static str,
    /// Smallest units per whole coin.
    pub quantums_per_common: u64,
    /// Largest channel LND will open without wumbo channels, in satoshis.
    pub max_channel_balance: u64,
    /// Largest single payment LND will route, in satoshis.
    pub max_payment_size: u64,
    /// Fee reserved for opening or closing a channel, in quantums.
    pub fee_estimate: u64,
}

/// Currencies this engine can drive.
pub static CURRENCIES: &[CurrencyConfig] = &[
    CurrencyConfig {
        name: "Bitcoin",
        symbol: "BTC",
        chain_name: "bitcoin",
        quantums_per_common: 100_000_000,
        max_channel_balance: 16_777_215,
        max_payment_size: 4_294_967,
        fee_estimate: 20_000,
    },
    CurrencyConfig {
        name: "Litecoin",
        symbol: "LTC",
        chain_name: "litecoin",
        quantums_per_common: 100_000_000,
        max_channel_balance: 1_006_632_900,
        max_payment_size: 257_698_020,
        fee_estimate: 200_000,
    },
];

impl CurrencyConfig {
    /// Look up a currency by ticker symbol (exact match).
    #[must_use]
    pub fn find(symbol: &str) -> Option<&'static CurrencyConfig> {
        CURRENCIES.iter().find(|c| c.symbol == symbol)
    }
}

/// Everything needed to build an [`crate::LndEngine`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Daemon gRPC address, `host:port` or a full `https://` URI.
    pub host: String,
    /// Currency symbol resolved against [`CURRENCIES`].
    pub symbol: String,
    /// LND's `tls.cert`. Required.
    pub tls_cert_path: PathBuf,
    /// LND's macaroon (usually `admin.macaroon`). Optional.
    pub macaroon_path: Option<PathBuf>,
    /// Backoff applied by [`crate::LndEngine::validate`].
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            symbol: "BTC".to_string(),
            tls_cert_path: PathBuf::from("tls.cert"),
            macaroon_path: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tls_cert(mut self, path: impl AsRef<Path>) -> Self {
        self.tls_cert_path = path.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn with_macaroon(mut self, path: impl AsRef<Path>) -> Self {
        self.macaroon_path = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_currencies() {
        let btc = CurrencyConfig::find("BTC").expect("btc");
        assert_eq!(btc.chain_name, "bitcoin");
        assert_eq!(btc.fee_estimate, 20_000);
        assert!(btc.fee_estimate < btc.max_channel_balance);

        let ltc = CurrencyConfig::find("LTC").expect("ltc");
        assert_eq!(ltc.chain_name, "litecoin");
        assert_eq!(ltc.fee_estimate, 200_000);
        assert!(ltc.fee_estimate < ltc.max_channel_balance);
    }

    #[test]
    fn lookup_is_exact() {
        assert!(CurrencyConfig::find("btc").is_none());
        assert!(CurrencyConfig::find("XYZ").is_none());
    }

    #[test]
    fn builder_sets_paths() {
        let config = EngineConfig::new("localhost:10009", "LTC")
            .with_tls_cert("/lnd/tls.cert")
            .with_macaroon("/lnd/admin.macaroon");
        assert_eq!(config.symbol, "LTC");
        assert_eq!(config.tls_cert_path, PathBuf::from("/lnd/tls.cert"));
        assert_eq!(
            config.macaroon_path.as_deref(),
            Some(Path::new("/lnd/admin.macaroon"))
        );
    }
}
