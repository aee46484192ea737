#![deny(unsafe_code)]

//! Lock-aware control layer for an LND node.
//!
//! [`LndEngine`] connects to LND over TLS gRPC with macaroon authentication,
//! works out whether the wallet is locked by probing the `Lightning` service,
//! checks that the daemon runs the expected chain, and only then lets callers
//! through to channel and wallet RPCs.
//!
//! Validation retries with exponential backoff while the daemon is locked,
//! unreachable or still syncing; a chain mismatch stops it for good.
//!
//! Example
//! ```no_run
//! use lnd_engine::{Direction, EngineConfig, LndEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new("127.0.0.1:10009", "BTC")
//!     .with_tls_cert("/home/lnd/.lnd/tls.cert")
//!     .with_macaroon("/home/lnd/.lnd/data/chain/bitcoin/mainnet/admin.macaroon");
//! let engine = LndEngine::new(config)?;
//! engine.validate().await?;
//!
//! let peer = "02a1633cafcc01ebfb6d78e39f687a1f0995c62fc95f51ead10a02ee0be551b5dc";
//! let ok = engine.is_balance_sufficient(peer, 10_000, Direction::Outbound).await?;
//! println!("can pay {peer}: {ok}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod liquidity;
pub mod probe;
pub mod proto;
pub mod retry;
pub mod status;
pub mod transport;

pub use client::{LndClient, NodeRpc};
pub use config::{CurrencyConfig, EngineConfig};
pub use credentials::ChannelCredentials;
pub use engine::{EngineError, Gated, LndEngine, Result};
pub use liquidity::Direction;
pub use probe::ProbeResult;
pub use retry::RetryPolicy;
pub use status::{EngineStatus, StatusHandle};
