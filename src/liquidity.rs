//! Channel liquidity checks over a point-in-time channel snapshot.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::proto::lnrpc::Channel;

/// Which side of a channel must hold the funds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Funds we can send: the channel's local balance.
    #[default]
    Outbound,
    /// Funds we can receive: the channel's remote balance.
    Inbound,
}

impl Direction {
    /// Balance of `channel` on this side, in satoshis.
    #[must_use]
    pub fn balance_of(self, channel: &Channel) -> i64 {
        match self {
            Direction::Outbound => channel.local_balance,
            Direction::Inbound => channel.remote_balance,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("outbound"),
            Direction::Inbound => f.write_str("inbound"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "outbound" | "local" => Ok(Direction::Outbound),
            "inbound" | "remote" => Ok(Direction::Inbound),
            other => Err(format!("unknown channel direction: {other}")),
        }
    }
}

/// Whether any active channel with `peer` holds at least `min_value`
/// satoshis on the `direction` side. The bound is inclusive.
///
/// `None` and empty snapshots are answered with `false`.
#[must_use]
pub fn has_sufficient_balance(
    channels: Option<&[Channel]>,
    peer: &str,
    min_value: i64,
    direction: Direction,
) -> bool {
    channels
        .unwrap_or_default()
        .iter()
        .filter(|c| c.active && c.remote_pubkey == peer)
        .any(|c| direction.balance_of(c) >= min_value)
}

/// Whether the snapshot contains at least one active channel, with anyone.
#[must_use]
pub fn has_active_channel(channels: Option<&[Channel]>) -> bool {
    channels.unwrap_or_default().iter().any(|c| c.active)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const PEER: &str = "02aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const OTHER: &str = "03bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn channel(peer: &str, active: bool, local: i64, remote: i64) -> Channel {
        Channel {
            active,
            remote_pubkey: peer.to_string(),
            local_balance: local,
            remote_balance: remote,
            capacity: local + remote,
            ..Channel::default()
        }
    }

    #[test]
    fn missing_or_empty_snapshot_is_insufficient() {
        assert!(!has_sufficient_balance(None, PEER, 0, Direction::Outbound));
        assert!(!has_sufficient_balance(Some(&[]), PEER, 0, Direction::Inbound));
    }

    #[test]
    fn inactive_channels_are_ignored() {
        let channels = [channel(PEER, false, 1_000, 1_000)];
        assert!(!has_sufficient_balance(
            Some(&channels),
            PEER,
            1,
            Direction::Outbound
        ));
        assert!(!has_active_channel(Some(&channels)));
    }

    #[test]
    fn other_peers_do_not_count() {
        let channels = [channel(OTHER, true, 1_000_000, 1_000_000)];
        assert!(has_active_channel(Some(&channels)));
        assert!(!has_sufficient_balance(
            Some(&channels),
            PEER,
            1,
            Direction::Outbound
        ));
    }

    #[test]
    fn direction_selects_balance() {
        let channels = [channel(PEER, true, 500, 10)];
        assert!(has_sufficient_balance(
            Some(&channels),
            PEER,
            500,
            Direction::Outbound
        ));
        assert!(!has_sufficient_balance(
            Some(&channels),
            PEER,
            500,
            Direction::Inbound
        ));
        assert!(has_sufficient_balance(
            Some(&channels),
            PEER,
            10,
            Direction::Inbound
        ));
    }

    #[test]
    fn any_matching_channel_suffices() {
        let channels = [
            channel(PEER, true, 10, 0),
            channel(PEER, false, 5_000, 0),
            channel(PEER, true, 900, 0),
        ];
        assert!(has_sufficient_balance(
            Some(&channels),
            PEER,
            900,
            Direction::Outbound
        ));
        assert!(!has_sufficient_balance(
            Some(&channels),
            PEER,
            901,
            Direction::Outbound
        ));
    }

    #[test]
    fn direction_parses() {
        assert_eq!("Inbound".parse::<Direction>(), Ok(Direction::Inbound));
        assert_eq!("local".parse::<Direction>(), Ok(Direction::Outbound));
        assert!("sideways".parse::<Direction>().is_err());
    }

    proptest! {
        #[test]
        fn boundary_is_inclusive(balance in 1i64..=i64::MAX / 2, inbound in any::<bool>()) {
            let direction = if inbound { Direction::Inbound } else { Direction::Outbound };
            let channels = [if inbound {
                channel(PEER, true, 0, balance)
            } else {
                channel(PEER, true, balance, 0)
            }];
            prop_assert!(has_sufficient_balance(Some(&channels), PEER, balance, direction));
            prop_assert!(has_sufficient_balance(Some(&channels), PEER, balance - 1, direction));
            prop_assert!(!has_sufficient_balance(Some(&channels), PEER, balance + 1, direction));
        }

        #[test]
        fn unrelated_peers_never_qualify(
            balances in proptest::collection::vec((any::<bool>(), 0i64..1_000_000, 0i64..1_000_000), 0..16),
            min_value in 0i64..1_000_000,
        ) {
            let channels: Vec<Channel> = balances
                .into_iter()
                .map(|(active, local, remote)| channel(OTHER, active, local, remote))
                .collect();
            prop_assert!(!has_sufficient_balance(Some(&channels), PEER, min_value, Direction::Outbound));
            prop_assert!(!has_sufficient_balance(Some(&channels), PEER, min_value, Direction::Inbound));
        }
    }
}
