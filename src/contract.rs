use crate::{
    presentation::LeaderboardEntry,
    rpc::RpcError,
    truncate_address,
};
use itertools::Itertools;
use std::fmt;

pub mod abi;
pub mod json_rpc;
pub mod simulated;

pub use json_rpc::JsonRpcContractClient;
pub use simulated::SimulatedContractClient;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlayerScore {
    pub high_score: u64,
    pub total_games: u64,
    pub last_played: u64,
}

impl PlayerScore {
    /// The contract answers unknown players with an all-zero record.
    pub fn is_empty(&self) -> bool {
        self.high_score == 0 && self.total_games == 0 && self.last_played == 0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeaderboardRow {
    pub address: String,
    pub score: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContractError {
    NotDeployed,
    Rpc(String),
    Reverted(String),
    Decode(String),
    Timeout,
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::NotDeployed => write!(f, "contract not deployed"),
            ContractError::Rpc(msg) => write!(f, "{msg}"),
            ContractError::Reverted(tx) => write!(f, "transaction {tx} reverted"),
            ContractError::Decode(msg) => write!(f, "could not decode contract data: {msg}"),
            ContractError::Timeout => write!(f, "timed out waiting for the chain"),
        }
    }
}

impl std::error::Error for ContractError {}

impl From<RpcError> for ContractError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Decode(msg) => ContractError::Decode(msg),
            other => ContractError::Rpc(other.to_string()),
        }
    }
}

/// Typed handle on the game contract. Handles are cheap to clone; every call
/// may stay pending indefinitely.
pub trait ContractClient: Clone + 'static {
    fn address(&self) -> &str;

    fn submit_score(
        &self,
        player: &str,
        score: u64,
    ) -> impl Future<Output = Result<(), ContractError>>;

    fn player_score(
        &self,
        player: &str,
    ) -> impl Future<Output = Result<PlayerScore, ContractError>>;

    fn leaderboard(&self) -> impl Future<Output = Result<Vec<LeaderboardRow>, ContractError>>;

    fn game_fee(&self) -> impl Future<Output = Result<u128, ContractError>>;
}

/// Orders rows by score, highest first, and numbers them from 1. Ties keep the
/// contract's order.
pub fn rank_leaderboard(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .sorted_by(|a, b| b.score.cmp(&a.score))
        .enumerate()
        .map(|(idx, row)| LeaderboardEntry {
            rank: idx as u32 + 1,
            address: truncate_address(&row.address, 6, 4),
            score: row.score,
        })
        .collect()
}

pub fn display_contract_address(address: &str) -> String {
    if address.eq_ignore_ascii_case(ZERO_ADDRESS) {
        String::from("Not deployed")
    } else {
        truncate_address(address, 8, 6)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn row(address: &str, score: u64) -> LeaderboardRow {
        LeaderboardRow {
            address: address.to_string(),
            score,
        }
    }

    #[test]
    fn rank_leaderboard__sorts_descending_and_numbers_from_one() {
        // given
        let rows = vec![
            row("0x1c9e7d4a00000000000000000000000000e7d4", 320),
            row("0x742d35a000000000000000000000000000d35a", 450),
            row("0x8a3f2b1000000000000000000000000000f2b1", 320),
        ];

        // when
        let ranked = rank_leaderboard(rows);

        // then
        let expected = vec![
            LeaderboardEntry {
                rank: 1,
                address: "0x742d...d35a".to_string(),
                score: 450,
            },
            LeaderboardEntry {
                rank: 2,
                address: "0x1c9e...e7d4".to_string(),
                score: 320,
            },
            LeaderboardEntry {
                rank: 3,
                address: "0x8a3f...f2b1".to_string(),
                score: 320,
            },
        ];
        assert_eq!(ranked, expected);
    }

    #[test]
    fn display_contract_address__zero_address_is_not_deployed() {
        assert_eq!(display_contract_address(ZERO_ADDRESS), "Not deployed");
        assert_eq!(
            display_contract_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x123456...345678"
        );
    }

    #[test]
    fn player_score__all_zero_record_counts_as_empty() {
        assert!(PlayerScore::default().is_empty());
        assert!(
            !PlayerScore {
                high_score: 0,
                total_games: 1,
                last_played: 0
            }
            .is_empty()
        );
    }
}
