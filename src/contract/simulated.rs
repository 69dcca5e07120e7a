use super::{
    ContractClient,
    ContractError,
    LeaderboardRow,
    PlayerScore,
    ZERO_ADDRESS,
};
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tokio::time;

pub const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_secs(2);

const SEED_LEADERBOARD: [(&str, u64); 7] = [
    ("0x742d35a66634c0532925a3b844bc454e4438d35a", 450),
    ("0x8a3f2b1c9d0e4f5a6b7c8d9e0f1a2b3c4d5ef2b1", 380),
    ("0x1c9e7d4b2a3f4e5d6c7b8a9f0e1d2c3b4a5be7d4", 320),
    ("0x5b6a8c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7fa8c3", 290),
    ("0x3d2b9e1f0a1b2c3d4e5f6a7b8c9d0e1f2a3bb9e1", 250),
    ("0x9f4a7c2e1d0c9b8a7f6e5d4c3b2a1f0e9d8c7c2d", 220),
    ("0x2e8b1d4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c1d4a", 190),
];

#[derive(Debug, Default)]
struct Book {
    players: HashMap<String, PlayerScore>,
    seeded: Vec<LeaderboardRow>,
    fee: u128,
}

/// In-process stand-in for the deployed contract: submissions take a fixed
/// delay and always succeed, the leaderboard starts from canned data.
#[derive(Clone, Debug)]
pub struct SimulatedContractClient {
    book: Arc<Mutex<Book>>,
    submit_delay: Duration,
}

impl Default for SimulatedContractClient {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMIT_DELAY)
    }
}

impl SimulatedContractClient {
    pub fn new(submit_delay: Duration) -> Self {
        let seeded = SEED_LEADERBOARD
            .iter()
            .map(|(address, score)| LeaderboardRow {
                address: address.to_string(),
                score: *score,
            })
            .collect();
        Self {
            book: Arc::new(Mutex::new(Book {
                players: HashMap::new(),
                seeded,
                fee: 0,
            })),
            submit_delay,
        }
    }

    fn with_book<T>(&self, f: impl FnOnce(&mut Book) -> T) -> Result<T, ContractError> {
        let mut guard = self
            .book
            .lock()
            .map_err(|_| ContractError::Rpc("simulated contract state poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl ContractClient for SimulatedContractClient {
    fn address(&self) -> &str {
        ZERO_ADDRESS
    }

    async fn submit_score(&self, player: &str, score: u64) -> Result<(), ContractError> {
        time::sleep(self.submit_delay).await;
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        self.with_book(|book| {
            let entry = book.players.entry(player.to_lowercase()).or_default();
            entry.high_score = entry.high_score.max(score);
            entry.total_games += 1;
            entry.last_played = now;
        })?;
        tracing::info!(%player, score, "simulated score submission recorded");
        Ok(())
    }

    async fn player_score(&self, player: &str) -> Result<PlayerScore, ContractError> {
        self.with_book(|book| {
            book.players
                .get(&player.to_lowercase())
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, ContractError> {
        self.with_book(|book| {
            let mut rows = book.seeded.clone();
            rows.extend(book.players.iter().filter(|(_, s)| s.high_score > 0).map(
                |(address, s)| LeaderboardRow {
                    address: address.clone(),
                    score: s.high_score,
                },
            ));
            rows
        })
    }

    async fn game_fee(&self) -> Result<u128, ContractError> {
        self.with_book(|book| book.fee)
    }
}
