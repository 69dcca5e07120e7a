use std::fmt;

/// Failures an operation reports to the player. None of them is fatal to the
/// controller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GameError {
    UserRejected,
    ProviderError(String),
    UnknownChain,
    NoPlayerData,
    SubmissionFailed(String),
    LeaderboardUnavailable(String),
    AttemptsExhausted,
    RoundNotFinished,
    NotConnected,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::UserRejected => write!(f, "Wallet connection rejected by user"),
            GameError::ProviderError(msg) => write!(f, "Wallet error: {msg}"),
            GameError::UnknownChain => {
                write!(f, "Somnia Testnet is not registered in the wallet")
            }
            GameError::NoPlayerData => write!(f, "No player data found"),
            GameError::SubmissionFailed(_) => {
                write!(f, "❌ Failed to submit score. Please try again.")
            }
            GameError::LeaderboardUnavailable(_) => write!(f, "Error loading leaderboard"),
            GameError::AttemptsExhausted => write!(
                f,
                "❌ Maximum attempts reached! Submit your score to blockchain."
            ),
            GameError::RoundNotFinished => write!(
                f,
                "Use all your attempts before submitting your score"
            ),
            GameError::NotConnected => write!(f, "Connect your wallet to play"),
        }
    }
}

impl std::error::Error for GameError {}
