use crate::presentation::Severity;
use rand::Rng;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OutcomeKind {
    Reward,
    Ghost,
    Trap,
    Bonus,
    Jackpot,
    Curse,
    Magic,
}

impl OutcomeKind {
    pub fn is_spooky(self) -> bool {
        matches!(self, OutcomeKind::Ghost | OutcomeKind::Trap | OutcomeKind::Curse)
    }

    pub fn severity(self) -> Severity {
        if self.is_spooky() {
            Severity::Error
        } else {
            Severity::Info
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeKind::Reward => "reward",
            OutcomeKind::Ghost => "ghost",
            OutcomeKind::Trap => "trap",
            OutcomeKind::Bonus => "bonus",
            OutcomeKind::Jackpot => "jackpot",
            OutcomeKind::Curse => "curse",
            OutcomeKind::Magic => "magic",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub points: i64,
    pub message: &'static str,
}

pub const CATALOG: [Outcome; 8] = [
    Outcome {
        kind: OutcomeKind::Reward,
        points: 100,
        message: "🎉 CONGRATULATIONS! You found 100 STT!",
    },
    Outcome {
        kind: OutcomeKind::Reward,
        points: 50,
        message: "💰 Hidden treasure discovered! +50 points",
    },
    Outcome {
        kind: OutcomeKind::Ghost,
        points: -30,
        message: "👻 BOO! A ghost scared you! -30 points",
    },
    Outcome {
        kind: OutcomeKind::Trap,
        points: -20,
        message: "🕸️ Caught in spider web! -20 points",
    },
    Outcome {
        kind: OutcomeKind::Bonus,
        points: 80,
        message: "🍬 Halloween candy bonus! +80 points",
    },
    Outcome {
        kind: OutcomeKind::Jackpot,
        points: 150,
        message: "🎰 JACKPOT! +150 points!!!",
    },
    Outcome {
        kind: OutcomeKind::Curse,
        points: -40,
        message: "⚡ Ancient curse! -40 points",
    },
    Outcome {
        kind: OutcomeKind::Magic,
        points: 120,
        message: "✨ Magic spell! +120 points",
    },
];

/// Uniform pick over the catalog entries (not over kinds: the two rewards are
/// separate entries).
pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Outcome {
    CATALOG[rng.random_range(0..CATALOG.len())]
}

/// First catalog entry of the given kind.
pub fn find(kind: OutcomeKind) -> Option<Outcome> {
    CATALOG.iter().copied().find(|o| o.kind == kind)
}
