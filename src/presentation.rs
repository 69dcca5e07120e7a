use crate::{
    network::NetworkStatus,
    outcome::Outcome,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Affordance {
    Connect,
    Start,
    Continue,
    Submit,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub address: String,
    pub score: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LeaderboardView {
    #[default]
    Loading,
    Entries(Vec<LeaderboardEntry>),
    Unavailable,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scoreboard {
    pub score: u64,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub high_score: u64,
    pub total_games: u64,
    pub last_played: Option<u64>,
    pub game_fee: Option<u128>,
    pub contract: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PickReveal {
    pub selection: usize,
    pub outcome: Outcome,
}

/// Outward port of the controller. Implementations only render; they never
/// call back into the controller.
pub trait Presentation {
    fn show_status(&mut self, severity: Severity, message: &str);

    fn set_affordance(&mut self, affordance: Affordance, visible: bool);

    fn set_round_visible(&mut self, visible: bool);

    fn render_wallet(&mut self, short_address: Option<&str>);

    fn render_network(&mut self, status: &NetworkStatus);

    fn render_scoreboard(&mut self, scoreboard: &Scoreboard);

    fn render_leaderboard(&mut self, leaderboard: &LeaderboardView);

    /// `None` clears the previous reveal.
    fn reveal_pick(&mut self, reveal: Option<PickReveal>);
}
