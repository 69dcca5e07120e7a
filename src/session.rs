use crate::{
    contract::PlayerScore,
    outcome::Outcome,
};

pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RoundState {
    #[default]
    Ready,
    Active,
    Resolved,
}

/// Identity a request was issued under. Responses whose tag no longer matches
/// the session are stale and must be dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionTag {
    pub epoch: u64,
    pub account: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    pub account: Option<String>,
    pub network_ok: bool,
    pub score: u64,
    pub attempts_used: u32,
    pub high_score: u64,
    pub total_games: u64,
    pub last_played: Option<u64>,
    pub round: RoundState,
    pub submitting: bool,
    epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&self) -> SessionTag {
        SessionTag {
            epoch: self.epoch,
            account: self.account.clone(),
        }
    }

    pub fn is_current(&self, tag: &SessionTag) -> bool {
        *tag == self.tag()
    }

    pub fn round_active(&self) -> bool {
        self.round == RoundState::Active
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts_used >= MAX_ATTEMPTS
    }

    /// Binds `account`. Returns `true` when this is a different identity, in
    /// which case the round and cached player stats belonging to the previous
    /// one are dropped.
    pub fn bind_account(&mut self, account: &str) -> bool {
        if self.account.as_deref() == Some(account) {
            return false;
        }
        self.epoch += 1;
        self.account = Some(account.to_string());
        self.score = 0;
        self.attempts_used = 0;
        self.round = RoundState::Ready;
        self.high_score = 0;
        self.total_games = 0;
        self.last_played = None;
        self.submitting = false;
        true
    }

    /// Wallet disconnect ends the session entirely.
    pub fn disconnect(&mut self) {
        let epoch = self.epoch + 1;
        *self = Session {
            epoch,
            ..Session::default()
        };
    }

    pub fn start_round(&mut self) -> bool {
        if self.attempts_exhausted() {
            return false;
        }
        self.score = 0;
        self.round = RoundState::Active;
        true
    }

    pub fn apply_outcome(&mut self, outcome: &Outcome) {
        self.score = apply_delta(self.score, outcome.points);
    }

    /// Applies a drawn outcome to the active round and resolves it.
    pub fn resolve_pick(&mut self, outcome: &Outcome) -> bool {
        if !self.round_active() {
            return false;
        }
        self.apply_outcome(outcome);
        self.attempts_used = (self.attempts_used + 1).min(MAX_ATTEMPTS);
        self.round = RoundState::Resolved;
        true
    }

    pub fn continue_round(&mut self) -> bool {
        if self.round != RoundState::Resolved || self.attempts_exhausted() {
            return false;
        }
        self.round = RoundState::Ready;
        true
    }

    /// Records a confirmed submission of `score`.
    pub fn record_submission(&mut self, score: u64) {
        self.high_score = self.high_score.max(score);
        self.total_games += 1;
        self.attempts_used = 0;
        self.score = 0;
        self.round = RoundState::Ready;
        self.submitting = false;
    }

    pub fn merge_player_score(&mut self, record: &PlayerScore) {
        self.high_score = self.high_score.max(record.high_score);
        self.total_games = record.total_games;
        self.last_played = (record.last_played > 0).then_some(record.last_played);
    }
}

pub fn apply_delta(score: u64, delta: i64) -> u64 {
    if delta >= 0 {
        score.saturating_add(delta.unsigned_abs())
    } else {
        score.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::outcome::{
        CATALOG,
        OutcomeKind,
        find,
    };
    use proptest::prelude::*;

    fn outcome(kind: OutcomeKind) -> Outcome {
        find(kind).unwrap()
    }

    #[test]
    fn apply_outcome__jackpot_on_empty_score_gives_150() {
        // given
        let mut session = Session::new();

        // when
        session.apply_outcome(&outcome(OutcomeKind::Jackpot));

        // then
        assert_eq!(session.score, 150);
    }

    #[test]
    fn apply_outcome__ghost_floors_at_zero() {
        // given
        let mut session = Session {
            score: 20,
            ..Session::default()
        };

        // when
        session.apply_outcome(&outcome(OutcomeKind::Ghost));

        // then
        assert_eq!(session.score, 0);
    }

    #[test]
    fn start_round__rejected_once_attempts_are_exhausted() {
        // given
        let mut session = Session {
            attempts_used: MAX_ATTEMPTS,
            round: RoundState::Resolved,
            ..Session::default()
        };

        // when
        let started = session.start_round();

        // then
        assert!(!started);
        assert!(!session.round_active());
    }

    #[test]
    fn bind_account__same_account_keeps_epoch_and_stats() {
        // given
        let mut session = Session::new();
        session.bind_account("0xaaa");
        session.high_score = 300;
        let tag = session.tag();

        // when
        let changed = session.bind_account("0xaaa");

        // then
        assert!(!changed);
        assert_eq!(session.tag(), tag);
        assert_eq!(session.high_score, 300);
    }

    #[test]
    fn bind_account__new_account_invalidates_previous_tag() {
        // given
        let mut session = Session::new();
        session.bind_account("0xaaa");
        let old_tag = session.tag();

        // when
        session.bind_account("0xbbb");

        // then
        assert!(!session.is_current(&old_tag));
    }

    #[test]
    fn bind_account__new_account_starts_a_fresh_round() {
        // given
        let mut session = Session::new();
        session.bind_account("0xaaa");
        session.start_round();
        session.resolve_pick(&outcome(OutcomeKind::Jackpot));
        session.submitting = true;

        // when
        let changed = session.bind_account("0xbbb");

        // then
        assert!(changed);
        assert_eq!(session.score, 0);
        assert_eq!(session.attempts_used, 0);
        assert_eq!(session.round, RoundState::Ready);
        assert!(!session.submitting);
    }

    #[test]
    fn disconnect__resets_round_and_bumps_epoch() {
        // given
        let mut session = Session::new();
        session.bind_account("0xaaa");
        session.start_round();
        let old_tag = session.tag();

        // when
        session.disconnect();

        // then
        assert_eq!(session.account, None);
        assert!(!session.round_active());
        assert_eq!(session.attempts_used, 0);
        assert!(!session.is_current(&old_tag));
    }

    #[test]
    fn merge_player_score__never_lowers_high_score() {
        // given
        let mut session = Session {
            high_score: 400,
            ..Session::default()
        };
        let record = PlayerScore {
            high_score: 250,
            total_games: 3,
            last_played: 1_700_000_000,
        };

        // when
        session.merge_player_score(&record);

        // then
        assert_eq!(session.high_score, 400);
        assert_eq!(session.total_games, 3);
        assert_eq!(session.last_played, Some(1_700_000_000));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn resolve_pick__attempts_track_resolved_picks(
            picks in proptest::collection::vec(0usize..CATALOG.len(), 0..12)
        ) {
            let mut session = Session::new();
            let mut resolved = 0u32;
            for idx in picks {
                if session.start_round() {
                    prop_assert!(session.resolve_pick(&CATALOG[idx]));
                    resolved += 1;
                }
                prop_assert!(session.attempts_used <= MAX_ATTEMPTS);
                prop_assert!(!session.round_active() || session.attempts_used < MAX_ATTEMPTS);
            }
            prop_assert_eq!(session.attempts_used, resolved);
        }

        #[test]
        fn apply_outcome__score_never_negative(
            start in 0u64..500,
            order in Just((0..CATALOG.len()).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut session = Session { score: start, ..Session::default() };
            let mut expected = start as i64;
            for idx in order {
                session.apply_outcome(&CATALOG[idx]);
                expected = (expected + CATALOG[idx].points).max(0);
                prop_assert_eq!(session.score as i64, expected);
            }
        }

        #[test]
        fn record_submission__high_score_is_monotonic(
            scores in proptest::collection::vec(0u64..1_000, 1..20)
        ) {
            let mut session = Session::new();
            let mut previous = 0;
            for score in scores {
                session.record_submission(score);
                prop_assert!(session.high_score >= previous);
                previous = session.high_score;
            }
        }
    }
}
