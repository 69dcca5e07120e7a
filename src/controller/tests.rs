#![allow(non_snake_case)]

use super::*;
use crate::{
    network::SOMNIA_CHAIN_ID,
    session::apply_delta,
    test_helpers::{
        FakeContract,
        FakeWallet,
        RecordingPresentation,
    },
};

const ALICE: &str = "0x742d35cc6634c0532925a3b844bc454e4438d35a";
const BOB: &str = "0x8a3f2b1c9d0e4f5a6b7c8d9e0f1a2b3c4d5ef2b1";

type TestController = GameController<FakeWallet, FakeContract, RecordingPresentation>;

fn test_config() -> ControllerConfig {
    ControllerConfig {
        wallet_timeout: Duration::from_secs(5),
        seed: Some(7),
        ..ControllerConfig::default()
    }
}

fn controller(wallet: FakeWallet, contract: FakeContract) -> TestController {
    GameController::new(
        wallet,
        contract,
        RecordingPresentation::default(),
        test_config(),
    )
}

async fn connected(contract: FakeContract) -> TestController {
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    let mut controller = controller(wallet, contract);
    controller.connect().await.unwrap();
    controller.settle().await;
    controller
}

fn alice_record() -> PlayerScore {
    PlayerScore {
        high_score: 300,
        total_games: 4,
        last_played: 1_700_000_000,
    }
}

/// Plays every attempt, collecting at each break. Returns the score of the
/// final round, which is what gets submitted.
fn play_all_attempts(controller: &mut TestController) -> u64 {
    let mut expected = 0;
    for attempt in 0..MAX_ATTEMPTS {
        controller.start_round().unwrap();
        let outcome = controller.pick(attempt as usize % 6 + 1).unwrap();
        expected = apply_delta(0, outcome.points);
        if attempt + 1 < MAX_ATTEMPTS {
            assert!(controller.continue_round());
        }
    }
    expected
}

#[tokio::test]
async fn connect__binds_account_and_verifies_network() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    let mut controller = controller(wallet, FakeContract::new());

    // when
    let res = controller.connect().await;

    // then
    assert_eq!(res, Ok(()));
    assert_eq!(controller.session().account.as_deref(), Some(ALICE));
    assert_eq!(controller.phase(), Phase::RoundReady);
    assert_eq!(controller.network_status(), &NetworkStatus::Correct);
    let view = controller.presentation();
    assert_eq!(view.wallet.as_deref(), Some("0x742d...d35a"));
    assert!(view.round_visible);
    assert!(view.is_visible(Affordance::Start));
    assert!(!view.is_visible(Affordance::Connect));
    assert_eq!(
        view.last_status(),
        Some((Severity::Success, "Wallet connected successfully!"))
    );
}

#[tokio::test]
async fn connect__user_rejection_stays_disconnected() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    wallet.set_rejecting(true);
    let mut controller = controller(wallet, FakeContract::new());

    // when
    let res = controller.connect().await;

    // then
    assert_eq!(res, Err(GameError::UserRejected));
    assert_eq!(controller.phase(), Phase::Disconnected);
    assert_eq!(
        controller.presentation().last_status(),
        Some((Severity::Error, "Wallet connection rejected by user"))
    );
    assert!(controller.presentation().is_visible(Affordance::Connect));
}

#[tokio::test]
async fn connect__provider_failure_is_reported() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    wallet.set_failure(Some("wallet locked"));
    let mut controller = controller(wallet, FakeContract::new());

    // when
    let res = controller.connect().await;

    // then
    assert_eq!(res, Err(GameError::ProviderError("wallet locked".to_string())));
    assert_eq!(
        controller.presentation().last_status(),
        Some((Severity::Error, "Error connecting wallet: wallet locked"))
    );
}

#[tokio::test(start_paused = true)]
async fn connect__silent_wallet_times_out() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    wallet.set_hang_on_request(true);
    let mut controller = controller(wallet, FakeContract::new());

    // when
    let res = controller.connect().await;

    // then
    assert!(matches!(res, Err(GameError::ProviderError(_))));
    assert_eq!(controller.phase(), Phase::Disconnected);
    assert_eq!(
        controller.presentation().last_status(),
        Some((
            Severity::Error,
            "Error connecting wallet: wallet did not answer within 5s"
        ))
    );
    assert!(controller.presentation().is_visible(Affordance::Connect));
}

#[tokio::test]
async fn verify_network__unknown_chain_is_added_then_switched() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], "0x1")
        .forget_chain(SOMNIA_CHAIN_ID);
    let handle = wallet.clone();
    let mut controller = controller(wallet, FakeContract::new());

    // when
    controller.connect().await.unwrap();

    // then
    assert_eq!(handle.chain_id_now(), SOMNIA_CHAIN_ID);
    assert!(handle.knows_chain(SOMNIA_CHAIN_ID));
    assert_eq!(
        handle.calls(),
        vec![
            "eth_requestAccounts",
            "eth_chainId",
            "wallet_switchEthereumChain",
            "wallet_addEthereumChain",
            "wallet_switchEthereumChain",
        ]
    );
    assert_eq!(controller.network_status(), &NetworkStatus::Correct);
    assert!(
        controller
            .presentation()
            .saw_status("Successfully switched to Somnia Testnet")
    );
}

#[tokio::test(start_paused = true)]
async fn verify_network__switch_timeout_leaves_wrong_network_but_play_allowed() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], "0x1");
    wallet.set_hang_on_switch(true);
    let mut controller = controller(wallet, FakeContract::new());

    // when
    let res = controller.connect().await;

    // then
    assert_eq!(res, Ok(()));
    let wrong = NetworkStatus::Wrong {
        chain_id: "0x1".to_string(),
    };
    assert_eq!(controller.network_status(), &wrong);
    assert_eq!(controller.phase(), Phase::Connected(wrong));
    assert!(
        controller
            .presentation()
            .saw_status("Please switch to Somnia Testnet in your wallet to play the game")
    );
    assert_eq!(controller.start_round(), Ok(()));
}

#[tokio::test]
async fn verify_network__rejected_switch_is_reported() {
    // given
    let wallet = FakeWallet::with_accounts(vec![ALICE.to_string()], "0x1");
    let handle = wallet.clone();
    let mut controller = controller(wallet, FakeContract::new());
    controller.init().await;
    handle.set_rejecting(true);

    // when
    let res = controller.verify_network().await;

    // then
    assert_eq!(res, Err(GameError::UserRejected));
    assert_eq!(handle.chain_id_now(), "0x1");
    assert_eq!(
        controller.presentation().last_status(),
        Some((
            Severity::Error,
            "Please switch to Somnia Testnet in your wallet to play the game"
        ))
    );
}

#[tokio::test]
async fn init__auto_connects_authorized_account_without_switching_chain() {
    // given
    let wallet = FakeWallet::with_accounts(vec![ALICE.to_string()], "0x1");
    let handle = wallet.clone();
    let contract = FakeContract::new().with_fee(1_000);
    let mut controller = controller(wallet, contract);

    // when
    controller.init().await;
    controller.settle().await;

    // then
    assert_eq!(controller.session().account.as_deref(), Some(ALICE));
    assert_eq!(
        controller.network_status(),
        &NetworkStatus::Wrong {
            chain_id: "0x1".to_string()
        }
    );
    assert!(!handle.calls().iter().any(|c| c == "wallet_switchEthereumChain"));
    assert_eq!(controller.presentation().scoreboard.game_fee, Some(1_000));
}

#[tokio::test]
async fn init__unauthorized_wallet_stays_disconnected() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    let handle = wallet.clone();
    let mut controller = controller(wallet, FakeContract::new());

    // when
    controller.init().await;
    controller.settle().await;

    // then
    assert_eq!(controller.phase(), Phase::Disconnected);
    assert!(!handle.calls().iter().any(|c| c == "eth_requestAccounts"));
    assert!(controller.presentation().is_visible(Affordance::Connect));
    assert_eq!(
        controller.presentation().leaderboard,
        LeaderboardView::Entries(vec![])
    );
}

#[tokio::test]
async fn start_round__requires_connection() {
    // given
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    let mut controller = controller(wallet, FakeContract::new());

    // when
    let res = controller.start_round();

    // then
    assert_eq!(res, Err(GameError::NotConnected));
    assert_eq!(controller.phase(), Phase::Disconnected);
}

#[tokio::test]
async fn pick__without_active_round_is_ignored() {
    // given
    let mut controller = connected(FakeContract::new()).await;

    // when
    let outcome = controller.pick(3);

    // then
    assert_eq!(outcome, None);
    assert_eq!(controller.session().attempts_used, 0);
    assert_eq!(controller.presentation().reveal, None);
}

#[tokio::test]
async fn pick__resolves_round_and_reveals_outcome() {
    // given
    let mut controller = connected(FakeContract::new()).await;
    controller.start_round().unwrap();

    // when
    let outcome = controller.pick(4).unwrap();

    // then
    assert_eq!(controller.session().attempts_used, 1);
    assert_eq!(controller.session().score, apply_delta(0, outcome.points));
    assert_eq!(
        controller.phase(),
        Phase::RoundResolved {
            attempts_remain: true
        }
    );
    let view = controller.presentation();
    assert_eq!(
        view.reveal,
        Some(PickReveal {
            selection: 4,
            outcome
        })
    );
    assert_eq!(
        view.last_status(),
        Some((outcome.kind.severity(), outcome.message))
    );
    assert!(view.is_visible(Affordance::Continue));
    assert!(!view.is_visible(Affordance::Submit));
    assert_eq!(view.scoreboard.attempts_used, 1);
}

#[tokio::test]
async fn continue_round__reports_running_score() {
    // given
    let mut controller = connected(FakeContract::new()).await;
    controller.start_round().unwrap();
    controller.pick(1).unwrap();
    let score = controller.session().score;

    // when
    let continued = controller.continue_round();

    // then
    assert!(continued);
    assert_eq!(controller.phase(), Phase::RoundReady);
    let expected = format!("💰 Current score: {score} points. Ready for next round?");
    assert_eq!(
        controller.presentation().last_status(),
        Some((Severity::Info, expected.as_str()))
    );
}

#[tokio::test]
async fn pick__fifth_attempt_exhausts_round_and_blocks_start() {
    // given
    let mut controller = connected(FakeContract::new()).await;

    // when
    let expected_score = play_all_attempts(&mut controller);

    // then
    assert_eq!(controller.session().attempts_used, MAX_ATTEMPTS);
    assert_eq!(controller.session().score, expected_score);
    assert_eq!(
        controller.phase(),
        Phase::RoundResolved {
            attempts_remain: false
        }
    );
    assert!(!controller.continue_round());
    assert_eq!(controller.start_round(), Err(GameError::AttemptsExhausted));
    let view = controller.presentation();
    assert!(view.saw_status("🎊 Game completed! Submit your score to the blockchain."));
    assert!(view.is_visible(Affordance::Submit));
    assert!(!view.is_visible(Affordance::Start));
    assert_eq!(
        view.last_status(),
        Some((
            Severity::Error,
            "❌ Maximum attempts reached! Submit your score to blockchain."
        ))
    );
}

#[tokio::test]
async fn submit_score__before_attempts_are_used_is_rejected() {
    // given
    let contract = FakeContract::new();
    let handle = contract.clone();
    let mut controller = connected(contract).await;
    controller.start_round().unwrap();
    controller.pick(2).unwrap();

    // when
    let res = controller.submit_score();
    controller.settle().await;

    // then
    assert_eq!(res, Err(GameError::RoundNotFinished));
    assert!(handle.submissions().is_empty());
}

#[tokio::test]
async fn submit_score__success_resets_round_and_updates_stats() {
    // given
    let contract = FakeContract::new();
    let handle = contract.clone();
    let mut controller = connected(contract).await;
    let score = play_all_attempts(&mut controller);

    // when
    controller.submit_score().unwrap();
    let submitting = controller.session().submitting;
    let submit_hidden = !controller.presentation().is_visible(Affordance::Submit);
    controller.settle().await;

    // then
    assert!(submitting);
    assert!(submit_hidden);
    assert_eq!(handle.submissions(), vec![(ALICE.to_string(), score)]);
    let session = controller.session();
    assert_eq!(session.score, 0);
    assert_eq!(session.attempts_used, 0);
    assert_eq!(session.high_score, score);
    assert_eq!(session.total_games, 1);
    assert!(!session.submitting);
    assert_eq!(controller.phase(), Phase::RoundReady);
    let expected = format!("✅ Score {score} successfully submitted to blockchain!");
    assert!(controller.presentation().saw_status(&expected));
    assert!(controller.presentation().is_visible(Affordance::Start));
}

#[tokio::test]
async fn submit_score__failure_keeps_round_for_retry() {
    // given
    let contract = FakeContract::new();
    contract.set_fail_submit(true);
    let mut controller = connected(contract).await;
    let score = play_all_attempts(&mut controller);

    // when
    controller.submit_score().unwrap();
    controller.settle().await;

    // then
    let session = controller.session();
    assert_eq!(session.score, score);
    assert_eq!(session.attempts_used, MAX_ATTEMPTS);
    assert!(!session.submitting);
    assert_eq!(
        controller.presentation().last_status(),
        Some((Severity::Error, "❌ Failed to submit score. Please try again."))
    );
    assert!(controller.presentation().is_visible(Affordance::Submit));
}

#[tokio::test]
async fn submit_score__while_pending_is_not_sent_twice() {
    // given
    let mut contract = FakeContract::new();
    let gate = contract.gate_submit();
    let handle = contract.clone();
    let mut controller = connected(contract).await;
    play_all_attempts(&mut controller);

    // when
    controller.submit_score().unwrap();
    controller.submit_score().unwrap();
    gate.add_permits(2);
    controller.settle().await;

    // then
    assert_eq!(handle.submissions().len(), 1);
}

#[tokio::test]
async fn on_accounts_changed__empty_list_disconnects_mid_round() {
    // given
    let mut controller = connected(FakeContract::new()).await;
    controller.start_round().unwrap();

    // when
    controller.on_accounts_changed(&[]);

    // then
    assert_eq!(controller.phase(), Phase::Disconnected);
    let session = controller.session();
    assert_eq!(session.score, 0);
    assert_eq!(session.attempts_used, 0);
    let view = controller.presentation();
    assert!(!view.round_visible);
    assert_eq!(view.wallet, None);
    assert!(view.is_visible(Affordance::Connect));
    assert_eq!(
        view.last_status(),
        Some((Severity::Warning, "Wallet disconnected"))
    );
}

#[tokio::test]
async fn on_accounts_changed__stale_player_data_is_discarded() {
    // given
    let mut contract = FakeContract::new();
    let gate = contract.gate_player_score();
    contract.set_player_score(
        ALICE,
        PlayerScore {
            high_score: 900,
            total_games: 9,
            last_played: 1_600_000_000,
        },
    );
    contract.set_player_score(
        BOB,
        PlayerScore {
            high_score: 120,
            total_games: 2,
            last_played: 1_700_000_000,
        },
    );
    let wallet = FakeWallet::new_unauthorized(vec![ALICE.to_string()], SOMNIA_CHAIN_ID);
    let mut controller = controller(wallet, contract);
    controller.connect().await.unwrap();

    // when
    controller.on_accounts_changed(&[BOB.to_string()]);
    gate.add_permits(2);
    controller.settle().await;

    // then
    let session = controller.session();
    assert_eq!(session.account.as_deref(), Some(BOB));
    assert_eq!(session.high_score, 120);
    assert_eq!(session.total_games, 2);
    assert!(
        controller
            .presentation()
            .saw_status("Wallet switched successfully")
    );
}

#[tokio::test]
async fn on_accounts_changed__stale_submission_is_discarded() {
    // given
    let mut contract = FakeContract::new();
    let gate = contract.gate_submit();
    contract.set_player_score(
        BOB,
        PlayerScore {
            high_score: 120,
            total_games: 2,
            last_played: 1_600_000_000,
        },
    );
    let handle = contract.clone();
    let mut controller = connected(contract).await;
    play_all_attempts(&mut controller);
    controller.submit_score().unwrap();

    // when
    controller.on_accounts_changed(&[BOB.to_string()]);
    gate.add_permits(1);
    controller.settle().await;

    // then
    assert_eq!(handle.submissions().len(), 1);
    let session = controller.session();
    assert_eq!(session.account.as_deref(), Some(BOB));
    assert_eq!(session.high_score, 120);
    assert_eq!(session.total_games, 2);
    assert_eq!(session.last_played, Some(1_600_000_000));
    assert_eq!(session.attempts_used, 0);
    assert!(!session.submitting);
    let view = controller.presentation();
    assert!(
        !view
            .statuses
            .iter()
            .any(|(_, message)| message.starts_with("✅ Score"))
    );
    assert_eq!(view.scoreboard.high_score, 120);
}

#[tokio::test]
async fn on_accounts_changed__new_account_does_not_inherit_finished_round() {
    // given
    let mut controller = connected(FakeContract::new()).await;
    play_all_attempts(&mut controller);
    assert!(controller.presentation().is_visible(Affordance::Submit));

    // when
    controller.on_accounts_changed(&[BOB.to_string()]);

    // then
    assert_eq!(controller.phase(), Phase::RoundReady);
    assert_eq!(controller.session().attempts_used, 0);
    assert_eq!(controller.session().score, 0);
    let view = controller.presentation();
    assert!(!view.is_visible(Affordance::Submit));
    assert!(view.is_visible(Affordance::Start));
    assert_eq!(view.reveal, None);
    assert_eq!(controller.submit_score(), Err(GameError::RoundNotFinished));
}

#[tokio::test]
async fn on_accounts_changed__same_account_is_a_no_op() {
    // given
    let contract = FakeContract::new();
    contract.set_player_score(
        ALICE,
        PlayerScore {
            high_score: 300,
            total_games: 4,
            last_played: 1_700_000_000,
        },
    );
    let mut controller = connected(contract).await;
    let tag = controller.session().tag();

    // when
    controller.on_accounts_changed(&[ALICE.to_string()]);

    // then
    assert_eq!(controller.session().tag(), tag);
    assert_eq!(controller.session().high_score, 300);
    assert!(
        !controller
            .presentation()
            .saw_status("Wallet switched successfully")
    );
}

#[tokio::test]
async fn on_wallet_event__chain_change_requests_reload() {
    // given
    let mut controller = connected(FakeContract::new()).await;

    // when
    let flow = controller.on_wallet_event(WalletEvent::ChainChanged("0x1".to_string()));

    // then
    assert_eq!(flow, Flow::Reload);
    assert_eq!(controller.on_chain_changed(SOMNIA_CHAIN_ID), Flow::Reload);
}

#[tokio::test]
async fn refresh_leaderboard__renders_ranked_entries() {
    // given
    let contract = FakeContract::new().with_leaderboard(vec![
        ("0x1c9e7d4b2a3f4e5d6c7b8a9f0e1d2c3b4a5be7d4", 320),
        ("0x742d35a66634c0532925a3b844bc454e4438d35a", 450),
    ]);
    let wallet = FakeWallet::new_unauthorized(vec![], SOMNIA_CHAIN_ID);
    let mut controller = controller(wallet, contract);

    // when
    controller.refresh_leaderboard();
    let loading = controller.presentation().leaderboard.clone();
    controller.settle().await;

    // then
    assert_eq!(loading, LeaderboardView::Loading);
    let LeaderboardView::Entries(entries) = &controller.presentation().leaderboard else {
        panic!("expected entries");
    };
    let ranked = entries
        .iter()
        .map(|e| (e.rank, e.address.as_str(), e.score))
        .collect::<Vec<_>>();
    assert_eq!(ranked, vec![(1, "0x742d...d35a", 450), (2, "0x1c9e...e7d4", 320)]);
}

#[tokio::test]
async fn refresh_leaderboard__failure_renders_unavailable() {
    // given
    let contract = FakeContract::new();
    contract.set_fail_leaderboard(true);
    let wallet = FakeWallet::new_unauthorized(vec![], SOMNIA_CHAIN_ID);
    let mut controller = controller(wallet, contract);

    // when
    controller.refresh_leaderboard();
    controller.settle().await;

    // then
    assert_eq!(
        controller.presentation().leaderboard,
        LeaderboardView::Unavailable
    );
}

#[tokio::test]
async fn refresh_player_data__all_zero_record_keeps_cached_stats() {
    // given
    let contract = FakeContract::new();
    contract.set_player_score(ALICE, alice_record());
    let handle = contract.clone();
    let mut controller = connected(contract).await;
    assert_eq!(controller.session().high_score, 300);
    handle.set_player_score(ALICE, PlayerScore::default());

    // when
    controller.refresh_player_data();
    controller.settle().await;

    // then
    let session = controller.session();
    assert_eq!(session.high_score, 300);
    assert_eq!(session.total_games, 4);
    assert_eq!(session.last_played, Some(1_700_000_000));
    assert_eq!(controller.presentation().scoreboard.high_score, 300);
}

#[tokio::test]
async fn refresh_player_data__failed_read_keeps_cached_stats() {
    // given
    let contract = FakeContract::new();
    contract.set_player_score(ALICE, alice_record());
    let handle = contract.clone();
    let mut controller = connected(contract).await;
    handle.set_fail_player_score(true);

    // when
    controller.refresh_player_data();
    controller.settle().await;

    // then
    let session = controller.session();
    assert_eq!(session.high_score, 300);
    assert_eq!(session.total_games, 4);
    assert_eq!(session.last_played, Some(1_700_000_000));
    assert_eq!(controller.phase(), Phase::RoundReady);
}

#[tokio::test]
async fn scoreboard__shows_not_deployed_for_zero_address() {
    // given
    let contract = FakeContract::new().with_address(crate::contract::ZERO_ADDRESS);
    let wallet = FakeWallet::new_unauthorized(vec![], SOMNIA_CHAIN_ID);

    // when
    let controller = controller(wallet, contract);

    // then
    assert_eq!(controller.presentation().scoreboard.contract, "Not deployed");
    assert_eq!(controller.presentation().scoreboard.max_attempts, MAX_ATTEMPTS);
}
