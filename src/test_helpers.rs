//! In-memory collaborators for driving a [`GameController`](crate::GameController)
//! without a wallet, a node, or a terminal.

use crate::{
    contract::{
        ContractClient,
        ContractError,
        LeaderboardRow,
        PlayerScore,
    },
    network::{
        ChainDescriptor,
        NetworkStatus,
        SOMNIA_CHAIN_ID,
    },
    presentation::{
        Affordance,
        LeaderboardView,
        PickReveal,
        Presentation,
        Scoreboard,
        Severity,
    },
    wallet::{
        WalletError,
        WalletProvider,
    },
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    future::pending,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct WalletState {
    authorized: Vec<String>,
    available: Vec<String>,
    chain_id: String,
    known_chains: HashSet<String>,
    reject: bool,
    failure: Option<String>,
    hang_switch: bool,
    hang_request: bool,
    calls: Vec<String>,
}

/// Wallet whose accounts and chain the test mutates through any clone.
#[derive(Clone, Debug, Default)]
pub struct FakeWallet {
    state: Arc<Mutex<WalletState>>,
}

impl FakeWallet {
    /// Accounts already authorized for this site.
    pub fn with_accounts(accounts: Vec<String>, chain_id: &str) -> Self {
        let wallet = Self::new_unauthorized(accounts, chain_id);
        {
            let mut state = wallet.state.lock().unwrap();
            state.authorized = state.available.clone();
        }
        wallet
    }

    /// Accounts are only handed out after `request_accounts`.
    pub fn new_unauthorized(accounts: Vec<String>, chain_id: &str) -> Self {
        let known_chains = [chain_id.to_string(), SOMNIA_CHAIN_ID.to_string()]
            .into_iter()
            .collect();
        Self {
            state: Arc::new(Mutex::new(WalletState {
                available: accounts,
                chain_id: chain_id.to_string(),
                known_chains,
                ..WalletState::default()
            })),
        }
    }

    pub fn forget_chain(self, chain_id: &str) -> Self {
        self.state.lock().unwrap().known_chains.remove(chain_id);
        self
    }

    pub fn set_accounts(&self, accounts: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        state.available = accounts.clone();
        state.authorized = accounts;
    }

    pub fn set_chain_id(&self, chain_id: &str) {
        self.state.lock().unwrap().chain_id = chain_id.to_string();
    }

    pub fn set_rejecting(&self, reject: bool) {
        self.state.lock().unwrap().reject = reject;
    }

    pub fn set_failure(&self, message: Option<&str>) {
        self.state.lock().unwrap().failure = message.map(str::to_string);
    }

    /// `wallet_switchEthereumChain` never answers.
    pub fn set_hang_on_switch(&self, hang: bool) {
        self.state.lock().unwrap().hang_switch = hang;
    }

    /// `eth_requestAccounts` never answers, like an ignored wallet prompt.
    pub fn set_hang_on_request(&self, hang: bool) {
        self.state.lock().unwrap().hang_request = hang;
    }

    pub fn chain_id_now(&self) -> String {
        self.state.lock().unwrap().chain_id.clone()
    }

    pub fn knows_chain(&self, chain_id: &str) -> bool {
        self.state.lock().unwrap().known_chains.contains(chain_id)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: &str) -> Result<(), WalletError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        if let Some(msg) = &state.failure {
            return Err(WalletError::Provider(msg.clone()));
        }
        Ok(())
    }

    fn check_rejected(&self) -> Result<(), WalletError> {
        if self.state.lock().unwrap().reject {
            return Err(WalletError::UserRejected);
        }
        Ok(())
    }
}

impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.record("eth_requestAccounts")?;
        let hang = self.state.lock().unwrap().hang_request;
        if hang {
            pending::<()>().await;
        }
        self.check_rejected()?;
        let mut state = self.state.lock().unwrap();
        state.authorized = state.available.clone();
        Ok(state.authorized.clone())
    }

    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        self.record("eth_accounts")?;
        Ok(self.state.lock().unwrap().authorized.clone())
    }

    async fn chain_id(&self) -> Result<String, WalletError> {
        self.record("eth_chainId")?;
        Ok(self.chain_id_now())
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), WalletError> {
        self.record("wallet_switchEthereumChain")?;
        let hang = self.state.lock().unwrap().hang_switch;
        if hang {
            pending::<()>().await;
        }
        self.check_rejected()?;
        let mut state = self.state.lock().unwrap();
        if !state.known_chains.contains(chain_id) {
            return Err(WalletError::UnknownChain);
        }
        state.chain_id = chain_id.to_string();
        Ok(())
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError> {
        self.record("wallet_addEthereumChain")?;
        self.check_rejected()?;
        self.state
            .lock()
            .unwrap()
            .known_chains
            .insert(descriptor.chain_id.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ContractState {
    scores: HashMap<String, PlayerScore>,
    leaderboard: Vec<LeaderboardRow>,
    fee: u128,
    fail_submit: bool,
    fail_leaderboard: bool,
    fail_player_score: bool,
    submissions: Vec<(String, u64)>,
    player_score_calls: usize,
}

/// Contract double. Reads and submissions can be held back behind gates that
/// the test opens one call at a time.
#[derive(Clone, Debug)]
pub struct FakeContract {
    state: Arc<Mutex<ContractState>>,
    address: String,
    player_score_gate: Option<Arc<Semaphore>>,
    submit_gate: Option<Arc<Semaphore>>,
}

impl Default for FakeContract {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeContract {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ContractState::default())),
            address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            player_score_gate: None,
            submit_gate: None,
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn with_leaderboard(self, rows: Vec<(&str, u64)>) -> Self {
        self.state.lock().unwrap().leaderboard = rows
            .into_iter()
            .map(|(address, score)| LeaderboardRow {
                address: address.to_string(),
                score,
            })
            .collect();
        self
    }

    pub fn with_fee(self, fee: u128) -> Self {
        self.state.lock().unwrap().fee = fee;
        self
    }

    /// Returns the gate; each added permit lets one `player_score` call answer.
    pub fn gate_player_score(&mut self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.player_score_gate = Some(gate.clone());
        gate
    }

    pub fn gate_submit(&mut self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.submit_gate = Some(gate.clone());
        gate
    }

    pub fn set_player_score(&self, player: &str, score: PlayerScore) {
        self.state
            .lock()
            .unwrap()
            .scores
            .insert(player.to_lowercase(), score);
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.state.lock().unwrap().fail_submit = fail;
    }

    pub fn set_fail_player_score(&self, fail: bool) {
        self.state.lock().unwrap().fail_player_score = fail;
    }

    pub fn set_fail_leaderboard(&self, fail: bool) {
        self.state.lock().unwrap().fail_leaderboard = fail;
    }

    pub fn submissions(&self) -> Vec<(String, u64)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn player_score_calls(&self) -> usize {
        self.state.lock().unwrap().player_score_calls
    }
}

async fn pass(gate: &Option<Arc<Semaphore>>) {
    if let Some(gate) = gate
        && let Ok(permit) = gate.acquire().await
    {
        permit.forget();
    }
}

impl ContractClient for FakeContract {
    fn address(&self) -> &str {
        &self.address
    }

    async fn submit_score(&self, player: &str, score: u64) -> Result<(), ContractError> {
        pass(&self.submit_gate).await;
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(ContractError::Reverted("0xdead".to_string()));
        }
        state.submissions.push((player.to_string(), score));
        let entry = state.scores.entry(player.to_lowercase()).or_default();
        entry.high_score = entry.high_score.max(score);
        entry.total_games += 1;
        entry.last_played = 1_700_000_000;
        Ok(())
    }

    async fn player_score(&self, player: &str) -> Result<PlayerScore, ContractError> {
        self.state.lock().unwrap().player_score_calls += 1;
        pass(&self.player_score_gate).await;
        let state = self.state.lock().unwrap();
        if state.fail_player_score {
            return Err(ContractError::Rpc("node unreachable".to_string()));
        }
        Ok(state
            .scores
            .get(&player.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, ContractError> {
        let state = self.state.lock().unwrap();
        if state.fail_leaderboard {
            return Err(ContractError::Rpc("node unreachable".to_string()));
        }
        Ok(state.leaderboard.clone())
    }

    async fn game_fee(&self) -> Result<u128, ContractError> {
        Ok(self.state.lock().unwrap().fee)
    }
}

/// Presentation that remembers everything it was asked to show.
#[derive(Clone, Debug, Default)]
pub struct RecordingPresentation {
    pub statuses: Vec<(Severity, String)>,
    pub affordances: HashMap<Affordance, bool>,
    pub round_visible: bool,
    pub wallet: Option<String>,
    pub network: NetworkStatus,
    pub scoreboard: Scoreboard,
    pub leaderboard: LeaderboardView,
    pub reveal: Option<PickReveal>,
}

impl RecordingPresentation {
    pub fn last_status(&self) -> Option<(Severity, &str)> {
        self.statuses
            .last()
            .map(|(severity, message)| (*severity, message.as_str()))
    }

    pub fn saw_status(&self, message: &str) -> bool {
        self.statuses.iter().any(|(_, m)| m == message)
    }

    pub fn is_visible(&self, affordance: Affordance) -> bool {
        self.affordances.get(&affordance).copied().unwrap_or(false)
    }
}

impl Presentation for RecordingPresentation {
    fn show_status(&mut self, severity: Severity, message: &str) {
        self.statuses.push((severity, message.to_string()));
    }

    fn set_affordance(&mut self, affordance: Affordance, visible: bool) {
        self.affordances.insert(affordance, visible);
    }

    fn set_round_visible(&mut self, visible: bool) {
        self.round_visible = visible;
    }

    fn render_wallet(&mut self, short_address: Option<&str>) {
        self.wallet = short_address.map(str::to_string);
    }

    fn render_network(&mut self, status: &NetworkStatus) {
        self.network = status.clone();
    }

    fn render_scoreboard(&mut self, scoreboard: &Scoreboard) {
        self.scoreboard = scoreboard.clone();
    }

    fn render_leaderboard(&mut self, leaderboard: &LeaderboardView) {
        self.leaderboard = leaderboard.clone();
    }

    fn reveal_pick(&mut self, reveal: Option<PickReveal>) {
        self.reveal = reveal;
    }
}
