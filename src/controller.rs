use crate::{
    contract::{
        ContractClient,
        ContractError,
        LeaderboardRow,
        PlayerScore,
        display_contract_address,
        rank_leaderboard,
    },
    error::GameError,
    network::{
        ChainDescriptor,
        NetworkStatus,
    },
    outcome::{
        self,
        Outcome,
    },
    presentation::{
        Affordance,
        LeaderboardView,
        PickReveal,
        Presentation,
        Scoreboard,
        Severity,
    },
    session::{
        MAX_ATTEMPTS,
        RoundState,
        Session,
        SessionTag,
    },
    truncate_address,
    wallet::{
        WalletError,
        WalletEvent,
        WalletProvider,
    },
};
use futures::{
    StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::time::Duration;
use tokio::time;
use tracing::{
    debug,
    error,
    info,
    warn,
};

#[cfg(test)]
mod tests;

pub const DEFAULT_WALLET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub chain: ChainDescriptor,
    /// Upper bound on a single chain-id/switch/add wallet request.
    pub wallet_timeout: Duration,
    pub seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            chain: ChainDescriptor::somnia_testnet(),
            wallet_timeout: DEFAULT_WALLET_TIMEOUT,
            seed: None,
        }
    }
}

/// What the hosting loop should do after a wallet event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    /// Tear the controller down and build a fresh one.
    Reload,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Disconnected,
    /// Account bound, round ready, but the wallet is not (yet) on the
    /// required chain. Play is still allowed.
    Connected(NetworkStatus),
    RoundReady,
    RoundActive,
    RoundResolved { attempts_remain: bool },
}

/// Inward event surface: what the player can ask for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Connect,
    StartRound,
    Pick(usize),
    Continue,
    Submit,
    RefreshLeaderboard,
}

enum Completion {
    PlayerData {
        tag: SessionTag,
        result: Result<PlayerScore, ContractError>,
    },
    Submission {
        tag: SessionTag,
        score: u64,
        result: Result<(), ContractError>,
    },
    Leaderboard {
        seq: u64,
        result: Result<Vec<LeaderboardRow>, ContractError>,
    },
    GameFee(Result<u128, ContractError>),
}

async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, WalletError>>,
) -> Result<T, WalletError> {
    time::timeout(limit, fut).await.map_err(|_| {
        WalletError::Provider(format!(
            "wallet did not answer within {}s",
            limit.as_secs()
        ))
    })?
}

pub struct GameController<W, C, P> {
    wallet: W,
    contract: C,
    presentation: P,
    config: ControllerConfig,
    session: Session,
    network: NetworkStatus,
    game_fee: Option<u128>,
    leaderboard_seq: u64,
    rng: StdRng,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, Completion>>,
}

impl<W, C, P> GameController<W, C, P> {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn network_status(&self) -> &NetworkStatus {
        &self.network
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn phase(&self) -> Phase {
        if self.session.account.is_none() {
            return Phase::Disconnected;
        }
        match self.session.round {
            RoundState::Active => Phase::RoundActive,
            RoundState::Resolved => Phase::RoundResolved {
                attempts_remain: !self.session.attempts_exhausted(),
            },
            RoundState::Ready if self.network != NetworkStatus::Correct => {
                Phase::Connected(self.network.clone())
            }
            RoundState::Ready => Phase::RoundReady,
        }
    }

    /// Consumes the controller, handing its collaborators back to the caller.
    pub fn into_parts(self) -> (W, C, P) {
        (self.wallet, self.contract, self.presentation)
    }
}

impl<W, C, P> GameController<W, C, P>
where
    W: WalletProvider,
    C: ContractClient,
    P: Presentation,
{
    pub fn new(wallet: W, contract: C, presentation: P, config: ControllerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut controller = Self {
            wallet,
            contract,
            presentation,
            config,
            session: Session::new(),
            network: NetworkStatus::Unknown,
            game_fee: None,
            leaderboard_seq: 0,
            rng,
            in_flight: FuturesUnordered::new(),
        };
        controller.render_all();
        controller
    }

    /// Page-load sequence: leaderboard, fee, then silent auto-connect to an
    /// already-authorized account.
    pub async fn init(&mut self) {
        info!("initializing game");
        self.refresh_leaderboard();
        self.refresh_game_fee();
        match bounded(self.config.wallet_timeout, self.wallet.accounts()).await {
            Ok(accounts) => {
                if let Some(account) = accounts.first() {
                    self.bind_account(account);
                    self.observe_network().await;
                    self.refresh_player_data();
                    info!(%account, "auto-connected to wallet");
                }
            }
            Err(e) => debug!(error = %e, "no auto-connection available"),
        }
    }

    pub async fn handle(&mut self, command: Command) {
        let res = match command {
            Command::Connect => self.connect().await,
            Command::StartRound => self.start_round(),
            Command::Pick(selection) => {
                self.pick(selection);
                Ok(())
            }
            Command::Continue => {
                self.continue_round();
                Ok(())
            }
            Command::Submit => self.submit_score(),
            Command::RefreshLeaderboard => {
                self.refresh_leaderboard();
                Ok(())
            }
        };
        if let Err(e) = res {
            debug!(?command, error = %e, "command rejected");
        }
    }

    pub fn on_wallet_event(&mut self, event: WalletEvent) -> Flow {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                self.on_accounts_changed(&accounts);
                Flow::Continue
            }
            WalletEvent::ChainChanged(chain_id) => self.on_chain_changed(&chain_id),
        }
    }

    pub async fn connect(&mut self) -> Result<(), GameError> {
        info!("connecting wallet");
        self.status(Severity::Info, "Connecting to wallet...");
        let limit = self.config.wallet_timeout;
        let accounts = match bounded(limit, self.wallet.request_accounts()).await {
            Ok(accounts) => accounts,
            Err(e) => return Err(self.connect_failed(e)),
        };
        let Some(account) = accounts.first() else {
            return Err(self.connect_failed(WalletError::Provider(
                "wallet returned no accounts".to_string(),
            )));
        };
        self.bind_account(account);
        info!(%account, "wallet connected");

        if let Err(e) = self.verify_network().await {
            debug!(error = %e, "network left unverified");
        }
        self.refresh_player_data();
        self.status(Severity::Success, "Wallet connected successfully!");
        Ok(())
    }

    fn connect_failed(&mut self, err: WalletError) -> GameError {
        let err = GameError::from(err);
        error!(error = %err, "error connecting wallet");
        let message = match &err {
            GameError::ProviderError(msg) => format!("Error connecting wallet: {msg}"),
            other => other.to_string(),
        };
        self.status(Severity::Error, &message);
        err
    }

    /// Makes sure the wallet sits on the required chain, switching (and
    /// registering it first if the wallet does not know it). Advisory only.
    pub async fn verify_network(&mut self) -> Result<(), GameError> {
        let chain_id = match bounded(self.config.wallet_timeout, self.wallet.chain_id()).await {
            Ok(chain_id) => chain_id,
            Err(e) => {
                warn!(error = %e, "could not read wallet chain id");
                self.set_network(NetworkStatus::Unknown);
                self.status(Severity::Error, &format!("Could not read network: {e}"));
                return Err(e.into());
            }
        };
        if self.config.chain.matches(&chain_id) {
            info!("wallet on {}", self.config.chain.chain_name);
            self.set_network(NetworkStatus::Correct);
            return Ok(());
        }

        self.set_network(NetworkStatus::Wrong {
            chain_id: chain_id.clone(),
        });
        let name = self.config.chain.chain_name.clone();
        self.status(Severity::Warning, &format!("Switching to {name}..."));
        match self.switch_to_required_chain().await {
            Ok(()) => {
                self.set_network(NetworkStatus::Correct);
                self.status(Severity::Success, &format!("Successfully switched to {name}"));
                Ok(())
            }
            Err(e) => {
                warn!(%chain_id, error = %e, "network switch failed");
                self.status(
                    Severity::Error,
                    &format!("Please switch to {name} in your wallet to play the game"),
                );
                Err(e)
            }
        }
    }

    async fn switch_to_required_chain(&self) -> Result<(), GameError> {
        let limit = self.config.wallet_timeout;
        let chain = &self.config.chain;
        match bounded(limit, self.wallet.switch_chain(&chain.chain_id)).await {
            Ok(()) => Ok(()),
            Err(WalletError::UnknownChain) => {
                info!(chain_id = %chain.chain_id, "chain unknown to wallet, adding it");
                bounded(limit, self.wallet.add_chain(chain)).await?;
                bounded(limit, self.wallet.switch_chain(&chain.chain_id)).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the chain id without asking the wallet to change anything.
    async fn observe_network(&mut self) {
        match bounded(self.config.wallet_timeout, self.wallet.chain_id()).await {
            Ok(chain_id) if self.config.chain.matches(&chain_id) => {
                self.set_network(NetworkStatus::Correct)
            }
            Ok(chain_id) => self.set_network(NetworkStatus::Wrong { chain_id }),
            Err(e) => debug!(error = %e, "could not read wallet chain id"),
        }
    }

    pub fn on_accounts_changed(&mut self, accounts: &[String]) {
        match accounts.first() {
            None => {
                info!("wallet disconnected");
                self.session.disconnect();
                self.set_network(NetworkStatus::Unknown);
                self.presentation.reveal_pick(None);
                self.render_all();
                self.status(Severity::Warning, "Wallet disconnected");
            }
            Some(account) => {
                if self.bind_account(account) {
                    info!(%account, "wallet switched");
                    self.status(Severity::Success, "Wallet switched successfully");
                }
                self.refresh_player_data();
            }
        }
    }

    /// A chain change invalidates every cached RPC answer; nothing is
    /// reconciled in place.
    pub fn on_chain_changed(&mut self, chain_id: &str) -> Flow {
        info!(%chain_id, "wallet chain changed, reloading");
        Flow::Reload
    }

    pub fn start_round(&mut self) -> Result<(), GameError> {
        if self.session.account.is_none() {
            return Err(self.reject(Severity::Warning, GameError::NotConnected));
        }
        if !self.session.start_round() {
            return Err(self.reject(Severity::Error, GameError::AttemptsExhausted));
        }
        debug!(attempts_used = self.session.attempts_used, "round started");
        self.presentation.reveal_pick(None);
        self.sync_affordances();
        self.render_scoreboard();
        self.status(
            Severity::Info,
            "🎯 Choose a pumpkin! Find treasures... or ghosts!",
        );
        Ok(())
    }

    /// Resolves the active round with a random outcome. Returns `None` when no
    /// round is active.
    pub fn pick(&mut self, selection: usize) -> Option<Outcome> {
        if !self.session.round_active() {
            debug!(selection, "pick ignored, no active round");
            return None;
        }
        let drawn = outcome::draw(&mut self.rng);
        self.session.resolve_pick(&drawn);
        info!(
            selection,
            kind = %drawn.kind,
            points = drawn.points,
            score = self.session.score,
            attempts_used = self.session.attempts_used,
            "pumpkin picked"
        );
        self.presentation.reveal_pick(Some(PickReveal {
            selection,
            outcome: drawn,
        }));
        self.status(drawn.kind.severity(), drawn.message);
        self.render_scoreboard();
        self.sync_affordances();
        if self.session.attempts_exhausted() {
            self.status(
                Severity::Success,
                "🎊 Game completed! Submit your score to the blockchain.",
            );
        }
        Some(drawn)
    }

    /// The "collect" action between rounds.
    pub fn continue_round(&mut self) -> bool {
        if !self.session.continue_round() {
            return false;
        }
        let message = format!(
            "💰 Current score: {} points. Ready for next round?",
            self.session.score
        );
        self.status(Severity::Info, &message);
        self.sync_affordances();
        true
    }

    pub fn submit_score(&mut self) -> Result<(), GameError> {
        let Some(account) = self.session.account.clone() else {
            return Err(self.reject(Severity::Warning, GameError::NotConnected));
        };
        if self.session.submitting {
            debug!("submission already pending");
            return Ok(());
        }
        if !self.session.attempts_exhausted() {
            return Err(self.reject(Severity::Warning, GameError::RoundNotFinished));
        }
        let score = self.session.score;
        info!(%account, score, "submitting score");
        self.session.submitting = true;
        self.sync_affordances();
        self.status(Severity::Info, "📡 Submitting score to blockchain...");

        let tag = self.session.tag();
        let contract = self.contract.clone();
        self.in_flight.push(Box::pin(async move {
            let result = contract.submit_score(&account, score).await;
            Completion::Submission { tag, score, result }
        }));
        Ok(())
    }

    pub fn refresh_player_data(&mut self) {
        let Some(account) = self.session.account.clone() else {
            return;
        };
        let tag = self.session.tag();
        let contract = self.contract.clone();
        self.in_flight.push(Box::pin(async move {
            let result = contract.player_score(&account).await;
            Completion::PlayerData { tag, result }
        }));
    }

    pub fn refresh_leaderboard(&mut self) {
        self.leaderboard_seq += 1;
        let seq = self.leaderboard_seq;
        self.presentation.render_leaderboard(&LeaderboardView::Loading);
        let contract = self.contract.clone();
        self.in_flight.push(Box::pin(async move {
            let result = contract.leaderboard().await;
            Completion::Leaderboard { seq, result }
        }));
    }

    pub fn refresh_game_fee(&mut self) {
        let contract = self.contract.clone();
        self.in_flight.push(Box::pin(async move {
            Completion::GameFee(contract.game_fee().await)
        }));
    }

    /// Waits for the next outstanding contract call and applies it. Never
    /// resolves while nothing is in flight.
    pub async fn settle_next(&mut self) {
        match self.in_flight.next().await {
            Some(completion) => self.apply(completion),
            None => std::future::pending().await,
        }
    }

    /// Drives every outstanding call, including follow-ups they trigger.
    pub async fn settle(&mut self) {
        while let Some(completion) = self.in_flight.next().await {
            self.apply(completion);
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::PlayerData { tag, result } => self.apply_player_data(tag, result),
            Completion::Submission { tag, score, result } => {
                self.apply_submission(tag, score, result)
            }
            Completion::Leaderboard { seq, result } => self.apply_leaderboard(seq, result),
            Completion::GameFee(result) => match result {
                Ok(fee) => {
                    self.game_fee = Some(fee);
                    self.render_scoreboard();
                }
                Err(e) => debug!(error = %e, "game fee unavailable"),
            },
        }
    }

    fn apply_player_data(
        &mut self,
        tag: SessionTag,
        result: Result<PlayerScore, ContractError>,
    ) {
        if !self.session.is_current(&tag) {
            debug!(account = ?tag.account, "discarding stale player data");
            return;
        }
        match result {
            Ok(record) if record.is_empty() => {
                debug!(error = %GameError::NoPlayerData, "keeping cached player data");
            }
            Ok(record) => {
                self.session.merge_player_score(&record);
                self.render_scoreboard();
            }
            Err(e) => {
                debug!(error = %e, "no player data found or contract not deployed");
            }
        }
    }

    fn apply_submission(
        &mut self,
        tag: SessionTag,
        score: u64,
        result: Result<(), ContractError>,
    ) {
        if !self.session.is_current(&tag) {
            debug!(account = ?tag.account, score, "discarding stale submission result");
            return;
        }
        self.session.submitting = false;
        match result {
            Ok(()) => {
                self.session.record_submission(score);
                info!(score, high_score = self.session.high_score, "score submitted");
                self.status(
                    Severity::Success,
                    &format!("✅ Score {score} successfully submitted to blockchain!"),
                );
                self.sync_affordances();
                self.render_scoreboard();
                self.refresh_leaderboard();
                self.refresh_player_data();
            }
            Err(e) => {
                let err = GameError::SubmissionFailed(e.to_string());
                error!(error = %e, score, "error submitting score");
                self.status(Severity::Error, &err.to_string());
                self.sync_affordances();
            }
        }
    }

    fn apply_leaderboard(&mut self, seq: u64, result: Result<Vec<LeaderboardRow>, ContractError>) {
        if seq != self.leaderboard_seq {
            debug!(seq, latest = self.leaderboard_seq, "discarding outdated leaderboard");
            return;
        }
        match result {
            Ok(rows) => {
                let entries = rank_leaderboard(rows);
                self.presentation
                    .render_leaderboard(&LeaderboardView::Entries(entries));
            }
            Err(e) => {
                let err = GameError::LeaderboardUnavailable(e.to_string());
                warn!(error = %e, "{err}");
                self.presentation
                    .render_leaderboard(&LeaderboardView::Unavailable);
            }
        }
    }

    /// Returns `true` when `account` is a new identity.
    fn bind_account(&mut self, account: &str) -> bool {
        let changed = self.session.bind_account(account);
        if changed {
            self.presentation.reveal_pick(None);
        }
        let short = truncate_address(account, 6, 4);
        self.presentation.render_wallet(Some(&short));
        self.presentation.set_round_visible(true);
        self.sync_affordances();
        self.render_scoreboard();
        changed
    }

    fn set_network(&mut self, status: NetworkStatus) {
        self.session.network_ok = status == NetworkStatus::Correct;
        self.network = status;
        self.presentation.render_network(&self.network);
    }

    fn sync_affordances(&mut self) {
        let connected = self.session.account.is_some();
        let round = self.session.round;
        let exhausted = self.session.attempts_exhausted();
        let p = &mut self.presentation;
        p.set_affordance(Affordance::Connect, !connected);
        p.set_affordance(Affordance::Start, connected && round == RoundState::Ready);
        p.set_affordance(
            Affordance::Continue,
            connected && round == RoundState::Resolved && !exhausted,
        );
        p.set_affordance(
            Affordance::Submit,
            connected && round == RoundState::Resolved && exhausted && !self.session.submitting,
        );
    }

    fn render_scoreboard(&mut self) {
        let scoreboard = Scoreboard {
            score: self.session.score,
            attempts_used: self.session.attempts_used,
            max_attempts: MAX_ATTEMPTS,
            high_score: self.session.high_score,
            total_games: self.session.total_games,
            last_played: self.session.last_played,
            game_fee: self.game_fee,
            contract: display_contract_address(self.contract.address()),
        };
        self.presentation.render_scoreboard(&scoreboard);
    }

    fn render_all(&mut self) {
        let short = self
            .session
            .account
            .as_deref()
            .map(|account| truncate_address(account, 6, 4));
        self.presentation.render_wallet(short.as_deref());
        self.presentation.set_round_visible(short.is_some());
        self.presentation.render_network(&self.network);
        self.sync_affordances();
        self.render_scoreboard();
    }

    fn status(&mut self, severity: Severity, message: &str) {
        self.presentation.show_status(severity, message);
    }

    fn reject(&mut self, severity: Severity, err: GameError) -> GameError {
        self.status(severity, &err.to_string());
        err
    }
}
