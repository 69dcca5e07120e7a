use crate::{
    config::AppConfig,
    contract::{
        ContractClient,
        JsonRpcContractClient,
        SimulatedContractClient,
    },
    controller::{
        ControllerConfig,
        Flow,
        GameController,
    },
    network::ChainDescriptor,
    presentation::{
        Presentation,
        Severity,
    },
    rpc::JsonRpcClient,
    ui,
    wallet::{
        self,
        JsonRpcWallet,
        WalletEvent,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use tokio::sync::mpsc;

pub async fn run_app(config: AppConfig) -> Result<()> {
    let wallet = JsonRpcWallet::new(config.wallet_url.as_str())
        .wrap_err("failed to build wallet client")?;
    if config.simulate {
        tracing::info!("using simulated contract");
        return run_ui(&config, wallet, SimulatedContractClient::default()).await;
    }
    let node = JsonRpcClient::new(config.rpc_url.as_str())
        .wrap_err("failed to build node client")?;
    let contract = JsonRpcContractClient::new(
        config.contract.clone(),
        node,
        wallet.rpc().clone(),
        config.timeout,
    );
    tracing::info!(contract = %config.contract, rpc = %config.rpc_url, "using deployed contract");
    run_ui(&config, wallet, contract).await
}

async fn run_ui<C: ContractClient>(
    config: &AppConfig,
    wallet: JsonRpcWallet,
    contract: C,
) -> Result<()> {
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!(wallet = %config.wallet_url, "starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(config, wallet, contract, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<C: ContractClient>(
    config: &AppConfig,
    wallet: JsonRpcWallet,
    contract: C,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let controller_config = ControllerConfig {
        chain: ChainDescriptor::somnia_testnet(),
        wallet_timeout: config.timeout,
        seed: config.seed,
    };
    let (wallet_tx, mut wallet_rx) = mpsc::unbounded_channel::<WalletEvent>();
    let watcher = wallet::watch(wallet.clone(), config.poll_interval, wallet_tx);
    tokio::pin!(watcher);
    let mut watching = true;
    let mut view = ui::ViewModel::default();

    'reload: loop {
        let mut controller = GameController::new(
            wallet.clone(),
            contract.clone(),
            view,
            controller_config.clone(),
        );
        ui::draw(ui_state, controller.presentation()).wrap_err("initial draw failed")?;
        controller.init().await;
        ui::draw(ui_state, controller.presentation()).wrap_err("draw after init failed")?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(());
                }
                raw_ev = ui::next_raw_event(input_events) => {
                    let event = raw_ev?;
                    let Some(ev) = ui::interpret_event(ui_state, event) else {
                        continue;
                    };
                    match ev {
                        ui::UserEvent::Quit => return Ok(()),
                        ui::UserEvent::Redraw => {}
                        ui::UserEvent::Command(command) => controller.handle(command).await,
                    }
                }
                Some(event) = wallet_rx.recv() => {
                    if controller.on_wallet_event(event) == Flow::Reload {
                        let (_, _, mut presentation) = controller.into_parts();
                        presentation.reveal_pick(None);
                        presentation.show_status(Severity::Warning, "Network changed, reloading...");
                        view = presentation;
                        continue 'reload;
                    }
                }
                _ = controller.settle_next() => {}
                _ = &mut watcher, if watching => {
                    tracing::warn!("wallet watcher stopped");
                    watching = false;
                }
            }
            ui::draw(ui_state, controller.presentation()).wrap_err("draw failed")?;
        }
    }
}
