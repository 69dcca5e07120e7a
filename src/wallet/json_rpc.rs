use super::{
    WalletError,
    WalletEvent,
    WalletProvider,
};
use crate::{
    network::ChainDescriptor,
    rpc::{
        JsonRpcClient,
        RpcError,
    },
};
use serde_json::{
    Value,
    json,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time,
};

/// Wallet reached through its EIP-1193 methods served as JSON-RPC over HTTP.
#[derive(Clone)]
pub struct JsonRpcWallet {
    rpc: JsonRpcClient,
}

impl JsonRpcWallet {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url)?,
        })
    }

    pub fn rpc(&self) -> &JsonRpcClient {
        &self.rpc
    }
}

impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.rpc.request("eth_requestAccounts", json!([])).await?)
    }

    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.rpc.request("eth_accounts", json!([])).await?)
    }

    async fn chain_id(&self) -> Result<String, WalletError> {
        Ok(self.rpc.request("eth_chainId", json!([])).await?)
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), WalletError> {
        let _: Value = self
            .rpc
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_id }]))
            .await?;
        Ok(())
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError> {
        let _: Value = self
            .rpc
            .request("wallet_addEthereumChain", json!([descriptor]))
            .await?;
        Ok(())
    }
}

/// Polls the wallet for account and chain changes and forwards them as
/// events. Ends when the receiver is dropped.
pub async fn watch<W: WalletProvider>(
    wallet: W,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<WalletEvent>,
) {
    let mut ticker = time::interval(poll_interval);
    let mut last_accounts: Option<Vec<String>> = None;
    let mut last_chain: Option<String> = None;
    loop {
        ticker.tick().await;
        if events.is_closed() {
            break;
        }
        match wallet.accounts().await {
            Ok(accounts) => {
                if let Some(prev) = &last_accounts
                    && *prev != accounts
                {
                    tracing::info!(count = accounts.len(), "wallet accounts changed");
                    if events
                        .send(WalletEvent::AccountsChanged(accounts.clone()))
                        .is_err()
                    {
                        break;
                    }
                }
                last_accounts = Some(accounts);
            }
            Err(e) => tracing::debug!(error = %e, "polling wallet accounts failed"),
        }
        match wallet.chain_id().await {
            Ok(chain_id) => {
                if let Some(prev) = &last_chain
                    && *prev != chain_id
                {
                    tracing::info!(%chain_id, "wallet chain changed");
                    if events
                        .send(WalletEvent::ChainChanged(chain_id.clone()))
                        .is_err()
                    {
                        break;
                    }
                }
                last_chain = Some(chain_id);
            }
            Err(e) => tracing::debug!(error = %e, "polling wallet chain id failed"),
        }
    }
}
