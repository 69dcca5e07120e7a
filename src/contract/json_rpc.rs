use super::{
    ContractClient,
    ContractError,
    LeaderboardRow,
    PlayerScore,
    ZERO_ADDRESS,
    abi,
};
use crate::rpc::JsonRpcClient;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

#[derive(Debug, Deserialize)]
struct ReceiptDto {
    #[serde(default)]
    status: Option<String>,
}

/// Reads through the network RPC node, writes through the wallet endpoint so
/// the wallet signs the transaction.
#[derive(Clone)]
pub struct JsonRpcContractClient {
    address: String,
    node: JsonRpcClient,
    wallet: JsonRpcClient,
    receipt_timeout: Duration,
}

impl JsonRpcContractClient {
    pub fn new(
        address: impl Into<String>,
        node: JsonRpcClient,
        wallet: JsonRpcClient,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            node,
            wallet,
            receipt_timeout,
        }
    }

    fn ensure_deployed(&self) -> Result<(), ContractError> {
        if self.address.eq_ignore_ascii_case(ZERO_ADDRESS) {
            return Err(ContractError::NotDeployed);
        }
        Ok(())
    }

    async fn call(&self, data: String) -> Result<String, ContractError> {
        self.ensure_deployed()?;
        let out: String = self
            .node
            .request(
                "eth_call",
                json!([{ "to": self.address, "data": data }, "latest"]),
            )
            .await?;
        // No code at the address answers with empty return data.
        if out == "0x" {
            return Err(ContractError::NotDeployed);
        }
        Ok(out)
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<(), ContractError> {
        loop {
            let receipt: Option<ReceiptDto> = self
                .node
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            match receipt {
                Some(ReceiptDto {
                    status: Some(status),
                }) if status == "0x0" => {
                    return Err(ContractError::Reverted(tx_hash.to_string()));
                }
                Some(_) => return Ok(()),
                None => time::sleep(RECEIPT_POLL_INTERVAL).await,
            }
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<(), ContractError> {
        time::timeout(self.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| ContractError::Timeout)?
    }
}

impl ContractClient for JsonRpcContractClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn submit_score(&self, player: &str, score: u64) -> Result<(), ContractError> {
        self.ensure_deployed()?;
        let data = abi::calldata(abi::SUBMIT_SCORE, &[abi::uint_word(score as u128)]);
        let tx_hash: String = self
            .wallet
            .request(
                "eth_sendTransaction",
                json!([{ "from": player, "to": self.address, "data": data }]),
            )
            .await?;
        tracing::info!(%tx_hash, score, "score transaction sent");
        self.wait_for_receipt(&tx_hash).await
    }

    async fn player_score(&self, player: &str) -> Result<PlayerScore, ContractError> {
        let data = abi::calldata(abi::GET_PLAYER_SCORE, &[abi::address_word(player)?]);
        let out = self.call(data).await?;
        abi::decode_player_score(&out)
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, ContractError> {
        let out = self.call(abi::calldata(abi::GET_LEADERBOARD, &[])).await?;
        abi::decode_leaderboard(&out)
    }

    async fn game_fee(&self) -> Result<u128, ContractError> {
        let out = self.call(abi::calldata(abi::GAME_FEE, &[])).await?;
        abi::decode_uint(&out)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn client(address: &str) -> JsonRpcContractClient {
        JsonRpcContractClient::new(
            address,
            JsonRpcClient::new("http://127.0.0.1:1").unwrap(),
            JsonRpcClient::new("http://127.0.0.1:1").unwrap(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn leaderboard__zero_address_is_not_deployed_without_network_io() {
        // given
        let client = client(ZERO_ADDRESS);

        // when
        let res = client.leaderboard().await;

        // then
        assert_eq!(res, Err(ContractError::NotDeployed));
    }

    #[tokio::test]
    async fn submit_score__zero_address_is_not_deployed() {
        let client = client(ZERO_ADDRESS);

        let res = client
            .submit_score("0x742d35cc6634c0532925a3b844bc454e4438d35a", 10)
            .await;

        assert_eq!(res, Err(ContractError::NotDeployed));
    }
}
