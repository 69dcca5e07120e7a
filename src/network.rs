use serde::{
    Deserialize,
    Serialize,
};

pub const SOMNIA_CHAIN_ID: &str = "0xc498";
pub const SOMNIA_CHAIN_ID_DECIMAL: u64 = 50328;
pub const SOMNIA_CHAIN_NAME: &str = "Somnia Testnet";
pub const SOMNIA_RPC_URL: &str = "https://dream-rpc.somnia.network/";
pub const SOMNIA_EXPLORER_URL: &str = "https://shannon-explorer.somnia.network/";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Network parameters in the shape `wallet_addEthereumChain` expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    pub fn somnia_testnet() -> Self {
        Self {
            chain_id: SOMNIA_CHAIN_ID.to_string(),
            chain_name: SOMNIA_CHAIN_NAME.to_string(),
            rpc_urls: vec![SOMNIA_RPC_URL.to_string()],
            native_currency: NativeCurrency {
                name: "Somnia Test Token".to_string(),
                symbol: "STT".to_string(),
                decimals: 18,
            },
            block_explorer_urls: vec![SOMNIA_EXPLORER_URL.to_string()],
        }
    }

    /// Wallets report chain ids as hex quantities with arbitrary casing and
    /// padding; compare numerically.
    pub fn matches(&self, chain_id: &str) -> bool {
        match (parse_chain_id(&self.chain_id), parse_chain_id(chain_id)) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => self.chain_id.eq_ignore_ascii_case(chain_id),
        }
    }
}

pub fn parse_chain_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Connection state of the wallet's active chain, as shown to the player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NetworkStatus {
    #[default]
    Unknown,
    Correct,
    Wrong {
        chain_id: String,
    },
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn somnia_testnet__serializes_as_add_chain_params() {
        // given
        let descriptor = ChainDescriptor::somnia_testnet();

        // when
        let json = serde_json::to_value(&descriptor).unwrap();

        // then
        let expected = serde_json::json!({
            "chainId": "0xc498",
            "chainName": "Somnia Testnet",
            "rpcUrls": ["https://dream-rpc.somnia.network/"],
            "nativeCurrency": {
                "name": "Somnia Test Token",
                "symbol": "STT",
                "decimals": 18
            },
            "blockExplorerUrls": ["https://shannon-explorer.somnia.network/"]
        });
        assert_eq!(json, expected);
    }

    #[test]
    fn matches__compares_chain_ids_numerically() {
        let descriptor = ChainDescriptor::somnia_testnet();

        assert!(descriptor.matches("0xC498"));
        assert!(descriptor.matches("0x0000c498"));
        assert!(descriptor.matches("50328"));
        assert!(!descriptor.matches("0x1"));
    }

    #[test]
    fn parse_chain_id__decimal_constant_agrees_with_hex() {
        assert_eq!(parse_chain_id(SOMNIA_CHAIN_ID), Some(SOMNIA_CHAIN_ID_DECIMAL));
    }
}
