use crate::{
    contract::ZERO_ADDRESS,
    network::SOMNIA_RPC_URL,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:1248";
pub const DEFAULT_LOG_DIR: &str = "~/.pumpkin-somnia/logs";

#[derive(Parser, Debug)]
#[command(version, about = "Pick a pumpkin on Somnia Testnet", long_about = None)]
pub struct Cli {
    /// Wallet JSON-RPC endpoint that answers EIP-1193 requests and signs
    /// transactions.
    #[arg(long, default_value = DEFAULT_WALLET_URL)]
    pub wallet_url: String,

    /// Node used for contract reads and receipts.
    #[arg(long, default_value = SOMNIA_RPC_URL)]
    pub rpc_url: String,

    #[arg(long, default_value = ZERO_ADDRESS)]
    pub contract: String,

    /// Keep scores in memory instead of talking to a contract.
    #[arg(long)]
    pub simulate: bool,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// How often the wallet is polled for account and chain changes.
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,

    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// Seed for pumpkin outcomes; random when absent.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub wallet_url: Url,
    pub rpc_url: Url,
    pub contract: String,
    pub simulate: bool,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub log_dir: PathBuf,
    pub seed: Option<u64>,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        let wallet_url = Url::parse(&self.wallet_url)
            .wrap_err_with(|| format!("invalid --wallet-url {}", self.wallet_url))?;
        let rpc_url = Url::parse(&self.rpc_url)
            .wrap_err_with(|| format!("invalid --rpc-url {}", self.rpc_url))?;
        let contract = parse_address(&self.contract)?;
        if self.timeout_secs == 0 {
            return Err(eyre!("--timeout-secs must be positive"));
        }
        if self.poll_ms == 0 {
            return Err(eyre!("--poll-ms must be positive"));
        }
        let log_dir = PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned());
        Ok(AppConfig {
            wallet_url,
            rpc_url,
            contract,
            simulate: self.simulate,
            timeout: Duration::from_secs(self.timeout_secs),
            poll_interval: Duration::from_millis(self.poll_ms),
            log_dir,
            seed: self.seed,
        })
    }
}

fn parse_address(raw: &str) -> Result<String> {
    let hex_part = raw
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("contract address {raw} must start with 0x"))?;
    let bytes = hex::decode(hex_part)
        .wrap_err_with(|| format!("contract address {raw} is not hex"))?;
    if bytes.len() != 20 {
        return Err(eyre!("contract address {raw} must be 20 bytes"));
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}
