use crate::{
    error::GameError,
    network::ChainDescriptor,
    rpc::RpcError,
};
use std::fmt;

pub mod json_rpc;

pub use json_rpc::{
    JsonRpcWallet,
    watch,
};

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-3326 "unrecognized chain id".
pub const UNKNOWN_CHAIN_CODE: i64 = 4902;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalletError {
    UserRejected,
    UnknownChain,
    Provider(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::UserRejected => write!(f, "request rejected by user"),
            WalletError::UnknownChain => write!(f, "chain not registered in wallet"),
            WalletError::Provider(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for WalletError {}

impl From<RpcError> for WalletError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Rpc {
                code: USER_REJECTED_CODE,
                ..
            } => WalletError::UserRejected,
            RpcError::Rpc {
                code: UNKNOWN_CHAIN_CODE,
                ..
            } => WalletError::UnknownChain,
            other => WalletError::Provider(other.to_string()),
        }
    }
}

impl From<WalletError> for GameError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected => GameError::UserRejected,
            WalletError::UnknownChain => GameError::UnknownChain,
            WalletError::Provider(msg) => GameError::ProviderError(msg),
        }
    }
}

/// Events a wallet may emit at any time, including while a controller
/// operation is in flight.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalletEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

pub trait WalletProvider {
    /// Prompts the user to authorize accounts.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<String>, WalletError>>;

    /// Already-authorized accounts; never prompts. May be empty.
    fn accounts(&self) -> impl Future<Output = Result<Vec<String>, WalletError>>;

    fn chain_id(&self) -> impl Future<Output = Result<String, WalletError>>;

    fn switch_chain(
        &self,
        chain_id: &str,
    ) -> impl Future<Output = Result<(), WalletError>>;

    fn add_chain(
        &self,
        descriptor: &ChainDescriptor,
    ) -> impl Future<Output = Result<(), WalletError>>;
}
