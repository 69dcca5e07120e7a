pub mod client;
pub mod config;
pub mod contract;
pub mod controller;
pub mod error;
pub mod network;
pub mod outcome;
pub mod presentation;
pub mod rpc;
pub mod session;
pub mod test_helpers;
pub mod ui;
pub mod wallet;

pub use controller::{
    Flow,
    GameController,
    Phase,
};
pub use error::GameError;
pub use session::MAX_ATTEMPTS;

/// Shortens an address for display: the first `head` characters, `...`, and the
/// last `tail` characters. Short or non-ASCII identifiers are returned untouched.
pub fn truncate_address(address: &str, head: usize, tail: usize) -> String {
    if !address.is_ascii() || address.len() <= head + tail {
        return address.to_string();
    }
    format!("{}...{}", &address[..head], &address[address.len() - tail..])
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn truncate_address__keeps_prefix_and_suffix() {
        // given
        let address = "0x742d35Cc6634C0532925a3b844Bc454e4438d35a";

        // when
        let short = truncate_address(address, 6, 4);

        // then
        assert_eq!(short, "0x742d...d35a");
    }

    #[test]
    fn truncate_address__leaves_short_identifiers_alone() {
        assert_eq!(truncate_address("0x1234", 6, 4), "0x1234");
    }
}
