pub mod abi;
pub mod client;
pub mod config;
pub mod contract;
pub mod session;
pub mod utils;
pub mod wallet;

pub use config::BankConfig;
pub use contract::{BankApi, OnchainBank};
pub use session::{BankSession, BankView, PendingInput, SessionError, WalletSession, WriteKind};
pub use wallet::Wallet;

pub use alloy_contract;
pub use alloy_network;
pub use alloy_primitives;
pub use alloy_provider;
pub use alloy_rpc_types;
pub use alloy_signer_local;
pub use alloy_sol_types;
