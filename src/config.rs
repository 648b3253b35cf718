use alloy_primitives::{Address, address};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The deployed bank contract
pub const BANK_CONTRACT: Address = address!("198af1e1d1fa67dafc097ef53e4701309bc21e0d");

const DEFAULT_RPC: &str = "https://ethereum-sepolia-rpc.publicnode.com";
const SEPOLIA: u64 = 11155111;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
   pub rpc_url: String,
   pub chain_id: u64,
   pub contract: Address,
}

impl Default for BankConfig {
   fn default() -> Self {
      Self {
         rpc_url: DEFAULT_RPC.to_string(),
         chain_id: SEPOLIA,
         contract: BANK_CONTRACT,
      }
   }
}

impl BankConfig {
   pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
      let text = std::fs::read_to_string(path)?;
      let config = serde_json::from_str(&text)?;
      Ok(config)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_config_round_trip() {
      let config = BankConfig::default();
      let json = serde_json::to_string(&config).unwrap();
      let loaded: BankConfig = serde_json::from_str(&json).unwrap();
      assert_eq!(loaded, config);
      assert_eq!(loaded.contract, BANK_CONTRACT);
   }
}
