use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use std::str::FromStr;

/// A local key standing in for the browser wallet provider.
///
/// Holds the account's private key in process memory and hands out signers
/// bound to it. A session built without one behaves as if no wallet is
/// installed.
#[derive(Clone)]
pub struct Wallet {
   pub name: String,
   pub key: PrivateKeySigner,
}

impl PartialEq for Wallet {
   fn eq(&self, other: &Wallet) -> bool {
      self.key.address() == other.key.address()
   }
}

impl Eq for Wallet {}

impl Wallet {
   pub fn new(name: impl Into<String>, key: PrivateKeySigner) -> Self {
      Self {
         name: name.into(),
         key,
      }
   }

   /// Create a new wallet from a random private key
   pub fn new_rng(name: impl Into<String>) -> Self {
      Self::new(name, PrivateKeySigner::random())
   }

   /// Create a new wallet from a given private key
   pub fn new_from_key_str(name: impl Into<String>, key_str: &str) -> Result<Self, anyhow::Error> {
      let key = PrivateKeySigner::from_str(key_str.trim())?;
      Ok(Self::new(name, key))
   }

   pub fn address(&self) -> Address {
      self.key.address()
   }

   /// Accounts this wallet exposes, the first one is the active account
   pub fn accounts(&self) -> Vec<Address> {
      vec![self.key.address()]
   }

   pub fn to_ethereum_wallet(&self) -> EthereumWallet {
      EthereumWallet::from(self.key.clone())
   }
}
