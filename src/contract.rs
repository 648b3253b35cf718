use crate::abi::{self, IBank};
use alloy_primitives::{Address, FixedBytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionReceipt;
use anyhow::bail;

/// The contract boundary.
///
/// Reads return the raw on-chain representation, writes submit a transaction
/// and resolve only once it has been included in a block.
#[allow(async_fn_in_trait)]
pub trait BankApi {
   async fn bank_name(&self) -> Result<FixedBytes<32>, anyhow::Error>;

   async fn bank_owner(&self) -> Result<Address, anyhow::Error>;

   async fn customer_balance(&self) -> Result<U256, anyhow::Error>;

   async fn set_bank_name(&self, name: FixedBytes<32>) -> Result<TxHash, anyhow::Error>;

   /// `value` is attached as the native amount transferred with the call
   async fn deposit(&self, value: U256) -> Result<TxHash, anyhow::Error>;

   async fn withdraw(&self, to: Address, amount: U256) -> Result<TxHash, anyhow::Error>;
}

/// [BankApi] backed by the deployed contract
#[derive(Clone)]
pub struct OnchainBank<P: Provider + Clone> {
   address: Address,
   client: P,
}

impl<P: Provider + Clone> OnchainBank<P> {
   pub fn new(address: Address, client: P) -> Self {
      Self { address, client }
   }

   pub fn address(&self) -> Address {
      self.address
   }

   fn contract(&self) -> IBank::IBankInstance<P> {
      IBank::new(self.address, self.client.clone())
   }
}

fn confirmed(receipt: TransactionReceipt) -> Result<TxHash, anyhow::Error> {
   if !receipt.status() {
      bail!("transaction {} reverted", receipt.transaction_hash);
   }
   Ok(receipt.transaction_hash)
}

impl<P: Provider + Clone> BankApi for OnchainBank<P> {
   async fn bank_name(&self) -> Result<FixedBytes<32>, anyhow::Error> {
      abi::bank_name(self.address, self.client.clone()).await
   }

   async fn bank_owner(&self) -> Result<Address, anyhow::Error> {
      abi::bank_owner(self.address, self.client.clone()).await
   }

   async fn customer_balance(&self) -> Result<U256, anyhow::Error> {
      abi::customer_balance(self.address, self.client.clone()).await
   }

   async fn set_bank_name(&self, name: FixedBytes<32>) -> Result<TxHash, anyhow::Error> {
      tracing::debug!("Setting bank name...");
      let receipt = self
         .contract()
         .setBankName(name)
         .send()
         .await?
         .get_receipt()
         .await?;
      confirmed(receipt)
   }

   async fn deposit(&self, value: U256) -> Result<TxHash, anyhow::Error> {
      tracing::debug!("Depositing {} wei...", value);
      let receipt = self
         .contract()
         .depositMoney()
         .value(value)
         .send()
         .await?
         .get_receipt()
         .await?;
      confirmed(receipt)
   }

   async fn withdraw(&self, to: Address, amount: U256) -> Result<TxHash, anyhow::Error> {
      tracing::debug!("Withdrawing {} wei to {}...", amount, to);
      let receipt = self
         .contract()
         .withDrawMoney(to, amount)
         .send()
         .await?
         .get_receipt()
         .await?;
      confirmed(receipt)
   }
}
