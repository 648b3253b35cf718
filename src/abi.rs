use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_provider::Provider;
use alloy_sol_types::{SolCall, sol};

sol! {
   #[sol(rpc)]
   contract IBank {
      function bankName() external view returns (bytes32);
      function bankOwner() external view returns (address);
      function getCustomerBalance() external view returns (uint256);

      function setBankName(bytes32 _name) external;
      function depositMoney() external payable;
      function withDrawMoney(address _addressTo, uint256 _total) external;
   }
}

pub fn set_bank_name_selector() -> [u8; 4] {
   IBank::setBankNameCall::SELECTOR
}

pub fn deposit_money_selector() -> [u8; 4] {
   IBank::depositMoneyCall::SELECTOR
}

pub fn withdraw_money_selector() -> [u8; 4] {
   IBank::withDrawMoneyCall::SELECTOR
}

pub fn set_bank_name_signature() -> &'static str {
   IBank::setBankNameCall::SIGNATURE
}

pub fn deposit_money_signature() -> &'static str {
   IBank::depositMoneyCall::SIGNATURE
}

pub fn withdraw_money_signature() -> &'static str {
   IBank::withDrawMoneyCall::SIGNATURE
}

pub fn encode_set_bank_name(name: FixedBytes<32>) -> Bytes {
   let c = IBank::setBankNameCall { _name: name };
   Bytes::from(c.abi_encode())
}

pub fn encode_deposit_money() -> Bytes {
   let c = IBank::depositMoneyCall {};
   Bytes::from(c.abi_encode())
}

pub fn encode_withdraw_money(to: Address, total: U256) -> Bytes {
   let c = IBank::withDrawMoneyCall {
      _addressTo: to,
      _total: total,
   };
   Bytes::from(c.abi_encode())
}

pub async fn bank_name<P>(bank: Address, client: P) -> Result<FixedBytes<32>, anyhow::Error>
where
   P: Provider + Clone,
{
   let contract = IBank::new(bank, client);
   let name = contract.bankName().call().await?;
   Ok(name)
}

pub async fn bank_owner<P>(bank: Address, client: P) -> Result<Address, anyhow::Error>
where
   P: Provider + Clone,
{
   let contract = IBank::new(bank, client);
   let owner = contract.bankOwner().call().await?;
   Ok(owner)
}

/// Balance the contract tracks for the caller, not the account's native balance
pub async fn customer_balance<P>(bank: Address, client: P) -> Result<U256, anyhow::Error>
where
   P: Provider + Clone,
{
   let contract = IBank::new(bank, client);
   let balance = contract.getCustomerBalance().call().await?;
   Ok(balance)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_signatures() {
      assert_eq!(set_bank_name_signature(), "setBankName(bytes32)");
      assert_eq!(deposit_money_signature(), "depositMoney()");
      assert_eq!(withdraw_money_signature(), "withDrawMoney(address,uint256)");
   }

   #[test]
   fn test_encoded_calldata_layout() {
      let name = FixedBytes::<32>::repeat_byte(0x11);
      let data = encode_set_bank_name(name);
      assert_eq!(data.len(), 4 + 32);
      assert_eq!(&data[..4], set_bank_name_selector().as_slice());
      assert_eq!(&data[4..], name.as_slice());

      let data = encode_deposit_money();
      assert_eq!(data.len(), 4);
      assert_eq!(&data[..4], deposit_money_selector().as_slice());
   }

   #[test]
   fn test_withdraw_encode_round_trip() {
      let to = Address::repeat_byte(0x22);
      let total = U256::from(42u64);

      let data = encode_withdraw_money(to, total);
      assert_eq!(data.len(), 4 + 64);
      assert_eq!(&data[..4], withdraw_money_selector().as_slice());

      let decoded = IBank::withDrawMoneyCall::abi_decode(&data).unwrap();
      assert_eq!(decoded._addressTo, to);
      assert_eq!(decoded._total, total);
   }
}
