use crate::contract::BankApi;
use crate::utils::{self, NumericValue};
use crate::wallet::Wallet;
use alloy_primitives::{
   Address, TxHash, U256,
   utils::{ParseUnits, parse_units},
};
use serde::{Deserialize, Serialize};
use std::sync::{
   Arc, RwLock,
   atomic::{AtomicBool, Ordering},
};
use thiserror::Error;

/// Decimals of the native currency the contract accounts in
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Error)]
pub enum SessionError {
   #[error("Please install a wallet to use the bank")]
   NoWalletProvider,

   #[error("The wallet returned no accounts")]
   NoAccounts,

   #[error("No wallet is connected")]
   NotConnected,

   #[error("Bank names are limited to 31 bytes")]
   NameTooLong,

   #[error("'{0}' is not a valid amount")]
   InvalidAmount(String),

   #[error("A {0} is already in progress")]
   WriteInFlight(WriteKind),

   /// The write was mined but the follow-up refresh failed, the cached view
   /// is stale. Do not resubmit the transaction.
   #[error("transaction {tx} confirmed but the view refresh failed: {reason}")]
   RefreshFailed { tx: TxHash, reason: anyhow::Error },

   /// Provider or contract failure, including reverts
   #[error(transparent)]
   Operation(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
   SetBankName,
   Deposit,
   Withdraw,
}

impl std::fmt::Display for WriteKind {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      let s = match self {
         Self::SetBankName => "bank rename",
         Self::Deposit => "deposit",
         Self::Withdraw => "withdrawal",
      };
      write!(f, "{}", s)
   }
}

/// The connected account, if any
///
/// `address` is `Some` if and only if `connected` is true
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSession {
   pub connected: bool,
   pub address: Option<Address>,
}

/// Cached view of the contract state, only ever mutated by a re-fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankView {
   pub name: String,
   pub owner: Option<Address>,
   pub is_owner: bool,
   pub customer_balance: NumericValue,
}

/// Raw user drafts, held for the presentation layer and cleared only explicitly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingInput {
   pub deposit: String,
   pub withdraw: String,
   pub bank_name: String,
}

impl PendingInput {
   pub fn clear(&mut self) {
      *self = Self::default();
   }
}

#[derive(Default)]
struct SessionState {
   wallet: WalletSession,
   view: BankView,
}

// One flag per write kind, indexed by WriteKind
#[derive(Clone, Default)]
struct InFlight(Arc<[AtomicBool; 3]>);

impl InFlight {
   fn begin(&self, kind: WriteKind) -> Result<InFlightGuard, SessionError> {
      let flag = &self.0[kind as usize];
      if flag
         .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
         .is_err()
      {
         return Err(SessionError::WriteInFlight(kind));
      }

      Ok(InFlightGuard {
         flags: Arc::clone(&self.0),
         kind,
      })
   }
}

struct InFlightGuard {
   flags: Arc<[AtomicBool; 3]>,
   kind: WriteKind,
}

impl Drop for InFlightGuard {
   fn drop(&mut self) {
      self.flags[self.kind as usize].store(false, Ordering::Release);
   }
}

/// Mediates all interaction between the caller and the wallet / bank contract.
///
/// Owns the wallet session and the cached [BankView]. Every operation returns
/// a [SessionError] on failure so the caller decides what to surface. After a
/// successful write exactly the piece of state the write invalidated is
/// re-fetched.
#[derive(Clone)]
pub struct BankSession<B> {
   bank: B,
   wallet: Option<Wallet>,
   state: Arc<RwLock<SessionState>>,
   in_flight: InFlight,
}

impl<B: BankApi> BankSession<B> {
   /// `wallet` is `None` when no wallet is installed in the environment
   pub fn new(bank: B, wallet: Option<Wallet>) -> Self {
      Self {
         bank,
         wallet,
         state: Arc::new(RwLock::new(SessionState::default())),
         in_flight: InFlight::default(),
      }
   }

   fn read<R>(&self, reader: impl FnOnce(&SessionState) -> R) -> R {
      reader(&self.state.read().unwrap())
   }

   fn write<R>(&self, writer: impl FnOnce(&mut SessionState) -> R) -> R {
      writer(&mut self.state.write().unwrap())
   }

   pub fn wallet_session(&self) -> WalletSession {
      self.read(|s| s.wallet.clone())
   }

   pub fn bank_view(&self) -> BankView {
      self.read(|s| s.view.clone())
   }

   fn require_connected(&self) -> Result<Address, SessionError> {
      self.read(|s| s.wallet.address).ok_or(SessionError::NotConnected)
   }

   fn parse_amount(&self, amount: &str) -> Result<U256, SessionError> {
      let units = parse_units(amount.trim(), NATIVE_DECIMALS)
         .map_err(|_| SessionError::InvalidAmount(amount.to_string()))?;

      // a signed parse means a negative amount, which would wrap into a huge
      // positive value through get_absolute
      match units {
         ParseUnits::U256(wei) => Ok(wei),
         ParseUnits::I256(_) => Err(SessionError::InvalidAmount(amount.to_string())),
      }
   }

   /// Request account access from the wallet and mark the session connected
   pub fn connect(&self) -> Result<Address, SessionError> {
      let wallet = self.wallet.as_ref().ok_or(SessionError::NoWalletProvider)?;

      let accounts = wallet.accounts();
      let account = *accounts.first().ok_or(SessionError::NoAccounts)?;

      self.write(|s| {
         s.wallet.connected = true;
         s.wallet.address = Some(account);
      });

      tracing::info!("Account connected: {}", account);
      Ok(account)
   }

   /// Read the bank's name and update the cached view
   ///
   /// On failure the previously cached name is left untouched.
   pub async fn fetch_bank_name(&self) -> Result<String, SessionError> {
      let raw = self.bank.bank_name().await?;
      let name = utils::decode_bytes32_string(&raw)?;

      self.write(|s| s.view.name = name.clone());
      Ok(name)
   }

   /// Submit a rename transaction and refresh the cached name once it is mined
   pub async fn set_bank_name(&self, draft: &str) -> Result<TxHash, SessionError> {
      let _guard = self.in_flight.begin(WriteKind::SetBankName)?;
      self.require_connected()?;

      let encoded =
         utils::encode_bytes32_string(draft).map_err(|_| SessionError::NameTooLong)?;

      let tx = self.bank.set_bank_name(encoded).await?;
      tracing::info!("Bank name changed: {}", tx);

      self.refresh_after(tx, self.fetch_bank_name().await)
   }

   // A refresh failure after a mined write must not look like a failed write,
   // the caller would resubmit a transaction that already landed.
   fn refresh_after<R>(&self, tx: TxHash, refresh: Result<R, SessionError>) -> Result<TxHash, SessionError> {
      match refresh {
         Ok(_) => Ok(tx),
         Err(e) => Err(SessionError::RefreshFailed {
            tx,
            reason: e.into(),
         }),
      }
   }

   /// Read the owner address and derive whether the connected account is the owner
   ///
   /// Always false when no wallet is connected.
   pub async fn fetch_owner_and_check_ownership(&self) -> Result<bool, SessionError> {
      let owner = self.bank.bank_owner().await?;

      let is_owner = self.write(|s| {
         s.view.owner = Some(owner);
         s.view.is_owner = s.wallet.address.is_some_and(|account| account == owner);
         s.view.is_owner
      });

      Ok(is_owner)
   }

   /// Read the contract-tracked balance of the caller and update the cached view
   pub async fn fetch_customer_balance(&self) -> Result<NumericValue, SessionError> {
      let raw = self.bank.customer_balance().await?;
      let balance = NumericValue::format_wei(raw, NATIVE_DECIMALS);

      self.write(|s| s.view.customer_balance = balance.clone());
      Ok(balance)
   }

   /// Deposit `amount` (a decimal string in native units) into the bank
   ///
   /// The amount is scaled to wei and attached as the transaction value. The
   /// contract is the sole authority on whether it is accepted. On success the
   /// cached balance is refreshed.
   pub async fn deposit(&self, amount: &str) -> Result<TxHash, SessionError> {
      let _guard = self.in_flight.begin(WriteKind::Deposit)?;
      self.require_connected()?;
      let value = self.parse_amount(amount)?;

      let tx = self.bank.deposit(value).await?;
      tracing::info!("Deposited {} wei: {}", value, tx);

      self.refresh_after(tx, self.fetch_customer_balance().await)
   }

   /// Withdraw `amount` from the bank to the connected account
   ///
   /// A contract-side rejection (e.g. insufficient tracked balance) surfaces
   /// as [SessionError::Operation] and leaves the cached balance unchanged.
   pub async fn withdraw(&self, amount: &str) -> Result<TxHash, SessionError> {
      let _guard = self.in_flight.begin(WriteKind::Withdraw)?;
      let to = self.require_connected()?;
      let value = self.parse_amount(amount)?;

      let tx = self.bank.withdraw(to, value).await?;
      tracing::info!("Withdrew {} wei: {}", value, tx);

      self.refresh_after(tx, self.fetch_customer_balance().await)
   }

   /// Populate the whole view, used right after a connect
   pub async fn refresh_all(&self) -> Result<(), SessionError> {
      self.fetch_bank_name().await?;
      self.fetch_owner_and_check_ownership().await?;
      self.fetch_customer_balance().await?;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use alloy_primitives::FixedBytes;
   use anyhow::anyhow;
   use std::str::FromStr;
   use tokio::sync::Notify;

   const ONE_ETH: u128 = 1_000_000_000_000_000_000;

   #[derive(Default)]
   struct MockState {
      name: FixedBytes<32>,
      owner: Address,
      balance: U256,
      balance_fetches: usize,
      balance_reads_fail: bool,
      deposit_gate: Option<Arc<Notify>>,
   }

   #[derive(Clone, Default)]
   struct MockBank(Arc<RwLock<MockState>>);

   impl MockBank {
      fn read<R>(&self, reader: impl FnOnce(&MockState) -> R) -> R {
         reader(&self.0.read().unwrap())
      }

      fn write<R>(&self, writer: impl FnOnce(&mut MockState) -> R) -> R {
         writer(&mut self.0.write().unwrap())
      }
   }

   impl BankApi for MockBank {
      async fn bank_name(&self) -> Result<FixedBytes<32>, anyhow::Error> {
         Ok(self.read(|s| s.name))
      }

      async fn bank_owner(&self) -> Result<Address, anyhow::Error> {
         Ok(self.read(|s| s.owner))
      }

      async fn customer_balance(&self) -> Result<U256, anyhow::Error> {
         self.write(|s| {
            if s.balance_reads_fail {
               return Err(anyhow!("provider unreachable"));
            }
            s.balance_fetches += 1;
            Ok(s.balance)
         })
      }

      async fn set_bank_name(&self, name: FixedBytes<32>) -> Result<TxHash, anyhow::Error> {
         self.write(|s| s.name = name);
         Ok(TxHash::ZERO)
      }

      async fn deposit(&self, value: U256) -> Result<TxHash, anyhow::Error> {
         let gate = self.read(|s| s.deposit_gate.clone());
         if let Some(gate) = gate {
            gate.notified().await;
         }

         self.write(|s| s.balance += value);
         Ok(TxHash::ZERO)
      }

      async fn withdraw(&self, _to: Address, amount: U256) -> Result<TxHash, anyhow::Error> {
         self.write(|s| {
            if amount > s.balance {
               return Err(anyhow!("execution reverted: insufficient balance"));
            }
            s.balance -= amount;
            Ok(TxHash::ZERO)
         })
      }
   }

   fn connected_session() -> (BankSession<MockBank>, MockBank, Address) {
      let bank = MockBank::default();
      let wallet = Wallet::new_rng("test");
      let address = wallet.address();
      let session = BankSession::new(bank.clone(), Some(wallet));
      session.connect().unwrap();
      (session, bank, address)
   }

   #[test]
   fn test_connect_sets_the_session() {
      let bank = MockBank::default();
      let wallet = Wallet::new_rng("test");
      let address = wallet.address();
      let session = BankSession::new(bank, Some(wallet));

      let connected = session.connect().unwrap();
      assert_eq!(connected, address);

      let wallet_session = session.wallet_session();
      assert!(wallet_session.connected);
      assert_eq!(wallet_session.address, Some(address));
   }

   #[test]
   fn test_connect_without_wallet() {
      let session = BankSession::new(MockBank::default(), None);

      let err = session.connect().unwrap_err();
      assert!(matches!(err, SessionError::NoWalletProvider));
      assert!(err.to_string().contains("install a wallet"));

      let wallet_session = session.wallet_session();
      assert!(!wallet_session.connected);
      assert_eq!(wallet_session.address, None);
   }

   #[tokio::test]
   async fn test_fetch_unset_bank_name() {
      let (session, _, _) = connected_session();

      let name = session.fetch_bank_name().await.unwrap();
      assert_eq!(name, "");
      assert_eq!(session.bank_view().name, "");
   }

   #[tokio::test]
   async fn test_set_bank_name_round_trip() {
      let (session, bank, _) = connected_session();

      session.set_bank_name("Acme").await.unwrap();
      assert_eq!(session.bank_view().name, "Acme");
      assert_eq!(
         bank.read(|s| s.name),
         utils::encode_bytes32_string("Acme").unwrap()
      );
   }

   #[tokio::test]
   async fn test_set_bank_name_too_long() {
      let (session, bank, _) = connected_session();

      let draft = "a".repeat(32);
      let err = session.set_bank_name(&draft).await.unwrap_err();
      assert!(matches!(err, SessionError::NameTooLong));
      assert_eq!(bank.read(|s| s.name), FixedBytes::ZERO);
   }

   #[tokio::test]
   async fn test_writes_require_connection() {
      let bank = MockBank::default();
      let session = BankSession::new(bank, Some(Wallet::new_rng("test")));

      let err = session.deposit("1").await.unwrap_err();
      assert!(matches!(err, SessionError::NotConnected));
   }

   #[tokio::test]
   async fn test_deposit_attaches_wei_and_refreshes_once() {
      let (session, bank, _) = connected_session();

      session.deposit("1.5").await.unwrap();

      let expected = U256::from(ONE_ETH) * U256::from(3) / U256::from(2);
      assert_eq!(bank.read(|s| s.balance), expected);
      assert_eq!(bank.read(|s| s.balance_fetches), 1);
      assert_eq!(session.bank_view().customer_balance.wei(), expected);
   }

   #[tokio::test]
   async fn test_deposit_invalid_amount() {
      let (session, bank, _) = connected_session();

      let err = session.deposit("one point five").await.unwrap_err();
      assert!(matches!(err, SessionError::InvalidAmount(_)));
      assert_eq!(bank.read(|s| s.balance_fetches), 0);
   }

   #[tokio::test]
   async fn test_negative_amounts_rejected() {
      let (session, bank, _) = connected_session();
      bank.write(|s| s.balance = U256::from(ONE_ETH));

      // a negative parse must not wrap into a huge positive wei value
      let err = session.deposit("-1.5").await.unwrap_err();
      assert!(matches!(err, SessionError::InvalidAmount(_)));
      assert_eq!(bank.read(|s| s.balance), U256::from(ONE_ETH));

      let err = session.withdraw("-0.5").await.unwrap_err();
      assert!(matches!(err, SessionError::InvalidAmount(_)));
      assert_eq!(bank.read(|s| s.balance), U256::from(ONE_ETH));
      assert_eq!(bank.read(|s| s.balance_fetches), 0);
   }

   #[tokio::test]
   async fn test_refresh_failure_reports_the_mined_tx() {
      let (session, bank, _) = connected_session();
      bank.write(|s| s.balance_reads_fail = true);

      let err = session.deposit("1").await.unwrap_err();
      match err {
         SessionError::RefreshFailed { tx, .. } => assert_eq!(tx, TxHash::ZERO),
         other => panic!("expected RefreshFailed, got {:?}", other),
      }

      // the write itself landed, only the view is stale
      assert_eq!(bank.read(|s| s.balance), U256::from(ONE_ETH));
      assert_eq!(session.bank_view().customer_balance, NumericValue::default());
   }

   #[tokio::test]
   async fn test_withdraw_rejected_leaves_balance() {
      let (session, bank, _) = connected_session();
      bank.write(|s| s.balance = U256::from(ONE_ETH / 10));

      session.fetch_customer_balance().await.unwrap();
      let before = session.bank_view().customer_balance;

      let err = session.withdraw("0.5").await.unwrap_err();
      assert!(matches!(err, SessionError::Operation(_)));

      assert_eq!(bank.read(|s| s.balance), U256::from(ONE_ETH / 10));
      assert_eq!(session.bank_view().customer_balance, before);
      // no refresh on the failure path
      assert_eq!(bank.read(|s| s.balance_fetches), 1);
   }

   #[tokio::test]
   async fn test_withdraw_success() {
      let (session, bank, _) = connected_session();
      bank.write(|s| s.balance = U256::from(ONE_ETH));

      session.withdraw("0.5").await.unwrap();
      assert_eq!(bank.read(|s| s.balance), U256::from(ONE_ETH / 2));
      assert_eq!(
         session.bank_view().customer_balance.wei(),
         U256::from(ONE_ETH / 2)
      );
   }

   #[tokio::test]
   async fn test_ownership_matches_connected_account() {
      let (session, bank, address) = connected_session();
      bank.write(|s| s.owner = address);

      assert!(session.fetch_owner_and_check_ownership().await.unwrap());
      assert!(session.bank_view().is_owner);
      assert_eq!(session.bank_view().owner, Some(address));

      bank.write(|s| s.owner = Address::repeat_byte(0x42));
      assert!(!session.fetch_owner_and_check_ownership().await.unwrap());
      assert!(!session.bank_view().is_owner);
   }

   #[tokio::test]
   async fn test_ownership_false_when_unconnected() {
      let bank = MockBank::default();
      bank.write(|s| s.owner = Address::repeat_byte(0x42));
      let session = BankSession::new(bank, Some(Wallet::new_rng("test")));

      assert!(!session.fetch_owner_and_check_ownership().await.unwrap());
   }

   #[test]
   fn test_address_comparison_ignores_hex_case() {
      let lower = Address::from_str("0x198af1e1d1fa67dafc097ef53e4701309bc21e0d").unwrap();
      let checksummed = Address::from_str("0x198AF1E1d1FA67dAfc097ef53E4701309bc21E0d").unwrap();
      assert_eq!(lower, checksummed);
   }

   #[tokio::test]
   async fn test_overlapping_deposits_rejected() {
      let (session, bank, _) = connected_session();
      let gate = Arc::new(Notify::new());
      bank.write(|s| s.deposit_gate = Some(Arc::clone(&gate)));

      let background = session.clone();
      let first = tokio::spawn(async move { background.deposit("1").await });

      // let the first deposit park on the gate
      tokio::task::yield_now().await;

      let err = session.deposit("1").await.unwrap_err();
      assert!(matches!(
         err,
         SessionError::WriteInFlight(WriteKind::Deposit)
      ));
      // a different write kind is not blocked
      bank.write(|s| s.balance = U256::from(ONE_ETH));
      session.withdraw("0.5").await.unwrap();

      gate.notify_one();
      first.await.unwrap().unwrap();

      // the flag is released once the write completes
      bank.write(|s| s.deposit_gate = None);
      session.deposit("1").await.unwrap();
   }

   #[test]
   fn test_pending_input_clear() {
      let mut input = PendingInput {
         deposit: "1.5".into(),
         withdraw: "0.5".into(),
         bank_name: "Acme".into(),
      };
      input.clear();
      assert_eq!(input, PendingInput::default());
   }
}
