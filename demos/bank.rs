use eth_bank::{
   BankConfig, BankSession, OnchainBank, PendingInput, Wallet,
   alloy_provider::Provider,
   client::get_signer_client,
};

use anyhow::anyhow;
use std::io::Write;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn prompt(msg: &str) -> String {
   print!("{}", msg);
   std::io::stdout().flush().unwrap();
   let mut line = String::new();
   std::io::stdin().read_line(&mut line).unwrap();
   line.trim().to_string()
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
   let filter = EnvFilter::new("eth_bank=info,bank_demo=info");
   let console_layer = fmt::layer().with_writer(std::io::stdout);
   tracing_subscriber::registry().with(console_layer).with(filter).init();

   let config = match std::env::args().nth(1) {
      Some(path) => BankConfig::load(path)?,
      None => BankConfig::default(),
   };

   let key = prompt("Paste the private key to use for signing transactions: ");
   let wallet = Wallet::new_from_key_str("demo", &key)?;
   println!("Signer address: {}", wallet.address());

   let client = get_signer_client(&config.rpc_url, wallet.to_ethereum_wallet())?;

   let client_chain = client.get_chain_id().await?;
   if client_chain != config.chain_id {
      return Err(anyhow!(
         "Client chain id {} does not match expected chain id {}",
         client_chain,
         config.chain_id
      ));
   }

   let bank = OnchainBank::new(config.contract, client);
   let session = BankSession::new(bank, Some(wallet));

   session.connect()?;
   session.refresh_all().await?;

   let mut input = PendingInput::default();

   loop {
      let view = session.bank_view();
      println!();
      println!("Bank: {}", view.name);
      println!("Owner: {:?} (you: {})", view.owner, view.is_owner);
      println!("Your balance: {} ETH", view.customer_balance.formatted());

      let command = prompt("deposit / withdraw / rename / refresh / clear / quit: ");
      let result = match command.as_str() {
         "deposit" => {
            input.deposit = prompt("Amount in ETH: ");
            session.deposit(&input.deposit).await.map(|_| ())
         }
         "withdraw" => {
            input.withdraw = prompt("Amount in ETH: ");
            session.withdraw(&input.withdraw).await.map(|_| ())
         }
         "rename" => {
            input.bank_name = prompt("New bank name: ");
            session.set_bank_name(&input.bank_name).await.map(|_| ())
         }
         "refresh" => session.refresh_all().await,
         "clear" => {
            input.clear();
            Ok(())
         }
         "quit" => break,
         _ => {
            println!("Unknown command: {}", command);
            continue;
         }
      };

      if let Err(e) = result {
         println!("Operation failed: {}", e);
      }
   }

   Ok(())
}
