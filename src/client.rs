use alloy_network::{Ethereum, EthereumWallet};
use alloy_provider::{
   Identity, ProviderBuilder, RootProvider,
   fillers::{
      BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
   },
};
use alloy_rpc_client::ClientBuilder;
use url::Url;

type Fillers =
   JoinFill<Identity, JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>>;

/// Read-only client, enough for the contract's view calls
pub type RpcClient = FillProvider<Fillers, RootProvider<Ethereum>>;

/// Client bound to a wallet, signs and submits transactions
pub type SignerClient = FillProvider<JoinFill<Fillers, WalletFiller<EthereumWallet>>, RootProvider<Ethereum>>;

pub fn get_http_client(url: &str) -> Result<RpcClient, anyhow::Error> {
   let url = Url::parse(url)?;
   let client = ClientBuilder::default().http(url);
   let client = ProviderBuilder::new().connect_client(client);
   Ok(client)
}

pub fn get_signer_client(url: &str, wallet: EthereumWallet) -> Result<SignerClient, anyhow::Error> {
   let url = Url::parse(url)?;
   let client = ClientBuilder::default().http(url);
   let client = ProviderBuilder::new().wallet(wallet).connect_client(client);
   Ok(client)
}
