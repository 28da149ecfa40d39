//! Splits collateral into YES and NO positions through the relayer, then merges them back.
//!
//! Neither transaction costs the wallet any gas: the relayer executes both through the
//! proxy wallet factory.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info,hyper_util=off,hyper=off,reqwest=off,h2=off,rustls=off cargo run --example split --features tracing -- <condition id>
//! ```
//!
//! Optionally log to a file:
//! ```sh
//! LOG_FILE=split.log RUST_LOG=info,hyper_util=off,hyper=off,reqwest=off,h2=off,rustls=off cargo run --example split --features tracing -- <condition id>
//! ```
//!
//! Requires `POLYMARKET_PRIVATE_KEY` and the `POLY_BUILDER_*` credentials to be set.
//! `POLYMARKET_PROXY_WALLET` overrides the derived proxy wallet address.

use std::env;
use std::fs::File;
use std::str::FromStr as _;

use alloy::signers::Signer as _;
use alloy::signers::local::LocalSigner;
use polymarket_relayer_client::auth::builder::Config as BuilderConfig;
use polymarket_relayer_client::auth::{Credentials, Uuid};
use polymarket_relayer_client::relayer::types::{Market, WalletIdentity};
use polymarket_relayer_client::relayer::{Client, Config, DEFAULT_HOST};
use polymarket_relayer_client::types::{Address, U256};
use polymarket_relayer_client::{
    BUILDER_API_KEY_VAR, BUILDER_PASSPHRASE_VAR, BUILDER_SECRET_VAR, POLYGON, PRIVATE_KEY_VAR,
    PROXY_WALLET_VAR, contract_config,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// 1 USDC.e, which has 6 decimals
const AMOUNT: u64 = 1_000_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = env::var("LOG_FILE") {
        let file = File::create(path)?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let condition_id = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: split <condition id>"))?;
    let market = Market::parse(&condition_id, false)?;

    let private_key = env::var(PRIVATE_KEY_VAR)?;
    let signer = LocalSigner::from_str(&private_key)?.with_chain_id(Some(POLYGON));

    let credentials = Credentials::new(
        Uuid::parse_str(&env::var(BUILDER_API_KEY_VAR)?)?,
        env::var(BUILDER_SECRET_VAR)?,
        env::var(BUILDER_PASSPHRASE_VAR)?,
    );

    let identity = match env::var(PROXY_WALLET_VAR) {
        Ok(proxy_wallet) => {
            WalletIdentity::proxy(signer.address(), Address::from_str(&proxy_wallet)?)
        }
        Err(_) => WalletIdentity::derived(signer.address(), POLYGON)?,
    };
    info!(eoa = %identity.eoa, proxy_wallet = %identity.proxy_wallet, "using proxy wallet");

    let contracts = *contract_config(POLYGON).ok_or_else(|| anyhow::anyhow!("no Polygon config"))?;
    let client = Client::new(
        DEFAULT_HOST,
        contracts,
        BuilderConfig::local(credentials),
        Config::default(),
    )?;
    let wallet = client.wallet(&signer, identity);

    let amount = U256::from(AMOUNT);

    let handle = wallet.split(&market, amount).await?;
    info!(operation = "split", transaction_id = %handle.transaction_id, "submitted");

    let mut tracker = client.tracker(handle);
    match tracker.wait().await {
        Ok(state) if tracker.handle().is_success() => {
            info!(operation = "split", %state, hash = ?tracker.handle().transaction_hash);
        }
        Ok(state) if state.is_terminal() => {
            error!(operation = "split", %state, "transaction did not succeed");
            return Ok(());
        }
        Ok(state) => {
            warn!(operation = "split", %state, "gave up waiting, not merging");
            return Ok(());
        }
        Err(e) => {
            error!(operation = "split", error = %e);
            return Err(e.into());
        }
    }

    let handle = wallet.merge(&market, amount).await?;
    info!(operation = "merge", transaction_id = %handle.transaction_id, "submitted");

    match client.tracker(handle).wait().await {
        Ok(state) => info!(operation = "merge", %state),
        Err(e) => error!(operation = "merge", error = %e),
    }

    Ok(())
}
