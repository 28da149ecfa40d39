//! Redeems a resolved market for a wallet whose key lives in AWS KMS.
//!
//! A KMS key cannot send raw transactions on its own, so the relayer pays the gas while
//! the key only signs the relay request.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info,hyper_util=off,hyper=off,reqwest=off,h2=off,rustls=off cargo run --example aws_redeem --features tracing -- <key id> <condition id>
//! ```
//!
//! Requires AWS credentials, a valid KMS key ID and the `POLY_BUILDER_*` credentials.

use std::env;

use alloy::signers::Signer as _;
use alloy::signers::aws::AwsSigner;
use aws_config::BehaviorVersion;
use polymarket_relayer_client::auth::builder::Config as BuilderConfig;
use polymarket_relayer_client::auth::{Credentials, Uuid};
use polymarket_relayer_client::relayer::types::{Market, WalletIdentity};
use polymarket_relayer_client::relayer::{Client, Config, DEFAULT_HOST};
use polymarket_relayer_client::{
    BUILDER_API_KEY_VAR, BUILDER_PASSPHRASE_VAR, BUILDER_SECRET_VAR, POLYGON, contract_config,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let (Some(key_id), Some(condition_id)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: aws_redeem <key id> <condition id>");
    };
    let market = Market::parse(&condition_id, false)?;

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let kms_client = aws_sdk_kms::Client::new(&config);

    info!(key_id = %key_id, "creating AWS KMS signer");
    let signer = AwsSigner::new(kms_client, key_id, Some(POLYGON))
        .await?
        .with_chain_id(Some(POLYGON));

    let credentials = Credentials::new(
        Uuid::parse_str(&env::var(BUILDER_API_KEY_VAR)?)?,
        env::var(BUILDER_SECRET_VAR)?,
        env::var(BUILDER_PASSPHRASE_VAR)?,
    );
    let contracts = *contract_config(POLYGON).ok_or_else(|| anyhow::anyhow!("no Polygon config"))?;
    let client = Client::new(
        DEFAULT_HOST,
        contracts,
        BuilderConfig::local(credentials),
        Config::default(),
    )?;

    let identity = WalletIdentity::derived(signer.address(), POLYGON)?;
    let handle = client.wallet(&signer, identity).redeem(&market).await?;
    info!(transaction_id = %handle.transaction_id, "submitted redeem");

    match client.tracker(handle).wait().await {
        Ok(state) => info!(%state, "redeem finished"),
        Err(e) => error!(error = %e, "redeem could not be observed"),
    }

    Ok(())
}
