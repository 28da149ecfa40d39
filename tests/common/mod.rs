#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests, and https://github.com/rust-lang/rust-clippy/issues/13981"
)]
#![allow(
    unused,
    reason = "Deeply nested uses in sub-modules are falsely flagged as being unused"
)]

use std::str::FromStr as _;
use std::time::Duration;

use alloy::primitives::{B256, U256};
use alloy::signers::Signer as _;
use alloy::signers::k256::ecdsa::SigningKey;
use alloy::signers::local::LocalSigner;
use httpmock::MockServer;
use polymarket_relayer_client::auth::Credentials;
use polymarket_relayer_client::auth::builder::Config as BuilderConfig;
use polymarket_relayer_client::relayer::types::{Market, WalletIdentity};
use polymarket_relayer_client::relayer::{Client, Config, RetryConfig};
use polymarket_relayer_client::types::Address;
use polymarket_relayer_client::{POLYGON, contract_config};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

// publicly known private key
pub const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const OTHER_PRIVATE_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const SECRET: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";
pub const BUILDER_PASSPHRASE: &str = "passphrase";
pub const BUILDER_API_KEY: Uuid = Uuid::max();

pub const POLY_BUILDER_API_KEY: &str = "POLY_BUILDER_API_KEY";
pub const POLY_BUILDER_PASSPHRASE: &str = "POLY_BUILDER_PASSPHRASE";
pub const POLY_BUILDER_SIGNATURE: &str = "POLY_BUILDER_SIGNATURE";
pub const POLY_BUILDER_TIMESTAMP: &str = "POLY_BUILDER_TIMESTAMP";

pub const RELAY_ADDRESS: &str = "0xa7be1729f709955d7e0081cf07806e9f806dae26";
pub const TRANSACTION_ID: &str = "0190b317-a1d3-7bec-9b91-eeb6dcd3a620";
pub const TRANSACTION_HASH: &str =
    "0x5a1ba9f1a0e6dbc8e5bd4f9b4ec2e3a4ab0c1c43b1f03e1c8fd77cc7d0f3e2d1";

pub type TestSigner = LocalSigner<SigningKey>;

#[must_use]
pub fn signer() -> TestSigner {
    LocalSigner::from_str(PRIVATE_KEY)
        .unwrap()
        .with_chain_id(Some(POLYGON))
}

#[must_use]
pub fn identity(signer: &TestSigner) -> WalletIdentity {
    WalletIdentity::derived(signer.address(), POLYGON).unwrap()
}

#[must_use]
pub fn market() -> Market {
    Market::binary(B256::repeat_byte(0x7f), false)
}

#[must_use]
pub fn builder_config() -> BuilderConfig {
    BuilderConfig::local(Credentials::new(
        BUILDER_API_KEY,
        SECRET.to_owned(),
        BUILDER_PASSPHRASE.to_owned(),
    ))
}

#[must_use]
pub fn config() -> Config {
    Config::builder()
        .poll_interval(Duration::from_millis(10))
        .poll_timeout(Duration::from_secs(2))
        .retry(
            RetryConfig::builder()
                .max_attempts(2)
                .initial_backoff(Duration::from_millis(1))
                .max_backoff(Duration::from_millis(5))
                .build(),
        )
        .build()
}

pub fn client(host: &str) -> anyhow::Result<Client> {
    let contracts = *contract_config(POLYGON).unwrap();

    Ok(Client::new(host, contracts, builder_config(), config())?)
}

/// Serves `/relay-payload` for any address with `nonce`.
pub fn mock_relay_payload(server: &MockServer, nonce: u64) {
    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/relay-payload")
            .query_param("type", "PROXY");
        then.status(StatusCode::OK).json_body(json!({
            "address": RELAY_ADDRESS,
            "nonce": nonce.to_string()
        }));
    });
}
