#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod error;
pub mod relayer;
pub(crate) mod serde_helpers;
pub mod types;

use std::fmt::Write as _;

use alloy::primitives::ChainId;
use alloy::primitives::{B256, b256, keccak256};
use bon::Builder;
use phf::phf_map;
use reqwest::{Request, StatusCode, header::HeaderMap};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::types::{Address, address};

pub type Result<T> = std::result::Result<T, Error>;

/// [`ChainId`] for Polygon mainnet
pub const POLYGON: ChainId = 137;

/// [`ChainId`] for Polygon testnet <https://polygon.technology/blog/introducing-the-amoy-testnet-for-polygon-pos>
pub const AMOY: ChainId = 80002;

pub const PRIVATE_KEY_VAR: &str = "POLYMARKET_PRIVATE_KEY";
pub const PROXY_WALLET_VAR: &str = "POLYMARKET_PROXY_WALLET";
pub const BUILDER_API_KEY_VAR: &str = "POLY_BUILDER_API_KEY";
pub const BUILDER_SECRET_VAR: &str = "POLY_BUILDER_SECRET";
pub const BUILDER_PASSPHRASE_VAR: &str = "POLY_BUILDER_PASSPHRASE";

/// Timestamp in seconds since [`std::time::UNIX_EPOCH`]
pub(crate) type Timestamp = i64;

static CONFIG: phf::Map<ChainId, ContractConfig> = phf_map! {
    137_u64 => ContractConfig {
        collateral: address!("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
        conditional_tokens: address!("0x4D97DCd97eC945f40cF65F87097ACe5EA0476045"),
        neg_risk_adapter: address!("0xd91E80cF2E7be2e162c6513ceD06f1dD0dA35296"),
        proxy_factory: address!("0xaB45c5A4B0c941a2F231C04C3f49182e1A254052"),
        relay_hub: address!("0xD216153c06E857cD7f72665E0aF1d7D82172F494"),
    },
    80002_u64 => ContractConfig {
        collateral: address!("0x9c4e1703476e875070ee25b56a58b008cfb8fa78"),
        conditional_tokens: address!("0x69308FB512518e39F9b16112fA8d994F4e2Bf8bB"),
        neg_risk_adapter: address!("0xd91E80cF2E7be2e162c6513ceD06f1dD0dA35296"),
        proxy_factory: address!("0xaB45c5A4B0c941a2F231C04C3f49182e1A254052"),
        relay_hub: address!("0xD216153c06E857cD7f72665E0aF1d7D82172F494"),
    },
};

/// Init code hash for Polymarket Proxy wallets (EIP-1167 minimal proxy)
const PROXY_INIT_CODE_HASH: B256 =
    b256!("0xd21df8dc65880a8606f09fe0ce3df9b8869287ab0b058be05aa9e8af6330a00b");

/// The deployed contract addresses a relayed transaction touches.
///
/// Values are fixed per network. The built-in networks are available through
/// [`contract_config`]; other deployments can be described with [`ContractConfig::builder`]
/// and injected into [`relayer::Client`], so several networks can be used side by side.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct ContractConfig {
    /// ERC-20 collateral (USDC.e)
    pub collateral: Address,
    /// Gnosis Conditional Token Framework
    pub conditional_tokens: Address,
    /// Adapter used in place of the CTF for neg-risk markets
    pub neg_risk_adapter: Address,
    /// Factory that executes `proxy(...)` calls on behalf of a proxy wallet
    pub proxy_factory: Address,
    /// GSN relay hub that the relayer forwards signed requests to
    pub relay_hub: Address,
}

/// Given a `chain_id`, return the relevant [`ContractConfig`]
#[must_use]
pub fn contract_config(chain_id: ChainId) -> Option<&'static ContractConfig> {
    CONFIG.get(&chain_id)
}

/// Derives the Polymarket Proxy wallet address for an EOA using CREATE2.
///
/// This is the deterministic address of the EIP-1167 minimal proxy wallet
/// that Polymarket deploys for Magic/email wallet users.
///
/// # Returns
/// * `Some(Address)` - The derived proxy wallet address
/// * `None` - If the chain doesn't support proxy wallet derivation
#[must_use]
pub fn derive_proxy_wallet(eoa_address: Address, chain_id: ChainId) -> Option<Address> {
    // The init code hash above only holds for the mainnet factory deployment
    if chain_id != POLYGON {
        return None;
    }
    let factory = contract_config(chain_id)?.proxy_factory;

    // Salt is keccak256(encodePacked(address)) - address is 20 bytes, no padding
    let salt = keccak256(eoa_address);

    Some(factory.create2(salt, PROXY_INIT_CODE_HASH))
}

/// Trait for converting request types to URL query parameters.
///
/// This trait is automatically implemented for all types that implement [`Serialize`].
/// It uses [`serde_html_form`] to serialize the struct fields into a query string.
pub trait ToQueryParams: Serialize {
    /// Converts the request to a URL query string.
    ///
    /// Returns an empty string if no parameters are set, otherwise returns
    /// a string starting with `?` followed by URL-encoded key-value pairs.
    fn query_params(&self) -> String {
        let params = serde_html_form::to_string(self)
            .inspect_err(|e| {
                #[cfg(feature = "tracing")]
                tracing::error!("Unable to convert to URL-encoded string {e:?}");
                #[cfg(not(feature = "tracing"))]
                let _: &serde_html_form::ser::Error = e;
            })
            .unwrap_or_default();

        if params.is_empty() {
            String::new()
        } else {
            let mut query = String::with_capacity(params.len() + 1);
            let _ = write!(query, "?{params}");
            query
        }
    }
}

impl<T: Serialize> ToQueryParams for T {}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip(client, request, headers),
        fields(
            method = %request.method(),
            path = request.url().path(),
            status_code
        )
    )
)]
async fn request<Response: DeserializeOwned>(
    client: &reqwest::Client,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<Response> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(h) = headers {
        request.headers_mut().extend(h);
    }

    let response = client.execute(request).await?;
    let status_code = response.status();

    #[cfg(feature = "tracing")]
    tracing::Span::current().record("status_code", status_code.as_u16());

    if !status_code.is_success() {
        let message = response.text().await.unwrap_or_default();

        #[cfg(feature = "tracing")]
        tracing::warn!(
            status = %status_code,
            method = %method,
            path = %path,
            message = %message,
            "relayer request failed"
        );

        if matches!(
            status_code,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(Error::unauthorized(status_code, path, message));
        }

        return Err(Error::status(status_code, method, path, message));
    }

    let json_value = response.json::<serde_json::Value>().await?;
    let response_data: Option<Response> = serde_helpers::deserialize_with_warnings(json_value)?;

    if let Some(response) = response_data {
        Ok(response)
    } else {
        #[cfg(feature = "tracing")]
        tracing::warn!(method = %method, path = %path, "relayer resource not found");
        Err(Error::status(
            StatusCode::NOT_FOUND,
            method,
            path,
            "Unable to find requested resource",
        ))
    }
}
