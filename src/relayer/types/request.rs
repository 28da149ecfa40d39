use std::str::FromStr as _;

use alloy::primitives::{B256, Bytes, ChainId, Signature, U256};
use bon::Builder;
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use strum_macros::Display;

use crate::error::{Encoding, Error};
use crate::relayer::hash::StructHashInput;
use crate::serde_helpers::U256FromAny;
use crate::types::Address;
use crate::{Result, derive_proxy_wallet};

/// Smart-contract wallet architecture a request is signed for.
///
/// Only the Polymarket proxy wallet is supported. Gnosis Safe wallets sign over a
/// different domain and are handled by separate tooling.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum WalletType {
    Proxy,
}

/// Tag sent in the submission `metadata` field.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Split,
    Merge,
    Redeem,
}

/// The wallet a relayed request acts for.
///
/// `eoa` holds the signing key; `proxy_wallet` is the contract wallet that actually
/// executes the calls on chain.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct WalletIdentity {
    pub eoa: Address,
    #[builder(default = WalletType::Proxy)]
    pub wallet_type: WalletType,
    pub proxy_wallet: Address,
}

impl WalletIdentity {
    #[must_use]
    pub fn proxy(eoa: Address, proxy_wallet: Address) -> Self {
        Self {
            eoa,
            wallet_type: WalletType::Proxy,
            proxy_wallet,
        }
    }

    /// Builds the identity with a CREATE2-derived proxy wallet address.
    pub fn derived(eoa: Address, chain_id: ChainId) -> Result<Self> {
        let proxy_wallet = derive_proxy_wallet(eoa, chain_id).ok_or_else(|| {
            Error::validation(format!(
                "proxy wallet derivation is not supported on chain {chain_id}"
            ))
        })?;

        Ok(Self::proxy(eoa, proxy_wallet))
    }
}

/// The market an operation targets.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct Market {
    pub condition_id: B256,
    /// Whether the market belongs to a neg-risk group and routes through the adapter
    #[builder(default)]
    pub neg_risk: bool,
    #[builder(default = 2)]
    pub outcome_count: usize,
}

impl Market {
    /// A YES/NO market.
    #[must_use]
    pub fn binary(condition_id: B256, neg_risk: bool) -> Self {
        Self {
            condition_id,
            neg_risk,
            outcome_count: 2,
        }
    }

    /// A YES/NO market identified by a hex condition ID.
    pub fn parse(condition_id: &str, neg_risk: bool) -> Result<Self> {
        Ok(Self::binary(parse_condition_id(condition_id)?, neg_risk))
    }
}

/// Parses a 32-byte condition ID, with or without `0x` prefix.
pub fn parse_condition_id(value: &str) -> Result<B256> {
    let malformed = || Encoding::MalformedConditionId {
        value: value.to_owned(),
    };

    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.len() != 64 {
        return Err(malformed().into());
    }

    B256::from_str(hex).map_err(|_e| malformed().into())
}

/// Query parameters for `/relay-payload` and `/nonce`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
pub struct RelayPayloadRequest {
    pub address: Address,
    #[serde(rename = "type")]
    #[builder(default = WalletType::Proxy)]
    pub wallet_type: WalletType,
}

/// Query parameters for `/transaction`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
#[builder(on(String, into))]
pub struct TransactionRequest {
    pub id: String,
}

/// Gas parameters the signature commits to.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureParams {
    #[serde_as(as = "U256FromAny")]
    pub gas_price: U256,
    #[serde_as(as = "U256FromAny")]
    pub gas_limit: U256,
    #[serde_as(as = "U256FromAny")]
    pub relayer_fee: U256,
    pub relay_hub: Address,
    pub relay: Address,
}

/// Body of `POST /submit`.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRelayRequest {
    /// Signing EOA. Must be the `from` of the struct hash.
    pub from: Address,
    /// Proxy wallet factory
    pub to: Address,
    pub proxy_wallet: Address,
    /// ABI-encoded `proxy(...)` call
    pub data: Bytes,
    #[serde_as(as = "U256FromAny")]
    pub nonce: U256,
    #[serde_as(as = "DisplayFromStr")]
    pub signature: Signature,
    pub signature_params: SignatureParams,
    #[serde(rename = "type")]
    pub wallet_type: WalletType,
    pub metadata: Operation,
}

impl SignedRelayRequest {
    /// The struct hash inputs this request was signed over.
    #[must_use]
    pub fn struct_hash_input(&self) -> StructHashInput {
        StructHashInput::builder()
            .from(self.from)
            .to(self.to)
            .data(self.data.clone())
            .tx_fee(self.signature_params.relayer_fee)
            .gas_price(self.signature_params.gas_price)
            .gas_limit(self.signature_params.gas_limit)
            .nonce(self.nonce)
            .relay_hub(self.signature_params.relay_hub)
            .relay_address(self.signature_params.relay)
            .build()
    }
}
