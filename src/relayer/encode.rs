//! Calldata for split, merge and redeem, and their aggregation into one `proxy(...)` call.
//!
//! Every selector comes from the `sol!` definitions below, so it is always the keccak
//! digest of the canonical signature.

#![allow(
    clippy::exhaustive_structs,
    clippy::exhaustive_enums,
    reason = "Alloy sol! macro generates code that triggers these lints"
)]

use alloy::primitives::{B256, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall as _;

use crate::error::Encoding;
use crate::relayer::types::Market;
use crate::types::Address;
use crate::{ContractConfig, Result};

sol! {
    #![sol(all_derives)]

    /// Gnosis Conditional Token Framework, used for regular markets.
    interface IConditionalTokens {
        function splitPosition(
            address collateralToken,
            bytes32 parentCollectionId,
            bytes32 conditionId,
            uint256[] calldata partition,
            uint256 amount
        ) external;

        function mergePositions(
            address collateralToken,
            bytes32 parentCollectionId,
            bytes32 conditionId,
            uint256[] calldata partition,
            uint256 amount
        ) external;

        function redeemPositions(
            address collateralToken,
            bytes32 parentCollectionId,
            bytes32 conditionId,
            uint256[] calldata indexSets
        ) external;
    }

    /// Entry points for markets in a neg-risk group. The partition is implied.
    interface INegRiskAdapter {
        function splitPosition(bytes32 conditionId, uint256 amount) external;

        function mergePositions(bytes32 conditionId, uint256 amount) external;
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Factory that executes calls through the caller's proxy wallet.
    interface IProxyWalletFactory {
        struct ProxyCall {
            uint8 typeCode;
            address to;
            uint256 value;
            bytes data;
        }

        function proxy(ProxyCall[] calls) external payable returns (bytes[] memory returnValues);
    }
}

pub use IProxyWalletFactory::ProxyCall;

/// `typeCode` of a plain call in the proxy wallet's convention.
pub const CALL_TYPE_CALL: u8 = 1;

/// YES and NO index sets of a two-outcome condition.
pub const BINARY_PARTITION: [u64; 2] = [1, 2];

/// Collections derived from the root, which is all Polymarket uses.
const PARENT_COLLECTION_ID: B256 = B256::ZERO;

fn binary_partition() -> Vec<U256> {
    BINARY_PARTITION.map(U256::from).to_vec()
}

/// A single contract call before aggregation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub target: Address,
    pub data: Bytes,
}

impl EncodedCall {
    #[must_use]
    pub fn new<D: Into<Bytes>>(target: Address, data: D) -> Self {
        Self {
            target,
            data: data.into(),
        }
    }

    /// Wraps the call for the proxy wallet with `typeCode = 1` and no value.
    #[must_use]
    pub fn into_proxy_call(self) -> ProxyCall {
        ProxyCall {
            typeCode: CALL_TYPE_CALL,
            to: self.target,
            value: U256::ZERO,
            data: self.data,
        }
    }
}

/// Builds calldata against a fixed set of deployed contracts.
#[derive(Debug, Clone, Copy)]
pub struct CallEncoder {
    contracts: ContractConfig,
}

impl CallEncoder {
    #[must_use]
    pub const fn new(contracts: ContractConfig) -> Self {
        Self { contracts }
    }

    #[must_use]
    pub const fn contracts(&self) -> &ContractConfig {
        &self.contracts
    }

    /// Splits `amount` of collateral into one YES and one NO token per unit.
    ///
    /// Targets the neg-risk adapter if and only if `market.neg_risk` is set.
    pub fn encode_split(&self, market: &Market, amount: U256) -> Result<EncodedCall> {
        ensure_binary(market)?;

        let call = if market.neg_risk {
            EncodedCall::new(
                self.contracts.neg_risk_adapter,
                INegRiskAdapter::splitPositionCall {
                    conditionId: market.condition_id,
                    amount,
                }
                .abi_encode(),
            )
        } else {
            EncodedCall::new(
                self.contracts.conditional_tokens,
                IConditionalTokens::splitPositionCall {
                    collateralToken: self.contracts.collateral,
                    parentCollectionId: PARENT_COLLECTION_ID,
                    conditionId: market.condition_id,
                    partition: binary_partition(),
                    amount,
                }
                .abi_encode(),
            )
        };

        Ok(call)
    }

    /// Merges `amount` of each outcome token back into collateral.
    ///
    /// The wallet must hold at least `amount` of both outcomes.
    pub fn encode_merge(&self, market: &Market, amount: U256) -> Result<EncodedCall> {
        ensure_binary(market)?;

        let call = if market.neg_risk {
            EncodedCall::new(
                self.contracts.neg_risk_adapter,
                INegRiskAdapter::mergePositionsCall {
                    conditionId: market.condition_id,
                    amount,
                }
                .abi_encode(),
            )
        } else {
            EncodedCall::new(
                self.contracts.conditional_tokens,
                IConditionalTokens::mergePositionsCall {
                    collateralToken: self.contracts.collateral,
                    parentCollectionId: PARENT_COLLECTION_ID,
                    conditionId: market.condition_id,
                    partition: binary_partition(),
                    amount,
                }
                .abi_encode(),
            )
        };

        Ok(call)
    }

    /// Redeems the wallet's whole balance of both outcome slots of a resolved market.
    ///
    /// Neg-risk positions are rejected: the neg-risk adapter redeems them by per-outcome amount,
    /// which this call does not carry.
    pub fn encode_redeem(&self, market: &Market) -> Result<EncodedCall> {
        ensure_binary(market)?;
        if market.neg_risk {
            return Err(Encoding::NegRiskRedemption.into());
        }

        Ok(EncodedCall::new(
            self.contracts.conditional_tokens,
            IConditionalTokens::redeemPositionsCall {
                collateralToken: self.contracts.collateral,
                parentCollectionId: PARENT_COLLECTION_ID,
                conditionId: market.condition_id,
                indexSets: binary_partition(),
            }
            .abi_encode(),
        ))
    }

    /// ERC-20 approval of the collateral token for `spender`.
    #[must_use]
    pub fn encode_approve(&self, spender: Address, amount: U256) -> EncodedCall {
        EncodedCall::new(
            self.contracts.collateral,
            IERC20::approveCall { spender, amount }.abi_encode(),
        )
    }

    /// Unlimited collateral approval for the split target, then the split itself.
    pub fn split_calls(&self, market: &Market, amount: U256) -> Result<Vec<ProxyCall>> {
        let split = self.encode_split(market, amount)?;
        let approve = self.encode_approve(split.target, U256::MAX);

        Ok(vec![approve.into_proxy_call(), split.into_proxy_call()])
    }

    pub fn merge_calls(&self, market: &Market, amount: U256) -> Result<Vec<ProxyCall>> {
        Ok(vec![self.encode_merge(market, amount)?.into_proxy_call()])
    }

    pub fn redeem_calls(&self, market: &Market) -> Result<Vec<ProxyCall>> {
        Ok(vec![self.encode_redeem(market)?.into_proxy_call()])
    }
}

/// ABI-encodes `proxy(calls)`. Calls execute on chain in the given order.
pub fn encode_aggregate(calls: &[ProxyCall]) -> Result<Bytes> {
    if calls.is_empty() {
        return Err(Encoding::EmptyCalls.into());
    }

    Ok(IProxyWalletFactory::proxyCall {
        calls: calls.to_vec(),
    }
    .abi_encode()
    .into())
}

fn ensure_binary(market: &Market) -> Result<()> {
    if market.outcome_count == 2 {
        Ok(())
    } else {
        Err(Encoding::UnsupportedMarketShape {
            outcome_count: market.outcome_count,
        }
        .into())
    }
}
