//! Turning an aggregated call into a signed relay request.
//!
//! Each wallet architecture signs over its own domain, so signing sits behind
//! [`WalletSigningStrategy`], which is picked once when a [`crate::relayer::Wallet`] is built.
//! [`ProxyWalletStrategy`] is the only implementation.

use alloy::primitives::{B256, Signature, eip191_hash_message};
use alloy::signers::Signer;
use async_trait::async_trait;
use bon::Builder;

use crate::error::Error;
use crate::relayer::encode::{ProxyCall, encode_aggregate};
use crate::relayer::hash::StructHashInput;
use crate::relayer::types::{
    Operation, RelayContext, SignatureParams, SignedRelayRequest, WalletIdentity, WalletType,
};
use crate::{ContractConfig, Result};

/// Signs `struct_hash` the way `personal_sign` does.
///
/// The digest is wrapped as `"\x19Ethereum Signed Message:\n32" ‖ struct_hash` and the
/// keccak of that is signed. The relay hub rejects signatures over the bare struct hash.
pub async fn sign_struct_hash<S: Signer + Sync + ?Sized>(
    signer: &S,
    struct_hash: B256,
) -> Result<Signature> {
    let digest = eip191_hash_message(struct_hash);
    Ok(signer.sign_hash(&digest).await?)
}

/// Everything needed to sign one submission.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct UnsignedRelayRequest {
    pub identity: WalletIdentity,
    pub contracts: ContractConfig,
    /// Must be freshly fetched for `identity.eoa`
    pub context: RelayContext,
    pub calls: Vec<ProxyCall>,
    pub operation: Operation,
}

#[async_trait]
pub trait WalletSigningStrategy: Send + Sync {
    fn wallet_type(&self) -> WalletType;

    async fn sign_request<S: Signer + Sync + ?Sized>(
        &self,
        signer: &S,
        request: UnsignedRelayRequest,
    ) -> Result<SignedRelayRequest>;
}

/// Signing for Polymarket proxy wallets: `proxy(calls)` sent to the proxy wallet factory.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyWalletStrategy;

#[async_trait]
impl WalletSigningStrategy for ProxyWalletStrategy {
    fn wallet_type(&self) -> WalletType {
        WalletType::Proxy
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(
            eoa = %request.identity.eoa,
            nonce = %request.context.nonce,
            operation = %request.operation
        ))
    )]
    async fn sign_request<S: Signer + Sync + ?Sized>(
        &self,
        signer: &S,
        request: UnsignedRelayRequest,
    ) -> Result<SignedRelayRequest> {
        let UnsignedRelayRequest {
            identity,
            contracts,
            context,
            calls,
            operation,
        } = request;

        if signer.address() != identity.eoa {
            return Err(Error::validation(format!(
                "signer address {} does not match wallet EOA {}",
                signer.address(),
                identity.eoa
            )));
        }

        let data = encode_aggregate(&calls)?;
        let input = StructHashInput::builder()
            .from(identity.eoa)
            .to(contracts.proxy_factory)
            .data(data.clone())
            .nonce(context.nonce)
            .relay_hub(contracts.relay_hub)
            .relay_address(context.relay_address)
            .build();

        let struct_hash = input.struct_hash();
        let signature = sign_struct_hash(signer, struct_hash).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%struct_hash, relay = %context.relay_address, "signed proxy request");

        Ok(SignedRelayRequest {
            from: input.from,
            to: input.to,
            proxy_wallet: identity.proxy_wallet,
            data,
            nonce: input.nonce,
            signature,
            signature_params: SignatureParams::from(&input),
            wallet_type: self.wallet_type(),
            metadata: operation,
        })
    }
}
