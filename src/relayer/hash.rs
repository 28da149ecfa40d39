//! Struct hash construction for proxy wallet relay requests.
//!
//! The relay hub verifies a signature over a keccak digest of a raw byte concatenation:
//!
//! ```text
//! "rlx:" ‖ from(20) ‖ to(20) ‖ data ‖ txFee(32) ‖ gasPrice(32) ‖ gasLimit(32) ‖ nonce(32) ‖ relayHub(20) ‖ relay(20)
//! ```
//!
//! Integers are big-endian and left-padded to 32 bytes, addresses are written as their raw
//! 20 bytes. This is *not* ABI encoding. [`Packer`] enforces the field order through its
//! type parameter, so a field can neither be skipped nor written out of order.

use std::marker::PhantomData;

use alloy::primitives::{B256, Bytes, U256, keccak256};
use bon::Builder;

use crate::relayer::types::SignatureParams;
use crate::types::Address;

/// Literal prefix of every proxy struct hash preimage.
pub const STRUCT_HASH_PREFIX: &[u8; 4] = b"rlx:";

/// Gas limit the relay hub is asked to forward with.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

const ADDRESS_LEN: usize = 20;
const WORD_LEN: usize = 32;
/// Preimage length excluding the variable `data` segment.
const FIXED_LEN: usize = STRUCT_HASH_PREFIX.len() + 4 * ADDRESS_LEN + 4 * WORD_LEN;

/// Write stages of a [`Packer`].
pub mod stage {
    #[derive(Debug)]
    pub struct Start;
    #[derive(Debug)]
    pub struct WithFrom;
    #[derive(Debug)]
    pub struct WithTo;
    #[derive(Debug)]
    pub struct WithData;
    #[derive(Debug)]
    pub struct WithFees;
    #[derive(Debug)]
    pub struct WithNonce;
    #[derive(Debug)]
    pub struct WithRelayHub;
    #[derive(Debug)]
    pub struct Complete;
}

/// Byte buffer for the struct hash preimage that only accepts fields in order.
#[derive(Debug)]
pub struct Packer<Stage> {
    buffer: Vec<u8>,
    _stage: PhantomData<Stage>,
}

impl<Stage> Packer<Stage> {
    fn advance<Next>(self) -> Packer<Next> {
        Packer {
            buffer: self.buffer,
            _stage: PhantomData,
        }
    }

    fn address(mut self, address: Address) -> Self {
        self.buffer.extend_from_slice(address.as_slice());
        self
    }

    fn word(mut self, value: U256) -> Self {
        self.buffer.extend_from_slice(&value.to_be_bytes::<WORD_LEN>());
        self
    }
}

impl Packer<stage::Start> {
    /// Starts a preimage sized for `data_len` bytes of calldata.
    #[must_use]
    pub fn new(data_len: usize) -> Self {
        let mut buffer = Vec::with_capacity(FIXED_LEN + data_len);
        buffer.extend_from_slice(STRUCT_HASH_PREFIX);

        Self {
            buffer,
            _stage: PhantomData,
        }
    }

    #[must_use]
    pub fn from(self, from: Address) -> Packer<stage::WithFrom> {
        self.address(from).advance()
    }
}

impl Packer<stage::WithFrom> {
    #[must_use]
    pub fn to(self, to: Address) -> Packer<stage::WithTo> {
        self.address(to).advance()
    }
}

impl Packer<stage::WithTo> {
    #[must_use]
    pub fn data(mut self, data: &[u8]) -> Packer<stage::WithData> {
        self.buffer.extend_from_slice(data);
        self.advance()
    }
}

impl Packer<stage::WithData> {
    #[must_use]
    pub fn fees(self, tx_fee: U256, gas_price: U256, gas_limit: U256) -> Packer<stage::WithFees> {
        self.word(tx_fee).word(gas_price).word(gas_limit).advance()
    }
}

impl Packer<stage::WithFees> {
    #[must_use]
    pub fn nonce(self, nonce: U256) -> Packer<stage::WithNonce> {
        self.word(nonce).advance()
    }
}

impl Packer<stage::WithNonce> {
    #[must_use]
    pub fn relay_hub(self, relay_hub: Address) -> Packer<stage::WithRelayHub> {
        self.address(relay_hub).advance()
    }
}

impl Packer<stage::WithRelayHub> {
    #[must_use]
    pub fn relay(self, relay_address: Address) -> Packer<stage::Complete> {
        self.address(relay_address).advance()
    }
}

impl Packer<stage::Complete> {
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    #[must_use]
    pub fn hash(&self) -> B256 {
        keccak256(&self.buffer)
    }
}

/// Every input of a proxy struct hash.
///
/// `from` must be the signing EOA and must equal the `from` of the submitted request.
/// `nonce` and `relay_address` must come from the latest relay context for that EOA.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct StructHashInput {
    pub from: Address,
    /// Proxy wallet factory
    pub to: Address,
    #[builder(into)]
    pub data: Bytes,
    #[builder(default)]
    pub tx_fee: U256,
    #[builder(default)]
    pub gas_price: U256,
    #[builder(default = U256::from(DEFAULT_GAS_LIMIT))]
    pub gas_limit: U256,
    pub nonce: U256,
    pub relay_hub: Address,
    pub relay_address: Address,
}

impl StructHashInput {
    /// The exact preimage that gets hashed.
    #[must_use]
    pub fn packed(&self) -> Vec<u8> {
        self.packer().into_bytes()
    }

    #[must_use]
    pub fn struct_hash(&self) -> B256 {
        self.packer().hash()
    }

    fn packer(&self) -> Packer<stage::Complete> {
        Packer::new(self.data.len())
            .from(self.from)
            .to(self.to)
            .data(&self.data)
            .fees(self.tx_fee, self.gas_price, self.gas_limit)
            .nonce(self.nonce)
            .relay_hub(self.relay_hub)
            .relay(self.relay_address)
    }
}

impl From<&StructHashInput> for SignatureParams {
    fn from(input: &StructHashInput) -> Self {
        Self {
            gas_price: input.gas_price,
            gas_limit: input.gas_limit,
            relayer_fee: input.tx_fee,
            relay_hub: input.relay_hub,
            relay: input.relay_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::FixedBytes;
    use alloy::sol_types::SolValue as _;

    use super::*;

    fn fixed_vector() -> StructHashInput {
        StructHashInput::builder()
            .from(Address::with_last_byte(1))
            .to(Address::with_last_byte(2))
            .data(Bytes::new())
            .nonce(U256::from(1))
            .relay_hub(Address::with_last_byte(3))
            .relay_address(Address::with_last_byte(4))
            .build()
    }

    #[test]
    fn fixed_vector_should_pack_to_212_bytes() {
        let packed = fixed_vector().packed();

        assert_eq!(packed.len(), 212);
        assert_eq!(&packed[..4], b"rlx:");
        assert_eq!(packed[23], 1, "from ends the first address");
        assert_eq!(packed[43], 2, "to ends the second address");

        let gas_limit = &packed[44 + 64..44 + 96];
        assert_eq!(U256::from_be_slice(gas_limit), U256::from(500_000));
        assert_eq!(packed[44 + 127], 1, "nonce is the fourth word");
        assert_eq!(packed[191], 3);
        assert_eq!(packed[211], 4);
    }

    #[test]
    fn packing_matches_solidity_encode_packed() {
        let input = StructHashInput::builder()
            .from(Address::repeat_byte(0x11))
            .to(Address::repeat_byte(0x22))
            .data(vec![0xde, 0xad, 0xbe, 0xef])
            .tx_fee(U256::from(7))
            .gas_price(U256::from(30_000_000_000_u64))
            .nonce(U256::from(42))
            .relay_hub(Address::repeat_byte(0x33))
            .relay_address(Address::repeat_byte(0x44))
            .build();

        let expected = (
            FixedBytes::<4>::from(*STRUCT_HASH_PREFIX),
            input.from,
            input.to,
            input.data.clone(),
            input.tx_fee,
            input.gas_price,
            input.gas_limit,
            input.nonce,
            input.relay_hub,
            input.relay_address,
        )
            .abi_encode_packed();

        assert_eq!(input.packed(), expected);
        assert_eq!(input.struct_hash(), keccak256(&expected));
    }

    #[test]
    fn struct_hash_is_deterministic() {
        assert_eq!(fixed_vector().struct_hash(), fixed_vector().struct_hash());
    }

    #[test]
    fn changing_any_field_changes_hash() {
        let base = fixed_vector();
        let original = base.struct_hash();

        let variants = [
            StructHashInput {
                from: Address::with_last_byte(9),
                ..base.clone()
            },
            StructHashInput {
                to: Address::with_last_byte(9),
                ..base.clone()
            },
            StructHashInput {
                data: Bytes::from_static(&[0]),
                ..base.clone()
            },
            StructHashInput {
                tx_fee: U256::from(1),
                ..base.clone()
            },
            StructHashInput {
                gas_price: U256::from(1),
                ..base.clone()
            },
            StructHashInput {
                gas_limit: U256::from(500_001),
                ..base.clone()
            },
            StructHashInput {
                nonce: U256::from(2),
                ..base.clone()
            },
            StructHashInput {
                relay_hub: Address::with_last_byte(9),
                ..base.clone()
            },
            StructHashInput {
                relay_address: Address::with_last_byte(9),
                ..base.clone()
            },
        ];

        for variant in variants {
            assert_ne!(variant.struct_hash(), original, "{variant:?}");
        }
    }

    #[test]
    fn signature_params_mirror_hash_inputs() {
        let input = fixed_vector();
        let params = SignatureParams::from(&input);

        assert_eq!(params.gas_limit, U256::from(DEFAULT_GAS_LIMIT));
        assert_eq!(params.gas_price, U256::ZERO);
        assert_eq!(params.relayer_fee, U256::ZERO);
        assert_eq!(params.relay_hub, input.relay_hub);
        assert_eq!(params.relay, input.relay_address);
    }
}
