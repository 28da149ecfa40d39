//! Re-exported types from external crates for convenience.
//!
//! These types are commonly used in this SDK and are re-exported here
//! so users don't need to add these dependencies to their `Cargo.toml`.

/// Ethereum address type and the [`address!`] macro for compile-time address literals.
/// [`ChainId`] is a type alias for `u64` representing EVM chain IDs.
/// [`Signature`] represents the 65-byte signatures attached to relayed requests.
pub use alloy::primitives::{Address, ChainId, Signature, address};
/// Fixed and dynamic byte types used for condition IDs, hashes and calldata.
pub use alloy::primitives::{B256, Bytes, U256, b256};
/// Date and time types for timestamps in API responses.
pub use chrono::{DateTime, Utc};
