//! Gasless proxy-wallet transactions through the Polymarket relayer.
//!
//! A wallet whose key cannot send raw transactions (for example one held in a KMS) signs a
//! relay request instead, and the relayer pays the gas to execute it through the wallet's
//! proxy contract. Submitting an operation is:
//!
//! 1. encode the calls with [`encode::CallEncoder`] and aggregate them into `proxy(...)`
//! 2. fetch the nonce and relay address with [`Client::fetch_context`]
//! 3. pack and hash the request ([`hash::StructHashInput`]) and sign it `personal_sign` style
//! 4. submit it with builder headers ([`Client::submit`])
//! 5. follow it with a [`TransactionTracker`] until it is terminal
//!
//! [`Wallet`] runs steps 1 to 4 under a per-wallet lock.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/relay-payload?address={eoa}&type=PROXY` | nonce and relay address |
//! | GET | `/nonce?address={eoa}&type=PROXY` | nonce only |
//! | POST | `/submit` | submit a signed request (builder headers required) |
//! | GET | `/transaction?id={transactionId}` | transaction status |

pub mod client;
pub mod encode;
pub mod hash;
pub mod signing;
pub mod tracker;
pub mod types;

pub use client::{Client, Config, DEFAULT_HOST, RetryConfig, Wallet};
pub use encode::{CallEncoder, EncodedCall, ProxyCall, encode_aggregate};
pub use hash::StructHashInput;
pub use signing::{ProxyWalletStrategy, WalletSigningStrategy, sign_struct_hash};
pub use tracker::TransactionTracker;
