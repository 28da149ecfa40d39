use alloy::primitives::{B256, U256};
use bon::Builder;
use serde::Deserialize;
use serde_with::serde_as;
use strum_macros::Display;

use crate::serde_helpers::{U256FromAny, empty_string_as_none};
use crate::types::{Address, DateTime, Utc};

/// Nonce and relay address to sign the next request against.
///
/// Single-use: fetch a fresh one for every submission.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Builder)]
pub struct RelayContext {
    #[serde(rename = "address")]
    pub relay_address: Address,
    #[serde_as(as = "U256FromAny")]
    pub nonce: U256,
}

#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NonceResponse {
    #[serde_as(as = "U256FromAny")]
    pub nonce: U256,
}

/// Lifecycle of a relayed transaction.
///
/// `New`, `Executed` and `Mined` are transient. `Confirmed`, `Failed` and `Invalid`
/// are terminal and mutually exclusive.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display)]
pub enum TransactionState {
    #[serde(rename = "STATE_NEW")]
    #[strum(serialize = "STATE_NEW")]
    New,
    #[serde(rename = "STATE_EXECUTED")]
    #[strum(serialize = "STATE_EXECUTED")]
    Executed,
    #[serde(rename = "STATE_MINED")]
    #[strum(serialize = "STATE_MINED")]
    Mined,
    #[serde(rename = "STATE_CONFIRMED")]
    #[strum(serialize = "STATE_CONFIRMED")]
    Confirmed,
    #[serde(rename = "STATE_FAILED")]
    #[strum(serialize = "STATE_FAILED")]
    Failed,
    #[serde(rename = "STATE_INVALID")]
    #[strum(serialize = "STATE_INVALID")]
    Invalid,
}

impl TransactionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::Invalid)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::Invalid)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Executed => 1,
            Self::Mined => 2,
            Self::Confirmed | Self::Failed | Self::Invalid => 3,
        }
    }

    /// Whether moving from `self` to `next` is a legal (forward or unchanged) step.
    ///
    /// Steps may be skipped. A terminal state only ever "moves" to itself.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return self as u8 == next as u8;
        }
        next.rank() >= self.rank()
    }
}

/// Acknowledgement of `POST /submit`. Not a success signal on its own.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(alias = "transactionID", alias = "id")]
    pub transaction_id: String,
    #[serde(default)]
    pub state: Option<TransactionState>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub transaction_hash: Option<B256>,
}

/// A relayer transaction as reported by `GET /transaction`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct RelayTransaction {
    #[serde(default, alias = "transactionID")]
    #[builder(into)]
    pub transaction_id: Option<String>,
    pub state: TransactionState,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub proxy_address: Option<Address>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `GET /transaction` answers with a list, though single objects are tolerated.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransactionLookup {
    Many(Vec<RelayTransaction>),
    One(Box<RelayTransaction>),
}

impl TransactionLookup {
    #[must_use]
    pub fn into_first(self) -> Option<RelayTransaction> {
        match self {
            Self::Many(transactions) => transactions.into_iter().next(),
            Self::One(transaction) => Some(*transaction),
        }
    }
}

/// Local record of a submitted transaction.
///
/// Only [`crate::relayer::TransactionTracker`] advances `state`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(on(String, into))]
pub struct RelayTransactionHandle {
    pub transaction_id: String,
    #[builder(default = TransactionState::New)]
    pub state: TransactionState,
    pub transaction_hash: Option<B256>,
}

impl RelayTransactionHandle {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }
}

impl From<SubmitResponse> for RelayTransactionHandle {
    fn from(response: SubmitResponse) -> Self {
        Self {
            transaction_id: response.transaction_id,
            state: response.state.unwrap_or(TransactionState::New),
            transaction_hash: response.transaction_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::address;

    #[test]
    fn relay_context_should_deserialize() {
        let context: RelayContext = serde_json::from_value(json!({
            "address": "0xa7be1729f709955d7e0081cf07806e9f806dae26",
            "nonce": "31"
        }))
        .expect("deserialize");

        assert_eq!(
            context.relay_address,
            address!("0xa7be1729f709955d7e0081cf07806e9f806dae26")
        );
        assert_eq!(context.nonce, U256::from(31));
    }

    #[test]
    fn submit_response_accepts_id_spellings() {
        for key in ["transactionID", "transactionId", "id"] {
            let response: SubmitResponse = serde_json::from_value(json!({
                key: "0190b317-a1d3-7bec-9b91-eeb6dcd3a620",
                "state": "STATE_NEW",
                "transactionHash": ""
            }))
            .expect("deserialize");

            let handle = RelayTransactionHandle::from(response);
            assert_eq!(handle.transaction_id, "0190b317-a1d3-7bec-9b91-eeb6dcd3a620");
            assert_eq!(handle.state, TransactionState::New);
            assert_eq!(handle.transaction_hash, None);
        }
    }

    #[test]
    fn submit_response_without_state_defaults_to_new() {
        let response: SubmitResponse =
            serde_json::from_value(json!({ "transactionID": "abc" })).expect("deserialize");

        assert_eq!(
            RelayTransactionHandle::from(response).state,
            TransactionState::New
        );
    }

    #[test]
    fn transaction_lookup_takes_first_of_list() {
        let lookup: TransactionLookup = serde_json::from_value(json!([
            {
                "transactionID": "abc",
                "state": "STATE_MINED",
                "transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa"
            }
        ]))
        .expect("deserialize");

        let transaction = lookup.into_first().expect("one transaction");
        assert_eq!(transaction.state, TransactionState::Mined);
        assert!(transaction.transaction_hash.is_some(), "hash is parsed");

        let empty: TransactionLookup = serde_json::from_value(json!([])).expect("deserialize");
        assert!(empty.into_first().is_none(), "empty list has no transaction");
    }

    #[test]
    fn transaction_lookup_accepts_single_object() {
        let lookup: TransactionLookup = serde_json::from_value(json!({
            "state": "STATE_CONFIRMED",
            "transactionHash": null
        }))
        .expect("deserialize");

        assert_eq!(
            lookup.into_first().map(|t| t.state),
            Some(TransactionState::Confirmed)
        );
    }

    #[test]
    fn states_are_classified() {
        use TransactionState::{Confirmed, Executed, Failed, Invalid, Mined, New};

        for state in [New, Executed, Mined] {
            assert!(!state.is_terminal(), "{state} is transient");
        }
        for state in [Confirmed, Failed, Invalid] {
            assert!(state.is_terminal(), "{state} is terminal");
        }
        assert!(Confirmed.is_success(), "confirmed succeeds");
        assert!(!Mined.is_success(), "mined is not yet final");
        assert!(Failed.is_failed() && Invalid.is_failed(), "failures");
    }

    #[test]
    fn transitions_never_regress() {
        use TransactionState::{Confirmed, Executed, Failed, Invalid, Mined, New};

        assert!(New.can_transition_to(New), "unchanged");
        assert!(New.can_transition_to(Mined), "skip ahead");
        assert!(Mined.can_transition_to(Failed), "mined can still fail");
        assert!(Executed.can_transition_to(Invalid), "executed can be invalidated");

        assert!(!Mined.can_transition_to(Executed), "backwards");
        assert!(!Confirmed.can_transition_to(Mined), "terminal to transient");
        assert!(!Confirmed.can_transition_to(Failed), "terminal to other terminal");
        assert!(Confirmed.can_transition_to(Confirmed), "terminal is stable");
    }
}
