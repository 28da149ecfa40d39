use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use alloy::primitives::{Address, B256, U256};
use hmac::digest::InvalidLength;
/// HTTP method type, re-exported for use with error inspection.
pub use reqwest::Method;
/// HTTP status code type, re-exported for use with error inspection.
pub use reqwest::StatusCode;
use reqwest::header;

use crate::relayer::types::TransactionState;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error related to non-successful HTTP call
    Status,
    /// Error related to invalid state within polymarket-relayer-client
    Validation,
    /// The requested operation could not be encoded into calldata. Never retried.
    Encoding,
    /// The relayer rejected the request signature. Always a construction bug, never retried.
    InvalidSignature,
    /// Builder credentials or headers were refused by the relayer
    Unauthorized,
    /// Transport failure talking to the relayer. Safe to retry for reads only.
    Network,
    /// The relayer reported transaction states that contradict each other
    Inconsistency,
    /// Internal error from dependencies
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        Status {
            status_code,
            method,
            path,
            message: message.into(),
        }
        .into()
    }

    pub fn unauthorized<S: Into<String>>(status_code: StatusCode, path: String, message: S) -> Self {
        Unauthorized {
            status_code,
            path,
            message: message.into(),
        }
        .into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error({}) making {} call to {} with {}",
            self.status_code, self.method, self.path, self.message
        )
    }
}

impl StdError for Status {}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

/// Reasons an operation could not be turned into calldata.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Only markets with exactly two outcome slots can be split, merged or redeemed
    UnsupportedMarketShape { outcome_count: usize },
    /// Condition IDs are 32 bytes of hex, optionally `0x` prefixed
    MalformedConditionId { value: String },
    /// An aggregated proxy call needs at least one inner call
    EmptyCalls,
    /// Neg-risk positions are redeemed per outcome amount, which a binary redeem cannot express
    NegRiskRedemption,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedMarketShape { outcome_count } => write!(
                f,
                "unsupported market shape: {outcome_count} outcome slots, expected 2"
            ),
            Self::MalformedConditionId { value } => {
                write!(f, "malformed condition id: {value:?}")
            }
            Self::EmptyCalls => write!(f, "no calls to aggregate"),
            Self::NegRiskRedemption => write!(
                f,
                "neg-risk positions are redeemed through the neg-risk adapter by outcome amount, \
                 which a binary redeem cannot express"
            ),
        }
    }
}

impl StdError for Encoding {}

impl From<Encoding> for Error {
    fn from(err: Encoding) -> Self {
        Error::with_source(Kind::Encoding, err)
    }
}

/// The relayer refused the signature attached to a submission.
///
/// Carries every input of the struct hash so the mismatch can be diagnosed offline.
#[non_exhaustive]
#[derive(Debug)]
pub struct InvalidSignature {
    pub from: Address,
    pub to: Address,
    pub nonce: U256,
    pub relay_hub: Address,
    pub relay_address: Address,
    pub struct_hash: B256,
    pub message: String,
}

impl fmt::Display for InvalidSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relayer rejected signature over struct hash {} (from {}, to {}, nonce {}, relay hub {}, relay {}): {}",
            self.struct_hash,
            self.from,
            self.to,
            self.nonce,
            self.relay_hub,
            self.relay_address,
            self.message
        )
    }
}

impl StdError for InvalidSignature {}

impl From<InvalidSignature> for Error {
    fn from(err: InvalidSignature) -> Self {
        Error::with_source(Kind::InvalidSignature, err)
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Unauthorized {
    pub status_code: StatusCode,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Unauthorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unauthorized({}) calling {}: {}",
            self.status_code, self.path, self.message
        )
    }
}

impl StdError for Unauthorized {}

impl From<Unauthorized> for Error {
    fn from(err: Unauthorized) -> Self {
        Error::with_source(Kind::Unauthorized, err)
    }
}

/// A poll reported a state that moves backwards from what was already observed.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct StateRegression {
    pub transaction_id: String,
    pub previous: TransactionState,
    pub observed: TransactionState,
}

impl fmt::Display for StateRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transaction {} moved from {} back to {}",
            self.transaction_id, self.previous, self.observed
        )
    }
}

impl StdError for StateRegression {}

impl From<StateRegression> for Error {
    fn from(err: StateRegression) -> Self {
        Error::with_source(Kind::Inconsistency, err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_connect() || e.is_timeout() || e.is_request() {
            Kind::Network
        } else {
            Kind::Internal
        };
        Error::with_source(kind, e)
    }
}

impl From<header::InvalidHeaderValue> for Error {
    fn from(e: header::InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<InvalidLength> for Error {
    fn from(e: InvalidLength) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<alloy::signers::Error> for Error {
    fn from(e: alloy::signers::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<alloy::sol_types::Error> for Error {
    fn from(e: alloy::sol_types::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_display_should_succeed() {
        let err = Encoding::UnsupportedMarketShape { outcome_count: 3 };

        assert_eq!(
            err.to_string(),
            "unsupported market shape: 3 outcome slots, expected 2"
        );
    }

    #[test]
    fn neg_risk_redemption_should_name_the_adapter() {
        let error: Error = Encoding::NegRiskRedemption.into();

        assert_eq!(error.kind(), Kind::Encoding);
        assert!(error.to_string().contains("neg-risk adapter"), "{error}");
    }

    #[test]
    fn encoding_into_error_should_succeed() {
        let error: Error = Encoding::MalformedConditionId {
            value: "0x12".to_owned(),
        }
        .into();

        assert_eq!(error.kind(), Kind::Encoding);
        assert!(error.to_string().contains("0x12"), "{error}");
        assert!(error.downcast_ref::<Encoding>().is_some(), "source is kept");
    }

    #[test]
    fn regression_into_error_should_succeed() {
        let error: Error = StateRegression {
            transaction_id: "abc".to_owned(),
            previous: TransactionState::Confirmed,
            observed: TransactionState::Mined,
        }
        .into();

        assert_eq!(error.kind(), Kind::Inconsistency);
        assert_eq!(
            error.to_string(),
            "Inconsistency: transaction abc moved from STATE_CONFIRMED back to STATE_MINED"
        );
    }

    #[test]
    fn unauthorized_should_have_kind() {
        let error = Error::unauthorized(StatusCode::UNAUTHORIZED, "/submit".to_owned(), "nope");

        assert_eq!(error.kind(), Kind::Unauthorized);
        assert!(error.to_string().contains("/submit"), "{error}");
    }
}
