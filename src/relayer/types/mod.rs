//! Request and response types for the relayer API.

mod request;
mod response;

pub use request::{
    Market, Operation, RelayPayloadRequest, SignatureParams, SignedRelayRequest,
    TransactionRequest, WalletIdentity, WalletType, parse_condition_id,
};
pub use response::{
    NonceResponse, RelayContext, RelayTransaction, RelayTransactionHandle, SubmitResponse,
    TransactionLookup, TransactionState,
};
