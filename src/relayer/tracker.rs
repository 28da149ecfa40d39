use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::error::{Error, Kind, StateRegression, Status};
use crate::relayer::client::Client;
use crate::relayer::types::{RelayTransaction, RelayTransactionHandle, TransactionState};

/// Follows a submitted transaction until it reaches a terminal state.
///
/// The handle only ever moves forward along `NEW → EXECUTED → MINED → terminal`. A poll
/// that reports an earlier state, or a different terminal state, fails with
/// [`Kind::Inconsistency`] and leaves the handle as it was.
#[derive(Debug)]
pub struct TransactionTracker {
    client: Client,
    handle: RelayTransactionHandle,
}

impl TransactionTracker {
    #[must_use]
    pub fn new(client: Client, handle: RelayTransactionHandle) -> Self {
        Self { client, handle }
    }

    #[must_use]
    pub fn handle(&self) -> &RelayTransactionHandle {
        &self.handle
    }

    #[must_use]
    pub fn into_handle(self) -> RelayTransactionHandle {
        self.handle
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.handle.state
    }

    /// Reads the relayer status once and applies it to the handle.
    ///
    /// A transaction the relayer does not list yet keeps its current state.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self), fields(
            transaction_id = %self.handle.transaction_id
        ))
    )]
    pub async fn poll_once(&mut self) -> Result<TransactionState> {
        if let Some(transaction) = self.client.transaction(&self.handle.transaction_id).await? {
            self.observe(transaction)?;
        }

        Ok(self.handle.state)
    }

    /// Polls every `poll_interval` until the state is terminal or `timeout` elapses.
    ///
    /// Timing out is not an error: the last observed state is returned and the
    /// transaction may still complete on chain. Network errors, 5xx answers and a 404
    /// for a transaction that is not indexed yet are logged and polling goes on.
    pub async fn await_terminal(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TransactionState> {
        self.await_terminal_with_cancel(poll_interval, timeout, &CancellationToken::new())
            .await
    }

    /// [`TransactionTracker::await_terminal`] that also stops when `cancel` fires.
    ///
    /// Cancelling only stops local observation and returns the last observed state.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, cancel), fields(
            transaction_id = %self.handle.transaction_id
        ))
    )]
    pub async fn await_terminal_with_cancel(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TransactionState> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| Error::validation(format!("timeout {timeout:?} is too large")))?;

        while !self.handle.is_terminal() {
            let polled = tokio::select! {
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(state = %self.handle.state, "stopped observing transaction");
                    return Ok(self.handle.state);
                }
                polled = timeout_at(deadline, self.poll_once()) => polled,
            };

            match polled {
                Err(_elapsed) => break,
                Ok(Ok(_)) => {}
                Ok(Err(e)) if is_transient(&e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "transaction poll failed");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                }
                Ok(Err(e)) => return Err(e),
            }

            if self.handle.is_terminal() {
                break;
            }

            let wake = Instant::now()
                .checked_add(poll_interval)
                .filter(|wake| *wake < deadline);
            let Some(wake) = wake else {
                break;
            };

            tokio::select! {
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(state = %self.handle.state, "stopped observing transaction");
                    return Ok(self.handle.state);
                }
                () = sleep_until(wake) => {}
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            state = %self.handle.state,
            terminal = self.handle.is_terminal(),
            hash = ?self.handle.transaction_hash,
            "stopped polling transaction"
        );

        Ok(self.handle.state)
    }

    /// [`TransactionTracker::await_terminal`] with the client's configured interval and timeout.
    pub async fn wait(&mut self) -> Result<TransactionState> {
        let config = self.client.config();
        let (poll_interval, timeout) = (config.poll_interval, config.poll_timeout);

        self.await_terminal(poll_interval, timeout).await
    }

    fn observe(&mut self, transaction: RelayTransaction) -> Result<()> {
        let previous = self.handle.state;
        let observed = transaction.state;

        if !previous.can_transition_to(observed) {
            #[cfg(feature = "tracing")]
            tracing::error!(%previous, %observed, "relayer reported a state regression");

            return Err(StateRegression {
                transaction_id: self.handle.transaction_id.clone(),
                previous,
                observed,
            }
            .into());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%previous, %observed, "observed transaction state");

        self.handle.state = observed;
        if transaction.transaction_hash.is_some() {
            self.handle.transaction_hash = transaction.transaction_hash;
        }

        Ok(())
    }
}

/// Errors a status poll can recover from on a later attempt.
fn is_transient(error: &Error) -> bool {
    match error.kind() {
        Kind::Network => true,
        Kind::Status => error.downcast_ref::<Status>().is_some_and(|status| {
            status.status_code.is_server_error() || status.status_code == StatusCode::NOT_FOUND
        }),
        _ => false,
    }
}
