use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use alloy::signers::Signer;
use backoff::backoff::Backoff as _;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use bon::Builder;
use chrono::Utc;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use url::Url;

use crate::auth::builder::{Builder as BuilderAuth, Config as BuilderConfig};
use crate::error::{Error, InvalidSignature, Kind, Status};
use crate::relayer::encode::{CallEncoder, ProxyCall};
use crate::relayer::signing::{ProxyWalletStrategy, UnsignedRelayRequest, WalletSigningStrategy};
use crate::relayer::tracker::TransactionTracker;
use crate::relayer::types::{
    Market, NonceResponse, Operation, RelayContext, RelayPayloadRequest, RelayTransaction,
    RelayTransactionHandle, SignedRelayRequest, SubmitResponse, TransactionLookup,
    TransactionRequest, WalletIdentity,
};
use crate::types::Address;
use crate::{ContractConfig, Result, ToQueryParams as _};

/// Production relayer.
pub const DEFAULT_HOST: &str = "https://relayer-v2.polymarket.com";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Configuration for [`Client`]
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct Config {
    /// Delay between two status polls in [`TransactionTracker::wait`]
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
    /// How long [`TransactionTracker::wait`] observes a transaction before giving up
    #[builder(default = DEFAULT_POLL_TIMEOUT)]
    pub poll_timeout: Duration,
    /// Retry policy for reads. Submissions are never retried.
    #[builder(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

/// Exponential backoff for idempotent relayer reads that fail with [`Kind::Network`].
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    #[builder(default = DEFAULT_INITIAL_BACKOFF)]
    pub initial_backoff: Duration,
    #[builder(default = DEFAULT_MAX_BACKOFF)]
    pub max_backoff: Duration,
    #[builder(default = DEFAULT_BACKOFF_MULTIPLIER)]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::builder().build()
    }
}

impl From<&RetryConfig> for ExponentialBackoff {
    fn from(config: &RetryConfig) -> Self {
        ExponentialBackoffBuilder::default()
            .with_initial_interval(config.initial_backoff)
            .with_max_interval(config.max_backoff)
            .with_multiplier(config.backoff_multiplier)
            .with_max_elapsed_time(None) // attempts are bounded by `max_attempts`
            .build()
    }
}

/// Client for the Polymarket relayer.
///
/// Submits signed proxy-wallet requests and reads their status. Cloning is cheap and
/// clones share the per-wallet submission locks, so one [`Client`] should be shared by
/// everything that submits for the same wallets.
///
/// A lock is created the first time an EOA submits and lives as long as the client, so a
/// client suits a bounded set of accounts rather than an unbounded stream of fresh ones.
///
/// ```no_run
/// use std::str::FromStr as _;
///
/// use alloy::signers::Signer as _;
/// use alloy::signers::local::LocalSigner;
/// use polymarket_relayer_client::auth::Credentials;
/// use polymarket_relayer_client::auth::builder::Config as BuilderConfig;
/// use polymarket_relayer_client::relayer::types::{Market, WalletIdentity};
/// use polymarket_relayer_client::relayer::{Client, Config, DEFAULT_HOST};
/// use polymarket_relayer_client::types::U256;
/// use polymarket_relayer_client::{POLYGON, contract_config};
///
/// # async fn example(credentials: Credentials) -> Result<(), Box<dyn std::error::Error>> {
/// let signer = LocalSigner::from_str("0x...")?.with_chain_id(Some(POLYGON));
/// let contracts = *contract_config(POLYGON).expect("built-in network");
///
/// let client = Client::new(
///     DEFAULT_HOST,
///     contracts,
///     BuilderConfig::local(credentials),
///     Config::default(),
/// )?;
///
/// let identity = WalletIdentity::derived(signer.address(), POLYGON)?;
/// let market = Market::parse("0x7f...", false)?;
///
/// let handle = client
///     .wallet(&signer, identity)
///     .split(&market, U256::from(1_000_000))
///     .await?;
/// let state = client.tracker(handle).wait().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: Config,
    /// The [`Url`] against which `client` is making requests.
    host: Url,
    /// The inner [`ReqwestClient`] used to make requests to `host`.
    client: ReqwestClient,
    /// Generates the builder headers required on `/submit`
    builder: BuilderAuth,
    contracts: ContractConfig,
    /// One lock per EOA, held from context fetch to submission. Entries are never evicted.
    wallet_locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl Client {
    pub fn new(
        host: &str,
        contracts: ContractConfig,
        builder: BuilderConfig,
        config: Config,
    ) -> Result<Client> {
        let mut headers = HeaderMap::new();

        headers.insert("User-Agent", HeaderValue::from_static("rs_relayer_client"));
        headers.insert("Accept", HeaderValue::from_static("*/*"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = ReqwestClient::builder().default_headers(headers).build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                host: Url::parse(host)?,
                builder: BuilderAuth::new(builder, client.clone()),
                client,
                contracts,
                wallet_locks: DashMap::new(),
            }),
        })
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.inner.host
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn contracts(&self) -> &ContractConfig {
        &self.inner.contracts
    }

    /// A [`CallEncoder`] for this client's contracts.
    #[must_use]
    pub fn encoder(&self) -> CallEncoder {
        CallEncoder::new(self.inner.contracts)
    }

    /// Fetches the nonce and relay address the next request from `eoa` must be signed with.
    ///
    /// Retried on network errors.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(eoa = %eoa))
    )]
    pub async fn fetch_context(&self, eoa: Address) -> Result<RelayContext> {
        let params = RelayPayloadRequest::builder()
            .address(eoa)
            .build()
            .query_params();
        let url = format!("{}relay-payload{params}", self.host());

        let context: RelayContext = self.with_retry(|| self.get(&url)).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(nonce = %context.nonce, relay = %context.relay_address, "fetched relay context");

        Ok(context)
    }

    /// Fetches only the current nonce for `eoa`.
    ///
    /// Retried on network errors.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(eoa = %eoa))
    )]
    pub async fn fetch_nonce(&self, eoa: Address) -> Result<U256> {
        let params = RelayPayloadRequest::builder()
            .address(eoa)
            .build()
            .query_params();
        let url = format!("{}nonce{params}", self.host());

        let response: NonceResponse = self.with_retry(|| self.get(&url)).await?;

        Ok(response.nonce)
    }

    /// Submits a signed request with builder headers.
    ///
    /// The returned handle only acknowledges receipt. Use [`Client::tracker`] to learn the
    /// outcome. This call is never retried: after a [`Kind::Network`] error, look the
    /// transaction up before submitting again.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(
            from = %request.from,
            nonce = %request.nonce,
            operation = %request.metadata
        ))
    )]
    pub async fn submit(&self, request: &SignedRelayRequest) -> Result<RelayTransactionHandle> {
        let http_request = self
            .inner
            .client
            .request(Method::POST, format!("{}submit", self.host()))
            .json(request)
            .build()?;
        let headers = self
            .inner
            .builder
            .create_headers(&http_request, Utc::now().timestamp())
            .await?;

        let response: SubmitResponse =
            crate::request(&self.inner.client, http_request, Some(headers))
                .await
                .map_err(|e| classify_submit_error(e, request))?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            transaction_id = %response.transaction_id,
            state = ?response.state,
            "relayer accepted submission"
        );

        Ok(response.into())
    }

    /// Looks up a transaction by relayer ID. `None` if the relayer does not know it (yet).
    ///
    /// Retried on network errors.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self))
    )]
    pub async fn transaction(&self, transaction_id: &str) -> Result<Option<RelayTransaction>> {
        let params = TransactionRequest::builder()
            .id(transaction_id)
            .build()
            .query_params();
        let url = format!("{}transaction{params}", self.host());

        let lookup: TransactionLookup = self.with_retry(|| self.get(&url)).await?;

        Ok(lookup.into_first())
    }

    /// Starts tracking a submitted transaction.
    #[must_use]
    pub fn tracker(&self, handle: RelayTransactionHandle) -> TransactionTracker {
        TransactionTracker::new(self.clone(), handle)
    }

    /// A signing session for `identity` with the proxy wallet strategy.
    #[must_use]
    pub fn wallet<'wallet, S: Signer + Sync>(
        &'wallet self,
        signer: &'wallet S,
        identity: WalletIdentity,
    ) -> Wallet<'wallet, S> {
        self.wallet_with_strategy(signer, identity, ProxyWalletStrategy)
    }

    #[must_use]
    pub fn wallet_with_strategy<'wallet, S: Signer + Sync, W: WalletSigningStrategy>(
        &'wallet self,
        signer: &'wallet S,
        identity: WalletIdentity,
        strategy: W,
    ) -> Wallet<'wallet, S, W> {
        Wallet {
            client: self,
            signer,
            identity,
            strategy,
        }
    }

    fn wallet_lock(&self, eoa: Address) -> Arc<Mutex<()>> {
        Arc::clone(self.inner.wallet_locks.entry(eoa).or_default().value())
    }

    async fn get<Response: DeserializeOwned>(&self, url: &str) -> Result<Response> {
        let request = self.inner.client.request(Method::GET, url).build()?;

        crate::request(&self.inner.client, request, None).await
    }

    async fn with_retry<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let retry = &self.inner.config.retry;
        let mut backoff: ExponentialBackoff = retry.into();
        let mut attempt = 1_u32;

        loop {
            match operation().await {
                Err(e) if e.kind() == Kind::Network && attempt < retry.max_attempts => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e);
                    };

                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, ?delay, error = %e, "retrying relayer read");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;

                    attempt = attempt.saturating_add(1);
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

/// A 400 that mentions the signature means the request was signed over the wrong bytes.
fn classify_submit_error(error: Error, request: &SignedRelayRequest) -> Error {
    let Some(status) = error.downcast_ref::<Status>() else {
        return error;
    };
    if status.status_code != StatusCode::BAD_REQUEST
        || !status.message.to_lowercase().contains("signature")
    {
        return error;
    }

    let input = request.struct_hash_input();

    InvalidSignature {
        from: input.from,
        to: input.to,
        nonce: input.nonce,
        relay_hub: input.relay_hub,
        relay_address: input.relay_address,
        struct_hash: input.struct_hash(),
        message: status.message.clone(),
    }
    .into()
}

/// Submits operations for one wallet with one signer.
///
/// Every submission holds the wallet's lock from context fetch to submission, so
/// concurrent operations for the same EOA sign with distinct nonces.
#[derive(Debug)]
pub struct Wallet<'wallet, S: Signer + Sync, W: WalletSigningStrategy = ProxyWalletStrategy> {
    client: &'wallet Client,
    signer: &'wallet S,
    identity: WalletIdentity,
    strategy: W,
}

impl<S: Signer + Sync, W: WalletSigningStrategy> Wallet<'_, S, W> {
    #[must_use]
    pub fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    /// Signs `calls` as one aggregated request and submits it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, calls), fields(
            eoa = %self.identity.eoa,
            calls = calls.len()
        ))
    )]
    pub async fn execute(
        &self,
        calls: Vec<ProxyCall>,
        operation: Operation,
    ) -> Result<RelayTransactionHandle> {
        let lock = self.client.wallet_lock(self.identity.eoa);
        let _guard = lock.lock().await;

        let context = self.client.fetch_context(self.identity.eoa).await?;
        let request = UnsignedRelayRequest::builder()
            .identity(self.identity)
            .contracts(self.client.inner.contracts)
            .context(context)
            .calls(calls)
            .operation(operation)
            .build();

        let signed = self.strategy.sign_request(self.signer, request).await?;

        self.client.submit(&signed).await
    }

    /// Approves the split target for collateral and splits `amount` into YES and NO.
    pub async fn split(&self, market: &Market, amount: U256) -> Result<RelayTransactionHandle> {
        let calls = self.client.encoder().split_calls(market, amount)?;
        self.execute(calls, Operation::Split).await
    }

    /// Merges `amount` of YES and NO back into collateral.
    pub async fn merge(&self, market: &Market, amount: U256) -> Result<RelayTransactionHandle> {
        let calls = self.client.encoder().merge_calls(market, amount)?;
        self.execute(calls, Operation::Merge).await
    }

    /// Redeems all positions in a resolved market.
    pub async fn redeem(&self, market: &Market) -> Result<RelayTransactionHandle> {
        let calls = self.client.encoder().redeem_calls(market)?;
        self.execute(calls, Operation::Redeem).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use alloy::primitives::B256;
    use alloy::signers::local::PrivateKeySigner;

    use super::*;
    use crate::auth::Credentials;
    use crate::{POLYGON, contract_config};

    fn client() -> Client {
        let contracts = *contract_config(POLYGON).expect("built-in network");

        Client::new(
            "http://localhost/",
            contracts,
            BuilderConfig::local(Credentials::default()),
            Config::default(),
        )
        .expect("valid host")
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn config_defaults() {
        let config = Config::default();

        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.poll_timeout, Duration::from_secs(120));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(250));
    }

    #[test]
    fn backoff_stays_within_max() {
        let retry = RetryConfig::builder()
            .initial_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(200))
            .build();
        let mut backoff: ExponentialBackoff = (&retry).into();

        for _ in 0..10 {
            let delay = backoff.next_backoff().expect("no elapsed time limit");
            // default randomization factor is 0.5
            assert!(delay <= Duration::from_millis(300), "{delay:?}");
        }
    }

    #[test]
    fn wallet_locks_should_be_per_eoa_and_shared_by_clones() {
        let client = client();
        let clone = client.clone();
        let eoa = Address::repeat_byte(1);

        let lock = client.wallet_lock(eoa);

        assert!(Arc::ptr_eq(&lock, &client.wallet_lock(eoa)));
        assert!(Arc::ptr_eq(&lock, &clone.wallet_lock(eoa)));
        assert!(!Arc::ptr_eq(&lock, &client.wallet_lock(Address::repeat_byte(2))));
        assert_eq!(client.inner.wallet_locks.len(), 2);
    }

    #[test]
    fn wallet_operations_should_be_send() {
        let client = client();
        let signer = PrivateKeySigner::from_str(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .expect("valid key");
        let identity = WalletIdentity::derived(signer.address(), POLYGON).expect("known chain");
        let wallet = client.wallet(&signer, identity);
        let market = Market::binary(B256::repeat_byte(0x7f), false);

        assert_send(&wallet.split(&market, U256::from(1)));
        assert_send(&wallet.redeem(&market));
    }
}
