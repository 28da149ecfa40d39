//! Builder authentication for relayer submissions.
//!
//! The relayer only accepts `/submit` calls that carry the four `POLY_BUILDER_*` headers. They
//! are computed from local [`Credentials`] or requested from a remote signing service.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac as _};
use reqwest::Request;
use secrecy::ExposeSecret as _;
/// Secret string type that redacts its value in debug output.
pub use secrecy::SecretString;
use sha2::Sha256;
/// UUID type used for builder API keys.
pub use uuid::Uuid;

use crate::{Result, Timestamp};

/// Builder API key, secret and passphrase. `Debug` output never shows the secret values.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    key: Uuid,
    secret: SecretString,
    passphrase: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(key: Uuid, secret: String, passphrase: String) -> Self {
        Self {
            key,
            secret: SecretString::from(secret),
            passphrase: SecretString::from(passphrase),
        }
    }

    /// HMAC-SHA256 of `message` keyed with the base64url decoded secret, base64url encoded.
    fn sign(&self, message: &[u8]) -> Result<String> {
        let key = URL_SAFE.decode(self.secret.expose_secret())?;
        let mut mac = Hmac::<Sha256>::new_from_slice(&key)?;
        mac.update(message);

        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}

/// Timestamp, method and path followed by the body bytes exactly as they go on the wire.
fn signing_payload(request: &Request, timestamp: Timestamp) -> Vec<u8> {
    let mut payload =
        format!("{timestamp}{}{}", request.method(), request.url().path()).into_bytes();
    if let Some(body) = request.body().and_then(reqwest::Body::as_bytes) {
        payload.extend_from_slice(body);
    }

    payload
}

/// Builder header configuration and generation.
pub mod builder {
    use std::borrow::Cow;

    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::{Client, Request};
    use secrecy::ExposeSecret as _;
    use serde::{Deserialize, Serialize};
    /// URL type for remote signing service configuration.
    pub use url::Url;

    use super::{Credentials, signing_payload};
    use crate::{Result, Timestamp};

    pub const POLY_BUILDER_API_KEY: &str = "POLY_BUILDER_API_KEY";
    pub const POLY_BUILDER_PASSPHRASE: &str = "POLY_BUILDER_PASSPHRASE";
    pub const POLY_BUILDER_SIGNATURE: &str = "POLY_BUILDER_SIGNATURE";
    pub const POLY_BUILDER_TIMESTAMP: &str = "POLY_BUILDER_TIMESTAMP";

    /// Where builder headers come from. [`Config::local`] signs in process with
    /// [`Credentials`]; [`Config::remote`] asks a signing service that holds them.
    #[non_exhaustive]
    #[derive(Clone, Debug)]
    pub enum Config {
        Local(Credentials),
        Remote { host: Url, token: Option<String> },
    }

    impl Config {
        #[must_use]
        pub fn local(credentials: Credentials) -> Self {
            Config::Local(credentials)
        }

        /// `token` is sent as a bearer token to the signing service at `host`.
        pub fn remote(host: &str, token: Option<String>) -> Result<Self> {
            Ok(Config::Remote {
                host: Url::parse(host)?,
                token,
            })
        }
    }

    /// What a remote signing service is asked to sign.
    #[derive(Serialize)]
    struct SigningRequest<'req> {
        method: &'req str,
        path: &'req str,
        body: Cow<'req, str>,
        timestamp: Timestamp,
    }

    #[derive(Deserialize)]
    struct SignedHeaders {
        #[serde(rename = "POLY_BUILDER_API_KEY")]
        api_key: String,
        #[serde(rename = "POLY_BUILDER_PASSPHRASE")]
        passphrase: String,
        #[serde(rename = "POLY_BUILDER_SIGNATURE")]
        signature: String,
        #[serde(rename = "POLY_BUILDER_TIMESTAMP")]
        timestamp: String,
    }

    /// Produces builder headers for outgoing submissions.
    #[non_exhaustive]
    #[derive(Clone, Debug)]
    pub struct Builder {
        config: Config,
        client: Client,
    }

    impl Builder {
        /// `client` is only used to reach a remote signing service.
        #[must_use]
        pub fn new(config: Config, client: Client) -> Self {
            Self { config, client }
        }

        /// Returns the four `POLY_BUILDER_*` headers for `request`, signed at `timestamp`.
        pub async fn create_headers(
            &self,
            request: &Request,
            timestamp: Timestamp,
        ) -> Result<HeaderMap> {
            match &self.config {
                Config::Local(credentials) => local_headers(credentials, request, timestamp),
                Config::Remote { host, token } => {
                    self.remote_headers(host, token.as_deref(), request, timestamp)
                        .await
                }
            }
        }

        async fn remote_headers(
            &self,
            host: &Url,
            token: Option<&str>,
            request: &Request,
            timestamp: Timestamp,
        ) -> Result<HeaderMap> {
            let body = request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .map(String::from_utf8_lossy)
                .unwrap_or_default();

            let mut call = self.client.post(host.clone()).json(&SigningRequest {
                method: request.method().as_str(),
                path: request.url().path(),
                body,
                timestamp,
            });
            if let Some(token) = token {
                call = call.bearer_auth(token);
            }

            let signed: SignedHeaders = call.send().await?.error_for_status()?.json().await?;

            header_map([
                (POLY_BUILDER_API_KEY, signed.api_key),
                (POLY_BUILDER_PASSPHRASE, signed.passphrase),
                (POLY_BUILDER_SIGNATURE, signed.signature),
                (POLY_BUILDER_TIMESTAMP, signed.timestamp),
            ])
        }
    }

    fn local_headers(
        credentials: &Credentials,
        request: &Request,
        timestamp: Timestamp,
    ) -> Result<HeaderMap> {
        let signature = credentials.sign(&signing_payload(request, timestamp))?;

        header_map([
            (POLY_BUILDER_API_KEY, credentials.key.to_string()),
            (
                POLY_BUILDER_PASSPHRASE,
                credentials.passphrase.expose_secret().to_owned(),
            ),
            (POLY_BUILDER_SIGNATURE, signature),
            (POLY_BUILDER_TIMESTAMP, timestamp.to_string()),
        ])
    }

    fn header_map(entries: [(&'static str, String); 4]) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(entries.len());
        for (name, value) in entries {
            let mut value = HeaderValue::try_from(value)?;
            value.set_sensitive(name == POLY_BUILDER_PASSPHRASE);
            map.insert(name, value);
        }

        Ok(map)
    }
}
