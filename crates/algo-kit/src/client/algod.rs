//! HTTP transport to an algod node.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Method;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::{AlgodError, is_retryable_status};
use crate::types::{PendingTransactionResponse, SuggestedParams, TxId};

/// Rounds a transaction built from [`AlgodClient::suggested_params`] stays
/// valid for.
const DEFAULT_VALIDITY_WINDOW: u64 = 1000;

/// Network configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Base URL of the algod REST API.
    pub algod_url: &'static str,
    /// Value for the `X-Algo-API-Token` header.
    pub token: &'static str,
    pub genesis_id: &'static str,
}

/// Mainnet configuration.
pub const MAINNET: NetworkConfig = NetworkConfig {
    algod_url: "https://mainnet-api.algonode.cloud",
    token: "",
    genesis_id: "mainnet-v1.0",
};

/// Testnet configuration.
pub const TESTNET: NetworkConfig = NetworkConfig {
    algod_url: "https://testnet-api.algonode.cloud",
    token: "",
    genesis_id: "testnet-v1.0",
};

/// Betanet configuration.
pub const BETANET: NetworkConfig = NetworkConfig {
    algod_url: "https://betanet-api.algonode.cloud",
    token: "",
    genesis_id: "betanet-v1.0",
};

/// A local development network with the default sandbox token.
pub const LOCALNET: NetworkConfig = NetworkConfig {
    algod_url: "http://localhost:4001",
    token: "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
    genesis_id: "dockernet-v1",
};

/// Retry configuration for node requests.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt + 1`.
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(
            self.initial_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms),
        )
    }
}

// ============================================================================
// Transport contract
// ============================================================================

/// Boxed future returned by [`AlgodTransport`] methods.
pub type AlgodFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AlgodError>> + Send + 'a>>;

/// Node status as reported by `/v2/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeStatus {
    pub last_round: u64,
    #[serde(default)]
    pub time_since_last_round: u64,
    #[serde(default)]
    pub catchup_time: u64,
    #[serde(default)]
    pub last_version: String,
}

/// The node operations the composer and confirmation logic depend on.
///
/// [`AlgodClient`] implements this over HTTP; tests can substitute an
/// in-memory node.
pub trait AlgodTransport: Send + Sync {
    /// Submit a group of signed transactions; returns the first one's id.
    fn send_raw_transactions<'a>(&'a self, signed: &'a [Vec<u8>]) -> AlgodFuture<'a, TxId>;

    /// Pool or ledger information about a submitted transaction.
    fn pending_transaction_information<'a>(
        &'a self,
        tx_id: &'a TxId,
    ) -> AlgodFuture<'a, PendingTransactionResponse>;

    fn status(&self) -> AlgodFuture<'_, NodeStatus>;

    /// Resolves once the node has seen a block after `round`.
    fn status_after_block(&self, round: u64) -> AlgodFuture<'_, NodeStatus>;
}

impl<T: AlgodTransport + ?Sized> AlgodTransport for std::sync::Arc<T> {
    fn send_raw_transactions<'a>(&'a self, signed: &'a [Vec<u8>]) -> AlgodFuture<'a, TxId> {
        (**self).send_raw_transactions(signed)
    }

    fn pending_transaction_information<'a>(
        &'a self,
        tx_id: &'a TxId,
    ) -> AlgodFuture<'a, PendingTransactionResponse> {
        (**self).pending_transaction_information(tx_id)
    }

    fn status(&self) -> AlgodFuture<'_, NodeStatus> {
        (**self).status()
    }

    fn status_after_block(&self, round: u64) -> AlgodFuture<'_, NodeStatus> {
        (**self).status_after_block(round)
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Deserialize)]
struct SendResponse {
    #[serde(rename = "txId")]
    tx_id: TxId,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TransactionParamsResponse {
    fee: u64,
    genesis_hash: String,
    genesis_id: String,
    last_round: u64,
    min_fee: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// AlgodClient
// ============================================================================

/// REST client for algod with retries on transient failures.
pub struct AlgodClient {
    url: String,
    token: String,
    client: reqwest::Client,
    retry_config: RetryConfig,
}

impl AlgodClient {
    /// Create a client for the node at `url`.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_retry_config(url, token, RetryConfig::default())
    }

    /// Create a client with custom retry configuration.
    pub fn with_retry_config(
        url: impl Into<String>,
        token: impl Into<String>,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
            retry_config,
        }
    }

    pub fn from_network(network: &NetworkConfig) -> Self {
        Self::new(network.algod_url, network.token)
    }

    /// Configure from `ALGOD_SERVER`, `ALGOD_TOKEN` and `ALGOD_PORT`.
    ///
    /// Only `ALGOD_SERVER` is required; the port, when set, is appended to it.
    pub fn from_env() -> Result<Self, AlgodError> {
        let server = std::env::var("ALGOD_SERVER")
            .map_err(|_| AlgodError::Config("ALGOD_SERVER is not set".to_string()))?;
        let token = std::env::var("ALGOD_TOKEN").unwrap_or_default();
        let port = std::env::var("ALGOD_PORT").ok();
        Ok(Self::new(server_url(&server, port.as_deref()), token))
    }

    /// Get the node URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fee and validity parameters for a new transaction.
    pub async fn suggested_params(&self) -> Result<SuggestedParams, AlgodError> {
        let params: TransactionParamsResponse = self
            .request(Method::GET, "/v2/transactions/params", None)
            .await?;
        let genesis_hash: [u8; 32] = STANDARD
            .decode(&params.genesis_hash)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                AlgodError::InvalidResponse(format!(
                    "invalid genesis hash: {}",
                    params.genesis_hash
                ))
            })?;

        Ok(SuggestedParams::new(
            params.genesis_id,
            genesis_hash,
            params.last_round,
            params.last_round + DEFAULT_VALIDITY_WINDOW,
        )
        .fee_per_byte(params.fee)
        .min_fee(params.min_fee))
    }

    /// Make a request with retries.
    async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<R, AlgodError> {
        let total_attempts = self.retry_config.max_retries + 1;

        for attempt in 0..total_attempts {
            match self.try_request::<R>(method.clone(), path, body).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < total_attempts - 1 => {
                    let delay = self.retry_config.delay(attempt);
                    warn!(
                        path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "algod request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AlgodError::Timeout(total_attempts))
    }

    /// Single attempt at a request.
    async fn try_request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<R, AlgodError> {
        debug!(%method, path, "algod request");
        let mut request = self
            .client
            .request(method, format!("{}{}", self.url, path))
            .header("X-Algo-API-Token", &self.token);
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/x-binary")
                .body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            let code = status.as_u16();
            if is_retryable_status(code) {
                return Err(AlgodError::network(
                    format!("HTTP {}: {}", status, message),
                    Some(code),
                    true,
                ));
            }
            return Err(AlgodError::Api {
                status: code,
                message,
            });
        }

        serde_json::from_str(&text).map_err(AlgodError::Json)
    }
}

impl AlgodTransport for AlgodClient {
    fn send_raw_transactions<'a>(&'a self, signed: &'a [Vec<u8>]) -> AlgodFuture<'a, TxId> {
        Box::pin(async move {
            let body = signed.concat();
            let response: SendResponse = self
                .request(Method::POST, "/v2/transactions", Some(&body))
                .await?;
            Ok(response.tx_id)
        })
    }

    fn pending_transaction_information<'a>(
        &'a self,
        tx_id: &'a TxId,
    ) -> AlgodFuture<'a, PendingTransactionResponse> {
        Box::pin(async move {
            let path = format!("/v2/transactions/pending/{tx_id}?format=json");
            let json: serde_json::Value = self.request(Method::GET, &path, None).await?;
            Ok(PendingTransactionResponse::from_json(json)?)
        })
    }

    fn status(&self) -> AlgodFuture<'_, NodeStatus> {
        Box::pin(self.request(Method::GET, "/v2/status", None))
    }

    fn status_after_block(&self, round: u64) -> AlgodFuture<'_, NodeStatus> {
        Box::pin(async move {
            let path = format!("/v2/status/wait-for-block-after/{round}");
            self.request(Method::GET, &path, None).await
        })
    }
}

impl std::fmt::Debug for AlgodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgodClient")
            .field("url", &self.url)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

fn server_url(server: &str, port: Option<&str>) -> String {
    let server = server.trim_end_matches('/');
    match port.filter(|p| !p.is_empty()) {
        Some(port) => format!("{server}:{port}"),
        None => server.to_string(),
    }
}
