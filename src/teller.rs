//! Teller API client
//!
//! Low-level access to the external banking provider. Authenticates with a
//! mutual-TLS client certificate plus a basic-auth token, uses a fixed 10s
//! timeout, and never retries: a failed call surfaces immediately so the
//! caller can map it to a user-facing apology.

use crate::error::{AssistantError, Result};
use crate::models::{Account, RawBalance, Transaction};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::error;

const DEFAULT_BASE_URL: &str = "https://api.teller.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only operations the external banking provider exposes. The
/// gateway and the tests depend on this seam, not on the HTTP client.
#[async_trait]
pub trait BankingProvider: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;
    async fn balance(&self, account_id: &str) -> Result<RawBalance>;
    async fn transactions(&self, account_id: &str, count: usize) -> Result<Vec<Transaction>>;
}

/// Credentials and certificate material for the Teller API.
pub struct TellerConfig {
    pub token: String,
    pub cert_file: String,
    pub key_file: String,
}

impl TellerConfig {
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TELLER_TOKEN")
            .map_err(|_| AssistantError::Config("TELLER_TOKEN not set".to_string()))?;
        let cert_file = std::env::var("TELLER_CERT")
            .map_err(|_| AssistantError::Config("TELLER_CERT not set".to_string()))?;
        let key_file = std::env::var("TELLER_KEY")
            .map_err(|_| AssistantError::Config("TELLER_KEY not set".to_string()))?;

        Ok(Self {
            token,
            cert_file,
            key_file,
        })
    }
}

/// Connection-pooled Teller client.
pub struct TellerClient {
    client: Client,
    token: String,
    base_url: String,
}

impl TellerClient {
    pub fn new(config: TellerConfig) -> Result<Self> {
        let cert = std::fs::read(&config.cert_file).map_err(|e| {
            AssistantError::Config(format!("cert file missing: {}: {}", config.cert_file, e))
        })?;
        let key = std::fs::read(&config.key_file).map_err(|e| {
            AssistantError::Config(format!("key file missing: {}: {}", config.key_file, e))
        })?;

        let mut pem = cert;
        pem.extend_from_slice(&key);
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| AssistantError::Config(format!("invalid client certificate: {}", e)))?;

        let client = Client::builder()
            .identity(identity)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            token: config.token,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.token, Some(""))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("Teller request to {} failed: {}", path, e);
                AssistantError::Upstream(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Teller returned {} for {}", status, path);
            return Err(AssistantError::Upstream(format!(
                "{} returned status {}",
                path, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AssistantError::Upstream(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl BankingProvider for TellerClient {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let body = self.get_json("/accounts", &[]).await?;
        Ok(parse_accounts(&body))
    }

    async fn balance(&self, account_id: &str) -> Result<RawBalance> {
        let body = self
            .get_json(&format!("/accounts/{}/balances", account_id), &[])
            .await?;
        Ok(parse_balance(&body))
    }

    async fn transactions(&self, account_id: &str, count: usize) -> Result<Vec<Transaction>> {
        let body = self
            .get_json(
                &format!("/accounts/{}/transactions", account_id),
                &[("count", count.to_string())],
            )
            .await?;
        Ok(parse_transactions(&body))
    }
}

// Teller serializes monetary amounts as JSON strings ("102.33"); accept
// plain numbers too and fall back to zero for anything else.
fn amount_of(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_accounts(body: &Value) -> Vec<Account> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let id = item.get("id")?.as_str()?.to_string();
                    Some(Account {
                        id,
                        name: item
                            .get("name")
                            .and_then(|n| n.as_str())
                            .map(|n| n.to_string()),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_balance(body: &Value) -> RawBalance {
    RawBalance {
        available: body.get("available").map(amount_of).unwrap_or(0.0),
        ledger: body.get("ledger").map(amount_of).unwrap_or(0.0),
    }
}

fn parse_transactions(body: &Value) -> Vec<Transaction> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| Transaction {
                    description: item
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or("")
                        .to_string(),
                    amount: item.get("amount").map(amount_of).unwrap_or(0.0),
                    date: item
                        .get("date")
                        .and_then(|d| d.as_str())
                        .unwrap_or("")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
