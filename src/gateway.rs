//! Banking Data Gateway
//!
//! Composes the external banking provider with the simulated-payment ledger:
//! balances come back already adjusted for simulated payments, payees are
//! derived heuristically from transaction descriptions, and payment
//! execution runs the funds checks before appending to the ledger.

use crate::error::{AssistantError, Result};
use crate::ledger::PaymentLedger;
use crate::models::{Account, BalanceInfo, PaymentReceipt, PaymentRecord, Transaction};
use crate::teller::BankingProvider;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// How many transactions to scan when deriving the payee directory.
const PAYEE_SCAN_COUNT: usize = 50;

/// Generic descriptions that never name a payee.
const GENERIC_DESCRIPTIONS: &[&str] = &["", "Payment", "Transfer"];

/// Prefix noise stripped from transaction descriptions before extraction.
const NOISE_TOKENS: &[&str] = &["POS ", "ATM ", "DEBIT ", "CREDIT ", "PURCHASE ", "PAYMENT "];

pub struct BankingGateway {
    provider: Arc<dyn BankingProvider>,
    ledger: Arc<PaymentLedger>,
}

impl BankingGateway {
    pub fn new(provider: Arc<dyn BankingProvider>, ledger: Arc<PaymentLedger>) -> Self {
        Self { provider, ledger }
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.provider.list_accounts().await
    }

    /// First account in provider order, or `None` when the list is empty.
    pub async fn default_account(&self) -> Result<Option<Account>> {
        let accounts = self.provider.list_accounts().await?;
        Ok(accounts.into_iter().next())
    }

    /// Real balance from the provider plus the ledger-adjusted available
    /// figure.
    pub async fn balance(&self, account_id: &str) -> Result<BalanceInfo> {
        let raw = self.provider.balance(account_id).await?;
        let available = self.ledger.adjusted_balance(raw.available).await;

        Ok(BalanceInfo {
            real_available: raw.available,
            available,
            ledger: raw.ledger,
        })
    }

    pub async fn transactions(&self, account_id: &str, count: usize) -> Result<Vec<Transaction>> {
        self.provider.transactions(account_id, count).await
    }

    /// Payee directory derived from recent transaction descriptions.
    /// Best-effort and UI-facing only: any failure is swallowed and an
    /// empty directory returned.
    pub async fn payees(&self) -> Vec<String> {
        match self.collect_payees().await {
            Ok(payees) => payees,
            Err(e) => {
                warn!("Could not derive payees from transactions: {}", e);
                Vec::new()
            }
        }
    }

    async fn collect_payees(&self) -> Result<Vec<String>> {
        let Some(account) = self.default_account().await? else {
            return Ok(Vec::new());
        };

        let transactions = self
            .provider
            .transactions(&account.id, PAYEE_SCAN_COUNT)
            .await?;

        let mut payees = BTreeSet::new();
        for transaction in &transactions {
            let description = transaction.description.trim();
            if GENERIC_DESCRIPTIONS.contains(&description) {
                continue;
            }
            let name = extract_payee_name(description);
            if !name.is_empty() {
                payees.insert(name);
            }
        }

        Ok(payees.into_iter().collect())
    }

    /// Execute a simulated payment. Resolves the account, runs the real
    /// and adjusted funds checks in that order, appends a completed record
    /// to the ledger, and returns the receipt. Unexpected failures are
    /// reported as a generic payment failure carrying the cause.
    pub async fn make_payment(
        &self,
        payee: &str,
        amount: f64,
        account_id: Option<&str>,
    ) -> Result<PaymentReceipt> {
        match self.execute_payment(payee, amount, account_id).await {
            Ok(receipt) => Ok(receipt),
            Err(
                e @ (AssistantError::NoAccount
                | AssistantError::InvalidAmount
                | AssistantError::InsufficientRealFunds { .. }
                | AssistantError::InsufficientAvailableFunds { .. }),
            ) => Err(e),
            Err(other) => Err(AssistantError::PaymentFailed(other.to_string())),
        }
    }

    async fn execute_payment(
        &self,
        payee: &str,
        amount: f64,
        account_id: Option<&str>,
    ) -> Result<PaymentReceipt> {
        // A non-positive amount would pass both funds checks and push the
        // adjusted balance above the real one.
        if amount <= 0.0 {
            return Err(AssistantError::InvalidAmount);
        }

        let account_id = match account_id {
            Some(id) => id.to_string(),
            None => self
                .default_account()
                .await?
                .ok_or(AssistantError::NoAccount)?
                .id,
        };

        let balance = self.balance(&account_id).await?;
        info!(
            "Processing payment: ${:.2} to {} (balance ${:.2})",
            amount, payee, balance.available
        );

        // The real-funds check always fires first; the adjusted check is
        // strictly tighter.
        if amount > balance.real_available {
            return Err(AssistantError::InsufficientRealFunds {
                available: balance.real_available,
            });
        }
        if amount > balance.available {
            return Err(AssistantError::InsufficientAvailableFunds {
                available: balance.available,
            });
        }

        let now = chrono::Utc::now();
        let record = PaymentRecord {
            id: format!("sim_pay_{}", now.timestamp()),
            payee: payee.to_string(),
            amount,
            date: now.to_rfc3339(),
            status: "completed".to_string(),
            account_id,
            description: format!("Payment to {}", payee),
        };

        // A flush failure must not block the success response; the record
        // is already visible in memory.
        if let Err(e) = self.ledger.append(record).await {
            warn!("Could not persist payment record: {}", e);
        }

        Ok(PaymentReceipt {
            message: format!(
                "Payment of ${:.2} to {} completed successfully!",
                amount, payee
            ),
            new_balance: balance.available - amount,
            amount_paid: amount,
            payee: payee.to_string(),
        })
    }
}

/// Extract a short display name from a transaction description: strip the
/// known noise prefixes, drop tokens carrying digits or shorter than three
/// characters, and join the first three survivors. Falls back to the first
/// 20 characters of the stripped description.
pub fn extract_payee_name(description: &str) -> String {
    let mut stripped = description.to_string();
    for noise in NOISE_TOKENS {
        stripped = stripped.replace(noise, "");
    }

    let clean_parts: Vec<&str> = stripped
        .split_whitespace()
        .filter(|part| !part.chars().any(|c| c.is_ascii_digit()) && part.chars().count() > 2)
        .collect();

    if !clean_parts.is_empty() {
        clean_parts[..clean_parts.len().min(3)].join(" ")
    } else {
        stripped.chars().take(20).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawBalance;
    use async_trait::async_trait;

    struct MockProvider {
        accounts: Vec<Account>,
        available: f64,
        transactions: Vec<Transaction>,
    }

    impl MockProvider {
        fn with_balance(available: f64) -> Self {
            Self {
                accounts: vec![Account {
                    id: "acc_1".to_string(),
                    name: Some("Checking".to_string()),
                }],
                available,
                transactions: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BankingProvider for MockProvider {
        async fn list_accounts(&self) -> Result<Vec<Account>> {
            Ok(self.accounts.clone())
        }

        async fn balance(&self, _account_id: &str) -> Result<RawBalance> {
            Ok(RawBalance {
                available: self.available,
                ledger: self.available,
            })
        }

        async fn transactions(&self, _account_id: &str, _count: usize) -> Result<Vec<Transaction>> {
            Ok(self.transactions.clone())
        }
    }

    fn tx(description: &str) -> Transaction {
        Transaction {
            description: description.to_string(),
            amount: -10.0,
            date: "2024-02-01".to_string(),
        }
    }

    async fn gateway_with(provider: MockProvider) -> (BankingGateway, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(PaymentLedger::open(dir.path().join("payments.json")).await);
        (BankingGateway::new(Arc::new(provider), ledger), dir)
    }

    #[test]
    fn test_extract_payee_name_strips_noise_and_digits() {
        assert_eq!(extract_payee_name("POS Starbucks Coffee #1234"), "Starbucks Coffee");
        assert_eq!(extract_payee_name("DEBIT John Smith Transfer 99"), "John Smith Transfer");
        // Tokens of two characters or fewer are dropped
        assert_eq!(extract_payee_name("ATM My Grocery Store"), "Grocery Store");
    }

    #[test]
    fn test_extract_payee_name_joins_first_three_tokens() {
        assert_eq!(
            extract_payee_name("Alpha Beta Gamma Delta"),
            "Alpha Beta Gamma"
        );
    }

    #[test]
    fn test_extract_payee_name_fallback_truncates() {
        // Every token has digits, so the stripped description is truncated.
        assert_eq!(extract_payee_name("A1 B2 C3"), "A1 B2 C3");
        let long = "X1 ".repeat(20);
        assert_eq!(extract_payee_name(&long).chars().count(), 20);
    }

    #[tokio::test]
    async fn test_payees_sorted_and_deduped() {
        let mut provider = MockProvider::with_balance(100.0);
        provider.transactions = vec![
            tx("POS Zeta Market"),
            tx("Alpha Cafe"),
            tx("POS Zeta Market"),
            tx("Transfer"),
            tx("Payment"),
            tx(""),
        ];
        let (gateway, _dir) = gateway_with(provider).await;

        let payees = gateway.payees().await;
        assert_eq!(payees, vec!["Alpha Cafe", "Zeta Market"]);
    }

    #[tokio::test]
    async fn test_payees_empty_without_accounts() {
        let provider = MockProvider {
            accounts: Vec::new(),
            available: 0.0,
            transactions: Vec::new(),
        };
        let (gateway, _dir) = gateway_with(provider).await;
        assert!(gateway.payees().await.is_empty());
    }

    #[tokio::test]
    async fn test_balance_is_ledger_adjusted() {
        let (gateway, _dir) = gateway_with(MockProvider::with_balance(500.0)).await;

        gateway.make_payment("Alpha Cafe", 120.0, None).await.unwrap();

        let balance = gateway.balance("acc_1").await.unwrap();
        assert_eq!(balance.real_available, 500.0);
        assert_eq!(balance.available, 380.0);
    }

    #[tokio::test]
    async fn test_payment_rejected_on_real_funds() {
        let (gateway, _dir) = gateway_with(MockProvider::with_balance(50.0)).await;

        let err = gateway.make_payment("Alpha Cafe", 80.0, None).await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::InsufficientRealFunds { available } if available == 50.0
        ));
        assert_eq!(gateway.ledger().record_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let (gateway, _dir) = gateway_with(MockProvider::with_balance(100.0)).await;

        let err = gateway.make_payment("Alpha Cafe", -50.0, None).await.unwrap_err();
        assert!(matches!(err, AssistantError::InvalidAmount));
        let err = gateway.make_payment("Alpha Cafe", 0.0, None).await.unwrap_err();
        assert!(matches!(err, AssistantError::InvalidAmount));

        // No record landed, so the adjusted balance cannot exceed the
        // real one.
        assert_eq!(gateway.ledger().record_count().await, 0);
        let balance = gateway.balance("acc_1").await.unwrap();
        assert_eq!(balance.available, balance.real_available);
    }

    #[tokio::test]
    async fn test_payment_rejected_on_available_funds() {
        let (gateway, _dir) = gateway_with(MockProvider::with_balance(100.0)).await;

        // First payment drains the adjusted balance below the real one.
        gateway.make_payment("Alpha Cafe", 70.0, None).await.unwrap();

        // Real balance still covers 50, but the adjusted balance is 30.
        let err = gateway.make_payment("Alpha Cafe", 50.0, None).await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::InsufficientAvailableFunds { available } if available == 30.0
        ));
    }

    #[tokio::test]
    async fn test_payment_receipt_new_balance() {
        let (gateway, _dir) = gateway_with(MockProvider::with_balance(200.0)).await;

        let receipt = gateway.make_payment("Alpha Cafe", 25.0, None).await.unwrap();
        assert_eq!(receipt.new_balance, 175.0);
        assert_eq!(receipt.amount_paid, 25.0);
        assert_eq!(receipt.payee, "Alpha Cafe");
        assert!(receipt.message.contains("$25.00"));

        let records = gateway.ledger().history(5).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "completed");
        assert_eq!(records[0].account_id, "acc_1");
        assert!(records[0].id.starts_with("sim_pay_"));
    }

    #[tokio::test]
    async fn test_payment_without_account_fails() {
        let provider = MockProvider {
            accounts: Vec::new(),
            available: 0.0,
            transactions: Vec::new(),
        };
        let (gateway, _dir) = gateway_with(provider).await;

        let err = gateway.make_payment("Alpha Cafe", 10.0, None).await.unwrap_err();
        assert!(matches!(err, AssistantError::NoAccount));
    }
}
