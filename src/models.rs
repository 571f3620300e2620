//! Core data models for the banking assistant

use serde::{Deserialize, Serialize};

//
// ================= Provider Data (read-only) =================
//

/// A bank account as reported by the external provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Raw balance figures straight from the provider, unmodified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawBalance {
    pub available: f64,
    pub ledger: f64,
}

/// Balance view returned to callers: the provider figure plus the
/// ledger-adjusted available amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub real_available: f64,
    pub available: f64,
    pub ledger: f64,
}

/// A transaction as reported by the external provider. Ordering is
/// whatever the provider returned; never re-sorted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub description: String,
    pub amount: f64,
    pub date: String,
}

//
// ================= Simulated Payments =================
//

/// An immutable record of one simulated payment. Created only by a
/// successful payment execution; never mutated or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub payee: String,
    pub amount: f64,
    pub date: String,
    pub status: String,
    pub account_id: String,
    pub description: String,
}

/// Result of a successful payment execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub message: String,
    pub new_balance: f64,
    pub amount_paid: f64,
    pub payee: String,
}

//
// ================= Chat Reply =================
//

/// Per-item transaction view embedded in a chat reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub description: String,
    pub amount: f64,
    pub formatted_amount: String,
}

/// Per-item payment view embedded in a chat reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentView {
    pub payee: String,
    pub amount: f64,
    pub date: String,
}

/// The single response shape produced by `Assistant::process`.
///
/// `response` and `payment_mode` are always present; everything else is
/// populated only by the intent handler that owns it and omitted from the
/// JSON body otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub payment_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<PaymentView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_expenses: Option<usize>,
}

impl ChatReply {
    /// Plain text reply outside of payment mode.
    pub fn text(response: impl Into<String>, intent: Option<&str>) -> Self {
        Self {
            response: response.into(),
            intent: intent.map(|s| s.to_string()),
            payment_mode: false,
            next_step: None,
            payment_success: None,
            new_balance: None,
            balance: None,
            real_balance: None,
            transactions: None,
            payees: None,
            payments: None,
            total_spent: None,
            num_expenses: None,
        }
    }

    /// Reply that keeps the conversation inside the payment flow.
    pub fn in_flow(response: impl Into<String>, next_step: &str) -> Self {
        let mut reply = Self::text(response, None);
        reply.payment_mode = true;
        reply.next_step = Some(next_step.to_string());
        reply
    }
}
