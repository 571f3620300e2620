//! Intent Classifier
//!
//! Maps free-text user input to a closed set of intent labels via
//! case-insensitive substring matching against ordered keyword groups.
//! The group order is a hard contract: the first matching group wins,
//! and several downstream behaviors depend on the exact precedence.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    CancelPayment,
    GoBack,
    Help,
    Greeting,
    CheckBalance,
    ViewTransactions,
    SpendingSummary,
    ViewPayees,
    MakePayment,
    PaymentHistory,
    Farewell,
    GeneralInquiry,
    Unknown,
    Error,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CancelPayment => "CANCEL_PAYMENT",
            Intent::GoBack => "GO_BACK",
            Intent::Help => "HELP",
            Intent::Greeting => "GREETING",
            Intent::CheckBalance => "CHECK_BALANCE",
            Intent::ViewTransactions => "VIEW_TRANSACTIONS",
            Intent::SpendingSummary => "SPENDING_SUMMARY",
            Intent::ViewPayees => "VIEW_PAYEES",
            Intent::MakePayment => "MAKE_PAYMENT",
            Intent::PaymentHistory => "PAYMENT_HISTORY",
            Intent::Farewell => "FAREWELL",
            Intent::GeneralInquiry => "GENERAL_INQUIRY",
            Intent::Unknown => "UNKNOWN",
            Intent::Error => "ERROR",
        }
    }

    /// True for the intents that break out of an in-progress payment flow.
    pub fn is_flow_escape(&self) -> bool {
        matches!(self, Intent::CancelPayment | Intent::GoBack | Intent::Help)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static keyword lists — zero allocation

// Payment exit commands get highest priority so users can always escape
// the payment flow.
const CANCEL_KEYWORDS: &[&str] = &[
    "cancel", "stop", "nevermind", "not now", "exit payment", "don't pay",
];

const GO_BACK_KEYWORDS: &[&str] = &[
    "go back", "main menu", "start over", "different", "something else",
];

const HELP_KEYWORDS: &[&str] = &["what can you do", "options", "menu"];

const GREETING_KEYWORDS: &[&str] = &["hello", "hi", "hey", "good morning"];

const BALANCE_KEYWORDS: &[&str] = &["balance", "how much", "money"];

const TRANSACTION_KEYWORDS: &[&str] = &["transaction", "history", "payments", "recent"];

const SPENDING_KEYWORDS: &[&str] = &["spent", "spending"];

const PAYEE_KEYWORDS: &[&str] = &[
    "payee", "payees", "who i pay", "merchants", "user list", "pay list", "list of payees",
];

const PAYMENT_KEYWORDS: &[&str] = &["pay", "send money", "transfer", "make payment"];

// Known precedence conflict: every phrase here is claimed by an earlier
// group — "payment history" by the greeting group ("hi" inside "history"),
// the rest by the transaction group ("payments", "recent") — so this label
// is never produced by classify(). Kept as-is; payment history remains
// reachable through the /api/payments endpoint.
const PAYMENT_HISTORY_KEYWORDS: &[&str] = &["payment history", "my payments", "recent payments"];

const FAREWELL_KEYWORDS: &[&str] = &["bye", "goodbye", "exit", "quit"];

/// Classify user input. First matching keyword group wins.
pub fn classify(text: &str) -> Intent {
    if text.is_empty() {
        return Intent::Unknown;
    }
    let text = text.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|kw| text.contains(kw));

    if matches(CANCEL_KEYWORDS) {
        return Intent::CancelPayment;
    }
    if matches(GO_BACK_KEYWORDS) {
        return Intent::GoBack;
    }
    if matches(HELP_KEYWORDS) {
        return Intent::Help;
    }
    if matches(GREETING_KEYWORDS) {
        return Intent::Greeting;
    }
    if matches(BALANCE_KEYWORDS) {
        return Intent::CheckBalance;
    }
    if matches(TRANSACTION_KEYWORDS) {
        return Intent::ViewTransactions;
    }
    if matches(SPENDING_KEYWORDS) {
        return Intent::SpendingSummary;
    }
    if matches(PAYEE_KEYWORDS) {
        return Intent::ViewPayees;
    }
    if matches(PAYMENT_KEYWORDS) {
        return Intent::MakePayment;
    }
    if matches(PAYMENT_HISTORY_KEYWORDS) {
        return Intent::PaymentHistory;
    }
    if text.contains("help") {
        return Intent::Help;
    }
    if matches(FAREWELL_KEYWORDS) {
        return Intent::Farewell;
    }
    Intent::GeneralInquiry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(classify(""), Intent::Unknown);
    }

    #[test]
    fn test_basic_intents() {
        assert_eq!(classify("hello there"), Intent::Greeting);
        assert_eq!(classify("what's my balance?"), Intent::CheckBalance);
        assert_eq!(classify("How Much do I have"), Intent::CheckBalance);
        assert_eq!(classify("show transactions"), Intent::ViewTransactions);
        assert_eq!(classify("what have I spent"), Intent::SpendingSummary);
        assert_eq!(classify("who are my payees"), Intent::ViewPayees);
        assert_eq!(classify("transfer to john"), Intent::MakePayment);
        assert_eq!(classify("help"), Intent::Help);
        assert_eq!(classify("goodbye"), Intent::Farewell);
        assert_eq!(classify("tell me a joke"), Intent::GeneralInquiry);
    }

    #[test]
    fn test_escape_intents_win_over_everything() {
        assert_eq!(classify("cancel the payment"), Intent::CancelPayment);
        assert_eq!(classify("stop, don't pay"), Intent::CancelPayment);
        assert_eq!(classify("go back to my balance"), Intent::GoBack);
        assert_eq!(classify("what can you do"), Intent::Help);
        // "something else" beats the payment keyword in "pay"
        assert_eq!(classify("pay something else"), Intent::GoBack);
    }

    #[test]
    fn test_payment_history_group_is_shadowed() {
        // "recent payments" hits the transaction group first; this exact
        // precedence is load-bearing behavior.
        assert_eq!(classify("show my recent payments"), Intent::ViewTransactions);
        assert_eq!(classify("my payments"), Intent::ViewTransactions);
        // "history" contains "hi", so the greeting group claims this one
        // before the transaction group ever sees it.
        assert_eq!(classify("payment history"), Intent::Greeting);
    }

    #[test]
    fn test_balance_beats_transactions() {
        assert_eq!(classify("how much money did I spend"), Intent::CheckBalance);
    }

    #[test]
    fn test_pay_substring() {
        // Substring matching: "pay" inside larger words still triggers.
        assert_eq!(classify("i want to pay rent"), Intent::MakePayment);
    }
}
