//! Banking assistant core
//!
//! Owns the session store and routes each inbound message: a session
//! mid-payment hands the turn to the payment flow, everything else is
//! classified and dispatched to a read-only response builder. This module
//! is also the outermost error boundary — `process` never fails, it maps
//! any internal error to a fixed apology.

use crate::classifier::{classify, Intent};
use crate::error::Result;
use crate::flow;
use crate::gateway::BankingGateway;
use crate::gemini::ResponseEnhancer;
use crate::models::{ChatReply, PaymentView, TransactionView};
use crate::session::{Session, SessionStore};
use std::sync::Arc;
use tracing::{error, info};

pub(crate) const HELP_TEXT: &str = "I can: check your balance, show transactions, list payees, \
    make payments, or show payment history. What would you like to do?";

const FALLBACK_TEXT: &str = "I can help you check balances, view transactions, list payees, \
    make payments, or show payment history. What would you like to do?";

const ERROR_TEXT: &str =
    "Sorry, I'm having trouble accessing your banking information right now.";

pub struct BankingAssistant {
    gateway: Arc<BankingGateway>,
    sessions: SessionStore,
    enhancer: ResponseEnhancer,
}

impl BankingAssistant {
    pub fn new(gateway: Arc<BankingGateway>, enhancer: ResponseEnhancer) -> Self {
        Self {
            gateway,
            sessions: SessionStore::new(),
            enhancer,
        }
    }

    pub fn gateway(&self) -> &BankingGateway {
        &self.gateway
    }

    /// Process one user message. Infallible: any internal failure is
    /// logged and converted to the fixed apology with `intent = ERROR`.
    pub async fn process(&self, user_id: &str, message: &str) -> ChatReply {
        match self.process_inner(user_id, message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Message processing failed for {}: {}", user_id, e);
                ChatReply::text(ERROR_TEXT, Some(Intent::Error.as_str()))
            }
        }
    }

    async fn process_inner(&self, user_id: &str, message: &str) -> Result<ChatReply> {
        // Eviction is opportunistic, a side effect of traffic.
        self.sessions.sweep_if_crowded().await;

        let session = self.sessions.get_or_create(user_id).await;
        let mut session = session.lock().await;
        session.touch();

        if session.payment_mode {
            return flow::handle_payment_turn(&self.gateway, &mut session, message).await;
        }

        let intent = classify(message);
        info!("Intent for {}: {}", user_id, intent);

        match intent {
            Intent::Greeting => {
                let context = self.banking_context().await;
                let natural = self.enhancer.enhance(message, &context).await;
                Ok(ChatReply::text(
                    natural.unwrap_or_else(|| {
                        "Hello! I can help with balances, transactions, payees, payments, \
                         and payment history. How can I assist you?"
                            .to_string()
                    }),
                    Some(intent.as_str()),
                ))
            }

            Intent::Farewell => {
                drop(session);
                self.sessions.remove(user_id).await;
                Ok(ChatReply::text(
                    "Goodbye! Have a great day!",
                    Some(intent.as_str()),
                ))
            }

            Intent::Help => Ok(ChatReply::text(HELP_TEXT, Some(intent.as_str()))),

            Intent::CheckBalance => self.handle_check_balance(message).await,

            Intent::ViewTransactions => self.handle_view_transactions().await,

            Intent::SpendingSummary => self.handle_spending_summary().await,

            Intent::ViewPayees => self.handle_view_payees().await,

            Intent::MakePayment => self.handle_make_payment(&mut session).await,

            Intent::PaymentHistory => self.handle_payment_history().await,

            // CANCEL_PAYMENT / GO_BACK outside a flow carry no special
            // meaning; treat them like any general inquiry.
            _ => {
                let context = self.banking_context().await;
                let natural = self.enhancer.enhance(message, &context).await;
                Ok(ChatReply::text(
                    natural.unwrap_or_else(|| FALLBACK_TEXT.to_string()),
                    Some(Intent::GeneralInquiry.as_str()),
                ))
            }
        }
    }

    /// Short context string for the enhancer. Best-effort only.
    async fn banking_context(&self) -> String {
        let account = match self.gateway.default_account().await {
            Ok(Some(account)) => account,
            _ => return String::new(),
        };
        match self.gateway.balance(&account.id).await {
            Ok(info) => format!("Balance: {:.2}", info.available),
            Err(_) => String::new(),
        }
    }

    async fn handle_check_balance(&self, message: &str) -> Result<ChatReply> {
        let intent = Intent::CheckBalance.as_str();
        let Some(account) = self.gateway.default_account().await? else {
            return Ok(ChatReply::text("I couldn't find any accounts.", Some(intent)));
        };

        let info = self.gateway.balance(&account.id).await?;
        let balance_line = format!("Your available balance is ${:.2}.", info.available);

        let context = format!("User's balance is {:.2}", info.available);
        let natural = self.enhancer.enhance(message, &context).await;
        let response = match natural {
            Some(text) if !text.to_lowercase().contains("balance") => {
                format!("{} {}", text, balance_line)
            }
            _ => balance_line,
        };

        let mut reply = ChatReply::text(response, Some(intent));
        reply.balance = Some(info.available);
        reply.real_balance = Some(info.real_available);
        Ok(reply)
    }

    async fn handle_view_transactions(&self) -> Result<ChatReply> {
        let intent = Intent::ViewTransactions.as_str();
        let Some(account) = self.gateway.default_account().await? else {
            return Ok(ChatReply::text("I couldn't find any accounts.", Some(intent)));
        };

        let transactions = self.gateway.transactions(&account.id, 5).await?;
        if transactions.is_empty() {
            return Ok(ChatReply::text(
                "You have no recent transactions.",
                Some(intent),
            ));
        }

        let mut response = String::from("Here are your recent transactions. ");
        let mut views = Vec::new();
        for (i, t) in transactions.iter().take(5).enumerate() {
            let formatted = if t.amount < 0.0 {
                format!("spent ${:.2}", t.amount.abs())
            } else {
                format!("received ${:.2}", t.amount)
            };
            response.push_str(&format!(
                "Transaction {}: {}, {}. ",
                i + 1,
                t.description,
                formatted
            ));
            views.push(TransactionView {
                description: t.description.clone(),
                amount: t.amount,
                formatted_amount: formatted,
            });
        }

        let mut reply = ChatReply::text(response, Some(intent));
        reply.transactions = Some(views);
        Ok(reply)
    }

    async fn handle_spending_summary(&self) -> Result<ChatReply> {
        let intent = Intent::SpendingSummary.as_str();
        let Some(account) = self.gateway.default_account().await? else {
            return Ok(ChatReply::text("I couldn't access your account.", Some(intent)));
        };

        let transactions = self.gateway.transactions(&account.id, 10).await?;

        let expenses: Vec<f64> = transactions
            .iter()
            .filter(|t| t.amount < 0.0)
            .map(|t| t.amount.abs())
            .collect();

        if expenses.is_empty() {
            return Ok(ChatReply::text(
                "You have no expenses in your recent transactions.",
                Some(intent),
            ));
        }

        let total_spent: f64 = expenses.iter().sum();
        let mut reply = ChatReply::text(
            format!(
                "You have spent a total of ${:.2} across {} transactions in your recent history.",
                total_spent,
                expenses.len()
            ),
            Some(intent),
        );
        reply.total_spent = Some(total_spent);
        reply.num_expenses = Some(expenses.len());
        Ok(reply)
    }

    async fn handle_view_payees(&self) -> Result<ChatReply> {
        let intent = Intent::ViewPayees.as_str();
        let payees = self.gateway.payees().await;
        if payees.is_empty() {
            return Ok(ChatReply::text(
                "I couldn't find any payees in your transaction history.",
                Some(intent),
            ));
        }

        let response = if payees.len() <= 5 {
            format!(
                "I found these payees: {}. You can say 'pay [payee name]' to make a payment.",
                payees.join(", ")
            )
        } else {
            format!(
                "I found {} payees including: {}, and more. You can say 'pay [payee name]' \
                 to make a payment.",
                payees.len(),
                payees[..5].join(", ")
            )
        };

        let mut reply = ChatReply::text(response, Some(intent));
        reply.payees = Some(payees);
        Ok(reply)
    }

    async fn handle_make_payment(&self, session: &mut Session) -> Result<ChatReply> {
        let intent = Intent::MakePayment.as_str();
        let payees = self.gateway.payees().await;
        if payees.is_empty() {
            return Ok(ChatReply::text(
                "I couldn't find any payees in your transaction history. \
                 Please add payees manually.",
                Some(intent),
            ));
        }

        session.payment_mode = true;
        let mut reply = ChatReply::in_flow(
            "I'll help you make a payment. Who would you like to pay? You can say a name \
             from your payee list. (Say 'cancel' anytime to stop)",
            "payee",
        );
        reply.intent = Some(intent.to_string());
        Ok(reply)
    }

    async fn handle_payment_history(&self) -> Result<ChatReply> {
        let intent = Intent::PaymentHistory.as_str();
        let payments = self.gateway.ledger().history(5).await;
        if payments.is_empty() {
            return Ok(ChatReply::text(
                "You haven't made any payments yet.",
                Some(intent),
            ));
        }

        let mut response = String::from("Here are your recent payments: ");
        let mut views = Vec::new();
        for (i, payment) in payments.iter().enumerate() {
            response.push_str(&format!(
                "Payment {}: ${:.2} to {}. ",
                i + 1,
                payment.amount,
                payment.payee
            ));
            views.push(PaymentView {
                payee: payment.payee.clone(),
                amount: payment.amount,
                date: payment.date.clone(),
            });
        }

        let mut reply = ChatReply::text(response, Some(intent));
        reply.payments = Some(views);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::ledger::PaymentLedger;
    use crate::models::{Account, RawBalance, Transaction};
    use crate::teller::BankingProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockProvider {
        available: f64,
        transactions: Vec<Transaction>,
        failing: AtomicBool,
    }

    impl MockProvider {
        fn new(available: f64) -> Self {
            Self {
                available,
                transactions: vec![
                    Transaction {
                        description: "DEBIT John Smith".to_string(),
                        amount: -12.0,
                        date: "2024-02-03".to_string(),
                    },
                    Transaction {
                        description: "POS Corner Bakery Cafe".to_string(),
                        amount: -4.5,
                        date: "2024-02-02".to_string(),
                    },
                    Transaction {
                        description: "Payroll Deposit Employer".to_string(),
                        amount: 1500.0,
                        date: "2024-02-01".to_string(),
                    },
                ],
                failing: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(AssistantError::Upstream("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl BankingProvider for MockProvider {
        async fn list_accounts(&self) -> Result<Vec<Account>> {
            self.check()?;
            Ok(vec![Account {
                id: "acc_1".to_string(),
                name: Some("Checking".to_string()),
            }])
        }

        async fn balance(&self, _account_id: &str) -> Result<RawBalance> {
            self.check()?;
            Ok(RawBalance {
                available: self.available,
                ledger: self.available,
            })
        }

        async fn transactions(&self, _account_id: &str, _count: usize) -> Result<Vec<Transaction>> {
            self.check()?;
            Ok(self.transactions.clone())
        }
    }

    async fn assistant_with(
        provider: MockProvider,
    ) -> (BankingAssistant, Arc<MockProvider>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(provider);
        let ledger = Arc::new(PaymentLedger::open(dir.path().join("payments.json")).await);
        let gateway = Arc::new(BankingGateway::new(provider.clone(), ledger));
        (
            BankingAssistant::new(gateway, ResponseEnhancer::disabled()),
            provider,
            dir,
        )
    }

    #[tokio::test]
    async fn test_greeting_without_enhancer() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(100.0)).await;
        let reply = assistant.process("u1", "hello").await;
        assert_eq!(reply.intent.as_deref(), Some("GREETING"));
        assert!(reply.response.starts_with("Hello!"));
        assert!(!reply.payment_mode);
    }

    #[tokio::test]
    async fn test_check_balance() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(321.5)).await;
        let reply = assistant.process("u1", "what's my balance").await;
        assert_eq!(reply.intent.as_deref(), Some("CHECK_BALANCE"));
        assert!(reply.response.contains("$321.50"));
        assert_eq!(reply.balance, Some(321.5));
        assert_eq!(reply.real_balance, Some(321.5));
    }

    #[tokio::test]
    async fn test_view_transactions() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(100.0)).await;
        let reply = assistant.process("u1", "show my recent payments").await;
        // Precedence: this phrasing classifies as VIEW_TRANSACTIONS.
        assert_eq!(reply.intent.as_deref(), Some("VIEW_TRANSACTIONS"));
        let transactions = reply.transactions.unwrap();
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].formatted_amount, "spent $12.00");
        assert_eq!(transactions[2].formatted_amount, "received $1500.00");
    }

    #[tokio::test]
    async fn test_spending_summary() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(100.0)).await;
        // "how much have i spent" would hit the balance group first, so
        // use wording that reaches the spending group.
        let reply = assistant.process("u1", "spending summary").await;
        assert_eq!(reply.intent.as_deref(), Some("SPENDING_SUMMARY"));
        assert_eq!(reply.total_spent, Some(16.5));
        assert_eq!(reply.num_expenses, Some(2));
    }

    #[tokio::test]
    async fn test_full_payment_flow() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(500.0)).await;

        let reply = assistant.process("u1", "pay").await;
        assert_eq!(reply.intent.as_deref(), Some("MAKE_PAYMENT"));
        assert!(reply.payment_mode);
        assert_eq!(reply.next_step.as_deref(), Some("payee"));

        let reply = assistant.process("u1", "John Smith").await;
        assert!(reply.payment_mode);
        assert_eq!(reply.next_step.as_deref(), Some("amount"));
        assert!(reply.response.contains("John Smith"));

        let reply = assistant.process("u1", "$25").await;
        assert!(reply.payment_mode);
        assert_eq!(reply.next_step.as_deref(), Some("confirmation"));
        assert!(reply.response.contains("$25.00"));
        assert!(reply.response.contains("$500.00"));

        let reply = assistant.process("u1", "confirm").await;
        assert!(!reply.payment_mode);
        assert_eq!(reply.payment_success, Some(true));
        assert_eq!(reply.new_balance, Some(475.0));

        // The record landed in the ledger and adjusts later balance reads.
        assert_eq!(assistant.gateway().ledger().record_count().await, 1);
        let reply = assistant.process("u1", "balance").await;
        assert_eq!(reply.balance, Some(475.0));
        assert_eq!(reply.real_balance, Some(500.0));
    }

    #[tokio::test]
    async fn test_cancel_at_each_flow_state() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(500.0)).await;

        // Cancel while awaiting payee.
        assistant.process("u1", "pay").await;
        let reply = assistant.process("u1", "cancel").await;
        assert!(!reply.payment_mode);
        assert!(reply.response.contains("cancelled"));

        // Cancel while awaiting amount.
        assistant.process("u1", "pay").await;
        assistant.process("u1", "John Smith").await;
        let reply = assistant.process("u1", "cancel").await;
        assert!(!reply.payment_mode);

        // Non-affirmative input at confirmation cancels too.
        assistant.process("u1", "pay").await;
        assistant.process("u1", "John Smith").await;
        assistant.process("u1", "$25").await;
        let reply = assistant.process("u1", "no thanks").await;
        assert!(!reply.payment_mode);
        assert!(reply.response.contains("cancelled"));

        // No payment record was ever created.
        assert_eq!(assistant.gateway().ledger().record_count().await, 0);
    }

    #[tokio::test]
    async fn test_payee_list_request_stays_in_flow() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(500.0)).await;
        assistant.process("u1", "pay").await;
        let reply = assistant.process("u1", "list them").await;
        assert!(reply.payment_mode);
        assert_eq!(reply.next_step.as_deref(), Some("payee"));
        assert!(reply.response.contains("Here are your payees"));
    }

    #[tokio::test]
    async fn test_unrecognized_payee_lists_candidates() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(500.0)).await;
        assistant.process("u1", "pay").await;
        let reply = assistant.process("u1", "my cousin ed").await;
        assert!(reply.payment_mode);
        assert_eq!(reply.next_step.as_deref(), Some("payee"));
        assert!(reply.response.contains("I found these payees"));
    }

    #[tokio::test]
    async fn test_change_payee_returns_to_payee_step() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(500.0)).await;
        assistant.process("u1", "pay").await;
        assistant.process("u1", "John Smith").await;

        let reply = assistant.process("u1", "change the payee").await;
        assert!(reply.payment_mode);
        assert_eq!(reply.next_step.as_deref(), Some("payee"));
        assert!(reply.response.contains("choose a different payee"));

        // The flow is back at the payee step and accepts a new name.
        let reply = assistant.process("u1", "corner bakery").await;
        assert_eq!(reply.next_step.as_deref(), Some("amount"));
        assert!(reply.response.contains("Corner Bakery Cafe"));
    }

    #[tokio::test]
    async fn test_insufficient_funds_resets_flow() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(10.0)).await;
        assistant.process("u1", "pay").await;
        assistant.process("u1", "John Smith").await;
        assistant.process("u1", "$25").await;
        let reply = assistant.process("u1", "confirm").await;
        assert!(!reply.payment_mode);
        assert_eq!(reply.payment_success, Some(false));
        assert!(reply.response.contains("Insufficient funds"));
        assert!(reply.response.contains("$10.00"));
        assert_eq!(assistant.gateway().ledger().record_count().await, 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_maps_to_error_reply() {
        let (assistant, provider, _dir) = assistant_with(MockProvider::new(100.0)).await;
        provider.failing.store(true, Ordering::SeqCst);

        let reply = assistant.process("u1", "balance").await;
        assert_eq!(reply.intent.as_deref(), Some("ERROR"));
        assert!(reply.response.contains("trouble accessing"));
        assert!(!reply.payment_mode);

        // Once the provider recovers, the same session works again.
        provider.failing.store(false, Ordering::SeqCst);
        let reply = assistant.process("u1", "balance").await;
        assert_eq!(reply.intent.as_deref(), Some("CHECK_BALANCE"));
    }

    #[tokio::test]
    async fn test_farewell_destroys_session() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(100.0)).await;
        assistant.process("u1", "hello").await;
        let reply = assistant.process("u1", "goodbye").await;
        assert_eq!(reply.intent.as_deref(), Some("FAREWELL"));
        assert_eq!(assistant.sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_general_inquiry_fallback() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(100.0)).await;
        let reply = assistant.process("u1", "sing me a song").await;
        assert_eq!(reply.intent.as_deref(), Some("GENERAL_INQUIRY"));
        assert!(reply.response.contains("I can help you"));
    }

    #[tokio::test]
    async fn test_payment_flow_survives_across_users() {
        let (assistant, _provider, _dir) = assistant_with(MockProvider::new(500.0)).await;
        assistant.process("alice", "pay").await;

        // Bob's messages never touch Alice's flow.
        let reply = assistant.process("bob", "balance").await;
        assert_eq!(reply.intent.as_deref(), Some("CHECK_BALANCE"));

        let reply = assistant.process("alice", "John Smith").await;
        assert_eq!(reply.next_step.as_deref(), Some("amount"));
    }
}
