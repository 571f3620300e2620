//! Payment Flow State Machine
//!
//! The multi-turn payee → amount → confirmation protocol. The whole state
//! lives in the `Session`: `payment_mode` marks an active flow and the two
//! optional fields encode which step comes next. Escape intents are
//! honored at every step, and any non-affirmative reply at the
//! confirmation step cancels outright.

use crate::assistant::HELP_TEXT;
use crate::classifier::{classify, Intent};
use crate::error::{AssistantError, Result};
use crate::gateway::BankingGateway;
use crate::models::ChatReply;
use crate::session::Session;

/// Words that mean "show me the payee directory" rather than naming one.
const LIST_REQUEST_KEYWORDS: &[&str] = &["list", "show", "what", "who", "payees", "users", "all payees"];

/// Words that back out of the chosen payee at the amount step. ("different"
/// never reaches this check: the GO_BACK intent claims it first.)
const CHANGE_PAYEE_KEYWORDS: &[&str] = &["different", "change", "other", "new payee", "wrong payee"];

const CONFIRM_KEYWORDS: &[&str] = &["yes", "confirm", "proceed", "ok", "do it", "confirm the payment"];

/// Closed vocabulary for spoken amounts. A later word match overwrites an
/// earlier one; a numeric literal wins outright and stops the scan.
const NUMBER_WORDS: &[(&str, f64)] = &[
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("twenty", 20.0),
    ("thirty", 30.0),
    ("forty", 40.0),
    ("fifty", 50.0),
    ("sixty", 60.0),
    ("seventy", 70.0),
    ("eighty", 80.0),
    ("ninety", 90.0),
    ("hundred", 100.0),
    ("thousand", 1000.0),
    ("lakh", 100_000.0),
];

/// Handle one turn while the session is in payment mode.
pub async fn handle_payment_turn(
    gateway: &BankingGateway,
    session: &mut Session,
    text: &str,
) -> Result<ChatReply> {
    // Escape hatches first, at every step.
    let intent = classify(text);
    if intent.is_flow_escape() {
        session.reset_payment();
        let response = match intent {
            Intent::CancelPayment => {
                "Okay, cancelled the payment. What would you like to do instead?"
            }
            Intent::Help => HELP_TEXT,
            _ => "Okay, let's start over. How can I help you?",
        };
        return Ok(ChatReply::text(response, None));
    }

    let text_lower = text.to_lowercase();

    match (session.current_payee.clone(), session.current_amount) {
        // Step 1: collect the payee.
        (None, _) => {
            let payees = gateway.payees().await;
            if payees.is_empty() {
                session.reset_payment();
                return Ok(ChatReply::text(
                    "I couldn't find any payees in your transaction history. \
                     Please add payees manually.",
                    None,
                ));
            }

            // Asking for the directory instead of naming someone.
            if LIST_REQUEST_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
                let listing = join_with_overflow(&payees, 8);
                return Ok(ChatReply::in_flow(
                    format!(
                        "Here are your payees: {}. Who would you like to pay? (Say 'cancel' to stop)",
                        listing
                    ),
                    "payee",
                ));
            }

            if let Some(payee) = match_payee(&payees, &text_lower) {
                let payee = payee.clone();
                session.current_payee = Some(payee.clone());
                Ok(ChatReply::in_flow(
                    format!(
                        "I found {} in your payees. How much would you like to pay? \
                         (Say 'cancel' to stop)",
                        payee
                    ),
                    "amount",
                ))
            } else {
                let listing = join_with_overflow(&payees, 5);
                Ok(ChatReply::in_flow(
                    format!(
                        "I found these payees in your history: {}. Who would you like to pay? \
                         (Say 'cancel' to stop or 'list all' to see more)",
                        listing
                    ),
                    "payee",
                ))
            }
        }

        // Step 2: collect the amount.
        (Some(payee), None) => {
            if CHANGE_PAYEE_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
                session.current_payee = None;
                let payees = gateway.payees().await;
                let listing = payees
                    .iter()
                    .take(5)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                return Ok(ChatReply::in_flow(
                    format!(
                        "Okay, let's choose a different payee. Your payees include: {}. \
                         Who would you like to pay?",
                        listing
                    ),
                    "payee",
                ));
            }

            match extract_amount(text) {
                Some(amount) => {
                    // Fetch the balance before committing the amount so a
                    // gateway failure leaves the session untouched.
                    let account = gateway
                        .default_account()
                        .await?
                        .ok_or(AssistantError::NoAccount)?;
                    let balance = gateway.balance(&account.id).await?;
                    session.current_amount = Some(amount);

                    Ok(ChatReply::in_flow(
                        format!(
                            "Confirm payment: ${:.2} to {}. Your current balance is ${:.2}. \
                             Say 'confirm' to proceed or 'cancel' to stop.",
                            amount, payee, balance.available
                        ),
                        "confirmation",
                    ))
                }
                None => Ok(ChatReply::in_flow(
                    "I didn't catch the amount. Please say something like 'fifty dollars' \
                     or '$50'. Say 'cancel' to stop the payment.",
                    "amount",
                )),
            }
        }

        // Step 3: confirm or cancel. No re-prompt loop here.
        (Some(payee), Some(amount)) => {
            if CONFIRM_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
                session.reset_payment();
                match gateway.make_payment(&payee, amount, None).await {
                    Ok(receipt) => {
                        let mut reply = ChatReply::text(
                            format!(
                                "✅ {} New balance: ${:.2}",
                                receipt.message, receipt.new_balance
                            ),
                            None,
                        );
                        reply.payment_success = Some(true);
                        reply.new_balance = Some(receipt.new_balance);
                        Ok(reply)
                    }
                    Err(e) => {
                        let mut reply = ChatReply::text(format!("❌ {}", e), None);
                        reply.payment_success = Some(false);
                        Ok(reply)
                    }
                }
            } else {
                session.reset_payment();
                Ok(ChatReply::text(
                    "❌ Payment cancelled. What would you like to do instead?",
                    None,
                ))
            }
        }
    }
}

/// First payee whose words (longer than two characters) appear in the
/// lower-cased input; first match wins by directory order.
fn match_payee<'a>(payees: &'a [String], text_lower: &str) -> Option<&'a String> {
    payees.iter().find(|payee| {
        payee
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.chars().count() > 2)
            .any(|word| text_lower.contains(word))
    })
}

fn join_with_overflow(payees: &[String], limit: usize) -> String {
    let mut listing = payees
        .iter()
        .take(limit)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if payees.len() > limit {
        listing.push_str(&format!(" and {} more", payees.len() - limit));
    }
    listing
}

/// Pull a payment amount out of free text. Currency markers are separated
/// into `$` tokens, then each token is checked against the number-word
/// vocabulary (later match overwrites) or parsed as a non-negative decimal
/// literal (records and stops immediately). Zero counts as no amount.
pub fn extract_amount(text: &str) -> Option<f64> {
    let normalized = text
        .to_lowercase()
        .replace('$', " $")
        .replace("rs", " $")
        .replace("rupees", " $")
        .replace('₹', " $");

    let mut found = None;
    for word in normalized.split_whitespace() {
        let clean: String = word
            .chars()
            .filter(|c| *c != '$' && *c != ',' && *c != '₹')
            .collect();

        if let Some((_, value)) = NUMBER_WORDS.iter().find(|(w, _)| *w == clean) {
            found = Some(*value);
        } else if clean.chars().any(|c| c.is_ascii_digit())
            && clean.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            match clean.parse::<f64>() {
                Ok(value) => {
                    found = Some(value);
                    break;
                }
                // Digits-and-dots that still fail to parse ("1.2.3") void
                // the whole extraction.
                Err(_) => return None,
            }
        }
    }

    found.filter(|amount| *amount != 0.0)
}
