//! Voice Banking Assistant
//!
//! A conversational front-end over the Teller banking API with a
//! simulated-payment ledger:
//! - Classifies free-text input into banking intents via ordered keyword rules
//! - Runs a multi-turn payee → amount → confirmation payment flow
//! - Tracks simulated payments in an append-only flat-file ledger and
//!   reports balances adjusted for them
//! - Optionally polishes replies through Gemini, degrading silently when
//!   the service is absent
//!
//! TURN LOOP:
//! MESSAGE → SESSION → (PAYMENT FLOW | CLASSIFY → DISPATCH) → REPLY

pub mod api;
pub mod assistant;
pub mod classifier;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod gemini;
pub mod ledger;
pub mod models;
pub mod session;
pub mod teller;

pub use error::Result;

// Re-export common types
pub use assistant::BankingAssistant;
pub use classifier::{classify, Intent};
pub use models::*;
