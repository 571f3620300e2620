//! REST API server for the banking assistant
//!
//! Thin transport wrapper: one chat endpoint marshalling into
//! `BankingAssistant::process`, pass-through read endpoints, and a direct
//! payment call with the same validation as the conversational flow.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::assistant::BankingAssistant;
use crate::error::AssistantError;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub account_id: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DirectPaymentRequest {
    pub payee: Option<String>,
    pub amount: Option<f64>,
    pub account_id: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<BankingAssistant>,
}

fn error_status(e: &AssistantError) -> StatusCode {
    match e {
        AssistantError::NoAccount => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(e: &AssistantError) -> Json<Value> {
    Json(json!({ "error": e.to_string() }))
}

/// First account id unless the caller pinned one.
async fn resolve_account(state: &ApiState, account_id: Option<String>) -> crate::Result<String> {
    match account_id {
        Some(id) => Ok(id),
        None => state
            .assistant
            .gateway()
            .default_account()
            .await?
            .map(|account| account.id)
            .ok_or(AssistantError::NoAccount),
    }
}

/// =============================
/// Handlers
/// =============================

async fn home() -> Json<Value> {
    Json(json!({
        "message": "Voice Banking Assistant API",
        "status": "running",
        "endpoints": {
            "/api/chat": "POST - Send text messages",
            "/api/accounts": "GET - Get account information",
            "/api/balance": "GET - Get account balance",
            "/api/transactions": "GET - Get recent transactions",
            "/api/payees": "GET - Get payee list",
            "/api/payments": "GET - Get payment history",
            "/api/health": "GET - Health check"
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<Value>) {
    let message = req.message.as_deref().unwrap_or("").trim().to_string();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No message provided" })),
        );
    }

    let user_id = req.user_id.unwrap_or_else(|| "default_user".to_string());
    info!("Received message from {}: {}", user_id, message);

    let reply = state.assistant.process(&user_id, &message).await;
    match serde_json::to_value(&reply) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

async fn accounts(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    match state.assistant.gateway().accounts().await {
        Ok(accounts) => (StatusCode::OK, Json(json!({ "accounts": accounts }))),
        Err(e) => (error_status(&e), error_body(&e)),
    }
}

async fn balance(
    State(state): State<ApiState>,
    Query(query): Query<AccountQuery>,
) -> (StatusCode, Json<Value>) {
    let account_id = match resolve_account(&state, query.account_id).await {
        Ok(id) => id,
        Err(e) => return (error_status(&e), error_body(&e)),
    };

    match state.assistant.gateway().balance(&account_id).await {
        Ok(info) => (StatusCode::OK, Json(json!({ "balance": info }))),
        Err(e) => (error_status(&e), error_body(&e)),
    }
}

async fn transactions(
    State(state): State<ApiState>,
    Query(query): Query<AccountQuery>,
) -> (StatusCode, Json<Value>) {
    let count = query.count.unwrap_or(5);
    let account_id = match resolve_account(&state, query.account_id).await {
        Ok(id) => id,
        Err(e) => return (error_status(&e), error_body(&e)),
    };

    match state
        .assistant
        .gateway()
        .transactions(&account_id, count)
        .await
    {
        Ok(transactions) => (
            StatusCode::OK,
            Json(json!({ "transactions": transactions })),
        ),
        Err(e) => (error_status(&e), error_body(&e)),
    }
}

async fn payees(State(state): State<ApiState>) -> Json<Value> {
    let payees = state.assistant.gateway().payees().await;
    Json(json!({ "payees": payees }))
}

async fn payments(State(state): State<ApiState>) -> Json<Value> {
    let payments = state.assistant.gateway().ledger().history(5).await;
    Json(json!({ "payments": payments }))
}

async fn direct_payment(
    State(state): State<ApiState>,
    Json(req): Json<DirectPaymentRequest>,
) -> (StatusCode, Json<Value>) {
    let payee = req.payee.unwrap_or_default();
    let amount = req.amount.unwrap_or(0.0);
    if payee.trim().is_empty() || amount == 0.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Payee and amount are required" })),
        );
    }

    match state
        .assistant
        .gateway()
        .make_payment(&payee, amount, req.account_id.as_deref())
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": receipt.message,
                "new_balance": receipt.new_balance,
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(assistant: Arc<BankingAssistant>) -> Router {
    let state = ApiState { assistant };

    Router::new()
        .route("/", get(home))
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/accounts", get(accounts))
        .route("/api/balance", get(balance))
        .route("/api/transactions", get(transactions))
        .route("/api/payees", get(payees))
        .route("/api/payments", get(payments))
        .route("/api/direct-payment", post(direct_payment))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    assistant: Arc<BankingAssistant>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(assistant);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
