use std::sync::Arc;
use tracing::info;
use voice_banking_assistant::{
    api::start_server,
    assistant::BankingAssistant,
    gateway::BankingGateway,
    gemini::ResponseEnhancer,
    ledger::PaymentLedger,
    teller::{TellerClient, TellerConfig},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let teller_config = TellerConfig::from_env()?;
    let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
    let payments_file = std::env::var("PAYMENTS_FILE")
        .unwrap_or_else(|_| "simulated_payments.json".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()?;

    info!("Voice Banking Assistant API");
    info!("Port: {}", port);

    let provider = Arc::new(TellerClient::new(teller_config)?);
    let ledger = Arc::new(PaymentLedger::open(&payments_file).await);
    let gateway = Arc::new(BankingGateway::new(provider, ledger));

    // Verify provider connectivity before serving traffic.
    let accounts = gateway.accounts().await?;
    info!("Connected to banking API. Found {} accounts.", accounts.len());

    let enhancer = ResponseEnhancer::new(gemini_api_key);
    let assistant = Arc::new(BankingAssistant::new(gateway, enhancer));

    start_server(assistant, port).await?;

    Ok(())
}
