use financial_function_assistant::{
    config::AssistantConfig,
    conversation::Conversation,
    execution::ExecutionEngine,
    llm::build_model,
    prompt::SYSTEM_PROMPT,
    repl::Repl,
    tools::create_default_registry,
};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Logs go to stderr so they never interleave with answers
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match AssistantConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("⚠️  {}", e);
            eprintln!("📌 See .env.example for setup instructions");
            return Err(e.into());
        }
    };

    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        max_tool_rounds = config.max_tool_rounds,
        "🚀 Financial assistant starting"
    );

    // Create components
    let registry = create_default_registry(&config.alpha_vantage)?;
    let model = build_model(&config.llm)?;
    let conversation = Conversation::new(model, ExecutionEngine::new(registry), SYSTEM_PROMPT)
        .with_max_tool_rounds(config.max_tool_rounds);
    let mut repl = Repl::new(conversation);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let exit = repl
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
        .await?;

    info!(
        ?exit,
        total_tokens = repl.conversation().total_usage().total(),
        "Financial assistant stopped"
    );

    Ok(())
}
