use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, PairCommands, RequestArgs};
use config::{Config, LlmProvider};
use verimath::domain::{LookupRecord, PipelineContext, PipelineInput};
use verimath::llm::{AnthropicClient, AnthropicConfig, LlmClient, OllamaClient, OllamaConfig};
use verimath::pipeline::{PipelineController, PlanGenerator, ResponseFormatter, ResultVerifier, Route, StepExecutor};
use verimath::storage::SqlitePairStore;

fn setup_logging(config: &Config) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join(format!("{}.log", env!("CARGO_PKG_NAME")));

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Build the planning client for the configured provider.
///
/// A provider that cannot be constructed is not fatal: planning falls back
/// to the fixed four-step plan.
fn build_llm(config: &Config) -> Option<Arc<dyn LlmClient>> {
    match config.llm.provider {
        LlmProvider::None => None,
        LlmProvider::Anthropic => {
            let mut anthropic = AnthropicConfig {
                max_tokens: config.llm.max_tokens,
                timeout: config.llm.timeout(),
                ..Default::default()
            };
            if let Some(model) = &config.llm.model {
                anthropic.model = model.clone();
            }
            match AnthropicClient::new(anthropic) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Anthropic client unavailable, using fallback plans: {}", e);
                    None
                }
            }
        }
        LlmProvider::Ollama => {
            let mut ollama = OllamaConfig {
                base_url: config.llm.ollama_base_url.clone(),
                max_tokens: Some(config.llm.max_tokens),
                timeout: config.llm.timeout(),
                ..Default::default()
            };
            if let Some(model) = &config.llm.model {
                ollama.model = model.clone();
            }
            match OllamaClient::new(ollama) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Ollama client unavailable, using fallback plans: {}", e);
                    None
                }
            }
        }
    }
}

fn open_store(config: &Config) -> Result<SqlitePairStore> {
    SqlitePairStore::open(&config.storage.database_path).context(format!(
        "Failed to open pair store at {}",
        config.storage.database_path.display()
    ))
}

fn build_planner(config: &Config, no_llm: bool) -> PlanGenerator {
    let mut planner = PlanGenerator::new(config.pipeline.registry())
        .with_timeout(config.llm.timeout())
        .with_max_tokens(config.llm.max_tokens);
    if !no_llm {
        if let Some(llm) = build_llm(config) {
            planner = planner.with_llm(llm);
        }
    }
    planner
}

fn build_context(request: &RequestArgs) -> PipelineContext {
    let mut input = PipelineInput::new(&request.pk, &request.sk);
    if let Some(operation) = &request.operation {
        input = input.with_operation(operation);
    }
    let mut ctx = PipelineContext::for_input(input);
    if let Some(task) = &request.task {
        ctx.task_description = task.clone();
    }
    ctx
}

async fn handle_run_command(request: &RequestArgs, summary: bool, config: &Config) -> Result<()> {
    let store = Arc::new(open_store(config)?);
    let registry = config.pipeline.registry();
    let controller = PipelineController::new(
        build_planner(config, request.no_llm),
        StepExecutor::new(store, registry.clone()),
        ResultVerifier::new(registry.clone()),
        ResponseFormatter::new(registry),
    )
    .with_retry_limits(config.pipeline.retry_limits());

    let ctx = build_context(request);
    info!("Running pipeline for request {}", ctx.request_id);
    let run = controller.run(ctx).await;

    match run.route {
        Route::Success => println!("{} {}", "✓".green(), run.response.message.green()),
        Route::Error => eprintln!("{} {}", "✗".red(), run.response.message.red()),
    }

    let output = if summary {
        serde_json::to_string_pretty(&run)?
    } else {
        serde_json::to_string_pretty(&run.response)?
    };
    println!("{}", output);
    Ok(())
}

async fn handle_plan_command(request: &RequestArgs, config: &Config) -> Result<()> {
    let planner = build_planner(config, request.no_llm);
    let ctx = build_context(request);
    if !planner.has_llm() {
        println!("{}", "No LLM configured, showing fallback plan".yellow());
    }
    let plan = planner.plan(&ctx).await;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn handle_pair_command(command: &PairCommands, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    match command {
        PairCommands::Put { pk, sk, val1, val2 } => {
            store
                .put(pk, sk, &LookupRecord::from_pair(*val1, *val2))
                .context("Failed to store pair")?;
            println!("{} Stored {} {} (val1={}, val2={})", "✓".green(), pk, sk, val1, val2);
        }
        PairCommands::Get { pk, sk } => match store.get(pk, sk).context("Failed to read pair")? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("{} No pair stored at {} {}", "✗".red(), pk, sk),
        },
    }
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { request, summary } => handle_run_command(request, *summary, config).await,
        Commands::Plan { request } => handle_plan_command(request, config).await,
        Commands::Pair { command } => handle_pair_command(command, config),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config)
        .await
        .context("Application failed")?;

    Ok(())
}
