mod repl;

use anyhow::Result;
use clap::{Parser, Subcommand};
use desk_core::agent::Agent;
use desk_core::config::AppConfig;
use desk_core::graph::ConversationGraph;
use desk_core::model::OpenAiChat;
use desk_core::retrieval::{OpenAiEmbedder, VectorIndex};
use desk_core::router::FrontDesk;
use desk_core::tool_registry::ToolRegistry;
use desk_core::{ingest, DeskError};
use desk_tools::store::BookingStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gym-desk",
    about = "Multi-agent front desk assistant for a strength & conditioning gym",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/gym-desk/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the chat model name
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive assistant (default)
    Chat,

    /// Chunk, embed, and index a gym document for retrieval
    Ingest {
        /// Path to the document (extracted text or markdown)
        path: PathBuf,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "gym_desk=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(model) = &cli.model {
        config.provider.model = model.clone();
    }
    if let Some(api_base) = &cli.api_base {
        config.provider.api_base = api_base.clone();
    }

    match cli.command {
        Some(Commands::Ingest { path }) => run_ingest(config, path).await?,
        Some(Commands::Config { action }) => handle_config_command(action, &config)?,
        Some(Commands::Chat) | None => run_chat(config).await?,
    }

    Ok(())
}

/// Wire the store, index, tool registries, agents, and graph, then hand
/// control to the REPL. Missing credentials are fatal here, before any
/// conversation starts.
async fn run_chat(config: AppConfig) -> Result<()> {
    let api_key = config.provider.resolve_api_key()?;
    let (store_url, store_key) = config.booking.resolve()?;

    let store = Arc::new(BookingStore::new(&store_url, &store_key)?);
    let embedder = Arc::new(OpenAiEmbedder::new(
        &config.provider,
        &config.retrieval,
        &api_key,
    ));

    let index_path = config.retrieval.index_path();
    let index = if index_path.exists() {
        VectorIndex::load_from(&index_path, embedder, config.retrieval.top_k)?
    } else {
        tracing::warn!(
            "No document index at {}; run `gym-desk ingest <file>` to enable retrieval",
            index_path.display()
        );
        VectorIndex::empty(embedder, config.retrieval.top_k)
    };

    let mut rag_tools = ToolRegistry::new();
    desk_tools::register_rag_tools(&mut rag_tools, Arc::new(index));
    let mut booking_tools = ToolRegistry::new();
    desk_tools::register_booking_tools(&mut booking_tools, store);

    tracing::info!(
        "Ready: model {}, {} retrieval tool(s), {} booking tool(s)",
        config.provider.model,
        rag_tools.len(),
        booking_tools.len(),
    );

    let front_desk = FrontDesk::new(Arc::new(OpenAiChat::new(
        &config.provider,
        &api_key,
        FrontDesk::TEMPERATURE,
    )));
    let agent_model = Arc::new(OpenAiChat::new(
        &config.provider,
        &api_key,
        Agent::TEMPERATURE,
    ));
    let rag = Agent::rag(agent_model.clone(), Arc::new(rag_tools));
    let booking = Agent::booking(agent_model, Arc::new(booking_tools));

    let graph = ConversationGraph::new(front_desk, rag, booking);
    repl::run(config, graph).await
}

/// Chunk, embed, and persist a document index.
async fn run_ingest(config: AppConfig, path: PathBuf) -> Result<()> {
    let api_key = config.provider.resolve_api_key()?;

    let text = ingest::load_document(&path)?;
    let chunks = ingest::chunk_text(
        &text,
        config.retrieval.chunk_size,
        config.retrieval.chunk_overlap,
    )?;
    if chunks.is_empty() {
        return Err(DeskError::Ingest("Document produced no passages".into()).into());
    }
    println!("Split {} into {} passages.", path.display(), chunks.len());

    let embedder = Arc::new(OpenAiEmbedder::new(
        &config.provider,
        &config.retrieval,
        &api_key,
    ));
    let index = VectorIndex::build(embedder, config.retrieval.top_k, chunks).await?;

    let index_path = config.retrieval.index_path();
    index.save_to(&index_path)?;
    println!(
        "Indexed {} passages into {}.",
        index.len(),
        index_path.display()
    );

    Ok(())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
