//! Wiring shared by the commands: config → provider, index, tools, store, agent.

use folio_agent::Agent;
use folio_config::AppConfig;
use folio_core::error::MemoryError;
use folio_core::memory::SessionStore;
use folio_core::message::{Message, MessageKind};
use folio_memory::{FileSessionStore, InMemorySessionStore, SqliteSessionStore, VectorIndex};
use folio_tools::PAGE_SEARCH_TOOL;
use std::sync::Arc;
use tracing::info;

pub struct Runtime {
    pub config: AppConfig,
    pub agent: Agent,
    pub index_pages: usize,
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the session store the config asks for.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, MemoryError> {
    let store: Arc<dyn SessionStore> = match config.memory.backend.as_str() {
        "in_memory" => Arc::new(InMemorySessionStore::new()),
        "file" => Arc::new(FileSessionStore::new(config.memory_path())),
        _ => Arc::new(SqliteSessionStore::open(&config.memory_path()).await?),
    };
    info!(backend = store.name(), "Session store ready");
    Ok(store)
}

/// Build everything `ask` and `chat` need.
pub async fn build(config: AppConfig) -> Result<Runtime, Box<dyn std::error::Error>> {
    let provider = folio_providers::build_provider(&config).map_err(|e| {
        print_setup_help();
        format!("Provider unavailable: {e}")
    })?;

    let index_path = config.index_path();
    let index = VectorIndex::load(&index_path)
        .await
        .map_err(|e| format!("Page index not available at {}: {e}", index_path.display()))?
        .with_embedder(provider.clone(), &config.embedding_model)
        .with_min_score(config.retrieval.min_score);
    let index_pages = index.len();

    let registry = Arc::new(folio_tools::default_registry(
        Arc::new(index),
        config.retrieval.limit,
        config.retrieval_timeout(),
    )?);

    let store = open_store(&config).await?;
    let agent = Agent::from_config(&config, provider, registry, PAGE_SEARCH_TOOL, store);

    Ok(Runtime {
        config,
        agent,
        index_pages,
    })
}

/// One printable line per stored message.
pub fn format_message(message: &Message) -> String {
    let label = match message.kind {
        MessageKind::Text => message.role.as_str().to_string(),
        kind => format!("{}/{}", message.role.as_str(), kind.as_str()),
    };
    format!(
        "  #{:<3} {} {:<16} {}",
        message.sequence_number,
        message.timestamp.format("%Y-%m-%d %H:%M:%S"),
        label,
        message.content.replace('\n', "\n                                          ")
    )
}

fn print_setup_help() {
    eprintln!();
    eprintln!("  ERROR: No usable model provider configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    FOLIO_API_KEY  = 'sk-...'   (generic)");
    eprintln!("    OPENAI_API_KEY = 'sk-...'   (for OpenAI direct)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}
