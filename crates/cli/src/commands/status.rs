//! `folio status`: Show configuration, index and sessions.

use folio_config::AppConfig;
use folio_memory::VectorIndex;

use super::runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = runtime::load_config()?;
    print_config(&config);

    let index_path = config.index_path();
    match VectorIndex::load(&index_path).await {
        Ok(index) => println!("  Index:        {} ({} pages)", index_path.display(), index.len()),
        Err(e) => println!("  Index:        {} (unavailable: {e})", index_path.display()),
    }

    match runtime::open_store(&config).await {
        Ok(store) => {
            let sessions = store.sessions().await?;
            println!("  Sessions:     {}", sessions.len());
            for id in sessions.iter().take(10) {
                println!("    - {id}");
            }
        }
        Err(e) => println!("  Sessions:     (store unavailable: {e})"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `folio init` first");
    }

    Ok(())
}

pub fn print_config(config: &AppConfig) {
    println!("📄 Folio Status");
    println!("===============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.provider);
    println!("  Model:        {}", config.model);
    println!("  Embeddings:   {}", config.embedding_model);
    println!("  Temperature:  {}", config.temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Retrieval:    top {} (min score {})", config.retrieval.limit, config.retrieval.min_score);
    println!("  Max steps:    {}", config.agent.max_steps);
    println!("  Memory:       {} ({})", config.memory.backend, config.memory_path().display());
}
