//! `folio history`: Print a session's message log.

use folio_core::message::SessionId;

use super::runtime;

pub async fn run(session: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = runtime::load_config()?;
    let store = runtime::open_store(&config).await?;
    let session_id = SessionId::from(session);

    let messages = store.history(&session_id).await?;
    if messages.is_empty() {
        println!("  No messages in session '{session_id}'.");
        return Ok(());
    }

    println!("🗂  Session {session_id} ({} messages)", messages.len());
    for message in &messages {
        println!("{}", runtime::format_message(message));
    }
    Ok(())
}
