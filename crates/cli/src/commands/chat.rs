//! `folio chat`: Interactive question answering.

use folio_core::message::SessionId;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ask::print_trace;
use super::runtime::{self, Runtime};

pub async fn run(session: Option<String>, react: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime::build(runtime::load_config()?).await?;
    let mut session_id = session.map(SessionId::from).unwrap_or_default();
    // Images queued by `attach`, sent with the next question.
    let mut attachments: Vec<String> = Vec::new();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Folio — Chat with your pages          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    print_status(&runtime, &session_id, react);
    println!("  Type your question and press Enter ('help' for commands).");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "quit" | "exit" | ":q" => break,
            "help" => print_help(),
            "status" => print_status(&runtime, &session_id, react),
            "new" => {
                session_id = SessionId::new();
                attachments.clear();
                println!("  Started session {session_id}\n");
            }
            _ if line.starts_with("attach ") => {
                let key = line["attach ".len()..].trim();
                if react {
                    eprintln!("  [Error] attachments need single-pass mode (start chat without --react)\n");
                } else if !key.is_empty() {
                    attachments.push(key.to_string());
                    println!("  Attached {key} ({} pending)\n", attachments.len());
                }
            }
            "history" => match runtime.agent.history(&session_id).await {
                Ok(messages) if messages.is_empty() => println!("  (no messages yet)\n"),
                Ok(messages) => {
                    for message in &messages {
                        println!("{}", runtime::format_message(message));
                    }
                    println!();
                }
                Err(e) => eprintln!("  [Error] {e}\n"),
            },
            question => {
                eprint!("  ...");
                let reply = if react {
                    runtime.agent.reason(question, &session_id).await.map(|outcome| {
                        eprint!("\r     \r");
                        print_trace(&outcome);
                        outcome.reply().to_string()
                    })
                } else {
                    let images = std::mem::take(&mut attachments);
                    runtime
                        .agent
                        .answer_with_images(question, &images, &session_id)
                        .await
                };
                eprint!("\r     \r");
                match reply {
                    Ok(text) => {
                        println!();
                        for line in text.lines() {
                            println!("  Folio > {line}");
                        }
                        println!();
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_help() {
    println!();
    println!("  Commands:");
    println!("    help     - Show this help message");
    println!("    status   - Show current configuration");
    println!("    history  - Show this session's messages");
    println!("    new      - Start a new session");
    println!("    attach K - Send page image K with the next question");
    println!("    quit     - Exit the chat");
    println!();
    println!("  Example questions:");
    println!("    What is shown on page 3?");
    println!("    What are the key contributions of this paper?");
    println!();
}

fn print_status(runtime: &Runtime, session_id: &SessionId, react: bool) {
    println!("  Provider:  {}", runtime.config.provider);
    println!("  Model:     {}", runtime.config.model);
    println!("  Index:     {} pages", runtime.index_pages);
    println!("  Memory:    {}", runtime.agent.store().name());
    println!("  Mode:      {}", if react { "react" } else { "single pass" });
    println!("  Session:   {session_id}");
    println!();
}
