//! `folio ask`: Answer one question.

use folio_agent::ReactOutcome;
use folio_core::message::SessionId;

use super::runtime;

pub async fn run(
    question: &str,
    session: Option<String>,
    react: bool,
    images: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime::build(runtime::load_config()?).await?;
    let session_id = session.map(SessionId::from).unwrap_or_default();

    eprint!("  Thinking...");
    let reply = if react {
        let outcome = runtime.agent.reason(question, &session_id).await;
        eprint!("\r              \r");
        let outcome = outcome?;
        print_trace(&outcome);
        outcome.reply().to_string()
    } else {
        let answer = runtime
            .agent
            .answer_with_images(question, images, &session_id)
            .await;
        eprint!("\r              \r");
        answer?
    };

    println!("{reply}");
    eprintln!("  (session: {session_id})");
    Ok(())
}

/// Show the reasoning steps on stderr so stdout carries only the answer.
pub fn print_trace(outcome: &ReactOutcome) {
    for (i, step) in outcome.trace().iter().enumerate() {
        if !step.thought.is_empty() {
            eprintln!("  [{}] 💭 {}", i + 1, step.thought);
        }
        if let Some(call) = &step.action {
            eprintln!("  [{}] 🛠️  {}", i + 1, call.tool_name);
        }
        if let Some(observation) = &step.observation {
            for line in observation.render().lines() {
                eprintln!("  [{}] 👁  {line}", i + 1);
            }
        }
    }
    if let ReactOutcome::Failed(exhausted) = outcome {
        eprintln!("  ⚠️  {exhausted}");
    }
}
