//! Session history replay.

use folio_core::message::{Message, MessageKind, Role};
use folio_core::provider::{ContentPart, PromptRole, PromptTurn};

/// Convert one stored message into the turn the model sees.
pub fn to_turn(message: &Message) -> PromptTurn {
    match message.kind {
        MessageKind::ImageReference => PromptTurn {
            role: prompt_role(message.role),
            parts: vec![ContentPart::Image {
                reference: message.content.clone(),
            }],
        },
        MessageKind::ToolCall => PromptTurn::assistant(format!("Tool call: {}", message.content)),
        MessageKind::ToolResult => PromptTurn::text(PromptRole::Tool, &message.content),
        MessageKind::Text => PromptTurn::text(prompt_role(message.role), &message.content),
    }
}

/// Replay a whole session, oldest first.
pub fn to_turns(history: &[Message]) -> Vec<PromptTurn> {
    history.iter().map(to_turn).collect()
}

fn prompt_role(role: Role) -> PromptRole {
    match role {
        Role::User => PromptRole::User,
        Role::Agent => PromptRole::Assistant,
        Role::Tool => PromptRole::Tool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::message::{NewMessage, SessionId};

    fn log(messages: Vec<NewMessage>) -> Vec<Message> {
        let session = SessionId::from("s");
        messages
            .into_iter()
            .enumerate()
            .map(|(i, m)| m.into_message(&session, i as u64 + 1))
            .collect()
    }

    #[test]
    fn replays_in_order_with_roles() {
        let history = log(vec![
            NewMessage::user_text("What is on page 3?"),
            NewMessage::image_reference("p3.png"),
            NewMessage::agent_text("A chart."),
        ]);
        let turns = to_turns(&history);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, PromptRole::User);
        assert_eq!(turns[1].image_references(), vec!["p3.png"]);
        assert_eq!(turns[2].role, PromptRole::Assistant);
        assert_eq!(turns[2].text_content(), "A chart.");
    }

    #[test]
    fn tool_messages_keep_their_content() {
        let history = log(vec![
            NewMessage::tool_call(r#"{"tool":"search"}"#),
            NewMessage::tool_result("[1] p3.png (score 0.91)"),
        ]);
        let turns = to_turns(&history);
        assert_eq!(turns[0].role, PromptRole::Assistant);
        assert!(turns[0].text_content().contains("search"));
        assert_eq!(turns[1].role, PromptRole::Tool);
    }
}
