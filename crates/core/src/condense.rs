use crate::models::{ChatTurn, Role};
use crate::traits::{GenerationRequest, TextGenerator};

pub const CONDENSE_MAX_TOKENS: u32 = 150;

const REWRITER_INSTRUCTION: &str = "You are a query rewriter. Given a conversation and the latest \
user message, output a single standalone question that captures what the user is asking, \
including any context from the conversation (e.g. pronouns like \"it\", \"that\" should be \
resolved). Output only the question, no explanation.";

/// Falls back to the last message when generation fails or is not needed.
pub async fn condense_conversation(
    generator: &dyn TextGenerator,
    turns: &[ChatTurn],
    max_turns: usize,
) -> String {
    let window = &turns[turns.len().saturating_sub(max_turns.max(1))..];
    let Some(last) = window.last() else {
        return String::new();
    };
    let fallback = last.content.trim().to_string();

    if window.len() <= 1 || last.role != Role::User {
        return fallback;
    }

    let request = GenerationRequest {
        system: REWRITER_INSTRUCTION.to_string(),
        messages: vec![ChatTurn::user(format!(
            "Conversation:\n{}\n\nStandalone question:",
            transcript(window)
        ))],
        max_tokens: Some(CONDENSE_MAX_TOKENS),
    };

    match generator.generate(&request).await {
        Ok(text) if !text.trim().is_empty() => {
            let condensed = text.trim().to_string();
            tracing::debug!(original = %fallback, condensed = %condensed, "query condensed");
            condensed
        }
        Ok(_) => {
            tracing::warn!("query condensation returned nothing, using last message");
            fallback
        }
        Err(error) => {
            tracing::warn!(%error, "query condensation failed, using last message");
            fallback
        }
    }
}

fn transcript(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let label = match turn.role {
                Role::User => "User",
                _ => "Assistant",
            };
            format!("{label}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
