//! Ask/critique orchestration and session state.
//!
//! The ask pipeline is linear: cached sheet snapshot → keyword selection →
//! context block → one model call. The critique pass is a second, on-demand
//! model call that reviews the last answer against the richer context
//! retained from the same selection.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::cache::SheetCache;
use crate::config::Config;
use crate::genai::GeminiClient;
use crate::{prompt, search};

/// One turn of the conversation, as rendered by the chat surface.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Per-session mutable state: the conversation so far and what the critique
/// pass needs from the last answered question.
#[derive(Debug, Default)]
pub struct Session {
    pub messages: Vec<ChatMessage>,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
    /// Richer context block from the last selection ("last raw context").
    pub last_context: Option<String>,
}

/// Result of one ask: the answer plus how the grounding was selected.
#[derive(Debug)]
pub struct AskOutcome {
    pub answer: String,
    pub matched: usize,
    pub fallback: bool,
    /// Context block actually sent to the model.
    pub context: String,
    /// Richer block retained for a later critique pass.
    pub critique_context: String,
}

/// Answer a question against the knowledge base.
pub async fn ask(
    config: &Config,
    cache: &SheetCache,
    client: &GeminiClient,
    question: &str,
) -> Result<AskOutcome> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    let snapshot = cache.get_or_load(config).await?;
    let records = snapshot.records();
    if records.is_empty() {
        bail!("the knowledge sheet has no records yet — append some analyses first");
    }

    let selection = search::select_context(
        &records,
        question,
        config.retrieval.max_matches,
        config.retrieval.fallback_recent,
    );

    let context = prompt::context_block(&selection.records);
    let critique_context = prompt::critique_block(&selection.records);

    let answer = client
        .generate(&prompt::answer_prompt(question, &context))
        .await?;

    Ok(AskOutcome {
        answer,
        matched: selection.matched,
        fallback: selection.fallback,
        context,
        critique_context,
    })
}

/// Run the critique pass over a session's last answer.
pub async fn critique(client: &GeminiClient, session: &Session) -> Result<String> {
    let (Some(question), Some(answer), Some(context)) = (
        session.last_question.as_deref(),
        session.last_answer.as_deref(),
        session.last_context.as_deref(),
    ) else {
        bail!("no answer to critique yet in this session");
    };

    client
        .generate(&prompt::critique_prompt(question, answer, context))
        .await
}

/// The info line shown above an answer, mirroring how the grounding was
/// selected.
pub fn banner(matched: usize, fallback: bool, fallback_recent: usize) -> String {
    if fallback {
        format!(
            "No exact keyword match; answering from the latest {} analyses.",
            fallback_recent
        )
    } else {
        format!("Found {} related analyses in the knowledge base.", matched)
    }
}

impl Session {
    /// Record a completed ask turn.
    pub fn record_turn(&mut self, question: &str, outcome: &AskOutcome) {
        self.messages.push(ChatMessage {
            role: "user".to_string(),
            content: question.to_string(),
        });
        self.messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: outcome.answer.clone(),
        });
        self.last_question = Some(question.to_string());
        self.last_answer = Some(outcome.answer.clone());
        self.last_context = Some(outcome.critique_context.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_fallback() {
        let line = banner(0, true, 3);
        assert!(line.contains("latest 3"));
    }

    #[test]
    fn test_banner_matched() {
        let line = banner(7, false, 3);
        assert!(line.contains("7 related"));
    }

    #[test]
    fn test_record_turn_retains_critique_inputs() {
        let mut session = Session::default();
        let outcome = AskOutcome {
            answer: "Buy bonds.".to_string(),
            matched: 2,
            fallback: false,
            context: "ctx".to_string(),
            critique_context: "rich ctx".to_string(),
        };
        session.record_turn("Rates?", &outcome);
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.last_answer.as_deref(), Some("Buy bonds."));
        assert_eq!(session.last_context.as_deref(), Some("rich ctx"));
    }
}
