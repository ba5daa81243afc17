//! Context block formatting and prompt templates.
//!
//! The context block is the formatted excerpt of selected records sent to
//! the model as grounding. The critique block is the richer variant (every
//! schema field) retained for the on-demand critique pass.

use crate::models::Record;

/// Format the selected records as numbered reference sections with the
/// fields that ground an answer.
pub fn context_block(records: &[Record]) -> String {
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("--- [Reference {}] ---\n", i + 1));
        out.push_str(&format!(
            "* Source: {} - \"{}\"\n",
            record.channel, record.title
        ));
        out.push_str(&format!("* Main topic: {}\n", record.main_topic));
        out.push_str(&format!("* Summary: {}\n", record.summary));
        out.push_str(&format!("* Key arguments: {}\n", record.key_arguments));
        out.push_str(&format!("* Evidence (figures): {}\n", record.evidence));
        out.push_str(&format!("* Investment implications: {}\n", record.implications));
        out.push_str("----------------------\n\n");
    }
    out
}

/// The richer context used by the critique pass: every schema field,
/// including the ones the answer pass leaves out.
pub fn critique_block(records: &[Record]) -> String {
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("--- [Reference {}] ---\n", i + 1));
        out.push_str(&format!(
            "* Source: {} - \"{}\" ({})\n",
            record.channel, record.title, record.source_url
        ));
        out.push_str(&format!("* Published: {}\n", record.published_at));
        out.push_str(&format!("* Category: {}\n", record.category));
        out.push_str(&format!("* Main topic: {}\n", record.main_topic));
        out.push_str(&format!("* Summary: {}\n", record.summary));
        out.push_str(&format!("* Key arguments: {}\n", record.key_arguments));
        out.push_str(&format!("* Evidence (figures): {}\n", record.evidence));
        out.push_str(&format!("* Investment implications: {}\n", record.implications));
        out.push_str(&format!("* Validity check: {}\n", record.validity_check));
        out.push_str(&format!("* Sentiment: {}\n", record.sentiment));
        out.push_str(&format!("* Tags: {}\n", record.tags));
        out.push_str("----------------------\n\n");
    }
    out
}

/// The single-turn answer prompt: strategist persona, grounding data, the
/// user's question, and the answer guidelines.
pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are a senior financial investment strategist.
Review the [Analysis Report Data] below and give the user a deep, well-grounded answer to their question.

[Analysis Report Data]
{context}

[User Question]
{question}

[Answer Guidelines]
1. Synthesize: draw a reasoned conclusion across the referenced videos instead of listing them one by one.
2. Cite sources: avoid vague phrases like "according to the data". Cite as "channel X argued in 'title' that ..." and quote concrete figures (%, amounts).
3. Structure: use bullet points, bold text, and paragraph breaks for readability.
4. Action plan: close with practical investment implications grounded in the data.
5. If the data does not cover the question, say so honestly rather than guessing.
"#
    )
}

/// The critique-pass prompt: review a prior answer against the richer
/// source data and report what does not hold up.
pub fn critique_prompt(question: &str, answer: &str, context: &str) -> String {
    format!(
        r#"You are a skeptical investment research reviewer.
Below is a question, the answer an assistant gave, and the full source data the answer was based on.
Critique the answer strictly against the source data.

[Source Data]
{context}

[Question]
{question}

[Answer Under Review]
{answer}

[Critique Guidelines]
1. Flag any claim in the answer that the source data does not support, and any figure quoted incorrectly.
2. Note relevant caveats the answer omitted — validity concerns, one-sided sentiment, or stale publish dates in the source data.
3. Do not add new investment advice; judge only what was written.
4. Keep the critique short: a few bullet points, then a one-line verdict.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn record(n: u32) -> Record {
        Record {
            title: format!("Video {}", n),
            channel: "MacroDesk".to_string(),
            main_topic: "Rates".to_string(),
            summary: format!("Summary {}", n),
            evidence: "CPI 3.1%".to_string(),
            validity_check: "cross-checked against FOMC minutes".to_string(),
            sentiment: "cautious".to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn test_context_block_numbers_references() {
        let block = context_block(&[record(1), record(2)]);
        assert!(block.contains("--- [Reference 1] ---"));
        assert!(block.contains("--- [Reference 2] ---"));
        assert!(block.contains("MacroDesk - \"Video 1\""));
        assert!(block.contains("CPI 3.1%"));
    }

    #[test]
    fn test_context_block_omits_critique_only_fields() {
        let block = context_block(&[record(1)]);
        assert!(!block.contains("Validity check"));
        assert!(!block.contains("Sentiment"));
    }

    #[test]
    fn test_critique_block_carries_full_schema() {
        let block = critique_block(&[record(1)]);
        assert!(block.contains("Validity check: cross-checked against FOMC minutes"));
        assert!(block.contains("Sentiment: cautious"));
        assert!(block.contains("Published:"));
    }

    #[test]
    fn test_answer_prompt_embeds_question_and_context() {
        let prompt = answer_prompt("Is gold still a hedge?", "CONTEXT-MARKER");
        assert!(prompt.contains("Is gold still a hedge?"));
        assert!(prompt.contains("CONTEXT-MARKER"));
        assert!(prompt.contains("[Answer Guidelines]"));
    }

    #[test]
    fn test_critique_prompt_embeds_answer() {
        let prompt = critique_prompt("Q", "ANSWER-MARKER", "CTX");
        assert!(prompt.contains("ANSWER-MARKER"));
        assert!(prompt.contains("[Critique Guidelines]"));
    }
}
