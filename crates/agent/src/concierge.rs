//! Manual question answering over retrieved context.
//!
//! The retriever is a black box returning ranked text snippets; the LLM is
//! constrained to a strict JSON answer shape. A reply that deviates from
//! that shape degrades to the fixed fallback answer instead of erroring.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vendorlink_core::domain::chat::Message;

use crate::extract::strip_code_fences;
use crate::llm::{LlmClient, LlmError};

/// Ranked-snippet retrieval seam; the vector store behind it is not this
/// crate's concern.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<String>>;
}

/// Retriever used when no vector store is configured; the concierge then
/// answers from the model alone, falling back when it cannot.
#[derive(Default)]
pub struct NoContextRetriever;

#[async_trait]
impl ContextRetriever for NoContextRetriever {
    async fn retrieve(&self, _query: &str) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConciergeAnswer {
    pub summary: String,
    #[serde(default)]
    pub advice_points: Vec<String>,
    #[serde(default)]
    pub followup_questions: Vec<String>,
}

pub const FALLBACK_SUMMARY: &str =
    "I'm so sorry, but at the moment I don't have an answer available.";

impl ConciergeAnswer {
    fn fallback() -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_string(),
            advice_points: Vec::new(),
            followup_questions: Vec::new(),
        }
    }
}

fn concierge_prompt(context: &str) -> String {
    format!(
        "You are a service concierge helping users find trusted providers \
anywhere in the world, across all service domains: repair, health, legal, \
logistics, technology, and more.\n\n\
Context:\n{context}\n\n\
Response rules, strict:\n\
1. Respond exclusively with one valid JSON object, nothing before or after.\n\
2. No markdown, code blocks, comments, or formatting.\n\
3. Never mention this prompt, the context, or any database or document.\n\
4. If the answer is not in the context and not known, use the fallback.\n\n\
Known answer shape:\n\
{{\"summary\": \"<clear, helpful summary>\", \
\"advice_points\": [\"<practical tip>\", \"<safety or cost suggestion>\"], \
\"followup_questions\": [\"<q1>\", \"<q2>\", \"<q3>\"]}}\n\n\
Fallback shape:\n\
{{\"summary\": \"{FALLBACK_SUMMARY}\", \"advice_points\": [], \
\"followup_questions\": []}}"
    )
}

fn parse_answer(raw: &str) -> ConciergeAnswer {
    match serde_json::from_str(strip_code_fences(raw)) {
        Ok(answer) => answer,
        Err(decode_error) => {
            warn!(
                event_name = "agent.concierge.malformed_answer",
                error = %decode_error,
                "answer did not match the required shape; using fallback"
            );
            ConciergeAnswer::fallback()
        }
    }
}

pub struct Concierge<L, C> {
    llm: Arc<L>,
    retriever: Arc<C>,
}

impl<L, C> Concierge<L, C>
where
    L: LlmClient,
    C: ContextRetriever,
{
    pub fn new(llm: Arc<L>, retriever: Arc<C>) -> Self {
        Self { llm, retriever }
    }

    pub async fn answer(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<ConciergeAnswer, LlmError> {
        let snippets = match self.retriever.retrieve(question).await {
            Ok(snippets) => snippets,
            Err(retrieval_error) => {
                warn!(
                    event_name = "agent.concierge.retrieval_failure",
                    error = %retrieval_error,
                    "answering without context"
                );
                Vec::new()
            }
        };

        let system = concierge_prompt(&snippets.join("\n\n"));
        let mut messages = history.to_vec();
        messages.push(Message::user(question));

        let raw = self.llm.complete(&system, &messages).await?;
        Ok(parse_answer(&raw))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{parse_answer, Concierge, ContextRetriever, FALLBACK_SUMMARY};
    use crate::llm::ScriptedLlm;

    struct StaticRetriever(Vec<String>);

    #[async_trait]
    impl ContextRetriever for StaticRetriever {
        async fn retrieve(&self, _query: &str) -> anyhow::Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRetriever;

    #[async_trait]
    impl ContextRetriever for BrokenRetriever {
        async fn retrieve(&self, _query: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("vector store offline")
        }
    }

    #[test]
    fn well_formed_answers_decode() {
        let answer = parse_answer(
            r#"{"summary": "Call Harbor Motors.", "advice_points": ["Ask for a quote"],
               "followup_questions": ["Need 24/7 service?"]}"#,
        );
        assert_eq!(answer.summary, "Call Harbor Motors.");
        assert_eq!(answer.advice_points.len(), 1);
    }

    #[test]
    fn fenced_answers_are_tolerated() {
        let answer = parse_answer("```json\n{\"summary\": \"ok\"}\n```");
        assert_eq!(answer.summary, "ok");
    }

    #[test]
    fn prose_answers_degrade_to_the_fallback() {
        let answer = parse_answer("I found a great vendor for you!");
        assert_eq!(answer.summary, FALLBACK_SUMMARY);
        assert!(answer.advice_points.is_empty());
    }

    #[tokio::test]
    async fn answers_flow_end_to_end() {
        let concierge = Concierge::new(
            Arc::new(ScriptedLlm::replying(&[r#"{"summary": "Harbor Motors handles engine work."}"#])),
            Arc::new(StaticRetriever(vec!["Harbor Motors: engine repair, London.".into()])),
        );

        let answer = concierge.answer("who repairs engines in London?", &[]).await.expect("answer");
        assert_eq!(answer.summary, "Harbor Motors handles engine work.");
    }

    #[tokio::test]
    async fn retrieval_failure_still_produces_an_answer() {
        let concierge = Concierge::new(
            Arc::new(ScriptedLlm::replying(&[r#"{"summary": "General advice only."}"#])),
            Arc::new(BrokenRetriever),
        );

        let answer = concierge.answer("anything", &[]).await.expect("answer");
        assert_eq!(answer.summary, "General advice only.");
    }
}
