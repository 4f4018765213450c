//! Structured vendor extraction from manual text.
//!
//! Ingestion splits a PDF into text chunks elsewhere; this step asks the
//! LLM to pull the vendor fields out of those chunks and strictly decodes
//! the reply into a `VendorDraft`.

use std::sync::Arc;

use thiserror::Error;
use vendorlink_core::domain::chat::Message;
use vendorlink_core::domain::vendor::VendorDraft;

use crate::llm::{LlmClient, LlmError};

pub const EXTRACTION_PROMPT: &str = "\
You are an information extractor. Extract the following fields from the \
given text:\n\
- name: the person's name\n\
- company: the company or business name\n\
- services: services provided by the person or company\n\
- description: important details related to the services\n\
- contact: valid phone numbers only, never address fragments such as \
pincodes, sector numbers, or house numbers\n\
- email: email addresses\n\
- addresses: full service addresses including house or shop number, sector, \
and pincode\n\
- cities: cities where service is provided\n\
- countries: countries where service is provided\n\n\
Return output only as one JSON object with exactly those keys; name, \
company, and description are strings or null, all other fields are lists \
of strings. No prose and no code fences.";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("extractor returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no text supplied for extraction")]
    EmptyInput,
}

/// Trims a leading/trailing Markdown code fence if the model added one
/// despite instructions.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub struct VendorExtractor<L> {
    llm: Arc<L>,
}

impl<L> VendorExtractor<L>
where
    L: LlmClient,
{
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }

    pub async fn extract(&self, chunks: &[String]) -> Result<VendorDraft, ExtractError> {
        let text = chunks.join("\n");
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }

        let raw = self.llm.complete(EXTRACTION_PROMPT, &[Message::user(text)]).await?;
        Ok(serde_json::from_str(strip_code_fences(&raw))?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{strip_code_fences, ExtractError, VendorExtractor};
    use crate::llm::ScriptedLlm;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn drafts_decode_from_the_reply() {
        let extractor = VendorExtractor::new(Arc::new(ScriptedLlm::replying(&[r#"{
            "name": "Jan Visser",
            "company": "Harbor Motors",
            "services": ["engine repair"],
            "description": "Marine engine specialist",
            "contact": ["+31 10 555 0101"],
            "email": ["jan@harbormotors.example"],
            "addresses": ["Dock 4, Rotterdam"],
            "cities": ["Rotterdam"],
            "countries": ["Netherlands"]
        }"#])));

        let draft = extractor
            .extract(&["Harbor Motors, Jan Visser, engine repair...".to_string()])
            .await
            .expect("extract");

        assert_eq!(draft.name.as_deref(), Some("Jan Visser"));
        assert_eq!(draft.cities, vec!["Rotterdam".to_string()]);
    }

    #[tokio::test]
    async fn malformed_replies_are_typed_errors() {
        let extractor =
            VendorExtractor::new(Arc::new(ScriptedLlm::replying(&["not json at all"])));
        let error = extractor.extract(&["some text".to_string()]).await.expect_err("must fail");
        assert!(matches!(error, ExtractError::Malformed(_)));
    }

    #[tokio::test]
    async fn empty_input_is_refused_before_any_llm_call() {
        let extractor = VendorExtractor::new(Arc::new(ScriptedLlm::default()));
        let error = extractor.extract(&[String::new()]).await.expect_err("must fail");
        assert!(matches!(error, ExtractError::EmptyInput));
    }
}
