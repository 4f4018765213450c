//! The per-turn conversational state machine.
//!
//! `Agent → {CallTool, Clarify} → Summarize | End`, acyclic. Each turn
//! consumes exactly one user message and produces exactly one assistant
//! message; a malformed LLM reply routes to clarification instead of being
//! retried.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, info};
use vendorlink_core::domain::chat::Message;
use vendorlink_core::filters::ALLOWED_FILTERS;
use vendorlink_core::outcome::{QueryError, QueryOutcome};
use vendorlink_db::VendorRepository;

use crate::executor::VendorQueryExecutor;
use crate::llm::LlmClient;
use crate::session::SessionStore;

/// Fixed instruction for the intent-extraction step. The LLM may emit one
/// JSON object and nothing else.
pub const SYSTEM_PROMPT: &str = "\
You are a vendor lookup assistant. Convert the user's latest request into a \
vendor table query. Respond with exactly one JSON object of the form \
{\"query\": {...}} where the inner object uses only these field names: \
services, cities, countries, company, name. Each value is a string or a \
list of strings. Omit fields the user did not mention. If no filter can be \
extracted from the conversation, respond with {\"query\": {}}. Output \
nothing except the JSON object: no prose, no code fences, no comments.";

/// Terminal clarification reply; the database is never touched on this path.
pub const CLARIFY_MESSAGE: &str = "Could you tell me a bit more about what \
you're looking for? For example the services you need, or the cities or \
countries where you need them.";

/// Reply when the LLM itself cannot be reached; the turn still completes.
pub const LLM_UNAVAILABLE_MESSAGE: &str =
    "I'm having trouble processing your request right now. Please try again shortly.";

#[derive(Debug, Deserialize)]
struct IntentEnvelope {
    query: Map<String, Value>,
}

#[derive(Debug)]
enum Route {
    CallTool(Map<String, Value>),
    Clarify,
}

/// Deterministic routing decision over the LLM's last message. Anything
/// other than a JSON object with a non-empty `query` mapping clarifies.
fn route(llm_output: &str) -> Route {
    match serde_json::from_str::<IntentEnvelope>(llm_output) {
        Ok(envelope) if !envelope.query.is_empty() => Route::CallTool(envelope.query),
        _ => Route::Clarify,
    }
}

/// Maps a lookup outcome onto the single user-facing summary string.
fn summarize(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Error(QueryError::MissingFilters) => {
            format!("I'll need more details. Could you provide: {}", ALLOWED_FILTERS.join(", "))
        }
        QueryOutcome::Error(QueryError::InvalidFilters { rejected }) => format!(
            "Some filters were invalid: {}. Allowed filters are: {}.",
            rejected.join(", "),
            ALLOWED_FILTERS.join(", ")
        ),
        QueryOutcome::Error(QueryError::ForbiddenKeyword { value }) => format!(
            "Warning: your input contained a forbidden keyword ({value}). Please rephrase safely."
        ),
        QueryOutcome::Error(QueryError::Parsing { .. }) => {
            "Sorry, I couldn't make sense of that request. Please try rephrasing it.".to_string()
        }
        QueryOutcome::Error(QueryError::Db { .. }) => {
            "Sorry, something went wrong while looking up vendors. Please try again later."
                .to_string()
        }
        QueryOutcome::Results(records) if records.is_empty() => {
            "No vendors found with your filters.".to_string()
        }
        QueryOutcome::Results(records) => records
            .iter()
            .take(5)
            .map(|vendor| {
                format!(
                    "{} ({}) - Services: {} - City: {} - Country: {} - Contact: {}",
                    vendor.name,
                    vendor.company,
                    vendor.services.join(", "),
                    vendor.cities.join(", "),
                    vendor.countries.join(", "),
                    vendor.contact.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub struct TurnOutput {
    pub response: String,
    pub history: Vec<Message>,
}

/// Orchestrates one conversational turn per call. Sessions serialize their
/// own turns; distinct sessions run concurrently.
pub struct AgentGraph<L, R> {
    llm: Arc<L>,
    executor: VendorQueryExecutor<R>,
    sessions: Arc<SessionStore>,
}

impl<L, R> AgentGraph<L, R>
where
    L: LlmClient,
    R: VendorRepository,
{
    pub fn new(llm: Arc<L>, repository: Arc<R>, sessions: Arc<SessionStore>) -> Self {
        Self { llm, executor: VendorQueryExecutor::new(repository), sessions }
    }

    /// Runs one full turn: intent extraction, routing, optional lookup,
    /// summary. History is committed only once the turn has produced its
    /// assistant message, so a cancelled turn leaves the session unchanged.
    pub async fn handle_turn(&self, session_id: &str, user_message: &str) -> TurnOutput {
        let entry = self.sessions.checkout(session_id).await;
        let mut session = entry.lock().await;

        let user = Message::user(user_message);
        let mut context = session.snapshot();
        context.push(user.clone());
        let mut turn_messages = vec![user];

        let response = match self.llm.complete(SYSTEM_PROMPT, &context).await {
            Err(llm_error) => {
                error!(
                    event_name = "agent.graph.llm_failure",
                    session_id = %session_id,
                    error = %llm_error,
                    "intent extraction failed"
                );
                LLM_UNAVAILABLE_MESSAGE.to_string()
            }
            Ok(llm_output) => match route(&llm_output) {
                Route::Clarify => {
                    info!(
                        event_name = "agent.graph.clarify",
                        session_id = %session_id,
                        "no extractable filter; asking for details"
                    );
                    CLARIFY_MESSAGE.to_string()
                }
                Route::CallTool(raw_filters) => {
                    let outcome = self.executor.run(&raw_filters).await;
                    let payload = serde_json::to_value(&outcome).ok();
                    turn_messages.push(Message::tool("vendor lookup executed", payload));
                    summarize(&outcome)
                }
            },
        };

        turn_messages.push(Message::assistant(response.as_str()));
        session.commit_turn(turn_messages);

        TurnOutput { response, history: session.snapshot() }
    }
}
