//! Agent runtime - intent routing and tool orchestration for vendor lookups
//!
//! This crate is the "brain" of the vendorlink system:
//! - Converts free-text user messages into structured vendor filters via the
//!   LLM (`graph`)
//! - Validates and screens those filters, then runs a bounded vendor lookup
//!   (`executor`)
//! - Keeps per-session conversation history with serialized turns (`session`)
//! - Answers manual questions from retrieved context (`concierge`)
//! - Extracts structured vendor drafts from manual text (`extract`)
//!
//! # Architecture
//!
//! Each turn walks a small acyclic state machine:
//! 1. **Agent** - history + fixed instruction → one JSON intent object
//! 2. **Route** - deterministic parse; malformed output clarifies, it never
//!    retries
//! 3. **CallTool** - validated filters → bounded store lookup
//! 4. **Summarize** - tagged outcome → one user-facing string
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. Field names used in query construction
//! come only from the fixed allow-list, and every value passes the
//! forbidden-keyword screen before the store sees it. Parameter binding at
//! the repository is the primary injection defense; the screen is the
//! second layer.

pub mod concierge;
pub mod executor;
pub mod extract;
pub mod graph;
pub mod llm;
pub mod session;

pub use executor::VendorQueryExecutor;
pub use graph::{AgentGraph, TurnOutput};
pub use llm::{LlmClient, LlmError, OpenAiCompatClient};
pub use session::SessionStore;
