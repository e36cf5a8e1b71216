//! Role-specialized agents.
//!
//! Every agent is a thin orchestration of staged model calls: persona text in,
//! free-form model text out, coerced into structure on the way back. Two
//! contracts exist, mirroring the two orchestration designs:
//!
//! - [`Agent::process`] - dispatch contract: an optional greeting call, a
//!   substantive context-aware call, then a second-pass extraction call that
//!   asks the model to reshape its own answer into a named JSON schema.
//! - [`PipelineStage::run`] - pipeline contract: 1-3 chained structured
//!   calls, each later prompt embedding the earlier call's coerced output.
//!
//! A failed model call aborts the whole chain; only the extraction second
//! pass recovers locally, with the documented `{response_text, parsed: false}`
//! record. Nothing here retries.

mod amenities;
mod closing;
mod contract;
mod lifestyle;
mod location;
mod negotiation;
mod search;

pub use amenities::AmenitiesAgent;
pub use closing::ClosingAgent;
pub use contract::{legal_facts, ContractAgent};
pub use lifestyle::{lifestyle_facts, LifestyleAgent};
pub use location::LocationAgent;
pub use negotiation::NegotiationAgent;
pub use search::PropertySearchAgent;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::coercion;
use crate::domain::{AgentProfile, Capability, Context, ContextUpdate};
use crate::ports::{GenerationRequest, ModelClient, ModelError};

/// Structured outcome of one dispatch-mode agent invocation.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Human-readable message (greeting plus substantive reply).
    pub message: String,
    /// Structured details accompanying the message.
    pub details: Value,
    /// New facts to fold into conversation context.
    pub facts: ContextUpdate,
}

/// Dispatch contract: one request-scoped invocation of a specialist.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The capability tag this agent is invoked under.
    fn capability(&self) -> Capability;

    /// The persona identity for transcript entries.
    fn profile(&self) -> &'static AgentProfile {
        crate::domain::profile_for(self.capability())
    }

    /// Runs the agent's staged chain for one user prompt.
    async fn process(&self, prompt: &str, context: &Context) -> Result<AgentReply, ModelError>;
}

/// Input to one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// The original user request.
    pub user_message: &'a str,
    /// Context filtered for this stage's capability.
    pub context: &'a Context,
    /// Structured outputs of the stages that already ran, keyed by stage.
    pub upstream: &'a Map<String, Value>,
}

/// Pipeline contract: one stage of the fixed team chain.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// The capability tag this stage is addressed by.
    fn capability(&self) -> Capability;

    /// The persona identity for transcript entries.
    fn profile(&self) -> &'static AgentProfile {
        crate::domain::profile_for(self.capability())
    }

    /// Runs the stage's chained calls and returns its structured output.
    async fn run(&self, input: StageInput<'_>) -> Result<Value, ModelError>;
}

/// Issues one model call and returns the raw text.
pub(crate) async fn generate_text(
    client: &dyn ModelClient,
    prompt: String,
) -> Result<String, ModelError> {
    let completion = client.complete(GenerationRequest::new(prompt)).await?;
    Ok(completion.text.trim().to_string())
}

/// Issues one model call and coerces the answer into JSON.
pub(crate) async fn generate_value(
    client: &dyn ModelClient,
    prompt: String,
) -> Result<Value, ModelError> {
    let completion = client.complete(GenerationRequest::new(prompt)).await?;
    Ok(coercion::coerce(completion.text.trim()))
}

/// Second-pass extraction: asks the model to reshape its own prior answer
/// into a named JSON schema.
///
/// This step never propagates: a call failure or unparseable answer yields
/// the documented `{response_text, parsed: false}` record, and the chain
/// moves on without retrying.
pub(crate) async fn extract_structured(
    client: &dyn ModelClient,
    extraction_prompt: String,
    raw_response: &str,
) -> Value {
    match client.complete(GenerationRequest::new(extraction_prompt)).await {
        Ok(completion) => {
            let value = coercion::coerce(completion.text.trim());
            if coercion::is_fallback(&value) {
                unparsed_fallback(raw_response)
            } else {
                value
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "extraction pass failed; returning unparsed fallback");
            unparsed_fallback(raw_response)
        }
    }
}

/// The documented record for a failed extraction pass.
pub(crate) fn unparsed_fallback(raw_response: &str) -> Value {
    json!({ "response_text": raw_response, "parsed": false })
}

/// Generates the persona greeting, then applies the presentational pause.
///
/// The pause is an explicit parameter so tests run with `Duration::ZERO`.
pub(crate) async fn greet(
    client: &dyn ModelClient,
    greeting_prompt: String,
    pause: Duration,
) -> Result<String, ModelError> {
    let greeting = generate_text(client, greeting_prompt).await?;
    if !pause.is_zero() {
        sleep(pause).await;
    }
    Ok(greeting)
}

/// Renders accumulated context into the prompt block every context-aware call
/// is prefixed with. Returns `None` when there is nothing on record.
pub(crate) fn format_context(context: &Context) -> Option<String> {
    if context.is_empty() {
        return None;
    }

    let mut lines: Vec<String> = Vec::new();

    for property in &context.properties {
        lines.push(format!("Property: {}", property.name));
        lines.push(format!("Price: {}", property.price));
        lines.push(format!(
            "Location: {}",
            property.location.as_deref().unwrap_or("Not specified")
        ));
        if !property.features.is_empty() {
            lines.push(format!("Features: {}", property.features.join(", ")));
        }
        lines.push(String::new());
    }

    if !context.amenities.is_empty() {
        lines.push("Nearby Amenities:".to_string());
        for amenity in &context.amenities {
            lines.push(format!(
                "- {} ({})",
                amenity.name,
                amenity.distance.as_deref().unwrap_or("nearby")
            ));
        }
        lines.push(String::new());
    }

    if !context.negotiation.is_empty() {
        lines.push("Negotiation Details:".to_string());
        lines.push(Value::Object(context.negotiation.clone()).to_string());
        lines.push(String::new());
    }

    if !context.closing.is_empty() {
        lines.push("Closing Details:".to_string());
        lines.push(Value::Object(context.closing.clone()).to_string());
        lines.push(String::new());
    }

    Some(lines.join("\n"))
}

/// Wraps a prompt with the context block and the consistency instruction.
///
/// With no context on record the prompt passes through unchanged.
pub(crate) fn contextualize(prompt: &str, context: &Context) -> String {
    match format_context(context) {
        None => prompt.to_string(),
        Some(block) => format!(
            "Previous Context:\n{block}\n\nCurrent Request:\n{prompt}\n\n\
             Important: Ensure your response maintains consistency with the previous context, especially regarding:\n\
             - Property prices and details\n\
             - Location information\n\
             - Amenities mentioned\n\
             - Any negotiation points or terms discussed\n\n\
             Your response:"
        ),
    }
}

/// Pulls the human-readable message out of a coerced stage answer.
///
/// Objects yield their `message` field; the coercer's `{text, error}`
/// fallback yields the original text; anything else is rendered compactly.
pub(crate) fn message_of(value: &Value) -> String {
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shared constructor state for every agent.
#[derive(Clone)]
pub(crate) struct AgentCore {
    pub client: Arc<dyn ModelClient>,
    pub greeting_pause: Duration,
}

impl AgentCore {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            greeting_pause: Duration::ZERO,
        }
    }

    pub fn with_greeting_pause(mut self, pause: Duration) -> Self {
        self.greeting_pause = pause;
        self
    }
}
