//! Contract agent - Robert in his legal advisor role.
//!
//! Pipeline-only stage: an opening legal message, the key legal points, the
//! documents and legal timeline, and per-property key terms. The model often
//! answers list questions as plain text; those answers are line-split rather
//! than rejected.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::domain::{Capability, ContextUpdate};
use crate::ports::{ModelClient, ModelError};

use super::{generate_value, message_of, PipelineStage, StageInput};

pub struct ContractAgent {
    client: Arc<dyn ModelClient>,
}

impl ContractAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    fn persona_preamble(&self, input: &StageInput<'_>) -> String {
        let negotiation_points = input
            .upstream
            .get("bargain")
            .and_then(|b| b.get("negotiation_points"))
            .cloned()
            .unwrap_or_else(|| json!([]));

        format!(
            "You are Robert, a friendly legal eagle (\u{2696}\u{FE0F}) advising on fictional residential purchases. \
             You simplify contracts and throw in a lawyer joke or two.\n\
             Negotiation points agreed so far: {negotiation_points}\n"
        )
    }
}

#[async_trait]
impl PipelineStage for ContractAgent {
    fn capability(&self) -> Capability {
        Capability::Legal
    }

    async fn run(&self, input: StageInput<'_>) -> Result<Value, ModelError> {
        let client = self.client.as_ref();
        let preamble = self.persona_preamble(&input);

        let opening = generate_value(
            client,
            format!(
                "{preamble}\n\
                 As a legal expert, provide an initial message about reviewing the properties.\n\
                 Return as JSON: {{ \"message\": \"Friendly opening with a light lawyer joke\" }}"
            ),
        )
        .await?;
        tracing::debug!(message = %message_of(&opening), "legal review opened");

        let points = generate_value(
            client,
            format!(
                "{preamble}\n\
                 Provide a list of key legal points to consider for these properties.\n\
                 Return as JSON: {{ \"points\": [\"4-6 key legal points\"] }}"
            ),
        )
        .await?;

        let documents = generate_value(
            client,
            format!(
                "{preamble}\n\
                 List the essential documents needed for the purchase process, and a timeline of the legal process.\n\
                 Return as JSON: {{ \"documents_needed\": [\"documents\"], \"legal_timeline\": [\"timeline steps\"] }}"
            ),
        )
        .await?;

        let mut contracts = Vec::new();
        for property in &input.context.properties {
            let terms_prompt = format!(
                "{preamble}\n\
                 Provide key legal terms for the property '{name}' with price {price}. \
                 Include deposit, lease term, inspection period, notice period, pet policy, and utilities information.\n\
                 Return as JSON: {{ \"deposit\": \"...\", \"lease_term\": \"...\", \"inspection_period\": \"...\", \
                 \"notice_period\": \"...\", \"pet_policy\": \"...\", \"utilities\": \"...\" }}",
                name = property.name,
                price = property.price,
            );
            let terms_response = generate_value(client, terms_prompt).await?;
            contracts.push(json!({
                "property": property.name,
                "key_terms": parse_key_terms(&terms_response),
            }));
        }

        Ok(json!({
            "initial_search": {
                "message": message_of(&opening),
                "contracts": contracts,
            },
            "analysis": {
                "message": "\u{1F4CB} Here are the key legal points to consider:",
                "points": as_list(points.get("points").unwrap_or(&points)),
            },
            "final_recommendations": {
                "message": "\u{2696}\u{FE0F} Here's my legal assessment and recommendations:",
                "documents_needed": as_list(documents.get("documents_needed").unwrap_or(&documents)),
                "legal_timeline": as_list(documents.get("legal_timeline").unwrap_or(&json!([]))),
            },
        }))
    }
}

/// Normalizes a list answer: arrays pass through, free text is line-split.
fn as_list(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::String(text) => json!(text.lines().map(str::to_string).collect::<Vec<_>>()),
        Value::Object(obj) => {
            // The coercer's {text, error} fallback carries the raw answer.
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                json!(text.lines().map(str::to_string).collect::<Vec<_>>())
            } else {
                value.clone()
            }
        }
        _ => json!([]),
    }
}

/// Normalizes a key-terms answer: objects pass through, "key: value" lines
/// become map entries.
fn parse_key_terms(value: &Value) -> Value {
    if let Some(obj) = value.as_object() {
        if !obj.contains_key("error") {
            return value.clone();
        }
        if let Some(text) = obj.get("text").and_then(Value::as_str) {
            return Value::Object(terms_from_lines(text));
        }
    }
    if let Some(text) = value.as_str() {
        return Value::Object(terms_from_lines(text));
    }
    json!({})
}

fn terms_from_lines(text: &str) -> Map<String, Value> {
    let mut terms = Map::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            terms.insert(
                key.trim().to_lowercase().replace(' ', "_"),
                json!(value.trim()),
            );
        }
    }
    terms
}

/// The legal facts this stage contributes to shared context.
pub fn legal_facts(output: &Value) -> ContextUpdate {
    let mut closing = Map::new();
    if let Some(recommendations) = output.get("final_recommendations") {
        if let Some(documents) = recommendations.get("documents_needed") {
            closing.insert("documents_needed".to_string(), documents.clone());
        }
        if let Some(timeline) = recommendations.get("legal_timeline") {
            closing.insert("legal_timeline".to_string(), timeline.clone());
        }
    }
    if closing.is_empty() {
        ContextUpdate::default()
    } else {
        ContextUpdate::closing(closing)
    }
}
