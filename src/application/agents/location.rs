//! Location agent - Jack, the location expert.
//!
//! Pipeline-only stage: a single JSON-only call producing key distances,
//! transport options and an average commute time. A non-object answer
//! degrades to an empty object rather than failing the chain.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::domain::Capability;
use crate::ports::{ModelClient, ModelError};

use super::{generate_value, PipelineStage, StageInput};

pub struct LocationAgent {
    client: Arc<dyn ModelClient>,
}

impl LocationAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineStage for LocationAgent {
    fn capability(&self) -> Capability {
        Capability::Location
    }

    async fn run(&self, input: StageInput<'_>) -> Result<Value, ModelError> {
        let properties = serde_json::to_value(&input.context.properties)
            .unwrap_or_else(|_| json!([]));
        let lifestyle_preferences = input
            .upstream
            .get("lifestyle")
            .and_then(|l| l.get("lifestyle_profile"))
            .and_then(|p| p.get("lifestyle_preferences"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let prompt = format!(
            "You are a location analysis expert.\n\n\
             For these properties: {properties}\n\
             Lifestyle preferences: {lifestyle_preferences}\n\n\
             Output JSON ONLY:\n\n\
             {{\n\
                 \"message\": \"Location overview with emojis\",\n\
                 \"key_distances\": {{\n\
                     \"university\": \"0.5 miles\",\n\
                     \"hospital\": \"2 miles\",\n\
                     \"supermarket\": \"0.3 miles\"\n\
                 }},\n\
                 \"transport_options\": [\"Bus\", \"Metro\", \"Bike\"],\n\
                 \"average_commute_time\": \"15 mins\",\n\
                 \"recommendations\": [\"2-3 location recommendations\"]\n\
             }}\n\n\
             Strictly respond in JSON format."
        );

        let response = generate_value(self.client.as_ref(), prompt).await?;
        tracing::debug!("location analysis complete");

        // Anything that isn't an object is useless downstream.
        if response.is_object() && response.get("error").is_none() {
            Ok(response)
        } else {
            Ok(json!({}))
        }
    }
}
