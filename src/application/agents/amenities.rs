//! Amenities agent - Emma, the amenities research specialist.
//!
//! Greeting, then a neighborhood amenities narrative, then a second pass
//! extracting amenities grouped by category.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::context::collect_amenities;
use crate::domain::{Capability, Context, ContextUpdate};
use crate::ports::{ModelClient, ModelError};

use super::{contextualize, extract_structured, generate_text, greet, Agent, AgentCore, AgentReply};

pub struct AmenitiesAgent {
    core: AgentCore,
}

impl AmenitiesAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            core: AgentCore::new(client),
        }
    }

    pub fn with_greeting_pause(mut self, pause: Duration) -> Self {
        self.core = self.core.with_greeting_pause(pause);
        self
    }

    fn greeting_prompt(&self) -> String {
        "Generate a friendly, enthusiastic greeting from Emma, the Amenities Research Specialist (use emoji \u{1F31F}). \
         Make it warm and engaging, showing excitement to explore the neighborhood amenities. \
         Include a brief mention of helping them discover what's nearby."
            .to_string()
    }

    fn amenities_prompt(&self, prompt: &str, context: &Context) -> String {
        let body = format!(
            "As Emma, an enthusiastic Amenities Research Specialist (\u{1F31F}), create a detailed response about neighborhood amenities:\n\n\
             User Request: {prompt}\n\n\
             Create a natural, conversational response that includes:\n\
             1. A brief acknowledgment of their specific interests\n\
             2. Detailed information about nearby amenities within 5 miles, including:\n\
                - Shopping and dining\n\
                - Schools and education\n\
                - Parks and recreation\n\
                - Transportation\n\
                - Healthcare facilities\n\
                - Entertainment options\n\
             3. A few specific recommendations with approximate distances\n\
             4. A follow-up question about specific amenities they're most interested in\n\n\
             Make the response friendly and engaging, with occasional light humor.\n\
             Format the information clearly but keep it conversational.\n\
             Include realistic but fictional details about local amenities.\n\n\
             Important: Generate new, unique amenities each time. Don't reference real places or websites."
        );
        contextualize(&body, context)
    }

    fn extraction_prompt(&self, response: &str) -> String {
        format!(
            "Extract and structure the amenities information from this response into JSON format.\n\
             Group amenities by category:\n\
             - shopping_dining\n\
             - education\n\
             - parks_recreation\n\
             - transportation\n\
             - healthcare\n\
             - entertainment\n\n\
             For each amenity include:\n\
             - name\n\
             - type\n\
             - distance (approximate)\n\
             - description\n\n\
             Response text:\n{response}\n\n\
             Return only the JSON object with categorized amenities."
        )
    }
}

#[async_trait]
impl Agent for AmenitiesAgent {
    fn capability(&self) -> Capability {
        Capability::Amenities
    }

    async fn process(&self, prompt: &str, context: &Context) -> Result<AgentReply, ModelError> {
        let client = self.core.client.as_ref();

        let greeting = greet(client, self.greeting_prompt(), self.core.greeting_pause).await?;

        tracing::debug!("generating amenities response");
        let amenities_response =
            generate_text(client, self.amenities_prompt(prompt, context)).await?;

        let amenities = extract_structured(
            client,
            self.extraction_prompt(&amenities_response),
            &amenities_response,
        )
        .await;

        let facts = ContextUpdate::amenities(collect_amenities(&amenities));

        Ok(AgentReply {
            message: format!("{greeting}\n\n{amenities_response}"),
            details: json!({
                "type": "amenities",
                "greeting_delay": self.core.greeting_pause.as_secs(),
                "amenities": amenities,
            }),
            facts,
        })
    }
}
