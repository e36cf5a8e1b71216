//! Property search agent - Mike, the residential property specialist.
//!
//! Dispatch contract: greeting, then a context-aware search narrative, then a
//! second pass extracting the mentioned properties into a JSON array.
//!
//! Pipeline contract: initial search -> property analysis -> final
//! recommendations, each structured call feeding the next, plus a search
//! criteria extraction recorded as stage context.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Capability, Context, ContextUpdate, PropertyRef};
use crate::ports::{ModelClient, ModelError};

use super::{
    contextualize, extract_structured, generate_text, generate_value, greet, message_of, Agent,
    AgentCore, AgentReply, PipelineStage, StageInput,
};

pub struct PropertySearchAgent {
    core: AgentCore,
}

impl PropertySearchAgent {
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
        "Generate a friendly, slightly humorous greeting from a real estate agent named Mike (use emoji \u{1F3E0}). \
         The greeting should be warm and welcoming, showing enthusiasm to help find the perfect property. \
         Make it sound natural and conversational. Include a question about what they're looking for in a property."
            .to_string()
    }

    fn search_prompt(&self, prompt: &str, context: &Context) -> String {
        let body = format!(
            "As Mike, an enthusiastic real estate agent (\u{1F3E0}), analyze this request and generate a detailed response:\n\n\
             User Request: {prompt}\n\n\
             Create a natural, conversational response that includes:\n\
             1. A brief acknowledgment of their specific needs\n\
             2. 2-3 detailed property suggestions with:\n\
                - Property name and type\n\
                - Price range (maintain consistency with any previously discussed properties)\n\
                - Location and neighborhood\n\
                - Key features and amenities\n\
                - Why this property matches their needs\n\
             3. A follow-up question to refine the search\n\n\
             Make the response friendly and engaging, adding occasional light humor.\n\
             Format properties clearly but keep the tone conversational.\n\n\
             Important Notes:\n\
             - If referring to previously discussed properties, maintain consistency with their details\n\
             - For new properties, ensure price ranges are consistent with similar properties\n\
             - Generate realistic but fictional property details\n\
             - Don't reference external websites or listings\n\
             - If the user is asking about a specific property mentioned before, use those exact details"
        );
        contextualize(&body, context)
    }

    fn extraction_prompt(&self, response: &str) -> String {
        format!(
            "Extract and structure the property information from this response into JSON format.\n\
             Include for each property:\n\
             - name\n\
             - type\n\
             - price\n\
             - location\n\
             - features (as an array)\n\
             - match_reasons (as an array)\n\n\
             Response text:\n{response}\n\n\
             Return only the JSON array of properties."
        )
    }
}

#[async_trait]
impl Agent for PropertySearchAgent {
    fn capability(&self) -> Capability {
        Capability::PropertySearch
    }

    async fn process(&self, prompt: &str, context: &Context) -> Result<AgentReply, ModelError> {
        let client = self.core.client.as_ref();

        let greeting = greet(client, self.greeting_prompt(), self.core.greeting_pause).await?;

        tracing::debug!("generating property search response");
        let search_response =
            generate_text(client, self.search_prompt(prompt, context)).await?;

        let properties = extract_structured(
            client,
            self.extraction_prompt(&search_response),
            &search_response,
        )
        .await;

        let facts = ContextUpdate::properties(
            properties
                .as_array()
                .map(|items| items.iter().filter_map(PropertyRef::from_value).collect())
                .unwrap_or_default(),
        );

        Ok(AgentReply {
            message: format!("{greeting}\n\n{search_response}"),
            details: json!({
                "type": "property_search",
                "greeting_delay": self.core.greeting_pause.as_secs(),
                "properties": properties,
            }),
            facts,
        })
    }
}

#[async_trait]
impl PipelineStage for PropertySearchAgent {
    fn capability(&self) -> Capability {
        Capability::PropertySearch
    }

    async fn run(&self, input: StageInput<'_>) -> Result<Value, ModelError> {
        let client = self.core.client.as_ref();
        let user_message = input.user_message;

        let search_prompt = contextualize(
            &format!(
                "Analyze this property request and generate initial property matches:\n\
                 \"\"\"\n{user_message}\n\"\"\"\n\
                 Return as JSON with:\n\
                 {{\n\
                     \"message\": \"Engaging welcome and initial findings\",\n\
                     \"properties\": [\n\
                         {{\n\
                             \"name\": \"Unique property name\",\n\
                             \"description\": \"Vivid property description\",\n\
                             \"price\": \"Formatted price\",\n\
                             \"key_features\": [\"3-5 standout features\"],\n\
                             \"location\": \"Specific neighborhood/area\"\n\
                         }}\n\
                     ]\n\
                 }}"
            ),
            input.context,
        );
        let initial_search = generate_value(client, search_prompt).await?;
        tracing::debug!(message = %message_of(&initial_search), "initial search complete");

        let properties = initial_search
            .get("properties")
            .cloned()
            .unwrap_or_else(|| json!([]));

        let analysis_prompt = format!(
            "Given these properties and request:\n\
             Properties: {properties}\n\
             Request: {user_message}\n\n\
             Analyze fit and provide insights as JSON:\n\
             {{\n\
                 \"message\": \"Analysis overview with emojis\",\n\
                 \"property_insights\": [\n\
                     {{\n\
                         \"name\": \"Property name\",\n\
                         \"strengths\": [\"2-3 strong points\"],\n\
                         \"concerns\": [\"1-2 potential issues\"],\n\
                         \"buyer_fit_score\": \"1-10 score with explanation\"\n\
                     }}\n\
                 ],\n\
                 \"market_analysis\": {{\n\
                     \"trends\": [\"2-3 relevant market trends\"],\n\
                     \"opportunities\": [\"1-2 unique advantages\"],\n\
                     \"risks\": [\"1-2 factors to consider\"]\n\
                 }}\n\
             }}"
        );
        let analysis = generate_value(client, analysis_prompt).await?;

        let recommendations_prompt = format!(
            "Based on analysis:\n\
             Analysis: {analysis}\n\
             Initial Properties: {properties}\n\n\
             Provide final recommendations as JSON:\n\
             {{\n\
                 \"message\": \"Final recommendation summary with emojis\",\n\
                 \"top_picks\": [\n\
                     {{\n\
                         \"name\": \"Property name\",\n\
                         \"features\": [\"Key features\"],\n\
                         \"price\": \"Formatted price\",\n\
                         \"availability\": \"Current status\",\n\
                         \"highlight\": \"Standout selling point\",\n\
                         \"why_recommended\": \"Personalized explanation\"\n\
                     }}\n\
                 ],\n\
                 \"next_steps\": [\"2-3 suggested actions\"],\n\
                 \"timeline\": \"Estimated viewing/purchase timeline\"\n\
             }}"
        );
        let recommendations = generate_value(client, recommendations_prompt).await?;

        let criteria_prompt = format!(
            "Extract key search criteria from:\n\
             \"\"\"\n{user_message}\n\"\"\"\n\n\
             Return as JSON:\n\
             {{\n\
                 \"budget_range\": \"Extracted or inferred budget\",\n\
                 \"location_preferences\": [\"Areas mentioned or implied\"],\n\
                 \"must_have_features\": [\"Required features\"],\n\
                 \"nice_to_have_features\": [\"Desired but not required\"],\n\
                 \"deal_breakers\": [\"Absolute no-gos\"]\n\
             }}"
        );
        let search_criteria = generate_value(client, criteria_prompt).await?;

        Ok(json!({
            "initial_search": initial_search,
            "analysis": analysis,
            "final_recommendations": recommendations,
            "context": {
                "user_requirements": user_message,
                "search_criteria": search_criteria,
            },
        }))
    }
}
