//! Negotiation agent - Jessica, the master negotiator.
//!
//! Dispatch contract: greeting, then a strategy narrative anchored to the
//! listed price already on record, then a second pass extracting the strategy
//! into a named schema.
//!
//! Pipeline contract: market analysis -> negotiation strategy -> risk and
//! timeline assessment, with the flattened negotiation points surfaced for
//! the legal stage downstream.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Capability, Context, ContextUpdate};
use crate::ports::{ModelClient, ModelError};

use super::{
    extract_structured, generate_text, generate_value, greet, message_of, Agent, AgentCore,
    AgentReply, PipelineStage, StageInput,
};

pub struct NegotiationAgent {
    core: AgentCore,
}

impl NegotiationAgent {
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
        "Generate a friendly, confident greeting from Jessica, the Master Negotiator (use emoji \u{1F4B0}). \
         Make it warm and professional, showing expertise in real estate negotiations. \
         Include a brief mention of helping them get the best deal possible."
            .to_string()
    }

    fn strategy_prompt(&self, prompt: &str, context: &Context) -> String {
        let mut property_details = Vec::new();
        let mut listed_price = None;
        for property in &context.properties {
            listed_price.get_or_insert(property.price.clone());
            property_details.push(format!("Property: {}", property.name));
            property_details.push(format!("Listed Price: {}", property.price));
            if !property.features.is_empty() {
                property_details.push(format!("Key Features: {}", property.features.join(", ")));
            }
            property_details.push(String::new());
        }

        let context_info = if property_details.is_empty() {
            String::new()
        } else {
            format!("Current Property Details:\n{}\n", property_details.join("\n"))
        };
        let anchor = listed_price.unwrap_or_else(|| "the property".to_string());

        format!(
            "As Jessica, a confident Master Negotiator (\u{1F4B0}), create a detailed negotiation strategy:\n\n\
             {context_info}\
             User Request: {prompt}\n\n\
             Create a natural, conversational response that includes:\n\
             1. A brief analysis of the situation\n\
             2. Detailed negotiation strategy including:\n\
                - Market analysis\n\
                - Property value assessment (must be consistent with the listed price of {anchor})\n\
                - Leverage points\n\
                - Specific offer suggestions\n\
                - Counter-offer scenarios\n\
                - Timeline recommendations\n\
             3. A few key negotiation tips\n\
             4. A follow-up question to refine the strategy\n\n\
             Make the response confident but friendly, with occasional light humor.\n\
             Format the strategy clearly but keep it conversational.\n\n\
             Important Notes:\n\
             - Ensure all price discussions are consistent with the listed price of {anchor}\n\
             - Your negotiation strategy should be realistic based on the actual property details provided\n\
             - Generate market insights that align with the property's features and value\n\
             - Don't reference external market data or websites"
        )
    }

    fn extraction_prompt(&self, response: &str) -> String {
        format!(
            "Extract and structure the negotiation strategy from this response into JSON format.\n\
             Include the following sections:\n\
             - market_analysis (object with current_conditions, trends)\n\
             - property_valuation (object with suggested_value, value_factors)\n\
             - negotiation_points (array of key points)\n\
             - offer_strategy (object with initial_offer, counter_scenarios)\n\
             - timeline (array of steps with descriptions)\n\
             - tips (array of negotiation tips)\n\n\
             Response text:\n{response}\n\n\
             Return only the JSON object with the structured strategy."
        )
    }
}

#[async_trait]
impl Agent for NegotiationAgent {
    fn capability(&self) -> Capability {
        Capability::Negotiation
    }

    async fn process(&self, prompt: &str, context: &Context) -> Result<AgentReply, ModelError> {
        let client = self.core.client.as_ref();

        let greeting = greet(client, self.greeting_prompt(), self.core.greeting_pause).await?;

        tracing::debug!("generating negotiation strategy");
        let strategy_response =
            generate_text(client, self.strategy_prompt(prompt, context)).await?;

        let strategy = extract_structured(
            client,
            self.extraction_prompt(&strategy_response),
            &strategy_response,
        )
        .await;

        let facts = match strategy.as_object() {
            Some(map) if strategy.get("parsed") != Some(&json!(false)) => {
                ContextUpdate::negotiation(map.clone())
            }
            _ => ContextUpdate::default(),
        };

        Ok(AgentReply {
            message: format!("{greeting}\n\n{strategy_response}"),
            details: json!({
                "type": "negotiation",
                "greeting_delay": self.core.greeting_pause.as_secs(),
                "strategy": strategy,
            }),
            facts,
        })
    }
}

#[async_trait]
impl PipelineStage for NegotiationAgent {
    fn capability(&self) -> Capability {
        Capability::Negotiation
    }

    async fn run(&self, input: StageInput<'_>) -> Result<Value, ModelError> {
        let client = self.core.client.as_ref();

        let properties = input
            .upstream
            .get("residential")
            .and_then(|r| r.get("initial_search"))
            .and_then(|s| s.get("properties"))
            .cloned()
            .unwrap_or_else(|| json!([]));
        let search_context = input
            .upstream
            .get("residential")
            .and_then(|r| r.get("context"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let market_prompt = format!(
            "Analyze market position for properties:\n{properties}\n\n\
             Search context:\n{search_context}\n\n\
             Return detailed market analysis as JSON:\n\
             {{\n\
                 \"message\": \"Market overview with negotiation joke\",\n\
                 \"market_conditions\": {{\n\
                     \"overall_trend\": \"Market direction with emojis\",\n\
                     \"price_analysis\": [\"3-4 price insights\"],\n\
                     \"competition_level\": \"Buyer/Seller market status\",\n\
                     \"time_on_market\": \"Average days properties are listed\",\n\
                     \"seasonal_factors\": [\"1-2 seasonal impacts\"]\n\
                 }},\n\
                 \"property_positions\": [\n\
                     {{\n\
                         \"name\": \"Property name\",\n\
                         \"list_price\": \"Current price\",\n\
                         \"fair_value\": \"Estimated fair market value\",\n\
                         \"negotiation_margin\": \"Estimated room for negotiation\",\n\
                         \"justification\": [\"2-3 value factors\"]\n\
                     }}\n\
                 ]\n\
             }}"
        );
        let market_analysis = generate_value(client, market_prompt).await?;
        tracing::debug!(message = %message_of(&market_analysis), "market analysis complete");

        let strategy_prompt = format!(
            "Based on market analysis:\n{market_analysis}\n\n\
             Develop negotiation strategies for each property as JSON:\n\
             {{\n\
                 \"message\": \"Strategy overview with emojis\",\n\
                 \"property_strategies\": [\n\
                     {{\n\
                         \"property\": \"Property name\",\n\
                         \"initial_offer\": {{\n\
                             \"amount\": \"Suggested first offer\",\n\
                             \"reasoning\": \"Why this amount\",\n\
                             \"timing\": \"When to make offer\"\n\
                         }},\n\
                         \"negotiation_points\": [\n\
                             {{\n\
                                 \"point\": \"Specific negotiation point\",\n\
                                 \"leverage\": \"How to use this advantage\",\n\
                                 \"fallback\": \"Alternative position\"\n\
                             }}\n\
                         ],\n\
                         \"deal_sweeteners\": [\"2-3 non-price negotiation items\"]\n\
                     }}\n\
                 ],\n\
                 \"general_tactics\": [\"3-4 overall negotiation approaches\"]\n\
             }}"
        );
        let negotiation_strategy = generate_value(client, strategy_prompt).await?;

        let timeline_prompt = format!(
            "For these properties and strategies:\n{negotiation_strategy}\n\n\
             Provide negotiation timeline and risk assessment as JSON:\n\
             {{\n\
                 \"message\": \"Timeline overview with emojis\",\n\
                 \"risk_assessment\": {{\n\
                     \"market_risks\": [\"2-3 market-related risks\"],\n\
                     \"property_risks\": [\"2-3 property-specific risks\"],\n\
                     \"mitigation_strategies\": [\"2-3 risk management approaches\"]\n\
                 }},\n\
                 \"expected_outcomes\": [\n\
                     {{\n\
                         \"property\": \"Property name\",\n\
                         \"best_case\": \"Best possible price\",\n\
                         \"realistic\": \"Most likely outcome\",\n\
                         \"walkaway\": \"Minimum acceptable terms\"\n\
                     }}\n\
                 ],\n\
                 \"timeline\": {{\n\
                     \"preparation\": [\"2-3 preparation steps\"],\n\
                     \"negotiation\": [\"3-4 negotiation phases\"],\n\
                     \"closing\": [\"2-3 closing steps\"]\n\
                 }}\n\
             }}"
        );
        let timeline_and_risks = generate_value(client, timeline_prompt).await?;

        let negotiation_points: Vec<Value> = negotiation_strategy
            .get("property_strategies")
            .and_then(Value::as_array)
            .map(|strategies| {
                strategies
                    .iter()
                    .filter_map(|s| s.get("negotiation_points").and_then(Value::as_array))
                    .flatten()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "introduction": {
                "message": market_analysis.get("message").cloned().unwrap_or_else(|| json!("Let's negotiate! \u{1F4B0}")),
                "market_overview": market_analysis.get("market_conditions").cloned().unwrap_or_else(|| json!({})),
            },
            "analysis": market_analysis,
            "strategy": negotiation_strategy,
            "timeline_and_risks": timeline_and_risks,
            "negotiation_points": negotiation_points,
        }))
    }
}
