//! Lifestyle agent - Emma in her lifestyle consultant role.
//!
//! Pipeline-only stage: lifestyle profile -> property lifestyle match ->
//! recommendations, with the matched amenities surfaced per property for the
//! location stage and shared context.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::domain::context::collect_amenities;
use crate::domain::{Capability, ContextUpdate};
use crate::ports::{ModelClient, ModelError};

use super::{generate_value, message_of, PipelineStage, StageInput};

pub struct LifestyleAgent {
    client: Arc<dyn ModelClient>,
}

impl LifestyleAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineStage for LifestyleAgent {
    fn capability(&self) -> Capability {
        Capability::Lifestyle
    }

    async fn run(&self, input: StageInput<'_>) -> Result<Value, ModelError> {
        let client = self.client.as_ref();

        let user_requirements = input
            .upstream
            .get("residential")
            .and_then(|r| r.get("context"))
            .and_then(|c| c.get("user_requirements"))
            .and_then(Value::as_str)
            .unwrap_or(input.user_message);

        let profile_prompt = format!(
            "Based on user requirements:\n{user_requirements}\n\n\
             Create lifestyle profile as JSON:\n\
             {{\n\
                 \"message\": \"Lifestyle overview with emojis\",\n\
                 \"lifestyle_preferences\": {{\n\
                     \"activity_level\": \"Active/Moderate/Relaxed\",\n\
                     \"social_style\": \"Social butterfly/Balanced/Private\",\n\
                     \"daily_routine\": [\"3-4 typical daily activities\"],\n\
                     \"weekend_interests\": [\"2-3 weekend activities\"],\n\
                     \"important_factors\": [\"3-4 lifestyle priorities\"]\n\
                 }},\n\
                 \"community_needs\": [\"4-5 community features needed\"]\n\
             }}"
        );
        let lifestyle_profile = generate_value(client, profile_prompt).await?;
        tracing::debug!(message = %message_of(&lifestyle_profile), "lifestyle profile built");

        let properties = input
            .upstream
            .get("residential")
            .and_then(|r| r.get("initial_search"))
            .and_then(|s| s.get("properties"))
            .cloned()
            .unwrap_or_else(|| json!([]));

        let match_prompt = format!(
            "Analyze lifestyle fit for properties:\n{properties}\n\n\
             Based on profile:\n{lifestyle_profile}\n\n\
             Return as JSON:\n\
             {{\n\
                 \"message\": \"Lifestyle match overview with emojis\",\n\
                 \"property_matches\": [\n\
                     {{\n\
                         \"property\": \"Property name\",\n\
                         \"lifestyle_score\": \"1-10 with explanation\",\n\
                         \"perfect_for\": [\"2-3 ideal lifestyle aspects\"],\n\
                         \"challenges\": [\"1-2 lifestyle challenges\"],\n\
                         \"nearby_amenities\": {{\n\
                             \"dining\": [\"2-3 restaurant types/names\"],\n\
                             \"fitness\": [\"2-3 fitness options\"],\n\
                             \"shopping\": [\"2-3 shopping venues\"],\n\
                             \"entertainment\": [\"2-3 entertainment options\"],\n\
                             \"outdoors\": [\"2-3 outdoor spaces\"]\n\
                         }},\n\
                         \"community_vibe\": \"Neighborhood atmosphere description\"\n\
                     }}\n\
                 ]\n\
             }}"
        );
        let property_matches = generate_value(client, match_prompt).await?;

        let recommendations_prompt = format!(
            "Based on lifestyle matches:\n{property_matches}\n\n\
             Provide lifestyle recommendations as JSON:\n\
             {{\n\
                 \"message\": \"Recommendations overview with emojis\",\n\
                 \"top_lifestyle_picks\": [\n\
                     {{\n\
                         \"property\": \"Property name\",\n\
                         \"why_perfect\": \"Lifestyle fit explanation\",\n\
                         \"local_gems\": [\"3-4 hidden neighborhood treasures\"],\n\
                         \"lifestyle_tips\": [\"2-3 tips to maximize location\"],\n\
                         \"community_integration\": [\"2-3 ways to connect with neighbors\"]\n\
                     }}\n\
                 ],\n\
                 \"seasonal_activities\": {{\n\
                     \"spring\": [\"2-3 activities\"],\n\
                     \"summer\": [\"2-3 activities\"],\n\
                     \"fall\": [\"2-3 activities\"],\n\
                     \"winter\": [\"2-3 activities\"]\n\
                 }},\n\
                 \"quality_of_life\": {{\n\
                     \"work_life_balance\": \"How location supports balance\",\n\
                     \"social_opportunities\": \"Community engagement options\",\n\
                     \"wellness_factors\": [\"2-3 health/wellness benefits\"]\n\
                 }}\n\
             }}"
        );
        let recommendations = generate_value(client, recommendations_prompt).await?;

        let mut highlighted = Map::new();
        if let Some(matches) = property_matches.get("property_matches").and_then(Value::as_array) {
            for entry in matches {
                if let Some(name) = entry.get("property").and_then(Value::as_str) {
                    highlighted.insert(
                        name.to_string(),
                        entry
                            .get("nearby_amenities")
                            .cloned()
                            .unwrap_or_else(|| json!({})),
                    );
                }
            }
        }

        Ok(json!({
            "lifestyle_profile": lifestyle_profile,
            "property_matches": property_matches,
            "recommendations": recommendations,
            "highlighted_amenities": highlighted,
        }))
    }
}

/// The amenity facts this stage contributes to shared context.
pub fn lifestyle_facts(output: &Value) -> ContextUpdate {
    let Some(highlighted) = output.get("highlighted_amenities") else {
        return ContextUpdate::default();
    };
    let amenities = highlighted
        .as_object()
        .map(|per_property| {
            per_property
                .values()
                .flat_map(collect_amenities)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    ContextUpdate::amenities(amenities)
}
