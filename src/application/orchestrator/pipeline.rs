//! Pipeline orchestration: the full team works every request.
//!
//! A fixed linear chain runs unconditionally: search -> negotiation -> legal
//! -> lifestyle -> location. Between stages the lead persona synthesizes a
//! hand-off message from the stage's structured output; after the last stage
//! one summary call folds every stage output into a final recommendation and
//! the summary turn is appended before returning. Stage outputs propagate
//! through a keyed context store, filtered per receiving capability.
//!
//! A failed stage or hand-off aborts the chain; the orchestrator boundary
//! substitutes the fallback clarification for the failing capability and the
//! caller still receives a well-formed conversation.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::coercion;
use crate::domain::{
    profile_for, Capability, ContextStore, ContextUpdate, ConversationTurn, PropertyRef, TurnKind,
    LEAD,
};
use crate::ports::{GenerationRequest, ModelClient, ModelError};

use super::super::agents::{
    legal_facts, lifestyle_facts, message_of, ContractAgent, LifestyleAgent, LocationAgent,
    NegotiationAgent, PipelineStage, PropertySearchAgent, StageInput,
};
use super::dispatch::{FALLBACKS, GENERAL_CLARIFICATION};

/// The five specialist stages, in running order.
const STAGE_ORDER: [(Capability, &str); 5] = [
    (Capability::PropertySearch, "residential"),
    (Capability::Negotiation, "bargain"),
    (Capability::Legal, "contract"),
    (Capability::Lifestyle, "lifestyle"),
    (Capability::Location, "location"),
];

/// Runs every request through the whole specialist team.
pub struct PipelineOrchestrator {
    client: Arc<dyn ModelClient>,
    residential: PropertySearchAgent,
    bargain: NegotiationAgent,
    contract: ContractAgent,
    lifestyle: LifestyleAgent,
    location: LocationAgent,
    store: Mutex<ContextStore>,
}

impl PipelineOrchestrator {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            residential: PropertySearchAgent::new(client.clone()),
            bargain: NegotiationAgent::new(client.clone()),
            contract: ContractAgent::new(client.clone()),
            lifestyle: LifestyleAgent::new(client.clone()),
            location: LocationAgent::new(client.clone()),
            client,
            store: Mutex::new(ContextStore::new()),
        }
    }

    /// Processes one user message through the full chain.
    ///
    /// Infallible by design; failures degrade to a clarification turn.
    pub async fn process(&self, message: &str) -> Vec<ConversationTurn> {
        let mut store = self.store.lock().await;
        let user_turn = ConversationTurn::user(message);

        match self.run_chain(&mut store, message).await {
            Ok(mut turns) => {
                turns.insert(0, user_turn);
                turns
            }
            Err((capability, err)) => {
                tracing::error!(error = %err, "pipeline chain failed; substituting fallback");
                let turn = match capability.and_then(|c| FALLBACKS.get(&c).map(|m| (c, *m))) {
                    Some((c, fallback)) => {
                        ConversationTurn::agent(profile_for(c), TurnKind::Clarification, fallback, None)
                    }
                    None => ConversationTurn::agent(
                        &LEAD,
                        TurnKind::Clarification,
                        GENERAL_CLARIFICATION,
                        None,
                    ),
                };
                vec![user_turn, turn]
            }
        }
    }

    async fn run_chain(
        &self,
        store: &mut ContextStore,
        message: &str,
    ) -> Result<Vec<ConversationTurn>, (Option<Capability>, ModelError)> {
        let mut turns = Vec::new();
        let mut upstream: Map<String, Value> = Map::new();

        for (index, (capability, key)) in STAGE_ORDER.iter().enumerate() {
            let capability = *capability;
            tracing::info!(stage = %key, "running pipeline stage");

            let context = store.context_for(capability);
            let input = StageInput {
                user_message: message,
                context: &context,
                upstream: &upstream,
            };

            let output = self
                .run_stage(capability, input)
                .await
                .map_err(|e| (Some(capability), e))?;

            store.update(capability, &stage_facts(capability, &output));

            let profile = profile_for(capability);
            turns.push(ConversationTurn::agent(
                profile,
                stage_kind(capability),
                stage_message(capability, &output),
                Some(output.clone()),
            ));

            let next = STAGE_ORDER
                .get(index + 1)
                .map(|(next_capability, _)| profile_for(*next_capability).name);
            let handoff = self
                .handoff(profile.name, next, &output)
                .await
                .map_err(|e| (Some(capability), e))?;
            turns.push(handoff);

            upstream.insert((*key).to_string(), output);
        }

        // Final summary from the lead, appended before returning.
        let summary = self
            .summarize(message, &upstream)
            .await
            .map_err(|e| (None, e))?;
        turns.push(ConversationTurn::agent(
            &LEAD,
            TurnKind::Summary,
            message_of(&summary),
            Some(json!({
                "summary": summary,
                "context": Value::Object(upstream),
            })),
        ));

        Ok(turns)
    }

    async fn run_stage(
        &self,
        capability: Capability,
        input: StageInput<'_>,
    ) -> Result<Value, ModelError> {
        match capability {
            Capability::PropertySearch => PipelineStage::run(&self.residential, input).await,
            Capability::Negotiation => PipelineStage::run(&self.bargain, input).await,
            Capability::Legal => self.contract.run(input).await,
            Capability::Lifestyle => self.lifestyle.run(input).await,
            Capability::Location => self.location.run(input).await,
            // Amenities and closing have no pipeline stage.
            other => Err(ModelError::InvalidRequest(format!(
                "no pipeline stage for capability {other}"
            ))),
        }
    }

    /// One model call synthesizing the lead's hand-off between stages.
    async fn handoff(
        &self,
        from: &str,
        to: Option<&str>,
        stage_output: &Value,
    ) -> Result<ConversationTurn, ModelError> {
        let prompt = match to {
            Some(to) => format!(
                "Create a handoff message from {from} to {to} based on:\n{stage_output}\n\n\
                 Return as JSON:\n\
                 {{\n\
                     \"message\": \"Friendly handoff with emojis explaining what was done and what's next\",\n\
                     \"key_points\": [\"2-3 main points to highlight\"]\n\
                 }}"
            ),
            None => format!(
                "Create a completion message from {from} based on:\n{stage_output}\n\n\
                 Return as JSON:\n\
                 {{\n\
                     \"message\": \"Friendly completion message with emojis\",\n\
                     \"key_findings\": [\"2-3 main findings\"]\n\
                 }}"
            ),
        };

        let completion = self.client.complete(GenerationRequest::new(prompt)).await?;
        let handoff = coercion::coerce(completion.text.trim());

        let key_points = handoff
            .get("key_points")
            .or_else(|| handoff.get("key_findings"))
            .cloned()
            .unwrap_or_else(|| json!([]));

        Ok(ConversationTurn::agent(
            &LEAD,
            TurnKind::Orchestration,
            message_of(&handoff),
            Some(json!({ "key_points": key_points })),
        ))
    }

    /// The final recommendation call, fed every stage's structured output.
    async fn summarize(
        &self,
        message: &str,
        upstream: &Map<String, Value>,
    ) -> Result<Value, ModelError> {
        fn section<'a>(
            upstream: &'a Map<String, Value>,
            empty: &'a Value,
            stage: &str,
            field: &str,
        ) -> &'a Value {
            upstream
                .get(stage)
                .and_then(|s| s.get(field))
                .unwrap_or(empty)
        }
        let empty = json!({});

        let prompt = format!(
            "Based on all agent inputs:\n\
             User Request: {message}\n\n\
             Mike's Properties: {residential}\n\
             Jessica's Negotiation: {bargain}\n\
             Robert's Legal: {contract}\n\
             Emma's Lifestyle: {lifestyle}\n\
             Jack's Location: {location}\n\n\
             Provide a final recommendation as JSON:\n\
             {{\n\
                 \"message\": \"Final summary with emojis\",\n\
                 \"top_properties\": [\n\
                     {{\n\
                         \"name\": \"Property name\",\n\
                         \"overall_score\": \"1-10 with explanation\",\n\
                         \"key_advantages\": [\"3-4 main selling points\"],\n\
                         \"considerations\": [\"1-2 things to keep in mind\"],\n\
                         \"next_steps\": [\"2-3 immediate actions\"]\n\
                     }}\n\
                 ],\n\
                 \"team_insights\": {{\n\
                     \"residential\": \"Key property insights\",\n\
                     \"negotiation\": \"Main negotiation opportunities\",\n\
                     \"legal\": \"Important legal considerations\",\n\
                     \"lifestyle\": \"Lifestyle alignment highlights\",\n\
                     \"location\": \"Location advantages\"\n\
                 }},\n\
                 \"action_plan\": [\"3-4 recommended next steps\"],\n\
                 \"timeline\": \"Estimated timeline for viewing/offer/closing\"\n\
             }}",
            residential = section(upstream, &empty, "residential", "final_recommendations"),
            bargain = section(upstream, &empty, "bargain", "strategy"),
            contract = section(upstream, &empty, "contract", "final_recommendations"),
            lifestyle = section(upstream, &empty, "lifestyle", "recommendations"),
            location = section(upstream, &empty, "location", "recommendations"),
        );

        let completion = self.client.complete(GenerationRequest::new(prompt)).await?;
        Ok(coercion::coerce(completion.text.trim()))
    }
}

/// The transcript kind a stage's turn is tagged with.
fn stage_kind(capability: Capability) -> TurnKind {
    match capability {
        Capability::PropertySearch => TurnKind::PropertySearch,
        Capability::Negotiation => TurnKind::Negotiation,
        Capability::Legal => TurnKind::Legal,
        Capability::Lifestyle => TurnKind::Lifestyle,
        Capability::Location => TurnKind::Location,
        _ => TurnKind::Response,
    }
}

/// The human-readable message surfaced for a stage's turn.
fn stage_message(capability: Capability, output: &Value) -> String {
    let nested = |outer: &str| -> Option<String> {
        output
            .get(outer)
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match capability {
        Capability::PropertySearch | Capability::Legal => nested("initial_search"),
        Capability::Negotiation => nested("introduction"),
        Capability::Lifestyle => nested("lifestyle_profile"),
        Capability::Location => output
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
    .unwrap_or_default()
}

/// The facts a stage contributes to shared context.
fn stage_facts(capability: Capability, output: &Value) -> ContextUpdate {
    match capability {
        Capability::PropertySearch => {
            let properties = output
                .get("initial_search")
                .and_then(|s| s.get("properties"))
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(PropertyRef::from_value).collect())
                .unwrap_or_default();
            ContextUpdate::properties(properties)
        }
        Capability::Negotiation => {
            let strategy = output
                .get("strategy")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            ContextUpdate::negotiation(strategy)
        }
        Capability::Legal => legal_facts(output),
        Capability::Lifestyle => lifestyle_facts(output),
        _ => ContextUpdate::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::model::{MockFailure, MockModelClient};

    /// Queues a full happy-path pipeline run: 4 residential calls, 3 bargain
    /// calls, 4 contract calls (base three plus key terms for the one shared
    /// property), 3 lifestyle calls, 1 location call, 5 hand-offs, 1 summary.
    fn scripted_client() -> MockModelClient {
        let mut client = MockModelClient::new()
            // residential: initial search, analysis, recommendations, criteria
            .with_json(json!({
                "message": "Found matches!",
                "properties": [{ "name": "Oak Villa", "price": "$450,000" }]
            }))
            .with_json(json!({ "message": "analysis" }))
            .with_json(json!({ "message": "recommendations", "top_picks": [] }))
            .with_json(json!({ "budget_range": "under $500k" }));
        // handoff Mike -> Jessica
        client = client.with_json(json!({ "message": "Over to Jessica!", "key_points": ["two matches"] }));
        // bargain: market, strategy, timeline
        client = client
            .with_json(json!({ "message": "market", "market_conditions": {} }))
            .with_json(json!({
                "message": "strategy",
                "property_strategies": [
                    { "property": "Oak Villa", "negotiation_points": [{ "point": "roof" }] }
                ]
            }))
            .with_json(json!({ "message": "timeline" }));
        // handoff Jessica -> Robert
        client = client.with_json(json!({ "message": "Over to Robert!", "key_points": [] }));
        // contract: opening, points, documents, then key terms for Oak Villa
        // (the property fact arrived from the residential stage)
        client = client
            .with_json(json!({ "message": "legal opening" }))
            .with_json(json!({ "points": ["title search"] }))
            .with_json(json!({ "documents_needed": ["deed"], "legal_timeline": ["day 1"] }))
            .with_json(json!({ "deposit": "$5,000" }));
        // handoff Robert -> Emma
        client = client.with_json(json!({ "message": "Over to Emma!", "key_points": [] }));
        // lifestyle: profile, matches, recommendations
        client = client
            .with_json(json!({ "message": "profile", "lifestyle_preferences": { "activity_level": "Active" } }))
            .with_json(json!({
                "message": "matches",
                "property_matches": [
                    { "property": "Oak Villa", "nearby_amenities": { "dining": [{ "name": "Corner Bistro" }] } }
                ]
            }))
            .with_json(json!({ "message": "lifestyle recommendations" }));
        // handoff Emma -> Jack
        client = client.with_json(json!({ "message": "Over to Jack!", "key_points": [] }));
        // location
        client = client.with_json(json!({
            "message": "location overview",
            "average_commute_time": "15 mins",
            "recommendations": ["live near the park"]
        }));
        // completion message from Jack
        client = client.with_json(json!({ "message": "All mapped out!", "key_findings": ["short commutes"] }));
        // final summary
        client = client.with_json(json!({
            "message": "Team verdict: Oak Villa",
            "top_properties": [{ "name": "Oak Villa" }],
            "action_plan": ["book a viewing"]
        }));
        client
    }

    #[tokio::test]
    async fn chain_runs_all_stages_in_order_and_appends_summary() {
        let client = Arc::new(scripted_client());
        let orchestrator = PipelineOrchestrator::new(client.clone());

        let turns = orchestrator.process("find and vet a family home").await;

        // user + 5 stage turns + 5 hand-offs + summary
        assert_eq!(turns.len(), 12);
        assert_eq!(turns[0].kind, TurnKind::User);
        assert_eq!(turns[1].kind, TurnKind::PropertySearch);
        assert_eq!(turns[1].name, "Mike");
        assert_eq!(turns[2].kind, TurnKind::Orchestration);
        assert_eq!(turns[2].name, "Sarah");
        assert_eq!(turns[3].kind, TurnKind::Negotiation);
        assert_eq!(turns[5].kind, TurnKind::Legal);
        assert_eq!(turns[7].kind, TurnKind::Lifestyle);
        assert_eq!(turns[9].kind, TurnKind::Location);

        let summary = turns.last().unwrap();
        assert_eq!(summary.kind, TurnKind::Summary);
        assert_eq!(summary.name, "Sarah");
        assert_eq!(summary.message, "Team verdict: Oak Villa");
        let details = summary.details.as_ref().unwrap();
        assert_eq!(details["summary"]["top_properties"][0]["name"], "Oak Villa");
        assert!(details["context"]["residential"].is_object());

        // 4 residential + 3 bargain + 4 contract + 3 lifestyle + 1 location
        // + 5 lead hand-offs + 1 summary.
        assert_eq!(client.call_count(), 21);
    }

    #[tokio::test]
    async fn stage_outputs_flow_into_later_prompts() {
        let client = Arc::new(scripted_client());
        let orchestrator = PipelineOrchestrator::new(client.clone());

        orchestrator.process("find and vet a family home").await;

        let prompts = client.prompts();
        // Bargain's market prompt (call 6) sees Mike's properties.
        assert!(prompts[5].contains("Oak Villa"));
        // Contract's key-terms prompt (call 13) anchors to the shared price fact.
        assert!(prompts[12].contains("$450,000"));
        // The summary prompt (last call) references the user request.
        assert!(prompts.last().unwrap().contains("find and vet a family home"));
    }

    #[tokio::test]
    async fn stage_failure_degrades_to_capability_fallback() {
        // Residential's first call fails immediately.
        let client = Arc::new(MockModelClient::new().with_failure(MockFailure::Unavailable {
            message: "down".to_string(),
        }));
        let orchestrator = PipelineOrchestrator::new(client.clone());

        let turns = orchestrator.process("find a home").await;

        assert_eq!(turns.len(), 2);
        let last = turns.last().unwrap();
        assert_eq!(last.kind, TurnKind::Clarification);
        assert_eq!(last.message, FALLBACKS[&Capability::PropertySearch]);
        // Nothing after the failing call ran.
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn legal_stage_failure_uses_general_clarification() {
        // Legal has no dispatch fallback entry; the lead clarifies instead.
        let mut client = MockModelClient::new()
            .with_json(json!({ "message": "Found!", "properties": [] }))
            .with_json(json!({ "message": "analysis" }))
            .with_json(json!({ "message": "recommendations" }))
            .with_json(json!({ "budget_range": "any" }))
            .with_json(json!({ "message": "handoff", "key_points": [] }))
            .with_json(json!({ "message": "market" }))
            .with_json(json!({ "message": "strategy" }))
            .with_json(json!({ "message": "timeline" }))
            .with_json(json!({ "message": "handoff", "key_points": [] }));
        client = client.with_failure(MockFailure::Timeout { timeout_secs: 60 });
        let orchestrator = PipelineOrchestrator::new(Arc::new(client));

        let turns = orchestrator.process("vet this").await;

        let last = turns.last().unwrap();
        assert_eq!(last.kind, TurnKind::Clarification);
        assert_eq!(last.message, GENERAL_CLARIFICATION);
        assert_eq!(last.name, "Sarah");
    }
}
