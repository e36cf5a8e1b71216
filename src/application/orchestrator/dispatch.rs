//! Dispatch orchestration: classify the request, route it to one specialist.
//!
//! Per request: one classification call picks a capability tag from the fixed
//! dispatchable set; the selected agent runs its staged chain against context
//! rebuilt from the transcript; the reply is wrapped in a lead acknowledgment
//! plus a specialist response turn. A model failure inside the agent chain is
//! recovered here with the static per-capability fallback message - the caller
//! is a chat surface and always gets a well-formed conversation back.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{Capability, ContextStore, ConversationTurn, TurnKind, LEAD};
use crate::ports::{GenerationRequest, ModelClient, ModelError};

use super::super::agents::Agent;

/// Clarification used when classification cannot name a specialist.
pub const GENERAL_CLARIFICATION: &str =
    "I want to make sure the right specialist helps you! Could you tell me a bit more about \
     whether you're searching for a home, exploring a neighborhood's amenities, negotiating a \
     deal, or closing a purchase?";

/// Fixed fallback messages, keyed by capability. Never blank.
pub static FALLBACKS: Lazy<HashMap<Capability, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            Capability::PropertySearch,
            "I'd love to help you find the right home! Could you tell me a bit more about what \
             you're looking for - budget, area, and must-have features?",
        ),
        (
            Capability::Amenities,
            "I can dig into neighborhood amenities for you! Which property or area should I \
             look around, and what matters most - schools, dining, parks?",
        ),
        (
            Capability::Negotiation,
            "I can help you negotiate the best possible deal! Could you tell me which property \
             you have in mind and what price range you're aiming for?",
        ),
        (
            Capability::Closing,
            "I can walk you through the closing process step by step! Could you share where you \
             are right now - offer accepted, inspections, or final paperwork?",
        ),
    ])
});

/// Lead acknowledgment templates introducing each specialist.
fn acknowledgment(capability: Capability) -> &'static str {
    match capability {
        Capability::PropertySearch => {
            "Great question! Let me bring in Mike, our Residential Property Specialist \u{1F3E0} - \
             he knows our listings inside out."
        }
        Capability::Amenities => {
            "Let me hand you over to Emma, our Amenities Research Specialist \u{1F31F} - she knows \
             every corner of the neighborhood."
        }
        Capability::Negotiation => {
            "Time to talk numbers! Jessica, our Master Negotiator \u{1F4B0}, will take it from here."
        }
        Capability::Closing => {
            "You're in good hands - Robert, our Closing Specialist \u{1F4DD}, will walk you through \
             the paperwork."
        }
        // Pipeline-only roles are never dispatched to.
        _ => "Let me bring in the right specialist for this.",
    }
}

/// Routes each request to a single specialist agent.
pub struct DispatchOrchestrator {
    client: Arc<dyn ModelClient>,
    /// tag -> implementation mapping, built once at startup.
    agents: HashMap<Capability, Arc<dyn Agent>>,
    /// Append-only transcript; the substrate context is rebuilt from.
    transcript: Mutex<Vec<ConversationTurn>>,
}

impl DispatchOrchestrator {
    /// Builds the orchestrator from the specialist roster.
    pub fn new(client: Arc<dyn ModelClient>, roster: Vec<Arc<dyn Agent>>) -> Self {
        let agents = roster
            .into_iter()
            .map(|agent| (agent.capability(), agent))
            .collect();
        Self {
            client,
            agents,
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Processes one user message into the turns generated for this request.
    ///
    /// Infallible by design: every failure mode degrades to a clarification
    /// turn inside a normal conversation array.
    pub async fn process(&self, message: &str) -> Vec<ConversationTurn> {
        let mut transcript = self.transcript.lock().await;

        let user_turn = ConversationTurn::user(message);
        transcript.push(user_turn.clone());

        let capability = match self.classify(message).await {
            Ok(Some(capability)) => capability,
            Ok(None) => {
                tracing::warn!("classification did not match a known capability");
                return self.clarify(&mut transcript, user_turn);
            }
            Err(err) => {
                tracing::error!(error = %err, "classification call failed");
                return self.clarify(&mut transcript, user_turn);
            }
        };
        tracing::info!(capability = %capability, "request classified");

        let Some(agent) = self.agents.get(&capability) else {
            tracing::error!(capability = %capability, "no agent registered for capability");
            return self.clarify(&mut transcript, user_turn);
        };

        let context = ContextStore::rebuild_from(&transcript).filtered_for(capability);

        match agent.process(message, &context).await {
            Ok(reply) => {
                let ack = ConversationTurn::agent(
                    &LEAD,
                    TurnKind::Acknowledgment,
                    acknowledgment(capability),
                    None,
                );
                let response = ConversationTurn::agent(
                    agent.profile(),
                    TurnKind::Response,
                    reply.message,
                    Some(reply.details),
                );
                transcript.push(ack.clone());
                transcript.push(response.clone());
                vec![user_turn, ack, response]
            }
            Err(err) => {
                tracing::error!(capability = %capability, error = %err, "agent chain failed; substituting fallback");
                let fallback = ConversationTurn::agent(
                    agent.profile(),
                    TurnKind::Clarification,
                    FALLBACKS[&capability],
                    None,
                );
                transcript.push(fallback.clone());
                vec![user_turn, fallback]
            }
        }
    }

    /// Appends and returns the general clarification turn.
    fn clarify(
        &self,
        transcript: &mut Vec<ConversationTurn>,
        user_turn: ConversationTurn,
    ) -> Vec<ConversationTurn> {
        let clarification =
            ConversationTurn::agent(&LEAD, TurnKind::Clarification, GENERAL_CLARIFICATION, None);
        transcript.push(clarification.clone());
        vec![user_turn, clarification]
    }

    /// Asks the model for exactly one capability tag.
    async fn classify(&self, message: &str) -> Result<Option<Capability>, ModelError> {
        let prompt = format!(
            "Classify this real estate request into exactly one category.\n\n\
             Request: {message}\n\n\
             Categories:\n\
             - property_search: finding or asking about properties to buy or rent\n\
             - amenities: nearby shops, schools, parks, transport, healthcare, entertainment\n\
             - negotiation: offers, pricing strategy, getting a better deal\n\
             - closing: paperwork, inspections, costs, and the closing process\n\n\
             Respond with only the category tag, nothing else."
        );
        let completion = self.client.complete(GenerationRequest::new(prompt)).await?;
        Ok(Capability::parse_dispatch(&completion.text))
    }
}
