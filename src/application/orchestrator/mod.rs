//! Orchestration: choosing who answers, and composing the conversation.
//!
//! Two strategies exist, selected at startup:
//!
//! - [`DispatchOrchestrator`] classifies each request and routes it to one
//!   specialist (the default);
//! - [`PipelineOrchestrator`] runs the whole specialist team over every
//!   request and closes with a lead summary.
//!
//! Both compose the same transcript vocabulary and both swallow model
//! failures into clarification turns: the HTTP caller always receives a
//! well-formed conversation.

mod dispatch;
mod pipeline;

pub use dispatch::{DispatchOrchestrator, FALLBACKS, GENERAL_CLARIFICATION};
pub use pipeline::PipelineOrchestrator;

use crate::domain::{profile_for, Capability, ConversationTurn, TurnKind, LEAD};

/// Strategy facade handed to the HTTP layer.
pub enum Orchestrator {
    Dispatch(DispatchOrchestrator),
    Pipeline(PipelineOrchestrator),
}

impl Orchestrator {
    /// Processes one user message into the turns generated for this request.
    pub async fn process(&self, message: &str) -> Vec<ConversationTurn> {
        match self {
            Orchestrator::Dispatch(orchestrator) => orchestrator.process(message).await,
            Orchestrator::Pipeline(orchestrator) => orchestrator.process(message).await,
        }
    }

    /// The welcome conversation introducing the lead and each specialist.
    ///
    /// Composed from the static roster; the model is never consulted.
    pub fn welcome(&self) -> Vec<ConversationTurn> {
        welcome_conversation()
    }
}

/// Builds the static welcome conversation.
pub fn welcome_conversation() -> Vec<ConversationTurn> {
    let mut turns = vec![ConversationTurn::agent(
        &LEAD,
        TurnKind::Welcome,
        format!(
            "{} Meet the team - tell us what you're looking for and the right specialist will jump in!",
            LEAD.description
        ),
        None,
    )];

    for capability in Capability::DISPATCHABLE {
        let profile = profile_for(capability);
        turns.push(ConversationTurn::agent(
            profile,
            TurnKind::Welcome,
            format!(
                "Hi, I'm {} {} - your {}. {}",
                profile.name, profile.glyph, profile.role, profile.description
            ),
            None,
        ));
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Speaker;

    #[test]
    fn welcome_introduces_lead_and_every_specialist() {
        let turns = welcome_conversation();

        assert_eq!(turns.len(), 1 + Capability::DISPATCHABLE.len());
        assert_eq!(turns[0].name, "Sarah");
        assert!(turns.iter().all(|t| t.speaker == Speaker::Agent));
        assert!(turns.iter().all(|t| t.kind == TurnKind::Welcome));

        for capability in Capability::DISPATCHABLE {
            let profile = profile_for(capability);
            assert!(
                turns.iter().any(|t| t.name == profile.name && t.role == profile.role),
                "missing specialist {}",
                profile.name
            );
        }
    }

    #[test]
    fn welcome_never_carries_structured_details() {
        assert!(welcome_conversation().iter().all(|t| t.details.is_none()));
    }
}
