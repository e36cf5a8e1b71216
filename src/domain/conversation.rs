//! Conversation transcript types and the agent roster.
//!
//! A conversation is an append-only sequence of [`ConversationTurn`] entries.
//! Turns are never edited or removed; they form both the payload returned to
//! the caller and the substrate context is extracted from.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Capability tag identifying which agent a request is routed to.
///
/// The first four are the dispatchable set a request can classify into; the
/// remaining tags name pipeline-only roles and exist so context filtering can
/// address every agent uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    PropertySearch,
    Amenities,
    Negotiation,
    Closing,
    Legal,
    Lifestyle,
    Location,
}

impl Capability {
    /// The capability tags a user request may classify into.
    pub const DISPATCHABLE: [Capability; 4] = [
        Capability::PropertySearch,
        Capability::Amenities,
        Capability::Negotiation,
        Capability::Closing,
    ];

    /// Every capability tag, dispatchable or pipeline-only.
    pub const ALL: [Capability; 7] = [
        Capability::PropertySearch,
        Capability::Amenities,
        Capability::Negotiation,
        Capability::Closing,
        Capability::Legal,
        Capability::Lifestyle,
        Capability::Location,
    ];

    /// The wire tag for this capability.
    pub fn tag(&self) -> &'static str {
        match self {
            Capability::PropertySearch => "property_search",
            Capability::Amenities => "amenities",
            Capability::Negotiation => "negotiation",
            Capability::Closing => "closing",
            Capability::Legal => "legal",
            Capability::Lifestyle => "lifestyle",
            Capability::Location => "location",
        }
    }

    /// Parses a classification answer into a dispatchable capability.
    ///
    /// Tolerates surrounding whitespace and case; anything that is not
    /// exactly one known dispatchable tag yields `None` (the caller must
    /// ask for clarification rather than guess).
    pub fn parse_dispatch(text: &str) -> Option<Capability> {
        let tag = text.trim().to_lowercase();
        Capability::DISPATCHABLE
            .into_iter()
            .find(|c| c.tag() == tag)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Static identity of an agent persona.
///
/// Loaded once at process start; never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    /// Display name (e.g., "Mike").
    pub name: &'static str,
    /// Role label shown to the user.
    pub role: &'static str,
    /// Display glyph; serialized as `emoji` on the wire.
    #[serde(rename = "emoji")]
    pub glyph: &'static str,
    /// One-line description used by the welcome template.
    pub description: &'static str,
}

/// The lead persona that frames every conversation.
pub const LEAD: AgentProfile = AgentProfile {
    name: "Sarah",
    role: "Real Estate Team Lead",
    glyph: "\u{1F3AD}",
    description: "I'm Sarah, your real estate team leader! I'll coordinate everything to make your property search smooth and clear.",
};

const MIKE: AgentProfile = AgentProfile {
    name: "Mike",
    role: "Residential Property Specialist",
    glyph: "\u{1F3E0}",
    description: "I analyze your housing needs and surface the properties that actually fit them.",
};

const EMMA_AMENITIES: AgentProfile = AgentProfile {
    name: "Emma",
    role: "Amenities Research Specialist",
    glyph: "\u{1F31F}",
    description: "I dig into what's around a home: shops, schools, parks, and everything in between.",
};

const JESSICA: AgentProfile = AgentProfile {
    name: "Jessica",
    role: "Master Negotiator",
    glyph: "\u{1F4B0}",
    description: "I find the sweet spot in every deal and keep things light with a negotiation pun or two.",
};

const ROBERT_CLOSING: AgentProfile = AgentProfile {
    name: "Robert",
    role: "Closing Specialist",
    glyph: "\u{1F4DD}",
    description: "I make the paperwork and closing process smooth and stress-free.",
};

const ROBERT_LEGAL: AgentProfile = AgentProfile {
    name: "Robert",
    role: "Legal Advisor",
    glyph: "\u{2696}\u{FE0F}",
    description: "I simplify contracts and keep the legal side of your purchase on solid ground.",
};

const EMMA_LIFESTYLE: AgentProfile = AgentProfile {
    name: "Emma",
    role: "Lifestyle Consultant",
    glyph: "\u{1F31F}",
    description: "I'm your neighborhood insider, with local secrets and foodie tips.",
};

const JACK: AgentProfile = AgentProfile {
    name: "Jack",
    role: "Location Expert",
    glyph: "\u{1F4CD}",
    description: "I turn your commutes into shortcuts and map out what's truly nearby.",
};

/// Returns the specialist profile invoked under the given capability.
pub fn profile_for(capability: Capability) -> &'static AgentProfile {
    match capability {
        Capability::PropertySearch => &MIKE,
        Capability::Amenities => &EMMA_AMENITIES,
        Capability::Negotiation => &JESSICA,
        Capability::Closing => &ROBERT_CLOSING,
        Capability::Legal => &ROBERT_LEGAL,
        Capability::Lifestyle => &EMMA_LIFESTYLE,
        Capability::Location => &JACK,
    }
}

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// What kind of turn this is.
///
/// `Response` and `Clarification` are the dispatch-mode kinds; the
/// capability-named kinds plus `Orchestration` and `Summary` are emitted by
/// the pipeline mode. The wire field is `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    User,
    Acknowledgment,
    Response,
    Clarification,
    Orchestration,
    Summary,
    Welcome,
    PropertySearch,
    Negotiation,
    Legal,
    Lifestyle,
    Location,
}

/// One entry in the conversation transcript.
///
/// Appended monotonically; never edited or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique id of this turn.
    pub id: Uuid,
    /// Whether the user or an agent authored this turn.
    pub speaker: Speaker,
    /// Speaker display name.
    pub name: String,
    /// Speaker role label.
    pub role: String,
    /// Display glyph.
    #[serde(rename = "emoji")]
    pub glyph: String,
    /// Turn kind; serialized as `type`.
    #[serde(rename = "type")]
    pub kind: TurnKind,
    /// Human-readable message.
    pub message: String,
    /// Structured output accompanying the message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// RFC 3339 timestamp of when the turn was appended.
    pub timestamp: String,
}

impl ConversationTurn {
    /// Creates a user turn.
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::User,
            name: "You".to_string(),
            role: "Client".to_string(),
            glyph: String::new(),
            kind: TurnKind::User,
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Creates an agent turn authored by the given profile.
    pub fn agent(
        profile: &AgentProfile,
        kind: TurnKind,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::Agent,
            name: profile.name.to_string(),
            role: profile.role.to_string(),
            glyph: profile.glyph.to_string(),
            kind,
            message: message.into(),
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatch_tags_parse_exactly() {
        assert_eq!(
            Capability::parse_dispatch("property_search"),
            Some(Capability::PropertySearch)
        );
        assert_eq!(
            Capability::parse_dispatch("  NEGOTIATION \n"),
            Some(Capability::Negotiation)
        );
        assert_eq!(Capability::parse_dispatch("amenities"), Some(Capability::Amenities));
        assert_eq!(Capability::parse_dispatch("closing"), Some(Capability::Closing));
    }

    #[test]
    fn unknown_or_pipeline_tags_do_not_dispatch() {
        assert_eq!(Capability::parse_dispatch("mortgages"), None);
        assert_eq!(Capability::parse_dispatch(""), None);
        // Pipeline-only roles are not valid classification answers.
        assert_eq!(Capability::parse_dispatch("lifestyle"), None);
        assert_eq!(Capability::parse_dispatch("location"), None);
        // A sentence containing a tag is not a tag.
        assert_eq!(Capability::parse_dispatch("I think property_search fits"), None);
    }

    #[test]
    fn every_capability_has_a_profile() {
        for capability in Capability::ALL {
            let profile = profile_for(capability);
            assert!(!profile.name.is_empty());
            assert!(!profile.role.is_empty());
            assert!(!profile.glyph.is_empty());
        }
    }

    #[test]
    fn turn_serializes_wire_field_names() {
        let turn = ConversationTurn::agent(
            profile_for(Capability::PropertySearch),
            TurnKind::Response,
            "Here are some options",
            Some(json!({ "properties": [] })),
        );

        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["speaker"], "agent");
        assert_eq!(value["name"], "Mike");
        assert_eq!(value["type"], "response");
        assert!(value.get("emoji").is_some());
        assert!(value.get("glyph").is_none());
        assert!(value.get("details").is_some());
    }

    #[test]
    fn user_turn_omits_details() {
        let turn = ConversationTurn::user("hello");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["speaker"], "user");
        assert_eq!(value["type"], "user");
        assert!(value.get("details").is_none());
    }

    #[test]
    fn turn_kinds_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(TurnKind::PropertySearch).unwrap(),
            json!("property_search")
        );
        assert_eq!(
            serde_json::to_value(TurnKind::Orchestration).unwrap(),
            json!("orchestration")
        );
    }
}
