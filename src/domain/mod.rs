//! Domain layer - conversation transcript, context facts, and response
//! coercion. No I/O and no dependency on ports or adapters.

pub mod coercion;
pub mod context;
pub mod conversation;

pub use context::{AmenityRef, Context, ContextStore, ContextUpdate, PropertyRef};
pub use conversation::{
    profile_for, AgentProfile, Capability, ConversationTurn, Speaker, TurnKind, LEAD,
};
