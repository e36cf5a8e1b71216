//! Cross-turn context: the facts accumulated over a conversation.
//!
//! Context is a mapping of named slots (properties, amenities, negotiation,
//! closing) derived from agent output. It exists in two lifecycles, both
//! supported by [`ContextStore`]:
//!
//! - **rebuild**: recompute from the full turn history newest-first, taking
//!   the first-seen facts per category (dispatch orchestration);
//! - **keyed merge**: a running per-agent store where each agent's new facts
//!   are pushed, filtered, to every other agent after each turn (pipeline
//!   orchestration).
//!
//! Filtering is per receiving capability: each agent sees only the fact
//! categories relevant to its role, except closing/legal which receive the
//! unfiltered union. A fact already present by structural equality is never
//! appended twice.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::conversation::{Capability, ConversationTurn, Speaker};

/// A property the conversation has established.
///
/// Once a property's price and features are on record, later prompts repeat
/// them verbatim and instruct the model to stay consistent; consistency is a
/// prompt-level contract, not a structural one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRef {
    pub name: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl PropertyRef {
    /// Extracts a property from model-authored JSON.
    ///
    /// Requires `name` and `price`; everything else is optional. Returns
    /// `None` for values that don't look like a property (including the
    /// `{response_text, parsed: false}` extraction fallback).
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name")?.as_str()?.to_string();
        let price = obj.get("price")?.as_str()?.to_string();
        let location = obj
            .get("location")
            .and_then(Value::as_str)
            .map(str::to_string);
        let features = obj
            .get("features")
            .or_else(|| obj.get("key_features"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            name,
            price,
            location,
            features,
        })
    }
}

/// A nearby amenity the conversation has established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmenityRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl AmenityRef {
    /// Extracts an amenity from model-authored JSON.
    pub fn from_value(value: &Value, category: Option<&str>) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name")?.as_str()?.to_string();
        let distance = obj
            .get("distance")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            name,
            distance,
            category: category.map(str::to_string),
        })
    }
}

/// The named fact slots available to an agent for one turn.
///
/// Absent slots default to empty; agents must tolerate any subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub properties: Vec<PropertyRef>,
    #[serde(default)]
    pub amenities: Vec<AmenityRef>,
    #[serde(default)]
    pub negotiation: Map<String, Value>,
    #[serde(default)]
    pub closing: Map<String, Value>,
}

/// New facts produced by a single agent turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextUpdate {
    pub properties: Vec<PropertyRef>,
    pub amenities: Vec<AmenityRef>,
    pub negotiation: Map<String, Value>,
    pub closing: Map<String, Value>,
}

impl ContextUpdate {
    /// Returns true if this update carries no facts at all.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.amenities.is_empty()
            && self.negotiation.is_empty()
            && self.closing.is_empty()
    }

    /// Builds an update carrying only properties.
    pub fn properties(properties: Vec<PropertyRef>) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    /// Builds an update carrying only amenities.
    pub fn amenities(amenities: Vec<AmenityRef>) -> Self {
        Self {
            amenities,
            ..Default::default()
        }
    }

    /// Builds an update carrying only negotiation facts.
    pub fn negotiation(negotiation: Map<String, Value>) -> Self {
        Self {
            negotiation,
            ..Default::default()
        }
    }

    /// Builds an update carrying only closing facts.
    pub fn closing(closing: Map<String, Value>) -> Self {
        Self {
            closing,
            ..Default::default()
        }
    }
}

impl Context {
    /// Returns true if every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.amenities.is_empty()
            && self.negotiation.is_empty()
            && self.closing.is_empty()
    }

    /// Merges new facts into this context.
    ///
    /// List facts already present by structural equality are skipped, so
    /// merging the same update twice leaves the context unchanged in content.
    /// Map slots are key-merged, which is likewise idempotent.
    pub fn merge(&mut self, update: &ContextUpdate) {
        for property in &update.properties {
            if !self.properties.contains(property) {
                self.properties.push(property.clone());
            }
        }
        for amenity in &update.amenities {
            if !self.amenities.contains(amenity) {
                self.amenities.push(amenity.clone());
            }
        }
        for (key, value) in &update.negotiation {
            self.negotiation.insert(key.clone(), value.clone());
        }
        for (key, value) in &update.closing {
            self.closing.insert(key.clone(), value.clone());
        }
    }

    /// Returns the subset of this context relevant to the given capability.
    ///
    /// Closing and legal receive the unfiltered union; every other role sees
    /// only its own fact categories.
    pub fn filtered_for(&self, capability: Capability) -> Context {
        let mut filtered = Context::default();
        if slot_relevant(capability, Slot::Properties) {
            filtered.properties = self.properties.clone();
        }
        if slot_relevant(capability, Slot::Amenities) {
            filtered.amenities = self.amenities.clone();
        }
        if slot_relevant(capability, Slot::Negotiation) {
            filtered.negotiation = self.negotiation.clone();
        }
        if slot_relevant(capability, Slot::Closing) {
            filtered.closing = self.closing.clone();
        }
        filtered
    }
}

/// Fact categories a capability may receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Properties,
    Amenities,
    Negotiation,
    Closing,
}

fn slot_relevant(capability: Capability, slot: Slot) -> bool {
    match capability {
        // The closing and legal roles work from the full picture.
        Capability::Closing | Capability::Legal => true,
        Capability::PropertySearch | Capability::Negotiation => {
            matches!(slot, Slot::Properties | Slot::Amenities | Slot::Negotiation)
        }
        Capability::Amenities | Capability::Lifestyle => {
            matches!(slot, Slot::Properties | Slot::Amenities)
        }
        Capability::Location => matches!(slot, Slot::Properties),
    }
}

/// Per-conversation context state owned by the orchestrator.
#[derive(Debug, Default)]
pub struct ContextStore {
    per_agent: HashMap<Capability, Context>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes context from the full turn history.
    ///
    /// Scans newest-first and takes the first-seen facts per category, so the
    /// most recently established properties, amenities, negotiation state and
    /// closing state win.
    pub fn rebuild_from(turns: &[ConversationTurn]) -> Context {
        let mut context = Context::default();

        for turn in turns.iter().rev() {
            if turn.speaker != Speaker::Agent {
                continue;
            }
            let Some(details) = &turn.details else {
                continue;
            };

            if context.properties.is_empty() {
                context.properties = extract_properties(details);
            }
            if context.amenities.is_empty() {
                context.amenities = extract_amenities(details);
            }
            if context.negotiation.is_empty() {
                if let Some(strategy) = details.get("strategy").and_then(Value::as_object) {
                    context.negotiation = strategy.clone();
                }
            }
            if context.closing.is_empty() {
                if let Some(process) = details.get("process").and_then(Value::as_object) {
                    context.closing = process.clone();
                }
            }
        }

        context
    }

    /// Pushes one agent's new facts to every agent's context, filtered per
    /// receiving capability.
    pub fn update(&mut self, source: Capability, update: &ContextUpdate) {
        if update.is_empty() {
            return;
        }
        tracing::debug!(source = %source, "propagating context update");

        let mut staged = Context::default();
        staged.merge(update);

        for capability in Capability::ALL {
            let filtered = staged.filtered_for(capability);
            let entry = self.per_agent.entry(capability).or_default();
            entry.merge(&ContextUpdate {
                properties: filtered.properties,
                amenities: filtered.amenities,
                negotiation: filtered.negotiation,
                closing: filtered.closing,
            });
        }
    }

    /// The accumulated context visible to the given capability.
    pub fn context_for(&self, capability: Capability) -> Context {
        self.per_agent.get(&capability).cloned().unwrap_or_default()
    }
}

/// Pulls property facts out of a turn's structured details.
///
/// Understands both the dispatch shape (`details.properties` array) and the
/// pipeline shape (`details.initial_search.properties`).
fn extract_properties(details: &Value) -> Vec<PropertyRef> {
    let candidates = details
        .get("properties")
        .and_then(Value::as_array)
        .or_else(|| {
            details
                .get("initial_search")
                .and_then(|s| s.get("properties"))
                .and_then(Value::as_array)
        });

    candidates
        .map(|items| items.iter().filter_map(PropertyRef::from_value).collect())
        .unwrap_or_default()
}

/// Pulls amenity facts out of a turn's structured details.
fn extract_amenities(details: &Value) -> Vec<AmenityRef> {
    details.get("amenities").map(collect_amenities).unwrap_or_default()
}

/// Collects amenities from model-authored JSON.
///
/// The amenities agent emits an object of category arrays; tolerate a flat
/// array as well.
pub fn collect_amenities(amenities: &Value) -> Vec<AmenityRef> {
    match amenities {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| AmenityRef::from_value(item, None))
            .collect(),
        Value::Object(categories) => categories
            .iter()
            .filter_map(|(category, entries)| {
                entries.as_array().map(|items| {
                    items
                        .iter()
                        .filter_map(|item| AmenityRef::from_value(item, Some(category)))
                        .collect::<Vec<_>>()
                })
            })
            .flatten()
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{profile_for, ConversationTurn, TurnKind};
    use serde_json::json;

    fn oak_villa() -> PropertyRef {
        PropertyRef {
            name: "Oak Villa".to_string(),
            price: "$450,000".to_string(),
            location: Some("Maplewood".to_string()),
            features: vec!["3 bedrooms".to_string(), "garden".to_string()],
        }
    }

    #[test]
    fn property_extraction_requires_name_and_price() {
        let good = json!({ "name": "Oak Villa", "price": "$450,000" });
        assert!(PropertyRef::from_value(&good).is_some());

        let no_price = json!({ "name": "Oak Villa" });
        assert!(PropertyRef::from_value(&no_price).is_none());

        let fallback = json!({ "response_text": "...", "parsed": false });
        assert!(PropertyRef::from_value(&fallback).is_none());
    }

    #[test]
    fn property_extraction_accepts_key_features_alias() {
        let value = json!({
            "name": "Pine Loft",
            "price": "$380,000",
            "key_features": ["loft ceiling", "balcony"]
        });
        let property = PropertyRef::from_value(&value).unwrap();
        assert_eq!(property.features, vec!["loft ceiling", "balcony"]);
    }

    #[test]
    fn merge_deduplicates_structurally_equal_facts() {
        let mut context = Context::default();
        let update = ContextUpdate::properties(vec![oak_villa()]);

        context.merge(&update);
        context.merge(&update);

        assert_eq!(context.properties.len(), 1);
    }

    #[test]
    fn merge_is_idempotent_for_map_slots() {
        let mut negotiation = Map::new();
        negotiation.insert("stage".to_string(), json!("initial offer"));
        let update = ContextUpdate::negotiation(negotiation);

        let mut context = Context::default();
        context.merge(&update);
        let once = context.clone();
        context.merge(&update);

        assert_eq!(context, once);
    }

    #[test]
    fn filtering_gives_closing_the_unfiltered_union() {
        let mut context = Context::default();
        context.merge(&ContextUpdate::properties(vec![oak_villa()]));
        context.merge(&ContextUpdate::negotiation(
            serde_json::from_value(json!({ "stage": "counter" })).unwrap(),
        ));
        context.merge(&ContextUpdate::closing(
            serde_json::from_value(json!({ "timeline": [] })).unwrap(),
        ));

        let closing_view = context.filtered_for(Capability::Closing);
        assert_eq!(closing_view, context);

        let legal_view = context.filtered_for(Capability::Legal);
        assert_eq!(legal_view, context);
    }

    #[test]
    fn filtering_hides_closing_facts_from_negotiation() {
        let mut context = Context::default();
        context.merge(&ContextUpdate::properties(vec![oak_villa()]));
        context.merge(&ContextUpdate::closing(
            serde_json::from_value(json!({ "documents": ["deed"] })).unwrap(),
        ));

        let negotiation_view = context.filtered_for(Capability::Negotiation);
        assert_eq!(negotiation_view.properties.len(), 1);
        assert!(negotiation_view.closing.is_empty());
    }

    #[test]
    fn location_sees_only_properties() {
        let mut context = Context::default();
        context.merge(&ContextUpdate::properties(vec![oak_villa()]));
        context.merge(&ContextUpdate::amenities(vec![AmenityRef {
            name: "Riverside Park".to_string(),
            distance: Some("0.4 miles".to_string()),
            category: None,
        }]));

        let view = context.filtered_for(Capability::Location);
        assert_eq!(view.properties.len(), 1);
        assert!(view.amenities.is_empty());
    }

    #[test]
    fn store_update_is_idempotent_in_content() {
        let mut store = ContextStore::new();
        let update = ContextUpdate::properties(vec![oak_villa()]);

        store.update(Capability::PropertySearch, &update);
        let once = store.context_for(Capability::Negotiation);
        store.update(Capability::PropertySearch, &update);
        let twice = store.context_for(Capability::Negotiation);

        assert_eq!(once, twice);
    }

    #[test]
    fn store_propagates_filtered_facts_to_other_agents() {
        let mut store = ContextStore::new();
        let mut closing = Map::new();
        closing.insert("documents".to_string(), json!(["deed", "title"]));

        store.update(Capability::PropertySearch, &ContextUpdate::properties(vec![oak_villa()]));
        store.update(Capability::Closing, &ContextUpdate::closing(closing));

        // Negotiation sees the property but never the closing checklist.
        let negotiation = store.context_for(Capability::Negotiation);
        assert_eq!(negotiation.properties.len(), 1);
        assert!(negotiation.closing.is_empty());

        // Legal sees everything.
        let legal = store.context_for(Capability::Legal);
        assert_eq!(legal.properties.len(), 1);
        assert!(!legal.closing.is_empty());
    }

    #[test]
    fn rebuild_takes_first_seen_facts_newest_first() {
        let search_profile = profile_for(Capability::PropertySearch);
        let older = ConversationTurn::agent(
            search_profile,
            TurnKind::Response,
            "older",
            Some(json!({ "properties": [{ "name": "Old Place", "price": "$100,000" }] })),
        );
        let newer = ConversationTurn::agent(
            search_profile,
            TurnKind::Response,
            "newer",
            Some(json!({ "properties": [{ "name": "Oak Villa", "price": "$450,000" }] })),
        );
        let turns = vec![ConversationTurn::user("hi"), older, newer];

        let context = ContextStore::rebuild_from(&turns);
        assert_eq!(context.properties.len(), 1);
        assert_eq!(context.properties[0].name, "Oak Villa");
    }

    #[test]
    fn rebuild_reads_pipeline_shaped_details() {
        let turn = ConversationTurn::agent(
            profile_for(Capability::PropertySearch),
            TurnKind::PropertySearch,
            "found some",
            Some(json!({
                "initial_search": {
                    "properties": [{ "name": "Pine Loft", "price": "$380,000" }]
                }
            })),
        );

        let context = ContextStore::rebuild_from(&[turn]);
        assert_eq!(context.properties[0].name, "Pine Loft");
    }

    #[test]
    fn rebuild_collects_categorized_amenities() {
        let turn = ConversationTurn::agent(
            profile_for(Capability::Amenities),
            TurnKind::Response,
            "around the block",
            Some(json!({
                "amenities": {
                    "education": [{ "name": "Maplewood Elementary", "distance": "0.8 miles" }],
                    "parks_recreation": [{ "name": "Riverside Park" }]
                }
            })),
        );

        let context = ContextStore::rebuild_from(&[turn]);
        assert_eq!(context.amenities.len(), 2);
        assert!(context
            .amenities
            .iter()
            .any(|a| a.category.as_deref() == Some("education")));
    }

    #[test]
    fn rebuild_on_empty_history_is_empty() {
        let context = ContextStore::rebuild_from(&[]);
        assert!(context.is_empty());
    }
}
