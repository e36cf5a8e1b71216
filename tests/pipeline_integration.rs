//! Integration tests for the HTTP surface in pipeline mode.
//!
//! The whole specialist team runs per request; these tests verify stage
//! ordering, context propagation between stages, the reachable final summary
//! turn, and boundary recovery.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use estate_desk::adapters::http::{api_router, AppState};
use estate_desk::adapters::model::{MockFailure, MockModelClient};
use estate_desk::application::orchestrator::FALLBACKS;
use estate_desk::application::{Orchestrator, PipelineOrchestrator};
use estate_desk::domain::Capability;

fn app_with(client: MockModelClient) -> axum::Router {
    let orchestrator = Orchestrator::Pipeline(PipelineOrchestrator::new(Arc::new(client)));
    api_router(AppState::new(Arc::new(orchestrator)))
}

async fn post_chat(app: axum::Router, message: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "message": message }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Queues every model reply a full happy-path team run consumes:
/// 4 residential, 1 hand-off, 3 bargain, 1 hand-off, 4 contract (base three
/// plus key terms for the one shared property), 1 hand-off, 3 lifestyle,
/// 1 hand-off, 1 location, 1 completion, 1 summary.
fn scripted_client() -> MockModelClient {
    MockModelClient::new()
        .with_json(json!({
            "message": "Found matches!",
            "properties": [{ "name": "Oak Villa", "price": "$450,000" }]
        }))
        .with_json(json!({ "message": "analysis" }))
        .with_json(json!({ "message": "recommendations", "top_picks": [] }))
        .with_json(json!({ "budget_range": "under $500k" }))
        .with_json(json!({ "message": "Over to Jessica!", "key_points": ["two matches"] }))
        .with_json(json!({ "message": "market", "market_conditions": {} }))
        .with_json(json!({
            "message": "strategy",
            "property_strategies": [
                { "property": "Oak Villa", "negotiation_points": [{ "point": "roof" }] }
            ]
        }))
        .with_json(json!({ "message": "timeline" }))
        .with_json(json!({ "message": "Over to Robert!", "key_points": [] }))
        .with_json(json!({ "message": "legal opening" }))
        .with_json(json!({ "points": ["title search"] }))
        .with_json(json!({ "documents_needed": ["deed"], "legal_timeline": ["day 1"] }))
        .with_json(json!({ "deposit": "$5,000" }))
        .with_json(json!({ "message": "Over to Emma!", "key_points": [] }))
        .with_json(json!({ "message": "profile", "lifestyle_preferences": {} }))
        .with_json(json!({
            "message": "matches",
            "property_matches": [
                { "property": "Oak Villa", "nearby_amenities": { "dining": [{ "name": "Corner Bistro" }] } }
            ]
        }))
        .with_json(json!({ "message": "lifestyle recommendations" }))
        .with_json(json!({ "message": "Over to Jack!", "key_points": [] }))
        .with_json(json!({ "message": "location overview", "average_commute_time": "15 mins" }))
        .with_json(json!({ "message": "All mapped out!", "key_findings": ["short commutes"] }))
        .with_json(json!({
            "message": "Team verdict: Oak Villa",
            "top_properties": [{ "name": "Oak Villa" }]
        }))
}

#[tokio::test]
async fn pipeline_chat_runs_the_team_and_ends_with_summary() {
    let (status, body) = post_chat(app_with(scripted_client()), "find and vet a family home").await;

    assert_eq!(status, StatusCode::OK);
    let conversation = body["conversation"].as_array().unwrap();

    let kinds: Vec<&str> = conversation
        .iter()
        .filter_map(|t| t["type"].as_str())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "user",
            "property_search",
            "orchestration",
            "negotiation",
            "orchestration",
            "legal",
            "orchestration",
            "lifestyle",
            "orchestration",
            "location",
            "orchestration",
            "summary",
        ]
    );

    // The summary turn is the last one, authored by the lead persona.
    let summary = conversation.last().unwrap();
    assert_eq!(summary["name"], "Sarah");
    assert_eq!(summary["message"], "Team verdict: Oak Villa");
    assert_eq!(
        summary["details"]["summary"]["top_properties"][0]["name"],
        "Oak Villa"
    );
    assert!(summary["details"]["context"]["location"].is_object());
}

#[tokio::test]
async fn pipeline_propagates_property_facts_downstream() {
    let client = scripted_client();
    let recorder = client.clone();

    post_chat(app_with(client), "find and vet a family home").await;

    let prompts = recorder.prompts();
    // The contract stage's key-terms call anchors to the shared price fact.
    assert!(prompts[12].contains("Oak Villa"));
    assert!(prompts[12].contains("$450,000"));
}

#[tokio::test]
async fn pipeline_stage_failure_still_returns_200_with_fallback() {
    let client = MockModelClient::new().with_failure(MockFailure::Unavailable {
        message: "down".to_string(),
    });

    let (status, body) = post_chat(app_with(client), "find a home").await;

    assert_eq!(status, StatusCode::OK);
    let last = body["conversation"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["type"], "clarification");
    assert_eq!(
        last["message"].as_str().unwrap(),
        FALLBACKS[&Capability::PropertySearch]
    );
}
