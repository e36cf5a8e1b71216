//! Closing agent - Robert, the closing specialist.
//!
//! Greeting, then a closing-process guide, then a second pass extracting the
//! guide into the closing checklist schema.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Capability, Context, ContextUpdate};
use crate::ports::{ModelClient, ModelError};

use super::{contextualize, extract_structured, generate_text, greet, Agent, AgentCore, AgentReply};

pub struct ClosingAgent {
    core: AgentCore,
}

impl ClosingAgent {
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
        "Generate a friendly, reassuring greeting from Robert, the Closing Specialist (use emoji \u{1F4DD}). \
         Make it warm and professional, showing expertise in the closing process. \
         Include a brief mention of making the closing process smooth and stress-free."
            .to_string()
    }

    fn closing_prompt(&self, prompt: &str, context: &Context) -> String {
        let body = format!(
            "As Robert, a knowledgeable Closing Specialist (\u{1F4DD}), create a detailed closing guide:\n\n\
             User Request: {prompt}\n\n\
             Create a natural, conversational response that includes:\n\
             1. A brief acknowledgment of their current stage\n\
             2. Detailed closing guidance including:\n\
                - Required documentation\n\
                - Timeline with key dates\n\
                - Inspection requirements\n\
                - Closing costs breakdown\n\
                - Final walkthrough details\n\
                - Property handover process\n\
             3. Key tips for a smooth closing\n\
             4. A follow-up question about their specific concerns\n\n\
             Make the response reassuring and friendly, with occasional light humor.\n\
             Format the information clearly but keep it conversational.\n\
             Include realistic but generated process details.\n\n\
             Important: Generate new, unique guidance each time. Don't reference external websites or specific laws."
        );
        contextualize(&body, context)
    }

    fn extraction_prompt(&self, response: &str) -> String {
        format!(
            "Extract and structure the closing process details from this response into JSON format.\n\
             Include the following sections:\n\
             - documentation (array of required documents)\n\
             - timeline (array of steps with dates and descriptions)\n\
             - inspections (object with required_inspections, scheduling_info)\n\
             - costs (object with closing_costs_breakdown)\n\
             - walkthrough (object with checklist, scheduling_info)\n\
             - handover (object with process_steps, requirements)\n\
             - tips (array of closing tips)\n\n\
             Response text:\n{response}\n\n\
             Return only the JSON object with the structured closing details."
        )
    }
}

#[async_trait]
impl Agent for ClosingAgent {
    fn capability(&self) -> Capability {
        Capability::Closing
    }

    async fn process(&self, prompt: &str, context: &Context) -> Result<AgentReply, ModelError> {
        let client = self.core.client.as_ref();

        let greeting = greet(client, self.greeting_prompt(), self.core.greeting_pause).await?;

        tracing::debug!("generating closing guidance");
        let closing_response = generate_text(client, self.closing_prompt(prompt, context)).await?;

        let process = extract_structured(
            client,
            self.extraction_prompt(&closing_response),
            &closing_response,
        )
        .await;

        let facts = match process.as_object() {
            Some(map) if process.get("parsed") != Some(&json!(false)) => {
                ContextUpdate::closing(map.clone())
            }
            _ => ContextUpdate::default(),
        };

        Ok(AgentReply {
            message: format!("{greeting}\n\n{closing_response}"),
            details: json!({
                "type": "closing",
                "greeting_delay": self.core.greeting_pause.as_secs(),
                "process": process,
            }),
            facts,
        })
    }
}
