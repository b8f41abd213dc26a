//! Perspective routing
//!
//! Asks the mediator model which registered perspectives should answer a
//! query. Routing is best effort: any failure selects every registered
//! perspective instead.

use crate::llm::LLMClient;
use crate::orchestration::synthesis::extract_json_object;
use crate::workers::WorkerRegistry;
use serde_json::Value;
use std::sync::Arc;

const ROUTER_SYSTEM_PROMPT: &str = "You are a neutral mediator deciding which perspectives should answer a question.";

pub struct PerspectiveRouter {
    llm: Arc<dyn LLMClient>,
    registry: Arc<WorkerRegistry>,
}

impl PerspectiveRouter {
    pub fn new(llm: Arc<dyn LLMClient>, registry: Arc<WorkerRegistry>) -> Self {
        Self { llm, registry }
    }

    fn routing_prompt(query: &str, available: &[String]) -> String {
        let available_json = serde_json::to_string(available).unwrap_or_default();
        format!(
            "Determine which perspectives should respond to the query.\n\
             Available perspectives: {available_json}\n\
             Return a JSON object like:\n\
             {{\"agents_to_invoke\": {available_json}}}\n\
             User query: {query}"
        )
    }

    /// Pull registered keys out of the router's reply, preserving its order
    ///
    /// Accepts `agents_to_invoke` or `perspectives` as the list field.
    /// Unknown keys are dropped. Returns `None` when nothing usable remains.
    pub fn parse_selection(output: &str, available: &[String]) -> Option<Vec<String>> {
        let map = extract_json_object(output)?;
        let items = ["agents_to_invoke", "perspectives"]
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))?;

        let mut selected: Vec<String> = Vec::new();
        for item in items {
            let Some(key) = item.as_str().map(WorkerRegistry::normalize_key) else {
                continue;
            };
            if available.contains(&key) && !selected.contains(&key) {
                selected.push(key);
            }
        }

        if selected.is_empty() {
            None
        } else {
            Some(selected)
        }
    }

    /// Choose worker keys for `query`
    ///
    /// Falls back to all registered keys when the model call fails or its
    /// reply names no registered perspective.
    pub async fn select(&self, query: &str) -> Vec<String> {
        let available = self.registry.keys();
        if available.len() <= 1 {
            return available;
        }

        let prompt = Self::routing_prompt(query, &available);
        let output = match self
            .llm
            .generate_with_system(ROUTER_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Routing call failed, selecting every perspective");
                return available;
            }
        };

        match Self::parse_selection(&output, &available) {
            Some(selected) => {
                tracing::debug!(selected = ?selected, "Router selected perspectives");
                selected
            }
            None => {
                tracing::warn!(
                    output = %output,
                    "Could not parse routing decision, selecting every perspective"
                );
                available
            }
        }
    }
}
