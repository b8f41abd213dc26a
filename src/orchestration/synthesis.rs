//! Merging worker answers into one [`AggregateResult`]
//!
//! The mediator model is asked for a structured object first. If that call
//! fails, times out or returns something that does not decode, a single raw
//! text call is made and the output is repaired by hand. On both paths the
//! perspective list is checked against the perspectives that actually
//! answered and overwritten when the model got it wrong.

use crate::llm::LLMClient;
use crate::types::{AggregateResult, AppError, Result, SynthesisPath, WorkerResponse};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Timeouts for the two synthesis calls
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub strict_timeout: Duration,
    pub fallback_timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            strict_timeout: Duration::from_secs(30),
            fallback_timeout: Duration::from_secs(30),
        }
    }
}

/// A synthesized result plus how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub result: AggregateResult,
    pub path: SynthesisPath,
    /// The model's perspective list was replaced with the real one
    pub corrected: bool,
}

/// Shape accepted on the fallback path, where only `summary` is required
#[derive(Debug, Deserialize)]
struct LenientAggregate {
    summary: String,
    #[serde(default)]
    conflicts: Option<String>,
    #[serde(default)]
    perspectives: Vec<String>,
}

const MEDIATOR_SYSTEM_PROMPT: &str = r#"You are a neutral mediator. You will receive answers to one question, each written from a different perspective. Your task is to:

1. Summarize the main points from all perspectives in a neutral and concise way.
2. List every perspective included in the summary.
3. If the perspectives disagree, describe the disagreements explicitly under "conflicts".

You MUST include all three fields in your response:
- "summary": string with the neutral summary
- "conflicts": string describing disagreements (use "" if there are none)
- "perspectives": array of perspective names, e.g. ["Conservative", "Liberal", "Socialist"]

Return ONLY a raw JSON object. Do NOT wrap it in markdown code blocks and do not add any text before or after it."#;

pub struct Synthesizer {
    llm: Arc<dyn LLMClient>,
    config: SynthesisConfig,
    schema: Value,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLMClient>, config: SynthesisConfig) -> Self {
        Self {
            llm,
            config,
            schema: aggregate_schema(),
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Merge `responses` into one result for `query`
    pub async fn synthesize(
        &self,
        query: &str,
        responses: &[WorkerResponse],
    ) -> Result<AggregateResult> {
        self.synthesize_detailed(query, responses)
            .await
            .map(|s| s.result)
    }

    /// Merge `responses`, reporting which path was taken and whether the
    /// perspective list had to be corrected
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] when `responses` is empty
    /// - [`AppError::SynthesisFailed`] when both the structured and the raw
    ///   call fail to yield a usable object
    pub async fn synthesize_detailed(
        &self,
        query: &str,
        responses: &[WorkerResponse],
    ) -> Result<Synthesis> {
        if responses.is_empty() {
            return Err(AppError::InvalidInput(
                "Cannot synthesize without any worker responses".to_string(),
            ));
        }

        let expected = expected_perspectives(responses);
        let system = self.system_prompt();
        let prompt = user_prompt(query, &format_responses(responses), &expected);

        match self.strict(&system, &prompt).await {
            Ok(result) => {
                let (result, corrected) = reconcile(result, &expected);
                tracing::info!(path = "strict", corrected, "Synthesis complete");
                Ok(Synthesis {
                    result,
                    path: SynthesisPath::Strict,
                    corrected,
                })
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    model = self.llm.model_name(),
                    "Structured synthesis failed, falling back to raw output"
                );
                let (result, injected) = self.fallback(&system, &prompt, &expected).await?;
                let (result, mismatched) = reconcile(result, &expected);
                let corrected = injected || mismatched;
                tracing::info!(path = "fallback", corrected, "Synthesis complete");
                Ok(Synthesis {
                    result,
                    path: SynthesisPath::Fallback,
                    corrected,
                })
            }
        }
    }

    fn system_prompt(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.schema).unwrap_or_default();
        format!(
            "{}\n\nThe JSON object must conform to this JSON schema:\n{}",
            MEDIATOR_SYSTEM_PROMPT, schema
        )
    }

    async fn strict(&self, system: &str, prompt: &str) -> Result<AggregateResult> {
        let value = tokio::time::timeout(
            self.config.strict_timeout,
            self.llm.generate_structured(system, prompt, &self.schema),
        )
        .await
        .map_err(|_| {
            AppError::SynthesisParseFailed(format!(
                "timed out after {}ms",
                self.config.strict_timeout.as_millis()
            ))
        })?
        .map_err(|e| AppError::SynthesisParseFailed(e.to_string()))?;

        serde_json::from_value(value).map_err(|e| AppError::SynthesisParseFailed(e.to_string()))
    }

    async fn fallback(
        &self,
        system: &str,
        prompt: &str,
        expected: &[String],
    ) -> Result<(AggregateResult, bool)> {
        let raw = tokio::time::timeout(
            self.config.fallback_timeout,
            self.llm.generate_with_system(system, prompt),
        )
        .await
        .map_err(|_| {
            AppError::SynthesisFailed(format!(
                "fallback call timed out after {}ms",
                self.config.fallback_timeout.as_millis()
            ))
        })?
        .map_err(|e| AppError::SynthesisFailed(format!("fallback call failed: {}", e)))?;

        tracing::debug!(raw_len = raw.len(), "Repairing raw synthesis output");
        repair_aggregate(&raw, expected)
    }
}

/// JSON schema of [`AggregateResult`], embedded in the mediator prompt
pub fn aggregate_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(AggregateResult)).unwrap_or_default()
}

/// Distinct perspectives of `responses`, in first-seen order
pub fn expected_perspectives(responses: &[WorkerResponse]) -> Vec<String> {
    let mut seen = Vec::new();
    for response in responses {
        if !seen.contains(&response.perspective) {
            seen.push(response.perspective.clone());
        }
    }
    seen
}

/// `"{perspective}: {content}"` blocks separated by a blank line
pub fn format_responses(responses: &[WorkerResponse]) -> String {
    responses
        .iter()
        .map(|r| format!("{}: {}", r.perspective, r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn user_prompt(query: &str, block: &str, expected: &[String]) -> String {
    let expected_json = serde_json::to_string(expected).unwrap_or_default();
    format!(
        "The user asked the following question:\n\"{query}\"\n\n\
         Here are the answers from each perspective:\n{block}\n\n\
         Synthesize these into one JSON object.\n\
         The \"perspectives\" array MUST be exactly: {expected_json}",
    )
}

/// Replace the model's perspective list when it differs from `expected`
///
/// Returns the result and whether a replacement happened. A result that
/// already matches is returned untouched.
pub fn reconcile(mut result: AggregateResult, expected: &[String]) -> (AggregateResult, bool) {
    if result.perspectives == expected {
        return (result, false);
    }

    let mismatch = AppError::SynthesisValidationMismatch {
        expected: expected.to_vec(),
        found: std::mem::take(&mut result.perspectives),
    };
    tracing::warn!(error = %mismatch, "Correcting synthesized perspective list");

    result.perspectives = expected.to_vec();
    (result, true)
}

/// Strip one enclosing triple-backtick fence, optionally tagged `json`
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
    {
        Some(inner) => inner.trim_start().trim_end_matches("```").trim(),
        None => trimmed,
    }
}

/// Parse a JSON object out of model output, tolerating a code fence or
/// surrounding prose
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let cleaned = strip_code_fence(raw);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        return Some(map);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn non_empty_list(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match map.remove(key) {
        Some(Value::Array(items)) if !items.is_empty() => Some(Value::Array(items)),
        _ => None,
    }
}

/// Build an [`AggregateResult`] from raw fallback output
///
/// A missing or empty perspective list is filled from `expected`; missing
/// conflicts default to an empty string. The summary is required. The flag
/// is true when the perspective list was filled in.
pub fn repair_aggregate(raw: &str, expected: &[String]) -> Result<(AggregateResult, bool)> {
    let mut map = extract_json_object(raw).ok_or_else(|| {
        AppError::SynthesisFailed("fallback output did not contain a JSON object".to_string())
    })?;

    let listed = non_empty_list(&mut map, "perspectives")
        .or_else(|| non_empty_list(&mut map, "political_parties"));
    let injected = listed.is_none();
    if injected {
        tracing::warn!(
            expected = ?expected,
            "Fallback output had no perspective list, using responding perspectives"
        );
    }
    map.insert(
        "perspectives".to_string(),
        listed.unwrap_or_else(|| Value::from(expected.to_vec())),
    );

    if !map.contains_key("conflicts") {
        if let Some(conflicts) = map.remove("contradictions") {
            map.insert("conflicts".to_string(), conflicts);
        }
    }

    let lenient: LenientAggregate = serde_json::from_value(Value::Object(map))
        .map_err(|e| AppError::SynthesisFailed(format!("fallback output was malformed: {}", e)))?;

    let result = AggregateResult {
        summary: lenient.summary,
        conflicts: lenient.conflicts.unwrap_or_default(),
        perspectives: lenient.perspectives,
    };
    Ok((result, injected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rstest::rstest;

    /// Replies with queued raw strings, one per call
    struct ScriptedLLM {
        replies: Mutex<Vec<String>>,
        calls: Mutex<usize>,
    }

    impl ScriptedLLM {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLLM {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.generate_with_system("", prompt).await
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            *self.calls.lock() += 1;
            self.replies
                .lock()
                .pop()
                .ok_or_else(|| AppError::LLM("script exhausted".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn three_responses() -> Vec<WorkerResponse> {
        vec![
            WorkerResponse::new("Conservative", "Cut spending."),
            WorkerResponse::new("Liberal", "Invest in programs."),
            WorkerResponse::new("Socialist", "Public ownership."),
        ]
    }

    fn expected_three() -> Vec<String> {
        vec![
            "Conservative".to_string(),
            "Liberal".to_string(),
            "Socialist".to_string(),
        ]
    }

    fn synthesizer(llm: Arc<ScriptedLLM>) -> Synthesizer {
        Synthesizer::new(llm, SynthesisConfig::default())
    }

    #[test]
    fn test_expected_perspectives_dedups_in_order() {
        let responses = vec![
            WorkerResponse::new("Liberal", "a"),
            WorkerResponse::new("Conservative", "b"),
            WorkerResponse::new("Liberal", "c"),
        ];
        assert_eq!(expected_perspectives(&responses), vec!["Liberal", "Conservative"]);
    }

    #[test]
    fn test_format_responses() {
        let responses = vec![
            WorkerResponse::new("X", "foo"),
            WorkerResponse::new("Y", "bar"),
        ];
        assert_eq!(format_responses(&responses), "X: foo\n\nY: bar");
    }

    #[test]
    fn test_schema_lists_all_fields() {
        let schema = aggregate_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"summary"));
        assert!(required.contains(&"conflicts"));
        assert!(required.contains(&"perspectives"));
    }

    #[rstest]
    #[case::plain("{\"a\":1}", "{\"a\":1}")]
    #[case::json_fence("```json\n{\"a\":1}\n```", "{\"a\":1}")]
    #[case::bare_fence("```\n{\"a\":1}\n```", "{\"a\":1}")]
    #[case::fence_same_line("```json {\"a\":1}```", "{\"a\":1}")]
    #[case::surrounding_whitespace("  \n```json\n{\"a\":1}\n```\n  ", "{\"a\":1}")]
    fn test_strip_code_fence(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_code_fence(input), expected);
    }

    #[rstest]
    #[case::fenced("```json\n{\"summary\":\"s\"}\n```", true)]
    #[case::prose("Here you go: {\"summary\":\"s\"} hope it helps", true)]
    #[case::array("[1, 2, 3]", false)]
    #[case::garbage("no json at all", false)]
    #[case::reversed_braces("} nope {", false)]
    fn test_extract_json_object(#[case] input: &str, #[case] found: bool) {
        assert_eq!(extract_json_object(input).is_some(), found);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::truncated(vec!["Conservative"])]
    #[case::extra(vec!["Conservative", "Liberal", "Socialist", "Green"])]
    #[case::duplicated(vec!["Conservative", "Liberal", "Liberal", "Socialist"])]
    #[case::reordered(vec!["Socialist", "Liberal", "Conservative"])]
    fn test_reconcile_overwrites_mismatches(#[case] generated: Vec<&str>) {
        let result = AggregateResult {
            summary: "s".to_string(),
            conflicts: String::new(),
            perspectives: generated.into_iter().map(String::from).collect(),
        };
        let (fixed, corrected) = reconcile(result, &expected_three());
        assert!(corrected);
        assert_eq!(fixed.perspectives, expected_three());
        assert_eq!(fixed.summary, "s");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let result = AggregateResult {
            summary: "s".to_string(),
            conflicts: "c".to_string(),
            perspectives: vec!["Liberal".to_string()],
        };
        let (once, corrected_once) = reconcile(result, &expected_three());
        let (twice, corrected_twice) = reconcile(once.clone(), &expected_three());
        assert!(corrected_once);
        assert!(!corrected_twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_repair_injects_missing_perspectives() {
        let (repaired, injected) =
            repair_aggregate("{\"summary\": \"s\"}", &expected_three()).unwrap();
        assert!(injected);
        assert_eq!(repaired.perspectives, expected_three());
        assert_eq!(repaired.conflicts, "");
    }

    #[test]
    fn test_repair_accepts_legacy_names() {
        let raw = r#"{"summary": "s", "contradictions": "c", "political_parties": ["Liberal"], "perspectives": []}"#;
        let (repaired, injected) = repair_aggregate(raw, &expected_three()).unwrap();
        assert!(!injected);
        assert_eq!(repaired.conflicts, "c");
        assert_eq!(repaired.perspectives, vec!["Liberal"]);
    }

    #[test]
    fn test_repair_handles_null_conflicts() {
        let raw = r#"{"summary": "s", "conflicts": null}"#;
        let (repaired, _) = repair_aggregate(raw, &expected_three()).unwrap();
        assert_eq!(repaired.conflicts, "");
    }

    #[test]
    fn test_repair_requires_summary() {
        let result = repair_aggregate("{\"conflicts\": \"c\"}", &expected_three());
        assert!(matches!(result, Err(AppError::SynthesisFailed(_))));
    }

    #[tokio::test]
    async fn test_strict_path_with_correction() {
        let llm = ScriptedLLM::new(&[
            r#"{"summary": "Three views.", "conflicts": "Role of the state.", "perspectives": ["Conservative"]}"#,
        ]);
        let synthesis = synthesizer(Arc::clone(&llm))
            .synthesize_detailed("What about healthcare?", &three_responses())
            .await
            .unwrap();

        assert_eq!(synthesis.path, SynthesisPath::Strict);
        assert!(synthesis.corrected);
        assert_eq!(synthesis.result.perspectives, expected_three());
        assert_eq!(synthesis.result.conflicts, "Role of the state.");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_strict_path_without_correction() {
        let llm = ScriptedLLM::new(&[
            r#"{"summary": "s", "conflicts": "", "perspectives": ["Conservative", "Liberal", "Socialist"]}"#,
        ]);
        let synthesis = synthesizer(llm)
            .synthesize_detailed("q", &three_responses())
            .await
            .unwrap();
        assert_eq!(synthesis.path, SynthesisPath::Strict);
        assert!(!synthesis.corrected);
    }

    #[tokio::test]
    async fn test_fenced_output_uses_exactly_one_fallback_call() {
        let fenced = "```json\n{\"summary\": \"Merged.\", \"conflicts\": \"\"}\n```";
        let llm = ScriptedLLM::new(&[fenced, fenced, fenced]);
        let synthesis = synthesizer(Arc::clone(&llm))
            .synthesize_detailed("q", &three_responses())
            .await
            .unwrap();

        assert_eq!(synthesis.path, SynthesisPath::Fallback);
        assert_eq!(synthesis.result.summary, "Merged.");
        assert_eq!(synthesis.result.perspectives, expected_three());
        assert!(synthesis.corrected);
        // one strict call and one fallback call
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_strict_missing_field_falls_back() {
        let llm = ScriptedLLM::new(&[
            r#"{"summary": "no conflicts field", "perspectives": ["Liberal"]}"#,
            r#"{"summary": "repaired"}"#,
        ]);
        let responses = vec![WorkerResponse::new("Liberal", "x")];
        let result = synthesizer(llm).synthesize("q", &responses).await.unwrap();
        assert_eq!(result.summary, "repaired");
        assert_eq!(result.perspectives, vec!["Liberal"]);
    }

    #[tokio::test]
    async fn test_fallback_with_matching_list_is_not_corrected() {
        let llm = ScriptedLLM::new(&[
            "not json",
            r#"Sure: {"summary": "s", "conflicts": "", "perspectives": ["Conservative", "Liberal", "Socialist"]}"#,
        ]);
        let synthesis = synthesizer(llm)
            .synthesize_detailed("q", &three_responses())
            .await
            .unwrap();
        assert_eq!(synthesis.path, SynthesisPath::Fallback);
        assert!(!synthesis.corrected);
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_synthesis_failed() {
        let llm = ScriptedLLM::new(&["not json", "still not json"]);
        let result = synthesizer(llm).synthesize("q", &three_responses()).await;
        assert!(matches!(result, Err(AppError::SynthesisFailed(_))));
    }

    #[tokio::test]
    async fn test_generator_error_on_fallback_is_synthesis_failed() {
        let llm = ScriptedLLM::new(&["not json"]);
        let result = synthesizer(llm).synthesize("q", &three_responses()).await;
        match result {
            Err(AppError::SynthesisFailed(msg)) => assert!(msg.contains("script exhausted")),
            other => panic!("Expected SynthesisFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_responses_rejected() {
        let llm = ScriptedLLM::new(&[]);
        let result = synthesizer(Arc::clone(&llm)).synthesize("q", &[]).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_response_x_y_scenario() {
        let llm = ScriptedLLM::new(&[r#"{"summary": "foo", "conflicts": "", "perspectives": []}"#]);
        let responses = vec![WorkerResponse::new("X", "foo")];
        let result = synthesizer(llm).synthesize("q", &responses).await.unwrap();
        assert_eq!(result.perspectives, vec!["X"]);
    }
}
