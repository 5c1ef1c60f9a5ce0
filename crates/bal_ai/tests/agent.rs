use std::sync::{Arc, Mutex};

use bal_ai::agent::{ReasoningEngine, STOP_SEQUENCES};
use bal_ai::http::{HttpResponse, HttpTransport};
use bal_ai::llm::Llm;
use bal_ai::orchestrator::{build_registry, BioAgent, PUBMED_DESCRIPTION};
use bal_ai::sources::UNAVAILABLE_MARKER;
use bal_ai::tools::{Tool, ToolDescriptor, ToolRegistry};
use bal_core::config::{AppConfig, TOKEN_VAR};
use bal_core::error::{AppError, REASONING_FAILED, REASONING_ITERATION_LIMIT, SOURCE_UNAVAILABLE};
use pretty_assertions::assert_eq;

/// Replays canned completions and records every prompt it was given.
struct ScriptedLlm {
    outputs: Mutex<Vec<String>>,
    repeat_last: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(outputs: &[&str]) -> Self {
        Self {
            outputs: Mutex::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
            repeat_last: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn forever(output: &str) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(&[output])
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Llm for ScriptedLlm {
    fn generate(&self, prompt: &str, stop: &[&str]) -> Result<String, AppError> {
        assert_eq!(stop, &STOP_SEQUENCES[..]);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut outputs = self.outputs.lock().unwrap();
        let next = if self.repeat_last {
            outputs.last().cloned()
        } else {
            outputs.pop()
        };
        next.ok_or_else(|| AppError::new("LLM_REQUEST_FAILED", "script exhausted"))
    }
}

/// Records each query and answers with a fixed observation.
struct Recording {
    reply: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Tool for Recording {
    fn run(&self, query: &str) -> String {
        self.seen.lock().unwrap().push(query.to_string());
        self.reply.to_string()
    }
}

fn registry(seen: &Arc<Mutex<Vec<String>>>) -> ToolRegistry {
    let mut reg = ToolRegistry::new();
    reg.register(ToolDescriptor::new(
        "UniProt",
        "Provides protein and gene target information from UniProt database.",
        Recording {
            reply: "UniProt ID: Q8NHL6\nProtein Name: Leukocyte surface antigen CD47",
            seen: seen.clone(),
        },
    ))
    .unwrap();
    reg.register(ToolDescriptor::new(
        "ClinicalTrials",
        "Searches ClinicalTrials.gov for current trials related to the input query.",
        Recording {
            reply: "Trial ID: NCT00000001",
            seen: seen.clone(),
        },
    ))
    .unwrap();
    reg
}

#[test]
fn tool_call_then_final_answer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let reg = registry(&seen);
    let llm = ScriptedLlm::new(&[
        " I should look up the target protein.\nAction: UniProt\nAction Input: CD47",
        " I now know the final answer\nFinal Answer: CD47 (Q8NHL6) is a plausible target.",
    ]);

    let trace = ReasoningEngine::new(&llm, 5)
        .answer("Is CD47 a valid target?", &reg)
        .unwrap();

    assert_eq!(trace.answer, "CD47 (Q8NHL6) is a plausible target.");
    assert_eq!(trace.steps.len(), 1);
    assert_eq!(trace.steps[0].tool, "UniProt");
    assert_eq!(trace.steps[0].tool_input, "CD47");
    assert_eq!(*seen.lock().unwrap(), vec!["CD47".to_string()]);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Leukocyte surface antigen CD47"));
    assert!(prompts[1].contains(
        "Action: UniProt\nAction Input: CD47\nObservation: UniProt ID: Q8NHL6\nProtein Name: Leukocyte surface antigen CD47\nThought: "
    ));
    assert!(prompts[0].contains("UniProt: Provides protein and gene target information from UniProt database.\nClinicalTrials:"));
}

#[test]
fn evidence_from_every_prior_step_is_resent() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let reg = registry(&seen);
    let llm = ScriptedLlm::new(&[
        " protein first\nAction: UniProt\nAction Input: CD47",
        " now trials\nAction: ClinicalTrials\nAction Input: CD47 solid tumor",
        " done\nFinal Answer: Evidence gathered.",
    ]);

    let trace = ReasoningEngine::new(&llm, 5).answer("q", &reg).unwrap();
    assert_eq!(trace.steps.len(), 2);

    let last = llm.prompts().pop().unwrap();
    assert!(last.contains("Observation: UniProt ID: Q8NHL6"));
    assert!(last.contains("Observation: Trial ID: NCT00000001"));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn unparseable_output_is_a_reasoning_failure() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let llm = ScriptedLlm::new(&["CD47 is interesting but I will not follow the format."]);
    let err = ReasoningEngine::new(&llm, 5)
        .answer("q", &registry(&seen))
        .unwrap_err();
    assert_eq!(err.code, REASONING_FAILED);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn action_and_final_answer_together_is_rejected() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let llm = ScriptedLlm::new(&["Action: UniProt\nAction Input: CD47\nFinal Answer: guessed"]);
    let err = ReasoningEngine::new(&llm, 5)
        .answer("q", &registry(&seen))
        .unwrap_err();
    assert_eq!(err.code, REASONING_FAILED);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn never_finishing_hits_iteration_limit_after_exact_call_count() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let llm = ScriptedLlm::forever(" again\nAction: UniProt\nAction Input: CD47");
    let err = ReasoningEngine::new(&llm, 4)
        .answer("q", &registry(&seen))
        .unwrap_err();

    assert_eq!(err.code, REASONING_ITERATION_LIMIT);
    assert_eq!(llm.prompts().len(), 4);
    // One tool call per model call.
    assert_eq!(seen.lock().unwrap().len(), 4);
}

#[test]
fn unknown_tool_becomes_a_recoverable_observation() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let llm = ScriptedLlm::new(&[
        " try google\nAction: Google\nAction Input: CD47",
        " fine\nFinal Answer: recovered",
    ]);
    let trace = ReasoningEngine::new(&llm, 3)
        .answer("q", &registry(&seen))
        .unwrap();

    assert_eq!(trace.answer, "recovered");
    assert_eq!(
        trace.steps[0].observation,
        "Google is not a valid tool, try one of [UniProt, ClinicalTrials]."
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn model_failure_is_wrapped_as_reasoning_failure() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let llm = ScriptedLlm::new(&[]);
    let err = ReasoningEngine::new(&llm, 3)
        .answer("q", &registry(&seen))
        .unwrap_err();
    assert_eq!(err.code, REASONING_FAILED);
    assert!(err.details.unwrap().contains("LLM_REQUEST_FAILED"));
}

struct Offline;

impl HttpTransport for Offline {
    fn get(&self, _url: &str, _query: &[(&str, &str)]) -> Result<HttpResponse, AppError> {
        Err(AppError::new(SOURCE_UNAVAILABLE, "HTTP request did not complete").with_retryable(true))
    }

    fn post_json(
        &self,
        _url: &str,
        _bearer_token: Option<&str>,
        _body: &serde_json::Value,
    ) -> Result<HttpResponse, AppError> {
        Err(AppError::new(SOURCE_UNAVAILABLE, "HTTP request did not complete").with_retryable(true))
    }
}

fn test_config() -> AppConfig {
    AppConfig::from_lookup(|k| (k == TOKEN_VAR).then(|| "hf_test".to_string())).unwrap()
}

#[test]
fn default_registry_lists_sources_in_fixed_order() {
    let reg = build_registry(&test_config(), Arc::new(Offline), None).unwrap();
    assert_eq!(reg.tool_names(), vec!["PubMed", "UniProt", "ClinicalTrials"]);
    assert_eq!(reg.list()[0].description, PUBMED_DESCRIPTION);
}

#[test]
fn agent_survives_unreachable_sources() {
    let reg = build_registry(&test_config(), Arc::new(Offline), None).unwrap();
    let llm = ScriptedLlm::new(&[
        " check trials\nAction: ClinicalTrials\nAction Input: CD47",
        " sources are down\nFinal Answer: Could not verify trial status.",
    ]);
    let agent = BioAgent::new(reg, Box::new(llm), "target_validation", 5).unwrap();

    let trace = agent.run("Is CD47 a valid target?").unwrap();
    assert!(trace.steps[0].observation.starts_with(UNAVAILABLE_MARKER));
    assert!(trace.question.contains("Query: Is CD47 a valid target?"));
    assert_eq!(trace.answer, "Could not verify trial status.");
}
