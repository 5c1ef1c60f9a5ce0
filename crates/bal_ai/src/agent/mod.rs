//! ReAct-style reasoning loop: ask the model for one step, run the chosen
//! tool, feed the observation back, until the model gives a final answer.

use bal_core::error::{AppError, REASONING_ITERATION_LIMIT};
use serde::{Deserialize, Serialize};

use crate::llm::{truncate_at_stop, Llm};
use crate::tools::ToolRegistry;

mod parse;
mod prompt;

pub use parse::{parse_step, AgentStep};
pub use prompt::agent_prompt;

/// Generation halts before the model can invent its own observation.
pub const STOP_SEQUENCES: [&str; 2] = ["\nObservation:", "\n\tObservation:"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    /// Raw model text for this step (thought plus action lines).
    pub thought_log: String,
    pub tool: String,
    pub tool_input: String,
    pub observation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerTrace {
    pub question: String,
    pub steps: Vec<TraceStep>,
    pub answer: String,
}

pub struct ReasoningEngine<'a> {
    llm: &'a dyn Llm,
    max_iterations: usize,
}

impl<'a> ReasoningEngine<'a> {
    pub fn new(llm: &'a dyn Llm, max_iterations: usize) -> Self {
        Self {
            llm,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run the loop for one question. The model is called at most
    /// `max_iterations` times and at most one tool runs per call.
    pub fn answer(&self, question: &str, tools: &ToolRegistry) -> Result<AnswerTrace, AppError> {
        let mut steps: Vec<TraceStep> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = agent_prompt(tools, question, &steps);
            let raw = self
                .llm
                .generate(&prompt, &STOP_SEQUENCES)
                .map_err(|e| e.into_reasoning_failure("Language model call failed"))?;
            let output = truncate_at_stop(&raw, &STOP_SEQUENCES).trim_end();

            match parse_step(output)? {
                AgentStep::Finish { answer } => {
                    tracing::info!(iteration, answer_len = answer.len(), "reasoning finished");
                    return Ok(AnswerTrace {
                        question: question.to_string(),
                        steps,
                        answer,
                    });
                }
                AgentStep::ToolCall { tool, input } => {
                    let observation = match tools.get(&tool) {
                        Some(descriptor) => descriptor.invoke(&input),
                        None => {
                            tracing::warn!(iteration, tool = %tool, "model asked for unknown tool");
                            format!(
                                "{tool} is not a valid tool, try one of [{}].",
                                tools.tool_names().join(", ")
                            )
                        }
                    };
                    tracing::info!(
                        iteration,
                        tool = %tool,
                        input_len = input.len(),
                        observation_len = observation.len(),
                        "tool step"
                    );
                    steps.push(TraceStep {
                        thought_log: output.to_string(),
                        tool,
                        tool_input: input,
                        observation,
                    });
                }
            }
        }

        Err(AppError::new(
            REASONING_ITERATION_LIMIT,
            "Reasoning stopped before reaching a final answer",
        )
        .with_details(format!("max_iterations={}", self.max_iterations)))
    }
}
