use bal_core::error::{AppError, REASONING_FAILED};
use serde::{Deserialize, Serialize};

const FINAL_ANSWER: &str = "Final Answer:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";

/// One decision of the model: call exactly one tool, or finish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentStep {
    ToolCall { tool: String, input: String },
    Finish { answer: String },
}

fn parse_failure(message: &str, output: &str) -> AppError {
    AppError::new(REASONING_FAILED, message).with_details(format!("output={output:?}"))
}

/// Parse one model turn.
///
/// Accepts either an `Action:` / `Action Input:` pair or a `Final Answer:`.
/// Both at once, neither, or an action without input is a `REASONING_FAILED`.
pub fn parse_step(output: &str) -> Result<AgentStep, AppError> {
    let final_at = output.find(FINAL_ANSWER);
    let action_at = output.find(ACTION);

    match (action_at, final_at) {
        (Some(_), Some(_)) => Err(parse_failure(
            "Model output contains both an action and a final answer",
            output,
        )),
        (None, Some(at)) => {
            let answer = output[at + FINAL_ANSWER.len()..].trim();
            if answer.is_empty() {
                return Err(parse_failure("Model produced an empty final answer", output));
            }
            Ok(AgentStep::Finish {
                answer: answer.to_string(),
            })
        }
        (Some(at), None) => {
            let rest = &output[at + ACTION.len()..];
            let input_at = rest
                .find(ACTION_INPUT)
                .ok_or_else(|| parse_failure("Model action is missing an Action Input", output))?;
            let tool = clean(&rest[..input_at]);
            if tool.is_empty() {
                return Err(parse_failure("Model action names no tool", output));
            }
            // The input may start on the line after the marker.
            let input = rest[input_at + ACTION_INPUT.len()..]
                .lines()
                .map(clean)
                .find(|line| !line.is_empty())
                .ok_or_else(|| parse_failure("Model action is missing an Action Input", output))?;
            Ok(AgentStep::ToolCall { tool, input })
        }
        (None, None) => Err(parse_failure(
            "Model output is neither an action nor a final answer",
            output,
        )),
    }
}

fn clean(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '"' || c == '`')
        .trim()
        .to_string()
}
