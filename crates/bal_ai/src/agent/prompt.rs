use crate::tools::ToolRegistry;

use super::TraceStep;

/// Zero-shot ReAct prompt: tools, action format, question, then the scratchpad
/// of every prior step so the model sees all evidence gathered so far.
pub fn agent_prompt(tools: &ToolRegistry, question: &str, steps: &[TraceStep]) -> String {
    let descriptions = tools.render_descriptions();
    let names = tools.tool_names().join(", ");
    let scratchpad = render_scratchpad(steps);
    format!(
        r#"Answer the following questions as best you can. You have access to the following tools:

{descriptions}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {question}
Thought:{scratchpad}"#
    )
}

fn render_scratchpad(steps: &[TraceStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&step.thought_log);
        out.push_str("\nObservation: ");
        out.push_str(&step.observation);
        out.push_str("\nThought: ");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolDescriptor};
    use pretty_assertions::assert_eq;

    struct Nop;

    impl Tool for Nop {
        fn run(&self, _query: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn lists_tools_and_replays_scratchpad() {
        let mut reg = ToolRegistry::new();
        reg.register(ToolDescriptor::new("PubMed", "abstracts", Nop)).unwrap();
        reg.register(ToolDescriptor::new("UniProt", "proteins", Nop)).unwrap();

        let steps = vec![TraceStep {
            thought_log: " look it up\nAction: UniProt\nAction Input: CD47".to_string(),
            tool: "UniProt".to_string(),
            tool_input: "CD47".to_string(),
            observation: "UniProt ID: Q8NHL6".to_string(),
        }];
        let prompt = agent_prompt(&reg, "Is CD47 valid?", &steps);

        assert!(prompt.contains("PubMed: abstracts\nUniProt: proteins"));
        assert!(prompt.contains("should be one of [PubMed, UniProt]"));
        assert!(prompt.ends_with(
            "Question: Is CD47 valid?\nThought: look it up\nAction: UniProt\nAction Input: CD47\nObservation: UniProt ID: Q8NHL6\nThought: "
        ));
    }

    #[test]
    fn first_turn_ends_at_thought() {
        let reg = ToolRegistry::new();
        let prompt = agent_prompt(&reg, "q", &[]);
        assert_eq!(prompt.lines().last(), Some("Thought:"));
    }
}
