pub mod agent;
pub mod embeddings;
pub mod http;
pub mod index;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod sources;
pub mod tools;

#[cfg(test)]
mod tests {
    use super::orchestrator::BioAgent;
    use super::tools::ToolRegistry;
    use super::llm::Llm;
    use bal_core::error::AppError;

    struct Silent;

    impl Llm for Silent {
        fn generate(&self, _prompt: &str, _stop: &[&str]) -> Result<String, AppError> {
            Ok("Final Answer: nothing to add".to_string())
        }
    }

    #[test]
    fn agent_rejects_unknown_template() {
        let err = BioAgent::new(ToolRegistry::new(), Box::new(Silent), "missing", 3)
            .err()
            .unwrap();
        assert_eq!(err.code, "PROMPT_TEMPLATE_NOT_FOUND");
    }

    #[test]
    fn agent_answers_through_template() {
        let agent = BioAgent::new(ToolRegistry::new(), Box::new(Silent), "target_validation", 3).unwrap();
        let trace = agent.run("CD47").unwrap();
        assert!(trace.question.contains("Query: CD47"));
        assert_eq!(trace.answer, "nothing to add");
    }
}
