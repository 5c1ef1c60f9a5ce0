use bal_core::error::{AppError, PROMPT_TEMPLATE_NOT_FOUND};

pub const DEFAULT_TEMPLATE: &str = "target_validation";

const INPUT_PLACEHOLDER: &str = "{input}";

const TARGET_VALIDATION: &str = r#"You are a biomedical research agent assisting with early-stage drug discovery.

You will be given a user query related to a potential drug target. Your task is to:
1. Assess the target's biological relevance and known function.
2. Retrieve and synthesize information from literature, protein databases, clinical trials, and internal RAG memory.
3. Provide a concise summary of current evidence.
4. List known limitations or regulatory issues (especially in US/EU).

Respond in clear scientific language appropriate for a biotech R&D team.

---

Query: {input}

Start your analysis below:
"#;

const TEMPLATES: &[(&str, &str)] = &[(DEFAULT_TEMPLATE, TARGET_VALIDATION)];

pub fn template_names() -> Vec<&'static str> {
    TEMPLATES.iter().map(|(name, _)| *name).collect()
}

pub fn load_prompt_template(name: &str) -> Result<&'static str, AppError> {
    TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, body)| *body)
        .ok_or_else(|| {
            AppError::new(PROMPT_TEMPLATE_NOT_FOUND, "Prompt template not found").with_details(format!(
                "name={name}; available={}",
                template_names().join(",")
            ))
        })
}

pub fn render_template(template: &str, input: &str) -> String {
    template.replace(INPUT_PLACEHOLDER, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_query_into_target_validation() {
        let t = load_prompt_template("target_validation").unwrap();
        let out = render_template(t, "Is CD47 a valid target?");
        assert!(out.contains("Query: Is CD47 a valid target?\n"));
        assert!(!out.contains(INPUT_PLACEHOLDER));
        assert!(out.starts_with("You are a biomedical research agent"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let err = load_prompt_template("nope").unwrap_err();
        assert_eq!(err.code, PROMPT_TEMPLATE_NOT_FOUND);
        assert!(err.details.unwrap().contains("target_validation"));
    }
}
