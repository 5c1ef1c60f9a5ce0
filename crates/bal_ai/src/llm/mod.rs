use bal_core::error::AppError;

/// Text-generation backend used by the reasoning engine.
///
/// `stop` lists sequences at which generation must end; implementations
/// return the text before the first stop sequence.
pub trait Llm: Send + Sync {
    fn generate(&self, prompt: &str, stop: &[&str]) -> Result<String, AppError>;
}

/// Cut `text` at the earliest occurrence of any stop sequence.
pub fn truncate_at_stop<'a>(text: &'a str, stop: &[&str]) -> &'a str {
    let cut = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s))
        .min()
        .unwrap_or(text.len());
    &text[..cut]
}

pub mod hf_llm;

#[cfg(test)]
mod tests {
    use super::truncate_at_stop;

    #[test]
    fn cuts_at_earliest_stop_sequence() {
        let text = "Action: PubMed\nAction Input: CD47\nObservation: made up\nFinal Answer: x";
        assert_eq!(
            truncate_at_stop(text, &["\nFinal Answer:", "\nObservation:"]),
            "Action: PubMed\nAction Input: CD47"
        );
        assert_eq!(truncate_at_stop("no stops", &["\nObservation:"]), "no stops");
    }
}
