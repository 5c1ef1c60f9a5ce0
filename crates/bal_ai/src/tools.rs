//! Tool registry: the named capabilities the reasoning engine may call.

use std::fmt;

use bal_core::error::{AppError, TOOL_DUPLICATE_NAME, TOOL_INVALID_NAME};

use crate::sources::EvidenceSource;

/// Uniform invocation interface. `run` never fails; problems are reported in
/// the returned text.
pub trait Tool: Send + Sync {
    fn run(&self, query: &str) -> String;
}

impl<S: EvidenceSource> Tool for S {
    fn run(&self, query: &str) -> String {
        self.fetch(query).into_text()
    }
}

pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    tool: Box<dyn Tool>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, tool: impl Tool + 'static) -> Self {
        Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            tool: Box::new(tool),
        }
    }

    pub fn invoke(&self, query: &str) -> String {
        self.tool.run(query)
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Ordered set of uniquely named tools. Registration order is preserved and
/// used when presenting tools to the model.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), AppError> {
        if descriptor.name.is_empty() {
            return Err(AppError::new(TOOL_INVALID_NAME, "Tool name must not be empty"));
        }
        if self.get(&descriptor.name).is_some() {
            return Err(AppError::new(TOOL_DUPLICATE_NAME, "Tool name already registered")
                .with_details(format!("name={}", descriptor.name)));
        }
        tracing::debug!(name = %descriptor.name, "registered tool");
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// `name: description` per line, in registration order.
    pub fn render_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Echo(&'static str);

    impl Tool for Echo {
        fn run(&self, query: &str) -> String {
            format!("{}:{query}", self.0)
        }
    }

    #[test]
    fn rejects_duplicate_names_and_keeps_order() {
        let mut reg = ToolRegistry::new();
        reg.register(ToolDescriptor::new("UniProt", "proteins", Echo("u"))).unwrap();
        reg.register(ToolDescriptor::new("PubMed", "abstracts", Echo("p"))).unwrap();

        let err = reg
            .register(ToolDescriptor::new("UniProt", "again", Echo("x")))
            .unwrap_err();
        assert_eq!(err.code, TOOL_DUPLICATE_NAME);

        assert_eq!(reg.tool_names(), vec!["UniProt", "PubMed"]);
        assert_eq!(reg.list()[0].description, "proteins");
        assert_eq!(reg.render_descriptions(), "UniProt: proteins\nPubMed: abstracts");
        assert_eq!(reg.get("PubMed").unwrap().invoke("CD47"), "p:CD47");
        assert!(reg.get("pubmed").is_none());
    }

    #[test]
    fn rejects_blank_name() {
        let mut reg = ToolRegistry::new();
        let err = reg.register(ToolDescriptor::new("  ", "d", Echo("e"))).unwrap_err();
        assert_eq!(err.code, TOOL_INVALID_NAME);
        assert!(reg.is_empty());
    }
}
