//! Prompt builder: renders definitions with Handlebars.

use crate::loader::load_prompt;
use crate::types::{BuiltPrompt, PromptDefinition};
use pigeon_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;
use std::path::PathBuf;

/// Build a prompt from a definition and input variables.
///
/// Every variable the definition declares must be present.
///
/// # Example
/// ```no_run
/// use pigeon_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("sender".to_string(), "ada@example.com".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.content);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        content: rendered.trim().to_string(),
        output: definition.output.clone(),
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

/// Loads prompts by id from an override directory and renders them.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts_dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
        }
    }

    /// Load `id` and render it with `variables`.
    pub fn build(&self, id: &str, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let definition = load_prompt(&self.prompts_dir, id)?;
        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_prompt(&definition, variables)
    }

    /// Rendered text of `id`.
    pub fn render(&self, id: &str, variables: &[(&str, &str)]) -> AppResult<String> {
        Ok(self.build(id, variables)?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{REPLY_REMINDER_ID, REPLY_SYSTEM_ID, SPLIT_ID};
    use crate::types::PromptOutputSpec;
    use tempfile::TempDir;

    fn create_test_definition(variables: Vec<String>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            variables,
            template: "Reply to {{sender}}".to_string(),
            output: PromptOutputSpec {
                temperature: Some(0.2),
                max_tokens: None,
            },
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("sender".to_string(), "ada@example.com".to_string());

        let result = render_template("Reply to {{sender}}", &vars).unwrap();
        assert_eq!(result, "Reply to ada@example.com");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("sender".to_string(), "Ada <ada@example.com>".to_string());

        let result = render_template("{{sender}}", &vars).unwrap();
        assert_eq!(result, "Ada <ada@example.com>");
    }

    #[test]
    fn test_missing_declared_variable() {
        let def = create_test_definition(vec!["sender".to_string()]);
        let err = build_prompt(&def, HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("sender"));
    }

    #[test]
    fn test_build_carries_output_spec() {
        let def = create_test_definition(vec!["sender".to_string()]);
        let mut vars = HashMap::new();
        vars.insert("sender".to_string(), "ada@example.com".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.content, "Reply to ada@example.com");
        assert_eq!(built.output.temperature, Some(0.2));
        assert_eq!(built.output.max_tokens, None);
    }

    #[test]
    fn test_library_build_reads_override_output() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("support.split.yml"),
            r#"
id: support.split
title: Strict splitter
apiVersion: "1.0"
template: "Split it."
output:
  temperature: 0.0
  maxTokens: 200
"#,
        )
        .unwrap();

        let built = PromptLibrary::new(temp.path())
            .build(SPLIT_ID, &[])
            .unwrap();
        assert_eq!(built.content, "Split it.");
        assert_eq!(built.output.temperature, Some(0.0));
        assert_eq!(built.output.max_tokens, Some(200));

        let builtin = PromptLibrary::new(temp.path().join("missing"))
            .build(SPLIT_ID, &[("organization", "HackMIT")])
            .unwrap();
        assert_eq!(builtin.output, PromptOutputSpec::default());
    }

    #[test]
    fn test_library_renders_builtins() {
        let temp = TempDir::new().unwrap();
        let library = PromptLibrary::new(temp.path());

        let persona = library
            .render(
                REPLY_SYSTEM_ID,
                &[
                    ("sender", "ada@example.com"),
                    ("organization", "HackMIT"),
                    ("signoff", "Best regards, The HackMIT Team"),
                ],
            )
            .unwrap();
        assert!(persona.starts_with("You are an organizer for HackMIT."));
        assert!(persona.contains("The participant's email address is ada@example.com."));
        assert!(persona.contains("'Dear [First Name]'"));
        assert!(persona.contains("'Best regards, The HackMIT Team'"));

        let reminder = library.render(REPLY_REMINDER_ID, &[]).unwrap();
        assert!(reminder.starts_with("Once again"));

        let split = library
            .render(SPLIT_ID, &[("organization", "HackMIT")])
            .unwrap();
        assert!(split.contains("python list"));
    }
}
