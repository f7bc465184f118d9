//! Prompt loader for YAML prompt definitions.
//!
//! Lookup order for an id: `<prompts_dir>/<id>.yml`, then the built-in
//! definition of the same id.

use crate::defaults;
use crate::types::PromptDefinition;
use pigeon_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID.
///
/// # Arguments
/// * `prompts_dir` - Override directory (typically `.pigeon/prompts`)
/// * `prompt_id` - Prompt identifier (e.g., "support.reply.system")
///
/// # Example
/// ```no_run
/// use pigeon_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new(".pigeon/prompts"), "support.split")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    let (contents, origin) = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        (contents, prompt_file.display().to_string())
    } else if let Some(source) = defaults::builtin_source(prompt_id) {
        (source.to_string(), "built-in".to_string())
    } else {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' not found in {:?} and has no built-in default",
            prompt_id, prompts_dir
        )));
    };

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML ({}): {}", origin, e))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            prompt_id, definition.id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({}, {})", definition.id, definition.title, origin);

    Ok(definition)
}

/// List every available prompt id: built-ins plus overrides, sorted and deduplicated.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = defaults::builtin_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();

    if prompts_dir.exists() {
        for entry in walkdir::WalkDir::new(prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, template: &str) {
        fs::create_dir_all(dir).unwrap();
        let content = format!(
            r#"
id: {}
title: "Custom"
apiVersion: "1.0"
template: "{}"
"#,
            id, template
        );
        fs::write(dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtins_load() {
        let temp_dir = TempDir::new().unwrap();
        for id in defaults::builtin_ids() {
            let def = load_prompt(temp_dir.path(), id).unwrap();
            assert_eq!(def.id, id);
        }
    }

    #[test]
    fn test_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "support.reply.reminder", "Be brief.");

        let def = load_prompt(temp_dir.path(), "support.reply.reminder").unwrap();
        assert_eq!(def.title, "Custom");
        assert_eq!(def.template, "Be brief.");
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("support.split.yml"), "invalid: yaml: content:").unwrap();
        assert!(load_prompt(temp_dir.path(), "support.split").is_err());
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "other.id", "x");
        fs::rename(
            temp_dir.path().join("other.id.yml"),
            temp_dir.path().join("support.split.yml"),
        )
        .unwrap();
        assert!(load_prompt(temp_dir.path(), "support.split").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "support.split", "x");
        write_prompt(temp_dir.path(), "custom.followup", "y");

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts.len(), 4);
        assert!(prompts.contains(&"custom.followup".to_string()));
        assert!(prompts.contains(&"support.reply.system".to_string()));
    }
}
