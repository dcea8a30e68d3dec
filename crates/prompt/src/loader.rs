//! Prompt loader for YAML prompt definitions.

use crate::types::{PromptDefinition, PromptOutputSpec};
use redraft_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the built-in rewrite prompt.
pub const DEFAULT_REWRITE_PROMPT_ID: &str = "rewrite.default";

const DEFAULT_SYSTEM: &str = "You are a careful editor. Rewrite the passage you are given \
according to the instructions. Reply with the rewritten passage only, without commentary, \
headings or quotation marks.";

const DEFAULT_TEMPLATE: &str = "Instructions:\n{{instructions}}\n\nPassage:\n{{text}}";

/// The built-in rewrite prompt used when the workspace does not define one.
pub fn default_rewrite_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_REWRITE_PROMPT_ID.to_string(),
        title: "Rewrite passage".to_string(),
        api_version: "1.0".to_string(),
        system: Some(DEFAULT_SYSTEM.to_string()),
        template: DEFAULT_TEMPLATE.to_string(),
        output: PromptOutputSpec::default(),
    }
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.redraft/prompts/` directory.
///
/// # Example
/// ```no_run
/// use redraft_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rewrite.formal")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load `prompt_id` from the workspace, falling back to the built-in rewrite
/// prompt when the id is the default one and no file overrides it.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    if prompt_id == DEFAULT_REWRITE_PROMPT_ID && !prompt_path(workspace_path, prompt_id).exists() {
        tracing::debug!("Using built-in rewrite prompt");
        return Ok(default_rewrite_prompt());
    }

    load_prompt(workspace_path, prompt_id)
}

/// List all available prompt IDs in the workspace, including the built-in one.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = workspace_path.join(".redraft/prompts");
    let mut prompt_ids = vec![DEFAULT_REWRITE_PROMPT_ID.to_string()];

    if prompts_dir.exists() {
        for entry in walkdir::WalkDir::new(&prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if stem != DEFAULT_REWRITE_PROMPT_ID {
                        prompt_ids.push(stem.to_string());
                    }
                }
            }
        }
    }

    prompt_ids[1..].sort();
    Ok(prompt_ids)
}

fn prompt_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(".redraft/prompts")
        .join(format!("{}.yml", prompt_id))
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
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

    // A rewrite prompt that never mentions the passage would send nothing to rewrite.
    if !def.template.contains("{{text}}") {
        return Err(AppError::Prompt(format!(
            "Prompt template for {} must reference {{{{text}}}}",
            def.id
        )));
    }

    Ok(())
}
