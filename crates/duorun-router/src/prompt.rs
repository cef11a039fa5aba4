//! Prompt composition for pipeline stages.

/// Prompt for the first (or only) stage: the role directive followed by
/// the task prompt.
pub fn primary_prompt(role: &str, task_prompt: &str) -> String {
    format!(
        r#"## Role
{role}

## Task
{task_prompt}"#
    )
}

/// Prompt for the refinement stage. The secondary sees the primary's output
/// and the original task, so it can refine toward the original intent.
pub fn secondary_prompt(role: &str, primary_output: &str, task_prompt: &str) -> String {
    format!(
        r#"## Role
{role}

## Output from the previous stage
{primary_output}

## Original task
{task_prompt}"#
    )
}
