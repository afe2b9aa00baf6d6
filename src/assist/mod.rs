//! Text-generation collaborator.
//!
//! The core only needs a reply string. Any failure is folded into a fixed
//! fallback sentinel so callers never see a generation error and task state
//! is never touched by one.

pub mod client;
pub mod prompts;

use crate::model::task::{Task, TaskId};

pub use client::ChatCompletionsClient;
pub use prompts::Prompt;

/// Returned by `suggest_main_task` when generation fails
pub const TASK_FALLBACK: &str = "Error generating task. Please try again.";
/// Returned by the subtask suggestions when generation fails
pub const SUBTASK_FALLBACK: &str = "Error generating subtask. Please try again.";

/// Error type for text generation
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("service returned an empty reply")]
    EmptyReply,
    #[error("no API key: set the {var} environment variable")]
    MissingApiKey { var: String },
}

/// A request/response text generator. No streaming.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, system: &str, user: &str) -> Result<String, GenerateError>;
}

fn run(generator: &dyn TextGenerator, prompt: &Prompt, fallback: &str) -> String {
    match generator.generate(&prompt.system, &prompt.user) {
        Ok(reply) => {
            let reply = reply.trim();
            if reply.is_empty() {
                tracing::warn!("empty generation reply, using fallback");
                fallback.to_string()
            } else {
                reply.to_string()
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "generation failed, using fallback");
            fallback.to_string()
        }
    }
}

pub fn suggest_main_task(generator: &dyn TextGenerator, context: &str) -> String {
    run(generator, &prompts::main_task(context), TASK_FALLBACK)
}

pub fn suggest_first_subtask(generator: &dyn TextGenerator, main_task: &str) -> String {
    run(generator, &prompts::first_subtask(main_task), SUBTASK_FALLBACK)
}

pub fn suggest_next_subtask(
    generator: &dyn TextGenerator,
    main_task: &str,
    parent_subtask: &str,
    existing: &[&str],
) -> String {
    run(
        generator,
        &prompts::next_subtask(main_task, parent_subtask, existing),
        SUBTASK_FALLBACK,
    )
}

/// Suggest a subtask for `parent`: the first-subtask prompt when it has none,
/// otherwise the next-subtask prompt anchored on `after` (or the last subtask).
pub fn suggest_subtask_for(
    generator: &dyn TextGenerator,
    parent: &Task,
    after: Option<TaskId>,
) -> String {
    let anchor = after
        .and_then(|id| parent.find_subtask(id))
        .or_else(|| parent.subtasks.last().map(|s| s.as_ref()));
    match anchor {
        None => suggest_first_subtask(generator, &parent.content),
        Some(anchor) => {
            let existing: Vec<&str> = parent.subtasks.iter().map(|s| s.content.as_str()).collect();
            suggest_next_subtask(generator, &parent.content, &anchor.content, &existing)
        }
    }
}

pub fn is_fallback(text: &str) -> bool {
    text == TASK_FALLBACK || text == SUBTASK_FALLBACK
}

/// Append generated text to what the user typed so far.
pub fn append_generated(input: &str, generated: &str) -> String {
    let separator = if input.ends_with(['.', '!', '?']) {
        " "
    } else {
        ". "
    };
    format!("{input}{separator}{generated}")
}
