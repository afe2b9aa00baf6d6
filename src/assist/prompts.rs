/// A system/user prompt pair for one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const MAIN_TASK_SYSTEM: &str = "You are a task management AI assistant specialized in creating main tasks.
Your role is to:
1. Create clear, high-level tasks that can be broken down
2. Ensure tasks are actionable and measurable
3. Keep tasks broad enough to have subtasks, but specific enough to be achievable
4. Use clear, professional language
5. Focus on one main objective per task";

const FIRST_SUBTASK_SYSTEM: &str = "You are a task management AI assistant specialized in creating initial subtasks.
Your role is to:
1. Create the first logical step towards completing the main task
2. Make sure the subtask is specific and immediately actionable
3. Focus on getting the main task started
4. Keep the scope small and manageable
5. Lay a foundation for later subtasks";

const NEXT_SUBTASK_SYSTEM: &str = "You are a task management AI assistant specialized in creating sequential subtasks.
Your role is to:
1. Create the next logical subtask in the sequence
2. Ensure continuity with existing subtasks
3. Keep the task specific and actionable
4. Maintain focus on the main task's goal
5. Consider the context of parent subtask and siblings";

/// Prompt for a new top-level task from free-form context
pub fn main_task(context: &str) -> Prompt {
    Prompt {
        system: MAIN_TASK_SYSTEM.to_string(),
        user: format!(
            "Create ONE main task based on this context: {context}

The task should be:
- Broad enough to be broken down into subtasks
- Specific enough to have a clear goal
- Written in a clear, actionable format

Respond ONLY with the task text, no explanations or additional formatting."
        ),
    }
}

/// Prompt for the first subtask of a task that has none yet
pub fn first_subtask(main_task: &str) -> Prompt {
    Prompt {
        system: FIRST_SUBTASK_SYSTEM.to_string(),
        user: format!(
            "Main Task: {main_task}

Create the FIRST subtask that should be completed for this main task.
This subtask should be:
- The first logical step
- Immediately actionable
- Specific and clear
- A foundation for future subtasks

Respond ONLY with the subtask text; do not include labels, explanations, or additional formatting."
        ),
    }
}

/// Prompt for the subtask that follows `parent_subtask`
pub fn next_subtask(main_task: &str, parent_subtask: &str, existing: &[&str]) -> Prompt {
    let existing = existing.join(", ");
    Prompt {
        system: NEXT_SUBTASK_SYSTEM.to_string(),
        user: format!(
            "Main Task: {main_task}
Parent Subtask: {parent_subtask}
Existing Subtasks: {existing}

Create the next logical subtask that:
- Follows naturally from the parent subtask
- Doesn't duplicate existing subtasks
- Moves closer to completing the main task
- Is specific and immediately actionable

Respond ONLY with the subtask text itself; do not include any labels, explanations, or additional formatting."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_task_embeds_context() {
        let p = main_task("plan a trip to Lisbon");
        assert!(p.system.contains("creating main tasks"));
        assert!(p.user.starts_with("Create ONE main task based on this context: plan a trip to Lisbon\n"));
    }

    #[test]
    fn next_subtask_lists_siblings() {
        let p = next_subtask("Launch blog", "Pick a theme", &["Pick a theme", "Buy domain"]);
        assert!(p.user.contains("Main Task: Launch blog\n"));
        assert!(p.user.contains("Parent Subtask: Pick a theme\n"));
        assert!(p.user.contains("Existing Subtasks: Pick a theme, Buy domain\n"));
    }

    #[test]
    fn first_subtask_has_its_own_system_prompt() {
        let p = first_subtask("Launch blog");
        assert_ne!(p.system, main_task("x").system);
        assert!(p.user.starts_with("Main Task: Launch blog\n"));
    }
}
