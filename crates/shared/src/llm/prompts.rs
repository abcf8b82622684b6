pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful personal assistant for a life-logging app. \
     Answer concisely and in the user's language.";

pub const KNOWLEDGE_CONTEXT_LEAD_IN: &str =
    "Here is some background about the user to personalize your replies:";

pub const STUDY_PLAN_SYSTEM_PROMPT: &str =
    "You are a study planning assistant. Produce a study plan for the user's request \
     as a single JSON object with exactly this shape: \
     {\"title\": string, \"priority\": string, \"tasks\": [{\"title\": string, \"duration\": string}]}. \
     Respond with JSON only. Do not wrap the object in code fences or add commentary.";

/// System message for one chat turn: the config's stored prompt (or the
/// generic fallback) plus the optional knowledge context.
pub fn compose_system_prompt(base_prompt: &str, knowledge_context: &str) -> String {
    let base = base_prompt.trim();
    let base = if base.is_empty() {
        DEFAULT_SYSTEM_PROMPT
    } else {
        base
    };

    let context = knowledge_context.trim();
    if context.is_empty() {
        return base.to_string();
    }

    format!("{base}\n\n{KNOWLEDGE_CONTEXT_LEAD_IN}\n{context}")
}
