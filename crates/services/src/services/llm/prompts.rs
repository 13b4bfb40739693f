use super::ChatMessage;

/// Characters of extracted page text forwarded to the summarizer.
pub const SUMMARY_EXCERPT_CHARS: usize = 3000;

pub const SUMMARIZER_SYSTEM_PROMPT: &str =
    "You are an expert web summarizer. Be concise. No raw HTML.";

pub const PLANNER_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates short actionable plans.";

const DEFAULT_SYSTEM_LINES: [&str; 5] = [
    "You are a helpful assistant.",
    "You CAN browse via the tool: call POST /api/fetch with {url, summarize:true}.",
    "DO NOT claim you cannot browse. Always request approval before running commands or editing files.",
    "When asked to 'plan' or 'thinking', output a short public plan labeled: PLAN: ... (no chain-of-thought).",
    "When summarizing a web page, return a brief description, key bullets, and the main link. Do not dump raw HTML.",
];

pub fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_LINES.join("\n")
}

/// Prepend the caller's system prompt, or the default one, to the history.
pub fn with_system_prompt(system: Option<&str>, history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let system = match utils::text::non_blank(system) {
        Some(custom) => custom.to_string(),
        None => default_system_prompt(),
    };
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system));
    messages.extend(history);
    messages
}

pub fn plan_prompt(goal: &str) -> String {
    format!("Goal: {goal}\nCreate a short, concrete plan and list any URLs you need.")
}

/// The parts of a fetched page the summarizer sees.
#[derive(Debug, Clone, Copy)]
pub struct PageDigest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub text: &'a str,
}

pub fn summary_prompt(page: &PageDigest<'_>) -> String {
    let or_none = |s: &str| if s.is_empty() { "(none)".to_string() } else { s.to_string() };
    [
        format!("URL: {}", page.url),
        format!("Title: {}", or_none(page.title)),
        format!("Description: {}", or_none(page.description)),
        format!(
            "Extracted text (may be partial): {}",
            utils::text::truncate_chars(page.text, SUMMARY_EXCERPT_CHARS)
        ),
        String::new(),
        "Summarize in this format:".to_string(),
        "ABOUT: <one-sentence>".to_string(),
        "KEY POINTS: <3-6 bullets>".to_string(),
        format!("PRIMARY LINK: {}", page.url),
    ]
    .join("\n")
}
