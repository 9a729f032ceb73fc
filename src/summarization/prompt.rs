//! Prompt templates and response cleanup for digest summaries.

use regex::Regex;
use std::sync::LazyLock;

/// Appended to every prompt so the model answers in the users' language.
pub const LANGUAGE_DIRECTIVE: &str = "Por favor, forneça a resposta em português.";

static REASONING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid reasoning pattern"));

/// Instruction asking for a one-paragraph summary relating the content to `term`.
pub fn digest_instruction(term: &str) -> String {
    format!(
        "Resuma o conteúdo abaixo em português e explique como o termo '{term}' se relaciona com ele. \
         Mantenha o resumo em 1 parágrafo."
    )
}

/// Combine the instruction, the content, and the language directive into one prompt.
pub fn build_prompt(instruction: &str, content: &str) -> String {
    format!("{instruction}\n\n{content}\n\n{LANGUAGE_DIRECTIVE}")
}

/// Remove `<think>...</think>` spans emitted by reasoning models.
pub fn strip_reasoning_markup(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").into_owned()
}
