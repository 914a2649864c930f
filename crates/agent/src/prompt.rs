//! Fixed prompt text and user-visible replies.

use parley_core::error::{Error, ProviderError};
use parley_core::retrieval::RetrievedPassage;

/// The scope-constraining system instruction placed first in every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that answers questions \
using only the reference documents supplied in the context. If the documents do not contain \
the answer, say politely that you can only help with questions about the provided material. \
Do not invent facts. End every answer by offering further help.";

/// Instruction for the conversation summarizer.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation in under 100 words. \
Keep names, facts, decisions and open questions. Write plain prose without preamble.";

/// Prefix of the synthetic system message that replaces summarized turns.
pub const SUMMARY_PREFIX: &str = "Summary of earlier conversation: ";

/// Reply when the generation backend stays rate limited.
pub const DEGRADED_REPLY: &str =
    "I'm currently unable to answer due to rate limiting. Please try again later.";

/// Placeholder digest when the summarizer is rate limited.
pub const DEGRADED_SUMMARY: &str = "Summary unavailable due to rate limiting.";

/// Reply when the query is unrelated to the retrieved material.
pub const OUT_OF_SCOPE_REPLY: &str = "I'm sorry, but your question appears to be outside the \
scope of the reference material I can draw on, so I can't answer it reliably. Is there anything \
else about the available material I can help you with?";

/// Context message used when retrieval found nothing.
pub const NO_CONTEXT: &str = "No relevant reference documents were found for this question.";

/// Note appended instead of running a tool whose arguments fail the gate.
pub fn tool_refusal(tool_name: &str) -> String {
    format!(
        "I did not run the '{tool_name}' action because the request is unrelated to the \
reference material for this conversation."
    )
}

/// Note appended when a permitted tool fails.
pub fn tool_failure(tool_name: &str, detail: &str) -> String {
    format!("The '{tool_name}' action could not be completed: {detail}")
}

/// The context message body for the retrieved passages.
pub fn context_block(passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let mut out = String::from("Reference documents:\n");
    for (i, passage) in passages.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}\n", i + 1, passage.text.trim()));
    }
    out
}

/// Render a failed turn as the user-visible reply.
pub fn failure_reply(error: &Error) -> String {
    match error {
        Error::Provider(ProviderError::RateLimited { .. }) => DEGRADED_REPLY.to_string(),
        Error::Provider(e) if e.is_unreachable() => {
            format!("The server could not be reached. Please try again later. ({e})")
        }
        Error::Provider(ProviderError::ApiError {
            status_code,
            message,
        }) => format!("The backend returned an error (status {status_code}): {message}"),
        other => format!("Error: {other}"),
    }
}
