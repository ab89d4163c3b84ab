//! Prompt builders for the two oracle call sites.
//!
//! Prompts are bounded: snippets are truncated to a configured character
//! budget before they reach the oracle, so context limits are respected no
//! matter what the caller passes in. Fallback paths always see the full
//! input.

pub const FEATURE_SYSTEM: &str = "You are a code analysis engine. \
Respond with a single JSON object and nothing else.";

pub const SIMILARITY_SYSTEM: &str = "You judge whether two code snippets \
implement similar logic. Respond with a single JSON object and nothing else.";

/// Truncates a snippet to `max_chars` characters on a char boundary.
pub fn bound_snippet(code: &str, max_chars: usize) -> &str {
    match code.char_indices().nth(max_chars) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

/// Prompt for semantic feature extraction.
pub fn feature_prompt(code: &str, language: &str, max_chars: usize) -> String {
    format!(
        "Analyze this {language} code and extract its key features.\n\
         Return JSON with exactly these fields:\n\
         {{\"primaryFeatures\": [\"most salient function/class/API names\"],\n \
         \"secondaryFeatures\": [\"supporting identifiers\"],\n \
         \"codeType\": \"function|class|module|script|unknown\",\n \
         \"complexity\": \"low|medium|high\"}}\n\n\
         Code:\n```\n{}\n```",
        bound_snippet(code, max_chars)
    )
}

/// Prompt for a similarity judgment between two snippets.
pub fn similarity_prompt(code_a: &str, code_b: &str, max_chars: usize) -> String {
    format!(
        "Compare these two code snippets and rate how similar their logic is.\n\
         Return JSON with exactly these fields:\n\
         {{\"similarityScore\": 0.0, \"reason\": \"one sentence\"}}\n\
         similarityScore must be between 0.0 and 1.0.\n\n\
         Snippet A:\n```\n{}\n```\n\n\
         Snippet B:\n```\n{}\n```",
        bound_snippet(code_a, max_chars),
        bound_snippet(code_b, max_chars)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_snippet_respects_char_boundaries() {
        assert_eq!(bound_snippet("hello", 10), "hello");
        assert_eq!(bound_snippet("hello", 3), "hel");
        // Multibyte input must not panic.
        assert_eq!(bound_snippet("héllo", 2), "hé");
    }

    #[test]
    fn prompts_embed_truncated_code() {
        let long = "x".repeat(100);
        let p = feature_prompt(&long, "rust", 10);
        assert!(p.contains(&"x".repeat(10)));
        assert!(!p.contains(&"x".repeat(11)));
    }
}
