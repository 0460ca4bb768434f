//! Prompt Composer: the fixed instruction template around context and query.

const TASK: &str = "Your Task: Provide a concise and informative response to the user's query, drawing on the provided context.";

const GUIDELINES: &str = "Guidelines:
1. Relevance: Focus directly on the user's question.
2. Conciseness: Avoid unnecessary details.
3. Accuracy: Ensure factual correctness.
4. Clarity: Use clear language.
5. Contextual Awareness: Use general knowledge if context is insufficient.
6. Honesty: State if you lack information.";

const RESPONSE_FORMAT: &str = "Response Format:
- Direct answer
- Brief explanation (if necessary)
- Citation (if relevant)
- Conclusion";

/// Renders the prompt sent to the reply generator. Pure and infallible.
pub fn compose(context: &str, query: &str) -> String {
    format!(
        "{TASK}\n\nContext: {context}\nUser Query: {query}\n\n{GUIDELINES}\n\n{RESPONSE_FORMAT}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_is_deterministic() {
        let first = compose("The sky is blue.", "What color is the sky?");
        let second = compose("The sky is blue.", "What color is the sky?");
        assert_eq!(first, second);
    }

    #[test]
    fn embeds_context_and_query_verbatim() {
        let prompt = compose("[1] (Source: a.txt)\nThe sky is blue.", "What color is the sky?");

        assert!(prompt.starts_with("Your Task: Provide a concise"));
        assert!(prompt.contains("Context: [1] (Source: a.txt)\nThe sky is blue.\n"));
        assert!(prompt.contains("User Query: What color is the sky?\n"));
        assert!(prompt.contains("6. Honesty: State if you lack information."));
        assert!(prompt.contains("- Direct answer\n- Brief explanation (if necessary)\n- Citation (if relevant)\n- Conclusion"));
    }

    #[test]
    fn handles_empty_inputs() {
        let prompt = compose("", "");
        assert!(prompt.contains("Context: \nUser Query: \n"));
    }

    #[test]
    fn braces_in_inputs_are_not_interpreted() {
        let prompt = compose("{context}", "{query}");
        assert!(prompt.contains("Context: {context}\nUser Query: {query}\n"));
    }
}
