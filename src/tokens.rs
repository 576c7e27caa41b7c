use crate::planner::PlannerMessage;

/// Conservative estimate of token usage for a single message content.
fn estimate_token_count(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }

    let char_count = text.chars().count();
    let word_count = text.split_whitespace().count();

    // Pick the larger approximation; CJK subtitles have few whitespace-separated words.
    let approx_from_chars = char_count.div_ceil(3);
    let approx_from_words = word_count;

    u32::try_from(approx_from_chars.max(approx_from_words)).unwrap_or(u32::MAX)
}

/// Estimate the total tokens contributed by a planner conversation.
pub fn estimate_prompt_tokens(messages: &[PlannerMessage]) -> u32 {
    messages
        .iter()
        .map(|message| estimate_token_count(&message.content).saturating_add(4)) // role and framing
        .fold(0u32, u32::saturating_add)
}

/// Headroom kept free of the completion so requests stay under model limits.
pub const REQUEST_COMPLETION_SAFETY_MARGIN_TOKENS: u32 = 256;

/// Minimum completion tokens to request to avoid overly truncated answers when possible.
pub const MIN_COMPLETION_TOKENS: u32 = 32;

/// Derive a completion token budget given a context limit and the prepared conversation.
pub fn compute_completion_token_budget(
    max_context_tokens: u32,
    messages: &[PlannerMessage],
) -> u32 {
    let prompt_tokens = estimate_prompt_tokens(messages);
    let max_possible_completion = max_context_tokens.saturating_sub(prompt_tokens);

    if max_possible_completion == 0 {
        return 1;
    }

    let available = max_possible_completion.saturating_sub(REQUEST_COMPLETION_SAFETY_MARGIN_TOKENS);
    let desired = available.max(MIN_COMPLETION_TOKENS);

    desired.min(max_possible_completion).max(1)
}

/// Completion tokens to request: the configured cap, shrunk only when the
/// conversation leaves less room than that in the context window.
pub fn completion_tokens_for(
    max_completion_tokens: u32,
    max_context_tokens: u32,
    messages: &[PlannerMessage],
) -> u32 {
    compute_completion_token_budget(max_context_tokens, messages)
        .min(max_completion_tokens)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_uses_larger_of_char_and_word_counts() {
        assert_eq!(estimate_token_count(""), 0);
        assert_eq!(estimate_token_count("abcdef"), 2);
        assert_eq!(estimate_token_count("a b c d e"), 5);
    }

    #[test]
    fn budget_reserves_safety_margin() {
        let messages = vec![PlannerMessage::user("abc")];
        // prompt = 1 + 4 = 5 tokens
        assert_eq!(compute_completion_token_budget(2048, &messages), 2048 - 5 - 256);
    }

    #[test]
    fn budget_keeps_minimum_when_prompt_is_large() {
        let messages = vec![PlannerMessage::user("x".repeat(3 * 1900))];
        assert_eq!(compute_completion_token_budget(2048, &messages), MIN_COMPLETION_TOKENS);
    }

    #[test]
    fn completion_tokens_use_cap_until_context_runs_short() {
        let short = vec![PlannerMessage::user("abc")];
        assert_eq!(completion_tokens_for(2048, 128_000, &short), 2048);

        let long = vec![PlannerMessage::user("x".repeat(3 * 127_000))];
        assert_eq!(completion_tokens_for(2048, 128_000, &long), 128_000 - 127_004 - 256);
    }

    #[test]
    fn budget_never_drops_to_zero() {
        let messages = vec![PlannerMessage::user("x".repeat(30_000))];
        assert_eq!(compute_completion_token_budget(2048, &messages), 1);
    }
}
