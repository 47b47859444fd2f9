/// Lowercases, trims, and collapses internal whitespace runs.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Words of an already-normalized string with punctuation trimmed from their
/// edges. Inner hyphens and apostrophes are kept (`next-day`, `today's`).
pub fn tokens(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(|word| word.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect()
}
