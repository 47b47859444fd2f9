//! Lexical similarity between a normalized query and a normalized phrase.
//!
//! Scores are in `[0, 1]`. The combined [`similarity`] takes the better of a
//! character-level gestalt ratio and a token-set ratio, so that typos and
//! phrases embedded in longer questions both score well.

use std::collections::BTreeSet;

use super::normalize::tokens;

/// Combined score used by the fuzzy strategy.
pub fn similarity(query: &str, phrase: &str) -> f64 {
    sequence_ratio(query, phrase).max(token_set_ratio(query, phrase))
}

/// Ratcliff/Obershelp ratio: `2 * matched / (len(a) + len(b))`.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_chars(&a, &b);
    (2 * matched) as f64 / total as f64
}

/// Share of a contained phrase's score that does not depend on how much of
/// the query it covers.
const CONTAINMENT_WEIGHT: f64 = 0.6;

/// Token-set ratio. Zero when the two strings share no token.
///
/// A phrase whose tokens all occur in the query (or the reverse) scores
/// `CONTAINMENT_WEIGHT` plus the rest scaled by how much of the other side the
/// shared tokens cover, so a single generic word inside a long question ranks
/// below a longer phrase from the same question.
pub fn token_set_ratio(query: &str, phrase: &str) -> f64 {
    let query_tokens: BTreeSet<String> = tokens(query).into_iter().collect();
    let phrase_tokens: BTreeSet<String> = tokens(phrase).into_iter().collect();

    let shared: Vec<&str> = query_tokens.intersection(&phrase_tokens).map(String::as_str).collect();
    if shared.is_empty() {
        return 0.0;
    }

    let only_query: Vec<&str> =
        query_tokens.difference(&phrase_tokens).map(String::as_str).collect();
    let only_phrase: Vec<&str> =
        phrase_tokens.difference(&query_tokens).map(String::as_str).collect();

    let base = shared.join(" ");
    let with_query = join_nonempty(&base, &only_query);
    let with_phrase = join_nonempty(&base, &only_phrase);

    let query_coverage = sequence_ratio(&base, &with_query);
    let phrase_coverage = sequence_ratio(&base, &with_phrase);
    let containment = CONTAINMENT_WEIGHT * query_coverage.max(phrase_coverage)
        + (1.0 - CONTAINMENT_WEIGHT) * query_coverage * phrase_coverage;

    sequence_ratio(&with_query, &with_phrase).max(containment)
}

fn join_nonempty(base: &str, rest: &[&str]) -> String {
    if rest.is_empty() {
        base.to_owned()
    } else {
        format!("{base} {}", rest.join(" "))
    }
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (a_start, b_start, len) = longest_block(&a[a_lo..a_hi], &b[b_lo..b_hi]);
        if len == 0 {
            continue;
        }

        matched += len;
        let (a_start, b_start) = (a_lo + a_start, b_lo + b_start);
        pending.push((a_lo, a_start, b_lo, b_start));
        pending.push((a_start + len, a_hi, b_start + len, b_hi));
    }

    matched
}

/// Longest common substring as `(start_in_a, start_in_b, len)`; the earliest
/// block in `a` wins among equal lengths.
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0_usize; b.len() + 1];
    let mut current = vec![0_usize; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        for (j, b_char) in b.iter().enumerate() {
            current[j + 1] = if a_char == b_char { previous[j] + 1 } else { 0 };
            let run = current[j + 1];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::{longest_block, sequence_ratio, similarity, token_set_ratio};

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(sequence_ratio("job complete", "job complete"), 1.0);
        assert_eq!(similarity("purchase orders", "purchase orders"), 1.0);
    }

    #[test]
    fn empty_strings_are_identical_but_empty_vs_text_is_zero() {
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("", "abc"), 0.0);
    }

    #[test]
    fn sequence_ratio_counts_recursive_blocks() {
        // "warranty job complete" vs "job complete": one 12-char block.
        let ratio = sequence_ratio("warranty job complete", "job complete");
        assert!((ratio - 24.0 / 33.0).abs() < 1e-9);

        // "abxcd" vs "abcd": "ab" then "cd" on the right side.
        assert!((sequence_ratio("abxcd", "abcd") - 8.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn longest_block_prefers_earliest_match() {
        assert_eq!(longest_block(&['a', 'b', 'a', 'b'], &['a', 'b']), (0, 0, 2));
    }

    #[test]
    fn token_set_ratio_is_one_only_for_identical_token_sets() {
        assert_eq!(token_set_ratio("today due", "due today"), 1.0);
        assert!(token_set_ratio("what jobs are due today", "due today") < 1.0);
    }

    #[test]
    fn contained_phrases_score_by_how_much_of_the_query_they_cover() {
        let query = "what is the sop for a job site safety checklist";

        let generic = token_set_ratio(query, "job");
        let specific = token_set_ratio(query, "job site");

        assert!(generic > 0.6);
        assert!(specific > generic, "{specific} <= {generic}");
        assert!(token_set_ratio("what jobs are due today", "jobs today") > 0.7);
    }

    #[test]
    fn token_set_ratio_is_zero_without_shared_tokens() {
        assert_eq!(token_set_ratio("xyzzy plugh", "purchase orders"), 0.0);
    }

    #[test]
    fn typos_still_score_through_sequence_ratio() {
        assert!(similarity("warrenty", "warranty") > 0.8);
    }
}
