//! Pairwise string-similarity primitives used by the EMPI field
//! comparators (`comparators` crate) to score demographic fields.
//!
//! `pairwise_string_metrics` is the single entry point the comparator
//! layer calls; the rest of this crate is small composable utilities
//! (`string_replacer`, `string_slicer`, `string_trimmer`) mirroring the
//! original source's matching toolkit one-for-one.
//!
//! Distance metrics are computed with [`strsim`], the fuzzy-matching
//! crate already in use elsewhere in this corpus. Hamming distance and
//! the phonetic key have no upstream crate that matches the contract
//! this module needs, so both are implemented here directly:
//!
//! - Hamming distance is defined for unequal-length inputs as the
//!   count of differing positions over the shared prefix plus the
//!   length difference of the two strings (one of several consistent
//!   definitions; this one degrades gracefully instead of refusing
//!   unequal-length input).
//! - The phonetic key is a compact Metaphone implementation (initial
//!   silent-letter handling plus the common consonant-reduction
//!   rules); it trades faithfulness to the reference algorithm's every
//!   edge case for a small, auditable implementation.

use serde::Serialize;

/// All pairwise metrics computed for one `(a, b)` string pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseMetrics {
    pub damerau_levenshtein_distance: usize,
    pub equal: bool,
    pub hamming_distance: usize,
    pub jaro_winkler: f64,
    pub levenshtein_distance: usize,
    pub metaphone: bool,
    pub ratio: f64,
    pub strings: (String, String),
}

/// Compute the full metric set for one pair of strings.
pub fn pairwise_string_metrics(a: &str, b: &str) -> PairwiseMetrics {
    PairwiseMetrics {
        damerau_levenshtein_distance: strsim::damerau_levenshtein(a, b),
        equal: a == b,
        hamming_distance: hamming_distance(a, b),
        jaro_winkler: strsim::jaro_winkler(a, b),
        levenshtein_distance: strsim::levenshtein(a, b),
        metaphone: metaphone(a) == metaphone(b),
        ratio: levenshtein_ratio(a, b),
        strings: (a.to_string(), b.to_string()),
    }
}

/// Count of differing characters over the shared prefix, plus the
/// length difference for the remainder. Symmetric in `(a, b)`.
pub fn hamming_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let shared = a_chars.len().min(b_chars.len());
    let mismatches = a_chars
        .iter()
        .zip(b_chars.iter())
        .take(shared)
        .filter(|(x, y)| x != y)
        .count();
    mismatches + a_chars.len().abs_diff(b_chars.len())
}

/// `1 - levenshtein_distance(a, b) / max(|a|, |b|)`, `1.0` when both
/// strings are empty.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let max_len = len_a.max(len_b);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (strsim::levenshtein(a, b) as f64 / max_len as f64)
}

/// Replace `pattern` with `repl` in both strings.
pub fn string_replacer(a: &str, b: &str, pattern: &str, repl: &str) -> (String, String) {
    (a.replace(pattern, repl), b.replace(pattern, repl))
}

/// Slice both strings to their first `factor` characters (or fewer, if
/// shorter).
pub fn string_slicer(a: &str, b: &str, factor: usize) -> (String, String) {
    let slice = |s: &str| -> String { s.chars().take(factor).collect() };
    (slice(a), slice(b))
}

/// Trim leading/trailing whitespace from both strings.
pub fn string_trimmer(a: &str, b: &str) -> (String, String) {
    (a.trim().to_string(), b.trim().to_string())
}

/// Compact Metaphone phonetic key, upper-cased ASCII input assumed.
pub fn metaphone(input: &str) -> String {
    let chars: Vec<char> = input.to_uppercase().chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if chars.is_empty() {
        return String::new();
    }

    let mut key = String::new();
    let mut i = 0usize;
    let n = chars.len();

    // Initial-letter exceptions: these combinations drop their first
    // letter entirely.
    if n >= 2 {
        match (chars[0], chars[1]) {
            ('A', 'E') | ('G', 'N') | ('K', 'N') | ('P', 'N') | ('W', 'R') => i = 1,
            ('W', 'H') => {
                key.push('W');
                i = 2;
            }
            ('X', _) => {
                key.push('S');
                i = 1;
            }
            _ => {}
        }
    }

    let is_vowel = |c: char| matches!(c, 'A' | 'E' | 'I' | 'O' | 'U');

    while i < n && key.len() < 16 {
        let c = chars[i];
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(i + 1).copied();
        let next2 = chars.get(i + 2).copied();

        if Some(c) == prev && c != 'C' {
            // Skip duplicate consonants (CC is handled below).
            i += 1;
            continue;
        }

        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == 0 {
                    key.push(c);
                }
            }
            'B' => {
                if !(i == n - 1 && prev == Some('M')) {
                    key.push('B');
                }
            }
            'C' => {
                if next == Some('I') && next2 == Some('A') {
                    key.push('X');
                } else if next == Some('H') {
                    key.push('X');
                    i += 1;
                } else if matches!(next, Some('I') | Some('E') | Some('Y')) {
                    if prev != Some('S') {
                        key.push('S');
                    }
                } else {
                    key.push('K');
                }
            }
            'D' => {
                if next == Some('G') && matches!(next2, Some('E') | Some('Y') | Some('I')) {
                    key.push('J');
                    i += 1;
                } else {
                    key.push('T');
                }
            }
            'G' => {
                if next == Some('H') {
                    // silent unless followed by a vowel, simplified: drop
                } else if next == Some('N') {
                    // silent GN
                } else if matches!(next, Some('I') | Some('E') | Some('Y')) {
                    key.push('J');
                } else {
                    key.push('K');
                }
            }
            'H' => {
                let prev_vowel = prev.map(is_vowel).unwrap_or(false);
                let next_vowel = next.map(is_vowel).unwrap_or(false);
                if prev_vowel && next_vowel {
                    key.push('H');
                }
            }
            'K' => {
                if prev != Some('C') {
                    key.push('K');
                }
            }
            'P' => {
                if next == Some('H') {
                    key.push('F');
                    i += 1;
                } else {
                    key.push('P');
                }
            }
            'Q' => key.push('K'),
            'S' => {
                if next == Some('H') {
                    key.push('X');
                    i += 1;
                } else if next == Some('I') && matches!(next2, Some('O') | Some('A')) {
                    key.push('X');
                } else {
                    key.push('S');
                }
            }
            'T' => {
                if next == Some('H') {
                    key.push('0');
                    i += 1;
                } else if next == Some('I') && matches!(next2, Some('O') | Some('A')) {
                    key.push('X');
                } else {
                    key.push('T');
                }
            }
            'V' => key.push('F'),
            'W' | 'Y' => {
                if next.map(is_vowel).unwrap_or(false) {
                    key.push(c);
                }
            }
            'X' => {
                key.push('K');
                key.push('S');
            }
            'Z' => key.push('S'),
            'F' | 'J' | 'L' | 'M' | 'N' | 'R' => key.push(c),
            _ => {}
        }
        i += 1;
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairwise_metrics_identical_strings() {
        let m = pairwise_string_metrics("Jon", "Jon");
        assert!(m.equal);
        assert_eq!(m.hamming_distance, 0);
        assert_eq!(m.levenshtein_distance, 0);
        assert_eq!(m.damerau_levenshtein_distance, 0);
        assert_eq!(m.jaro_winkler, 1.0);
        assert_eq!(m.ratio, 1.0);
        assert!(m.metaphone);
    }

    #[test]
    fn hamming_handles_unequal_lengths() {
        assert_eq!(hamming_distance("ab", "ab"), 0);
        assert_eq!(hamming_distance("abc", "abd"), 1);
        assert_eq!(hamming_distance("ab", "abcd"), 2);
        assert_eq!(hamming_distance("", "abc"), 3);
    }

    #[test]
    fn ratio_is_one_minus_normalized_distance() {
        assert_eq!(levenshtein_ratio("", ""), 1.0);
        assert_eq!(levenshtein_ratio("abc", "abc"), 1.0);
        assert!(levenshtein_ratio("abc", "xyz") < 0.5);
    }

    #[test]
    fn string_slicer_truncates_both() {
        let (a, b) = string_slicer("JONATHAN", "JON", 3);
        assert_eq!(a, "JON");
        assert_eq!(b, "JON");
    }

    #[test]
    fn string_trimmer_strips_whitespace() {
        let (a, b) = string_trimmer("  BRUEGEL  ", "BRUEGEL");
        assert_eq!(a, "BRUEGEL");
        assert_eq!(b, "BRUEGEL");
    }

    #[test]
    fn string_replacer_replaces_pattern_in_both() {
        let (a, b) = string_replacer("BRUEGEL JR", "BRUEGEL", "JR", "");
        assert_eq!(a, "BRUEGEL ");
        assert_eq!(b, "BRUEGEL");
    }

    #[test]
    fn metaphone_matches_for_phonetically_similar_names() {
        assert_eq!(metaphone("SMITH"), metaphone("SMYTH"));
        assert_eq!(metaphone("KNIGHT"), metaphone("NITE"));
    }

    #[test]
    fn metaphone_empty_input_is_empty_key() {
        assert_eq!(metaphone(""), "");
    }
}
