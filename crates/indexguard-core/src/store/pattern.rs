//! Name matching for canonical-occurrence pattern search.

use crate::models::PatternOptions;

/// Whether `name` matches `pattern` under `options`.
///
/// Without `subsequence` the pattern is a substring; `anchor_start` and
/// `anchor_end` pin it to the start or end of the name (both: exact match).
/// With `subsequence` the pattern characters must appear in order, and the
/// anchors pin the first and last pattern character. An empty pattern
/// matches every name.
pub fn matches_pattern(name: &str, pattern: &str, options: PatternOptions) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let (name, pattern) = if options.ignore_case {
        (name.to_lowercase(), pattern.to_lowercase())
    } else {
        (name.to_string(), pattern.to_string())
    };

    if !options.subsequence {
        return match (options.anchor_start, options.anchor_end) {
            (true, true) => name == pattern,
            (true, false) => name.starts_with(&pattern),
            (false, true) => name.ends_with(&pattern),
            (false, false) => name.contains(&pattern),
        };
    }

    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut pattern_start, mut pattern_end) = (0, pattern.len());
    let (mut name_start, mut name_end) = (0, name.len());

    if options.anchor_start {
        if name.first() != pattern.first() {
            return false;
        }
        pattern_start = 1;
        name_start = 1;
    }
    if options.anchor_end {
        if name.last() != pattern.last() {
            return false;
        }
        if pattern_end > pattern_start {
            if name_end <= name_start {
                return false;
            }
            pattern_end -= 1;
            name_end -= 1;
        }
    }

    is_subsequence(&pattern[pattern_start..pattern_end], &name[name_start..name_end.max(name_start)])
}

fn is_subsequence(needle: &[char], haystack: &[char]) -> bool {
    let mut remaining = haystack.iter();
    needle.iter().all(|c| remaining.any(|h| h == c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(anchor_start: bool, anchor_end: bool, subsequence: bool, ignore_case: bool) -> PatternOptions {
        PatternOptions {
            anchor_start,
            anchor_end,
            subsequence,
            ignore_case,
        }
    }

    #[test]
    fn substring_modes() {
        let plain = PatternOptions::default();
        assert!(matches_pattern("makeIterator", "Iter", plain));
        assert!(!matches_pattern("makeIterator", "iter", plain));
        assert!(matches_pattern("makeIterator", "iter", opts(false, false, false, true)));
        assert!(matches_pattern("makeIterator", "make", opts(true, false, false, false)));
        assert!(!matches_pattern("makeIterator", "Iter", opts(true, false, false, false)));
        assert!(matches_pattern("makeIterator", "ator", opts(false, true, false, false)));
        assert!(matches_pattern("foo", "foo", opts(true, true, false, false)));
        assert!(!matches_pattern("food", "foo", opts(true, true, false, false)));
    }

    #[test]
    fn subsequence_modes() {
        assert!(matches_pattern("makeIterator", "mIt", opts(false, false, true, false)));
        assert!(!matches_pattern("makeIterator", "tIm", opts(false, false, true, false)));
        assert!(matches_pattern("makeIterator", "mkr", opts(true, true, true, false)));
        assert!(!matches_pattern("makeIterator", "akr", opts(true, false, true, false)));
        assert!(!matches_pattern("makeIterator", "mka", opts(false, true, true, false)));
        assert!(matches_pattern("MakeIterator", "mit", opts(true, false, true, true)));
    }

    #[test]
    fn single_character_anchors() {
        let both = opts(true, true, true, false);
        assert!(matches_pattern("a", "a", both));
        assert!(matches_pattern("aba", "a", both));
        assert!(!matches_pattern("ab", "a", both));
        assert!(!matches_pattern("a", "ab", both));
    }

    #[test]
    fn empty_pattern_matches_everything() {
        assert!(matches_pattern("anything", "", opts(true, true, true, true)));
    }
}
