/// Approximate token matcher: a token matches a field when some substring of the
/// field is within `threshold * token_len` edits of it. Position in the field is
/// irrelevant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_errors(&self, token_len: usize) -> usize {
        (self.threshold * token_len as f64).floor() as usize
    }

    /// Edit count of the best match, or `None` when over the threshold.
    pub fn match_token(&self, token: &[char], field: &[char]) -> Option<usize> {
        if token.is_empty() {
            return Some(0);
        }
        if field.is_empty() {
            return None;
        }

        let max_errors = self.max_errors(token.len());
        if contains(field, token) {
            return Some(0);
        }
        if max_errors == 0 {
            return None;
        }

        let distance = substring_distance(token, field);
        (distance <= max_errors).then_some(distance)
    }
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Smallest edit distance between `pattern` and any substring of `text`
/// (Sellers' variant of Levenshtein: free start and end in `text`).
pub fn substring_distance(pattern: &[char], text: &[char]) -> usize {
    let len = pattern.len();
    let mut previous: Vec<usize> = (0..=len).collect();
    let mut current = vec![0_usize; len + 1];
    let mut best = len;

    for &text_char in text {
        current[0] = 0;
        for row in 1..=len {
            let substitution = previous[row - 1] + usize::from(pattern[row - 1] != text_char);
            let deletion = previous[row] + 1;
            let insertion = current[row - 1] + 1;
            current[row] = substitution.min(deletion).min(insertion);
        }

        best = best.min(current[len]);
        if best == 0 {
            break;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::{substring_distance, FuzzyMatcher};

    fn chars(value: &str) -> Vec<char> {
        value.chars().collect()
    }

    #[test]
    fn substring_distance_ignores_surrounding_text() {
        assert_eq!(substring_distance(&chars("bastoni"), &chars("keto bastoncini 200g")), 1);
        assert_eq!(substring_distance(&chars("leche"), &chars("dulce de leche")), 0);
        assert_eq!(substring_distance(&chars("reort"), &chars("q4 report")), 1);
    }

    #[test]
    fn tolerates_typos_within_threshold() {
        let matcher = FuzzyMatcher::new(0.4);
        assert_eq!(matcher.match_token(&chars("yrba"), &chars("yerba mate")), Some(1));
        assert_eq!(matcher.match_token(&chars("mate"), &chars("yerba mate")), Some(0));
        assert_eq!(matcher.match_token(&chars("xyzw"), &chars("yerba mate")), None);
    }

    #[test]
    fn short_tokens_require_exact_presence() {
        let matcher = FuzzyMatcher::new(0.4);
        assert_eq!(matcher.max_errors(2), 0);
        assert_eq!(matcher.match_token(&chars("ma"), &chars("yerba mate")), Some(0));
        assert_eq!(matcher.match_token(&chars("mx"), &chars("yerba mate")), None);
    }

    #[test]
    fn empty_field_never_matches() {
        let matcher = FuzzyMatcher::new(0.4);
        assert_eq!(matcher.match_token(&chars("abc"), &[]), None);
    }
}
