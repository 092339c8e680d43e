//! Glob patterns evaluated against path segments.
//!
//! Patterns are split on the path separator. Within a segment `*` matches any
//! run of characters and `?` a single character; a segment that is exactly
//! `**` matches zero or more whole segments. A `**` glued to other text
//! (`a**b`) behaves like `*`.

/// Pattern used when `glob` is called without one.
pub const DEFAULT_PATTERN: &str = "*";

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<String>,
}

impl Pattern {
    pub fn new(separator: char, pattern: &str) -> Self {
        let segments = pattern
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Pattern { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Leading segments that contain no wildcard.
    pub fn literal_prefix(&self) -> &[String] {
        let end = self
            .segments
            .iter()
            .position(|s| has_wildcard(s))
            .unwrap_or(self.segments.len());
        &self.segments[..end]
    }

    /// Deepest level a match can sit at, or `None` when `**` makes it
    /// unbounded.
    pub fn max_depth(&self) -> Option<usize> {
        if self.segments.iter().any(|s| s == "**") {
            None
        } else {
            Some(self.segments.len())
        }
    }

    /// Whether the relative segments `parts` match the whole pattern.
    pub fn matches<S: AsRef<str>>(&self, parts: &[S]) -> bool {
        let mut memo = vec![vec![None; self.segments.len() + 1]; parts.len() + 1];
        match_parts(0, 0, parts, &self.segments, &mut memo)
    }
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

fn match_parts<S: AsRef<str>>(
    part_idx: usize,
    pattern_idx: usize,
    parts: &[S],
    pattern: &[String],
    memo: &mut [Vec<Option<bool>>],
) -> bool {
    if let Some(cached) = memo[part_idx][pattern_idx] {
        return cached;
    }

    let result = if pattern_idx == pattern.len() {
        part_idx == parts.len()
    } else if pattern[pattern_idx] == "**" {
        match_parts(part_idx, pattern_idx + 1, parts, pattern, memo)
            || (part_idx < parts.len()
                && match_parts(part_idx + 1, pattern_idx, parts, pattern, memo))
    } else {
        part_idx < parts.len()
            && match_segment(parts[part_idx].as_ref(), &pattern[pattern_idx])
            && match_parts(part_idx + 1, pattern_idx + 1, parts, pattern, memo)
    };

    memo[part_idx][pattern_idx] = Some(result);
    result
}

/// Match one segment against `*` / `?` wildcards.
fn match_segment(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let mut dp = vec![vec![false; pattern.len() + 1]; text.len() + 1];
    dp[0][0] = true;

    for p in 1..=pattern.len() {
        if pattern[p - 1] == '*' {
            dp[0][p] = dp[0][p - 1];
        }
    }

    for t in 1..=text.len() {
        for p in 1..=pattern.len() {
            dp[t][p] = match pattern[p - 1] {
                '*' => dp[t][p - 1] || dp[t - 1][p],
                '?' => dp[t - 1][p - 1],
                c => dp[t - 1][p - 1] && text[t - 1] == c,
            };
        }
    }

    dp[text.len()][pattern.len()]
}
