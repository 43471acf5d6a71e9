//! Key Pattern Matching
//!
//! Patterns are either a literal prefix (`slot:seller1:`) or a glob in which
//! `*` matches any run of characters (`availability:seller1:*`).

/// Returns true if `key` matches `pattern`.
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    if !pattern.contains('*') {
        return key.starts_with(pattern);
    }
    glob_match(pattern.as_bytes(), key.as_bytes())
}

// Greedy glob with single-star backtracking.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
