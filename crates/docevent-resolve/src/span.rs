//! Span and text utilities.
//!
//! Spans are half-open `[start, end)` ranges of character offsets into a
//! sentence. On the wire they are two-element arrays.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<[usize; 2]> for Span {
    fn from([start, end]: [usize; 2]) -> Self {
        Self { start, end }
    }
}

impl From<Span> for [usize; 2] {
    fn from(span: Span) -> Self {
        [span.start, span.end]
    }
}

/// Longest common substring of `a` and `b`, over characters.
///
/// Returns `(pos_a, pos_b, len)` in character offsets. Among equally long
/// matches the one starting earliest in `a` wins, then earliest in `b`.
/// With no common character the result is `(0, 0, 0)`.
pub fn longest_common_substring(a: &str, b: &str) -> (usize, usize, usize) {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // prev[j + 1] = length of the common suffix of a[..i] and b[..=j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let (mut best_a, mut best_b, mut best_len) = (0, 0, 0);

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = curr[j + 1];
            if k > best_len {
                best_len = k;
                best_a = i + 1 - k;
                best_b = j + 1 - k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_a, best_b, best_len)
}

/// True if two half-open spans intersect. Spans with the same start always
/// overlap, even when one of them is empty.
pub fn spans_overlap(s1: Span, s2: Span) -> bool {
    if s1.start == s2.start {
        true
    } else if s1.start < s2.start {
        s1.end > s2.start
    } else {
        s2.end > s1.start
    }
}

/// Signed gap between two disjoint spans: positive when `a` follows `b`,
/// negative when `b` follows `a`. Meaningless for overlapping spans.
pub fn span_distance(a: Span, b: Span) -> i64 {
    if a.start >= b.end {
        a.start as i64 - b.end as i64
    } else {
        -(b.start as i64 - a.end as i64)
    }
}
