//! Fuzzy Matcher
//!
//! Ratcliff/Obershelp similarity: find the longest common block, recurse on
//! both sides of it, and score `2 * matched / (len_a + len_b)`.

use crate::knowledge::{Category, KnowledgeBase};

/// Messages longer than this skip fuzzy matching
pub const MAX_FUZZY_INPUT: usize = 256;

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`,
/// earliest in `a` on ties
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut curr = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            curr[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if curr[col] > best.2 {
                best = (i + 1 - curr[col], j + 1 - curr[col], curr[col]);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        stack.push((alo, i, blo, j));
        stack.push((i + k, ahi, j + k, bhi));
    }
    total
}

/// Similarity in [0, 1]; 1.0 for identical non-empty strings
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub category: Category,
    pub score: f64,
}

/// Best-scoring pattern across the whole knowledge base
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    candidates: Vec<(String, Category)>,
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(kb: &KnowledgeBase, threshold: f64) -> Self {
        let candidates = kb
            .entries()
            .iter()
            .flat_map(|entry| entry.patterns.iter().map(|p| (p.clone(), entry.category)))
            .collect();
        Self {
            candidates,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Highest-scoring category at or above the threshold.
    /// The first pattern wins on equal scores.
    pub fn best_match(&self, normalized: &str) -> Option<FuzzyMatch> {
        if normalized.is_empty() || normalized.chars().count() > MAX_FUZZY_INPUT {
            return None;
        }

        let mut best: Option<FuzzyMatch> = None;
        for (pattern, category) in &self.candidates {
            let score = similarity_ratio(normalized, pattern);
            if best.map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    category: *category,
                    score,
                });
            }
        }

        best.filter(|b| b.score >= self.threshold)
    }
}
