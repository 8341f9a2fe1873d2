//! String similarity used to compare table headers.

/// A similarity ratio in `[0, 1]`.
pub trait Similarity: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// `2 * matches / (len(a) + len(b))`, where matches is the length of the
/// longest common character subsequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRatio;

impl Similarity for SequenceRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }

        // Single-row LCS table.
        let mut row = vec![0usize; b.len() + 1];
        for ca in &a {
            let mut diagonal = 0;
            for (j, cb) in b.iter().enumerate() {
                let above = row[j + 1];
                row[j + 1] = if ca == cb { diagonal + 1 } else { above.max(row[j]) };
                diagonal = above;
            }
        }

        2.0 * row[b.len()] as f64 / total as f64
    }
}

/// Normalized Levenshtein distance, via `strsim`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Similarity for Levenshtein {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Case/trim-insensitive equality, non-empty substring containment, or a
/// ratio strictly above `threshold`.
pub fn similar_strings(similarity: &dyn Similarity, a: &str, b: &str, threshold: f64) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return true;
    }
    if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        return true;
    }
    similarity.ratio(&a, &b) > threshold
}
