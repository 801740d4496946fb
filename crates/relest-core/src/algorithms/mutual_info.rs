//! Normalized mutual information between two columns.

use hashbrown::HashMap;
use relest_common::types::Value;

/// Shannon entropy (natural log) of a count table.
fn entropy<K>(counts: &HashMap<K, u64>, total: f64) -> f64 {
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Normalized mutual information of two aligned label sequences, with
/// arithmetic-mean normalization: `I(a; b) / ((H(a) + H(b)) / 2)`.
///
/// Values are treated as opaque categories, nulls included. The score lies
/// in `[0, 1]`. Two constant columns score `1.0` (they are trivially the
/// same partition), while a constant column paired with a varying one
/// scores `0.0`.
///
/// Only the common prefix is scored when the lengths differ; empty input
/// scores `1.0`.
#[must_use]
pub fn normalized_mutual_info(a: &[Value], b: &[Value]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 1.0;
    }

    let mut a_counts: HashMap<&Value, u64> = HashMap::new();
    let mut b_counts: HashMap<&Value, u64> = HashMap::new();
    let mut joint: HashMap<(&Value, &Value), u64> = HashMap::new();
    for (x, y) in a.iter().zip(b).take(len) {
        *a_counts.entry(x).or_insert(0) += 1;
        *b_counts.entry(y).or_insert(0) += 1;
        *joint.entry((x, y)).or_insert(0) += 1;
    }

    if a_counts.len() == 1 && b_counts.len() == 1 {
        return 1.0;
    }

    let total = len as f64;
    let h_a = entropy(&a_counts, total);
    let h_b = entropy(&b_counts, total);

    let mut mi = 0.0;
    for (&(x, y), &count) in &joint {
        let p_xy = count as f64 / total;
        let p_x = a_counts[x] as f64 / total;
        let p_y = b_counts[y] as f64 / total;
        mi += p_xy * (p_xy / (p_x * p_y)).ln();
    }

    let normalizer = ((h_a + h_b) / 2.0).max(f64::EPSILON);
    (mi / normalizer).clamp(0.0, 1.0)
}
