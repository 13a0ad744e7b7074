use crate::utils::Array2F;
use ndarray::ArrayView1;
use std::cmp::Ordering;

/// Decode a network output row into a hard class index: the rounded probability in
/// binary mode, the argmax otherwise
pub fn predicted_class(row: ArrayView1<f32>, binary: bool) -> usize {
    if binary {
        (row[0] >= 0.5) as usize
    } else {
        argmax(row)
    }
}

/// Decode a ground-truth label row the same way
pub fn true_class(row: ArrayView1<f32>, binary: bool) -> usize {
    if binary {
        (row[0] > 0.5) as usize
    } else {
        argmax(row)
    }
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .reduce(|acc, val| if val.1 > acc.1 { val } else { acc })
        .map(|o| o.0)
        .unwrap_or(0)
}

/// Fraction of rows whose decoded prediction matches the decoded label. An empty
/// batch contributes an accuracy of zero rather than a division by zero.
pub fn accuracy(expected: &Array2F, actual: &Array2F, binary: bool) -> f32 {
    let total = expected.shape()[0];
    if total == 0 {
        return 0.0;
    }
    let correct = std::iter::zip(expected.outer_iter(), actual.outer_iter())
        .filter(|(e, a)| true_class(*e, binary) == predicted_class(*a, binary))
        .count();
    correct as f32 / total as f32
}

/// Area under the ROC curve by the ranking definition (Mann-Whitney), with
/// average ranks on probability ties. When the labels hold only one class the
/// curve is undefined; chance level (0.5) is returned so evaluation over
/// degenerate filtered splits stays total.
pub fn auc_roc(probs: &[f32], labels: &[bool]) -> f64 {
    let n = probs.len();
    let positives = labels.iter().filter(|o| **o).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| probs[a].partial_cmp(&probs[b]).unwrap_or(Ordering::Equal));

    // 1-based ranks, averaged within tie groups
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        let rank = (i + 1 + j + 1) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| **label)
        .map(|(i, _)| ranks[i])
        .sum();

    let p = positives as f64;
    let n_neg = negatives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n_neg)
}
