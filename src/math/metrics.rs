//! Evaluation metrics used for candidate selection and the training report.

/// Fraction of exact label matches. Empty input gives 0.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    hits as f64 / truth.len() as f64
}

/// Mean absolute error. Empty input gives 0.
pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let total: f64 = truth.iter().zip(predicted).map(|(a, b)| (a - b).abs()).sum();
    total / truth.len() as f64
}

/// ROC AUC for a binary target, using the rank-sum (Mann-Whitney) formulation.
///
/// Tied scores receive their average rank. Returns `None` when `labels` contains
/// only one class, where AUC is undefined.
pub fn binary_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank for the tie group [i, j).
        let avg = (i + j + 1) as f64 / 2.0;
        for &k in &order[i..j] {
            ranks[k] = avg;
        }
        i = j;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|(_, l)| **l)
        .map(|(r, _)| *r)
        .sum();
    let np = n_pos as f64;
    let nn = n_neg as f64;
    Some((pos_rank_sum - np * (np + 1.0) / 2.0) / (np * nn))
}

/// Square confusion matrix, `m[truth][predicted]`. Out-of-range labels are skipped.
pub fn confusion_matrix(truth: &[usize], predicted: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut m = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < n_classes && p < n_classes {
            m[t][p] += 1;
        }
    }
    m
}

/// Per-class precision, recall and F1. Undefined ratios are 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Rows whose true class is this one.
    pub support: usize,
}

/// One `ClassMetrics` per class id.
pub fn classification_report(
    truth: &[usize],
    predicted: &[usize],
    n_classes: usize,
) -> Vec<ClassMetrics> {
    let m = confusion_matrix(truth, predicted, n_classes);
    (0..n_classes)
        .map(|c| {
            let hits = m[c][c] as f64;
            let support: usize = m[c].iter().sum();
            let predicted_as: usize = m.iter().map(|row| row[c]).sum();
            let precision = ratio(hits, predicted_as as f64);
            let recall = ratio(hits, support as f64);
            ClassMetrics {
                precision,
                recall,
                f1: ratio(2.0 * precision * recall, precision + recall),
                support,
            }
        })
        .collect()
}

/// Pearson correlation. `None` for fewer than two pairs or a constant series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_and_mae() {
        assert_eq!(accuracy(&[0, 1, 2, 3], &[0, 1, 0, 3]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
        assert!((mean_absolute_error(&[0.1, 0.5], &[0.2, 0.3]) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn auc_perfect_random_and_ties() {
        let labels = [false, false, true, true];
        assert_eq!(binary_auc(&labels, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(binary_auc(&labels, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
        assert_eq!(binary_auc(&labels, &[0.5, 0.5, 0.5, 0.5]), Some(0.5));
    }

    #[test]
    fn auc_undefined_for_single_class() {
        assert_eq!(binary_auc(&[true, true], &[0.1, 0.2]), None);
        assert_eq!(binary_auc(&[false], &[0.1]), None);
    }

    #[test]
    fn confusion_counts() {
        let m = confusion_matrix(&[0, 0, 1, 2], &[0, 1, 1, 2], 3);
        assert_eq!(m, vec![vec![1, 1, 0], vec![0, 1, 0], vec![0, 0, 1]]);
    }

    #[test]
    fn per_class_precision_recall_f1() {
        let report = classification_report(&[0, 0, 1, 1, 2], &[0, 1, 1, 1, 0], 4);
        assert_eq!(report.len(), 4);

        assert_eq!(report[0].precision, 0.5);
        assert_eq!(report[0].recall, 0.5);
        assert_eq!(report[0].f1, 0.5);
        assert_eq!(report[0].support, 2);

        assert!((report[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report[1].recall, 1.0);
        assert!((report[1].f1 - 0.8).abs() < 1e-12);

        // Never predicted, never correct.
        assert_eq!((report[2].precision, report[2].recall, report[2].f1), (0.0, 0.0, 0.0));
        assert_eq!(report[3].support, 0);
    }

    #[test]
    fn pearson_sign_and_degenerate_inputs() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 1.0, -1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }
}
