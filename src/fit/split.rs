//! Holdout splits and cross-validation folds, stratified by risk class.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Split row indices into `(train, eval)`.
///
/// Each class contributes `round(fraction * class_size)` shuffled rows to the eval
/// set. With fewer than two distinct classes the split is a plain shuffle. Both
/// returned lists are sorted.
pub fn stratified_split(labels: &[usize], fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let groups = class_groups(labels);

    let mut train = Vec::with_capacity(labels.len());
    let mut eval = Vec::new();

    if groups.len() < 2 {
        let mut all: Vec<usize> = (0..labels.len()).collect();
        all.shuffle(&mut rng);
        let k = (fraction * all.len() as f64).round() as usize;
        eval.extend_from_slice(&all[..k.min(all.len())]);
        train.extend_from_slice(&all[k.min(all.len())..]);
    } else {
        for mut rows in groups {
            rows.shuffle(&mut rng);
            let k = ((fraction * rows.len() as f64).round() as usize).min(rows.len());
            eval.extend_from_slice(&rows[..k]);
            train.extend_from_slice(&rows[k..]);
        }
    }

    train.sort_unstable();
    eval.sort_unstable();
    (train, eval)
}

/// Assign rows to `k` folds, dealing each class round-robin so every fold sees a
/// similar class mix. Returns the row indices of each fold (sorted, no shuffle).
pub fn stratified_folds(labels: &[usize], k: usize) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0usize;
    for rows in class_groups(labels) {
        for row in rows {
            folds[next % k].push(row);
            next += 1;
        }
    }
    for f in &mut folds {
        f.sort_unstable();
    }
    folds
}

/// Row indices per distinct label, ordered by label.
fn class_groups(labels: &[usize]) -> Vec<Vec<usize>> {
    let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); n_classes];
    for (i, &c) in labels.iter().enumerate() {
        groups[c].push(i);
    }
    groups.retain(|g| !g.is_empty());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_preserves_class_proportions() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 80 { 0 } else { 3 }).collect();
        let (train, eval) = stratified_split(&labels, 0.25, 42);
        assert_eq!(train.len() + eval.len(), 100);
        assert_eq!(eval.iter().filter(|&&i| labels[i] == 0).count(), 20);
        assert_eq!(eval.iter().filter(|&&i| labels[i] == 3).count(), 5);
        assert!(train.iter().all(|i| !eval.contains(i)));
    }

    #[test]
    fn split_is_seeded() {
        let labels: Vec<usize> = (0..40).map(|i| i % 4).collect();
        assert_eq!(stratified_split(&labels, 0.25, 7), stratified_split(&labels, 0.25, 7));
        assert_ne!(stratified_split(&labels, 0.25, 7).1, stratified_split(&labels, 0.25, 8).1);
    }

    #[test]
    fn single_class_falls_back_to_plain_split() {
        let labels = vec![1usize; 12];
        let (train, eval) = stratified_split(&labels, 0.25, 1);
        assert_eq!(eval.len(), 3);
        assert_eq!(train.len(), 9);
    }

    #[test]
    fn folds_partition_rows_and_balance_classes() {
        let labels: Vec<usize> = (0..50).map(|i| i % 2).collect();
        let folds = stratified_folds(&labels, 5);
        assert_eq!(folds.len(), 5);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
        for f in &folds {
            assert_eq!(f.len(), 10);
            assert_eq!(f.iter().filter(|&&i| labels[i] == 1).count(), 5);
        }
    }
}
