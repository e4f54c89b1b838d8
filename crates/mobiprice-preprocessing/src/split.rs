use mobiprice_core::{PriceError, PriceResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seeded generator, or one seeded from OS entropy when `seed` is `None`.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Shuffle `0..n` and cut it into `(train, test)` index sets.
///
/// The test set holds `round(n * test_ratio)` indices.
pub fn train_test_split_indices<R: Rng + ?Sized>(
    n: usize,
    test_ratio: f64,
    rng: &mut R,
) -> PriceResult<(Vec<usize>, Vec<usize>)> {
    if n == 0 {
        return Err(PriceError::InvalidInput("cannot split an empty dataset".into()));
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PriceError::InvalidInput(format!(
            "test fraction must lie in (0, 1), got {test_ratio}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let test_size = (n as f64 * test_ratio).round() as usize;
    let train_size = n - test_size;
    let test = indices.split_off(train_size);
    Ok((indices, test))
}

/// Split items into training and test sets.
///
/// Returns `(train, test)`.
pub fn train_test_split<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    test_ratio: f64,
    rng: &mut R,
) -> PriceResult<(Vec<T>, Vec<T>)> {
    let (train_idx, test_idx) = train_test_split_indices(items.len(), test_ratio, rng)?;
    Ok((gather(items, &train_idx), gather(items, &test_idx)))
}

/// Clone `items[i]` for every `i` in `indices`.
pub fn gather<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

/// One cross-validation fold.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled k-fold partition of `0..n`. The first `n % k` folds get one
/// extra test index.
pub fn k_fold_indices<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> PriceResult<Vec<Fold>> {
    if k < 2 {
        return Err(PriceError::InvalidInput(format!("k-fold needs at least 2 folds, got {k}")));
    }
    if n < k {
        return Err(PriceError::InvalidInput(format!(
            "{n} samples cannot fill {k} folds"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let base = n / k;
    let remainder = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = if fold < remainder { base + 1 } else { base };
        let end = start + size;
        let test = indices[start..end].to_vec();
        let train = indices[..start]
            .iter()
            .chain(indices[end..].iter())
            .copied()
            .collect();
        folds.push(Fold { train, test });
        start = end;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_test_split() {
        let items: Vec<u32> = (0..10).collect();
        let mut rng = seeded_rng(Some(42));
        let (train, test) = train_test_split(&items, 0.2, &mut rng).unwrap();

        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        let mut all: Vec<u32> = train.iter().chain(test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, items);
    }

    #[test]
    fn test_split_sizes_round() {
        let mut rng = seeded_rng(Some(1));
        for n in [1usize, 3, 7, 999, 1000] {
            let (train, test) = train_test_split_indices(n, 0.25, &mut rng).unwrap();
            assert_eq!(train.len() + test.len(), n);
            assert_eq!(test.len(), (n as f64 * 0.25).round() as usize);
        }
    }

    #[test]
    fn test_split_is_reproducible_with_seed() {
        let a = train_test_split_indices(50, 0.3, &mut seeded_rng(Some(7))).unwrap();
        let b = train_test_split_indices(50, 0.3, &mut seeded_rng(Some(7))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_rejects_bad_input() {
        let mut rng = seeded_rng(Some(0));
        for ratio in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                train_test_split_indices(10, ratio, &mut rng),
                Err(PriceError::InvalidInput(_))
            ));
        }
        assert!(train_test_split_indices(0, 0.2, &mut rng).is_err());
    }

    #[test]
    fn test_k_fold_covers_every_index_once() {
        let folds = k_fold_indices(23, 5, &mut seeded_rng(Some(3))).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; 23];
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 23);
            for &i in &fold.test {
                seen[i] += 1;
                assert!(!fold.train.contains(&i));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
        assert_eq!(folds[0].test.len(), 5);
        assert_eq!(folds[4].test.len(), 4);
    }

    #[test]
    fn test_k_fold_rejects_bad_input() {
        let mut rng = seeded_rng(Some(3));
        assert!(k_fold_indices(10, 1, &mut rng).is_err());
        assert!(k_fold_indices(3, 5, &mut rng).is_err());
    }
}
