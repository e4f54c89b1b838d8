use mobiprice_core::{PriceError, PriceResult};
use serde::{Deserialize, Serialize};

/// Scale features to [0, 1] using per-column ranges learned by [`fit`](Self::fit).
///
/// The fitted ranges are kept so that rows seen later (test rows, prediction
/// requests) go through exactly the same mapping. Values outside the fitted
/// range map outside [0, 1]; they are not clamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        MinMaxScaler { min: None, max: None }
    }

    pub fn fit(&mut self, x: &[Vec<f64>]) -> PriceResult<()> {
        let first = x
            .first()
            .ok_or_else(|| PriceError::InvalidInput("cannot fit scaler on an empty set".into()))?;
        let cols = first.len();

        let mut min_vals = vec![f64::INFINITY; cols];
        let mut max_vals = vec![f64::NEG_INFINITY; cols];

        for row in x {
            if row.len() != cols {
                return Err(PriceError::DimensionMismatch {
                    expected: cols,
                    got: row.len(),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                if v < min_vals[j] {
                    min_vals[j] = v;
                }
                if v > max_vals[j] {
                    max_vals[j] = v;
                }
            }
        }

        self.min = Some(min_vals);
        self.max = Some(max_vals);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.min.as_ref().map(Vec::len)
    }

    /// Scale one row. A zero-width column maps to 0.
    pub fn transform_row(&self, row: &[f64]) -> PriceResult<Vec<f64>> {
        let (min, max) = match (&self.min, &self.max) {
            (Some(min), Some(max)) => (min, max),
            _ => return Err(PriceError::ModelNotTrained),
        };
        if row.len() != min.len() {
            return Err(PriceError::DimensionMismatch {
                expected: min.len(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(min.iter().zip(max.iter()))
            .map(|(&v, (&lo, &hi))| {
                let range = hi - lo;
                if range == 0.0 {
                    0.0
                } else {
                    (v - lo) / range
                }
            })
            .collect())
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> PriceResult<Vec<Vec<f64>>> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn fit_transform(&mut self, x: &[Vec<f64>]) -> PriceResult<Vec<Vec<f64>>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Fit a scaler on `x` and return the scaled rows together with it.
pub fn normalize(x: &[Vec<f64>]) -> PriceResult<(Vec<Vec<f64>>, MinMaxScaler)> {
    let mut scaler = MinMaxScaler::new();
    let scaled = scaler.fit_transform(x)?;
    Ok((scaled, scaler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_minmax_scaler() {
        let x = vec![
            vec![1.0, 10.0, 7.0],
            vec![5.0, 20.0, 7.0],
            vec![3.0, 30.0, 7.0],
        ];

        let (scaled, scaler) = normalize(&x).unwrap();

        for row in &scaled {
            for &v in row {
                assert!((0.0..=1.0).contains(&v));
            }
        }
        assert_relative_eq!(scaled[0][0], 0.0);
        assert_relative_eq!(scaled[1][0], 1.0);
        assert_relative_eq!(scaled[2][0], 0.5);
        assert_relative_eq!(scaled[2][1], 1.0);
        // constant column
        assert!(scaled.iter().all(|row| row[2] == 0.0));
        assert_eq!(scaler.min.as_deref(), Some(&[1.0, 10.0, 7.0][..]));
        assert_eq!(scaler.max.as_deref(), Some(&[5.0, 30.0, 7.0][..]));
    }

    #[test]
    fn test_transform_reuses_fitted_ranges() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&[vec![0.0], vec![10.0]]).unwrap();

        assert_relative_eq!(scaler.transform_row(&[5.0]).unwrap()[0], 0.5);
        // outside the training range, not clamped
        assert_relative_eq!(scaler.transform_row(&[20.0]).unwrap()[0], 2.0);
    }

    #[test]
    fn test_unfitted_and_mismatched() {
        let scaler = MinMaxScaler::new();
        assert_eq!(scaler.transform_row(&[1.0]), Err(PriceError::ModelNotTrained));

        let mut scaler = MinMaxScaler::new();
        assert!(matches!(scaler.fit(&[]), Err(PriceError::InvalidInput(_))));
        scaler.fit(&[vec![0.0, 1.0]]).unwrap();
        assert_eq!(
            scaler.transform_row(&[1.0]),
            Err(PriceError::DimensionMismatch { expected: 2, got: 1 })
        );
    }
}
