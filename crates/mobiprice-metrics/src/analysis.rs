use mobiprice_core::{PhoneRecord, PriceError, PriceResult, FEATURE_NAMES, N_CLASSES, N_FEATURES};
use serde::Serialize;

/// Summary statistics of one feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStats {
    pub feature: &'static str,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
}

/// Pearson correlation coefficient; 0 when either side has no variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let (mut sx, mut sy, mut sxy, mut sx2, mut sy2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        sx += a;
        sy += b;
        sxy += a * b;
        sx2 += a * a;
        sy2 += b * b;
    }
    let numerator = n * sxy - sx * sy;
    let denominator = ((n * sx2 - sx * sx) * (n * sy2 - sy * sy)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

fn columns(records: &[PhoneRecord]) -> PriceResult<Vec<Vec<f64>>> {
    if records.is_empty() {
        return Err(PriceError::InvalidInput("dataset is empty".into()));
    }
    let mut cols = vec![Vec::with_capacity(records.len()); N_FEATURES];
    for record in records {
        for (col, v) in cols.iter_mut().zip(record.features()) {
            col.push(v);
        }
    }
    Ok(cols)
}

/// Correlation of every feature with `price_range`, in feature order.
pub fn feature_correlations(records: &[PhoneRecord]) -> PriceResult<Vec<(&'static str, f64)>> {
    let cols = columns(records)?;
    let prices: Vec<f64> = records.iter().map(|r| r.price_range as f64).collect();
    Ok(FEATURE_NAMES
        .iter()
        .zip(&cols)
        .map(|(&name, col)| (name, pearson_correlation(col, &prices)))
        .collect())
}

pub fn feature_stats(records: &[PhoneRecord]) -> PriceResult<Vec<FeatureStats>> {
    let cols = columns(records)?;
    let n = records.len() as f64;
    Ok(FEATURE_NAMES
        .iter()
        .zip(&cols)
        .map(|(&feature, col)| {
            let mean = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            FeatureStats {
                feature,
                mean,
                min: col.iter().copied().fold(f64::INFINITY, f64::min),
                max: col.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                std: var.sqrt(),
            }
        })
        .collect())
}

/// Number of records per price class. Out-of-range labels are ignored.
pub fn class_distribution(records: &[PhoneRecord]) -> [usize; N_CLASSES] {
    let mut counts = [0usize; N_CLASSES];
    for record in records {
        if let Some(c) = counts.get_mut(record.label()) {
            *c += 1;
        }
    }
    counts
}
