//! Data preprocessing utilities

use ndarray::Array2;

/// Standardize every column to zero mean and unit variance.
///
/// Uses the population standard deviation. Missing values are ignored when
/// computing the statistics and stay missing. Constant columns are centered
/// but not scaled.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let mut result = data.clone();

    for mut column in result.columns_mut() {
        let valid: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() {
            continue;
        }

        let n = valid.len() as f64;
        let mean = valid.iter().sum::<f64>() / n;
        let var = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > 1e-12 { std } else { 1.0 };

        column.mapv_inplace(|v| (v - mean) / scale);
    }

    result
}

/// Replace missing values with `value`, returning the filled matrix and
/// the number of replaced cells.
pub fn fill_missing(data: &Array2<f64>, value: f64) -> (Array2<f64>, usize) {
    let mut replaced = 0;
    let filled = data.mapv(|v| {
        if v.is_nan() {
            replaced += 1;
            value
        } else {
            v
        }
    });
    (filled, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};

    #[test]
    fn test_standardize() {
        let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let standardized = standardize(&data);

        let means = standardized.mean_axis(Axis(0)).unwrap();
        let stds = standardized.std_axis(Axis(0), 0.0);

        for j in 0..2 {
            assert!(means[j].abs() < 1e-10);
            assert!((stds[j] - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_standardize_constant_column() {
        let data = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let standardized = standardize(&data);

        for i in 0..3 {
            assert_eq!(standardized[[i, 0]], 0.0);
        }
    }

    #[test]
    fn test_standardize_keeps_missing() {
        let data = array![[1.0], [f64::NAN], [3.0]];
        let standardized = standardize(&data);

        assert!(standardized[[1, 0]].is_nan());
        assert!((standardized[[0, 0]] + 1.0).abs() < 1e-10);
        assert!((standardized[[2, 0]] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_fill_missing() {
        let data = array![[1.0, f64::NAN], [f64::NAN, 4.0]];
        let (filled, replaced) = fill_missing(&data, 0.0);

        assert_eq!(replaced, 2);
        assert_eq!(filled, array![[1.0, 0.0], [0.0, 4.0]]);
    }
}
