//! Mean, sample standard deviation, covariance and Pearson correlation.
//!
//! Every function uses the sample convention (Bessel's correction, `n - 1` denominator)
//! so that covariance and standard deviation always agree. None of them return `NaN`
//! or infinities: degenerate input is reported as a [`StockError`].

use crate::error::StockError;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64, StockError> {
    if values.is_empty() {
        return Err(StockError::EmptyInput);
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance: `Σ (xᵢ - mean)² / (n - 1)`.
///
/// A constant series is exactly `0.0`, independent of how its mean rounds.
pub fn sample_variance(values: &[f64]) -> Result<f64, StockError> {
    let mean = mean(values)?;
    ensure_min_len(values.len(), 2)?;

    if is_constant(values) {
        return Ok(0.0);
    }

    let sum_squares = values
        .iter()
        .map(|&x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>();

    Ok(sum_squares / (values.len() - 1) as f64)
}

/// Sample standard deviation, the square root of [`sample_variance`].
pub fn sample_std_dev(values: &[f64]) -> Result<f64, StockError> {
    sample_variance(values).map(f64::sqrt)
}

/// Sample covariance: `Σ (aᵢ - mean_a)(bᵢ - mean_b) / (n - 1)`.
///
/// Samples are paired by index, so both series must have the same length.
pub fn covariance(a: &[f64], b: &[f64]) -> Result<f64, StockError> {
    ensure_same_len(a, b)?;
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    ensure_min_len(a.len(), 2)?;

    let sum_products = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>();

    Ok(sum_products / (a.len() - 1) as f64)
}

/// Pearson correlation coefficient, `covariance(a, b) / (std_dev(a) * std_dev(b))`.
///
/// Returns a value in `[-1.0, 1.0]`. A constant series has zero standard deviation,
/// which leaves the coefficient undefined: [`StockError::UndefinedCorrelation`].
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Result<f64, StockError> {
    let covariance = covariance(a, b)?;
    let std_dev_a = sample_std_dev(a)?;
    let std_dev_b = sample_std_dev(b)?;

    if std_dev_a == 0.0 || std_dev_b == 0.0 {
        return Err(StockError::UndefinedCorrelation);
    }

    let coefficient = covariance / (std_dev_a * std_dev_b);
    if !coefficient.is_finite() {
        // Only reachable when the intermediate products over/underflow
        return Err(StockError::UndefinedCorrelation);
    }

    Ok(coefficient.clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.split_first().is_some_and(|(first, rest)| rest.iter().all(|x| x == first))
}

fn ensure_same_len(a: &[f64], b: &[f64]) -> Result<(), StockError> {
    if a.len() != b.len() {
        return Err(StockError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

fn ensure_min_len(actual: usize, required: usize) -> Result<(), StockError> {
    if actual < required {
        return Err(StockError::InsufficientData { required, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_mean() {
        struct TestCase {
            input: Vec<f64>,
            expected: Result<f64, StockError>,
        }

        let tests = vec![
            TestCase {
                // TC0: empty input is rejected rather than dividing by zero
                input: vec![],
                expected: Err(StockError::EmptyInput),
            },
            TestCase {
                // TC1: single sample
                input: vec![42.5],
                expected: Ok(42.5),
            },
            TestCase {
                // TC2: arithmetic average
                input: vec![10.0, 12.0, 11.0],
                expected: Ok(11.0),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = mean(&test.input);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_sample_std_dev() {
        struct TestCase {
            input: Vec<f64>,
            expected: Result<f64, StockError>,
        }

        let tests = vec![
            TestCase {
                // TC0: empty input
                input: vec![],
                expected: Err(StockError::EmptyInput),
            },
            TestCase {
                // TC1: one sample leaves n - 1 == 0
                input: vec![100.0],
                expected: Err(StockError::InsufficientData {
                    required: 2,
                    actual: 1,
                }),
            },
            TestCase {
                // TC2: constant series is exactly zero
                input: vec![7.25, 7.25, 7.25, 7.25],
                expected: Ok(0.0),
            },
            TestCase {
                // TC3: Bessel's correction, population std dev would be 0.8165
                input: vec![10.0, 12.0, 11.0],
                expected: Ok(1.0),
            },
            TestCase {
                // TC4: 2, 4, 4, 4, 5, 5, 7, 9 -> variance 32 / 7
                input: vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0],
                expected: Ok((32.0_f64 / 7.0).sqrt()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = sample_std_dev(&test.input);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => {
                    assert!((actual - expected).abs() < TOLERANCE, "TC{} failed", index)
                }
                (actual, expected) => assert_eq!(actual, expected, "TC{} failed", index),
            }
        }
    }

    #[test]
    fn test_covariance() {
        struct TestCase {
            a: Vec<f64>,
            b: Vec<f64>,
            expected: Result<f64, StockError>,
        }

        let tests = vec![
            TestCase {
                // TC0: misaligned series
                a: vec![1.0, 2.0, 3.0],
                b: vec![1.0, 2.0],
                expected: Err(StockError::LengthMismatch { left: 3, right: 2 }),
            },
            TestCase {
                // TC1: empty series
                a: vec![],
                b: vec![],
                expected: Err(StockError::EmptyInput),
            },
            TestCase {
                // TC2: single sample
                a: vec![1.0],
                b: vec![2.0],
                expected: Err(StockError::InsufficientData {
                    required: 2,
                    actual: 1,
                }),
            },
            TestCase {
                // TC3: b = 2a -> cov = 2 * var(a) = 2
                a: vec![10.0, 12.0, 11.0],
                b: vec![20.0, 24.0, 22.0],
                expected: Ok(2.0),
            },
            TestCase {
                // TC4: opposite movement
                a: vec![1.0, 2.0, 3.0],
                b: vec![3.0, 2.0, 1.0],
                expected: Ok(-1.0),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = covariance(&test.a, &test.b);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => {
                    assert!((actual - expected).abs() < TOLERANCE, "TC{} failed", index)
                }
                (actual, expected) => assert_eq!(actual, expected, "TC{} failed", index),
            }
        }
    }

    #[test]
    fn test_pearson_correlation() {
        struct TestCase {
            a: Vec<f64>,
            b: Vec<f64>,
            expected: Result<f64, StockError>,
        }

        let tests = vec![
            TestCase {
                // TC0: b = 2a is perfectly correlated
                a: vec![10.0, 12.0, 11.0],
                b: vec![20.0, 24.0, 22.0],
                expected: Ok(1.0),
            },
            TestCase {
                // TC1: perfect negative
                a: vec![0.01, 0.02, -0.01, 0.03, -0.02],
                b: vec![-0.01, -0.02, 0.01, -0.03, 0.02],
                expected: Ok(-1.0),
            },
            TestCase {
                // TC2: identical series
                a: vec![231.95, 232.10, 231.40, 233.00, 232.75],
                b: vec![231.95, 232.10, 231.40, 233.00, 232.75],
                expected: Ok(1.0),
            },
            TestCase {
                // TC3: uncorrelated
                a: vec![1.0, 2.0, 3.0, 4.0],
                b: vec![1.0, -1.0, -1.0, 1.0],
                expected: Ok(0.0),
            },
            TestCase {
                // TC4: constant side has no defined correlation
                a: vec![5.0, 5.0, 5.0],
                b: vec![1.0, 2.0, 3.0],
                expected: Err(StockError::UndefinedCorrelation),
            },
            TestCase {
                // TC5: both constant
                a: vec![5.0, 5.0],
                b: vec![9.0, 9.0],
                expected: Err(StockError::UndefinedCorrelation),
            },
            TestCase {
                // TC6: length mismatch propagates
                a: vec![1.0, 2.0, 3.0],
                b: vec![1.0, 2.0],
                expected: Err(StockError::LengthMismatch { left: 3, right: 2 }),
            },
            TestCase {
                // TC7: insufficient data propagates
                a: vec![1.0],
                b: vec![1.0],
                expected: Err(StockError::InsufficientData {
                    required: 2,
                    actual: 1,
                }),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = pearson_correlation(&test.a, &test.b);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => {
                    assert!(
                        (actual - expected).abs() < TOLERANCE,
                        "TC{} failed: {} != {}",
                        index,
                        actual,
                        expected
                    )
                }
                (actual, expected) => assert_eq!(actual, expected, "TC{} failed", index),
            }
        }
    }

    #[test]
    fn test_constant_series_with_inexact_mean() {
        struct TestCase {
            input: Vec<f64>,
        }

        let tests = vec![
            TestCase {
                // TC0: 0.1 * 3 / 3 does not round back to 0.1
                input: vec![0.1; 3],
            },
            TestCase {
                // TC1: realistic quote held for seven minutes
                input: vec![231.95; 7],
            },
            TestCase {
                // TC2: rounding depends on the length too
                input: vec![1.1; 7],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(sample_variance(&test.input), Ok(0.0), "TC{} failed", index);
            assert_eq!(sample_std_dev(&test.input), Ok(0.0), "TC{} failed", index);

            let trend = (0..test.input.len()).map(|i| i as f64).collect::<Vec<_>>();
            assert_eq!(
                pearson_correlation(&test.input, &trend),
                Err(StockError::UndefinedCorrelation),
                "TC{} failed",
                index
            );
            assert_eq!(
                pearson_correlation(&trend, &test.input),
                Err(StockError::UndefinedCorrelation),
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_pearson_correlation_is_symmetric() {
        let a = vec![231.95, 232.10, 231.40, 233.00, 232.75, 231.10];
        let b = vec![118.20, 118.05, 118.90, 117.60, 117.95, 119.30];

        let ab = pearson_correlation(&a, &b).unwrap();
        let ba = pearson_correlation(&b, &a).unwrap();

        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
    }
}
