//! Confidence Feature Transformers
//!
//! Scalar features derived from a base model's per-class confidence
//! vectors. Both are stateless, so saving and loading them is a no-op.

use crate::traits::FeatureTransformer;

/// Highest class confidence of each prediction
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceTopTransformer;

impl FeatureTransformer for ConfidenceTopTransformer {
    fn name(&self) -> &'static str {
        "confidence_top"
    }

    fn transform(&self, predictions: &[Vec<f64>]) -> Vec<f64> {
        predictions
            .iter()
            .map(|row| row.iter().copied().fold(f64::NAN, f64::max))
            .collect()
    }
}

/// Shannon entropy (natural log) of each confidence vector.
///
/// Rows are normalised to sum to one first. Empty rows and rows summing to
/// zero have no defined entropy and yield NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEntropyTransformer;

impl FeatureTransformer for ConfidenceEntropyTransformer {
    fn name(&self) -> &'static str {
        "confidence_entropy"
    }

    fn transform(&self, predictions: &[Vec<f64>]) -> Vec<f64> {
        predictions.iter().map(|row| entropy(row)).collect()
    }
}

fn entropy(row: &[f64]) -> f64 {
    let total: f64 = row.iter().sum();
    if row.is_empty() || total <= 0.0 {
        return f64::NAN;
    }
    row.iter()
        .map(|&p| p / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}
