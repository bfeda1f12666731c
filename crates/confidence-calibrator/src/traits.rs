use std::path::Path;

/// A component that maps raw confidence scores to calibrated probabilities.
///
/// Implementors own their fitted state and persist it under [`name`],
/// which must be stable across processes so a fresh instance can `load`
/// what an earlier one `save`d.
///
/// [`name`]: Calibrator::name
pub trait Calibrator {
    /// Identity used as the file-name prefix of every saved object
    fn name(&self) -> &str;

    /// Fit from `(raw_confidence, was_correct)` pairs
    fn fit(&mut self, predictions: &[(f64, bool)]) -> anyhow::Result<()>;

    /// Calibrated probability for each raw score
    fn predict(&self, scores: &[f64]) -> anyhow::Result<Vec<f64>>;

    fn fit_status(&self) -> bool;

    fn save(&self, output_dir: &Path) -> anyhow::Result<()>;

    fn load(&mut self, input_dir: &Path) -> anyhow::Result<()>;
}

/// Stateless scalar feature computed from per-class prediction vectors
pub trait FeatureTransformer {
    fn name(&self) -> &'static str;

    /// One value per row of `predictions`
    fn transform(&self, predictions: &[Vec<f64>]) -> Vec<f64>;

    fn save(&self, _output_dir: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn load(&mut self, _input_dir: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}
