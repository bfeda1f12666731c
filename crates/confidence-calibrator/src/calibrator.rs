//! Confidence Calibration
//!
//! Implements probability calibration techniques to transform raw model outputs
//! into well-calibrated probability estimates. Fitted parameters are kept in a
//! calibration-store registry so a fresh instance can reload them from disk.

use std::path::Path;

use anyhow::Context;
use calibration_store::{CalibratorIdentity, CalibratorState, PersistenceConfig, Registry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::Calibrator;

const MIN_FIT_SAMPLES: usize = 10;

// Registry object names
const METHOD: &str = "method";
const PARAMS: &str = "params";
const ISOTONIC_TABLE: &str = "isotonic_table";
const STATS: &str = "stats";

/// Method used for calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationMethod {
    /// Platt scaling - fits a sigmoid to the scores
    PlattScaling,
    /// Isotonic regression - non-parametric monotonic fit
    IsotonicRegression,
    /// Temperature scaling - single parameter scaling
    TemperatureScaling,
    /// No calibration applied
    None,
}

impl CalibrationMethod {
    /// File-name prefix for calibrators using this method
    pub fn identity(&self) -> &'static str {
        match self {
            CalibrationMethod::PlattScaling => "platt_scaling",
            CalibrationMethod::IsotonicRegression => "isotonic_regression",
            CalibrationMethod::TemperatureScaling => "temperature_scaling",
            CalibrationMethod::None => "uncalibrated",
        }
    }
}

/// Scalar parameters of the parametric methods
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    /// Platt sigmoid slope
    pub platt_a: f64,
    /// Platt sigmoid intercept
    pub platt_b: f64,
    /// Temperature for temperature scaling
    pub temperature: f64,
}

impl Default for ScalingParams {
    fn default() -> Self {
        Self {
            platt_a: 1.0,
            platt_b: 0.0,
            temperature: 1.0,
        }
    }
}

/// Statistics about the calibration model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStats {
    /// Expected Calibration Error (lower is better)
    pub ece: f64,
    /// Maximum Calibration Error
    pub mce: f64,
    /// Brier score (mean squared error of probabilities)
    pub brier_score: f64,
    /// Number of predictions used for calibration
    pub sample_size: usize,
    /// Calibration method
    pub method: CalibrationMethod,
    /// Reliability diagram bins
    pub reliability_bins: Vec<ReliabilityBin>,
    /// When the calibrator was fitted
    pub fitted_at: DateTime<Utc>,
}

/// A bin in the reliability diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBin {
    /// Average predicted probability in this bin
    pub avg_predicted: f64,
    /// Actual fraction of positives in this bin
    pub actual_positive_rate: f64,
    /// Number of samples in this bin
    pub count: usize,
}

/// Confidence calibrator using historical prediction data
#[derive(Debug, Clone)]
pub struct ConfidenceCalibrator {
    method: CalibrationMethod,
    params: ScalingParams,
    /// Isotonic regression lookup table, sorted by raw confidence
    isotonic_table: Vec<(f64, f64)>,
    stats: Option<CalibrationStats>,
    /// Registry of persistable objects plus fit status
    state: CalibratorState,
}

impl ConfidenceCalibrator {
    /// Create an unfitted calibrator for `method`
    pub fn new(method: CalibrationMethod) -> Self {
        Self::with_config(method, PersistenceConfig::default())
    }

    pub fn with_config(method: CalibrationMethod, config: PersistenceConfig) -> Self {
        let identity = CalibratorIdentity::from_static(method.identity());
        Self {
            method,
            params: ScalingParams::default(),
            isotonic_table: Vec::new(),
            stats: None,
            state: CalibratorState::with_config(identity, config),
        }
    }

    fn validate(predictions: &[(f64, bool)]) -> anyhow::Result<()> {
        if predictions.len() < MIN_FIT_SAMPLES {
            anyhow::bail!("Need at least {} predictions for calibration", MIN_FIT_SAMPLES);
        }
        if let Some((pred, _)) = predictions
            .iter()
            .find(|(p, _)| !p.is_finite() || !(0.0..=1.0).contains(p))
        {
            anyhow::bail!("Predicted confidence {} is outside [0, 1]", pred);
        }
        Ok(())
    }

    /// Fit Platt scaling (sigmoid calibration)
    fn fit_platt(&mut self, predictions: &[(f64, bool)]) {
        // Simple gradient descent for sigmoid parameters
        // P(y=1|x) = 1 / (1 + exp(-(Ax + B)))
        let mut a = 0.0;
        let mut b = 0.0;
        let learning_rate = 0.01;
        let iterations = 1000;

        for _ in 0..iterations {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;

            for (pred, outcome) in predictions {
                let y = if *outcome { 1.0 } else { 0.0 };
                let p = 1.0 / (1.0 + (-a * pred - b).exp());
                let error = p - y;
                grad_a += error * pred;
                grad_b += error;
            }

            a -= learning_rate * grad_a / predictions.len() as f64;
            b -= learning_rate * grad_b / predictions.len() as f64;
        }

        self.params.platt_a = a;
        self.params.platt_b = b;
    }

    /// Fit isotonic regression (pool adjacent violators algorithm)
    fn fit_isotonic(&mut self, predictions: &[(f64, bool)]) {
        let mut sorted: Vec<_> = predictions.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Blocks of (first_x, last_x, mean_outcome, weight); ties share a block
        let mut blocks: Vec<(f64, f64, f64, f64)> = Vec::new();
        for (pred, outcome) in sorted {
            let y = if outcome { 1.0 } else { 0.0 };
            match blocks.last_mut() {
                Some(last) if last.1 == pred => {
                    last.2 = (last.2 * last.3 + y) / (last.3 + 1.0);
                    last.3 += 1.0;
                }
                _ => blocks.push((pred, pred, y, 1.0)),
            }

            // Pool violating neighbours until the sequence is non-decreasing
            while blocks.len() >= 2 && blocks[blocks.len() - 2].2 > blocks[blocks.len() - 1].2 {
                if let (Some(right), Some(left)) = (blocks.pop(), blocks.last_mut()) {
                    let weight = left.3 + right.3;
                    left.2 = (left.2 * left.3 + right.2 * right.3) / weight;
                    left.1 = right.1;
                    left.3 = weight;
                }
            }
        }

        self.isotonic_table.clear();
        for (first, last, value, _) in blocks {
            self.isotonic_table.push((first, value));
            if last > first {
                self.isotonic_table.push((last, value));
            }
        }
    }

    /// Fit temperature scaling
    fn fit_temperature(&mut self, predictions: &[(f64, bool)]) {
        // Grid search for best temperature
        let mut best_temp = 1.0;
        let mut best_loss = f64::MAX;

        for t in (1..=100).map(|i| i as f64 * 0.1) {
            let loss: f64 = predictions
                .iter()
                .map(|(pred, outcome)| {
                    let scaled = apply_temperature(*pred, t);
                    // Negative log likelihood
                    if *outcome {
                        -scaled.max(1e-10).ln()
                    } else {
                        -(1.0 - scaled).max(1e-10).ln()
                    }
                })
                .sum();

            if loss < best_loss {
                best_loss = loss;
                best_temp = t;
            }
        }

        self.params.temperature = best_temp;
    }

    /// Calibrate a single raw confidence
    pub fn calibrate(&self, raw_confidence: f64) -> f64 {
        match self.method {
            CalibrationMethod::PlattScaling => {
                1.0 / (1.0 + (-self.params.platt_a * raw_confidence - self.params.platt_b).exp())
            }
            CalibrationMethod::IsotonicRegression => self.isotonic_lookup(raw_confidence),
            CalibrationMethod::TemperatureScaling => {
                apply_temperature(raw_confidence, self.params.temperature)
            }
            CalibrationMethod::None => raw_confidence,
        }
    }

    fn isotonic_lookup(&self, value: f64) -> f64 {
        let table = &self.isotonic_table;
        let (Some(first), Some(last)) = (table.first(), table.last()) else {
            return value;
        };

        match table.binary_search_by(|probe| probe.0.total_cmp(&value)) {
            Ok(idx) => table[idx].1,
            Err(0) => first.1,
            Err(idx) if idx >= table.len() => last.1,
            Err(idx) => {
                // Linear interpolation
                let (x0, y0) = table[idx - 1];
                let (x1, y1) = table[idx];
                let t = (value - x0) / (x1 - x0);
                y0 + t * (y1 - y0)
            }
        }
    }

    fn calculate_stats(&self, predictions: &[(f64, bool)]) -> CalibrationStats {
        let n_bins = 10;
        let mut bins: Vec<Vec<(f64, bool)>> = vec![Vec::new(); n_bins];

        // Bin predictions
        for &(pred, outcome) in predictions {
            let bin_idx = ((pred * n_bins as f64) as usize).min(n_bins - 1);
            bins[bin_idx].push((pred, outcome));
        }

        // Calculate reliability bins and ECE
        let mut reliability_bins = Vec::new();
        let mut ece = 0.0;
        let mut mce: f64 = 0.0;
        let n = predictions.len() as f64;

        for bin in &bins {
            if bin.is_empty() {
                continue;
            }

            let avg_predicted: f64 = bin.iter().map(|(p, _)| p).sum::<f64>() / bin.len() as f64;
            let actual_positive_rate = bin.iter().filter(|(_, o)| *o).count() as f64 / bin.len() as f64;
            let calibration_error = (avg_predicted - actual_positive_rate).abs();

            ece += calibration_error * bin.len() as f64 / n;
            mce = mce.max(calibration_error);

            reliability_bins.push(ReliabilityBin {
                avg_predicted,
                actual_positive_rate,
                count: bin.len(),
            });
        }

        // Calculate Brier score
        let brier_score: f64 = predictions
            .iter()
            .map(|(pred, outcome)| {
                let y = if *outcome { 1.0 } else { 0.0 };
                (pred - y).powi(2)
            })
            .sum::<f64>()
            / n;

        CalibrationStats {
            ece,
            mce,
            brier_score,
            sample_size: predictions.len(),
            method: self.method,
            reliability_bins,
            fitted_at: Utc::now(),
        }
    }

    /// Copy the fitted state into the registry
    fn register_state(&mut self) -> anyhow::Result<()> {
        self.state.register_structured(METHOD, &self.method)?;
        self.state.register_structured(PARAMS, &self.params)?;
        self.state.register_binary(ISOTONIC_TABLE, &self.isotonic_table)?;
        if let Some(stats) = &self.stats {
            self.state.register_structured(STATS, stats)?;
        }
        Ok(())
    }

    /// Get calibration statistics
    pub fn stats(&self) -> Option<&CalibrationStats> {
        self.stats.as_ref()
    }

    pub fn method(&self) -> CalibrationMethod {
        self.method
    }

    pub fn params(&self) -> ScalingParams {
        self.params
    }

    pub fn isotonic_table(&self) -> &[(f64, f64)] {
        &self.isotonic_table
    }

    /// Registry and fit status backing this calibrator
    pub fn state(&self) -> &CalibratorState {
        &self.state
    }
}

fn apply_temperature(confidence: f64, temp: f64) -> f64 {
    // Convert probability to logit, scale, convert back
    let c = confidence.clamp(1e-10, 1.0 - 1e-10);
    let logit = (c / (1.0 - c)).ln();
    let scaled_logit = logit / temp;
    1.0 / (1.0 + (-scaled_logit).exp())
}

impl Calibrator for ConfidenceCalibrator {
    fn name(&self) -> &str {
        self.state.identity().as_str()
    }

    fn fit(&mut self, predictions: &[(f64, bool)]) -> anyhow::Result<()> {
        Self::validate(predictions)?;

        match self.method {
            CalibrationMethod::PlattScaling => self.fit_platt(predictions),
            CalibrationMethod::IsotonicRegression => self.fit_isotonic(predictions),
            CalibrationMethod::TemperatureScaling => self.fit_temperature(predictions),
            CalibrationMethod::None => {}
        }

        self.stats = Some(self.calculate_stats(predictions));
        self.register_state()?;
        self.state.set_fit_status(true);

        tracing::info!(
            "Fitted {} calibrator on {} predictions",
            self.name(),
            predictions.len()
        );
        Ok(())
    }

    fn predict(&self, scores: &[f64]) -> anyhow::Result<Vec<f64>> {
        if !self.fit_status() {
            anyhow::bail!("Calibrator {} must be fitted or loaded before predict", self.name());
        }
        Ok(scores.iter().map(|&s| self.calibrate(s)).collect())
    }

    fn fit_status(&self) -> bool {
        self.state.fit_status()
    }

    fn save(&self, output_dir: &Path) -> anyhow::Result<()> {
        self.state.save(output_dir).with_context(|| {
            format!("Failed to save {} calibrator to {}", self.name(), output_dir.display())
        })?;
        Ok(())
    }

    fn load(&mut self, input_dir: &Path) -> anyhow::Result<()> {
        let registry = self.state.load_registry(input_dir).with_context(|| {
            format!("Failed to load {} calibrator from {}", self.name(), input_dir.display())
        })?;
        if registry.is_empty() {
            anyhow::bail!("No saved {} calibrator under {}", self.name(), input_dir.display());
        }

        let restored = Restored::from_registry(&registry)
            .with_context(|| format!("Incomplete {} calibrator state", self.name()))?;
        if restored.method != self.method {
            anyhow::bail!(
                "Saved method {:?} does not match calibrator method {:?}",
                restored.method,
                self.method
            );
        }

        self.params = restored.params;
        self.isotonic_table = restored.isotonic_table;
        self.stats = Some(restored.stats);
        self.state.restore(registry);
        Ok(())
    }
}

/// Typed view of a loaded registry, decoded before anything is committed
struct Restored {
    method: CalibrationMethod,
    params: ScalingParams,
    isotonic_table: Vec<(f64, f64)>,
    stats: CalibrationStats,
}

impl Restored {
    fn from_registry(registry: &Registry) -> anyhow::Result<Self> {
        Ok(Self {
            method: registry.get_structured(METHOD)?,
            params: registry.get_structured(PARAMS)?,
            isotonic_table: registry.get_binary(ISOTONIC_TABLE)?,
            stats: registry.get_structured(STATS)?,
        })
    }
}
