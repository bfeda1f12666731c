//! Confidence Calibrator Module
//!
//! Calibrators that turn raw model confidences into calibrated probabilities
//! (Platt scaling, isotonic regression, temperature scaling) and persist their
//! fitted state through `calibration-store`, plus stateless confidence
//! feature transformers.

pub mod calibrator;
pub mod traits;
pub mod transformers;


pub use calibrator::{
    CalibrationMethod, CalibrationStats, ConfidenceCalibrator, ReliabilityBin, ScalingParams,
};
pub use traits::{Calibrator, FeatureTransformer};
pub use transformers::{ConfidenceEntropyTransformer, ConfidenceTopTransformer};
