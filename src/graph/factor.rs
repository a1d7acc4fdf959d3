//! Measurement factors and their noise models.
//!
//! A factor graph connects pose variables through relative measurements.
//! Factors are a closed set of kinds expressed as a tagged enum, so received
//! graphs can be filtered by pattern matching instead of runtime casts.

use crate::core::types::{Pose3D, PoseKey};
use nalgebra::Vector6;
use serde::{Deserialize, Serialize};

/// Diagonal 6-DoF noise model.
///
/// Sigmas are ordered `[rot, rot, rot, trans, trans, trans]`, matching the
/// residual layout used by the optimizer and the wire encoding of factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    sigmas: [f64; 6],
}

impl NoiseModel {
    /// Build from explicit per-component sigmas.
    pub fn diagonal_sigmas(sigmas: [f64; 6]) -> Self {
        Self { sigmas }
    }

    /// Build from a rotation sigma (radians) and a translation sigma (meters).
    pub fn from_stddev(rotation_std: f64, translation_std: f64) -> Self {
        Self {
            sigmas: [
                rotation_std,
                rotation_std,
                rotation_std,
                translation_std,
                translation_std,
                translation_std,
            ],
        }
    }

    /// Per-component sigmas, `[rot; trans]` order.
    pub fn sigmas(&self) -> &[f64; 6] {
        &self.sigmas
    }

    /// Whiten a residual: divide each component by its sigma.
    pub fn whiten(&self, residual: &Vector6<f64>) -> Vector6<f64> {
        let mut out = *residual;
        for i in 0..6 {
            out[i] /= self.sigmas[i];
        }
        out
    }
}

impl Default for NoiseModel {
    /// Default unit covariance: 0.01 rad rotation, 0.1 m translation.
    fn default() -> Self {
        Self::from_stddev(0.01, 0.1)
    }
}

/// Relative-transform measurement between two pose variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetweenFactor {
    /// Source variable.
    pub from: PoseKey,
    /// Target variable.
    pub to: PoseKey,
    /// Measured transform from `from` to `to`.
    pub measurement: Pose3D,
    /// Measurement noise.
    pub noise: NoiseModel,
}

impl BetweenFactor {
    /// Create a new between-factor.
    pub fn new(from: PoseKey, to: PoseKey, measurement: Pose3D, noise: NoiseModel) -> Self {
        Self {
            from,
            to,
            measurement,
            noise,
        }
    }
}

/// Absolute constraint pinning one variable to a pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorFactor {
    /// Constrained variable.
    pub key: PoseKey,
    /// Pose the variable is pinned to.
    pub pose: Pose3D,
    /// Constraint noise.
    pub noise: NoiseModel,
}

/// A factor of any supported kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Factor {
    /// Relative measurement between two variables.
    Between(BetweenFactor),
    /// Absolute constraint on one variable.
    Prior(PriorFactor),
}

impl Factor {
    /// The between-factor payload, if this is one.
    pub fn as_between(&self) -> Option<&BetweenFactor> {
        match self {
            Factor::Between(b) => Some(b),
            _ => None,
        }
    }
}
