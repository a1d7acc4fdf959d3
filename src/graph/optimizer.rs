//! Robust nonlinear least-squares over SE(3) pose graphs.
//!
//! Minimizes the whitened squared error of all factors:
//!
//! ```text
//! F(x) = Σ w_k · ‖Σ_k⁻½ e_k(x)‖²
//! ```
//!
//! The inner solver is Levenberg–Marquardt: at each iteration the normal
//! equations `H Δx = -b` are assembled from factor Jacobians (central
//! differences on the local tangent perturbation), damped, and solved with
//! a dense Cholesky factorization. Updates are applied through the
//! exponential map.
//!
//! The outer loop is graduated non-convexity with Geman–McClure weights:
//! the control parameter μ starts from the worst residual and shrinks each
//! round, progressively suppressing outlier factors. Priors are treated as
//! known inliers and never down-weighted.

use super::factor::{Factor, NoiseModel};
use super::values::PoseEstimates;
use crate::core::types::{Pose3D, PoseKey};
use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Matrix6, Vector6};
use std::collections::BTreeMap;

/// Step size for the central-difference Jacobians.
const JACOBIAN_STEP: f64 = 1e-6;

/// Configuration for robust graph optimization.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum iterations per inner Levenberg–Marquardt solve.
    pub max_iterations: u32,

    /// Convergence threshold for relative error change.
    pub convergence_threshold: f64,

    /// Initial Levenberg–Marquardt damping factor.
    pub damping_init: f64,

    /// Maximum graduated non-convexity rounds.
    pub gnc_max_rounds: u32,

    /// Divisor applied to μ after every round.
    pub gnc_mu_step: f64,

    /// Inlier threshold on the whitened squared residual.
    pub gnc_inlier_threshold: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 1e-6,
            damping_init: 1e-3,
            gnc_max_rounds: 20,
            gnc_mu_step: 1.4,
            gnc_inlier_threshold: 1.0,
        }
    }
}

/// Reason for optimization termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Relative error change fell below the threshold.
    Converged,
    /// Inner iteration budget exhausted.
    MaxIterations,
    /// Error kept increasing despite damping.
    Diverged,
    /// The damped normal equations could not be factorized.
    SolveFailed,
    /// Nothing to optimize.
    NoFactors,
}

/// Result of a graph optimization.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// Optimized pose estimates.
    pub estimates: PoseEstimates,
    /// Whether the solve converged.
    pub converged: bool,
    /// Total inner iterations across all rounds.
    pub iterations: u32,
    /// Error before optimization.
    pub initial_error: f64,
    /// Error after optimization.
    pub final_error: f64,
    /// Why the solve stopped.
    pub termination: TerminationReason,
    /// Factors referencing unknown variables, dropped before solving.
    pub dropped_factors: usize,
}

/// A factor with its variables resolved to state indices.
#[derive(Debug, Clone)]
enum Resolved {
    Between {
        i: usize,
        j: usize,
        measurement: Pose3D,
        noise: NoiseModel,
    },
    Prior {
        i: usize,
        pose: Pose3D,
        noise: NoiseModel,
    },
}

impl Resolved {
    fn is_robust(&self) -> bool {
        matches!(self, Resolved::Between { .. })
    }

    /// Whitened residual at the given state, with one variable optionally
    /// overridden (used for numeric differentiation).
    fn residual_with(
        &self,
        x: &[Pose3D],
        replaced: Option<(usize, &Pose3D)>,
    ) -> Vector6<f64> {
        let at = |idx: usize| match replaced {
            Some((var, pose)) if var == idx => *pose,
            _ => x[idx],
        };
        match self {
            Resolved::Between {
                i,
                j,
                measurement,
                noise,
            } => {
                let predicted = at(*i).inverse().compose(&at(*j));
                noise.whiten(&measurement.inverse().compose(&predicted).log())
            }
            Resolved::Prior { i, pose: prior, noise } => {
                noise.whiten(&prior.inverse().compose(&at(*i)).log())
            }
        }
    }

    fn residual(&self, x: &[Pose3D]) -> Vector6<f64> {
        self.residual_with(x, None)
    }

    fn variables(&self) -> (usize, Option<usize>) {
        match self {
            Resolved::Between { i, j, .. } => (*i, Some(*j)),
            Resolved::Prior { i, .. } => (*i, None),
        }
    }
}

struct InnerOutcome {
    iterations: u32,
    error: f64,
    termination: TerminationReason,
}

/// Robust pose-graph optimizer.
pub struct GraphOptimizer {
    config: OptimizerConfig,
}

impl GraphOptimizer {
    /// Create an optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Optimize the graph, returning optimized copies of the estimates.
    pub fn optimize(&self, factors: &[Factor], initial: &PoseEstimates) -> OptimizationOutcome {
        let keys: Vec<PoseKey> = initial.keys().copied().collect();
        let index: BTreeMap<PoseKey, usize> =
            keys.iter().enumerate().map(|(n, k)| (*k, n)).collect();

        let mut dropped = 0usize;
        let mut resolved: Vec<Resolved> = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor {
                Factor::Between(b) => {
                    match (index.get(&b.from), index.get(&b.to)) {
                        (Some(&i), Some(&j)) => resolved.push(Resolved::Between {
                            i,
                            j,
                            measurement: b.measurement,
                            noise: b.noise,
                        }),
                        _ => dropped += 1,
                    }
                }
                Factor::Prior(p) => match index.get(&p.key) {
                    Some(&i) => resolved.push(Resolved::Prior {
                        i,
                        pose: p.pose,
                        noise: p.noise,
                    }),
                    None => dropped += 1,
                },
            }
        }
        if dropped > 0 {
            log::debug!("optimizer dropped {dropped} factors with unknown variables");
        }

        if resolved.is_empty() || keys.is_empty() {
            return OptimizationOutcome {
                estimates: initial.clone(),
                converged: true,
                iterations: 0,
                initial_error: 0.0,
                final_error: 0.0,
                termination: TerminationReason::NoFactors,
                dropped_factors: dropped,
            };
        }

        let mut x: Vec<Pose3D> = initial.iter().map(|(_, pose)| *pose).collect();
        let mut weights = vec![1.0f64; resolved.len()];
        let initial_error = chi_squared(&resolved, &weights, &x);

        // GNC control parameter from the worst robust residual.
        let barc_sq = self.config.gnc_inlier_threshold;
        let worst = resolved
            .iter()
            .filter(|f| f.is_robust())
            .map(|f| f.residual(&x).norm_squared())
            .fold(0.0f64, f64::max);
        let mut mu = (2.0 * worst / barc_sq).max(1.0);
        let has_robust = resolved.iter().any(|f| f.is_robust());

        let mut iterations = 0;
        let mut termination = TerminationReason::MaxIterations;
        let mut error = initial_error;

        for _round in 0..self.config.gnc_max_rounds.max(1) {
            let inner = self.run_levenberg_marquardt(&resolved, &weights, &mut x);
            iterations += inner.iterations;
            error = inner.error;
            termination = inner.termination;

            if matches!(
                termination,
                TerminationReason::SolveFailed | TerminationReason::Diverged
            ) {
                break;
            }
            if !has_robust || mu <= 1.0 {
                break;
            }

            for (k, factor) in resolved.iter().enumerate() {
                if !factor.is_robust() {
                    continue;
                }
                let r_sq = factor.residual(&x).norm_squared();
                let w = mu * barc_sq / (r_sq + mu * barc_sq);
                weights[k] = w * w;
            }
            mu = (mu / self.config.gnc_mu_step).max(1.0);
        }

        let mut estimates = PoseEstimates::new();
        for (key, pose) in keys.iter().zip(&x) {
            estimates.update(*key, *pose);
        }

        OptimizationOutcome {
            estimates,
            converged: matches!(termination, TerminationReason::Converged),
            iterations,
            initial_error,
            final_error: error,
            termination,
            dropped_factors: dropped,
        }
    }

    fn run_levenberg_marquardt(
        &self,
        factors: &[Resolved],
        weights: &[f64],
        x: &mut Vec<Pose3D>,
    ) -> InnerOutcome {
        let dim = x.len() * 6;
        let mut lambda = self.config.damping_init;
        let mut current = chi_squared(factors, weights, x);
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations {
            iterations += 1;

            let (mut h, b) = build_normal_equations(factors, weights, x, dim);
            for d in 0..dim {
                let diag = h[(d, d)];
                h[(d, d)] = diag + lambda * diag.max(1.0);
            }

            let Some(chol) = Cholesky::new(h) else {
                return InnerOutcome {
                    iterations,
                    error: current,
                    termination: TerminationReason::SolveFailed,
                };
            };
            let dx = chol.solve(&(-&b));

            let candidate: Vec<Pose3D> = x
                .iter()
                .enumerate()
                .map(|(n, pose)| {
                    let delta = Vector6::new(
                        dx[n * 6],
                        dx[n * 6 + 1],
                        dx[n * 6 + 2],
                        dx[n * 6 + 3],
                        dx[n * 6 + 4],
                        dx[n * 6 + 5],
                    );
                    pose.retract(&delta)
                })
                .collect();
            let new_error = chi_squared(factors, weights, &candidate);

            if new_error > current * 1.1 {
                // Reject the step and increase damping.
                lambda *= 10.0;
                if lambda > 1e10 {
                    return InnerOutcome {
                        iterations,
                        error: current,
                        termination: TerminationReason::Diverged,
                    };
                }
                continue;
            }

            *x = candidate;
            lambda = (lambda * 0.1).max(1e-10);

            let relative_change = (current - new_error).abs() / current.max(1e-12);
            current = new_error;
            if relative_change < self.config.convergence_threshold {
                return InnerOutcome {
                    iterations,
                    error: current,
                    termination: TerminationReason::Converged,
                };
            }
        }

        InnerOutcome {
            iterations,
            error: current,
            termination: TerminationReason::MaxIterations,
        }
    }
}

fn chi_squared(factors: &[Resolved], weights: &[f64], x: &[Pose3D]) -> f64 {
    factors
        .iter()
        .zip(weights)
        .map(|(f, w)| w * f.residual(x).norm_squared())
        .sum()
}

/// Jacobian of a factor's residual with respect to one variable's local
/// perturbation, by central differences.
fn numeric_jacobian(factor: &Resolved, x: &[Pose3D], var: usize) -> Matrix6<f64> {
    let mut jacobian = Matrix6::zeros();
    for d in 0..6 {
        let mut delta = Vector6::zeros();
        delta[d] = JACOBIAN_STEP;
        let plus = factor.residual_with(x, Some((var, &x[var].retract(&delta))));
        delta[d] = -JACOBIAN_STEP;
        let minus = factor.residual_with(x, Some((var, &x[var].retract(&delta))));
        let column = (plus - minus) / (2.0 * JACOBIAN_STEP);
        jacobian.set_column(d, &column);
    }
    jacobian
}

fn build_normal_equations(
    factors: &[Resolved],
    weights: &[f64],
    x: &[Pose3D],
    dim: usize,
) -> (DMatrix<f64>, DVector<f64>) {
    let mut h = DMatrix::<f64>::zeros(dim, dim);
    let mut b = DVector::<f64>::zeros(dim);

    for (factor, &w) in factors.iter().zip(weights) {
        let residual = factor.residual(x);
        let (i, j) = factor.variables();

        let j_i = numeric_jacobian(factor, x, i);
        add_block(&mut h, i, i, &(j_i.transpose() * j_i), w);
        add_segment(&mut b, i, &(j_i.transpose() * residual), w);

        if let Some(j_var) = j {
            let j_j = numeric_jacobian(factor, x, j_var);
            add_block(&mut h, j_var, j_var, &(j_j.transpose() * j_j), w);
            let h_ij = j_i.transpose() * j_j;
            add_block(&mut h, i, j_var, &h_ij, w);
            add_block(&mut h, j_var, i, &h_ij.transpose(), w);
            add_segment(&mut b, j_var, &(j_j.transpose() * residual), w);
        }
    }

    (h, b)
}

fn add_block(h: &mut DMatrix<f64>, bi: usize, bj: usize, block: &Matrix6<f64>, w: f64) {
    for r in 0..6 {
        for c in 0..6 {
            h[(bi * 6 + r, bj * 6 + c)] += w * block[(r, c)];
        }
    }
}

fn add_segment(b: &mut DVector<f64>, bi: usize, segment: &Vector6<f64>, w: f64) {
    for r in 0..6 {
        b[bi * 6 + r] += w * segment[r];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::factor::{BetweenFactor, PriorFactor};
    use approx::assert_relative_eq;

    fn key(i: u32) -> PoseKey {
        PoseKey::new(0, i)
    }

    fn anchor() -> Factor {
        Factor::Prior(PriorFactor {
            key: key(0),
            pose: Pose3D::identity(),
            noise: NoiseModel::default(),
        })
    }

    fn between(from: u32, to: u32, measurement: Pose3D) -> Factor {
        Factor::Between(BetweenFactor::new(
            key(from),
            key(to),
            measurement,
            NoiseModel::default(),
        ))
    }

    fn chain_estimates(poses: &[Pose3D]) -> PoseEstimates {
        let mut estimates = PoseEstimates::new();
        for (i, pose) in poses.iter().enumerate() {
            estimates.insert(key(i as u32), *pose).unwrap();
        }
        estimates
    }

    #[test]
    fn test_empty_graph() {
        let optimizer = GraphOptimizer::new(OptimizerConfig::default());
        let outcome = optimizer.optimize(&[], &PoseEstimates::new());
        assert!(outcome.converged);
        assert_eq!(outcome.termination, TerminationReason::NoFactors);
    }

    #[test]
    fn test_perfect_chain_converges_immediately() {
        let optimizer = GraphOptimizer::new(OptimizerConfig::default());
        let step = Pose3D::from_translation(1.0, 0.0, 0.0);
        let estimates = chain_estimates(&[
            Pose3D::identity(),
            step,
            step.compose(&step),
        ]);
        let factors = vec![
            anchor(),
            between(0, 1, step),
            between(1, 2, step),
        ];

        let outcome = optimizer.optimize(&factors, &estimates);
        assert!(outcome.converged);
        assert!(outcome.final_error < 1e-9);
        assert_relative_eq!(
            outcome.estimates.get(&key(2)).unwrap().translation().x,
            2.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_noisy_initial_guess_recovers() {
        let optimizer = GraphOptimizer::new(OptimizerConfig::default());
        let step = Pose3D::from_translation(1.0, 0.0, 0.0);
        // Initial guesses off by up to 20 cm.
        let estimates = chain_estimates(&[
            Pose3D::identity(),
            Pose3D::from_translation(1.2, 0.1, 0.0),
            Pose3D::from_translation(1.9, -0.15, 0.05),
        ]);
        let factors = vec![anchor(), between(0, 1, step), between(1, 2, step)];

        let outcome = optimizer.optimize(&factors, &estimates);
        assert!(outcome.converged, "termination: {:?}", outcome.termination);
        assert!(outcome.final_error < outcome.initial_error);
        let p2 = outcome.estimates.get(&key(2)).unwrap().translation();
        assert_relative_eq!(p2.x, 2.0, epsilon = 1e-3);
        assert_relative_eq!(p2.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_loop_closure_distributes_error() {
        let optimizer = GraphOptimizer::new(OptimizerConfig::default());
        let step = Pose3D::from_translation(1.0, 0.0, 0.0);
        let estimates = chain_estimates(&[
            Pose3D::identity(),
            Pose3D::from_translation(1.0, 0.0, 0.0),
            Pose3D::from_translation(2.1, 0.0, 0.0),
        ]);
        let mut factors = vec![anchor(), between(0, 1, step), between(1, 2, step)];
        // Closure agrees with the odometry, pulling node 2 back to x = 2.
        factors.push(between(0, 2, Pose3D::from_translation(2.0, 0.0, 0.0)));

        let outcome = optimizer.optimize(&factors, &estimates);
        assert!(outcome.final_error <= outcome.initial_error);
        let p2 = outcome.estimates.get(&key(2)).unwrap().translation();
        assert_relative_eq!(p2.x, 2.0, epsilon = 0.01);
    }

    #[test]
    fn test_outlier_closure_is_suppressed() {
        let optimizer = GraphOptimizer::new(OptimizerConfig::default());
        let step = Pose3D::from_translation(1.0, 0.0, 0.0);
        let estimates = chain_estimates(&[
            Pose3D::identity(),
            step,
            step.compose(&step),
        ]);
        let mut factors = vec![anchor(), between(0, 1, step), between(1, 2, step)];
        // A closure that corroborates the odometry, and a wildly wrong one
        // that would drag node 2 to x = 10.
        factors.push(between(0, 2, Pose3D::from_translation(2.0, 0.0, 0.0)));
        factors.push(between(0, 2, Pose3D::from_translation(10.0, 0.0, 0.0)));

        let outcome = optimizer.optimize(&factors, &estimates);
        let p2 = outcome.estimates.get(&key(2)).unwrap().translation();
        assert!(
            (p2.x - 2.0).abs() < 0.3,
            "outlier not suppressed, node 2 at x = {}",
            p2.x
        );
    }

    #[test]
    fn test_unknown_key_factor_dropped() {
        let optimizer = GraphOptimizer::new(OptimizerConfig::default());
        let estimates = chain_estimates(&[Pose3D::identity()]);
        let factors = vec![
            anchor(),
            between(0, 7, Pose3D::from_translation(1.0, 0.0, 0.0)),
        ];
        let outcome = optimizer.optimize(&factors, &estimates);
        assert_eq!(outcome.dropped_factors, 1);
    }
}
