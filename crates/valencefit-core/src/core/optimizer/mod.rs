//! # Optimizer Module
//!
//! Constrained minimization of smooth objectives subject to equality and inequality
//! constraints, in the form consumed by the force-constant estimator.
//!
//! ## Key Components
//!
//! - [`Objective`] - Function value, gradient and optionally an exact Hessian
//! - [`ConstraintFunction`] - A single constraint: its type, value and Jacobian
//! - [`ConstrainedMinimizer`] - The solver interface
//! - [`sqp::Slsqp`] - Sequential quadratic programming, the default solver
//!
//! Equality constraints are satisfied when their value is zero, inequality constraints
//! when their value is non-negative.

pub(crate) mod qp;
pub mod sqp;

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

pub use qp::QpError;
pub use sqp::Slsqp;

/// A twice-differentiable function to be minimized.
pub trait Objective {
    /// Number of parameters the objective expects.
    fn dimension(&self) -> usize;

    fn value(&self, x: &DVector<f64>) -> f64;

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64>;

    fn value_and_gradient(&self, x: &DVector<f64>) -> (f64, DVector<f64>) {
        (self.value(x), self.gradient(x))
    }

    /// Exact Hessian at `x`, if the objective can provide one. Solvers fall back to a
    /// quasi-Newton approximation otherwise.
    fn hessian(&self, _x: &DVector<f64>) -> Option<DMatrix<f64>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    /// Satisfied when the constraint value is zero.
    Equality,
    /// Satisfied when the constraint value is non-negative.
    Inequality,
}

pub trait ConstraintFunction {
    fn constraint_type(&self) -> ConstraintType;

    fn value(&self, x: &DVector<f64>) -> f64;

    fn jacobian(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Smallest parameter count the constraint can be evaluated on, if it has one.
    ///
    /// Solvers check this before the first evaluation so that an out-of-range
    /// constraint is reported as an error instead of failing on an index.
    fn required_dimension(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeOptions {
    /// Convergence threshold on the objective change, the step length and the
    /// constraint violation.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizeStatus {
    Converged,
    MaxIterationsReached,
    LineSearchFailed,
}

impl MinimizeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, MinimizeStatus::Converged)
    }

    pub fn message(&self) -> &'static str {
        match self {
            MinimizeStatus::Converged => "Optimization terminated successfully",
            MinimizeStatus::MaxIterationsReached => "Iteration limit reached",
            MinimizeStatus::LineSearchFailed => "Positive directional derivative for linesearch",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeResult {
    /// Final iterate; the best point found when the solver stopped early.
    pub x: DVector<f64>,
    /// Objective value at `x`.
    pub fun: f64,
    pub iterations: usize,
    pub status: MinimizeStatus,
    /// Largest constraint violation at `x`.
    pub max_violation: f64,
}

#[derive(Debug, Error)]
pub enum MinimizeError {
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Objective is not finite at iteration {iteration}")]
    NonFiniteObjective { iteration: usize },

    #[error("Quadratic subproblem failed at iteration {iteration}: {source}")]
    Subproblem {
        iteration: usize,
        #[source]
        source: QpError,
    },
}

pub trait ConstrainedMinimizer {
    /// Minimizes `objective` from `x0` subject to `constraints`.
    ///
    /// Running out of iterations or failing a line search is reported through
    /// [`MinimizeResult::status`], not as an error.
    fn minimize<O, C>(
        &self,
        objective: &O,
        x0: &DVector<f64>,
        constraints: &[C],
        options: &MinimizeOptions,
    ) -> Result<MinimizeResult, MinimizeError>
    where
        O: Objective + ?Sized,
        C: ConstraintFunction;
}

pub(crate) fn constraint_violation(constraint_type: ConstraintType, value: f64) -> f64 {
    match constraint_type {
        ConstraintType::Equality => value.abs(),
        ConstraintType::Inequality => (-value).max(0.0),
    }
}
