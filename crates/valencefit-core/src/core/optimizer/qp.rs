//! Dual active-set solver (Goldfarb-Idnani) for strictly convex quadratic programs
//!
//! ```text
//! minimize    1/2 x^T G x + c^T x
//! subject to  n_i^T x  = b_i   (equalities)
//!             n_i^T x >= b_i   (inequalities)
//! ```
//!
//! The method starts from the unconstrained minimum and adds violated constraints one
//! at a time, so no feasible starting point is needed. Projections are recomputed from
//! `G^-1` at every step rather than updated incrementally; the problems solved here
//! have one variable per force constant and stay small.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

const DEPENDENCE_EPS: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QpError {
    #[error("Quadratic term is not positive definite")]
    NotPositiveDefinite,
    #[error("Linearized constraints are inconsistent")]
    Infeasible,
    #[error("Active constraint normals are linearly dependent")]
    DegenerateActiveSet,
    #[error("Active-set iteration limit of {0} reached")]
    IterationLimit(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinearConstraint {
    pub normal: DVector<f64>,
    pub rhs: f64,
    pub equality: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QpSolution {
    pub x: DVector<f64>,
    /// One multiplier per input constraint, zero for inactive ones.
    pub multipliers: DVector<f64>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveConstraint {
    index: usize,
    /// `-1.0` when an equality entered the active set as `-n^T x >= -b`.
    sign: f64,
    multiplier: f64,
}

pub(crate) fn solve(
    g: &DMatrix<f64>,
    c: &DVector<f64>,
    constraints: &[LinearConstraint],
    tolerance: f64,
) -> Result<QpSolution, QpError> {
    let n = c.len();
    let m = constraints.len();
    let g_inv = g
        .clone()
        .cholesky()
        .ok_or(QpError::NotPositiveDefinite)?
        .inverse();

    let mut x = -(&g_inv * c);
    let mut active: Vec<ActiveConstraint> = Vec::new();
    let mut redundant = vec![false; m];
    let max_iterations = 10 * (n + m) + 50;
    let mut iterations = 0;

    while let Some((p, sign)) = select_violated(constraints, &active, &redundant, &x, tolerance) {
        let normal = &constraints[p].normal * sign;
        let rhs = constraints[p].rhs * sign;
        let unreduced_curvature = (&g_inv * &normal).dot(&normal);
        let mut added_multiplier = 0.0;

        loop {
            iterations += 1;
            if iterations > max_iterations {
                return Err(QpError::IterationLimit(max_iterations));
            }

            let slack = normal.dot(&x) - rhs;
            let (z, r) = step_directions(&g_inv, constraints, &active, &normal)?;
            let curvature = z.dot(&normal);
            let dependent = curvature <= DEPENDENCE_EPS * unreduced_curvature;

            if dependent
                && constraints[p].equality
                && slack.abs() <= threshold(&constraints[p], &x, tolerance)
            {
                redundant[p] = true;
                break;
            }

            // Dual step: the largest move keeping active inequality multipliers >= 0.
            let mut t_dual = f64::INFINITY;
            let mut blocking = None;
            for (j, entry) in active.iter().enumerate() {
                if !constraints[entry.index].equality && r[j] > DEPENDENCE_EPS {
                    let ratio = entry.multiplier / r[j];
                    if ratio < t_dual {
                        t_dual = ratio;
                        blocking = Some(j);
                    }
                }
            }

            // Primal step: the move that makes constraint p active.
            let t_primal = if dependent {
                f64::INFINITY
            } else {
                -slack / curvature
            };

            let t = t_dual.min(t_primal);
            if !t.is_finite() {
                return Err(QpError::Infeasible);
            }

            if t_primal.is_finite() {
                x += &z * t;
            }
            for (entry, r_j) in active.iter_mut().zip(r.iter()) {
                entry.multiplier -= t * r_j;
            }
            added_multiplier += t;

            if t_primal <= t_dual {
                active.push(ActiveConstraint {
                    index: p,
                    sign,
                    multiplier: added_multiplier,
                });
                break;
            }
            if let Some(j) = blocking {
                active.remove(j);
            }
        }
    }

    let mut multipliers = DVector::zeros(m);
    for entry in &active {
        multipliers[entry.index] = entry.sign * entry.multiplier;
    }
    Ok(QpSolution { x, multipliers })
}

fn threshold(constraint: &LinearConstraint, x: &DVector<f64>, tolerance: f64) -> f64 {
    tolerance * (1.0 + constraint.rhs.abs() + constraint.normal.norm() * x.amax())
}

/// Picks the next constraint to add: pending equalities first, then the most violated
/// inequality. Returns its index and the orientation under which it is violated.
fn select_violated(
    constraints: &[LinearConstraint],
    active: &[ActiveConstraint],
    redundant: &[bool],
    x: &DVector<f64>,
    tolerance: f64,
) -> Option<(usize, f64)> {
    let is_active = |i: usize| active.iter().any(|entry| entry.index == i);

    for (i, constraint) in constraints.iter().enumerate() {
        if constraint.equality && !redundant[i] && !is_active(i) {
            let slack = constraint.normal.dot(x) - constraint.rhs;
            return Some((i, if slack > 0.0 { -1.0 } else { 1.0 }));
        }
    }

    let mut worst: Option<(usize, f64)> = None;
    for (i, constraint) in constraints.iter().enumerate() {
        if constraint.equality || is_active(i) {
            continue;
        }
        let slack = constraint.normal.dot(x) - constraint.rhs;
        if slack < -threshold(constraint, x, tolerance)
            && worst.is_none_or(|(_, worst_slack)| slack < worst_slack)
        {
            worst = Some((i, slack));
        }
    }
    worst.map(|(i, _)| (i, 1.0))
}

/// Primal direction `z = H n` and dual direction `r = N* n` for the current active set,
/// with `N*` the pseudo-inverse of the active normals in the `G^-1` metric and `H` the
/// reduced inverse Hessian.
fn step_directions(
    g_inv: &DMatrix<f64>,
    constraints: &[LinearConstraint],
    active: &[ActiveConstraint],
    normal: &DVector<f64>,
) -> Result<(DVector<f64>, DVector<f64>), QpError> {
    let g_inv_normal = g_inv * normal;
    if active.is_empty() {
        return Ok((g_inv_normal, DVector::zeros(0)));
    }

    let columns: Vec<DVector<f64>> = active
        .iter()
        .map(|entry| &constraints[entry.index].normal * entry.sign)
        .collect();
    let active_normals = DMatrix::from_columns(&columns);
    let g_inv_active = g_inv * &active_normals;
    let projected = active_normals.transpose() * &g_inv_active;
    let r = projected
        .cholesky()
        .ok_or(QpError::DegenerateActiveSet)?
        .solve(&(g_inv_active.transpose() * normal));
    let z = g_inv_normal - g_inv_active * &r;
    Ok((z, r))
}
