use super::qp::{self, LinearConstraint};
use super::{
    ConstrainedMinimizer, ConstraintFunction, ConstraintType, MinimizeError, MinimizeOptions,
    MinimizeResult, MinimizeStatus, Objective, constraint_violation,
};
use nalgebra::{DMatrix, DVector};
use tracing::trace;

const QP_TOLERANCE: f64 = 1e-12;
const MAX_REGULARIZATION_ATTEMPTS: usize = 24;

/// Sequential least-squares-style quadratic programming.
///
/// Every iteration linearizes the constraints at the current point and solves
///
/// ```text
/// minimize    1/2 d^T B d + g^T d
/// subject to  c_eq + J_eq d  = 0
///             c_in + J_in d >= 0
/// ```
///
/// for the step `d`, then backtracks along `d` on an L1 exact-penalty merit function.
/// `B` is the objective's own Hessian when it provides one and a damped BFGS
/// approximation of the Lagrangian Hessian otherwise. With an exact Hessian, a
/// quadratic objective and linear constraints the first step lands on the solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Slsqp {
    /// Sufficient-decrease coefficient of the Armijo test.
    pub armijo: f64,
    /// Factor applied to the step length after a rejected trial point.
    pub backtrack_factor: f64,
    pub max_line_search_steps: usize,
}

impl Default for Slsqp {
    fn default() -> Self {
        Self {
            armijo: 1e-4,
            backtrack_factor: 0.5,
            max_line_search_steps: 30,
        }
    }
}

impl Slsqp {
    pub fn new() -> Self {
        Self::default()
    }
}

struct Linearization {
    values: Vec<f64>,
    jacobians: Vec<DVector<f64>>,
}

impl Linearization {
    fn at<C: ConstraintFunction>(constraints: &[C], x: &DVector<f64>) -> Self {
        Self {
            values: constraints.iter().map(|c| c.value(x)).collect(),
            jacobians: constraints.iter().map(|c| c.jacobian(x)).collect(),
        }
    }

    /// Equalities first, as the QP solver processes them in order.
    fn subproblem_constraints<C: ConstraintFunction>(
        &self,
        constraints: &[C],
    ) -> (Vec<LinearConstraint>, Vec<usize>) {
        let mut order: Vec<usize> = (0..constraints.len()).collect();
        order.sort_by_key(|&i| constraints[i].constraint_type() != ConstraintType::Equality);
        let linear = order
            .iter()
            .map(|&i| LinearConstraint {
                normal: self.jacobians[i].clone(),
                rhs: -self.values[i],
                equality: constraints[i].constraint_type() == ConstraintType::Equality,
            })
            .collect();
        (linear, order)
    }

    fn lagrangian_gradient(&self, gradient: &DVector<f64>, multipliers: &[f64]) -> DVector<f64> {
        let mut result = gradient.clone();
        for (jacobian, &lambda) in self.jacobians.iter().zip(multipliers) {
            result -= jacobian * lambda;
        }
        result
    }
}

fn max_violation<C: ConstraintFunction>(constraints: &[C], x: &DVector<f64>) -> f64 {
    constraints
        .iter()
        .map(|c| constraint_violation(c.constraint_type(), c.value(x)))
        .fold(0.0, f64::max)
}

fn weighted_violation<C: ConstraintFunction>(
    constraints: &[C],
    penalties: &[f64],
    x: &DVector<f64>,
) -> f64 {
    constraints
        .iter()
        .zip(penalties)
        .map(|(c, mu)| mu * constraint_violation(c.constraint_type(), c.value(x)))
        .sum()
}

/// Shifts the diagonal until the matrix admits a Cholesky factorization.
fn regularize(hessian: DMatrix<f64>) -> DMatrix<f64> {
    if hessian.clone().cholesky().is_some() {
        return hessian;
    }
    let n = hessian.nrows();
    let scale = hessian.diagonal().amax().max(1.0);
    let mut shift = 1e-12 * scale;
    for _ in 0..MAX_REGULARIZATION_ATTEMPTS {
        let shifted = &hessian + DMatrix::identity(n, n) * shift;
        if shifted.clone().cholesky().is_some() {
            return shifted;
        }
        shift *= 10.0;
    }
    DMatrix::identity(n, n) * scale
}

/// Powell-damped BFGS update, keeping the approximation positive definite.
fn bfgs_update(b: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    let bs = &*b * s;
    let sbs = s.dot(&bs);
    if sbs <= f64::EPSILON {
        return;
    }
    let sy = s.dot(y);
    let y = if sy < 0.2 * sbs {
        let theta = 0.8 * sbs / (sbs - sy);
        y * theta + &bs * (1.0 - theta)
    } else {
        y.clone()
    };
    let sy = s.dot(&y);
    if sy <= f64::EPSILON {
        return;
    }
    *b += &y * y.transpose() / sy - &bs * bs.transpose() / sbs;
}

impl ConstrainedMinimizer for Slsqp {
    fn minimize<O, C>(
        &self,
        objective: &O,
        x0: &DVector<f64>,
        constraints: &[C],
        options: &MinimizeOptions,
    ) -> Result<MinimizeResult, MinimizeError>
    where
        O: Objective + ?Sized,
        C: ConstraintFunction,
    {
        let n = objective.dimension();
        if x0.len() != n {
            return Err(MinimizeError::DimensionMismatch {
                context: "initial point",
                expected: n,
                found: x0.len(),
            });
        }
        for constraint in constraints {
            if let Some(required) = constraint.required_dimension().filter(|&r| r > n) {
                return Err(MinimizeError::DimensionMismatch {
                    context: "constraint index",
                    expected: n,
                    found: required,
                });
            }
            let found = constraint.jacobian(x0).len();
            if found != n {
                return Err(MinimizeError::DimensionMismatch {
                    context: "constraint jacobian",
                    expected: n,
                    found,
                });
            }
        }

        let tolerance = options.tolerance;
        let mut x = x0.clone();
        let (mut f, mut g) = objective.value_and_gradient(&x);
        if !f.is_finite() {
            return Err(MinimizeError::NonFiniteObjective { iteration: 0 });
        }

        let finish = |x: DVector<f64>, fun: f64, iterations: usize, status: MinimizeStatus| {
            let max_violation = max_violation(constraints, &x);
            MinimizeResult {
                x,
                fun,
                iterations,
                status,
                max_violation,
            }
        };

        let mut quasi_newton = DMatrix::identity(n, n);
        let mut penalties = vec![0.0; constraints.len()];

        for iteration in 1..=options.max_iterations {
            let linearization = Linearization::at(constraints, &x);
            let exact_hessian = objective.hessian(&x);
            let hessian = regularize(exact_hessian.clone().unwrap_or_else(|| quasi_newton.clone()));

            let (subproblem, order) = linearization.subproblem_constraints(constraints);
            let solution = qp::solve(&hessian, &g, &subproblem, QP_TOLERANCE)
                .map_err(|source| MinimizeError::Subproblem { iteration, source })?;
            let step = solution.x;
            let mut multipliers = vec![0.0; constraints.len()];
            for (position, &original) in order.iter().enumerate() {
                multipliers[original] = solution.multipliers[position];
            }

            let violation = max_violation(constraints, &x);
            if step.amax() <= tolerance && violation <= tolerance {
                return Ok(finish(x, f, iteration, MinimizeStatus::Converged));
            }

            for (mu, lambda) in penalties.iter_mut().zip(&multipliers) {
                *mu = lambda.abs().max(0.5 * (*mu + lambda.abs()));
            }
            let penalty = weighted_violation(constraints, &penalties, &x);
            let merit = f + penalty;
            let slope = g.dot(&step) - penalty;
            if slope > 0.0 {
                return Ok(finish(x, f, iteration, MinimizeStatus::LineSearchFailed));
            }

            let mut alpha = 1.0;
            let mut accepted = None;
            for _ in 0..self.max_line_search_steps {
                let trial = &x + &step * alpha;
                let f_trial = objective.value(&trial);
                if f_trial.is_finite() {
                    let merit_trial =
                        f_trial + weighted_violation(constraints, &penalties, &trial);
                    if merit_trial <= merit + self.armijo * alpha * slope {
                        accepted = Some((trial, f_trial));
                        break;
                    }
                }
                alpha *= self.backtrack_factor;
            }
            let Some((x_next, f_next)) = accepted else {
                return Ok(finish(x, f, iteration, MinimizeStatus::LineSearchFailed));
            };

            let g_next = objective.gradient(&x_next);
            if exact_hessian.is_none() {
                let next_linearization = Linearization::at(constraints, &x_next);
                let s = &x_next - &x;
                let y = next_linearization.lagrangian_gradient(&g_next, &multipliers)
                    - linearization.lagrangian_gradient(&g, &multipliers);
                bfgs_update(&mut quasi_newton, &s, &y);
            }

            let change = (f - f_next).abs();
            let step_length = (&step * alpha).amax();
            trace!(iteration, f = f_next, alpha, step_length, "SQP step accepted.");

            x = x_next;
            f = f_next;
            g = g_next;

            if max_violation(constraints, &x) <= tolerance
                && (change <= tolerance || step_length <= tolerance)
            {
                return Ok(finish(x, f, iteration, MinimizeStatus::Converged));
            }
        }

        Ok(finish(
            x,
            f,
            options.max_iterations,
            MinimizeStatus::MaxIterationsReached,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic {
        a: DMatrix<f64>,
        b: DVector<f64>,
        exact_hessian: bool,
    }

    impl Objective for Quadratic {
        fn dimension(&self) -> usize {
            self.b.len()
        }

        fn value(&self, x: &DVector<f64>) -> f64 {
            0.5 * x.dot(&(&self.a * x)) - self.b.dot(x)
        }

        fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            &self.a * x - &self.b
        }

        fn hessian(&self, _x: &DVector<f64>) -> Option<DMatrix<f64>> {
            self.exact_hessian.then(|| self.a.clone())
        }
    }

    /// `(x - 1)^4 + (y + 2)^2`, smooth but not quadratic.
    struct Quartic;

    impl Objective for Quartic {
        fn dimension(&self) -> usize {
            2
        }

        fn value(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 1.0).powi(4) + (x[1] + 2.0).powi(2)
        }

        fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![4.0 * (x[0] - 1.0).powi(3), 2.0 * (x[1] + 2.0)])
        }
    }

    /// `x[index] >= bound` or `x[index] == bound`.
    struct Bound {
        index: usize,
        bound: f64,
        constraint_type: ConstraintType,
    }

    impl ConstraintFunction for Bound {
        fn constraint_type(&self) -> ConstraintType {
            self.constraint_type
        }

        fn value(&self, x: &DVector<f64>) -> f64 {
            x[self.index] - self.bound
        }

        fn jacobian(&self, x: &DVector<f64>) -> DVector<f64> {
            let mut jac = DVector::zeros(x.len());
            jac[self.index] = 1.0;
            jac
        }
    }

    /// `1 - x^T x >= 0`, a nonlinear constraint.
    struct UnitDisk;

    impl ConstraintFunction for UnitDisk {
        fn constraint_type(&self) -> ConstraintType {
            ConstraintType::Inequality
        }

        fn value(&self, x: &DVector<f64>) -> f64 {
            1.0 - x.norm_squared()
        }

        fn jacobian(&self, x: &DVector<f64>) -> DVector<f64> {
            x * -2.0
        }
    }

    fn quadratic(exact_hessian: bool) -> Quadratic {
        Quadratic {
            a: DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]),
            b: DVector::from_vec(vec![1.0, -4.0]),
            exact_hessian,
        }
    }

    fn options() -> MinimizeOptions {
        MinimizeOptions {
            tolerance: 1e-9,
            max_iterations: 100,
        }
    }

    #[test]
    fn unconstrained_quadratic_with_exact_hessian_converges_to_solution() {
        let objective = quadratic(true);
        let x0 = DVector::from_vec(vec![5.0, 5.0]);
        let result = Slsqp::new()
            .minimize(&objective, &x0, &[] as &[Bound], &options())
            .unwrap();
        let expected = objective.a.clone().cholesky().unwrap().solve(&objective.b);
        assert_eq!(result.status, MinimizeStatus::Converged);
        assert!((result.x - expected).amax() < 1e-9);
        assert!(result.iterations <= 3);
    }

    #[test]
    fn unconstrained_quadratic_with_bfgs_converges_to_solution() {
        let objective = quadratic(false);
        let x0 = DVector::from_vec(vec![5.0, 5.0]);
        let result = Slsqp::new()
            .minimize(&objective, &x0, &[] as &[Bound], &options())
            .unwrap();
        let expected = objective.a.clone().cholesky().unwrap().solve(&objective.b);
        assert!(result.status.is_success());
        assert!((result.x - expected).amax() < 1e-5);
    }

    #[test]
    fn active_lower_bound_is_respected() {
        // Unconstrained minimum has x1 < 0.
        let objective = quadratic(true);
        let constraints = [
            Bound {
                index: 0,
                bound: 0.0,
                constraint_type: ConstraintType::Inequality,
            },
            Bound {
                index: 1,
                bound: 0.0,
                constraint_type: ConstraintType::Inequality,
            },
        ];
        let x0 = DVector::from_vec(vec![1.0, 1.0]);
        let result = Slsqp::new()
            .minimize(&objective, &x0, &constraints, &options())
            .unwrap();
        assert_eq!(result.status, MinimizeStatus::Converged);
        assert!(result.x[1].abs() < 1e-9);
        assert!((result.x[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!(result.max_violation <= 1e-9);
    }

    #[test]
    fn equality_constraint_pins_parameter() {
        let objective = quadratic(true);
        let constraints = [Bound {
            index: 0,
            bound: 2.0,
            constraint_type: ConstraintType::Equality,
        }];
        let x0 = DVector::from_vec(vec![2.0, 0.0]);
        let result = Slsqp::new()
            .minimize(&objective, &x0, &constraints, &options())
            .unwrap();
        assert!((result.x[0] - 2.0).abs() < 1e-12);
        // With x0 fixed at 2: 2 x1 + 2 = -4.
        assert!((result.x[1] + 3.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible_start_is_pulled_onto_feasible_region() {
        let objective = quadratic(true);
        let constraints = [Bound {
            index: 1,
            bound: 1.0,
            constraint_type: ConstraintType::Inequality,
        }];
        let x0 = DVector::from_vec(vec![0.0, -10.0]);
        let result = Slsqp::new()
            .minimize(&objective, &x0, &constraints, &options())
            .unwrap();
        assert!(result.status.is_success());
        assert!((result.x[1] - 1.0).abs() < 1e-9);
        assert!((result.x[0]).abs() < 1e-9);
    }

    #[test]
    fn non_quadratic_objective_with_nonlinear_constraint_converges() {
        let constraints = [UnitDisk];
        let x0 = DVector::from_vec(vec![0.0, 0.0]);
        let result = Slsqp::new()
            .minimize(
                &Quartic,
                &x0,
                &constraints,
                &MinimizeOptions {
                    tolerance: 1e-10,
                    max_iterations: 200,
                },
            )
            .unwrap();
        assert!(result.max_violation < 1e-6);
        assert!((result.x.norm() - 1.0).abs() < 1e-4);
        assert!(result.x[1] < -0.8);
    }

    #[test]
    fn iteration_limit_is_reported_as_status() {
        let x0 = DVector::from_vec(vec![-3.0, 4.0]);
        let result = Slsqp::new()
            .minimize(
                &Quartic,
                &x0,
                &[] as &[Bound],
                &MinimizeOptions {
                    tolerance: 1e-14,
                    max_iterations: 1,
                },
            )
            .unwrap();
        assert_eq!(result.status, MinimizeStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 1);
        assert!(result.fun < Quartic.value(&x0));
    }

    #[test]
    fn mismatched_initial_point_fails_fast() {
        let objective = quadratic(true);
        let x0 = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let result = Slsqp::new().minimize(&objective, &x0, &[] as &[Bound], &options());
        assert!(matches!(
            result,
            Err(MinimizeError::DimensionMismatch {
                context: "initial point",
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn contradictory_constraints_surface_subproblem_error() {
        let objective = quadratic(true);
        let constraints = [
            Bound {
                index: 0,
                bound: 1.0,
                constraint_type: ConstraintType::Equality,
            },
            Bound {
                index: 0,
                bound: 2.0,
                constraint_type: ConstraintType::Equality,
            },
        ];
        let x0 = DVector::zeros(2);
        let result = Slsqp::new().minimize(&objective, &x0, &constraints, &options());
        assert!(matches!(result, Err(MinimizeError::Subproblem { .. })));
    }

    #[test]
    fn bfgs_update_keeps_matrix_positive_definite() {
        let mut b = DMatrix::identity(2, 2);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        let y = DVector::from_vec(vec![-1.0, 0.5]);
        bfgs_update(&mut b, &s, &y);
        assert!(b.clone().cholesky().is_some());
        assert!((&b - b.transpose()).amax() < 1e-12);
    }

    #[test]
    fn regularize_shifts_singular_matrix_into_positive_definite() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let shifted = regularize(singular.clone());
        assert!(shifted.clone().cholesky().is_some());
        assert!((shifted - singular).amax() < 1e-3);
    }
}
