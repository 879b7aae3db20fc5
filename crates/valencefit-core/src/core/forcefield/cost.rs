use crate::core::models::ForceFieldModel;
use crate::core::models::system::ReferenceSystem;
use crate::core::optimizer::Objective;
use crate::core::utils::matrix::frobenius_inner;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, PartialEq)]
pub enum CostError {
    #[error("Parameter vector has length {found}, but the cost function has {expected} terms")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Hessian of {origin} has shape {rows}x{cols}, expected {ndof}x{ndof}")]
    HessianShape {
        origin: String,
        ndof: usize,
        rows: usize,
        cols: usize,
    },
}

/// Least-squares deviation between force-field and ab initio Hessians, written as a
/// quadratic form in the force constants:
///
/// ```text
/// chi2(k) = 1/2 k^T A k - B^T k + 1/2 C
/// ```
///
/// With `H_i` the Cartesian Hessian of term `i` at unit force constant and `R` the
/// residual Hessian (ab initio minus electrostatics), `A[i][j] = <H_i, H_j>`,
/// `B[i] = <H_i, R>` and `C = <R, R>`, where `<.,.>` is the Frobenius inner product.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticCostModel {
    a: DMatrix<f64>,
    b: DVector<f64>,
    c: f64,
}

impl QuadraticCostModel {
    pub fn new(nterms: usize) -> Self {
        Self {
            a: DMatrix::zeros(nterms, nterms),
            b: DVector::zeros(nterms),
            c: 0.0,
        }
    }

    /// Builds a model directly from its coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::DimensionMismatch`] if `a` is not square or its size differs
    /// from the length of `b`.
    pub fn from_coefficients(a: DMatrix<f64>, b: DVector<f64>, c: f64) -> Result<Self, CostError> {
        if !a.is_square() || a.nrows() != b.len() {
            return Err(CostError::DimensionMismatch {
                expected: b.len(),
                found: a.ncols(),
            });
        }
        Ok(Self { a, b, c })
    }

    /// Recomputes `A`, `B` and `C` from the reference data and the current model.
    ///
    /// Nothing from a previous refresh survives; the coefficients are rebuilt from
    /// scratch. Only the lower triangle of `A` is evaluated, the upper triangle is
    /// mirrored from it so `A` is exactly symmetric.
    #[instrument(skip_all, name = "cost_refresh")]
    pub fn refresh(
        &mut self,
        system: &ReferenceSystem,
        model: &ForceFieldModel,
    ) -> Result<(), CostError> {
        let ndof = system.ndof();
        let coords = system.coords();
        let terms = model.valence.terms();
        let nterms = terms.len();

        check_shape("the reference system", system.hessian(), ndof)?;
        let electrostatic = model.electrostatics.calc_hessian(coords);
        check_shape("the electrostatic contribution", &electrostatic, ndof)?;
        let residual = system.hessian() - electrostatic;

        let mut unit_hessians = Vec::with_capacity(nterms);
        for term in terms {
            let mut h = DMatrix::zeros(ndof, ndof);
            for contribution in term.contributions() {
                let part = contribution.calc_hessian(coords, 1.0);
                check_shape(term.name(), &part, ndof)?;
                h += part;
            }
            unit_hessians.push(h);
        }

        self.a = DMatrix::zeros(nterms, nterms);
        self.b = DVector::zeros(nterms);
        for (i, h_i) in unit_hessians.iter().enumerate() {
            self.b[i] = frobenius_inner(h_i, &residual);
            for (j, h_j) in unit_hessians.iter().enumerate().take(i + 1) {
                let a_ij = frobenius_inner(h_i, h_j);
                self.a[(i, j)] = a_ij;
                self.a[(j, i)] = a_ij;
            }
        }
        self.c = frobenius_inner(&residual, &residual);

        debug!(nterms, ndof, c = self.c, "Least-squares coefficients refreshed.");
        Ok(())
    }

    #[inline]
    pub fn nterms(&self) -> usize {
        self.b.len()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Value of the cost function at `k`.
    pub fn chi2(&self, k: &DVector<f64>) -> Result<f64, CostError> {
        self.check_dimension(k)?;
        Ok(self.evaluate(k).0)
    }

    /// Value and gradient `A k - B` of the cost function at `k`.
    pub fn chi2_with_gradient(&self, k: &DVector<f64>) -> Result<(f64, DVector<f64>), CostError> {
        self.check_dimension(k)?;
        Ok(self.evaluate(k))
    }

    /// Minimizer `A^-1 B` of the cost function without any constraints, or `None` when
    /// `A` is not positive definite.
    pub fn unconstrained_minimum(&self) -> Option<DVector<f64>> {
        self.a.clone().cholesky().map(|cholesky| cholesky.solve(&self.b))
    }

    fn check_dimension(&self, k: &DVector<f64>) -> Result<(), CostError> {
        if k.len() != self.nterms() {
            return Err(CostError::DimensionMismatch {
                expected: self.nterms(),
                found: k.len(),
            });
        }
        Ok(())
    }

    fn evaluate(&self, k: &DVector<f64>) -> (f64, DVector<f64>) {
        let ak = &self.a * k;
        let value = 0.5 * k.dot(&ak) - self.b.dot(k) + 0.5 * self.c;
        (value, ak - &self.b)
    }
}

impl Objective for QuadraticCostModel {
    fn dimension(&self) -> usize {
        self.nterms()
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        self.evaluate(x).0
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.a * x - &self.b
    }

    fn value_and_gradient(&self, x: &DVector<f64>) -> (f64, DVector<f64>) {
        self.evaluate(x)
    }

    fn hessian(&self, _x: &DVector<f64>) -> Option<DMatrix<f64>> {
        Some(self.a.clone())
    }
}

fn check_shape(origin: &str, h: &DMatrix<f64>, ndof: usize) -> Result<(), CostError> {
    if h.shape() != (ndof, ndof) {
        return Err(CostError::HessianShape {
            origin: origin.to_string(),
            ndof,
            rows: h.nrows(),
            cols: h.ncols(),
        });
    }
    Ok(())
}
