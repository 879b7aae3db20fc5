use nalgebra::{DMatrix, Point3};

/// Cartesian Hessian of one valence interaction, linear in its force constant.
///
/// Implementations evaluate the second derivatives of the term energy with respect to
/// the `3 * natoms` Cartesian coordinates at the given geometry. The returned matrix
/// must be `3 * natoms` square and must scale linearly with `k`; the quadratic cost
/// relies on that linearity.
pub trait TermHessian: Send + Sync {
    fn calc_hessian(&self, coords: &[Point3<f64>], k: f64) -> DMatrix<f64>;
}

/// Cartesian Hessian of the electrostatic energy at a geometry.
pub trait ElectrostaticHessian: Send + Sync {
    fn calc_hessian(&self, coords: &[Point3<f64>]) -> DMatrix<f64>;
}

impl<F> TermHessian for F
where
    F: Fn(&[Point3<f64>], f64) -> DMatrix<f64> + Send + Sync,
{
    fn calc_hessian(&self, coords: &[Point3<f64>], k: f64) -> DMatrix<f64> {
        self(coords, k)
    }
}

/// A Hessian evaluated once elsewhere and stored for the reference geometry.
///
/// As a term contribution it holds the unit-force-constant Hessian and scales it by
/// `k`; as an electrostatic contribution it is returned unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedHessian {
    matrix: DMatrix<f64>,
}

impl PrecomputedHessian {
    pub fn new(matrix: DMatrix<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

impl TermHessian for PrecomputedHessian {
    fn calc_hessian(&self, _coords: &[Point3<f64>], k: f64) -> DMatrix<f64> {
        &self.matrix * k
    }
}

impl ElectrostaticHessian for PrecomputedHessian {
    fn calc_hessian(&self, _coords: &[Point3<f64>]) -> DMatrix<f64> {
        self.matrix.clone()
    }
}

/// Electrostatics switched off: a zero Hessian sized from the geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElectrostatics;

impl ElectrostaticHessian for NoElectrostatics {
    fn calc_hessian(&self, coords: &[Point3<f64>]) -> DMatrix<f64> {
        let ndof = 3 * coords.len();
        DMatrix::zeros(ndof, ndof)
    }
}
