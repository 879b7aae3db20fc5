use super::ModelError;
use crate::core::utils::matrix::max_asymmetry;
use nalgebra::{DMatrix, Point3};
use tracing::warn;

const ASYMMETRY_WARNING_THRESHOLD: f64 = 1e-8;

/// The reference data a fit targets: a geometry and its ab initio Hessian.
///
/// The Hessian is expressed over the `3 * natoms` Cartesian degrees of freedom in the
/// order `x1, y1, z1, x2, ...`, in atomic units.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSystem {
    /// Reference geometry at which all Hessians are evaluated.
    coords: Vec<Point3<f64>>,
    /// Ab initio Cartesian Hessian at `coords`.
    hessian: DMatrix<f64>,
}

impl ReferenceSystem {
    /// Creates a reference system after checking the Hessian shape against the geometry.
    ///
    /// # Arguments
    ///
    /// * `coords` - The reference geometry, one point per atom.
    /// * `hessian` - The ab initio Hessian at that geometry.
    ///
    /// # Return
    ///
    /// Returns the system, or [`ModelError::HessianShape`] if the Hessian is not
    /// `3 * natoms` square. A Hessian that is square but noticeably asymmetric is
    /// accepted with a warning.
    pub fn new(coords: Vec<Point3<f64>>, hessian: DMatrix<f64>) -> Result<Self, ModelError> {
        let ndof = 3 * coords.len();
        if hessian.shape() != (ndof, ndof) {
            return Err(ModelError::HessianShape {
                ndof,
                rows: hessian.nrows(),
                cols: hessian.ncols(),
            });
        }
        if let Some(asymmetry) = max_asymmetry(&hessian) {
            if asymmetry > ASYMMETRY_WARNING_THRESHOLD {
                warn!(asymmetry, "Reference Hessian is not symmetric.");
            }
        }
        Ok(Self { coords, hessian })
    }

    /// Returns the number of atoms.
    #[inline]
    pub fn natoms(&self) -> usize {
        self.coords.len()
    }

    /// Returns the number of Cartesian degrees of freedom, `3 * natoms`.
    #[inline]
    pub fn ndof(&self) -> usize {
        3 * self.coords.len()
    }

    pub fn coords(&self) -> &[Point3<f64>] {
        &self.coords
    }

    pub fn hessian(&self) -> &DMatrix<f64> {
        &self.hessian
    }
}
