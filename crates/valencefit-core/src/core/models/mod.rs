//! # Core Models Module
//!
//! This module contains the data structures a force-constant fit reads from: the
//! reference system, the valence terms being fitted and the non-valence contributions
//! subtracted from the reference.
//!
//! ## Key Components
//!
//! - [`system`] - Reference geometry and ab initio Hessian
//! - [`term`] - A single force-constant parameter and the Hessians that share it
//! - [`valence`] - The collection of terms in canonical index order
//! - [`hessian`] - Traits through which Hessians are obtained from other codes
//!
//! ## Usage
//!
//! ```ignore
//! use valencefit::core::models::{ForceFieldModel, hessian::PrecomputedHessian};
//! use valencefit::core::models::{term::ValenceTerm, valence::ValenceModel};
//!
//! let bond = ValenceTerm::new("bond/C.H", 0.3, 2.05)?
//!     .with_contribution(PrecomputedHessian::new(unit_bond_hessian));
//! let valence = ValenceModel::from_terms([bond])?;
//! let model = ForceFieldModel::new(valence, PrecomputedHessian::new(ei_hessian));
//! ```

pub mod hessian;
pub mod system;
pub mod term;
pub mod valence;

use hessian::{ElectrostaticHessian, NoElectrostatics};
use thiserror::Error;
use valence::ValenceModel;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid term name '{0}': expected '<kind>/<instance-id>'")]
    InvalidTermName(String),

    #[error("Term '{0}' is defined more than once")]
    DuplicateTerm(String),

    #[error("Term '{term}' has a non-finite force constant or rest value")]
    NonFiniteValue { term: String },

    #[error("Reference Hessian has shape {rows}x{cols}, expected {ndof}x{ndof}")]
    HessianShape {
        ndof: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Expected {expected} force constants, got {found}")]
    ParameterCount { expected: usize, found: usize },
}

/// A force field split into the part being fitted and the part held fixed.
pub struct ForceFieldModel {
    pub electrostatics: Box<dyn ElectrostaticHessian>,
    pub valence: ValenceModel,
}

impl ForceFieldModel {
    pub fn new(valence: ValenceModel, electrostatics: impl ElectrostaticHessian + 'static) -> Self {
        Self {
            electrostatics: Box::new(electrostatics),
            valence,
        }
    }

    pub fn without_electrostatics(valence: ValenceModel) -> Self {
        Self::new(valence, NoElectrostatics)
    }
}

impl std::fmt::Debug for ForceFieldModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceFieldModel")
            .field("valence", &self.valence)
            .finish_non_exhaustive()
    }
}
