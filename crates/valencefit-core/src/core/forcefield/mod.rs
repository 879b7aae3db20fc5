//! # Force Field Module
//!
//! The least-squares problem behind a force-constant fit: how far the valence force
//! field's Hessian is from the reference, and which values the force constants may take.
//!
//! ## Overview
//!
//! Every valence term contributes a Cartesian Hessian that is linear in its force
//! constant. The squared Frobenius distance between the summed force-field Hessian and
//! the reference is therefore a quadratic function of the force constants, which
//! [`cost::QuadraticCostModel`] stores as its coefficients `A`, `B` and `C`.
//!
//! Physically meaningless solutions are excluded by a [`constraints::ConstraintSet`]:
//!
//! - **Fixed kinds** are pinned to their initial value
//! - **Dihedral terms** stay within `[0, 200]` kJ/mol
//! - **All other terms** stay non-negative
//!
//! ## Key Components
//!
//! - [`cost`] - Quadratic cost function, its gradient and its exact Hessian
//! - [`constraints`] - Constraint records and the rules that derive them from term names
//!
//! ## Usage
//!
//! ```ignore
//! use valencefit::core::forcefield::constraints::{BoundRules, ConstraintSet};
//! use valencefit::core::forcefield::cost::QuadraticCostModel;
//!
//! let mut cost = QuadraticCostModel::new(model.valence.nterms());
//! cost.refresh(&system, &model)?;
//! let names: Vec<&str> = model.valence.names().collect();
//! let constraints = ConstraintSet::build(&names, None, &kinit, &BoundRules::default())?;
//! ```

pub mod constraints;
pub mod cost;
