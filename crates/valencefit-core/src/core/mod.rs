//! # Core Module
//!
//! The stateless foundation of the library: data models, the least-squares cost and its
//! constraints, the constrained minimizer, and the small utilities they share.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Reference system, valence terms and Hessian providers
//! - **Cost and Constraints** ([`forcefield`]) - The quadratic fit objective and the
//!   bounds on force constants
//! - **Minimization** ([`optimizer`]) - Sequential quadratic programming with a dual
//!   active-set subproblem solver
//! - **Units** ([`units`]) - Conversion factors into atomic units
//! - **Utilities** ([`utils`]) - Term-name parsing and matrix helpers
//!
//! All quantities are in atomic units internally: energies in hartree, lengths in
//! bohr, force constants in the matching combinations.

pub mod forcefield;
pub mod models;
pub mod optimizer;
pub mod units;
pub mod utils;
