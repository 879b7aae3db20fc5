//! # Workflows Module
//!
//! High-level entry points that run a complete fit from reference data to optimized
//! force constants.
//!
//! ## Overview
//!
//! A workflow ties the [`core`](crate::core) building blocks together in the right
//! order. It collects the initial guess, derives the constraints from the term names,
//! rebuilds the cost function from the reference Hessian, runs the minimizer and reports
//! the outcome, including whether the minimizer converged.
//!
//! - **Estimation Workflow** ([`estimate`]) - Constrained least-squares fit of all force
//!   constants of a valence model

pub mod estimate;
