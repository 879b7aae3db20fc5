//! # valencefit
//!
//! Force-constant estimation for valence force fields by constrained least-squares
//! fitting to ab initio Hessians.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`ReferenceSystem`,
//!   `ValenceModel`), the quadratic cost function and its constraints, and a general
//!   constrained minimizer. Nothing here knows about run-time settings.
//!
//! - **[`engine`]: Run-time Settings.** The estimator configuration with its TOML
//!   loader, and the error type that aggregates the failures of every lower layer.
//!
//! - **[`workflows`]: The Public API.** The `Estimator`, which ties `core` and `engine`
//!   together to run one complete fit and report its result and convergence status.
//!
//! ## Logging
//!
//! The library emits `tracing` events and spans but never installs a subscriber; that
//! is left to the application.

pub mod core;
pub mod engine;
pub mod workflows;
