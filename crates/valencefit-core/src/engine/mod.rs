//! # Engine Module
//!
//! Run-time settings and the error type shared by every fitting workflow.
//!
//! ## Overview
//!
//! The [`core`](crate::core) layer knows how to build a cost function, a constraint set
//! and how to minimize one subject to the other. This layer decides *how* a particular
//! fit is run: which tolerance and iteration budget the minimizer gets, how wide the
//! dihedral bounds are, and whether a fit that stops early counts as a failure.
//!
//! - **Configuration** ([`config`]) - [`config::EstimatorConfig`], its builder and TOML
//!   loading
//! - **Error Handling** ([`error`]) - [`error::EngineError`], aggregating the errors of
//!   every layer below

pub mod config;
pub mod error;
