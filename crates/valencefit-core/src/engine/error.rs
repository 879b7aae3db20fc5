use thiserror::Error;

use super::config::ConfigError;
use crate::core::forcefield::constraints::ConstraintError;
use crate::core::forcefield::cost::CostError;
use crate::core::models::ModelError;
use crate::core::optimizer::MinimizeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid model: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Cost function error: {source}")]
    Cost {
        #[from]
        source: CostError,
    },

    #[error("Constraint construction failed: {source}")]
    Constraints {
        #[from]
        source: ConstraintError,
    },

    #[error("Minimization failed: {source}")]
    Minimize {
        #[from]
        source: MinimizeError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Fit failed to converge after {iterations} iterations: {message}")]
    Convergence {
        iterations: usize,
        message: &'static str,
    },
}
