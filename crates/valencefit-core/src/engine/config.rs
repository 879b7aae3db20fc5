use crate::core::forcefield::constraints::BoundRules;
use crate::core::optimizer::MinimizeOptions;
use crate::core::units::KJMOL;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Settings of a force-constant fit.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// tolerance = 1e-9
/// max_iterations = 100
/// dihedral_upper_kjmol = 200.0
/// require_convergence = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Convergence tolerance handed to the constrained minimizer.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Upper bound on dihedral force constants, in kJ/mol.
    pub dihedral_upper_kjmol: f64,
    /// Treat a fit that did not converge as an error instead of returning it.
    pub require_convergence: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            max_iterations: 100,
            dihedral_upper_kjmol: 200.0,
            require_convergence: false,
        }
    }
}

impl EstimatorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "tolerance",
                reason: format!("must be a positive number, got {}", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.dihedral_upper_kjmol.is_finite() && self.dihedral_upper_kjmol > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "dihedral_upper_kjmol",
                reason: format!(
                    "must be a positive number, got {}",
                    self.dihedral_upper_kjmol
                ),
            });
        }
        Ok(())
    }

    pub fn minimize_options(&self) -> MinimizeOptions {
        MinimizeOptions {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }

    /// Bound rules in atomic units.
    pub fn bound_rules(&self) -> BoundRules {
        BoundRules {
            dihedral_upper: self.dihedral_upper_kjmol * KJMOL,
            ..BoundRules::default()
        }
    }
}

#[derive(Default)]
pub struct EstimatorConfigBuilder {
    tolerance: Option<f64>,
    max_iterations: Option<usize>,
    dihedral_upper_kjmol: Option<f64>,
    require_convergence: Option<bool>,
}

impl EstimatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn dihedral_upper_kjmol(mut self, bound: f64) -> Self {
        self.dihedral_upper_kjmol = Some(bound);
        self
    }
    pub fn require_convergence(mut self, require: bool) -> Self {
        self.require_convergence = Some(require);
        self
    }

    pub fn build(self) -> Result<EstimatorConfig, ConfigError> {
        let defaults = EstimatorConfig::default();
        let config = EstimatorConfig {
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            dihedral_upper_kjmol: self
                .dihedral_upper_kjmol
                .unwrap_or(defaults.dihedral_upper_kjmol),
            require_convergence: self
                .require_convergence
                .unwrap_or(defaults.require_convergence),
        };
        config.validate()?;
        Ok(config)
    }
}
