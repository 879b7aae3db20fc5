use crate::core::forcefield::constraints::ConstraintSet;
use crate::core::forcefield::cost::{CostError, QuadraticCostModel};
use crate::core::models::ForceFieldModel;
use crate::core::models::system::ReferenceSystem;
use crate::core::models::valence::ValenceModel;
use crate::core::optimizer::{ConstrainedMinimizer, ConstraintType, MinimizeStatus, Slsqp};
use crate::engine::config::EstimatorConfig;
use crate::engine::error::EngineError;
use nalgebra::DVector;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Optimized force constants in canonical term order.
    pub force_constants: DVector<f64>,
    /// Cost at `force_constants`.
    pub chi2: f64,
    /// Cost at the initial guess.
    pub initial_chi2: f64,
    pub iterations: usize,
    pub status: MinimizeStatus,
    /// Largest constraint violation at `force_constants`.
    pub max_violation: f64,
}

impl FitResult {
    pub fn converged(&self) -> bool {
        self.status.is_success()
    }

    /// Writes the fitted force constants into `valence`.
    pub fn apply_to(&self, valence: &mut ValenceModel) -> Result<(), EngineError> {
        valence.set_fcs(&self.force_constants)?;
        Ok(())
    }
}

/// Fits the force constants of a valence model to a reference Hessian.
///
/// The estimator borrows the reference data and the model; it never writes the fitted
/// values back. Apply them with [`ValenceModel::set_fcs`] when wanted.
///
/// [`ValenceModel::set_fcs`]: crate::core::models::valence::ValenceModel::set_fcs
pub struct Estimator<'a, M = Slsqp> {
    system: &'a ReferenceSystem,
    model: &'a ForceFieldModel,
    config: EstimatorConfig,
    minimizer: M,
    cost: QuadraticCostModel,
}

impl<'a> Estimator<'a, Slsqp> {
    pub fn new(system: &'a ReferenceSystem, model: &'a ForceFieldModel) -> Self {
        Self {
            system,
            model,
            config: EstimatorConfig::default(),
            minimizer: Slsqp::default(),
            cost: QuadraticCostModel::new(model.valence.nterms()),
        }
    }
}

impl<'a, M: ConstrainedMinimizer> Estimator<'a, M> {
    pub fn with_config(mut self, config: EstimatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_minimizer<N: ConstrainedMinimizer>(self, minimizer: N) -> Estimator<'a, N> {
        Estimator {
            system: self.system,
            model: self.model,
            config: self.config,
            minimizer,
            cost: self.cost,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// The cost function as of the last fit.
    pub fn cost_model(&self) -> &QuadraticCostModel {
        &self.cost
    }

    /// Fits all force constants, starting from the values currently held by the model.
    ///
    /// Terms whose kind appears in `fixed` keep their current value.
    pub fn estimate(&mut self, fixed: Option<&HashSet<String>>) -> Result<FitResult, EngineError> {
        let kinit = self.model.valence.get_fcs();
        self.estimate_from(fixed, &kinit)
    }

    /// Fits all force constants starting from `kinit`, given in canonical term order.
    ///
    /// Terms whose kind appears in `fixed` are held at their value in `kinit`; dihedral
    /// terms are kept within the configured bounds; all others are kept non-negative.
    ///
    /// # Errors
    ///
    /// Fails before any minimization when `kinit` does not match the number of terms or
    /// a Hessian has the wrong shape. When the configuration requires convergence, a fit
    /// that stops early is reported as [`EngineError::Convergence`].
    #[instrument(skip_all, name = "estimate_workflow")]
    pub fn estimate_from(
        &mut self,
        fixed: Option<&HashSet<String>>,
        kinit: &DVector<f64>,
    ) -> Result<FitResult, EngineError> {
        let nterms = self.model.valence.nterms();
        if kinit.len() != nterms {
            return Err(CostError::DimensionMismatch {
                expected: nterms,
                found: kinit.len(),
            }
            .into());
        }
        info!(
            nterms,
            natoms = self.system.natoms(),
            "Starting force-constant fit."
        );

        let names: Vec<&str> = self.model.valence.names().collect();
        let constraints = ConstraintSet::build(&names, fixed, kinit, &self.config.bound_rules())?;
        debug!(
            constraints = constraints.len(),
            fixed = constraints.count_of(ConstraintType::Equality),
            "Constraint set built."
        );
        for (kind, count) in self.model.valence.kind_counts() {
            debug!(%kind, count, "Terms of one kind in the fit.");
        }

        self.cost.refresh(self.system, self.model)?;
        let initial_chi2 = self.cost.chi2(kinit)?;

        let outcome = self.minimizer.minimize(
            &self.cost,
            kinit,
            constraints.constraints(),
            &self.config.minimize_options(),
        )?;

        let mut force_constants = outcome.x;
        constraints.pin_fixed(&mut force_constants);
        let chi2 = self.cost.chi2(&force_constants)?;
        let max_violation = constraints.max_violation(&force_constants);

        if !outcome.status.is_success() {
            warn!(
                iterations = outcome.iterations,
                max_violation,
                "Fit did not converge: {}.",
                outcome.status.message()
            );
            if self.config.require_convergence {
                return Err(EngineError::Convergence {
                    iterations: outcome.iterations,
                    message: outcome.status.message(),
                });
            }
        }

        info!(
            iterations = outcome.iterations,
            initial_chi2, chi2, "Force-constant fit complete."
        );
        Ok(FitResult {
            force_constants,
            chi2,
            initial_chi2,
            iterations: outcome.iterations,
            status: outcome.status,
            max_violation,
        })
    }
}

/// Runs a single fit with the default minimizer, reading the settings from a TOML file.
pub fn run_from_file(
    system: &ReferenceSystem,
    model: &ForceFieldModel,
    fixed: Option<&HashSet<String>>,
    config_path: &Path,
) -> Result<FitResult, EngineError> {
    let config = EstimatorConfig::load(config_path)?;
    run(system, model, fixed, &config)
}

/// Runs a single fit with the default minimizer.
pub fn run(
    system: &ReferenceSystem,
    model: &ForceFieldModel,
    fixed: Option<&HashSet<String>>,
    config: &EstimatorConfig,
) -> Result<FitResult, EngineError> {
    Estimator::new(system, model)
        .with_config(config.clone())
        .estimate(fixed)
}
