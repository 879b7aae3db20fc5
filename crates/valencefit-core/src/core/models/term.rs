use super::ModelError;
use super::hessian::TermHessian;
use crate::core::utils::identifiers::{self, TermKind};
use std::fmt;

/// One force-constant parameter of the valence force field.
///
/// A term is identified by a name of the form `"<kind>/<instance-id>"` and groups every
/// interaction that shares its force constant (for example all C-H bonds of one
/// atom-type pair). The force constant is the quantity being fitted; the rest value is
/// carried along unchanged.
pub struct ValenceTerm {
    name: String,
    pub force_constant: f64,
    pub rest_value: f64,
    contributions: Vec<Box<dyn TermHessian>>,
}

impl ValenceTerm {
    /// Creates a term without Hessian contributions.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTermName`] if `name` is not of the form
    /// `"<kind>/<instance-id>"`, or [`ModelError::NonFiniteValue`] if either value is
    /// not finite.
    pub fn new(
        name: impl Into<String>,
        force_constant: f64,
        rest_value: f64,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if !identifiers::is_valid_term_name(&name) {
            return Err(ModelError::InvalidTermName(name));
        }
        if !force_constant.is_finite() || !rest_value.is_finite() {
            return Err(ModelError::NonFiniteValue { term: name });
        }
        Ok(Self {
            name,
            force_constant,
            rest_value,
            contributions: Vec::new(),
        })
    }

    pub fn with_contribution(mut self, contribution: impl TermHessian + 'static) -> Self {
        self.add_contribution(contribution);
        self
    }

    pub fn add_contribution(&mut self, contribution: impl TermHessian + 'static) {
        self.contributions.push(Box::new(contribution));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The interaction-kind prefix of the name, e.g. `"bond"` for `"bond/C.H"`.
    pub fn kind(&self) -> &str {
        identifiers::kind_prefix(&self.name)
    }

    pub fn term_kind(&self) -> TermKind {
        identifiers::classify_kind(self.kind())
    }

    pub fn contributions(&self) -> &[Box<dyn TermHessian>] {
        &self.contributions
    }
}

impl fmt::Debug for ValenceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValenceTerm")
            .field("name", &self.name)
            .field("force_constant", &self.force_constant)
            .field("rest_value", &self.rest_value)
            .field("contributions", &self.contributions.len())
            .finish()
    }
}
