use crate::core::optimizer::{ConstraintFunction, ConstraintType, constraint_violation};
use crate::core::units::KJMOL;
use crate::core::utils::identifiers::{self, TermKind};
use nalgebra::DVector;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Initial guess has {found} force constants, but there are {expected} terms")]
    DimensionMismatch { expected: usize, found: usize },
}

/// A bound on a single force constant.
///
/// Equality constraints are satisfied when [`Constraint::evaluate`] returns zero,
/// inequality constraints when it returns a non-negative value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// `k[index] - value == 0`
    Fixed { index: usize, value: f64 },
    /// `k[index] - bound >= 0`
    LowerBound { index: usize, bound: f64 },
    /// `bound - k[index] >= 0`
    UpperBound { index: usize, bound: f64 },
}

impl Constraint {
    pub fn index(&self) -> usize {
        match *self {
            Constraint::Fixed { index, .. }
            | Constraint::LowerBound { index, .. }
            | Constraint::UpperBound { index, .. } => index,
        }
    }

    pub fn constraint_type(&self) -> ConstraintType {
        match self {
            Constraint::Fixed { .. } => ConstraintType::Equality,
            Constraint::LowerBound { .. } | Constraint::UpperBound { .. } => {
                ConstraintType::Inequality
            }
        }
    }

    /// # Panics
    ///
    /// Panics if the constraint index is out of range for `k`.
    pub fn evaluate(&self, k: &DVector<f64>) -> f64 {
        match *self {
            Constraint::Fixed { index, value } => k[index] - value,
            Constraint::LowerBound { index, bound } => k[index] - bound,
            Constraint::UpperBound { index, bound } => bound - k[index],
        }
    }

    /// Gradient of [`Constraint::evaluate`] over `npars` parameters; independent of `k`.
    pub fn jacobian(&self, npars: usize) -> DVector<f64> {
        let mut jac = DVector::zeros(npars);
        jac[self.index()] = match self {
            Constraint::Fixed { .. } | Constraint::LowerBound { .. } => 1.0,
            Constraint::UpperBound { .. } => -1.0,
        };
        jac
    }

    /// Amount by which `k` violates the constraint; zero when it is satisfied.
    pub fn violation(&self, k: &DVector<f64>) -> f64 {
        constraint_violation(self.constraint_type(), self.evaluate(k))
    }
}

impl ConstraintFunction for Constraint {
    fn constraint_type(&self) -> ConstraintType {
        Constraint::constraint_type(self)
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        self.evaluate(x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> DVector<f64> {
        Constraint::jacobian(self, x.len())
    }

    fn required_dimension(&self) -> Option<usize> {
        Some(self.index() + 1)
    }
}

/// Bounds applied to terms that are not held fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundRules {
    pub default_lower: f64,
    pub dihedral_lower: f64,
    pub dihedral_upper: f64,
}

impl Default for BoundRules {
    fn default() -> Self {
        Self {
            default_lower: 0.0,
            dihedral_lower: 0.0,
            dihedral_upper: 200.0 * KJMOL,
        }
    }
}

/// All constraints of one fit, in the order the terms are indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    npars: usize,
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Translates term names into constraints.
    ///
    /// `names` must be in canonical index order. For each term, in that order:
    ///
    /// - a kind listed in `fixed` pins the force constant to its value in `kinit`;
    /// - a dihedral kind is bounded below and above;
    /// - anything else is bounded below.
    ///
    /// `fixed` is matched against the kind prefix of each name (`"bond"` in
    /// `"bond/C.H"`), never against the full name.
    pub fn build<S: AsRef<str>>(
        names: &[S],
        fixed: Option<&HashSet<String>>,
        kinit: &DVector<f64>,
        rules: &BoundRules,
    ) -> Result<Self, ConstraintError> {
        if kinit.len() != names.len() {
            return Err(ConstraintError::DimensionMismatch {
                expected: names.len(),
                found: kinit.len(),
            });
        }

        let mut constraints = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let kind = identifiers::kind_prefix(name.as_ref());
            if fixed.is_some_and(|kinds| kinds.contains(kind)) {
                constraints.push(Constraint::Fixed {
                    index,
                    value: kinit[index],
                });
            } else if identifiers::classify_kind(kind) == TermKind::Dihedral {
                constraints.push(Constraint::LowerBound {
                    index,
                    bound: rules.dihedral_lower,
                });
                constraints.push(Constraint::UpperBound {
                    index,
                    bound: rules.dihedral_upper,
                });
            } else {
                constraints.push(Constraint::LowerBound {
                    index,
                    bound: rules.default_lower,
                });
            }
        }

        Ok(Self {
            npars: names.len(),
            constraints,
        })
    }

    pub fn npars(&self) -> usize {
        self.npars
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn for_index(&self, index: usize) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.index() == index)
    }

    pub fn count_of(&self, constraint_type: ConstraintType) -> usize {
        self.constraints
            .iter()
            .filter(|c| c.constraint_type() == constraint_type)
            .count()
    }

    pub fn max_violation(&self, k: &DVector<f64>) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.violation(k))
            .fold(0.0, f64::max)
    }

    pub fn is_satisfied(&self, k: &DVector<f64>, tolerance: f64) -> bool {
        self.max_violation(k) <= tolerance
    }

    /// Writes the pinned value of every fixed constraint into `k`.
    pub fn pin_fixed(&self, k: &mut DVector<f64>) {
        for constraint in &self.constraints {
            if let Constraint::Fixed { index, value } = *constraint {
                k[index] = value;
            }
        }
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}
