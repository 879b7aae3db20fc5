use super::ModelError;
use super::term::ValenceTerm;
use crate::core::utils::identifiers::TermKind;
use nalgebra::DVector;
use std::cmp::Ordering;

/// The ordering that maps term names onto parameter indices: plain lexicographic
/// (byte-wise) comparison of the full names.
///
/// Every vector and matrix indexed by term (force constants, the quadratic-form
/// coefficients, constraint indices) uses this ordering and nothing else.
#[inline]
pub fn canonical_cmp(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// Sorts term names into canonical index order.
pub fn canonical_order<'a, I>(names: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ordered: Vec<&'a str> = names.into_iter().collect();
    ordered.sort_by(|a, b| canonical_cmp(a, b));
    ordered
}

/// The valence part of a force field: all fitted terms, held in canonical order.
#[derive(Debug, Default)]
pub struct ValenceModel {
    terms: Vec<ValenceTerm>,
}

impl ValenceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model from terms given in any order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateTerm`] if two terms share a name.
    pub fn from_terms(terms: impl IntoIterator<Item = ValenceTerm>) -> Result<Self, ModelError> {
        let mut model = Self::new();
        for term in terms {
            model.add_term(term)?;
        }
        Ok(model)
    }

    /// Inserts a term at its canonical position and returns that index.
    ///
    /// Indices of terms that sort after the new one shift by one.
    pub fn add_term(&mut self, term: ValenceTerm) -> Result<usize, ModelError> {
        match self
            .terms
            .binary_search_by(|existing| canonical_cmp(existing.name(), term.name()))
        {
            Ok(_) => Err(ModelError::DuplicateTerm(term.name().to_string())),
            Err(position) => {
                self.terms.insert(position, term);
                Ok(position)
            }
        }
    }

    #[inline]
    pub fn nterms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[ValenceTerm] {
        &self.terms
    }

    pub fn term(&self, index: usize) -> Option<&ValenceTerm> {
        self.terms.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.terms
            .binary_search_by(|existing| canonical_cmp(existing.name(), name))
            .ok()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.name())
    }

    /// Number of terms of each interaction kind, in order of first appearance.
    ///
    /// Kinds are classified from the name prefix, so aliases such as `bend` and
    /// `angle` are counted together.
    pub fn kind_counts(&self) -> Vec<(TermKind, usize)> {
        let mut counts: Vec<(TermKind, usize)> = Vec::new();
        for term in &self.terms {
            let kind = term.term_kind();
            match counts.iter_mut().find(|(seen, _)| *seen == kind) {
                Some((_, count)) => *count += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }

    /// Current force constants in canonical order.
    pub fn get_fcs(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.terms.len(),
            self.terms.iter().map(|term| term.force_constant),
        )
    }

    /// Overwrites every force constant from a vector in canonical order.
    pub fn set_fcs(&mut self, fcs: &DVector<f64>) -> Result<(), ModelError> {
        if fcs.len() != self.terms.len() {
            return Err(ModelError::ParameterCount {
                expected: self.terms.len(),
                found: fcs.len(),
            });
        }
        for (term, &k) in self.terms.iter_mut().zip(fcs.iter()) {
            term.force_constant = k;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(name: &str, k: f64) -> ValenceTerm {
        ValenceTerm::new(name, k, 0.0).unwrap()
    }

    #[test]
    fn canonical_order_sorts_names_lexicographically() {
        let names = ["dihed/C.C.C.H", "angle/H.C.H", "bond/C.H", "bond/C.C", "opdist/C.O"];
        assert_eq!(
            canonical_order(names),
            vec!["angle/H.C.H", "bond/C.C", "bond/C.H", "dihed/C.C.C.H", "opdist/C.O"]
        );
    }

    #[test]
    fn canonical_order_is_byte_wise_so_uppercase_sorts_first() {
        assert_eq!(
            canonical_order(["bond/c", "bond/C", "Bond/a"]),
            vec!["Bond/a", "bond/C", "bond/c"]
        );
    }

    #[test]
    fn add_term_keeps_terms_in_canonical_order_regardless_of_insertion_order() {
        let model = ValenceModel::from_terms([
            term("dihed/C.C.C.H", 4.0),
            term("bond/C.H", 2.0),
            term("angle/H.C.H", 1.0),
            term("bond/C.C", 3.0),
        ])
        .unwrap();

        let names: Vec<&str> = model.names().collect();
        assert_eq!(names, canonical_order(names.clone()));
        assert_eq!(names, vec!["angle/H.C.H", "bond/C.C", "bond/C.H", "dihed/C.C.C.H"]);
        assert_eq!(model.get_fcs().as_slice(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn add_term_returns_canonical_index() {
        let mut model = ValenceModel::new();
        assert_eq!(model.add_term(term("bond/C.H", 1.0)).unwrap(), 0);
        assert_eq!(model.add_term(term("angle/H.C.H", 1.0)).unwrap(), 0);
        assert_eq!(model.add_term(term("dihed/X", 1.0)).unwrap(), 2);
        assert_eq!(model.index_of("bond/C.H"), Some(1));
        assert_eq!(model.index_of("bond/C.C"), None);
    }

    #[test]
    fn add_term_rejects_duplicate_names() {
        let mut model = ValenceModel::new();
        model.add_term(term("bond/C.H", 1.0)).unwrap();
        let result = model.add_term(term("bond/C.H", 2.0));
        assert!(matches!(result, Err(ModelError::DuplicateTerm(name)) if name == "bond/C.H"));
        assert_eq!(model.nterms(), 1);
    }

    #[test]
    fn kind_counts_groups_aliases_and_unknown_kinds() {
        let model = ValenceModel::from_terms([
            term("angle/H.C.H", 1.0),
            term("bend/C.C.H", 1.0),
            term("bond/C.C", 1.0),
            term("bond/C.H", 1.0),
            term("cross/C.C.H", 1.0),
            term("dihed/H.C.C.H", 1.0),
        ])
        .unwrap();
        assert_eq!(
            model.kind_counts(),
            vec![
                (TermKind::Angle, 2),
                (TermKind::Bond, 2),
                (TermKind::Other, 1),
                (TermKind::Dihedral, 1),
            ]
        );
        assert!(ValenceModel::new().kind_counts().is_empty());
    }

    #[test]
    fn set_fcs_overwrites_force_constants_in_order() {
        let mut model =
            ValenceModel::from_terms([term("bond/C.H", 1.0), term("angle/H.C.H", 2.0)]).unwrap();
        model.set_fcs(&DVector::from_vec(vec![10.0, 20.0])).unwrap();
        assert_eq!(model.term(0).unwrap().force_constant, 10.0);
        assert_eq!(model.term(1).unwrap().force_constant, 20.0);
    }

    #[test]
    fn set_fcs_rejects_wrong_length() {
        let mut model = ValenceModel::from_terms([term("bond/C.H", 1.0)]).unwrap();
        let result = model.set_fcs(&DVector::from_vec(vec![1.0, 2.0]));
        assert!(matches!(
            result,
            Err(ModelError::ParameterCount {
                expected: 1,
                found: 2
            })
        ));
        assert_eq!(model.term(0).unwrap().force_constant, 1.0);
    }

    #[test]
    fn empty_model_has_no_force_constants() {
        let model = ValenceModel::new();
        assert!(model.is_empty());
        assert_eq!(model.get_fcs().len(), 0);
    }
}
