use phf::{Map, phf_map};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Bond,
    Angle,
    Dihedral,
    OutOfPlane,
    Other,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TermKind::Bond => "bond",
            TermKind::Angle => "angle",
            TermKind::Dihedral => "dihedral",
            TermKind::OutOfPlane => "out-of-plane distance",
            TermKind::Other => "other",
        };
        f.write_str(label)
    }
}

static KIND_ALIASES: Map<&'static str, TermKind> = phf_map! {
    "bond" => TermKind::Bond,
    "bend" => TermKind::Angle,
    "angle" => TermKind::Angle,
    "opdist" => TermKind::OutOfPlane,
    "oopdist" => TermKind::OutOfPlane,
};

/// Returns the interaction-kind prefix of a term name, i.e. everything before the
/// first `/`. A name without a separator is its own kind.
pub fn kind_prefix(term_name: &str) -> &str {
    term_name
        .split_once('/')
        .map_or(term_name, |(kind, _)| kind)
}

pub fn is_dihedral_kind(kind: &str) -> bool {
    kind.starts_with("dihed")
}

pub fn classify_kind(kind: &str) -> TermKind {
    if is_dihedral_kind(kind) {
        return TermKind::Dihedral;
    }
    KIND_ALIASES.get(kind).copied().unwrap_or(TermKind::Other)
}

/// A well-formed term name has a non-empty kind and a non-empty instance id,
/// separated by the first `/`.
pub fn is_valid_term_name(term_name: &str) -> bool {
    match term_name.split_once('/') {
        Some((kind, instance)) => !kind.trim().is_empty() && !instance.trim().is_empty(),
        None => false,
    }
}
