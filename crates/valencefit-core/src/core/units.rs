//! Unit conversion factors.
//!
//! Force constants, Hessians and energies are handled internally in atomic units
//! (Hartree, bohr, radian). Multiplying a value expressed in one of the units below by
//! the corresponding constant converts it to atomic units; dividing converts it back.

/// One kJ/mol in Hartree.
pub const KJMOL: f64 = 1.0 / 2625.499_639_479_9;
