pub mod identifiers;
pub mod matrix;
