//! Shared helpers for the absint test suites: algebraic law checks for
//! domains and a set of small programs with known answers.

pub mod fixtures;
pub mod lattice;
