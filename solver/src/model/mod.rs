//! Representation of the generated programs as cells of a finite-domain store.

pub mod body;
pub mod label;
pub mod program;
pub mod render;

pub use body::{ClauseBody, Formula};
pub use label::{Connective, Label, PredicateId, Sign, SignedPredicate};
pub use program::{Head, Program, Vocabulary};
