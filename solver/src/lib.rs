//! Consistency checkers for the generation of logic programs under structural constraints.
//!
//! A program with a bounded number of clauses is represented by cells of a finite-domain store ([core::Domains]):
//! each clause has a head cell and a body encoded as a tree over a fixed number of node slots ([model]).
//! While a search engine progressively narrows these cells, the [checkers] decide whether the dependency
//! graph of the program ([graph]) already violates, or is guaranteed to satisfy, properties such as
//! acyclicity or the independence of two predicates.

pub mod backtrack;
pub mod checkers;
pub mod collections;
pub mod config;
pub mod core;
pub mod graph;
pub mod model;
pub mod params;
