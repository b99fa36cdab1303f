//! Three-valued predicate dependency graph derived from the current domains of a [Program].
//!
//! An edge `h -> b` states that some clause defining `h` mentions `b` in its body.

use std::fmt::{Debug, Formatter};

use crate::checkers::Condition;
use crate::core::{CellId, DomainView};
use crate::model::{Head, PredicateId, Program};

/// Presence of an edge in the dependency graph.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EdgeState {
    Present,
    Absent,
    /// The edge may still appear or disappear. If known, the cell whose value decides it is given.
    Undetermined(Option<CellId>),
}

impl EdgeState {
    pub fn is_present(self) -> bool {
        self == EdgeState::Present
    }

    pub fn is_undetermined(self) -> bool {
        matches!(self, EdgeState::Undetermined(_))
    }
}

/// Dense matrix of the edge states between all pairs of predicates.
#[derive(Clone)]
pub struct DependencyGraph {
    num_predicates: usize,
    edges: Vec<EdgeState>,
}

impl DependencyGraph {
    fn with_all(num_predicates: usize, state: EdgeState) -> Self {
        DependencyGraph {
            num_predicates,
            edges: vec![state; num_predicates * num_predicates],
        }
    }

    /// Reads the dependency graph from the clauses and the adjacency cells of the program.
    ///
    /// Edges produced by a fully determined clause are present. Others take the state of their adjacency cell,
    /// with an undecided cell being the resolving cell of the edge.
    pub fn extract(program: &Program, view: &dyn DomainView) -> Self {
        let n = program.num_predicates();
        let mut graph = Self::with_all(n, EdgeState::Absent);
        for head in 0..n {
            for body in 0..n {
                let cell = program.edge(head, body);
                graph.edges[head * n + body] = match view.value(cell) {
                    Some(0) => EdgeState::Absent,
                    Some(_) => EdgeState::Present,
                    None => EdgeState::Undetermined(Some(cell)),
                };
            }
        }
        for clause in 0..program.num_clauses() {
            if !program.is_clause_determined(view, clause) {
                continue;
            }
            if let Some(Head::Predicate(head)) = program.determined_head(view, clause) {
                for (_, body) in program.body(clause).predicate_nodes(view) {
                    graph.set(head, body, EdgeState::Present);
                }
            }
        }
        graph
    }

    /// Builds the dependency graph from the clauses alone, ignoring the body occurrences explained by
    /// `condition`.
    ///
    /// Only fully determined clauses produce present edges. An edge that some open clause could still produce
    /// is undetermined, without resolving cell since the adjacency cells do not account for the masking.
    pub fn extract_masked(program: &Program, view: &dyn DomainView, condition: &Condition) -> Self {
        let n = program.num_predicates();
        let mut graph = Self::with_all(n, EdgeState::Absent);
        for clause in 0..program.num_clauses() {
            let body = program.body(clause);
            if program.is_clause_determined(view, clause) {
                let Some(Head::Predicate(head)) = program.determined_head(view, clause) else {
                    continue;
                };
                let masked = condition.masked_nodes(body, view);
                for (node, p) in body.predicate_nodes(view) {
                    if !masked.contains(node) {
                        graph.set(head, p, EdgeState::Present);
                    }
                }
            } else {
                for head in (0..n).filter(|&h| program.may_define(view, clause, h)) {
                    for p in (0..n).filter(|&p| body.may_contain(view, p)) {
                        if graph.state(head, p) == EdgeState::Absent {
                            graph.set(head, p, EdgeState::Undetermined(None));
                        }
                    }
                }
            }
        }
        graph
    }

    pub fn num_predicates(&self) -> usize {
        self.num_predicates
    }

    pub fn state(&self, head: PredicateId, body: PredicateId) -> EdgeState {
        self.edges[head * self.num_predicates + body]
    }

    fn set(&mut self, head: PredicateId, body: PredicateId, state: EdgeState) {
        self.edges[head * self.num_predicates + body] = state;
    }

    /// All predicates `b` for which the edge `head -> b` is not known to be absent, with the state of the edge.
    pub fn successors(&self, head: PredicateId) -> impl Iterator<Item = (PredicateId, EdgeState)> + '_ {
        let row = &self.edges[head * self.num_predicates..(head + 1) * self.num_predicates];
        row.iter()
            .enumerate()
            .filter(|(_, s)| **s != EdgeState::Absent)
            .map(|(b, s)| (b, *s))
    }

    /// Returns true if no edge is undetermined.
    pub fn is_determined(&self) -> bool {
        !self.edges.iter().any(|s| s.is_undetermined())
    }
}

impl Debug for DependencyGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for head in 0..self.num_predicates {
            write!(f, "{head}:")?;
            for body in 0..self.num_predicates {
                let c = match self.state(head, body) {
                    EdgeState::Present => '1',
                    EdgeState::Absent => '0',
                    EdgeState::Undetermined(_) => '?',
                };
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
