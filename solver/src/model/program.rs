use smallvec::SmallVec;

use crate::config::ConfigError;
use crate::core::{CellId, DomainView, Domains, IntCst, InvalidUpdate};
use crate::model::body::{ClauseBody, Formula};
use crate::model::label::PredicateId;

/// Symbols available to the generated programs.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    predicates: Vec<String>,
    arities: Vec<usize>,
    variables: Vec<String>,
    constants: Vec<String>,
}

impl Vocabulary {
    pub fn new<P, V, C>(
        predicates: impl IntoIterator<Item = (P, usize)>,
        variables: impl IntoIterator<Item = V>,
        constants: impl IntoIterator<Item = C>,
    ) -> Result<Vocabulary, ConfigError>
    where
        P: Into<String>,
        V: Into<String>,
        C: Into<String>,
    {
        let mut vocabulary = Vocabulary::default();
        for (name, arity) in predicates {
            let name = name.into();
            if vocabulary.predicate_id(&name).is_some() {
                return Err(ConfigError::DuplicatePredicate(name));
            }
            vocabulary.predicates.push(name);
            vocabulary.arities.push(arity);
        }
        vocabulary.variables = variables.into_iter().map(Into::into).collect();
        vocabulary.constants = constants.into_iter().map(Into::into).collect();
        Ok(vocabulary)
    }

    /// A vocabulary of propositional predicates (arity 0) with the given names.
    pub fn propositional(names: &[&str]) -> Result<Vocabulary, ConfigError> {
        Self::new(names.iter().map(|&n| (n, 0)), Vec::<String>::new(), Vec::<String>::new())
    }

    pub fn num_predicates(&self) -> usize {
        self.predicates.len()
    }

    pub fn predicate_id(&self, name: &str) -> Option<PredicateId> {
        self.predicates.iter().position(|p| p == name)
    }

    /// Same as [Vocabulary::predicate_id] but reports unknown names as a configuration error.
    pub fn resolve(&self, name: &str) -> Result<PredicateId, ConfigError> {
        self.predicate_id(name)
            .ok_or_else(|| ConfigError::UnknownPredicate(name.to_string()))
    }

    pub fn predicate_name(&self, p: PredicateId) -> &str {
        &self.predicates[p]
    }

    pub fn arity(&self, p: PredicateId) -> usize {
        self.arities[p]
    }

    pub fn max_arity(&self) -> usize {
        self.arities.iter().copied().max().unwrap_or(0)
    }

    /// Number of terms (variables followed by constants) that can appear as arguments.
    pub fn num_terms(&self) -> usize {
        self.variables.len() + self.constants.len()
    }

    /// Name of the term with the given index, where variables come before constants.
    pub fn term_name(&self, term: usize) -> Option<&str> {
        if term < self.variables.len() {
            Some(&self.variables[term])
        } else {
            self.constants.get(term - self.variables.len()).map(String::as_str)
        }
    }
}

/// Head of a clause, as given by its assignment cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Head {
    Predicate(PredicateId),
    /// The clause is not part of the program.
    Disabled,
}

/// The cells describing a program with a bounded number of clauses.
///
/// Each clause has a head cell, whose value is either a predicate or the `disabled` sentinel (equal to the
/// number of predicates), the argument cells of its head and a [ClauseBody].
///
/// The program also owns an adjacency matrix of 0/1 cells: `edge(h, b)` is 1 iff some clause defining `h`
/// mentions `b` in its body. Keeping these cells consistent with the clauses is the responsibility of the
/// search engine; checkers only read them and request the removal of values.
#[derive(Clone, Debug)]
pub struct Program {
    vocabulary: Vocabulary,
    heads: Vec<CellId>,
    head_arguments: Vec<SmallVec<[CellId; 4]>>,
    bodies: Vec<ClauseBody>,
    edges: Vec<CellId>,
}

impl Program {
    /// Allocates all cells of a program with `num_clauses` clauses whose bodies have `num_nodes` slots each.
    pub fn new(doms: &mut Domains, vocabulary: Vocabulary, num_clauses: usize, num_nodes: usize) -> Program {
        let num_predicates = vocabulary.num_predicates();
        let max_arity = vocabulary.max_arity();
        let num_terms = vocabulary.num_terms();
        let mut heads = Vec::with_capacity(num_clauses);
        let mut head_arguments = Vec::with_capacity(num_clauses);
        let mut bodies = Vec::with_capacity(num_clauses);
        for _ in 0..num_clauses {
            heads.push(doms.new_cell_range(0, num_predicates as IntCst));
            head_arguments.push(
                (0..max_arity)
                    .map(|_| doms.new_cell_range(0, num_terms as IntCst))
                    .collect(),
            );
            bodies.push(ClauseBody::allocate(doms, num_nodes, num_predicates, max_arity, num_terms));
        }
        let edges = (0..num_predicates * num_predicates)
            .map(|_| doms.new_cell([0, 1]))
            .collect();
        Program {
            vocabulary,
            heads,
            head_arguments,
            bodies,
            edges,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn num_predicates(&self) -> usize {
        self.vocabulary.num_predicates()
    }

    pub fn num_clauses(&self) -> usize {
        self.heads.len()
    }

    /// Value of a head cell marking a disabled clause.
    pub fn disabled(&self) -> IntCst {
        self.num_predicates() as IntCst
    }

    /// Assignment cell of the clause.
    pub fn head(&self, clause: usize) -> CellId {
        self.heads[clause]
    }

    pub fn head_arguments(&self, clause: usize) -> &[CellId] {
        &self.head_arguments[clause]
    }

    pub fn body(&self, clause: usize) -> &ClauseBody {
        &self.bodies[clause]
    }

    pub fn bodies(&self) -> &[ClauseBody] {
        &self.bodies
    }

    /// The adjacency cell stating whether `head` depends on `body` through some clause.
    pub fn edge(&self, head: PredicateId, body: PredicateId) -> CellId {
        self.edges[head * self.num_predicates() + body]
    }

    pub fn determined_head(&self, view: &dyn DomainView, clause: usize) -> Option<Head> {
        view.value(self.heads[clause]).map(|v| {
            if v == self.disabled() {
                Head::Disabled
            } else {
                Head::Predicate(v as PredicateId)
            }
        })
    }

    /// Returns true if `p` is still a candidate head of the clause.
    pub fn may_define(&self, view: &dyn DomainView, clause: usize, p: PredicateId) -> bool {
        view.contains(self.heads[clause], p as IntCst)
    }

    /// A clause is determined when its head and the structure and labels of its body are all fixed.
    pub fn is_clause_determined(&self, view: &dyn DomainView, clause: usize) -> bool {
        view.is_singleton(self.heads[clause]) && self.bodies[clause].all_determined(view)
    }

    pub fn all_determined(&self, view: &dyn DomainView) -> bool {
        (0..self.num_clauses()).all(|c| self.is_clause_determined(view, c))
    }

    /// Fixes the cells of a clause to `head(head_args) :- body`.
    pub fn assign_clause(
        &self,
        doms: &mut Domains,
        clause: usize,
        head: PredicateId,
        head_args: &[usize],
        body: &Formula,
    ) -> Result<(), InvalidUpdate> {
        doms.fix(self.heads[clause], head as IntCst)?;
        let unused = self.vocabulary.num_terms() as IntCst;
        for (k, &cell) in self.head_arguments[clause].iter().enumerate() {
            doms.fix(cell, head_args.get(k).map_or(unused, |&t| t as IntCst))?;
        }
        self.bodies[clause].assign(doms, body)
    }

    /// Fixes a clause to be disabled, with an empty (`TRUE`) body.
    pub fn disable_clause(&self, doms: &mut Domains, clause: usize) -> Result<(), InvalidUpdate> {
        doms.fix(self.heads[clause], self.disabled())?;
        let unused = self.vocabulary.num_terms() as IntCst;
        for &cell in &self.head_arguments[clause] {
            doms.fix(cell, unused)?;
        }
        self.bodies[clause].assign(doms, &Formula::True)
    }

    /// Fixes every adjacency cell to the value implied by the (fully determined) clauses.
    ///
    /// This stands in for the channeling constraint that a search engine maintains between the clauses and the
    /// adjacency matrix.
    pub fn channel_edges(&self, doms: &mut Domains) -> Result<(), InvalidUpdate> {
        let n = self.num_predicates();
        let mut present = vec![false; n * n];
        for clause in 0..self.num_clauses() {
            if let Some(Head::Predicate(h)) = self.determined_head(doms, clause) {
                for (_, b) in self.bodies[clause].predicate_nodes(doms) {
                    present[h * n + b] = true;
                }
            }
        }
        for (i, &cell) in self.edges.iter().enumerate() {
            doms.fix(cell, present[i] as IntCst)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vocabulary() {
        let v = Vocabulary::new([("p", 1), ("q", 2)], ["X", "Y"], ["a"]).unwrap();
        assert_eq!(v.num_predicates(), 2);
        assert_eq!(v.predicate_id("q"), Some(1));
        assert_eq!(v.max_arity(), 2);
        assert_eq!(v.num_terms(), 3);
        assert_eq!(v.term_name(1), Some("Y"));
        assert_eq!(v.term_name(2), Some("a"));
        assert_eq!(v.term_name(3), None);
        assert!(matches!(v.resolve("r"), Err(ConfigError::UnknownPredicate(name)) if name == "r"));
        assert!(matches!(
            Vocabulary::propositional(&["p", "p"]),
            Err(ConfigError::DuplicatePredicate(_))
        ));
    }

    #[test]
    fn test_clause_assignment() {
        let doms = &mut Domains::new();
        let vocabulary = Vocabulary::propositional(&["p", "q"]).unwrap();
        let program = Program::new(doms, vocabulary, 3, 3);
        assert!(!program.all_determined(doms));
        assert_eq!(program.determined_head(doms, 0), None);

        program.assign_clause(doms, 0, 0, &[], &Formula::atom(1)).unwrap();
        program.disable_clause(doms, 1).unwrap();
        assert!(program.is_clause_determined(doms, 0));
        assert_eq!(program.determined_head(doms, 0), Some(Head::Predicate(0)));
        assert_eq!(program.determined_head(doms, 1), Some(Head::Disabled));
        assert!(program.may_define(doms, 2, 1));
        assert!(!program.all_determined(doms));

        program.assign_clause(doms, 2, 1, &[], &Formula::True).unwrap();
        assert!(program.all_determined(doms));
        program.channel_edges(doms).unwrap();
        assert_eq!(doms.value(program.edge(0, 1)), Some(1));
        assert_eq!(doms.value(program.edge(1, 0)), Some(0));
        assert_eq!(doms.value(program.edge(0, 0)), Some(0));
    }
}
