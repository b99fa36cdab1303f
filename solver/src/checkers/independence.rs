use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::checkers::dependencies::{dependencies, Closure, Dependency, Status};
use crate::checkers::{Checker, Contradiction, Narrowing, Verdict, Violation};
use crate::config::ConfigError;
use crate::core::DomainView;
use crate::graph::DependencyGraph;
use crate::model::{PredicateId, Program};
use crate::params::INDEPENDENCE_PRUNING;

/// How the dependencies of two predicates intersect.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum Overlap {
    Disjoint,
    /// Some predicate is a possible dependency of both, but not a determined one of each.
    Possible,
    /// The predicate is a determined dependency of both.
    Determined(PredicateId),
}

/// Intersection of two dependency sets. If several predicates are determined dependencies of both, the least one
/// is reported.
pub(super) fn overlap(first: &HashSet<Dependency>, second: &HashSet<Dependency>) -> Overlap {
    let mut determined_in_second: HashMap<PredicateId, bool> = HashMap::with_capacity(second.len());
    for dep in second {
        *determined_in_second.entry(dep.predicate).or_default() |= dep.is_determined();
    }
    let mut result = Overlap::Disjoint;
    for dep in first {
        let Some(&determined) = determined_in_second.get(&dep.predicate) else {
            continue;
        };
        let in_both = determined && dep.is_determined();
        result = match result {
            Overlap::Determined(p) if !in_both || p <= dep.predicate => result,
            _ if in_both => Overlap::Determined(dep.predicate),
            _ => Overlap::Possible,
        };
    }
    result
}

/// Rejects a pair of predicates that is not made of two distinct predicates of the program.
pub(super) fn validate_pair(program: &Program, first: PredicateId, second: PredicateId) -> Result<(), ConfigError> {
    if let Some(p) = [first, second].into_iter().find(|&p| p >= program.num_predicates()) {
        return Err(ConfigError::UnknownPredicate(format!("#{p}")));
    }
    if first == second {
        return Err(ConfigError::SelfIndependence(program.vocabulary().predicate_name(first).to_string()));
    }
    Ok(())
}

/// Verdict of an independence property given the overlap of the entailment closures of both predicates.
pub(super) fn verdict(overlap: Overlap, program: &Program, view: &dyn DomainView) -> Verdict {
    match overlap {
        Overlap::Determined(_) => Verdict::Violated,
        Overlap::Possible => Verdict::Undecided,
        Overlap::Disjoint if program.all_determined(view) => Verdict::Satisfied,
        Overlap::Disjoint => Verdict::Undecided,
    }
}

/// Requires that no predicate is a (transitive) dependency of both `first` and `second`.
///
/// When one of them certainly depends on a predicate and the other would as soon as a single edge appears,
/// the checker requests this edge to be removed from the adjacency matrix.
#[derive(Clone)]
pub struct IndependenceChecker {
    program: Arc<Program>,
    first: PredicateId,
    second: PredicateId,
    pruning: bool,
}

impl IndependenceChecker {
    pub fn new(program: Arc<Program>, first: PredicateId, second: PredicateId) -> Result<Self, ConfigError> {
        validate_pair(&program, first, second)?;
        Ok(IndependenceChecker {
            program,
            first,
            second,
            pruning: INDEPENDENCE_PRUNING.get(),
        })
    }

    /// Enables or disables the removal of edges that would lead to a shared dependency.
    pub fn with_pruning(mut self, pruning: bool) -> Self {
        self.pruning = pruning;
        self
    }

    fn closures(&self, view: &dyn DomainView, mode: Closure) -> (HashSet<Dependency>, HashSet<Dependency>) {
        let graph = DependencyGraph::extract(&self.program, view);
        (
            dependencies(&graph, self.first, mode),
            dependencies(&graph, self.second, mode),
        )
    }
}

impl Checker for IndependenceChecker {
    fn check(&self, view: &dyn DomainView) -> Verdict {
        let (first, second) = self.closures(view, Closure::Entailment);
        verdict(overlap(&first, &second), &self.program, view)
    }

    fn propagate(&self, view: &dyn DomainView, out: &mut Vec<Narrowing>) -> Result<(), Contradiction> {
        let (first, second) = self.closures(view, Closure::Pruning);
        if let Overlap::Determined(p) = overlap(&first, &second) {
            tracing::trace!(first = self.first, second = self.second, shared = p, "independence violated");
            return Err(Violation::SharedDependency(p).into());
        }
        if !self.pruning {
            return Ok(());
        }
        for a in &first {
            for b in second.iter().filter(|b| b.predicate == a.predicate) {
                let edge = match (a.status, b.status) {
                    (Status::Determined, Status::AlmostDetermined { head, body })
                    | (Status::AlmostDetermined { head, body }, Status::Determined) => (head, body),
                    _ => continue,
                };
                tracing::trace!(shared = a.predicate, head = edge.0, body = edge.1, "pruning edge");
                out.push(Narrowing {
                    cell: self.program.edge(edge.0, edge.1),
                    value: 1,
                });
            }
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Checker> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::Domains;
    use crate::model::{Formula, Vocabulary};

    fn program(doms: &mut Domains, names: &[&str], clauses: usize) -> Arc<Program> {
        let vocabulary = Vocabulary::propositional(names).unwrap();
        Arc::new(Program::new(doms, vocabulary, clauses, 3))
    }

    #[test]
    fn test_shared_dependency() {
        let doms = &mut Domains::new();
        let program = program(doms, &["p", "q", "r"], 3);
        let checker = IndependenceChecker::new(program.clone(), 0, 2).unwrap();
        assert_eq!(checker.check(doms), Verdict::Undecided);

        // p :- q.   r :- q.
        program.assign_clause(doms, 0, 0, &[], &Formula::atom(1)).unwrap();
        program.assign_clause(doms, 1, 2, &[], &Formula::atom(1)).unwrap();
        assert_eq!(checker.check(doms), Verdict::Violated);
        assert_eq!(
            checker.propagate(doms, &mut Vec::new()),
            Err(Contradiction::Violated(Violation::SharedDependency(1)))
        );
    }

    #[test]
    fn test_independent_once_determined() {
        let doms = &mut Domains::new();
        let program = program(doms, &["p", "q", "r", "s"], 4);
        let checker = IndependenceChecker::new(program.clone(), 0, 2).unwrap();
        // p :- q.   r :- s.
        program.assign_clause(doms, 0, 0, &[], &Formula::atom(1)).unwrap();
        program.assign_clause(doms, 1, 2, &[], &Formula::atom(3)).unwrap();
        program.disable_clause(doms, 2).unwrap();
        assert_eq!(checker.check(doms), Verdict::Undecided);
        program.disable_clause(doms, 3).unwrap();
        program.channel_edges(doms).unwrap();
        assert_eq!(checker.check(doms), Verdict::Satisfied);
        let out = &mut Vec::new();
        assert_eq!(checker.propagate(doms, out), Ok(()));
        assert!(out.is_empty());
    }

    #[test]
    fn test_pruning_requests() {
        let doms = &mut Domains::new();
        let program = program(doms, &["p", "q", "r"], 3);
        // p :- q.   and r may still depend on q, the rest is excluded
        program.assign_clause(doms, 0, 0, &[], &Formula::atom(1)).unwrap();
        for h in 0..3 {
            for b in 0..3 {
                if (h, b) != (2, 1) {
                    doms.fix(program.edge(h, b), ((h, b) == (0, 1)) as i32).unwrap();
                }
            }
        }
        let checker = IndependenceChecker::new(program.clone(), 0, 2).unwrap().with_pruning(true);
        assert_eq!(checker.check(doms), Verdict::Undecided);
        let out = &mut Vec::new();
        checker.propagate(doms, out).unwrap();
        assert_eq!(
            out.as_slice(),
            &[Narrowing {
                cell: program.edge(2, 1),
                value: 1
            }]
        );

        out.clear();
        checker.clone().with_pruning(false).propagate(doms, out).unwrap();
        assert!(out.is_empty());

        doms.remove(program.edge(2, 1), 1).unwrap();
        assert_eq!(checker.check(doms), Verdict::Undecided);
        out.clear();
        checker.propagate(doms, out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_pairs() {
        let doms = &mut Domains::new();
        let program = program(doms, &["p", "q"], 2);
        assert_eq!(
            IndependenceChecker::new(program.clone(), 0, 5).err(),
            Some(ConfigError::UnknownPredicate("#5".to_string()))
        );
        assert_eq!(
            IndependenceChecker::new(program.clone(), 2, 1).err(),
            Some(ConfigError::UnknownPredicate("#2".to_string()))
        );
        assert_eq!(
            IndependenceChecker::new(program.clone(), 1, 1).err(),
            Some(ConfigError::SelfIndependence("q".to_string()))
        );
        assert!(IndependenceChecker::new(program, 1, 0).is_ok());
    }
}
