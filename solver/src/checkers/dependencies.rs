//! Transitive dependencies of a predicate in a three-valued dependency graph.

use hashbrown::HashSet;

use crate::graph::{DependencyGraph, EdgeState};
use crate::model::PredicateId;

/// Certainty that a predicate is a dependency.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    /// Reached through present edges only.
    Determined,
    /// Would be determined if the single edge `head -> body` became present.
    AlmostDetermined { head: PredicateId, body: PredicateId },
    /// May still be reached through some undetermined edges.
    Undetermined,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Dependency {
    pub predicate: PredicateId,
    pub status: Status,
}

impl Dependency {
    pub fn new(predicate: PredicateId, status: Status) -> Self {
        Dependency { predicate, status }
    }

    pub fn is_determined(&self) -> bool {
        self.status == Status::Determined
    }
}

/// How the closure treats uncertain edges.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Closure {
    /// Only keeps dependencies that are determined or one edge away from being determined.
    Pruning,
    /// Also over-approximates the dependencies reachable through any undetermined edge.
    Entailment,
}

/// All dependency records of `source` (including itself) in the graph.
///
/// A predicate may appear in several records with different statuses. For an almost determined dependency,
/// only the edges found first are recorded as its resolving edges.
pub fn dependencies(graph: &DependencyGraph, source: PredicateId, mode: Closure) -> HashSet<Dependency> {
    let seed = Dependency::new(source, Status::Determined);
    let mut found = HashSet::new();
    found.insert(seed);
    let mut queue = vec![seed];
    while let Some(Dependency { predicate, status }) = queue.pop() {
        for (next, edge) in graph.successors(predicate) {
            let derived = match (edge, status) {
                (EdgeState::Present, Status::Undetermined) if mode == Closure::Entailment => Status::Undetermined,
                (EdgeState::Present, Status::Undetermined) => continue,
                (EdgeState::Present, s) => s,
                (EdgeState::Undetermined(Some(_)), Status::Determined) => Status::AlmostDetermined {
                    head: predicate,
                    body: next,
                },
                (EdgeState::Undetermined(_), _) if mode == Closure::Entailment => Status::Undetermined,
                _ => continue,
            };
            let dep = Dependency::new(next, derived);
            if found.insert(dep) {
                queue.push(dep);
            }
        }
    }
    found
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{DomainView, Domains};
    use crate::model::{Formula, Program, Vocabulary};

    fn statuses(deps: &HashSet<Dependency>, p: PredicateId) -> Vec<Status> {
        deps.iter().filter(|d| d.predicate == p).map(|d| d.status).collect()
    }

    #[test]
    fn test_closure() {
        let doms = &mut Domains::new();
        let vocabulary = Vocabulary::propositional(&["a", "b", "c", "d"]).unwrap();
        let program = Program::new(doms, vocabulary, 4, 1);
        // a -> b present, b -> c undetermined, c -> d present, everything else absent
        for h in 0..4 {
            for b in 0..4 {
                match (h, b) {
                    (0, 1) | (2, 3) => doms.fix(program.edge(h, b), 1).unwrap(),
                    (1, 2) => false,
                    _ => doms.fix(program.edge(h, b), 0).unwrap(),
                };
            }
        }
        let graph = DependencyGraph::extract(&program, doms);

        let deps = dependencies(&graph, 0, Closure::Pruning);
        assert_eq!(statuses(&deps, 0), vec![Status::Determined]);
        assert_eq!(statuses(&deps, 1), vec![Status::Determined]);
        let almost = Status::AlmostDetermined { head: 1, body: 2 };
        assert_eq!(statuses(&deps, 2), vec![almost]);
        assert_eq!(statuses(&deps, 3), vec![almost]);
        assert_eq!(deps.len(), 4);

        // from d, nothing is reachable
        assert_eq!(dependencies(&graph, 3, Closure::Entailment).len(), 1);

        // resolving the edge makes everything determined
        doms.fix(program.edge(1, 2), 1).unwrap();
        let graph = DependencyGraph::extract(&program, doms);
        let deps = dependencies(&graph, 0, Closure::Pruning);
        assert!(deps.iter().all(|d| d.is_determined()));
        assert_eq!(deps.len(), 4);
        assert!(doms.is_singleton(program.edge(1, 2)));
    }

    #[test]
    fn test_entailment_over_approximates() {
        let doms = &mut Domains::new();
        let vocabulary = Vocabulary::propositional(&["a", "b", "c"]).unwrap();
        let program = Program::new(doms, vocabulary, 3, 2);
        // a :- b. and everything else still open
        program.assign_clause(doms, 0, 0, &[], &Formula::atom(1)).unwrap();
        let graph = DependencyGraph::extract(&program, doms);

        let pruning = dependencies(&graph, 0, Closure::Pruning);
        let entailment = dependencies(&graph, 0, Closure::Entailment);
        assert!(pruning.is_subset(&entailment));
        // c is two undetermined edges away: a -> c directly is almost determined, b -> c too
        assert!(statuses(&pruning, 2).contains(&Status::AlmostDetermined { head: 0, body: 2 }));
        assert!(statuses(&pruning, 2).contains(&Status::AlmostDetermined { head: 1, body: 2 }));
        assert!(!statuses(&pruning, 2).contains(&Status::Undetermined));
        assert!(statuses(&entailment, 2).contains(&Status::Undetermined));
    }
}
