use std::sync::Arc;

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::checkers::{Checker, Contradiction, Narrowing, Verdict, Violation};
use crate::config::ForbidCycles;
use crate::core::DomainView;
use crate::model::{Head, PredicateId, Program, Sign};

/// Graph over the heads of the determined clauses, renumbered densely.
#[derive(Default, Debug)]
struct ContractedGraph {
    heads: Vec<PredicateId>,
    successors: Vec<SmallVec<[(usize, Sign); 4]>>,
}

impl ContractedGraph {
    fn node(&mut self, index: &mut HashMap<PredicateId, usize>, p: PredicateId) -> usize {
        *index.entry(p).or_insert_with(|| {
            self.heads.push(p);
            self.successors.push(SmallVec::new());
            self.heads.len() - 1
        })
    }
}

/// Forbids cycles in the dependency graph of the program, or only those that go through a negated occurrence.
///
/// Only clauses whose head and body are determined are considered, so a cycle is reported as soon as it is
/// certain while its absence can only be guaranteed on a fully determined program.
#[derive(Clone)]
pub struct AcyclicityChecker {
    program: Arc<Program>,
    mode: ForbidCycles,
}

impl AcyclicityChecker {
    pub fn new(program: Arc<Program>, mode: ForbidCycles) -> Self {
        AcyclicityChecker { program, mode }
    }

    pub fn mode(&self) -> ForbidCycles {
        self.mode
    }

    /// Builds the graph of the determined clauses. Returns `None` if no clause is determined.
    fn contract(&self, view: &dyn DomainView) -> Option<ContractedGraph> {
        let determined = (0..self.program.num_clauses())
            .filter(|&c| self.program.is_clause_determined(view, c))
            .collect::<SmallVec<[usize; 16]>>();
        if determined.is_empty() {
            return None;
        }
        let mut graph = ContractedGraph::default();
        let mut index = HashMap::new();
        let mut clauses = Vec::with_capacity(determined.len());
        for &c in &determined {
            if let Some(Head::Predicate(head)) = self.program.determined_head(view, c) {
                clauses.push((graph.node(&mut index, head), c));
            }
        }
        for (head, c) in clauses {
            for sp in self.program.body(c).signed_predicates(view) {
                // a predicate without determined clause has no outgoing edge and cannot close a cycle
                if let Some(&target) = index.get(&sp.predicate) {
                    graph.successors[head].push((target, sp.sign));
                }
            }
        }
        Some(graph)
    }

    fn find_violation(&self, view: &dyn DomainView) -> Option<Violation> {
        let graph = self.contract(view)?;
        let component = strongly_connected_components(&graph.successors);
        for (source, succs) in graph.successors.iter().enumerate() {
            for &(target, sign) in succs {
                if component[source] != component[target] {
                    continue;
                }
                match (self.mode, sign) {
                    (ForbidCycles::All, _) => return Some(Violation::Cycle(graph.heads[source])),
                    (ForbidCycles::Negative, Sign::Neg) => {
                        return Some(Violation::NegativeCycle(graph.heads[source]));
                    }
                    _ => {}
                }
            }
        }
        None
    }
}

impl Checker for AcyclicityChecker {
    fn check(&self, view: &dyn DomainView) -> Verdict {
        if self.mode == ForbidCycles::None {
            return Verdict::Satisfied;
        }
        if self.find_violation(view).is_some() {
            Verdict::Violated
        } else if self.program.all_determined(view) {
            Verdict::Satisfied
        } else {
            Verdict::Undecided
        }
    }

    fn propagate(&self, view: &dyn DomainView, _out: &mut Vec<Narrowing>) -> Result<(), Contradiction> {
        if self.mode == ForbidCycles::None {
            return Ok(());
        }
        match self.find_violation(view) {
            Some(violation) => {
                tracing::trace!(?violation, "cycle detected");
                Err(violation.into())
            }
            None => Ok(()),
        }
    }

    fn clone_box(&self) -> Box<dyn Checker> {
        Box::new(self.clone())
    }
}

/// Tarjan's algorithm with an explicit stack. Returns the index of the component of each node.
fn strongly_connected_components<E>(successors: &[SmallVec<[(usize, E); 4]>]) -> Vec<usize> {
    const UNVISITED: usize = usize::MAX;
    let n = successors.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0; n];
    let mut component = vec![UNVISITED; n];
    let mut on_stack = FixedBitSet::with_capacity(n);
    let mut stack = Vec::with_capacity(n);
    // (node, position of the next successor to visit)
    let mut frames: Vec<(usize, usize)> = Vec::new();
    let mut next_index = 0;
    let mut num_components = 0;

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some((next, _)) = successors[node].get(frame.1) {
                let next = *next;
                frame.1 += 1;
                if index[next] == UNVISITED {
                    index[next] = next_index;
                    lowlink[next] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    frames.push((next, 0));
                } else if on_stack.contains(next) {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
            } else {
                frames.pop();
                if lowlink[node] == index[node] {
                    while let Some(member) = stack.pop() {
                        on_stack.set(member, false);
                        component[member] = num_components;
                        if member == node {
                            break;
                        }
                    }
                    num_components += 1;
                }
                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
            }
        }
    }
    component
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::Domains;
    use crate::model::{Formula, Vocabulary};
    use smallvec::smallvec;

    #[test]
    fn test_components() {
        // 0 -> 1 -> 2 -> 0, 2 -> 3, 3 -> 3, 4 -> 1
        let succs: Vec<SmallVec<[(usize, ()); 4]>> = vec![
            smallvec![(1, ())],
            smallvec![(2, ())],
            smallvec![(0, ()), (3, ())],
            smallvec![(3, ())],
            smallvec![(1, ())],
        ];
        let c = strongly_connected_components(&succs);
        assert_eq!(c[0], c[1]);
        assert_eq!(c[1], c[2]);
        assert_ne!(c[2], c[3]);
        assert_ne!(c[4], c[0]);
        assert_ne!(c[4], c[3]);
        assert!(c.iter().all(|&i| i < 3));
    }

    fn setup(doms: &mut Domains, clauses: &[(PredicateId, Formula)], extra: usize) -> Arc<Program> {
        let vocabulary = Vocabulary::propositional(&["p", "q", "r"]).unwrap();
        let program = Arc::new(Program::new(doms, vocabulary, clauses.len() + extra, 3));
        for (i, (head, body)) in clauses.iter().enumerate() {
            program.assign_clause(doms, i, *head, &[], body).unwrap();
        }
        program
    }

    #[test]
    fn test_negative_cycle() {
        let doms = &mut Domains::new();
        // p :- q.   q :- \+(p).
        let program = setup(doms, &[(0, Formula::atom(1)), (1, Formula::atom(0).negated())], 0);
        let negative = AcyclicityChecker::new(program.clone(), ForbidCycles::Negative);
        let all = AcyclicityChecker::new(program.clone(), ForbidCycles::All);
        let none = AcyclicityChecker::new(program, ForbidCycles::None);
        assert_eq!(negative.check(doms), Verdict::Violated);
        assert_eq!(
            negative.propagate(doms, &mut Vec::new()),
            Err(Contradiction::Violated(Violation::NegativeCycle(1)))
        );
        assert_eq!(all.check(doms), Verdict::Violated);
        assert_eq!(none.check(doms), Verdict::Satisfied);
    }

    #[test]
    fn test_positive_cycle() {
        let doms = &mut Domains::new();
        // p :- q.   q :- r.   r :- \+(\+(p)).
        let clauses = [
            (0, Formula::atom(1)),
            (1, Formula::atom(2)),
            (2, Formula::atom(0).negated().negated()),
        ];
        let program = setup(doms, &clauses, 0);
        let negative = AcyclicityChecker::new(program.clone(), ForbidCycles::Negative);
        assert_eq!(negative.check(doms), Verdict::Satisfied);
        assert_eq!(negative.propagate(doms, &mut Vec::new()), Ok(()));
        let all = AcyclicityChecker::new(program, ForbidCycles::All);
        assert!(matches!(
            all.propagate(doms, &mut Vec::new()),
            Err(Contradiction::Violated(Violation::Cycle(_)))
        ));
    }

    #[test]
    fn test_self_loop_and_partial_programs() {
        let doms = &mut Domains::new();
        let program = setup(doms, &[], 2);
        let all = AcyclicityChecker::new(program.clone(), ForbidCycles::All);
        assert_eq!(all.check(doms), Verdict::Undecided);

        // q :- r, p.   where neither r nor p is defined by a determined clause yet
        program
            .assign_clause(doms, 0, 1, &[], &Formula::And(vec![Formula::atom(2), Formula::atom(0)]))
            .unwrap();
        assert_eq!(all.check(doms), Verdict::Undecided);

        // p :- p.
        program.assign_clause(doms, 1, 0, &[], &Formula::atom(0)).unwrap();
        assert_eq!(all.check(doms), Verdict::Violated);
        let negative = AcyclicityChecker::new(program, ForbidCycles::Negative);
        assert_eq!(negative.check(doms), Verdict::Satisfied);
    }

    #[test]
    fn test_disabled_clauses_are_skipped() {
        let doms = &mut Domains::new();
        let program = setup(doms, &[(0, Formula::atom(1))], 1);
        program.disable_clause(doms, 1).unwrap();
        let all = AcyclicityChecker::new(program, ForbidCycles::All);
        assert_eq!(all.check(doms), Verdict::Satisfied);
    }

    #[test]
    fn test_empty_program_is_acyclic() {
        let doms = &mut Domains::new();
        let program = setup(doms, &[], 0);
        assert_eq!(program.num_clauses(), 0);
        assert!(program.all_determined(doms));
        for mode in [ForbidCycles::All, ForbidCycles::Negative] {
            let checker = AcyclicityChecker::new(program.clone(), mode);
            assert_eq!(checker.check(doms), Verdict::Satisfied);
            assert_eq!(checker.propagate(doms, &mut Vec::new()), Ok(()));
        }
    }
}
