use std::sync::Arc;

use crate::checkers::condition::Condition;
use crate::checkers::dependencies::{dependencies, Closure};
use crate::checkers::independence::{overlap, validate_pair, verdict, Overlap};
use crate::checkers::{Checker, Contradiction, Narrowing, Verdict, Violation};
use crate::config::ConfigError;
use crate::core::DomainView;
use crate::graph::DependencyGraph;
use crate::model::{PredicateId, Program};

/// Requires `first` and `second` to be independent once the body occurrences explained by `condition` are
/// ignored.
///
/// The masked graph is only known from determined clauses, so no edge can be pruned: the checker only detects
/// violations.
#[derive(Clone)]
pub struct ConditionalIndependenceChecker {
    program: Arc<Program>,
    first: PredicateId,
    second: PredicateId,
    condition: Condition,
}

impl ConditionalIndependenceChecker {
    pub fn new(
        program: Arc<Program>,
        first: PredicateId,
        second: PredicateId,
        condition: Condition,
    ) -> Result<Self, ConfigError> {
        validate_pair(&program, first, second)?;
        Ok(ConditionalIndependenceChecker {
            program,
            first,
            second,
            condition,
        })
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    fn overlap(&self, view: &dyn DomainView) -> Overlap {
        let graph = DependencyGraph::extract_masked(&self.program, view, &self.condition);
        let first = dependencies(&graph, self.first, Closure::Entailment);
        let second = dependencies(&graph, self.second, Closure::Entailment);
        overlap(&first, &second)
    }
}

impl Checker for ConditionalIndependenceChecker {
    fn check(&self, view: &dyn DomainView) -> Verdict {
        verdict(self.overlap(view), &self.program, view)
    }

    fn propagate(&self, view: &dyn DomainView, _out: &mut Vec<Narrowing>) -> Result<(), Contradiction> {
        match self.overlap(view) {
            Overlap::Determined(p) => {
                tracing::trace!(
                    first = self.first,
                    second = self.second,
                    shared = p,
                    "conditional independence violated"
                );
                Err(Violation::SharedDependency(p).into())
            }
            _ => Ok(()),
        }
    }

    fn clone_box(&self) -> Box<dyn Checker> {
        Box::new(self.clone())
    }
}
