//! Consistency checkers over the dependency graph of a partially determined program.
//!
//! A checker is a pure function of the current domains: it computes a [Verdict] and may request the
//! removal of values that would inevitably lead to a violation. It never modifies the domains itself: the
//! [Propagators] hub applies the requested narrowings through the single mutation path of [Domains].

pub mod acyclicity;
pub mod condition;
pub mod conditional;
pub mod dependencies;
pub mod independence;
pub mod required;

pub use acyclicity::AcyclicityChecker;
pub use condition::Condition;
pub use conditional::ConditionalIndependenceChecker;
pub use independence::IndependenceChecker;
pub use required::RequiredFormulaChecker;

use tracing::instrument;

use crate::backtrack::{Backtrack, DecLvl, Trail};
use crate::collections::ref_store::RefVec;
use crate::core::{CellId, DomainView, Domains, IntCst, InvalidUpdate};
use crate::create_ref_type;
use crate::model::PredicateId;

/// Three-valued result of a consistency check against a partial assignment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Verdict {
    /// The property holds in every completion of the current assignment.
    Satisfied,
    /// The property fails in every completion of the current assignment.
    Violated,
    Undecided,
}

/// Request to remove `value` from the domain of `cell`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Narrowing {
    pub cell: CellId,
    pub value: IntCst,
}

/// Reason for which a checker rejects the current assignment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Violation {
    /// The dependency graph has a cycle through the given predicate.
    Cycle(PredicateId),
    /// The dependency graph has a cycle with a negative edge leaving the given predicate.
    NegativeCycle(PredicateId),
    /// Two predicates required to be independent both depend on the given predicate.
    SharedDependency(PredicateId),
    /// No clause contains the required formula.
    MissingFormula,
}

/// Signals that the current branch of the search is infeasible.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Contradiction {
    Violated(Violation),
    EmptyDomain(InvalidUpdate),
}

impl From<Violation> for Contradiction {
    fn from(v: Violation) -> Self {
        Contradiction::Violated(v)
    }
}

impl From<InvalidUpdate> for Contradiction {
    fn from(e: InvalidUpdate) -> Self {
        Contradiction::EmptyDomain(e)
    }
}

pub trait Checker: Send {
    /// Decides whether the property is entailed, refuted or still open for the current domains.
    fn check(&self, view: &dyn DomainView) -> Verdict;

    /// Pushes to `out` the value removals implied by the current domains.
    /// Returns an error if the property is already violated.
    fn propagate(&self, view: &dyn DomainView, out: &mut Vec<Narrowing>) -> Result<(), Contradiction>;

    fn clone_box(&self) -> Box<dyn Checker>;
}

impl Clone for Box<dyn Checker> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

create_ref_type!(CheckerId);

#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub num_rounds: u64,
    pub num_propagations: u64,
    pub num_narrowings: u64,
}

/// Runs a set of checkers to fixpoint over a [Domains] store.
///
/// A checker whose verdict becomes [Verdict::Satisfied] is closed: it is not run again until the decision
/// level at which it was closed is undone.
#[derive(Clone, Default)]
pub struct Propagators {
    checkers: RefVec<CheckerId, Box<dyn Checker>>,
    closed: RefVec<CheckerId, bool>,
    trail: Trail<CheckerId>,
    /// Scratch buffer for the narrowings of a single checker.
    requests: Vec<Narrowing>,
    pub stats: Stats,
}

impl Propagators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, checker: impl Checker + 'static) -> CheckerId {
        self.add_boxed(Box::new(checker))
    }

    pub fn add_boxed(&mut self, checker: Box<dyn Checker>) -> CheckerId {
        self.closed.push(false);
        self.checkers.push(checker)
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn is_closed(&self, id: CheckerId) -> bool {
        self.closed[id]
    }

    /// Runs all open checkers and applies their narrowings until no domain changes anymore.
    #[instrument(level = "trace", skip_all)]
    pub fn propagate(&mut self, doms: &mut Domains) -> Result<(), Contradiction> {
        loop {
            self.stats.num_rounds += 1;
            let mut changed = false;
            for id in self.checkers.keys() {
                if self.closed[id] {
                    continue;
                }
                let checker = &self.checkers[id];
                self.stats.num_propagations += 1;
                self.requests.clear();
                if let Err(contradiction) = checker.propagate(doms, &mut self.requests) {
                    tracing::debug!(checker = ?id, ?contradiction, "checker failed");
                    return Err(contradiction);
                }
                for &Narrowing { cell, value } in &self.requests {
                    tracing::trace!(checker = ?id, ?cell, value, "narrowing");
                    if doms.remove(cell, value)? {
                        self.stats.num_narrowings += 1;
                        changed = true;
                    }
                }
                if checker.check(doms) == Verdict::Satisfied {
                    tracing::trace!(checker = ?id, "checker entailed");
                    self.closed[id] = true;
                    self.trail.push(id);
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    /// Combined verdict of all checkers: violated if any is, satisfied if all are.
    pub fn check_all(&self, view: &dyn DomainView) -> Verdict {
        let mut result = Verdict::Satisfied;
        for (id, checker) in self.checkers.entries() {
            if self.closed[id] {
                continue;
            }
            match checker.check(view) {
                Verdict::Violated => return Verdict::Violated,
                Verdict::Undecided => result = Verdict::Undecided,
                Verdict::Satisfied => {}
            }
        }
        result
    }
}

impl Backtrack for Propagators {
    fn save_state(&mut self) -> DecLvl {
        self.trail.save_state()
    }

    fn num_saved(&self) -> u32 {
        self.trail.num_saved()
    }

    fn restore_last(&mut self) {
        let closed = &mut self.closed;
        self.trail.restore_last_with(|id| closed[id] = false);
    }
}
