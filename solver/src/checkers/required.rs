use std::sync::Arc;

use crate::checkers::condition::Condition;
use crate::checkers::{Checker, Contradiction, Narrowing, Verdict, Violation};
use crate::core::DomainView;
use crate::model::{Head, Program};

/// Requires the body of at least one enabled clause to contain the formula.
#[derive(Clone)]
pub struct RequiredFormulaChecker {
    program: Arc<Program>,
    formula: Condition,
}

impl RequiredFormulaChecker {
    pub fn new(program: Arc<Program>, formula: Condition) -> Self {
        RequiredFormulaChecker { program, formula }
    }
}

impl Checker for RequiredFormulaChecker {
    fn check(&self, view: &dyn DomainView) -> Verdict {
        let mut all_determined = true;
        for clause in 0..self.program.num_clauses() {
            if !self.program.is_clause_determined(view, clause) {
                all_determined = false;
            } else if self.program.determined_head(view, clause) != Some(Head::Disabled)
                && self.formula.occurs_in(self.program.body(clause), view)
            {
                return Verdict::Satisfied;
            }
        }
        if all_determined {
            Verdict::Violated
        } else {
            Verdict::Undecided
        }
    }

    fn propagate(&self, view: &dyn DomainView, _out: &mut Vec<Narrowing>) -> Result<(), Contradiction> {
        match self.check(view) {
            Verdict::Violated => Err(Violation::MissingFormula.into()),
            _ => Ok(()),
        }
    }

    fn clone_box(&self) -> Box<dyn Checker> {
        Box::new(self.clone())
    }
}
