use std::fmt::{Display, Formatter, Result};

use rand::Rng;

use crate::core::{CellId, DomainView};
use crate::model::body::ClauseBody;
use crate::model::label::{Label, PredicateId};
use crate::model::program::{Head, Program};

/// Probabilities attached to generated clauses. Certain clauses (probability 1) are over-represented.
pub const PROBABILITIES: [f64; 15] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];

/// Draws the probability annotation of a clause, `None` standing for a certain clause.
pub fn random_probability(rng: &mut impl Rng) -> Option<f64> {
    let p = PROBABILITIES[rng.random_range(0..PROBABILITIES.len())];
    (p < 1.0).then_some(p)
}

/// Textual representation of a program, one clause per line:
/// `head.`, `head :- body.` or `probability :: head :- body.`
///
/// Disabled clauses are omitted. Cells that are not determined yet are printed as `?`.
pub struct ProgramDisplay<'a> {
    program: &'a Program,
    view: &'a dyn DomainView,
    probabilities: Vec<Option<f64>>,
}

impl Program {
    pub fn display<'a>(&'a self, view: &'a dyn DomainView) -> ProgramDisplay<'a> {
        ProgramDisplay {
            program: self,
            view,
            probabilities: vec![None; self.num_clauses()],
        }
    }
}

impl ProgramDisplay<'_> {
    /// Attaches a probability to each clause (`None` for certain clauses).
    pub fn with_probabilities(mut self, probabilities: impl IntoIterator<Item = Option<f64>>) -> Self {
        for (slot, p) in self.probabilities.iter_mut().zip(probabilities) {
            *slot = p;
        }
        self
    }

    fn atom(&self, f: &mut Formatter<'_>, p: PredicateId, arguments: &[CellId]) -> Result {
        let vocabulary = self.program.vocabulary();
        write!(f, "{}", vocabulary.predicate_name(p))?;
        let arity = vocabulary.arity(p);
        if arity == 0 {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, &arg) in arguments.iter().take(arity).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.view.value(arg).and_then(|t| vocabulary.term_name(t as usize)) {
                Some(name) => write!(f, "{name}")?,
                None => write!(f, "?")?,
            }
        }
        write!(f, ")")
    }

    fn tree(&self, f: &mut Formatter<'_>, body: &ClauseBody, node: usize) -> Result {
        match body.determined_label(self.view, node) {
            None => write!(f, "?"),
            Some(Label::True) => Ok(()),
            Some(Label::Predicate(p)) => self.atom(f, p, body.arguments(node)),
            Some(Label::Not) => {
                write!(f, "\\+(")?;
                if let Some(child) = body.first_child(self.view, node) {
                    self.tree(f, body, child)?;
                }
                write!(f, ")")
            }
            Some(Label::Connective(c)) => {
                for (i, child) in body.children(self.view, node).enumerate() {
                    if i > 0 {
                        write!(f, "{} ", c.symbol())?;
                    }
                    write!(f, "(")?;
                    self.tree(f, body, child)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for ProgramDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for clause in 0..self.program.num_clauses() {
            let head = match self.program.determined_head(self.view, clause) {
                Some(Head::Disabled) => continue,
                Some(Head::Predicate(p)) => Some(p),
                None => None,
            };
            if let Some(p) = self.probabilities[clause] {
                write!(f, "{p} :: ")?;
            }
            match head {
                Some(p) => self.atom(f, p, self.program.head_arguments(clause))?,
                None => write!(f, "?")?,
            }
            let body = self.program.body(clause);
            if body.determined_label(self.view, 0) != Some(Label::True) {
                write!(f, " :- ")?;
                self.tree(f, body, 0)?;
            }
            writeln!(f, ".")?;
        }
        Ok(())
    }
}
