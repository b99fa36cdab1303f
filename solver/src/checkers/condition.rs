use fixedbitset::FixedBitSet;
use smallvec::SmallVec;

use crate::config::ConfigError;
use crate::core::DomainView;
use crate::model::{ClauseBody, Connective, Label, PredicateId, Vocabulary};

/// A group of sibling predicates under a connective, e.g. `(q, r)` for `AND(q, r)`.
///
/// The condition occurs at a node labelled with the connective if, for each of its predicates, a distinct
/// direct child of the node is labelled with it. Other children of the node are allowed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Condition {
    connective: Connective,
    predicates: Vec<PredicateId>,
}

impl Condition {
    pub fn new(
        connective: Connective,
        predicates: Vec<PredicateId>,
        vocabulary: &Vocabulary,
    ) -> Result<Condition, ConfigError> {
        if predicates.is_empty() {
            return Err(ConfigError::EmptyCondition);
        }
        if let Some(&p) = predicates.iter().find(|&&p| p >= vocabulary.num_predicates()) {
            return Err(ConfigError::UnknownPredicate(format!("#{p}")));
        }
        Ok(Condition {
            connective,
            predicates,
        })
    }

    /// Builds a condition from its textual operator (`AND` or `OR`) and predicate names.
    pub fn parse(operator: &str, predicates: &[&str], vocabulary: &Vocabulary) -> Result<Condition, ConfigError> {
        let connective = operator.parse()?;
        let predicates = predicates
            .iter()
            .map(|name| vocabulary.resolve(name))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(connective, predicates, vocabulary)
    }

    pub fn connective(&self) -> Connective {
        self.connective
    }

    pub fn predicates(&self) -> &[PredicateId] {
        &self.predicates
    }

    /// If the condition occurs at `root`, returns the children matched with its predicates.
    fn match_at(&self, body: &ClauseBody, view: &dyn DomainView, root: usize) -> Option<SmallVec<[usize; 4]>> {
        if body.determined_label(view, root) != Some(Label::Connective(self.connective)) {
            return None;
        }
        let mut found: SmallVec<[bool; 4]> = SmallVec::from_elem(false, self.predicates.len());
        let mut matched = SmallVec::new();
        for child in body.children(view, root) {
            let Some(p) = body.determined_label(view, child).and_then(Label::predicate) else {
                continue;
            };
            let target = (0..self.predicates.len()).find(|&t| !found[t] && self.predicates[t] == p);
            if let Some(t) = target {
                found[t] = true;
                matched.push(child);
            }
        }
        found.iter().all(|&f| f).then_some(matched)
    }

    /// Nodes of the body whose occurrence is explained by some occurrence of the condition.
    pub fn masked_nodes(&self, body: &ClauseBody, view: &dyn DomainView) -> FixedBitSet {
        let mut masked = FixedBitSet::with_capacity(body.num_nodes());
        for root in 0..body.num_nodes() {
            if let Some(nodes) = self.match_at(body, view, root) {
                for n in nodes {
                    masked.insert(n);
                }
            }
        }
        masked
    }

    /// Returns true if the condition occurs somewhere in the determined part of the body.
    pub fn occurs_in(&self, body: &ClauseBody, view: &dyn DomainView) -> bool {
        (0..body.num_nodes()).any(|root| self.match_at(body, view, root).is_some())
    }
}
