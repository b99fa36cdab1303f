use smallvec::SmallVec;

use crate::core::{CellId, DomainView, Domains, IntCst, InvalidUpdate};
use crate::model::label::{Connective, Label, PredicateId, Sign, SignedPredicate};

/// The body of a clause, represented as a tree over a fixed number of node slots.
///
/// Node `i` is described by three kinds of cells:
///  - `parents[i]`: index of its parent node. The root is node 0 and is its own parent.
///  - `labels[i]`: the encoded [Label] of the node.
///  - `arguments[i]`: the terms of the node, only meaningful when it is labelled with a predicate.
///
/// When fully determined, nodes that are not part of the tree are self-loops labelled with `TRUE`.
/// Until then, any cell may still hold several candidates and the structure may not be a tree yet.
#[derive(Clone, Debug)]
pub struct ClauseBody {
    parents: Vec<CellId>,
    labels: Vec<CellId>,
    arguments: Vec<SmallVec<[CellId; 4]>>,
    /// Value of an argument cell that is not used by the predicate of its node.
    unused_term: IntCst,
}

impl ClauseBody {
    /// Allocates the cells of a body with `num_nodes` slots, with unconstrained domains.
    pub fn allocate(
        doms: &mut Domains,
        num_nodes: usize,
        num_predicates: usize,
        max_arity: usize,
        num_terms: usize,
    ) -> ClauseBody {
        assert!(num_nodes > 0, "a body needs at least a root node");
        let max_label = Label::Predicate(num_predicates).to_value() - 1;
        let unused_term = num_terms as IntCst;
        let mut parents = Vec::with_capacity(num_nodes);
        let mut labels = Vec::with_capacity(num_nodes);
        let mut arguments = Vec::with_capacity(num_nodes);
        for i in 0..num_nodes {
            if i == 0 {
                parents.push(doms.new_fixed(0));
            } else {
                parents.push(doms.new_cell_range(0, num_nodes as IntCst - 1));
            }
            labels.push(doms.new_cell_range(0, max_label));
            arguments.push((0..max_arity).map(|_| doms.new_cell_range(0, unused_term)).collect());
        }
        ClauseBody {
            parents,
            labels,
            arguments,
            unused_term,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.parents.len()
    }

    /// Parent cell of every node.
    pub fn tree_structure(&self) -> &[CellId] {
        &self.parents
    }

    /// Label cell of every node.
    pub fn tree_labels(&self) -> &[CellId] {
        &self.labels
    }

    pub fn arguments(&self, node: usize) -> &[CellId] {
        &self.arguments[node]
    }

    pub fn unused_term(&self) -> IntCst {
        self.unused_term
    }

    /// All cells that define the shape and labels of the tree (arguments excluded).
    pub fn structural_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.parents.iter().chain(self.labels.iter()).copied()
    }

    pub fn determined_parent(&self, view: &dyn DomainView, node: usize) -> Option<usize> {
        view.value(self.parents[node]).map(|p| p as usize)
    }

    pub fn determined_label(&self, view: &dyn DomainView, node: usize) -> Option<Label> {
        view.value(self.labels[node]).and_then(Label::from_value)
    }

    /// Returns true if every parent and label cell is determined.
    pub fn all_determined(&self, view: &dyn DomainView) -> bool {
        self.structural_cells().all(|c| view.is_singleton(c))
    }

    /// Nodes (other than `parent` itself) whose parent is determined to be `parent`, in increasing order.
    pub fn children<'a>(&'a self, view: &'a dyn DomainView, parent: usize) -> impl Iterator<Item = usize> + 'a {
        (0..self.num_nodes()).filter(move |&i| i != parent && self.determined_parent(view, i) == Some(parent))
    }

    /// The least node whose parent is determined to be `parent`, if any.
    pub fn first_child(&self, view: &dyn DomainView, parent: usize) -> Option<usize> {
        self.children(view, parent).next()
    }

    /// Returns true if some label cell may still take the value of predicate `p`.
    pub fn may_contain(&self, view: &dyn DomainView, p: PredicateId) -> bool {
        let value = Label::Predicate(p).to_value();
        self.labels.iter().any(|&l| view.contains(l, value))
    }

    /// Nodes whose label is determined to be a predicate, together with that predicate.
    pub fn predicate_nodes<'a>(
        &'a self,
        view: &'a dyn DomainView,
    ) -> impl Iterator<Item = (usize, PredicateId)> + 'a {
        (0..self.num_nodes()).filter_map(move |i| Some((i, self.determined_label(view, i)?.predicate()?)))
    }

    /// Collects the predicates appearing in the tree, each with its polarity after folding the negations
    /// on its path to the root.
    ///
    /// The traversal only follows determined cells. On a partially determined tree (e.g. a `NOT` node whose
    /// child is not known yet) the result is partial rather than an error.
    pub fn signed_predicates(&self, view: &dyn DomainView) -> Vec<SignedPredicate> {
        let mut result = Vec::new();
        let mut stack = vec![(0usize, Sign::Pos)];
        while let Some((node, sign)) = stack.pop() {
            match self.determined_label(view, node) {
                None | Some(Label::True) => {}
                Some(Label::Predicate(p)) => result.push(SignedPredicate::new(p, sign)),
                Some(Label::Not) => {
                    if let Some(child) = self.first_child(view, node) {
                        stack.push((child, !sign));
                    }
                }
                Some(Label::Connective(_)) => {
                    // reversed so that children are visited in increasing order
                    let children: SmallVec<[usize; 8]> = self.children(view, node).collect();
                    stack.extend(children.into_iter().rev().map(|c| (c, sign)));
                }
            }
        }
        result
    }

    /// Fixes all cells of the body to encode `formula`: nodes are numbered in depth-first order from the root
    /// and unused slots become `TRUE` self-loops.
    pub fn assign(&self, doms: &mut Domains, formula: &Formula) -> Result<(), InvalidUpdate> {
        let encoded = formula.encode();
        assert!(
            encoded.len() <= self.num_nodes(),
            "formula needs {} nodes but the body only has {}",
            encoded.len(),
            self.num_nodes()
        );
        for i in 0..self.num_nodes() {
            let (parent, label, args) = match encoded.get(i) {
                Some(node) => (node.parent, node.label, node.args.as_slice()),
                None => (i, Label::True, [].as_slice()),
            };
            doms.fix(self.parents[i], parent as IntCst)?;
            doms.fix(self.labels[i], label.to_value())?;
            for (k, &cell) in self.arguments[i].iter().enumerate() {
                let term = args.get(k).map_or(self.unused_term, |&t| t as IntCst);
                doms.fix(cell, term)?;
            }
        }
        Ok(())
    }
}

/// A fully specified formula, used to describe the intended content of a clause body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Formula {
    True,
    /// A predicate applied to terms (indices into the variables followed by the constants).
    Atom(PredicateId, Vec<usize>),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

struct EncodedNode {
    parent: usize,
    label: Label,
    args: Vec<usize>,
}

impl Formula {
    /// A predicate without arguments.
    pub fn atom(p: PredicateId) -> Formula {
        Formula::Atom(p, Vec::new())
    }

    pub fn negated(self) -> Formula {
        Formula::Not(Box::new(self))
    }

    pub fn num_nodes(&self) -> usize {
        self.encode().len()
    }

    fn encode(&self) -> Vec<EncodedNode> {
        let mut nodes = Vec::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((f, parent)) = stack.pop() {
            let id = nodes.len();
            let (label, args) = match f {
                Formula::True => (Label::True, Vec::new()),
                Formula::Atom(p, args) => (Label::Predicate(*p), args.clone()),
                Formula::Not(sub) => {
                    stack.push((sub, id));
                    (Label::Not, Vec::new())
                }
                Formula::And(subs) | Formula::Or(subs) => {
                    assert!(subs.len() >= 2, "connectives need at least two operands");
                    stack.extend(subs.iter().rev().map(|s| (s, id)));
                    let connective = match f {
                        Formula::And(_) => Connective::And,
                        _ => Connective::Or,
                    };
                    (Label::Connective(connective), Vec::new())
                }
            };
            nodes.push(EncodedNode { parent, label, args });
        }
        nodes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body(doms: &mut Domains, num_nodes: usize) -> ClauseBody {
        ClauseBody::allocate(doms, num_nodes, 3, 1, 2)
    }

    fn signs(body: &ClauseBody, doms: &Domains) -> Vec<(PredicateId, Sign)> {
        body.signed_predicates(doms).iter().map(|sp| (sp.predicate, sp.sign)).collect()
    }

    #[test]
    fn test_double_negation_cancels() {
        let doms = &mut Domains::new();
        let b = body(doms, 4);
        b.assign(doms, &Formula::atom(1).negated().negated()).unwrap();
        assert!(b.all_determined(doms));
        assert_eq!(signs(&b, doms), vec![(1, Sign::Pos)]);
    }

    #[test]
    fn test_single_negation() {
        let doms = &mut Domains::new();
        let b = body(doms, 3);
        b.assign(doms, &Formula::atom(1).negated()).unwrap();
        assert_eq!(signs(&b, doms), vec![(1, Sign::Neg)]);
        assert_eq!(b.first_child(doms, 0), Some(1));
        assert_eq!(b.first_child(doms, 1), None);
    }

    #[test]
    fn test_connectives_concatenate() {
        let doms = &mut Domains::new();
        let b = body(doms, 6);
        let f = Formula::Or(vec![
            Formula::atom(0),
            Formula::And(vec![Formula::atom(2).negated(), Formula::atom(0)]),
        ]);
        assert_eq!(f.num_nodes(), 6);
        b.assign(doms, &f).unwrap();
        assert_eq!(
            signs(&b, doms),
            vec![(0, Sign::Pos), (2, Sign::Neg), (0, Sign::Pos)]
        );
        assert_eq!(b.children(doms, 0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.predicate_nodes(doms).map(|(_, p)| p).collect::<Vec<_>>(), vec![0, 2, 0]);
    }

    #[test]
    fn test_true_body_and_padding() {
        let doms = &mut Domains::new();
        let b = body(doms, 3);
        b.assign(doms, &Formula::True).unwrap();
        assert!(signs(&b, doms).is_empty());
        assert_eq!(b.determined_parent(doms, 2), Some(2));
        assert_eq!(b.determined_label(doms, 2), Some(Label::True));
        assert_eq!(doms.value(b.arguments(1)[0]), Some(b.unused_term()));
    }

    #[test]
    fn test_partial_tree_degrades() {
        let doms = &mut Domains::new();
        let b = body(doms, 3);
        assert!(!b.all_determined(doms));
        assert!(b.signed_predicates(doms).is_empty());

        // a NOT at the root without any resolved child
        doms.fix(b.tree_labels()[0], Label::Not.to_value()).unwrap();
        assert!(b.signed_predicates(doms).is_empty());

        // once a child is known, its predicate is visible even if other nodes are still open
        doms.fix(b.tree_structure()[1], 0).unwrap();
        doms.fix(b.tree_labels()[1], Label::Predicate(2).to_value()).unwrap();
        assert_eq!(signs(&b, doms), vec![(2, Sign::Neg)]);
        assert!(!b.all_determined(doms));
        assert!(b.may_contain(doms, 0));
    }

    #[test]
    fn test_detached_nodes_are_ignored() {
        let doms = &mut Domains::new();
        let b = body(doms, 3);
        doms.fix(b.tree_labels()[0], Label::AND.to_value()).unwrap();
        // nodes 1 and 2 are each other's parent, which the tree constraint would eventually reject
        doms.fix(b.tree_structure()[1], 2).unwrap();
        doms.fix(b.tree_structure()[2], 1).unwrap();
        doms.fix(b.tree_labels()[1], Label::Predicate(0).to_value()).unwrap();
        doms.fix(b.tree_labels()[2], Label::Predicate(1).to_value()).unwrap();
        assert!(b.all_determined(doms));
        assert!(b.signed_predicates(doms).is_empty());
        assert_eq!(b.predicate_nodes(doms).count(), 2);
    }
}
