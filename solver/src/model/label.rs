use std::fmt::{Display, Formatter};

use crate::core::IntCst;

/// Index of a predicate in the vocabulary of a program.
pub type PredicateId = usize;

/// Number of label values reserved for connectives and constants. Predicate `p` is encoded as `NUM_TOKENS + p`.
pub const NUM_TOKENS: IntCst = 4;

/// Binary (or n-ary) logical connective.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn symbol(self) -> &'static str {
        match self {
            Connective::And => ",",
            Connective::Or => ";",
        }
    }
}

impl Display for Connective {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Connective::And => write!(f, "AND"),
            Connective::Or => write!(f, "OR"),
        }
    }
}

/// Value carried by a node of a formula tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Label {
    Not,
    Connective(Connective),
    True,
    Predicate(PredicateId),
}

impl Label {
    pub const AND: Label = Label::Connective(Connective::And);
    pub const OR: Label = Label::Connective(Connective::Or);

    /// Encoding of the label as a value of a label cell.
    pub fn to_value(self) -> IntCst {
        match self {
            Label::Not => 0,
            Label::Connective(Connective::And) => 1,
            Label::Connective(Connective::Or) => 2,
            Label::True => 3,
            Label::Predicate(p) => NUM_TOKENS + p as IntCst,
        }
    }

    /// Decodes the value of a label cell. Negative values do not denote any label.
    pub fn from_value(value: IntCst) -> Option<Label> {
        match value {
            0 => Some(Label::Not),
            1 => Some(Label::AND),
            2 => Some(Label::OR),
            3 => Some(Label::True),
            v if v >= NUM_TOKENS => Some(Label::Predicate((v - NUM_TOKENS) as PredicateId)),
            _ => None,
        }
    }

    pub fn predicate(self) -> Option<PredicateId> {
        match self {
            Label::Predicate(p) => Some(p),
            _ => None,
        }
    }
}

/// Polarity of a predicate occurrence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Sign {
    Pos,
    Neg,
}

impl std::ops::Not for Sign {
    type Output = Sign;

    fn not(self) -> Sign {
        match self {
            Sign::Pos => Sign::Neg,
            Sign::Neg => Sign::Pos,
        }
    }
}

/// An occurrence of a predicate in a clause body, with the polarity obtained by folding all negations
/// on its path to the root.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SignedPredicate {
    pub predicate: PredicateId,
    pub sign: Sign,
}

impl SignedPredicate {
    pub fn new(predicate: PredicateId, sign: Sign) -> Self {
        SignedPredicate { predicate, sign }
    }

    pub fn is_negative(&self) -> bool {
        self.sign == Sign::Neg
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_label_encoding() {
        for label in [Label::Not, Label::AND, Label::OR, Label::True, Label::Predicate(0), Label::Predicate(5)] {
            assert_eq!(Label::from_value(label.to_value()), Some(label));
        }
        assert_eq!(Label::Predicate(2).to_value(), 6);
        assert_eq!(Label::from_value(-1), None);
        assert_eq!(!Sign::Pos, Sign::Neg);
        assert_eq!(!!Sign::Neg, Sign::Neg);
    }
}
