//! Typed configuration of a generation problem, validated against the vocabulary before any cell is created.

use std::str::FromStr;
use std::sync::Arc;

use itertools::Itertools;
use thiserror::Error;

use crate::checkers::{
    AcyclicityChecker, Condition, ConditionalIndependenceChecker, IndependenceChecker, Propagators,
    RequiredFormulaChecker,
};
use crate::core::Domains;
use crate::model::{Connective, PredicateId, Program, Vocabulary};

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
    #[error("unknown predicate `{0}`")]
    UnknownPredicate(String),
    #[error("predicate `{0}` is declared more than once")]
    DuplicatePredicate(String),
    #[error("invalid operator `{0}`, expected AND or OR")]
    InvalidOperator(String),
    #[error("invalid cycle mode `{0}`, expected NONE, NEGATIVE or ALL")]
    InvalidCycleMode(String),
    #[error("a formula must mention at least one predicate")]
    EmptyCondition,
    #[error("predicate `{0}` cannot be independent of itself")]
    SelfIndependence(String),
    #[error("independence of `{0}` and `{1}` is required more than once")]
    DuplicatePair(String, String),
    #[error("{clauses} clauses cannot define all {predicates} predicates")]
    NotEnoughClauses { clauses: usize, predicates: usize },
    #[error("clause bodies need at least one node")]
    NoNodes,
}

/// Which cycles of the dependency graph are forbidden.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ForbidCycles {
    #[default]
    None,
    /// Only cycles going through a negated occurrence.
    Negative,
    All,
}

impl FromStr for ForbidCycles {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(ForbidCycles::None),
            "NEGATIVE" => Ok(ForbidCycles::Negative),
            "ALL" => Ok(ForbidCycles::All),
            _ => Err(ConfigError::InvalidCycleMode(s.to_string())),
        }
    }
}

impl FromStr for Connective {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Connective::And),
            "OR" => Ok(Connective::Or),
            _ => Err(ConfigError::InvalidOperator(s.to_string())),
        }
    }
}

/// A connective applied to a group of predicates, as written in a configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormulaSpec {
    pub operator: String,
    pub predicates: Vec<String>,
}

impl FormulaSpec {
    pub fn new(operator: impl Into<String>, predicates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        FormulaSpec {
            operator: operator.into(),
            predicates: predicates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn resolve(&self, vocabulary: &Vocabulary) -> Result<Condition, ConfigError> {
        let predicates = self.predicates.iter().map(String::as_str).collect_vec();
        Condition::parse(&self.operator, &predicates, vocabulary)
    }
}

/// Two predicates that must not share any dependency, possibly once the edges explained by a condition are
/// ignored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndependentPair {
    pub first: String,
    pub second: String,
    pub condition: Option<FormulaSpec>,
}

impl IndependentPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        IndependentPair {
            first: first.into(),
            second: second.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: FormulaSpec) -> Self {
        self.condition = Some(condition);
        self
    }

    fn resolve(&self, vocabulary: &Vocabulary) -> Result<(PredicateId, PredicateId), ConfigError> {
        Ok((vocabulary.resolve(&self.first)?, vocabulary.resolve(&self.second)?))
    }
}

/// Description of the programs to generate.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Number of node slots of every clause body.
    pub max_num_nodes: usize,
    pub max_num_clauses: usize,
    pub forbid_cycles: ForbidCycles,
    /// If set, there must be at least one clause per predicate.
    pub define_each_predicate: bool,
    /// Predicate names with their arities.
    pub predicates: Vec<(String, usize)>,
    pub variables: Vec<String>,
    pub constants: Vec<String>,
    pub independent_pairs: Vec<IndependentPair>,
    pub required_formula: Option<FormulaSpec>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_num_nodes: 1,
            max_num_clauses: 1,
            forbid_cycles: ForbidCycles::None,
            define_each_predicate: true,
            predicates: Vec::new(),
            variables: Vec::new(),
            constants: Vec::new(),
            independent_pairs: Vec::new(),
            required_formula: None,
        }
    }
}

impl GeneratorConfig {
    pub fn vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        Vocabulary::new(
            self.predicates.iter().map(|(name, arity)| (name.as_str(), *arity)),
            &self.variables,
            &self.constants,
        )
    }

    /// Allocates the cells of the program in `doms` and creates one checker per configured property.
    ///
    /// The whole configuration is validated first: on error, `doms` is left untouched.
    pub fn instantiate(&self, doms: &mut Domains) -> Result<(Arc<Program>, Propagators), ConfigError> {
        let vocabulary = self.vocabulary()?;
        if self.max_num_nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        if self.define_each_predicate && self.max_num_clauses < vocabulary.num_predicates() {
            return Err(ConfigError::NotEnoughClauses {
                clauses: self.max_num_clauses,
                predicates: vocabulary.num_predicates(),
            });
        }

        let mut pairs = Vec::with_capacity(self.independent_pairs.len());
        for pair in &self.independent_pairs {
            let (p1, p2) = pair.resolve(&vocabulary)?;
            if p1 == p2 {
                return Err(ConfigError::SelfIndependence(pair.first.clone()));
            }
            let condition = pair.condition.as_ref().map(|c| c.resolve(&vocabulary)).transpose()?;
            pairs.push((p1, p2, condition));
        }
        for ((a1, a2, ca), (b1, b2, cb)) in pairs.iter().tuple_combinations() {
            let same_predicates = (a1, a2) == (b1, b2) || (a1, a2) == (b2, b1);
            if same_predicates && ca == cb {
                return Err(ConfigError::DuplicatePair(
                    vocabulary.predicate_name(*a1).to_string(),
                    vocabulary.predicate_name(*a2).to_string(),
                ));
            }
        }
        let required = self
            .required_formula
            .as_ref()
            .map(|f| f.resolve(&vocabulary))
            .transpose()?;

        let program = Arc::new(Program::new(doms, vocabulary, self.max_num_clauses, self.max_num_nodes));
        tracing::debug!(
            clauses = program.num_clauses(),
            predicates = program.num_predicates(),
            cells = doms.num_cells(),
            "program allocated"
        );

        let mut propagators = Propagators::new();
        if self.forbid_cycles != ForbidCycles::None {
            propagators.add(AcyclicityChecker::new(program.clone(), self.forbid_cycles));
        }
        for (p1, p2, condition) in pairs {
            match condition {
                None => propagators.add(IndependenceChecker::new(program.clone(), p1, p2)?),
                Some(condition) => {
                    propagators.add(ConditionalIndependenceChecker::new(program.clone(), p1, p2, condition)?)
                }
            };
        }
        if let Some(formula) = required {
            propagators.add(RequiredFormulaChecker::new(program.clone(), formula));
        }
        Ok((program, propagators))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            max_num_nodes: 3,
            max_num_clauses: 3,
            forbid_cycles: "NEGATIVE".parse().unwrap(),
            predicates: vec![("p".to_string(), 1), ("q".to_string(), 1), ("r".to_string(), 0)],
            variables: vec!["X".to_string()],
            independent_pairs: vec![
                IndependentPair::new("p", "q"),
                IndependentPair::new("p", "q").with_condition(FormulaSpec::new("AND", ["r"])),
            ],
            required_formula: Some(FormulaSpec::new("OR", ["q", "r"])),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("ALL".parse::<ForbidCycles>(), Ok(ForbidCycles::All));
        assert_eq!("NONE".parse::<ForbidCycles>(), Ok(ForbidCycles::None));
        assert_eq!(
            "all".parse::<ForbidCycles>(),
            Err(ConfigError::InvalidCycleMode("all".to_string()))
        );
        assert_eq!("OR".parse::<Connective>(), Ok(Connective::Or));
        assert_eq!(
            "NOT".parse::<Connective>(),
            Err(ConfigError::InvalidOperator("NOT".to_string()))
        );
    }

    #[test]
    fn test_instantiate() {
        let doms = &mut Domains::new();
        let (program, propagators) = config().instantiate(doms).unwrap();
        assert_eq!(program.num_clauses(), 3);
        assert_eq!(program.num_predicates(), 3);
        // acyclicity, two independence checkers and the required formula
        assert_eq!(propagators.len(), 4);
        assert!(doms.num_cells() > 0);
    }

    #[test]
    fn test_invalid_configs_allocate_nothing() {
        let doms = &mut Domains::new();
        let check = |config: GeneratorConfig, doms: &mut Domains| config.instantiate(doms).map(|_| ()).unwrap_err();

        let mut c = config();
        c.independent_pairs.push(IndependentPair::new("p", "s"));
        assert_eq!(check(c, doms), ConfigError::UnknownPredicate("s".to_string()));

        let mut c = config();
        c.required_formula = Some(FormulaSpec::new("XOR", ["q"]));
        assert_eq!(check(c, doms), ConfigError::InvalidOperator("XOR".to_string()));

        let mut c = config();
        c.required_formula = Some(FormulaSpec::new("AND", Vec::<String>::new()));
        assert_eq!(check(c, doms), ConfigError::EmptyCondition);

        let mut c = config();
        c.independent_pairs.push(IndependentPair::new("q", "p"));
        assert_eq!(check(c, doms), ConfigError::DuplicatePair("p".to_string(), "q".to_string()));

        let mut c = config();
        c.independent_pairs.push(IndependentPair::new("r", "r"));
        assert_eq!(check(c, doms), ConfigError::SelfIndependence("r".to_string()));

        let mut c = config();
        c.max_num_clauses = 2;
        assert_eq!(
            check(c, doms),
            ConfigError::NotEnoughClauses {
                clauses: 2,
                predicates: 3
            }
        );

        let mut c = config();
        c.max_num_nodes = 0;
        assert_eq!(check(c, doms), ConfigError::NoNodes);

        let mut c = config();
        c.predicates.push(("q".to_string(), 0));
        assert_eq!(check(c, doms), ConfigError::DuplicatePredicate("q".to_string()));

        assert_eq!(doms.num_cells(), 0);
    }
}
