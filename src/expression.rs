//! Boolean formulas over plugin-version variables
//!
//! An [`Expression`] is an immutable tree. Substitution with [`Expression::replace`]
//! builds a new tree and never touches the original, so one compiled formula can be
//! shared freely between searches.
//!
//! # Examples
//!
//! ```
//! use unrealpm_resolver::{Expression, SelectedVersion};
//! use semver::Version;
//!
//! let a = SelectedVersion::new("A", Version::new(1, 0, 0));
//! let b = SelectedVersion::new("B", Version::new(1, 0, 0));
//! let formula = Expression::implies(Expression::var(a.clone()), Expression::var(b.clone()));
//!
//! assert_eq!(formula.free().len(), 2);
//! let ground = formula.replace(&a, true).replace(&b, false);
//! assert!(!ground.evaluate());
//! ```

use crate::version::SelectedVersion;
use std::collections::BTreeSet;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Literal(bool),
    Var(SelectedVersion),
    Not(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Implies(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn var(selected: SelectedVersion) -> Self {
        Expression::Var(selected)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    pub fn and(terms: Vec<Expression>) -> Self {
        Expression::And(terms)
    }

    pub fn or(terms: Vec<Expression>) -> Self {
        Expression::Or(terms)
    }

    pub fn implies(p: Expression, q: Expression) -> Self {
        Expression::Implies(Box::new(p), Box::new(q))
    }

    /// Variables that are still unbound anywhere in this tree
    pub fn free(&self) -> BTreeSet<SelectedVersion> {
        let mut vars = BTreeSet::new();
        self.collect_free(&mut vars);
        vars.into_iter().cloned().collect()
    }

    /// The greatest unbound variable, the one the solver branches on next
    pub fn greatest_free(&self) -> Option<&SelectedVersion> {
        let mut vars = BTreeSet::new();
        self.collect_free(&mut vars);
        vars.pop_last()
    }

    fn collect_free<'a>(&'a self, vars: &mut BTreeSet<&'a SelectedVersion>) {
        match self {
            Expression::Literal(_) => {}
            Expression::Var(v) => {
                vars.insert(v);
            }
            Expression::Not(e) => e.collect_free(vars),
            Expression::And(terms) | Expression::Or(terms) => {
                for term in terms {
                    term.collect_free(vars);
                }
            }
            Expression::Implies(p, q) => {
                p.collect_free(vars);
                q.collect_free(vars);
            }
        }
    }

    /// Truth value of a ground formula
    ///
    /// # Panics
    ///
    /// Panics if a variable is still unbound. The compiler and solver only evaluate
    /// ground formulas, so reaching an unbound variable is a logic error.
    pub fn evaluate(&self) -> bool {
        match self {
            Expression::Literal(value) => *value,
            Expression::Var(v) => panic!("the variable {} has not been replaced", v.variable_name()),
            Expression::Not(e) => !e.evaluate(),
            Expression::And(terms) => terms.iter().all(Expression::evaluate),
            Expression::Or(terms) => terms.iter().any(Expression::evaluate),
            Expression::Implies(p, q) => !p.evaluate() || q.evaluate(),
        }
    }

    /// Three-valued evaluation of a partially bound formula
    ///
    /// Returns `None` when the outcome still depends on unbound variables.
    pub fn partial_evaluate(&self) -> Option<bool> {
        match self {
            Expression::Literal(value) => Some(*value),
            Expression::Var(_) => None,
            Expression::Not(e) => e.partial_evaluate().map(|b| !b),
            Expression::And(terms) => {
                let mut known = true;
                for term in terms {
                    match term.partial_evaluate() {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => known = false,
                    }
                }
                known.then_some(true)
            }
            Expression::Or(terms) => {
                let mut known = true;
                for term in terms {
                    match term.partial_evaluate() {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => known = false,
                    }
                }
                known.then_some(false)
            }
            Expression::Implies(p, q) => match (p.partial_evaluate(), q.partial_evaluate()) {
                (Some(false), _) | (_, Some(true)) => Some(true),
                (Some(true), Some(false)) => Some(false),
                _ => None,
            },
        }
    }

    /// New tree with every occurrence of `var` replaced by `value`
    pub fn replace(&self, var: &SelectedVersion, value: bool) -> Expression {
        match self {
            Expression::Literal(b) => Expression::Literal(*b),
            Expression::Var(v) if v == var => Expression::Literal(value),
            Expression::Var(v) => Expression::Var(v.clone()),
            Expression::Not(e) => Expression::not(e.replace(var, value)),
            Expression::And(terms) => {
                Expression::And(terms.iter().map(|t| t.replace(var, value)).collect())
            }
            Expression::Or(terms) => {
                Expression::Or(terms.iter().map(|t| t.replace(var, value)).collect())
            }
            Expression::Implies(p, q) => {
                Expression::implies(p.replace(var, value), q.replace(var, value))
            }
        }
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        1 + match self {
            Expression::Literal(_) | Expression::Var(_) => 0,
            Expression::Not(e) => e.size(),
            Expression::And(terms) | Expression::Or(terms) => terms.iter().map(Expression::size).sum(),
            Expression::Implies(p, q) => p.size() + q.size(),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(b) => write!(f, "{}", b),
            Expression::Var(v) => f.write_str(&v.variable_name()),
            Expression::Not(e) => write!(f, "!{}", e),
            Expression::And(terms) => write_joined(f, terms, " && "),
            Expression::Or(terms) => write_joined(f, terms, " || "),
            Expression::Implies(p, q) => write!(f, "({} => {})", p, q),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[Expression], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", term)?;
    }
    f.write_str(")")
}
