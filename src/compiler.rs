//! Constraint compilation
//!
//! Turns a [`CandidateSet`] into a single conjunction of clauses:
//!
//! - the root clause, forcing one surviving root version
//! - one implication per dependency edge of every surviving version
//! - pairwise mutual exclusion between versions of the same plugin

use crate::aggregator::CandidateSet;
use crate::catalog::VersionRecord;
use crate::expression::Expression;
use crate::version::SelectedVersion;
use indexmap::IndexMap;
use tracing::debug;

/// A compiled formula and its size
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    pub expression: Expression,
    pub clauses: usize,
    pub variables: usize,
}

pub fn compile(candidates: &CandidateSet) -> CompiledFormula {
    let mut clauses = Vec::new();

    let root_vars: Vec<Expression> = candidates
        .versions(candidates.root())
        .iter()
        .map(|r| Expression::var(r.selected()))
        .collect();
    clauses.push(match <[Expression; 1]>::try_from(root_vars) {
        Ok([single]) => single,
        Err(many) => Expression::or(many),
    });

    for (_, versions) in candidates.plugins() {
        // Ascending precedence keeps clause order stable across catalogs
        for record in versions.iter().rev() {
            let var = Expression::var(record.selected());
            for edge in record.resolvable_dependencies() {
                let targets = candidates.versions(&edge.name);
                let (matching, rejected): (Vec<&VersionRecord>, Vec<&VersionRecord>) = targets
                    .iter()
                    .rev()
                    .partition(|t| edge.version.matches(&t.version));

                let clause = if edge.optional {
                    if targets.is_empty() {
                        continue;
                    }
                    Expression::implies(var.clone(), Expression::not(vars_of(&rejected)))
                } else {
                    Expression::implies(var.clone(), vars_of(&matching))
                };
                clauses.push(clause);
            }
        }
    }

    let skeleton = Expression::and(clauses);
    let free = skeleton.free();
    let variables = free.len();

    let mut by_plugin: IndexMap<&str, Vec<&SelectedVersion>> = IndexMap::new();
    for var in &free {
        by_plugin.entry(var.name.as_str()).or_default().push(var);
    }

    let Expression::And(mut clauses) = skeleton else {
        unreachable!("skeleton is built as a conjunction");
    };
    for versions in by_plugin.values().filter(|v| v.len() > 1) {
        for (i, a) in versions.iter().enumerate() {
            for b in &versions[i + 1..] {
                clauses.push(Expression::not(Expression::and(vec![
                    Expression::var((*a).clone()),
                    Expression::var((*b).clone()),
                ])));
            }
        }
    }

    let clause_count = clauses.len();
    debug!(
        root = candidates.root(),
        variables,
        clauses = clause_count,
        "compiled dependency formula"
    );

    CompiledFormula {
        expression: Expression::and(clauses),
        clauses: clause_count,
        variables,
    }
}

fn vars_of(records: &[&VersionRecord]) -> Expression {
    Expression::or(records.iter().map(|r| Expression::var(r.selected())).collect())
}
