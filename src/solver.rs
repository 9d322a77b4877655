//! Backtracking search over a compiled formula
//!
//! The search always branches on the greatest free variable and tries `true` before
//! `false`, returning the first satisfying assignment it reaches. Because greater
//! variables are more preferred candidates, this first solution is the preference
//! policy of the resolver: it is deterministic, greedy and not globally optimal.
//!
//! Subtrees whose partial assignment already falsifies the formula are skipped. A
//! pruned subtree contains no solution, so skipping it never changes which solution
//! is found first.

use crate::expression::Expression;
use crate::version::SelectedVersion;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Number of visited nodes between two budget checks
const CHECK_INTERVAL: u64 = 256;

/// Variable assignment found by the solver
pub type Bindings = BTreeMap<SelectedVersion, bool>;

/// Limits on how long a search may run
#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<CancellationToken>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some((Instant::now() + timeout, timeout));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::ResolutionCancelled);
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::ResolutionTimeout(timeout.as_secs()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub nodes: u64,
    pub prunes: u64,
}

pub struct Solver {
    budget: SearchBudget,
    stats: SolverStats,
}

impl Solver {
    pub fn new(budget: SearchBudget) -> Self {
        Self {
            budget,
            stats: SolverStats::default(),
        }
    }

    /// Find the first satisfying assignment, or `None` if the formula is unsatisfiable
    pub fn solve(&mut self, expr: &Expression) -> Result<Option<Bindings>> {
        self.budget.check()?;

        let mut bindings = Bindings::new();
        let found = self.search(expr, &mut bindings)?;

        debug!(
            nodes = self.stats.nodes,
            prunes = self.stats.prunes,
            satisfiable = found,
            "search finished"
        );
        Ok(found.then_some(bindings))
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    fn search(&mut self, expr: &Expression, bindings: &mut Bindings) -> Result<bool> {
        self.stats.nodes += 1;
        if self.stats.nodes % CHECK_INTERVAL == 0 {
            self.budget.check()?;
        }

        let Some(var) = expr.greatest_free().cloned() else {
            return Ok(expr.evaluate());
        };

        if expr.partial_evaluate() == Some(false) {
            self.stats.prunes += 1;
            return Ok(false);
        }

        for value in [true, false] {
            let next = expr.replace(&var, value);
            bindings.insert(var.clone(), value);
            if self.search(&next, bindings)? {
                return Ok(true);
            }
        }

        bindings.remove(&var);
        Ok(false)
    }
}

/// Solve without any time or cancellation limit
pub fn solve(expr: &Expression) -> Result<Option<Bindings>> {
    Solver::new(SearchBudget::unlimited()).solve(expr)
}
