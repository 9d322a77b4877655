//! Version range constraints
//!
//! Plugin descriptors declare dependency ranges in the npm style used by Unreal
//! plugin catalogs (`>=1.0.0 <2.0.0`, `1.0.0`, `^1.2 || ~2.0`, `1.0.0 - 1.4.0`).
//! [`VersionRange`] parses those into `semver::VersionReq` alternatives so matching
//! and precedence come from the `semver` crate.
//!
//! # Examples
//!
//! ```
//! use unrealpm_resolver::VersionRange;
//! use semver::Version;
//!
//! let range = VersionRange::parse(">=3.0.0 <=4.0.0").unwrap();
//! assert!(range.matches(&Version::new(4, 0, 0)));
//! assert!(!range.matches(&Version::new(4, 0, 1)));
//!
//! // A bare version is an exact match, not a caret range
//! let exact = VersionRange::parse("1.0.0").unwrap();
//! assert!(!exact.matches(&Version::new(1, 1, 0)));
//! ```

use crate::{Error, Result};
use semver::{Comparator, Op, Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

const OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "=", "^", "~"];

/// A predicate over semantic versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    source: String,
    kind: RangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RangeKind {
    /// Every version, prereleases included
    All,
    /// Any of the alternatives matches
    AnyOf(Vec<VersionReq>),
}

impl VersionRange {
    /// Range matching every version, prereleases included
    ///
    /// Used for dependency edges that do not declare a range.
    pub fn all() -> Self {
        Self {
            source: "*".to_string(),
            kind: RangeKind::All,
        }
    }

    /// Range matching every release (non-prerelease) version
    pub fn all_release() -> Self {
        Self {
            source: "*".to_string(),
            kind: RangeKind::AnyOf(vec![VersionReq::STAR]),
        }
    }

    /// Exact match on one version
    pub fn exact(version: &Version) -> Self {
        let comparator = Comparator {
            op: Op::Exact,
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            pre: version.pre.clone(),
        };
        Self {
            source: format!("={}", version),
            kind: RangeKind::AnyOf(vec![VersionReq {
                comparators: vec![comparator],
            }]),
        }
    }

    /// Parse an npm-style range expression
    pub fn parse(input: &str) -> Result<Self> {
        let source = input.trim();
        if source.is_empty() {
            return Ok(Self::all_release());
        }

        let mut alternatives = Vec::new();
        for alternative in source.split("||") {
            let comparators = to_comparators(alternative.trim()).map_err(|reason| {
                Error::InvalidVersionRange {
                    range: source.to_string(),
                    reason,
                }
            })?;
            let req = VersionReq::parse(&comparators).map_err(|e| Error::InvalidVersionRange {
                range: source.to_string(),
                reason: e.to_string(),
            })?;
            alternatives.push(req);
        }

        Ok(Self {
            source: source.to_string(),
            kind: RangeKind::AnyOf(alternatives),
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        match &self.kind {
            RangeKind::All => true,
            RangeKind::AnyOf(alternatives) => alternatives.iter().any(|req| req.matches(version)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Rewrite one `||` alternative into `semver` comparator syntax
fn to_comparators(alternative: &str) -> std::result::Result<String, String> {
    if alternative.is_empty() || alternative == "*" {
        return Ok("*".to_string());
    }

    // Hyphen range: "1.0.0 - 2.0.0"
    if let Some((low, high)) = alternative.split_once(" - ") {
        let (low, high) = (low.trim(), high.trim());
        if low.is_empty() || high.is_empty() {
            return Err("hyphen range needs both bounds".to_string());
        }
        return Ok(format!(">={}, <={}", low, high));
    }

    let tokens: Vec<&str> = alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in tokens {
        if OPERATORS.contains(&token) {
            if pending_op.is_some() {
                return Err(format!("operator '{}' has no version", token));
            }
            pending_op = Some(token);
            continue;
        }

        let comparator = match pending_op.take() {
            Some(op) => format!("{}{}", op, token),
            None if starts_with_operator(token) => token.to_string(),
            None if is_wildcard(token) => token.to_string(),
            // npm treats a bare version as an exact match
            None => format!("={}", token.trim_start_matches(['v', 'V'])),
        };
        comparators.push(comparator);
    }

    if let Some(op) = pending_op {
        return Err(format!("operator '{}' has no version", op));
    }

    Ok(comparators.join(", "))
}

fn starts_with_operator(token: &str) -> bool {
    token.starts_with(['>', '<', '=', '^', '~'])
}

fn is_wildcard(token: &str) -> bool {
    token == "*"
        || token
            .split('.')
            .any(|part| matches!(part, "*" | "x" | "X"))
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.source
    }
}
