//! Session diff engine
//!
//! Compares a device's running configuration with a candidate session's
//! configuration. Both texts are normalized identically before comparison:
//!
//! 1. split into lines
//! 2. lines starting with the comment marker `!` are dropped
//! 3. trailing whitespace is trimmed from every line
//!
//! Which comparison runs is a per-vendor policy ([`DiffStrategy`]). The
//! strategies are intentionally distinct: set difference reports only
//! session-side additions, symmetric difference also reports removals.
//!
//! Line order in a diff carries no meaning. Lines are emitted in the order
//! they are first seen (session side first), without duplicates.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// Diff returned by vendors whose sessions cannot be diffed
pub const UNSUPPORTED_DIFF: &str = "diff not supported on cisco_nxos";

/// Comment marker of line-oriented configurations
pub const COMMENT_MARKER: char = '!';

/// Comparison policy of a vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStrategy {
    /// Lines present in the session but absent from the running config
    SetDifference,
    /// Lines present on exactly one side
    SymmetricDifference,
    /// No diff support; always the [`UNSUPPORTED_DIFF`] sentinel
    Unsupported,
    /// The device computes the diff itself; no local comparison
    Delegated,
}

impl fmt::Display for DiffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiffStrategy::SetDifference => "set_difference",
            DiffStrategy::SymmetricDifference => "symmetric_difference",
            DiffStrategy::Unsupported => "unsupported",
            DiffStrategy::Delegated => "delegated",
        };
        f.write_str(name)
    }
}

/// Vendor-specific comparison of two configuration texts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDiffEngine {
    strategy: DiffStrategy,
}

impl SessionDiffEngine {
    /// Create an engine with the given strategy
    pub fn new(strategy: DiffStrategy) -> Self {
        Self { strategy }
    }

    /// The engine's strategy
    pub fn strategy(&self) -> DiffStrategy {
        self.strategy
    }

    /// Whether [`compare`](Self::compare) needs device configuration at all
    pub fn needs_configs(&self) -> bool {
        matches!(
            self.strategy,
            DiffStrategy::SetDifference | DiffStrategy::SymmetricDifference
        )
    }

    /// Compare running and session configuration
    ///
    /// Returns an empty string when there is no difference. Fails for
    /// [`DiffStrategy::Delegated`], whose diff only the device can produce.
    pub fn compare(&self, running: &str, session: &str) -> Result<String> {
        match self.strategy {
            DiffStrategy::SetDifference => Ok(set_difference(running, session)),
            DiffStrategy::SymmetricDifference => Ok(symmetric_difference(running, session)),
            DiffStrategy::Unsupported => Ok(UNSUPPORTED_DIFF.to_string()),
            DiffStrategy::Delegated => Err(Error::diff(
                "delegated diff strategy has no local comparison",
            )),
        }
    }
}

/// Normalize configuration text into comparable lines
pub fn normalize(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .map(str::trim_end)
        .collect()
}

/// Session-only lines, newline joined
pub fn set_difference(running: &str, session: &str) -> String {
    let running: HashSet<&str> = normalize(running).into_iter().collect();
    join_unique(normalize(session).into_iter().filter(|line| !running.contains(line)))
}

/// Lines present on exactly one side, newline joined
pub fn symmetric_difference(running: &str, session: &str) -> String {
    let running_lines = normalize(running);
    let session_lines = normalize(session);
    let running_set: HashSet<&str> = running_lines.iter().copied().collect();
    let session_set: HashSet<&str> = session_lines.iter().copied().collect();

    let added = session_lines
        .into_iter()
        .filter(|line| !running_set.contains(line));
    let removed = running_lines
        .into_iter()
        .filter(|line| !session_set.contains(line));

    join_unique(added.chain(removed))
}

fn join_unique<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut seen = HashSet::new();
    lines
        .filter(|line| seen.insert(*line))
        .collect::<Vec<_>>()
        .join("\n")
}
