//! Invocation ledger: the append-only record of calls made on one surface.
//!
//! Every call on a double is appended here before its value is resolved, so a
//! call that later fails is still on record. Sequence numbers are assigned in
//! call order and are the only source of truth for ordering queries.

use crate::result::MimicryResult;
use crate::value::{format_args_list, Value};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A single recorded invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationRecord {
    /// Position in the ledger (0-based, strictly increasing)
    pub sequence: u64,
    /// Operation name
    pub operation: String,
    /// Arguments, in order
    pub args: Vec<Value>,
    /// Wall-clock time of the call (informational)
    pub recorded_at: DateTime<Utc>,
}

impl InvocationRecord {
    /// Whether this record is a call to `operation`
    #[must_use]
    pub fn is(&self, operation: &str) -> bool {
        self.operation == operation
    }

    /// Whether this record is a call to `operation` with exactly `args`
    #[must_use]
    pub fn matches(&self, operation: &str, args: &[Value]) -> bool {
        self.is(operation) && self.args == args
    }
}

impl fmt::Display for InvocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}{}",
            self.sequence,
            self.operation,
            format_args_list(&self.args)
        )
    }
}

/// Ordered record of invocations for one subject surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    records: Vec<InvocationRecord>,
}

impl Ledger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call, returning its sequence number
    pub(crate) fn append(&mut self, operation: &str, args: Vec<Value>) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(InvocationRecord {
            sequence,
            operation: operation.to_string(),
            args,
            recorded_at: Utc::now(),
        });
        sequence
    }

    /// All records in call order
    #[must_use]
    pub fn records(&self) -> &[InvocationRecord] {
        &self.records
    }

    /// Number of recorded calls
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for one operation, in call order
    pub fn records_for<'a>(
        &'a self,
        operation: &'a str,
    ) -> impl Iterator<Item = &'a InvocationRecord> + 'a {
        self.records.iter().filter(move |r| r.is(operation))
    }

    /// Argument lists of every call to `operation`
    #[must_use]
    pub fn calls_of(&self, operation: &str) -> Vec<&[Value]> {
        self.records
            .iter()
            .filter(|r| r.is(operation))
            .map(|r| r.args.as_slice())
            .collect()
    }

    /// Number of calls to `operation`, with any arguments
    #[must_use]
    pub fn times_told(&self, operation: &str) -> usize {
        self.records_for(operation).count()
    }

    /// Number of calls to `operation` with exactly `args`
    #[must_use]
    pub fn times_told_with(&self, operation: &str, args: &[Value]) -> usize {
        self.records
            .iter()
            .filter(|r| r.matches(operation, args))
            .count()
    }

    /// Whether `operation` was called at least once with exactly `args`
    #[must_use]
    pub fn told_with(&self, operation: &str, args: &[Value]) -> bool {
        self.records.iter().any(|r| r.matches(operation, args))
    }

    /// Whether some call `first(first_args)` precedes some call `second(second_args)`
    ///
    /// Passing `None` for an argument list matches any arguments.
    #[must_use]
    pub fn told_before(
        &self,
        first: &str,
        first_args: Option<&[Value]>,
        second: &str,
        second_args: Option<&[Value]>,
    ) -> bool {
        let earliest = self
            .records
            .iter()
            .find(|r| matches_filter(r, first, first_args))
            .map(|r| r.sequence);
        let latest = self
            .records
            .iter()
            .rev()
            .find(|r| matches_filter(r, second, second_args))
            .map(|r| r.sequence);
        matches!((earliest, latest), (Some(a), Some(b)) if a < b)
    }

    /// Most recent record, if any
    #[must_use]
    pub fn last(&self) -> Option<&InvocationRecord> {
        self.records.last()
    }

    /// Pretty JSON export of every record
    pub fn to_json(&self) -> MimicryResult<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Render up to `limit` of the most recent records, one per line
    #[must_use]
    pub fn render(&self, limit: usize) -> String {
        if self.records.is_empty() {
            return "  (no invocations recorded)".to_string();
        }
        let skipped = self.records.len().saturating_sub(limit);
        let mut out = String::new();
        if skipped > 0 {
            out.push_str(&format!("  ... {skipped} earlier invocation(s)\n"));
        }
        let lines: Vec<String> = self.records[skipped..]
            .iter()
            .map(|r| format!("  {r}"))
            .collect();
        out.push_str(&lines.join("\n"));
        out
    }
}

fn matches_filter(record: &InvocationRecord, operation: &str, args: Option<&[Value]>) -> bool {
    args.map_or_else(|| record.is(operation), |args| record.matches(operation, args))
}
