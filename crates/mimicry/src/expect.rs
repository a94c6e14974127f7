//! Expectations over recorded invocations.
//!
//! The query methods on [`Subject`] return plain booleans and counts. The
//! builders here turn them into `MimicryResult<()>` so a failed expectation
//! surfaces as [`MimicryError::ExpectationNotMet`] with a message quoting what
//! was actually recorded.
//!
//! ```
//! use mimicry::{args, expect::told, Declaration, DoubleType};
//!
//! let users = DoubleType::new("User");
//! users.declare_singleton(Declaration::new("find").arity(1).default_value(()));
//! users.call("find", args![11]).unwrap();
//! users.call("find", args![22]).unwrap();
//!
//! told("find").times(2).verify(&users).unwrap();
//! told("find").with(args![11]).before(args![22]).verify(&users).unwrap();
//! assert!(told("find").with(args![99]).verify(&users).is_err());
//! ```

use crate::double::{DoubleType, Instance, Subject};
use crate::result::{MimicryError, MimicryResult};
use crate::surface::SurfaceDescriptor;
use crate::value::{format_args_list, Value};

/// Expectation that an operation was invoked
#[derive(Debug, Clone, PartialEq)]
pub struct Told {
    operation: String,
    with: Vec<Vec<Value>>,
    times: Option<usize>,
    before: Option<Vec<Value>>,
}

/// Expect `operation` to have been invoked
#[must_use]
pub fn told(operation: &str) -> Told {
    Told::operation(operation)
}

/// Expect an accessor-style operation to have been read
#[must_use]
pub fn asked_for(operation: &str) -> Told {
    Told::operation(operation)
}

/// Expect `operation` never to have been invoked
#[must_use]
pub fn never_told(operation: &str) -> Told {
    Told::never(operation)
}

impl Told {
    /// Expect at least one invocation of `operation`
    #[must_use]
    pub fn operation(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            with: Vec::new(),
            times: None,
            before: None,
        }
    }

    /// Expect no invocation of `operation` (narrowed by any `with` clauses)
    #[must_use]
    pub fn never(operation: &str) -> Self {
        Self::operation(operation).times(0)
    }

    /// Require an invocation with exactly these arguments
    #[must_use]
    pub fn with(mut self, args: Vec<Value>) -> Self {
        self.with.push(args);
        self
    }

    /// Require a further argument list as well
    #[must_use]
    pub fn and_with(self, args: Vec<Value>) -> Self {
        self.with(args)
    }

    /// Require an exact count
    ///
    /// Without `with` clauses this counts every invocation of the operation;
    /// with them, each argument list must have been used exactly `n` times.
    #[must_use]
    pub const fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Require that the last `with` call (or any call, if none) came before a
    /// call with these arguments
    #[must_use]
    pub fn before(mut self, args: Vec<Value>) -> Self {
        self.before = Some(args);
        self
    }

    /// Human-readable form, e.g. `told to find with (11) before (22)`
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("told to {}", self.operation);
        for (i, args) in self.with.iter().enumerate() {
            out.push_str(if i == 0 { " with " } else { " and with " });
            out.push_str(&format_args_list(args));
        }
        if let Some(n) = self.times {
            out.push_str(&format!(" {n} time(s)"));
        }
        if let Some(args) = &self.before {
            out.push_str(" before ");
            out.push_str(&format_args_list(args));
        }
        out
    }

    /// Evaluate against a subject without building a message
    #[must_use]
    pub fn matches<S: Subject>(&self, subject: &S) -> bool {
        self.failure(subject).is_none()
    }

    /// Evaluate against a subject
    pub fn verify<S: Subject>(&self, subject: &S) -> MimicryResult<()> {
        match self.failure(subject) {
            None => Ok(()),
            Some(reason) => Err(not_met(subject, &self.describe(), &reason)),
        }
    }

    /// First unmet clause, rendered
    fn failure<S: Subject>(&self, subject: &S) -> Option<String> {
        let op = self.operation.as_str();
        let total = subject.times_told(op);

        if self.with.is_empty() {
            match self.times {
                Some(n) if total != n => {
                    return Some(format!("{op} was told {total} time(s), expected {n}"));
                }
                None if total == 0 => return Some(format!("{op} was never told")),
                _ => {}
            }
        }

        for args in &self.with {
            let count = subject.times_told_with(op, args);
            let rendered = format_args_list(args);
            match self.times {
                Some(n) if count != n => {
                    return Some(format!(
                        "{op}{rendered} was told {count} time(s), expected {n}"
                    ));
                }
                None if count == 0 => {
                    return Some(format!(
                        "{op} was never told with {rendered} ({total} call(s) with other arguments)"
                    ));
                }
                _ => {}
            }
        }

        if let Some(later) = &self.before {
            let earlier = self.with.last().map(Vec::as_slice);
            let ordered = subject.with_ledger(|ledger| {
                ledger.told_before(op, earlier, op, Some(later.as_slice()))
            });
            if !ordered {
                let earlier = earlier.map_or_else(
                    || format!("no {op} call"),
                    |args| format!("{op}{}", format_args_list(args)),
                );
                return Some(format!(
                    "{earlier} was not told before {op}{}",
                    format_args_list(later)
                ));
            }
        }

        None
    }
}

/// Expect an instance to have been constructed with exactly `args`
pub fn expect_initialized_with(instance: &Instance, args: &[Value]) -> MimicryResult<()> {
    let actual = instance.initialized_with();
    if actual == args {
        Ok(())
    } else {
        Err(MimicryError::expectation(format!(
            "expected {instance} to have been initialized with {}, but it was initialized with {}",
            format_args_list(args),
            format_args_list(&actual)
        )))
    }
}

/// Expect a candidate surface to be substitutable for a double
pub fn expect_substitutable(
    double: &DoubleType,
    candidate: &SurfaceDescriptor,
) -> MimicryResult<()> {
    let report = double.substitutability(candidate);
    if report.is_substitutable() {
        Ok(())
    } else {
        Err(MimicryError::expectation(report.explain()))
    }
}

/// Expect a candidate surface NOT to be substitutable for a double
pub fn expect_not_substitutable(
    double: &DoubleType,
    candidate: &SurfaceDescriptor,
) -> MimicryResult<()> {
    let report = double.substitutability(candidate);
    if report.is_substitutable() {
        Err(MimicryError::expectation(format!(
            "expected {} not to be substitutable for {}, but the surfaces match",
            report.candidate, report.double
        )))
    } else {
        Ok(())
    }
}

fn not_met<S: Subject>(subject: &S, expected: &str, reason: &str) -> MimicryError {
    let limit = subject.config().failure_context;
    let history = subject.with_ledger(|ledger| ledger.render(limit));
    MimicryError::expectation(format!(
        "expected {} to have been {expected}, but {reason}\nrecorded {} invocations:\n{history}",
        subject.subject_name(),
        subject.surface_kind(),
    ))
}
