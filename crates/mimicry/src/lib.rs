//! Mimicry: stub/spy test doubles with a substitutability check
//!
//! A double stands in for a real type during tests. Its operations are
//! declared explicitly on two surfaces (singleton and instance), every call
//! is recorded in an ordered ledger, return values can be overridden per
//! call, and the declared surface can be compared against the real type's
//! surface so the double cannot silently drift away from what it mimics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    MIMICRY Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Registry   │    │ DoubleType │    │ Ledger     │            │
//! │   │ (declared  │───►│ / Instance │───►│ (ordered   │            │
//! │   │  surface)  │    │ resolution │    │  records)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                 ▲                 │                   │
//! │         ▼                 │                 ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Substitute │    │ Overrides  │    │ Expect     │            │
//! │   │ (surface   │    │ (single +  │    │ (told /    │            │
//! │   │  compare)  │    │  queue)    │    │  asked)    │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use mimicry::{args, expect::told, Declaration, DoubleType, Subject, Value};
//!
//! let user = DoubleType::new("User");
//! user.declare_singleton(Declaration::new("find").arity(1).default_value(Value::Nil));
//! user.declare_instance(Declaration::new("name").default_value("Josh"));
//!
//! let users = user.reprise();
//! users.will("find", Value::sym("user1")).unwrap();
//! assert_eq!(users.call("find", args![11]).unwrap(), Value::sym("user1"));
//! told("find").with(args![11]).verify(&users).unwrap();
//!
//! let josh = users.new_instance(args![]).unwrap();
//! assert_eq!(josh.ask("name").unwrap(), Value::from("Josh"));
//! assert!(josh.was_asked_for("name"));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod config;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod double;
/// Expectations over recorded invocations
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod expect;
#[allow(clippy::must_use_candidate, clippy::missing_errors_doc)]
mod ledger;
mod overrides;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
mod registry;
mod result;
mod substitute;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod surface;
/// Logging setup for test runs
pub mod telemetry;
#[allow(clippy::must_use_candidate, clippy::missing_const_for_fn)]
mod value;

pub use config::DoubleConfig;
pub use double::{Call, DoubleType, Instance, Subject, INITIALIZER};
pub use expect::{
    asked_for, expect_initialized_with, expect_not_substitutable, expect_substitutable,
    never_told, told, Told,
};
pub use ledger::{InvocationRecord, Ledger};
pub use overrides::{OverrideStore, Resolved};
pub use registry::{Behavior, ComputeFn, Declaration, HookFn, Registry};
pub use result::{MimicryError, MimicryResult};
pub use substitute::{
    check_substitutability, is_substitutable_for, ArityDifference, SubstitutabilityReport,
    SurfaceMember,
};
pub use surface::{Arity, SurfaceDescriptor, SurfaceKind, Surfaced};
pub use value::{format_args_list, Value};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::args;
    pub use super::expect::{asked_for, never_told, told};
    pub use super::{
        expect_initialized_with, expect_not_substitutable, expect_substitutable, Arity, Call,
        Declaration, DoubleConfig, DoubleType, Instance, MimicryError, MimicryResult, Subject,
        SurfaceDescriptor, SurfaceKind, Surfaced, Value, INITIALIZER,
    };
}
