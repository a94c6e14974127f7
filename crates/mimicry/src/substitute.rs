//! Substitutability: exact structural comparison of two surfaces.
//!
//! A double is substitutable for a candidate only when both surfaces have
//! exactly the same operation names (nothing missing, nothing extra) and
//! every shared operation has the same arity. There is no partial match.

use crate::surface::{Arity, SurfaceDescriptor, SurfaceKind};
use serde::Serialize;
use std::fmt;

/// An operation on one surface
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SurfaceMember {
    /// Surface the operation lives on
    pub surface: SurfaceKind,
    /// Operation name
    pub operation: String,
}

impl fmt::Display for SurfaceMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.surface {
            SurfaceKind::Singleton => write!(f, ".{}", self.operation),
            SurfaceKind::Instance => write!(f, "#{}", self.operation),
        }
    }
}

/// A shared operation whose arities differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArityDifference {
    /// The operation
    pub member: SurfaceMember,
    /// Arity declared on the double
    pub double: Arity,
    /// Arity on the candidate
    pub candidate: Arity,
}

/// Outcome of comparing a double's surface with a candidate's
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutabilityReport {
    /// Double type name
    pub double: String,
    /// Candidate type name
    pub candidate: String,
    /// Declared on the double, absent from the candidate
    pub missing: Vec<SurfaceMember>,
    /// Present on the candidate, not declared on the double
    pub extra: Vec<SurfaceMember>,
    /// Present on both with different arities
    pub arity_mismatches: Vec<ArityDifference>,
}

impl SubstitutabilityReport {
    /// True only when nothing is missing, extra or mismatched
    #[must_use]
    pub fn is_substitutable(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.arity_mismatches.is_empty()
    }

    /// Multi-line explanation of every difference
    #[must_use]
    pub fn explain(&self) -> String {
        if self.is_substitutable() {
            return format!("{} is substitutable for {}", self.candidate, self.double);
        }
        let mut lines = vec![format!(
            "{} is not substitutable for {}:",
            self.candidate, self.double
        )];
        lines.extend(self.missing.iter().map(|m| format!("  missing {m}")));
        lines.extend(self.extra.iter().map(|m| format!("  extra {m}")));
        lines.extend(self.arity_mismatches.iter().map(|d| {
            format!(
                "  arity of {} is {} on the candidate, {} on the double",
                d.member, d.candidate, d.double
            )
        }));
        lines.join("\n")
    }
}

impl fmt::Display for SubstitutabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.explain())
    }
}

/// Compare a double's surface with a candidate's, on both surfaces
#[must_use]
pub fn check_substitutability(
    double: &SurfaceDescriptor,
    candidate: &SurfaceDescriptor,
) -> SubstitutabilityReport {
    let mut report = SubstitutabilityReport {
        double: display_name(double),
        candidate: display_name(candidate),
        ..SubstitutabilityReport::default()
    };

    for kind in SurfaceKind::ALL {
        let ours = double.operations(kind);
        let theirs = candidate.operations(kind);
        let member = |operation: &str| SurfaceMember {
            surface: kind,
            operation: operation.to_string(),
        };

        for (operation, &arity) in ours {
            match theirs.get(operation) {
                None => report.missing.push(member(operation.as_str())),
                Some(&candidate_arity) if candidate_arity != arity => {
                    report.arity_mismatches.push(ArityDifference {
                        member: member(operation.as_str()),
                        double: arity,
                        candidate: candidate_arity,
                    });
                }
                Some(_) => {}
            }
        }
        report.extra.extend(
            theirs
                .keys()
                .filter(|operation| !ours.contains_key(*operation))
                .map(|operation| member(operation.as_str())),
        );
    }

    report
}

/// Whether `candidate` exactly matches `double` on both surfaces
#[must_use]
pub fn is_substitutable_for(double: &SurfaceDescriptor, candidate: &SurfaceDescriptor) -> bool {
    check_substitutability(double, candidate).is_substitutable()
}

fn display_name(descriptor: &SurfaceDescriptor) -> String {
    if descriptor.name.is_empty() {
        "<anonymous>".to_string()
    } else {
        descriptor.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_user() -> SurfaceDescriptor {
        SurfaceDescriptor::new("MockUser")
            .with_singleton("find", Arity::exact(0))
            .with_instance("initialize", Arity::exact(1))
            .with_instance("id", Arity::exact(0))
            .with_instance("name", Arity::exact(0))
            .with_instance("add_phone_number", Arity::exact(2))
    }

    fn real_user() -> SurfaceDescriptor {
        SurfaceDescriptor {
            name: "RealUser".to_string(),
            ..mock_user()
        }
    }

    #[test]
    fn test_reflexive() {
        assert!(is_substitutable_for(&mock_user(), &mock_user()));
        assert!(is_substitutable_for(&mock_user(), &real_user()));
    }

    #[test]
    fn test_empty_candidate_is_missing_everything() {
        let report = check_substitutability(&mock_user(), &SurfaceDescriptor::default());
        assert!(!report.is_substitutable());
        assert_eq!(report.missing.len(), 5);
        assert!(report.extra.is_empty());
        assert_eq!(report.candidate, "<anonymous>");
    }

    #[test]
    fn test_extra_singleton_operation_fails() {
        let candidate = real_user().with_singleton("some_class_meth", Arity::exact(0));
        let report = check_substitutability(&mock_user(), &candidate);
        assert!(!report.is_substitutable());
        assert_eq!(
            report.extra,
            vec![SurfaceMember {
                surface: SurfaceKind::Singleton,
                operation: "some_class_meth".to_string(),
            }]
        );
    }

    #[test]
    fn test_extra_instance_operation_fails() {
        let candidate = real_user().with_instance("some_instance_method", Arity::exact(0));
        assert!(!is_substitutable_for(&mock_user(), &candidate));
    }

    #[test]
    fn test_surfaces_are_not_interchangeable() {
        let mut candidate = real_user();
        candidate.remove(SurfaceKind::Singleton, "find");
        candidate.insert(SurfaceKind::Instance, "find", Arity::exact(0));

        let report = check_substitutability(&mock_user(), &candidate);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].surface, SurfaceKind::Singleton);
        assert_eq!(report.extra.len(), 1);
        assert_eq!(report.extra[0].surface, SurfaceKind::Instance);
    }

    #[test]
    fn test_singleton_arity_mismatch_fails() {
        let candidate = real_user().with_singleton("find", Arity::exact(2));
        let report = check_substitutability(&mock_user(), &candidate);
        assert_eq!(
            report.arity_mismatches,
            vec![ArityDifference {
                member: SurfaceMember {
                    surface: SurfaceKind::Singleton,
                    operation: "find".to_string(),
                },
                double: Arity::exact(0),
                candidate: Arity::exact(2),
            }]
        );
        assert!(report.missing.is_empty() && report.extra.is_empty());
    }

    #[test]
    fn test_instance_arity_mismatch_fails() {
        let candidate = real_user().with_instance("id", Arity::exact(3));
        assert!(!is_substitutable_for(&mock_user(), &candidate));
    }

    #[test]
    fn test_variadic_differs_from_exact() {
        let candidate = real_user().with_instance("add_phone_number", Arity::at_least(2));
        assert!(!is_substitutable_for(&mock_user(), &candidate));
    }

    #[test]
    fn test_explain() {
        let candidate = real_user()
            .with_singleton("find", Arity::exact(2))
            .with_instance("email", Arity::exact(0));
        let text = check_substitutability(&mock_user(), &candidate).explain();
        assert!(text.starts_with("RealUser is not substitutable for MockUser:"));
        assert!(text.contains("extra #email"));
        assert!(text.contains("arity of .find is 2 on the candidate, 0 on the double"));

        let ok = check_substitutability(&mock_user(), &real_user());
        assert_eq!(ok.to_string(), "RealUser is substitutable for MockUser");
    }
}
