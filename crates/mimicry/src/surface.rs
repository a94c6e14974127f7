//! Surface descriptors: the declared shape of a type.
//!
//! A surface is the set of operations reachable on a type itself
//! ([`SurfaceKind::Singleton`]) or on its instances ([`SurfaceKind::Instance`]),
//! each with an [`Arity`]. Doubles maintain their descriptor as operations are
//! declared; real types describe themselves through [`Surfaced`] or a YAML/JSON
//! manifest, so the substitutability checker never needs runtime reflection.
//!
//! ## Manifest format
//!
//! ```yaml
//! name: User
//! singleton:
//!   find: 1
//! instance:
//!   initialize: 1
//!   id: 0
//!   tags: { required: 0, variadic: true }
//! ```

use crate::result::{MimicryError, MimicryResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Which side of a type an operation lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Operations invoked on the type itself
    Singleton,
    /// Operations invoked on instances of the type
    Instance,
}

impl SurfaceKind {
    /// Both surfaces, singleton first
    pub const ALL: [Self; 2] = [Self::Singleton, Self::Instance];

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Instance => "instance",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter count of an operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ArityRepr")]
pub struct Arity {
    /// Number of required positional parameters
    pub required: usize,
    /// Whether additional trailing arguments are accepted
    pub variadic: bool,
}

impl Arity {
    /// Exactly `n` arguments
    #[must_use]
    pub const fn exact(n: usize) -> Self {
        Self {
            required: n,
            variadic: false,
        }
    }

    /// `n` or more arguments
    #[must_use]
    pub const fn at_least(n: usize) -> Self {
        Self {
            required: n,
            variadic: true,
        }
    }

    /// Whether a call with `count` arguments fits
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        if self.variadic {
            count >= self.required
        } else {
            count == self.required
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "{}+", self.required)
        } else {
            write!(f, "{}", self.required)
        }
    }
}

/// Manifests may write an arity as a bare count or as a full table
#[derive(Deserialize)]
#[serde(untagged)]
enum ArityRepr {
    Count(usize),
    Full {
        required: usize,
        #[serde(default)]
        variadic: bool,
    },
}

impl From<ArityRepr> for Arity {
    fn from(repr: ArityRepr) -> Self {
        match repr {
            ArityRepr::Count(n) => Self::exact(n),
            ArityRepr::Full { required, variadic } => Self { required, variadic },
        }
    }
}

/// Explicit description of a type's singleton and instance surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceDescriptor {
    /// Type name (informational)
    #[serde(default)]
    pub name: String,
    /// Operations on the type itself
    #[serde(default)]
    pub singleton: BTreeMap<String, Arity>,
    /// Operations on instances
    #[serde(default)]
    pub instance: BTreeMap<String, Arity>,
}

impl SurfaceDescriptor {
    /// Create an empty descriptor
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Add a singleton operation
    #[must_use]
    pub fn with_singleton(mut self, operation: &str, arity: Arity) -> Self {
        self.insert(SurfaceKind::Singleton, operation, arity);
        self
    }

    /// Add an instance operation
    #[must_use]
    pub fn with_instance(mut self, operation: &str, arity: Arity) -> Self {
        self.insert(SurfaceKind::Instance, operation, arity);
        self
    }

    /// Add or replace an operation, returning the previous arity
    pub fn insert(&mut self, kind: SurfaceKind, operation: &str, arity: Arity) -> Option<Arity> {
        self.operations_mut(kind).insert(operation.to_string(), arity)
    }

    /// Remove an operation
    pub fn remove(&mut self, kind: SurfaceKind, operation: &str) -> Option<Arity> {
        self.operations_mut(kind).remove(operation)
    }

    /// Operations on one surface
    #[must_use]
    pub const fn operations(&self, kind: SurfaceKind) -> &BTreeMap<String, Arity> {
        match kind {
            SurfaceKind::Singleton => &self.singleton,
            SurfaceKind::Instance => &self.instance,
        }
    }

    fn operations_mut(&mut self, kind: SurfaceKind) -> &mut BTreeMap<String, Arity> {
        match kind {
            SurfaceKind::Singleton => &mut self.singleton,
            SurfaceKind::Instance => &mut self.instance,
        }
    }

    /// Operation names on one surface
    #[must_use]
    pub fn names(&self, kind: SurfaceKind) -> BTreeSet<&str> {
        self.operations(kind).keys().map(String::as_str).collect()
    }

    /// Arity of an operation, if present
    #[must_use]
    pub fn arity(&self, kind: SurfaceKind, operation: &str) -> Option<Arity> {
        self.operations(kind).get(operation).copied()
    }

    /// Whether an operation is present
    #[must_use]
    pub fn contains(&self, kind: SurfaceKind, operation: &str) -> bool {
        self.operations(kind).contains_key(operation)
    }

    /// Total operation count across both surfaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.singleton.len() + self.instance.len()
    }

    /// Check if both surfaces are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.singleton.is_empty() && self.instance.is_empty()
    }

    /// Parse a YAML manifest
    pub fn from_yaml_str(yaml: &str) -> MimicryResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Parse a JSON manifest
    pub fn from_json_str(json: &str) -> MimicryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a manifest file; `.json` files are parsed as JSON, `.yaml`/`.yml` as YAML
    pub fn from_path(path: impl AsRef<Path>) -> MimicryResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            other => Err(MimicryError::Manifest {
                message: format!(
                    "unsupported manifest extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                ),
            }),
        }
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> MimicryResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

impl fmt::Display for SurfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.name.is_empty() { "<anonymous>" } else { self.name.as_str() })?;
        for (name, arity) in &self.singleton {
            write!(f, " .{name}/{arity}")?;
        }
        for (name, arity) in &self.instance {
            write!(f, " #{name}/{arity}")?;
        }
        Ok(())
    }
}

/// Real types that can describe their own surface
///
/// Implement this on the production type a double stands in for, then check
/// the double with [`crate::DoubleType::is_substitutable_for_type`].
///
/// ```
/// use mimicry::{Arity, SurfaceDescriptor, Surfaced};
///
/// struct Repo;
///
/// impl Surfaced for Repo {
///     fn surface() -> SurfaceDescriptor {
///         SurfaceDescriptor::new("Repo").with_singleton("open", Arity::exact(1))
///     }
/// }
///
/// assert!(Repo::surface().contains(mimicry::SurfaceKind::Singleton, "open"));
/// ```
pub trait Surfaced {
    /// The type's singleton and instance operations
    fn surface() -> SurfaceDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod arity_tests {
        use super::*;

        #[test]
        fn test_exact_accepts_only_count() {
            let arity = Arity::exact(2);
            assert!(arity.accepts(2));
            assert!(!arity.accepts(1));
            assert!(!arity.accepts(3));
        }

        #[test]
        fn test_variadic_accepts_minimum_and_more() {
            let arity = Arity::at_least(1);
            assert!(!arity.accepts(0));
            assert!(arity.accepts(1));
            assert!(arity.accepts(9));
        }

        #[test]
        fn test_exact_and_variadic_differ() {
            assert_ne!(Arity::exact(1), Arity::at_least(1));
            assert_eq!(Arity::default(), Arity::exact(0));
        }

        #[test]
        fn test_display() {
            assert_eq!(Arity::exact(3).to_string(), "3");
            assert_eq!(Arity::at_least(0).to_string(), "0+");
        }
    }

    mod descriptor_tests {
        use super::*;

        #[test]
        fn test_builder_and_queries() {
            let desc = SurfaceDescriptor::new("User")
                .with_singleton("find", Arity::exact(1))
                .with_instance("id", Arity::exact(0))
                .with_instance("name", Arity::exact(0));

            assert_eq!(desc.len(), 3);
            assert!(desc.contains(SurfaceKind::Singleton, "find"));
            assert!(!desc.contains(SurfaceKind::Instance, "find"));
            assert_eq!(desc.arity(SurfaceKind::Singleton, "find"), Some(Arity::exact(1)));
            assert_eq!(
                desc.names(SurfaceKind::Instance).into_iter().collect::<Vec<_>>(),
                vec!["id", "name"]
            );
        }

        #[test]
        fn test_insert_replaces() {
            let mut desc = SurfaceDescriptor::new("User");
            assert_eq!(desc.insert(SurfaceKind::Instance, "id", Arity::exact(0)), None);
            assert_eq!(
                desc.insert(SurfaceKind::Instance, "id", Arity::exact(1)),
                Some(Arity::exact(0))
            );
            assert_eq!(desc.remove(SurfaceKind::Instance, "id"), Some(Arity::exact(1)));
            assert!(desc.is_empty());
        }

        #[test]
        fn test_yaml_manifest_accepts_both_arity_forms() {
            let yaml = r"
name: User
singleton:
  find: 1
instance:
  id: 0
  tags: { required: 1, variadic: true }
";
            let desc = SurfaceDescriptor::from_yaml_str(yaml).unwrap();
            assert_eq!(desc.name, "User");
            assert_eq!(desc.arity(SurfaceKind::Singleton, "find"), Some(Arity::exact(1)));
            assert_eq!(desc.arity(SurfaceKind::Instance, "tags"), Some(Arity::at_least(1)));
        }

        #[test]
        fn test_json_manifest_missing_sections_default_empty() {
            let desc = SurfaceDescriptor::from_json_str(r#"{"instance": {"id": 0}}"#).unwrap();
            assert!(desc.singleton.is_empty());
            assert_eq!(desc.instance.len(), 1);
        }

        #[test]
        fn test_invalid_manifest_is_error() {
            let err = SurfaceDescriptor::from_yaml_str("singleton: [1, 2]").unwrap_err();
            assert!(matches!(err, MimicryError::Yaml(_)));
        }

        #[test]
        fn test_yaml_roundtrip_keeps_arity() {
            let desc = SurfaceDescriptor::new("User").with_instance("tags", Arity::at_least(2));
            let yaml = desc.to_yaml().unwrap();
            assert_eq!(SurfaceDescriptor::from_yaml_str(&yaml).unwrap(), desc);
        }

        #[test]
        fn test_display_lists_both_surfaces() {
            let desc = SurfaceDescriptor::new("User")
                .with_singleton("find", Arity::exact(1))
                .with_instance("id", Arity::exact(0));
            assert_eq!(desc.to_string(), "User .find/1 #id/0");
        }
    }
}
