//! Stub registry: the declared operations of a double type.
//!
//! Declarations are stored per surface in a name-keyed dispatch table. The
//! tables are reference counted and copied on write, so a reprise shares its
//! source's declarations until either side declares something new.

use crate::double::Call;
use crate::result::{MimicryError, MimicryResult};
use crate::surface::{Arity, SurfaceDescriptor, SurfaceKind};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Computed default: receives the call context, produces the return value
pub type ComputeFn = dyn Fn(&Call<'_>) -> MimicryResult<Value>;

/// Post-resolution side effect: receives the call's arguments
pub type HookFn = dyn Fn(&[Value]) -> MimicryResult<()>;

/// How an operation produces its value when no override is active
#[derive(Clone)]
pub enum Behavior {
    /// Always the same value
    Fixed(Value),
    /// Computed on each call
    Computed(Rc<ComputeFn>),
}

impl Behavior {
    /// Fixed value behavior
    pub fn fixed(value: impl Into<Value>) -> Self {
        Self::Fixed(value.into())
    }

    /// Computed behavior
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Call<'_>) -> MimicryResult<Value> + 'static,
    {
        Self::Computed(Rc::new(f))
    }

    pub(crate) fn evaluate(&self, call: &Call<'_>) -> MimicryResult<Value> {
        match self {
            Self::Fixed(value) => Ok(value.clone()),
            Self::Computed(f) => f(call),
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A declared operation
///
/// ```
/// use mimicry::{Declaration, Value};
///
/// let name = Declaration::new("name").default_value("Josh");
/// let phones = Declaration::new("phone_numbers").initial_state(Value::empty_list());
/// let find = Declaration::new("find").arity(1);
/// assert_eq!(find.declared_arity().required, 1);
/// assert!(name.default_behavior().is_some());
/// assert!(phones.initial_state_value().is_some());
/// ```
#[derive(Clone)]
pub struct Declaration {
    name: String,
    arity: Arity,
    default: Option<Behavior>,
    hook: Option<Rc<HookFn>>,
    initial_state: Option<Value>,
}

impl Declaration {
    /// Declare an operation taking no arguments, with no default
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arity: Arity::exact(0),
            default: None,
            hook: None,
            initial_state: None,
        }
    }

    /// Exactly `n` parameters
    #[must_use]
    pub fn arity(mut self, n: usize) -> Self {
        self.arity = Arity::exact(n);
        self
    }

    /// `n` or more parameters
    #[must_use]
    pub fn variadic(mut self, n: usize) -> Self {
        self.arity = Arity::at_least(n);
        self
    }

    /// Explicit arity
    #[must_use]
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Fixed default return value
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(Behavior::fixed(value));
        self
    }

    /// Computed default
    #[must_use]
    pub fn computed<F>(mut self, f: F) -> Self
    where
        F: Fn(&Call<'_>) -> MimicryResult<Value> + 'static,
    {
        self.default = Some(Behavior::computed(f));
        self
    }

    /// Explicit default behavior
    #[must_use]
    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.default = Some(behavior);
        self
    }

    /// Side effect run after every resolution of this operation
    #[must_use]
    pub fn hook<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> MimicryResult<()> + 'static,
    {
        self.hook = Some(Rc::new(f));
        self
    }

    /// Value installed as state under this operation's name before the
    /// initializer runs
    #[must_use]
    pub fn initial_state(mut self, value: impl Into<Value>) -> Self {
        self.initial_state = Some(value.into());
        self
    }

    /// Operation name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arity
    #[must_use]
    pub const fn declared_arity(&self) -> Arity {
        self.arity
    }

    /// Default behavior, if any
    #[must_use]
    pub const fn default_behavior(&self) -> Option<&Behavior> {
        self.default.as_ref()
    }

    /// Hook, if any
    #[must_use]
    pub fn hook_fn(&self) -> Option<&HookFn> {
        self.hook.as_deref()
    }

    /// Initial-state directive, if any
    #[must_use]
    pub const fn initial_state_value(&self) -> Option<&Value> {
        self.initial_state.as_ref()
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("default", &self.default)
            .field("has_hook", &self.hook.is_some())
            .field("initial_state", &self.initial_state)
            .finish()
    }
}

type Table = BTreeMap<String, Rc<Declaration>>;

/// Declarations for both surfaces of one double type
#[derive(Debug, Clone, Default)]
pub struct Registry {
    singleton: Rc<Table>,
    instance: Rc<Table>,
    descriptor: SurfaceDescriptor,
}

impl Registry {
    /// Create an empty registry for the named type
    #[must_use]
    pub fn new(type_name: &str) -> Self {
        Self {
            singleton: Rc::default(),
            instance: Rc::default(),
            descriptor: SurfaceDescriptor::new(type_name),
        }
    }

    fn table(&self, kind: SurfaceKind) -> &Table {
        match kind {
            SurfaceKind::Singleton => &self.singleton,
            SurfaceKind::Instance => &self.instance,
        }
    }

    /// Register or wholly replace a declaration, returning the one it replaced
    pub fn declare(
        &mut self,
        kind: SurfaceKind,
        declaration: Declaration,
    ) -> Option<Rc<Declaration>> {
        self.descriptor
            .insert(kind, declaration.name(), declaration.declared_arity());
        let table = match kind {
            SurfaceKind::Singleton => &mut self.singleton,
            SurfaceKind::Instance => &mut self.instance,
        };
        Rc::make_mut(table).insert(declaration.name().to_string(), Rc::new(declaration))
    }

    /// Look up a declaration
    pub fn lookup(&self, kind: SurfaceKind, operation: &str) -> MimicryResult<Rc<Declaration>> {
        self.get(kind, operation)
            .ok_or_else(|| MimicryError::UndeclaredOperation {
                subject: self.descriptor.name.clone(),
                surface: kind,
                operation: operation.to_string(),
            })
    }

    /// Look up a declaration without raising
    #[must_use]
    pub fn get(&self, kind: SurfaceKind, operation: &str) -> Option<Rc<Declaration>> {
        self.table(kind).get(operation).cloned()
    }

    /// Whether an operation is declared
    #[must_use]
    pub fn contains(&self, kind: SurfaceKind, operation: &str) -> bool {
        self.table(kind).contains_key(operation)
    }

    /// Declared names on one surface, sorted
    #[must_use]
    pub fn names(&self, kind: SurfaceKind) -> Vec<&str> {
        self.table(kind).keys().map(String::as_str).collect()
    }

    /// Initial-state directives on one surface
    #[must_use]
    pub fn initial_states(&self, kind: SurfaceKind) -> BTreeMap<String, Value> {
        self.table(kind)
            .iter()
            .filter_map(|(name, decl)| {
                decl.initial_state_value()
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// Declared surface, kept current on every declaration
    #[must_use]
    pub const fn descriptor(&self) -> &SurfaceDescriptor {
        &self.descriptor
    }

    /// Whether both registries still share the same declaration tables
    #[must_use]
    pub fn shares_tables_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.singleton, &other.singleton) && Rc::ptr_eq(&self.instance, &other.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut registry = Registry::new("User");
        registry.declare(SurfaceKind::Instance, Declaration::new("name").default_value("Josh"));

        let decl = registry.lookup(SurfaceKind::Instance, "name").unwrap();
        assert_eq!(decl.name(), "name");
        assert!(matches!(
            decl.default_behavior(),
            Some(Behavior::Fixed(Value::Str(s))) if s == "Josh"
        ));
    }

    #[test]
    fn test_lookup_is_per_surface() {
        let mut registry = Registry::new("User");
        registry.declare(SurfaceKind::Singleton, Declaration::new("find").arity(1));

        let err = registry.lookup(SurfaceKind::Instance, "find").unwrap_err();
        assert!(matches!(
            err,
            MimicryError::UndeclaredOperation {
                ref subject,
                surface: SurfaceKind::Instance,
                ref operation,
            } if subject == "User" && operation == "find"
        ));
    }

    #[test]
    fn test_redeclare_overwrites_entirely() {
        let mut registry = Registry::new("User");
        registry.declare(
            SurfaceKind::Instance,
            Declaration::new("name")
                .default_value("Josh")
                .initial_state("x")
                .hook(|_| Ok(())),
        );
        let previous = registry.declare(SurfaceKind::Instance, Declaration::new("name").arity(1));

        assert!(previous.is_some());
        let decl = registry.lookup(SurfaceKind::Instance, "name").unwrap();
        assert!(decl.default_behavior().is_none());
        assert!(decl.hook_fn().is_none());
        assert!(decl.initial_state_value().is_none());
        assert_eq!(
            registry.descriptor().arity(SurfaceKind::Instance, "name"),
            Some(Arity::exact(1))
        );
    }

    #[test]
    fn test_descriptor_tracks_declarations() {
        let mut registry = Registry::new("User");
        registry.declare(SurfaceKind::Singleton, Declaration::new("find").arity(1));
        registry.declare(SurfaceKind::Instance, Declaration::new("tags").variadic(0));

        let desc = registry.descriptor();
        assert_eq!(desc.name, "User");
        assert_eq!(desc.arity(SurfaceKind::Singleton, "find"), Some(Arity::exact(1)));
        assert_eq!(desc.arity(SurfaceKind::Instance, "tags"), Some(Arity::at_least(0)));
    }

    #[test]
    fn test_initial_states() {
        let mut registry = Registry::new("User");
        registry.declare(
            SurfaceKind::Instance,
            Declaration::new("phone_numbers").initial_state(Value::empty_list()),
        );
        registry.declare(SurfaceKind::Instance, Declaration::new("name"));

        let states = registry.initial_states(SurfaceKind::Instance);
        assert_eq!(states.len(), 1);
        assert_eq!(states.get("phone_numbers"), Some(&Value::empty_list()));
        assert!(registry.initial_states(SurfaceKind::Singleton).is_empty());
    }

    #[test]
    fn test_clone_is_copy_on_write() {
        let mut original = Registry::new("User");
        original.declare(SurfaceKind::Instance, Declaration::new("id"));

        let mut copy = original.clone();
        assert!(copy.shares_tables_with(&original));

        copy.declare(SurfaceKind::Instance, Declaration::new("email"));
        assert!(!copy.shares_tables_with(&original));
        assert!(copy.contains(SurfaceKind::Instance, "email"));
        assert!(!original.contains(SurfaceKind::Instance, "email"));
        assert!(!original.descriptor().contains(SurfaceKind::Instance, "email"));

        original.declare(SurfaceKind::Singleton, Declaration::new("all"));
        assert!(!copy.contains(SurfaceKind::Singleton, "all"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = Registry::new("User");
        for name in ["name", "address", "id"] {
            registry.declare(SurfaceKind::Instance, Declaration::new(name));
        }
        assert_eq!(registry.names(SurfaceKind::Instance), vec!["address", "id", "name"]);
    }
}
