//! Doubles and the resolution engine.
//!
//! A [`DoubleType`] owns the declarations for both surfaces plus the singleton
//! surface's overrides, ledger and state. Each [`Instance`] owns its own
//! overrides, ledger and state and reads declarations from its type.
//!
//! Every call resolves in a fixed order:
//!
//! ```text
//! lookup ──► arity ──► ledger ──► override ──► stored state ──► default ──► hook
//!   │          │                     │              │              │
//!   ▼          ▼                     ▼              ▼              ▼
//! Undeclared  ArityMismatch       queued head    state[name]    Fixed / Computed
//!                                  or single                    or Unprepared
//! ```
//!
//! Handles are `Rc<RefCell<..>>`: cloning a handle shares the subject,
//! [`DoubleType::reprise`] is the only way to get an independent copy. No
//! borrow is held while a computed default or hook runs, so behaviors may
//! call back into the same double (e.g. `find` constructing an instance).

use crate::config::DoubleConfig;
use crate::ledger::{InvocationRecord, Ledger};
use crate::overrides::{OverrideStore, Resolved};
use crate::registry::{Declaration, Registry};
use crate::result::{MimicryError, MimicryResult};
use crate::substitute::{check_substitutability, SubstitutabilityReport};
use crate::surface::{SurfaceDescriptor, SurfaceKind, Surfaced};
use crate::value::{format_args_list, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Operation name under which construction arguments are recorded
pub const INITIALIZER: &str = "initialize";

/// Overrides, ledger and state owned by one surface of one subject
#[derive(Debug, Default)]
struct SurfaceState {
    overrides: OverrideStore,
    ledger: Ledger,
    state: BTreeMap<String, Value>,
}

impl SurfaceState {
    fn with_state(state: BTreeMap<String, Value>) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

struct TypeInner {
    registry: Registry,
    surface: SurfaceState,
    config: DoubleConfig,
    instances_created: usize,
    reprised_from: Option<Uuid>,
}

/// A double type: declarations for both surfaces plus the singleton surface
///
/// # Example
///
/// ```
/// use mimicry::{args, Declaration, DoubleType, Subject, Value};
///
/// let user = DoubleType::new("User");
/// user.declare_singleton(Declaration::new("find").arity(1).computed(|call| {
///     let id = call.arg(0)?.clone();
///     Ok(Value::Instance(call.double_type().new_instance(vec![id])?))
/// }));
/// user.declare_instance(Declaration::new("name").default_value("Josh"));
///
/// let users = user.reprise();
/// users.will_queue("find", [Value::sym("a"), Value::sym("b")]).unwrap();
/// assert_eq!(users.call("find", args![1]).unwrap(), Value::sym("a"));
/// assert_eq!(users.call("find", args![2]).unwrap(), Value::sym("b"));
/// assert!(users.call("find", args![3]).unwrap().as_instance().is_some());
/// assert_eq!(users.times_told("find"), 3);
/// assert_eq!(user.times_told("find"), 0);
/// ```
#[derive(Clone)]
pub struct DoubleType {
    id: Uuid,
    name: Rc<str>,
    inner: Rc<RefCell<TypeInner>>,
}

impl DoubleType {
    /// Create a double type with the default config
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_config(name, DoubleConfig::default())
    }

    /// Create a double type with an explicit config
    #[must_use]
    pub fn with_config(name: &str, config: DoubleConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Rc::from(name),
            inner: Rc::new(RefCell::new(TypeInner {
                registry: Registry::new(name),
                surface: SurfaceState::default(),
                config,
                instances_created: 0,
                reprised_from: None,
            })),
        }
    }

    /// Unique id of this type (a reprise gets a fresh one)
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Type name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the type this one was reprised from
    #[must_use]
    pub fn reprised_from(&self) -> Option<Uuid> {
        self.inner.borrow().reprised_from
    }

    /// Number of instances constructed through this type
    #[must_use]
    pub fn instances_created(&self) -> usize {
        self.inner.borrow().instances_created
    }

    /// Register or replace an operation on either surface
    ///
    /// A singleton-surface initial-state directive is installed immediately;
    /// singleton state left by a replaced declaration is dropped.
    pub fn declare(&self, kind: SurfaceKind, declaration: Declaration) -> &Self {
        let mut inner = self.inner.borrow_mut();
        if kind == SurfaceKind::Singleton {
            let state = &mut inner.surface.state;
            state.remove(declaration.name());
            if let Some(value) = declaration.initial_state_value() {
                state.insert(declaration.name().to_string(), value.clone());
            }
        }
        debug!(
            double = %self.name,
            surface = %kind,
            operation = declaration.name(),
            arity = %declaration.declared_arity(),
            "operation declared"
        );
        inner.registry.declare(kind, declaration);
        drop(inner);
        self
    }

    /// Register or replace a singleton-surface operation
    pub fn declare_singleton(&self, declaration: Declaration) -> &Self {
        self.declare(SurfaceKind::Singleton, declaration)
    }

    /// Register or replace an instance-surface operation
    pub fn declare_instance(&self, declaration: Declaration) -> &Self {
        self.declare(SurfaceKind::Instance, declaration)
    }

    /// Independent copy: same declarations and config, empty ledger and overrides
    ///
    /// Declaration tables are shared until either side declares again.
    #[must_use]
    pub fn reprise(&self) -> Self {
        let inner = self.inner.borrow();
        let registry = inner.registry.clone();
        let state = registry.initial_states(SurfaceKind::Singleton);
        let reprise = Self {
            id: Uuid::new_v4(),
            name: Rc::clone(&self.name),
            inner: Rc::new(RefCell::new(TypeInner {
                registry,
                surface: SurfaceState::with_state(state),
                config: inner.config.clone(),
                instances_created: 0,
                reprised_from: Some(self.id),
            })),
        };
        debug!(double = %self.name, from = %self.id, to = %reprise.id, "double reprised");
        reprise
    }

    /// Invoke a singleton-surface operation
    pub fn call(&self, operation: &str, args: Vec<Value>) -> MimicryResult<Value> {
        resolve(Receiver::Type(self), operation, args, Mode::Operation)
    }

    /// Invoke a singleton-surface operation with no arguments
    pub fn ask(&self, operation: &str) -> MimicryResult<Value> {
        self.call(operation, Vec::new())
    }

    /// Construct an instance
    ///
    /// Instance-surface initial-state directives are installed first, then the
    /// arguments are recorded under [`INITIALIZER`] and, if declared, the
    /// initializer's default and hook run.
    pub fn new_instance(&self, args: Vec<Value>) -> MimicryResult<Instance> {
        let (state, has_initializer) = {
            let inner = self.inner.borrow();
            (
                inner.registry.initial_states(SurfaceKind::Instance),
                inner.registry.contains(SurfaceKind::Instance, INITIALIZER),
            )
        };
        let instance = Instance {
            id: Uuid::new_v4(),
            type_name: Rc::clone(&self.name),
            inner: Rc::new(RefCell::new(InstanceInner {
                double_type: self.clone(),
                surface: SurfaceState::with_state(state),
                initialized_with: args.clone(),
            })),
        };
        if has_initializer {
            resolve(Receiver::Instance(&instance), INITIALIZER, args, Mode::Initializer)?;
        } else {
            instance
                .inner
                .borrow_mut()
                .surface
                .ledger
                .append(INITIALIZER, args);
        }
        self.inner.borrow_mut().instances_created += 1;
        debug!(double = %self.name, instance = %instance.id, "instance constructed");
        Ok(instance)
    }

    /// Single override for a singleton operation
    ///
    /// Overrides and state hold values strongly. An [`Instance`] of this type
    /// stored here forms an `Rc` cycle with the type and stays allocated until
    /// the override is cleared.
    pub fn will(&self, operation: &str, value: impl Into<Value>) -> MimicryResult<&Self> {
        set_override(Receiver::Type(self), operation, OverrideKind::Single(value.into()))?;
        Ok(self)
    }

    /// Alias of [`will`](Self::will) for accessor-style operations
    pub fn will_have(&self, operation: &str, value: impl Into<Value>) -> MimicryResult<&Self> {
        self.will(operation, value)
    }

    /// Queue of overrides for a singleton operation, consumed one per call
    ///
    /// Queued instances of this type keep it alive until they are consumed,
    /// as with [`will`](Self::will).
    pub fn will_queue<I, V>(&self, operation: &str, values: I) -> MimicryResult<&Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        set_override(Receiver::Type(self), operation, OverrideKind::Queue(values))?;
        Ok(self)
    }

    /// Drop the single override and queue for a singleton operation
    pub fn clear_overrides(&self, operation: &str) {
        self.inner.borrow_mut().surface.overrides.clear(operation);
    }

    /// Remaining queued overrides for a singleton operation
    #[must_use]
    pub fn queued(&self, operation: &str) -> usize {
        self.inner.borrow().surface.overrides.queued_len(operation)
    }

    /// Singleton-surface state
    #[must_use]
    pub fn state(&self, key: &str) -> Option<Value> {
        self.inner.borrow().surface.state.get(key).cloned()
    }

    /// Declared names on one surface, sorted
    #[must_use]
    pub fn declared(&self, kind: SurfaceKind) -> Vec<String> {
        self.inner
            .borrow()
            .registry
            .names(kind)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Declared surface of this double
    #[must_use]
    pub fn surface(&self) -> SurfaceDescriptor {
        self.inner.borrow().registry.descriptor().clone()
    }

    /// Full comparison against a candidate surface
    #[must_use]
    pub fn substitutability(&self, candidate: &SurfaceDescriptor) -> SubstitutabilityReport {
        check_substitutability(&self.surface(), candidate)
    }

    /// Whether `candidate` exactly matches this double's declared surface
    #[must_use]
    pub fn is_substitutable_for(&self, candidate: &SurfaceDescriptor) -> bool {
        self.substitutability(candidate).is_substitutable()
    }

    /// Whether a [`Surfaced`] real type exactly matches this double
    #[must_use]
    pub fn is_substitutable_for_type<T: Surfaced>(&self) -> bool {
        self.is_substitutable_for(&T::surface())
    }

    /// Whether both handles point at the same type
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this type and `other` still share declaration tables
    #[must_use]
    pub fn shares_declarations_with(&self, other: &Self) -> bool {
        self.inner
            .borrow()
            .registry
            .shares_tables_with(&other.inner.borrow().registry)
    }
}

impl fmt::Display for DoubleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for DoubleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DoubleType");
        s.field("id", &self.id).field("name", &self.name);
        if let Ok(inner) = self.inner.try_borrow() {
            s.field("singleton", &inner.registry.names(SurfaceKind::Singleton))
                .field("instance", &inner.registry.names(SurfaceKind::Instance))
                .field("invocations", &inner.surface.ledger.len())
                .field("reprised_from", &inner.reprised_from);
        }
        s.finish()
    }
}

struct InstanceInner {
    double_type: DoubleType,
    surface: SurfaceState,
    initialized_with: Vec<Value>,
}

/// An instance of a double type, with its own overrides, ledger and state
#[derive(Clone)]
pub struct Instance {
    id: Uuid,
    type_name: Rc<str>,
    inner: Rc<RefCell<InstanceInner>>,
}

impl Instance {
    /// Unique id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the double type
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Handle to the double type this instance was built from
    #[must_use]
    pub fn double_type(&self) -> DoubleType {
        self.inner.borrow().double_type.clone()
    }

    /// Invoke an instance-surface operation
    pub fn call(&self, operation: &str, args: Vec<Value>) -> MimicryResult<Value> {
        resolve(Receiver::Instance(self), operation, args, Mode::Operation)
    }

    /// Invoke an accessor-style operation (no arguments)
    pub fn ask(&self, operation: &str) -> MimicryResult<Value> {
        self.call(operation, Vec::new())
    }

    /// Single override for an instance operation
    pub fn will(&self, operation: &str, value: impl Into<Value>) -> MimicryResult<&Self> {
        set_override(Receiver::Instance(self), operation, OverrideKind::Single(value.into()))?;
        Ok(self)
    }

    /// Alias of [`will`](Self::will) for accessor-style operations
    pub fn will_have(&self, operation: &str, value: impl Into<Value>) -> MimicryResult<&Self> {
        self.will(operation, value)
    }

    /// Queue of overrides for an instance operation, consumed one per call
    pub fn will_queue<I, V>(&self, operation: &str, values: I) -> MimicryResult<&Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        set_override(Receiver::Instance(self), operation, OverrideKind::Queue(values))?;
        Ok(self)
    }

    /// Drop the single override and queue for an instance operation
    pub fn clear_overrides(&self, operation: &str) {
        self.inner.borrow_mut().surface.overrides.clear(operation);
    }

    /// Stored state under `key`
    #[must_use]
    pub fn state(&self, key: &str) -> Option<Value> {
        self.inner.borrow().surface.state.get(key).cloned()
    }

    /// Arguments the instance was constructed with
    #[must_use]
    pub fn initialized_with(&self) -> Vec<Value> {
        self.inner.borrow().initialized_with.clone()
    }

    /// Whether both handles point at the same instance
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.simple().to_string();
        write!(f, "#<{} {}>", self.type_name, &id[..8])
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Instance");
        s.field("id", &self.id).field("type", &self.type_name);
        if let Ok(inner) = self.inner.try_borrow() {
            s.field("state", &inner.surface.state.keys().collect::<Vec<_>>())
                .field("invocations", &inner.surface.ledger.len());
        }
        s.finish()
    }
}

/// Read-only view of a subject's invocation history
///
/// Implemented by both [`DoubleType`] (singleton surface) and [`Instance`]
/// (instance surface); the expectation layer is written against it.
pub trait Subject {
    /// Name used in messages
    fn subject_name(&self) -> String;

    /// Surface this subject records
    fn surface_kind(&self) -> SurfaceKind;

    /// Config of the owning double type
    fn config(&self) -> DoubleConfig;

    /// Run `f` against the ledger
    fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R;

    /// Snapshot of the ledger
    fn ledger(&self) -> Ledger {
        self.with_ledger(|ledger| ledger.clone())
    }

    /// Snapshot of every record
    fn records(&self) -> Vec<InvocationRecord> {
        self.with_ledger(|ledger| ledger.records().to_vec())
    }

    /// Calls to `operation` with any arguments
    fn times_told(&self, operation: &str) -> usize {
        self.with_ledger(|ledger| ledger.times_told(operation))
    }

    /// Whether `operation` was called with exactly `args`
    fn told_with(&self, operation: &str, args: &[Value]) -> bool {
        self.with_ledger(|ledger| ledger.told_with(operation, args))
    }

    /// Calls to `operation` with exactly `args`
    fn times_told_with(&self, operation: &str, args: &[Value]) -> usize {
        self.with_ledger(|ledger| ledger.times_told_with(operation, args))
    }

    /// Whether some `first(first_args)` call precedes some `second(second_args)` call
    fn told_before(
        &self,
        first: &str,
        first_args: &[Value],
        second: &str,
        second_args: &[Value],
    ) -> bool {
        self.with_ledger(|ledger| {
            ledger.told_before(first, Some(first_args), second, Some(second_args))
        })
    }

    /// Whether an accessor-style operation has been read at all
    fn was_asked_for(&self, operation: &str) -> bool {
        self.times_told(operation) > 0
    }
}

impl Subject for DoubleType {
    fn subject_name(&self) -> String {
        self.name.to_string()
    }

    fn surface_kind(&self) -> SurfaceKind {
        SurfaceKind::Singleton
    }

    fn config(&self) -> DoubleConfig {
        self.inner.borrow().config.clone()
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.borrow().surface.ledger)
    }
}

impl Subject for Instance {
    fn subject_name(&self) -> String {
        self.to_string()
    }

    fn surface_kind(&self) -> SurfaceKind {
        SurfaceKind::Instance
    }

    fn config(&self) -> DoubleConfig {
        self.double_type().config()
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.borrow().surface.ledger)
    }
}

/// Context handed to computed defaults
///
/// Gives access to the call's arguments, the receiving subject and its state.
/// State written here is what later reads of an accessor return.
pub struct Call<'a> {
    operation: &'a str,
    args: &'a [Value],
    receiver: Receiver<'a>,
}

impl<'a> Call<'a> {
    /// Operation being resolved
    #[must_use]
    pub const fn operation(&self) -> &'a str {
        self.operation
    }

    /// All arguments
    #[must_use]
    pub const fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> MimicryResult<&'a Value> {
        self.args
            .get(index)
            .ok_or_else(|| MimicryError::MissingArgument {
                operation: self.operation.to_string(),
                index,
            })
    }

    /// Surface the call was made on
    #[must_use]
    pub const fn surface(&self) -> SurfaceKind {
        self.receiver.kind()
    }

    /// The double type (for instance calls, the instance's type)
    #[must_use]
    pub fn double_type(&self) -> DoubleType {
        self.receiver.double_type()
    }

    /// The receiving instance, for instance-surface calls
    #[must_use]
    pub const fn instance(&self) -> Option<&'a Instance> {
        match self.receiver {
            Receiver::Instance(instance) => Some(instance),
            Receiver::Type(_) => None,
        }
    }

    /// Read the receiver's state
    #[must_use]
    pub fn state(&self, key: &str) -> Option<Value> {
        self.receiver.with_surface(|s| s.state.get(key).cloned())
    }

    /// Write the receiver's state
    pub fn set_state(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.receiver.with_surface(|s| {
            s.state.insert(key.to_string(), value);
        });
    }

    /// Append to a list held in the receiver's state, creating it if absent
    pub fn push_state(&self, key: &str, value: impl Into<Value>) -> MimicryResult<()> {
        let value = value.into();
        self.receiver.with_surface(|s| {
            match s.state.entry(key.to_string()).or_insert_with(Value::empty_list) {
                Value::List(items) => {
                    items.push(value);
                    Ok(())
                }
                other => Err(MimicryError::behavior(
                    self.operation,
                    format!("state `{key}` holds a {}, not a list", other.kind()),
                )),
            }
        })
    }
}

impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("operation", &self.operation)
            .field("args", &self.args)
            .field("surface", &self.receiver.kind())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Receiver<'a> {
    Type(&'a DoubleType),
    Instance(&'a Instance),
}

impl Receiver<'_> {
    const fn kind(self) -> SurfaceKind {
        match self {
            Self::Type(_) => SurfaceKind::Singleton,
            Self::Instance(_) => SurfaceKind::Instance,
        }
    }

    fn double_type(self) -> DoubleType {
        match self {
            Self::Type(double) => double.clone(),
            Self::Instance(instance) => instance.double_type(),
        }
    }

    fn with_surface<R>(self, f: impl FnOnce(&mut SurfaceState) -> R) -> R {
        match self {
            Self::Type(double) => f(&mut double.inner.borrow_mut().surface),
            Self::Instance(instance) => f(&mut instance.inner.borrow_mut().surface),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Operation,
    /// Construction: stored state is not consulted and a missing default is not an error
    Initializer,
}

enum OverrideKind {
    Single(Value),
    Queue(Vec<Value>),
}

fn set_override(receiver: Receiver<'_>, operation: &str, kind: OverrideKind) -> MimicryResult<()> {
    let double = receiver.double_type();
    double
        .inner
        .borrow()
        .registry
        .lookup(receiver.kind(), operation)?;
    receiver.with_surface(|s| match kind {
        OverrideKind::Single(value) => s.overrides.set_single(operation, value),
        OverrideKind::Queue(values) => s.overrides.set_queue(operation, values),
    });
    Ok(())
}

fn resolve(
    receiver: Receiver<'_>,
    operation: &str,
    args: Vec<Value>,
    mode: Mode,
) -> MimicryResult<Value> {
    let kind = receiver.kind();
    let double = receiver.double_type();
    let (declaration, config) = {
        let inner = double.inner.borrow();
        (inner.registry.lookup(kind, operation)?, inner.config.clone())
    };

    let arity = declaration.declared_arity();
    if config.check_arity && !arity.accepts(args.len()) {
        return Err(MimicryError::ArityMismatch {
            subject: double.name().to_string(),
            operation: operation.to_string(),
            expected: arity,
            actual: args.len(),
        });
    }

    let sequence = receiver.with_surface(|s| s.ledger.append(operation, args.clone()));
    if config.log_invocations {
        debug!(
            double = %double.name,
            surface = %kind,
            operation,
            sequence,
            args = %format_args_list(&args),
            "invocation recorded"
        );
    }

    let value = match receiver.with_surface(|s| s.overrides.next(operation)) {
        Resolved::Queued(value) => {
            trace!(operation, sequence, "queued override consumed");
            value
        }
        Resolved::Single(value) => value,
        Resolved::None => {
            if let Some(stored) = (mode == Mode::Operation)
                .then(|| receiver.with_surface(|s| s.state.get(operation).cloned()))
                .flatten()
            {
                stored
            } else {
                match declaration.default_behavior() {
                    Some(behavior) => behavior.evaluate(&Call {
                        operation,
                        args: &args,
                        receiver,
                    })?,
                    None if mode == Mode::Initializer => Value::Nil,
                    None => {
                        return Err(MimicryError::UnpreparedOperation {
                            subject: double.name().to_string(),
                            operation: operation.to_string(),
                        })
                    }
                }
            }
        }
    };

    if let Some(hook) = declaration.hook_fn() {
        if let Err(err) = hook(&args) {
            warn!(double = %double.name, operation, sequence, error = %err, "hook failed");
            return Err(err);
        }
    }

    Ok(value)
}
