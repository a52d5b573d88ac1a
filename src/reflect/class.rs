use crate::core::{ProxyError, Result, Value};
use crate::proxy::EntityProxy;
use crate::reflect::interface::methods::{EQUALS, HASH_CODE, TO_STRING};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased reference to a real entity instance.
pub type EntityRef = Arc<dyn Any + Send + Sync>;

/// Pointer identity between two entity references.
pub fn same_instance(a: &EntityRef, b: &EntityRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub(crate) fn instance_address(target: &EntityRef) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

/// Builds a bean accessor name: `("get", "name")` -> `getName`.
pub(crate) fn bean_accessor(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

/// Where a method was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub enum MethodOwner {
    /// Inherited identity methods (`equals`, `hashCode`, `toString`).
    Root,
    Entity(String),
    Interface(String),
}

/// Wrapper for a failure raised by the invoked method itself.
#[derive(Debug, Error)]
#[error("Invocation of '{method}' raised an error")]
pub struct InvocationTargetError {
    pub method: String,
    #[source]
    pub cause: anyhow::Error,
}

/// Failure of a reflective invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The call never reached the method (arity, access, receiver type).
    #[error(transparent)]
    Reflective(ProxyError),
    #[error(transparent)]
    Target(InvocationTargetError),
}

impl InvocationError {
    /// Drops the reflective wrapper and returns the original failure.
    pub fn into_cause(self) -> ProxyError {
        match self {
            Self::Reflective(err) => err,
            Self::Target(wrapper) => ProxyError::Target(wrapper.cause),
        }
    }
}

type Invoker =
    Arc<dyn Fn(&EntityRef, &[Value]) -> std::result::Result<Value, InvocationError> + Send + Sync>;

fn invoker<F>(f: F) -> Invoker
where
    F: Fn(&EntityRef, &[Value]) -> std::result::Result<Value, InvocationError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

pub type ConstructorHook = Arc<dyn Fn(&EntityProxy) -> Result<()> + Send + Sync>;

/// A callable member of an [`EntityClass`] or a capability interface.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    arity: usize,
    visibility: Visibility,
    owner: MethodOwner,
    invoker: Option<Invoker>,
}

impl MethodDescriptor {
    /// Abstract signature, used for interface methods.
    pub fn abstract_method(name: impl Into<String>, arity: usize, owner: MethodOwner) -> Self {
        Self {
            name: name.into(),
            arity,
            visibility: Visibility::Public,
            owner,
            invoker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn owner(&self) -> &MethodOwner {
        &self.owner
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn is_abstract(&self) -> bool {
        self.invoker.is_none()
    }

    pub fn matches(&self, name: &str, arity: usize) -> bool {
        self.name == name && self.arity == arity
    }

    pub fn signature(&self) -> String {
        format!("{}/{}", self.name, self.arity)
    }

    /// Invokes the method on `target`.
    ///
    /// Non-public methods require `accessible`.
    pub fn invoke(
        &self,
        target: &EntityRef,
        args: &[Value],
        accessible: bool,
    ) -> std::result::Result<Value, InvocationError> {
        if args.len() != self.arity {
            return Err(InvocationError::Reflective(ProxyError::IllegalArgument(
                format!(
                    "{} expects {} argument(s), got {}",
                    self.name,
                    self.arity,
                    args.len()
                ),
            )));
        }
        if !self.is_public() && !accessible {
            return Err(InvocationError::Reflective(ProxyError::IllegalAccess(
                self.name.clone(),
            )));
        }
        let Some(invoker) = &self.invoker else {
            return Err(InvocationError::Reflective(ProxyError::AbstractMethod(
                self.name.clone(),
            )));
        };
        invoker(target, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("visibility", &self.visibility)
            .field("owner", &self.owner)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// Runtime description of a persistent entity type.
///
/// Acts as the superclass of every generated proxy class: it owns the method
/// table the proxy intercepts and the default constructor used to build the
/// proxy's own (never loaded) instance.
pub struct EntityClass {
    name: String,
    type_id: TypeId,
    rust_type: &'static str,
    is_final: bool,
    methods: Vec<Arc<MethodDescriptor>>,
    instantiate: Arc<dyn Fn() -> EntityRef + Send + Sync>,
    constructor_hook: Option<ConstructorHook>,
}

impl EntityClass {
    pub fn builder<E>(name: impl Into<String>) -> EntityClassBuilder<E>
    where
        E: Default + Any + Send + Sync,
    {
        EntityClassBuilder::new(name.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    pub fn find_method(&self, name: &str, arity: usize) -> Option<&Arc<MethodDescriptor>> {
        self.methods.iter().find(|m| m.matches(name, arity))
    }

    /// Declared by the entity itself, not inherited from the root.
    pub fn declares(&self, name: &str, arity: usize) -> bool {
        self.find_method(name, arity)
            .is_some_and(|m| m.owner != MethodOwner::Root)
    }

    pub fn overrides_equals(&self) -> bool {
        self.declares(EQUALS, 1)
    }

    pub fn is_instance(&self, target: &EntityRef) -> bool {
        let any: &(dyn Any + Send + Sync) = &**target;
        any.type_id() == self.type_id
    }

    pub fn instantiate(&self) -> EntityRef {
        (self.instantiate)()
    }

    pub fn constructor_hook(&self) -> Option<&ConstructorHook> {
        self.constructor_hook.as_ref()
    }
}

impl fmt::Debug for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityClass")
            .field("name", &self.name)
            .field("rust_type", &self.rust_type)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Fluent builder for [`EntityClass`].
///
/// ```ignore
/// let class = EntityClass::builder::<User>("User")
///     .getter("getId", |u| Value::from(u.id))
///     .getter("getName", |u| Value::from(u.name()))
///     .method("rename", 1, |u, args| { u.rename(args[0].to_string()); Ok(Value::entity(u)) })
///     .build();
/// ```
pub struct EntityClassBuilder<E> {
    name: String,
    is_final: bool,
    methods: Vec<MethodDescriptor>,
    instantiate: Arc<dyn Fn() -> EntityRef + Send + Sync>,
    constructor_hook: Option<ConstructorHook>,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E> EntityClassBuilder<E>
where
    E: Default + Any + Send + Sync,
{
    fn new(name: String) -> Self {
        Self {
            name,
            is_final: false,
            methods: Vec::new(),
            instantiate: Arc::new(|| Arc::new(E::default()) as EntityRef),
            constructor_hook: None,
            _entity: std::marker::PhantomData,
        }
    }

    /// Declares a public method.
    pub fn method<F>(self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&Arc<E>, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.method_as(name, arity, Visibility::Public, f)
    }

    pub fn method_as<F>(mut self, name: &str, arity: usize, visibility: Visibility, f: F) -> Self
    where
        F: Fn(&Arc<E>, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let method_name = name.to_string();
        let class_name = self.name.clone();
        let invoker = invoker(move |target, args| {
            let typed = target.clone().downcast::<E>().map_err(|_| {
                InvocationError::Reflective(ProxyError::ClassCast(format!(
                    "receiver of {}.{} is not a {}",
                    class_name,
                    method_name,
                    std::any::type_name::<E>()
                )))
            })?;
            f(&typed, args).map_err(|cause| {
                InvocationError::Target(InvocationTargetError {
                    method: method_name.clone(),
                    cause,
                })
            })
        });
        self.methods.retain(|m| !m.matches(name, arity));
        self.methods.push(MethodDescriptor {
            name: name.to_string(),
            arity,
            visibility,
            owner: MethodOwner::Entity(self.name.clone()),
            invoker: Some(invoker),
        });
        self
    }

    /// Declares a public zero-argument accessor.
    pub fn getter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&E) -> Value + Send + Sync + 'static,
    {
        self.method(name, 0, move |entity, _| Ok(f(entity)))
    }

    /// Declares a public single-argument mutator returning nothing.
    pub fn setter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&E, Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.method(name, 1, move |entity, args| {
            f(entity, args[0].clone())?;
            Ok(Value::Null)
        })
    }

    pub fn instantiate_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.instantiate = Arc::new(move || Arc::new(f()) as EntityRef);
        self
    }

    /// Runs against the proxy while it is still being constructed.
    pub fn constructor_hook<F>(mut self, f: F) -> Self
    where
        F: Fn(&EntityProxy) -> Result<()> + Send + Sync + 'static,
    {
        self.constructor_hook = Some(Arc::new(f));
        self
    }

    /// Marks the class as not subclassable; proxy generation will fail.
    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn build(self) -> Arc<EntityClass> {
        let mut methods = self.methods;
        for root in root_methods(&self.name) {
            if !methods.iter().any(|m| m.matches(&root.name, root.arity)) {
                methods.push(root);
            }
        }
        Arc::new(EntityClass {
            name: self.name,
            type_id: TypeId::of::<E>(),
            rust_type: std::any::type_name::<E>(),
            is_final: self.is_final,
            methods: methods.into_iter().map(Arc::new).collect(),
            instantiate: self.instantiate,
            constructor_hook: self.constructor_hook,
        })
    }
}

/// Identity semantics every class inherits unless it declares its own.
fn root_methods(class_name: &str) -> Vec<MethodDescriptor> {
    let root = |name: &str, arity: usize, invoker: Invoker| MethodDescriptor {
        name: name.to_string(),
        arity,
        visibility: Visibility::Public,
        owner: MethodOwner::Root,
        invoker: Some(invoker),
    };
    let class_name = class_name.to_string();
    vec![
        root(
            EQUALS,
            1,
            invoker(|target, args| Ok(Value::Boolean(args[0].is_instance(target)))),
        ),
        root(
            HASH_CODE,
            0,
            invoker(|target, _| Ok(Value::Integer(instance_address(target) as i64))),
        ),
        root(
            TO_STRING,
            0,
            invoker(move |target, _| {
                Ok(Value::Text(format!(
                    "{}@{:x}",
                    class_name,
                    instance_address(target)
                )))
            }),
        ),
    ]
}
