use alloc::{string::String, sync::Arc, vec::Vec};
use core::{
    fmt::{self, Display, Formatter},
    marker::PhantomData,
};

use crate::{
    any::{value, AnyService},
    call::Call,
    callable::{boxed, BoxCloneCallable, Callable as _},
    errors::InstantiateErrorKind,
    names::{INJECTOR, NAME},
    Injectable, Injector, Locals,
};

/// A service built by instantiating a type with its dependencies.
///
/// ```
/// use radis::{value, Call, InstantiateErrorKind, Methods, ServiceClass};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl ServiceClass for Greeter {
///     const INJECT: &'static [&'static str] = &["$name"];
///
///     fn construct(call: Call) -> Result<Self, InstantiateErrorKind> {
///         let name = call.get::<String>(0)?;
///         Ok(Self { greeting: format!("Hello from {name}") })
///     }
///
///     fn methods() -> Methods<Self> {
///         Methods::new().method("greet", ["$injector"], |this: &Self, _call| Ok(value(this.greeting.clone())))
///     }
/// }
/// ```
pub trait ServiceClass: Sized + Send + Sync + 'static {
    /// Names resolved and passed to [`ServiceClass::construct`], in order
    const INJECT: &'static [&'static str] = &[];

    /// Builds the service from the values of [`ServiceClass::INJECT`].
    ///
    /// When registered with [`crate::Module::service`], `$name` is available as a local
    /// holding the registered name as a [`String`].
    ///
    /// # Errors
    /// Any error stops the construction and is reported through the resolution that triggered it
    fn construct(call: Call) -> Result<Self, InstantiateErrorKind>;

    /// Methods addressable as `service:method` injectables
    #[must_use]
    fn methods() -> Methods<Self> {
        Methods::new()
    }
}

/// A provider object with a `$get` injectable building the service.
///
/// The object itself is reachable as `<name>Provider`, so config hooks can tune it before the service is built.
pub trait ProviderClass: Sized + Send + Sync + 'static {
    /// # Errors
    /// Any error stops the construction and is reported through the resolution that triggered it
    fn construct(injector: &Injector, name: &str) -> Result<Self, InstantiateErrorKind>;

    /// The `$get` injectable.
    ///
    /// It's invoked at most once, with the provider object as its receiver and `$name` as a local.
    fn get(&self) -> Injectable;
}

/// Method table of a [`ServiceClass`]
pub struct Methods<S> {
    entries: Vec<(&'static str, Injectable)>,
    _service: PhantomData<fn() -> S>,
}

impl<S: ServiceClass> Methods<S> {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            _service: PhantomData,
        }
    }

    /// Adds a method receiving `names`; `f` gets the service instance it's bound to.
    #[must_use]
    pub fn method<I, N, F>(mut self, name: &'static str, names: I, f: F) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Arc<str>>,
        F: Fn(&S, Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        self.entries.push((name, Injectable::new(names, bind(f))));
        self
    }

    /// Adds a method whose names are parsed from `declaration`.
    #[must_use]
    pub fn declared_method<D, F>(mut self, name: &'static str, declaration: D, f: F) -> Self
    where
        D: Into<Arc<str>>,
        F: Fn(&S, Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        self.entries.push((name, Injectable::declared(declaration, bind(f))));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Injectable> {
        self.entries
            .iter()
            .rev()
            .find(|(method, _)| *method == name)
            .map(|(_, injectable)| injectable.clone())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: ServiceClass> Default for Methods<S> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

fn bind<S, F>(f: F) -> impl FnMut(Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static
where
    S: ServiceClass,
    F: Fn(&S, Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
{
    move |call: Call| {
        let this = call.receiver_as::<S>()?;
        f(&this, call)
    }
}

fn method_lookup<S: ServiceClass>(name: &str) -> Option<Injectable> {
    S::methods().get(name)
}

/// Provider object registered by [`crate::Module::service`]
pub struct ServiceProvider<S> {
    name: Arc<str>,
    _service: PhantomData<fn() -> S>,
}

impl<S> ServiceProvider<S> {
    /// Name the service is registered under
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: ServiceClass> ProviderClass for ServiceProvider<S> {
    fn construct(_injector: &Injector, name: &str) -> Result<Self, InstantiateErrorKind> {
        Ok(Self {
            name: Arc::from(name),
            _service: PhantomData,
        })
    }

    fn get(&self) -> Injectable {
        Injectable::new([INJECTOR], |call: Call| {
            let this = call.receiver_as::<Self>()?;
            let injector = call.get::<Injector>(0)?;
            let service = injector.instantiate::<S>(&Locals::new().with(NAME, String::from(this.name())))?;
            Ok(value(service))
        })
    }
}

/// Provider object registered by [`crate::Module::factory`]
pub struct FactoryProvider {
    name: Arc<str>,
    injectable: Injectable,
}

impl FactoryProvider {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The factory injectable
    #[inline]
    #[must_use]
    pub fn injectable(&self) -> &Injectable {
        &self.injectable
    }

    fn get() -> Injectable {
        Injectable::new([INJECTOR], |call: Call| {
            let this = call.receiver_as::<Self>()?;
            let injector = call.get::<Injector>(0)?;
            let locals = Locals::new().with(NAME, String::from(this.name()));
            Ok(injector.invoke(&this.injectable, Some(call.get_any(0)?), &locals)?)
        })
    }
}

/// A provider object built by a descriptor
#[derive(Clone)]
pub(crate) struct BuiltProvider {
    pub(crate) object: AnyService,
    pub(crate) get: Injectable,
}

pub(crate) type BoxedCloneConstructor = BoxCloneCallable<(Injector, Arc<str>), BuiltProvider, InstantiateErrorKind>;

pub(crate) type MethodLookup = fn(&str) -> Option<Injectable>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DescriptorKind {
    Service,
    Factory,
    Provider,
}

impl DescriptorKind {
    #[must_use]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Factory => "factory",
            Self::Provider => "provider",
        }
    }
}

impl Display for DescriptorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a module builds the provider of a registered name
#[derive(Clone)]
pub(crate) struct ProviderDescriptor {
    pub(crate) kind: DescriptorKind,
    constructor: BoxedCloneConstructor,
    methods: Option<MethodLookup>,
}

impl ProviderDescriptor {
    #[must_use]
    pub(crate) fn service<S: ServiceClass>() -> Self {
        Self {
            kind: DescriptorKind::Service,
            constructor: constructor_of::<ServiceProvider<S>>(),
            methods: Some(method_lookup::<S> as MethodLookup),
        }
    }

    #[must_use]
    pub(crate) fn factory(injectable: Injectable) -> Self {
        Self {
            kind: DescriptorKind::Factory,
            constructor: boxed(move |(_injector, name): (Injector, Arc<str>)| {
                let provider = FactoryProvider {
                    name,
                    injectable: injectable.clone(),
                };
                Ok(BuiltProvider {
                    object: Arc::new(provider),
                    get: FactoryProvider::get(),
                })
            }),
            methods: None,
        }
    }

    #[must_use]
    pub(crate) fn provider<P: ProviderClass>() -> Self {
        Self {
            kind: DescriptorKind::Provider,
            constructor: constructor_of::<P>(),
            methods: None,
        }
    }

    pub(crate) fn construct(&self, injector: &Injector, name: &Arc<str>) -> Result<BuiltProvider, InstantiateErrorKind> {
        self.constructor.clone().call((injector.clone(), name.clone()))
    }

    #[must_use]
    pub(crate) fn method(&self, name: &str) -> Option<Injectable> {
        self.methods.and_then(|lookup| lookup(name))
    }
}

fn constructor_of<P: ProviderClass>() -> BoxedCloneConstructor {
    boxed(|(injector, name): (Injector, Arc<str>)| {
        let provider = P::construct(&injector, &name)?;
        let get = provider.get();
        Ok(BuiltProvider {
            object: Arc::new(provider),
            get,
        })
    })
}
