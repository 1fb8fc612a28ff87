use alloc::{sync::Arc, vec::Vec};
use core::fmt::{self, Display, Formatter};
use tracing::{debug, error};

use crate::{
    any::AnyService,
    call::Call,
    callable::{boxed, BoxCloneCallable},
    errors::{InstantiateErrorKind, ResolveErrorKind},
    names::split_method_ref,
    params::parse_parameter_names,
    Injector, Locals,
};

pub(crate) type BoxedCloneCallable = BoxCloneCallable<Call, Option<AnyService>, InstantiateErrorKind>;

#[derive(Clone)]
enum Kind {
    Names { names: Arc<[Arc<str>]>, func: BoxedCloneCallable },
    Declared { declaration: Arc<str>, func: BoxedCloneCallable },
    MethodRef { reference: Arc<str> },
}

/// A callable together with the ordered names of the dependencies it receives.
///
/// Every injectable reduces to `(names, callable, receiver)` before it's called:
/// - [`Injectable::new`] lists the names explicitly;
/// - [`Injectable::declared`] parses them out of the callable's declaration text on first resolution;
/// - [`Injectable::method`] addresses a method of a registered service as `service:method`.
///
/// # State
/// The callable is cloned for every call, so state captured by value starts fresh each time.
/// Use a shared pointer for state that must survive between calls.
#[derive(Clone)]
pub struct Injectable {
    kind: Kind,
}

impl Injectable {
    /// Creates an injectable that receives `names`, resolved in order.
    #[must_use]
    pub fn new<I, N, F>(names: I, func: F) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Arc<str>>,
        F: FnMut(Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            kind: Kind::Names {
                names: names.into_iter().map(Into::into).collect::<Vec<_>>().into(),
                func: boxed(func),
            },
        }
    }

    /// Creates an injectable without dependencies.
    ///
    /// ```
    /// use radis::{value, Injectable, Module};
    ///
    /// let m1 = Module::new("m1", []).unwrap();
    /// m1.factory("s1", Injectable::from_fn(|_call| Ok(value(42u32)))).unwrap()
    ///     .run(Injectable::from_fn(|_call| Ok(None))).unwrap();
    ///
    /// assert_eq!(*m1.bootstrap().unwrap().get::<u32>("s1").unwrap(), 42);
    /// ```
    #[must_use]
    pub fn from_fn<F>(func: F) -> Self
    where
        F: FnMut(Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            kind: Kind::Names {
                names: Vec::new().into(),
                func: boxed(func),
            },
        }
    }

    /// Creates an injectable whose names are read from `declaration`, for example `"|s1, s2|"` or `"fn(s1: u32)"`.
    ///
    /// The declaration is parsed the first time the injectable is resolved, so a malformed one
    /// is reported by the invoke that uses it, not here.
    /// See [`crate::parse_parameter_names`] for the supported shapes.
    #[must_use]
    pub fn declared<D, F>(declaration: D, func: F) -> Self
    where
        D: Into<Arc<str>>,
        F: FnMut(Call) -> Result<Option<AnyService>, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            kind: Kind::Declared {
                declaration: declaration.into(),
                func: boxed(func),
            },
        }
    }

    /// Creates a `service:method` injectable.
    ///
    /// Resolving it resolves `service`, looks `method` up in the service's method table
    /// and binds the method to the service instance.
    #[must_use]
    pub fn method(reference: impl Into<Arc<str>>) -> Self {
        Self {
            kind: Kind::MethodRef {
                reference: reference.into(),
            },
        }
    }

    /// Checks the shape of the injectable without resolving anything.
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        match &self.kind {
            Kind::Names { names, .. } => {
                if names.iter().any(|name| name.is_empty()) {
                    return Err("dependency names can't be empty");
                }
            }
            Kind::Declared { declaration, .. } => {
                if declaration.trim().is_empty() {
                    return Err("declaration can't be empty");
                }
            }
            Kind::MethodRef { reference } => {
                if split_method_ref(reference).is_none() {
                    return Err("service method reference must look like `service:method`");
                }
            }
        }
        Ok(())
    }

    /// Reduces the injectable to its names, callable and, for service methods, the bound service.
    pub(crate) fn resolve(&self, injector: &Injector) -> Result<Resolved, ResolveErrorKind> {
        match &self.kind {
            Kind::Names { names, func } => Ok(Resolved {
                names: names.clone(),
                func: func.clone(),
                receiver: None,
            }),
            Kind::Declared { declaration, func } => {
                let names = parse_parameter_names(declaration)?;
                debug!(names = ?names, "Parsed declaration");
                Ok(Resolved {
                    names: names.into(),
                    func: func.clone(),
                    receiver: None,
                })
            }
            Kind::MethodRef { reference } => {
                let Some((service_name, method_name)) = split_method_ref(reference) else {
                    let err = ResolveErrorKind::InvalidInjectable {
                        injectable: reference.clone(),
                        reason: "service method reference must look like `service:method`",
                    };
                    error!("{}", err);
                    return Err(err);
                };

                let service = injector.get_service(service_name, &Locals::new())?;
                let Some(method) = injector
                    .method(service_name, method_name)
                    .filter(|method| !matches!(method.kind, Kind::MethodRef { .. }))
                else {
                    let err = ResolveErrorKind::NoMethod {
                        service: Arc::from(service_name),
                        method: Arc::from(method_name),
                    };
                    error!("{}", err);
                    return Err(err);
                };

                let mut resolved = method.resolve(injector)?;
                resolved.receiver = Some(service);
                Ok(resolved)
            }
        }
    }
}

impl Display for Injectable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Names { names, .. } => {
                f.write_str("[")?;
                for (index, name) in names.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                }
                f.write_str("]")
            }
            Kind::Declared { declaration, .. } => f.write_str(declaration),
            Kind::MethodRef { reference } => f.write_str(reference),
        }
    }
}

impl fmt::Debug for Injectable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Injectable({self})")
    }
}

/// Normalized form of an [`Injectable`]
#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) names: Arc<[Arc<str>]>,
    pub(crate) func: BoxedCloneCallable,
    pub(crate) receiver: Option<AnyService>,
}
