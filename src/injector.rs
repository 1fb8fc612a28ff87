use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::{
    any::type_name,
    fmt::{self, Formatter},
};
use tracing::{debug, debug_span, error, info_span};

use crate::{
    any::{AnyService, TypeInfo},
    bag::ServiceBag,
    call::Call,
    callable::Callable as _,
    errors::{InvokeErrorKind, ResolveErrorKind},
    injectable::Resolved,
    lift::Lifted,
    names::{provider_stem, INJECTOR},
    provider::ServiceClass,
    Injectable, Locals,
};

/// Resolves services by name.
///
/// An injector is built by [`crate::Module::bootstrap`] for every module of the tree.
/// Injectors of the same tree share their service bags, so each service is built once
/// no matter which injector asks for it first.
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

struct InjectorInner {
    module: Arc<str>,
    services: BTreeMap<Arc<str>, Arc<ServiceBag>>,
}

impl Injector {
    #[inline]
    #[must_use]
    pub(crate) fn new(module: Arc<str>, services: BTreeMap<Arc<str>, Arc<ServiceBag>>) -> Self {
        Self {
            inner: Arc::new(InjectorInner { module, services }),
        }
    }

    /// Name of the module the injector was built for
    #[inline]
    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.inner.module
    }

    /// Checks whether a service with `name` is registered in the module or one of its dependencies
    #[inline]
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.inner.services.contains_key(name)
    }

    /// Names of every registered service, sorted
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.inner.services.keys().map(|name| &**name)
    }

    /// Checks whether both handles point to the same injector
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    #[must_use]
    pub(crate) fn services(&self) -> &BTreeMap<Arc<str>, Arc<ServiceBag>> {
        &self.inner.services
    }

    #[inline]
    #[must_use]
    pub(crate) fn as_any(&self) -> AnyService {
        Arc::new(self.clone())
    }

    #[inline]
    #[must_use]
    pub(crate) fn method(&self, service: &str, method: &str) -> Option<Injectable> {
        self.inner.services.get(service).and_then(|bag| bag.method(method))
    }

    /// Resolves a value by name.
    ///
    /// Lookup order:
    /// 1. `locals`, which shadow everything else;
    /// 2. `$injector`, the injector itself;
    /// 3. `<name>Provider`, the provider object of `name`, built on demand;
    /// 4. the service registered under `name`, built on demand by its provider's `$get`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoService`] if the name isn't registered
    /// - Returns [`ResolveErrorKind::CyclicDependency`] if the service is requested while it's being built
    /// - Returns [`ResolveErrorKind::Provider`] if the provider can't be constructed
    /// - Returns [`ResolveErrorKind::Get`] if `$get` fails
    /// - Returns [`ResolveErrorKind::AbsentService`] if `$get` returns nothing
    pub fn get_service(&self, name: &str, locals: &Locals) -> Result<AnyService, ResolveErrorKind> {
        let span = info_span!("get_service", service = name, injector = self.module_name());
        let _guard = span.enter();

        if let Some(local) = locals.get(name) {
            debug!("Found in locals");
            return Ok(local.clone());
        }

        if name == INJECTOR {
            return Ok(self.as_any());
        }

        if let Some(stem) = provider_stem(name) {
            let Some(bag) = self.inner.services.get(stem) else {
                let err = ResolveErrorKind::NoService { name: Arc::from(name) };
                error!("{}", err);
                return Err(err);
            };
            return bag.provider(self).map(|provider| provider.object);
        }

        let Some(bag) = self.inner.services.get(name) else {
            let err = ResolveErrorKind::NoService { name: Arc::from(name) };
            error!("{}", err);
            return Err(err);
        };
        bag.service(self)
    }

    /// Resolves a service by name and downcasts it to `T`
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the service isn't a `T`
    /// - Returns any error of [`Injector::get_service`]
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ResolveErrorKind> {
        self.get_service(name, &Locals::new())?.downcast().map_err(|_| {
            let err = ResolveErrorKind::IncorrectType {
                name: Arc::from(name),
                expected: TypeInfo::of::<T>(),
            };
            error!("{}", err);
            err
        })
    }

    /// Calls `injectable` with its dependencies resolved against `locals` and the injector.
    ///
    /// The callable is bound to, in order of preference: the service of a `service:method` injectable,
    /// `receiver`, the injector itself. The return value is passed through as is, including `None`.
    ///
    /// # Errors
    /// - Returns [`InvokeErrorKind::Deps`] if the injectable can't be normalized or a dependency can't be resolved
    /// - Returns [`InvokeErrorKind::Call`] if the callable returns an error
    pub fn invoke(
        &self,
        injectable: &Injectable,
        receiver: Option<AnyService>,
        locals: &Locals,
    ) -> Result<Option<AnyService>, InvokeErrorKind> {
        let span = debug_span!("invoke", %injectable, injector = self.module_name());
        let _guard = span.enter();

        let resolved = injectable.resolve(self)?;
        self.call_resolved(resolved, receiver, locals)
    }

    /// Builds `S` with the values of [`ServiceClass::INJECT`], resolved against `locals` and the injector
    ///
    /// # Errors
    /// - Returns [`InvokeErrorKind::Deps`] if a dependency can't be resolved
    /// - Returns [`InvokeErrorKind::Call`] if [`ServiceClass::construct`] returns an error
    pub fn instantiate<S: ServiceClass>(&self, locals: &Locals) -> Result<S, InvokeErrorKind> {
        let span = debug_span!("instantiate", class = type_name::<S>());
        let _guard = span.enter();

        let names: Arc<[Arc<str>]> = S::INJECT.iter().map(|name| Arc::from(*name)).collect();
        let args = self.resolve_all(&names, locals)?;

        S::construct(Call::new(self.as_any(), names, args)).map_err(|err| {
            error!("{}", err);
            err.into()
        })
    }

    /// Binds `injectable` to the injector without resolving anything yet.
    ///
    /// The returned [`Lifted`] maps its positional arguments to `param_names` and passes them as locals,
    /// on top of `locals`. See [`Lifted::call`].
    #[must_use]
    pub fn lift<I, N>(&self, injectable: Injectable, receiver: Option<AnyService>, param_names: I, locals: Locals) -> Lifted
    where
        I: IntoIterator<Item = N>,
        N: Into<Arc<str>>,
    {
        Lifted::new(
            self.clone(),
            injectable,
            receiver,
            param_names.into_iter().map(Into::into).collect(),
            locals,
        )
    }

    fn resolve_all(&self, names: &[Arc<str>], locals: &Locals) -> Result<Vec<AnyService>, ResolveErrorKind> {
        names.iter().map(|name| self.get_service(name, locals)).collect()
    }

    pub(crate) fn call_resolved(
        &self,
        resolved: Resolved,
        receiver: Option<AnyService>,
        locals: &Locals,
    ) -> Result<Option<AnyService>, InvokeErrorKind> {
        let Resolved {
            names,
            mut func,
            receiver: bound,
        } = resolved;

        let args = self.resolve_all(&names, locals)?;
        let receiver = bound.or(receiver).unwrap_or_else(|| self.as_any());

        debug!("Call request");
        let response = func.call(Call::new(receiver, names, args)).map_err(|err| {
            error!("{}", err);
            err
        })?;
        debug!("Call response");

        Ok(response)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("module", &self.inner.module)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{
        collections::BTreeMap,
        string::{String, ToString as _},
        sync::Arc,
        vec,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    use super::Injector;
    use crate::{
        any::value,
        bag::ServiceBag,
        errors::{InvokeErrorKind, ResolveErrorKind},
        module::ModuleId,
        provider::ProviderDescriptor,
        Call, Injectable, InstantiateErrorKind, Locals, ServiceClass,
    };

    fn injector(factories: impl IntoIterator<Item = (&'static str, Injectable)>) -> Injector {
        let origin = ModuleId::next();
        let services: BTreeMap<_, _> = factories
            .into_iter()
            .map(|(name, injectable)| {
                let name: Arc<str> = Arc::from(name);
                let bag = Arc::new(ServiceBag::new(name.clone(), origin, ProviderDescriptor::factory(injectable)));
                (name, bag)
            })
            .collect();
        Injector::new(Arc::from("m1"), services)
    }

    #[test]
    #[traced_test]
    fn test_locals_shadow_everything() {
        let injector = injector([("s1", Injectable::from_fn(|_call| Ok(value(1u32))))]);
        let locals = Locals::new().with("s1", 2u32).with("$injector", 3u32);

        assert_eq!(*injector.get_service("s1", &locals).unwrap().downcast::<u32>().unwrap(), 2);
        assert_eq!(*injector.get_service("$injector", &locals).unwrap().downcast::<u32>().unwrap(), 3);
        assert_eq!(*injector.get::<u32>("s1").unwrap(), 1);
    }

    #[test]
    #[traced_test]
    fn test_injector_resolves_itself() {
        let injector = injector([]);

        let resolved = injector.get::<Injector>("$injector").unwrap();
        assert!(resolved.ptr_eq(&injector));
        assert_eq!(resolved.module_name(), "m1");
    }

    #[test]
    #[traced_test]
    fn test_factory_receives_name_and_injector() {
        let injector = injector([(
            "s1",
            Injectable::new(["$name", "$injector"], |call: Call| {
                let name = call.get::<String>(0)?;
                let injector = call.get::<Injector>(1)?;
                Ok(value((*name).clone() + "@" + injector.module_name()))
            }),
        )]);

        assert_eq!(*injector.get::<String>("s1").unwrap(), "s1@m1");
    }

    #[test]
    #[traced_test]
    fn test_missing_service() {
        let injector = injector([]);

        match injector.get_service("s1", &Locals::new()) {
            Err(err @ ResolveErrorKind::NoService { .. }) => {
                assert_eq!(err.to_string(), "Can't load service with name s1");
            }
            _ => panic!("expected missing service error"),
        }
        assert!(matches!(
            injector.get_service("s1Provider", &Locals::new()),
            Err(ResolveErrorKind::NoService { name }) if &*name == "s1Provider"
        ));
        assert!(matches!(
            injector.get_service("Provider", &Locals::new()),
            Err(ResolveErrorKind::NoService { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_incorrect_type() {
        let injector = injector([("s1", Injectable::from_fn(|_call| Ok(value(1u32))))]);

        assert!(matches!(
            injector.get::<String>("s1"),
            Err(ResolveErrorKind::IncorrectType { name, .. }) if &*name == "s1"
        ));
    }

    #[test]
    #[traced_test]
    fn test_invoke_binds_receiver() {
        let injector = injector([]);
        let receiver_type = Injectable::new(["$injector"], |call: Call| {
            Ok(value(call.receiver().clone().downcast::<u8>().is_ok()))
        });

        let bound = injector.invoke(&receiver_type, value(7u8), &Locals::new()).unwrap().unwrap();
        let unbound = injector.invoke(&receiver_type, None, &Locals::new()).unwrap().unwrap();

        assert!(*bound.downcast::<bool>().unwrap());
        assert!(!*unbound.downcast::<bool>().unwrap());
    }

    #[test]
    #[traced_test]
    fn test_invoke_passes_none_through() {
        let injector = injector([]);

        assert!(injector
            .invoke(&Injectable::from_fn(|_call| Ok(None)), None, &Locals::new())
            .unwrap()
            .is_none());
    }

    #[test]
    #[traced_test]
    fn test_invoke_resolves_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(vec::Vec::new()));
        let push = |name: &'static str| {
            let order = order.clone();
            Injectable::from_fn(move |_call| {
                order.lock().push(name);
                Ok(value(name))
            })
        };
        let injector = injector([("s1", push("s1")), ("s2", push("s2")), ("s3", push("s3"))]);

        let result = injector
            .invoke(
                &Injectable::new(["s3", "s1", "s2"], |call: Call| {
                    Ok(value(vec![
                        *call.get::<&'static str>(0)?,
                        *call.get::<&'static str>(1)?,
                        *call.get::<&'static str>(2)?,
                    ]))
                }),
                None,
                &Locals::new(),
            )
            .unwrap()
            .unwrap();

        assert_eq!(*order.lock(), vec!["s3", "s1", "s2"]);
        assert_eq!(*result.downcast::<vec::Vec<&'static str>>().unwrap(), vec!["s3", "s1", "s2"]);
    }

    #[test]
    #[traced_test]
    fn test_invoke_errors() {
        let injector = injector([]);

        assert!(matches!(
            injector.invoke(&Injectable::new(["s1"], |_call| Ok(None)), None, &Locals::new()),
            Err(InvokeErrorKind::Deps(ResolveErrorKind::NoService { .. }))
        ));
        assert!(matches!(
            injector.invoke(
                &Injectable::from_fn(|_call| Err(anyhow::anyhow!("boom").into())),
                None,
                &Locals::new()
            ),
            Err(InvokeErrorKind::Call(InstantiateErrorKind::Custom(_)))
        ));
        assert!(matches!(
            injector.invoke(&Injectable::declared("not a declaration", |_call| Ok(None)), None, &Locals::new()),
            Err(InvokeErrorKind::Deps(ResolveErrorKind::Parse(_)))
        ));
    }

    #[test]
    #[traced_test]
    fn test_instantiate() {
        static CONSTRUCTED: AtomicU8 = AtomicU8::new(0);

        struct Pair(Arc<u32>, Arc<String>);

        impl ServiceClass for Pair {
            const INJECT: &'static [&'static str] = &["s1", "local1"];

            fn construct(call: Call) -> Result<Self, InstantiateErrorKind> {
                CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                Ok(Self(call.get(0)?, call.get(1)?))
            }
        }

        let injector = injector([("s1", Injectable::from_fn(|_call| Ok(value(5u32))))]);

        let pair = injector
            .instantiate::<Pair>(&Locals::new().with("local1", String::from("l1")))
            .unwrap();
        assert_eq!((*pair.0, pair.1.as_str()), (5, "l1"));

        assert!(matches!(
            injector.instantiate::<Pair>(&Locals::new()),
            Err(InvokeErrorKind::Deps(ResolveErrorKind::NoService { .. }))
        ));
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
    }
}

