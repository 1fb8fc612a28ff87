use alloc::{boxed::Box, string::String, sync::Arc};
use core::cell::Cell;
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, error};

use crate::{
    any::AnyService,
    errors::ResolveErrorKind,
    module::ModuleId,
    names::NAME,
    provider::{BuiltProvider, ProviderDescriptor},
    Injectable, Injector, Locals,
};

enum BagState {
    Unbuilt,
    ProviderBuilt { provider: BuiltProvider },
    ServiceBuilt { provider: BuiltProvider, service: AnyService },
}

impl BagState {
    fn provider(&self) -> Option<&BuiltProvider> {
        match self {
            Self::Unbuilt => None,
            Self::ProviderBuilt { provider } | Self::ServiceBuilt { provider, .. } => Some(provider),
        }
    }

    fn service(&self) -> Option<&AnyService> {
        match self {
            Self::ServiceBuilt { service, .. } => Some(service),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Building {
    provider: Cell<bool>,
    service: Cell<bool>,
}

/// Marks a build step as in progress until dropped
struct InProgress<'a>(&'a Cell<bool>);

impl<'a> InProgress<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Lazily built provider and service of a single name.
///
/// A bag is shared by every injector that inherits the name, so the service is a singleton across the module tree.
/// First builds are serialized by `building`, which is held for the whole construction:
/// other threads wait for the result, while a re-entrant request from the building thread is a cycle.
pub(crate) struct ServiceBag {
    name: Arc<str>,
    origin: ModuleId,
    descriptor: ProviderDescriptor,
    state: Mutex<BagState>,
    building: ReentrantMutex<Building>,
}

impl ServiceBag {
    #[must_use]
    pub(crate) fn new(name: Arc<str>, origin: ModuleId, descriptor: ProviderDescriptor) -> Self {
        Self {
            name,
            origin,
            descriptor,
            state: Mutex::new(BagState::Unbuilt),
            building: ReentrantMutex::new(Building::default()),
        }
    }

    #[inline]
    #[must_use]
    #[cfg(test)]
    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// The module that registered the name
    #[inline]
    #[must_use]
    pub(crate) fn origin(&self) -> ModuleId {
        self.origin
    }

    #[inline]
    #[must_use]
    pub(crate) fn method(&self, name: &str) -> Option<Injectable> {
        self.descriptor.method(name)
    }

    #[inline]
    #[must_use]
    #[cfg(test)]
    pub(crate) fn is_built(&self) -> bool {
        self.state.lock().service().is_some()
    }

    pub(crate) fn provider(&self, injector: &Injector) -> Result<BuiltProvider, ResolveErrorKind> {
        if let Some(provider) = self.state.lock().provider() {
            debug!("Provider found in bag");
            return Ok(provider.clone());
        }

        let building = self.building.lock();
        if let Some(provider) = self.state.lock().provider() {
            debug!("Provider built while waiting");
            return Ok(provider.clone());
        }
        if building.provider.get() {
            let err = ResolveErrorKind::CyclicDependency { name: self.name.clone() };
            error!("{}", err);
            return Err(err);
        }

        debug!(kind = %self.descriptor.kind, "Build provider");
        let provider = {
            let _in_progress = InProgress::enter(&building.provider);
            self.descriptor.construct(injector, &self.name)
        }
        .map_err(|err| {
            let err = ResolveErrorKind::Provider {
                name: self.name.clone(),
                error: Box::new(err),
            };
            error!("{}", err);
            err
        })?;

        let mut state = self.state.lock();
        if let BagState::Unbuilt = *state {
            *state = BagState::ProviderBuilt {
                provider: provider.clone(),
            };
        }
        Ok(provider)
    }

    pub(crate) fn service(&self, injector: &Injector) -> Result<AnyService, ResolveErrorKind> {
        if let Some(service) = self.state.lock().service() {
            debug!("Found in bag");
            return Ok(service.clone());
        }
        debug!("Not found in bag");

        let building = self.building.lock();
        if let Some(service) = self.state.lock().service() {
            debug!("Built while waiting");
            return Ok(service.clone());
        }
        if building.service.get() {
            let err = ResolveErrorKind::CyclicDependency { name: self.name.clone() };
            error!("{}", err);
            return Err(err);
        }

        let _in_progress = InProgress::enter(&building.service);
        let provider = self.provider(injector)?;

        let locals = Locals::new().with(NAME, String::from(&*self.name));
        let service = match injector.invoke(&provider.get, Some(provider.object.clone()), &locals) {
            Ok(Some(service)) => service,
            Ok(None) => {
                let err = ResolveErrorKind::AbsentService { name: self.name.clone() };
                error!("{}", err);
                return Err(err);
            }
            Err(err) => {
                let err = ResolveErrorKind::Get {
                    name: self.name.clone(),
                    error: Box::new(err),
                };
                error!("{}", err);
                return Err(err);
            }
        };
        debug!("Built");

        *self.state.lock() = BagState::ServiceBuilt {
            provider,
            service: service.clone(),
        };
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{
        collections::BTreeMap,
        string::{String, ToString as _},
        sync::Arc,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    use super::ServiceBag;
    use crate::{
        any::value, errors::ResolveErrorKind, module::ModuleId, provider::ProviderDescriptor, Injectable, Injector,
    };

    fn injector_with(bags: impl IntoIterator<Item = Arc<ServiceBag>>) -> Injector {
        let services: BTreeMap<_, _> = bags.into_iter().map(|bag| (bag.name().clone(), bag)).collect();
        Injector::new(Arc::from("test"), services)
    }

    #[test]
    #[traced_test]
    fn test_service_built_once() {
        let calls = Arc::new(AtomicU8::new(0));
        let bag = Arc::new(ServiceBag::new(
            Arc::from("s1"),
            ModuleId::next(),
            ProviderDescriptor::factory(Injectable::new(["$name"], {
                let calls = calls.clone();
                move |call: crate::Call| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(value(String::from(&**call.get::<String>(0)?)))
                }
            })),
        ));
        let injector = injector_with([bag.clone()]);

        assert!(!bag.is_built());
        let first = bag.service(&injector).unwrap();
        let second = bag.service(&injector).unwrap();

        assert!(bag.is_built());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first.downcast::<String>().unwrap(), "s1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_absent_service() {
        let bag = Arc::new(ServiceBag::new(
            Arc::from("s1"),
            ModuleId::next(),
            ProviderDescriptor::factory(Injectable::from_fn(|_call| Ok(None))),
        ));
        let injector = injector_with([bag.clone()]);

        assert!(matches!(bag.service(&injector), Err(ResolveErrorKind::AbsentService { .. })));
        assert!(!bag.is_built());
        // The provider stays built, only the service is retried
        assert!(bag.provider(&injector).is_ok());
    }

    #[test]
    #[traced_test]
    fn test_self_dependency_is_cycle() {
        let bag = Arc::new(ServiceBag::new(
            Arc::from("s1"),
            ModuleId::next(),
            ProviderDescriptor::factory(Injectable::new(["s1"], |_call| Ok(value(1u8)))),
        ));
        let injector = injector_with([bag.clone()]);

        match bag.service(&injector) {
            Err(err @ ResolveErrorKind::Get { .. }) => {
                assert!(err.to_string().contains("Cyclic dependency detected while building s1"), "{err}");
            }
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("cycle must fail"),
        }
        // Flags are reset after the failed build
        assert!(matches!(bag.service(&injector), Err(ResolveErrorKind::Get { .. })));
    }
}
