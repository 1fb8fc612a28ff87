use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicUsize, Ordering},
};
use parking_lot::Mutex;
use tracing::{debug, error, info_span, warn};

use crate::{
    bag::ServiceBag,
    config::Config,
    errors::{BootstrapErrorKind, ValidationErrorKind},
    names::{
        is_module_name, is_permissive_module_name, is_service_name, MODULE_NAME_GRAMMAR, PERMISSIVE_MODULE_NAME_GRAMMAR,
        SERVICE_NAME_GRAMMAR,
    },
    provider::{ProviderClass, ProviderDescriptor, ServiceClass},
    Injectable, Injector, Locals,
};

static NEXT_MODULE_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a [`Module`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(usize);

impl ModuleId {
    pub(crate) fn next() -> Self {
        Self(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Config,
    Run,
}

impl Display for HookPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => f.write_str("config"),
            Self::Run => f.write_str("run"),
        }
    }
}

/// A named set of service registrations and hooks, depending on other modules.
///
/// Handles are cheap to clone and compare by identity, so the same module can be
/// a dependency of several others.
///
/// ```
/// use radis::{value, Injectable, Module};
///
/// let core = Module::new("core", []).unwrap();
/// core.factory("greeting", Injectable::from_fn(|_call| Ok(value("hello")))).unwrap();
///
/// let app = Module::new("app", [core]).unwrap();
/// let injector = app.bootstrap().unwrap();
///
/// assert_eq!(*injector.get::<&'static str>("greeting").unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

struct ModuleInner {
    id: ModuleId,
    name: Arc<str>,
    dependencies: Vec<Module>,
    state: Mutex<ModuleState>,
}

#[derive(Default)]
struct ModuleState {
    providers: BTreeMap<Arc<str>, ProviderDescriptor>,
    config_hooks: Vec<Injectable>,
    run_hooks: Vec<Injectable>,
    bootstrapped: bool,
}

impl Module {
    /// Creates a module with the default [`Config`]
    ///
    /// # Errors
    /// Returns [`ValidationErrorKind::InvalidModuleName`] if `name` doesn't match [`MODULE_NAME_GRAMMAR`]
    pub fn new<N, D>(name: N, dependencies: D) -> Result<Self, ValidationErrorKind>
    where
        N: Into<Arc<str>>,
        D: IntoIterator<Item = Module>,
    {
        Self::new_with_config(name, dependencies, Config::default())
    }

    /// # Errors
    /// Returns [`ValidationErrorKind::InvalidModuleName`] if `name` doesn't match the module grammar selected by `config`
    pub fn new_with_config<N, D>(name: N, dependencies: D, config: Config) -> Result<Self, ValidationErrorKind>
    where
        N: Into<Arc<str>>,
        D: IntoIterator<Item = Module>,
    {
        let name = name.into();
        let (valid, grammar) = if config.permissive_names {
            (is_permissive_module_name(&name), PERMISSIVE_MODULE_NAME_GRAMMAR)
        } else {
            (is_module_name(&name), MODULE_NAME_GRAMMAR)
        };
        if !valid {
            let err = ValidationErrorKind::InvalidModuleName { name, grammar };
            error!("{}", err);
            return Err(err);
        }

        Ok(Self {
            inner: Arc::new(ModuleInner {
                id: ModuleId::next(),
                name,
                dependencies: dependencies.into_iter().collect(),
                state: Mutex::new(ModuleState::default()),
            }),
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.inner.id
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[Module] {
        &self.inner.dependencies
    }

    /// Checks whether the module itself registers `name`, ignoring its dependencies
    #[must_use]
    pub fn has_provider(&self, name: &str) -> bool {
        self.inner.state.lock().providers.contains_key(name)
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.inner.state.lock().bootstrapped
    }

    /// Registers `S` under `name`; the service is built by [`Injector::instantiate`].
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::InvalidServiceName`] if `name` doesn't match [`SERVICE_NAME_GRAMMAR`]
    /// - Returns [`ValidationErrorKind::Bootstrapped`] if the module is already bootstrapped
    pub fn service<S: ServiceClass>(&self, name: impl Into<Arc<str>>) -> Result<&Self, ValidationErrorKind> {
        let name = self.check_service_name("service", name.into())?;
        self.register(name, ProviderDescriptor::service::<S>())
    }

    /// Registers the value returned by `injectable` under `name`.
    ///
    /// The factory is invoked once, with the injector as receiver and `$name` as a local.
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::InvalidServiceName`] if `name` doesn't match [`SERVICE_NAME_GRAMMAR`]
    /// - Returns [`ValidationErrorKind::InvalidInjectable`] if `injectable` is malformed
    /// - Returns [`ValidationErrorKind::Bootstrapped`] if the module is already bootstrapped
    pub fn factory(&self, name: impl Into<Arc<str>>, injectable: Injectable) -> Result<&Self, ValidationErrorKind> {
        let name = self.check_service_name("factory", name.into())?;
        self.check_injectable("factory", &injectable)?;
        self.register(name, ProviderDescriptor::factory(injectable))
    }

    /// Registers the provider class `P` under `name`.
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::InvalidServiceName`] if `name` doesn't match [`SERVICE_NAME_GRAMMAR`]
    /// - Returns [`ValidationErrorKind::Bootstrapped`] if the module is already bootstrapped
    pub fn provider<P: ProviderClass>(&self, name: impl Into<Arc<str>>) -> Result<&Self, ValidationErrorKind> {
        let name = self.check_service_name("provider", name.into())?;
        self.register(name, ProviderDescriptor::provider::<P>())
    }

    /// Adds a hook invoked at bootstrap, before every run hook of the tree.
    ///
    /// Config hooks are the place to tune providers through `<name>Provider`.
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::InvalidInjectable`] if `injectable` is malformed
    /// - Returns [`ValidationErrorKind::Bootstrapped`] if the module is already bootstrapped
    pub fn config(&self, injectable: Injectable) -> Result<&Self, ValidationErrorKind> {
        self.add_hook(HookPhase::Config, injectable)
    }

    /// Adds a hook invoked at bootstrap, after every config hook of the tree.
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::InvalidInjectable`] if `injectable` is malformed
    /// - Returns [`ValidationErrorKind::Bootstrapped`] if the module is already bootstrapped
    pub fn run(&self, injectable: Injectable) -> Result<&Self, ValidationErrorKind> {
        self.add_hook(HookPhase::Run, injectable)
    }

    /// Builds the injectors of the module tree and runs its hooks.
    ///
    /// Every distinct module gets its own injector, holding the services of its dependencies and its own.
    /// The module's own registrations override those of its dependencies, and a dependency declared later
    /// overrides one declared earlier. Modules reachable through several paths are built once.
    ///
    /// Config hooks of all modules run first, then run hooks, both in dependency-first order,
    /// each through the injector of the module that declared it.
    ///
    /// # Errors
    /// - Returns [`BootstrapErrorKind::AlreadyBootstrapped`] if the module was already bootstrapped
    /// - Returns [`BootstrapErrorKind::Hook`] if a hook fails; the hooks after it don't run
    pub fn bootstrap(&self) -> Result<Injector, BootstrapErrorKind> {
        let span = info_span!("bootstrap", module = self.name());
        let _guard = span.enter();

        {
            let mut state = self.inner.state.lock();
            if state.bootstrapped {
                let err = BootstrapErrorKind::AlreadyBootstrapped {
                    module: self.inner.name.clone(),
                };
                error!("{}", err);
                return Err(err);
            }
            state.bootstrapped = true;
        }

        let mut modules = Vec::new();
        let mut injectors = Vec::new();
        let injector = self.bootstrap_tree(&mut modules, &mut injectors);
        modules.push(self.clone());
        injectors.push(injector.clone());
        debug!(modules = modules.len(), "Injectors built");

        for phase in [HookPhase::Config, HookPhase::Run] {
            for (module, injector) in modules.iter().zip(&injectors) {
                for (index, hook) in module.hooks(phase).iter().enumerate() {
                    debug!(module = module.name(), %phase, index, "Run hook");
                    if let Err(error) = injector.invoke(hook, None, &Locals::new()) {
                        let err = BootstrapErrorKind::Hook {
                            module: module.inner.name.clone(),
                            phase,
                            index,
                            error,
                        };
                        error!("{}", err);
                        return Err(err);
                    }
                }
            }
            debug!(%phase, "Hooks finished");
        }

        Ok(injector)
    }

    fn bootstrap_tree(&self, modules: &mut Vec<Module>, injectors: &mut Vec<Injector>) -> Injector {
        let mut services: BTreeMap<Arc<str>, Arc<ServiceBag>> = BTreeMap::new();

        for dependency in &self.inner.dependencies {
            let visited = modules.iter().position(|module| module.id() == dependency.id());
            let index = match visited {
                Some(index) => index,
                None => {
                    let injector = dependency.bootstrap_tree(modules, injectors);
                    modules.push(dependency.clone());
                    injectors.push(injector);
                    modules.len() - 1
                }
            };

            for (name, bag) in injectors[index].services() {
                let replaced = match services.get(name) {
                    None => false,
                    Some(current) if Arc::ptr_eq(current, bag) => continue,
                    Some(current) if shadows(modules, current.origin(), bag.origin()) => {
                        debug!(service = &**name, dependency = dependency.name(), "Closer registration kept");
                        continue;
                    }
                    Some(_) => true,
                };
                if replaced {
                    debug!(service = &**name, dependency = dependency.name(), "Overridden by later dependency");
                }
                services.insert(name.clone(), bag.clone());
            }
        }

        let state = self.inner.state.lock();
        for (name, descriptor) in &state.providers {
            let bag = Arc::new(ServiceBag::new(name.clone(), self.id(), descriptor.clone()));
            if services.insert(name.clone(), bag).is_some() {
                warn!(service = &**name, module = self.name(), "Dependency registration overridden");
            }
        }

        Injector::new(self.inner.name.clone(), services)
    }

    /// Checks whether `id` is reachable through the dependencies of the module
    fn depends_on(&self, id: ModuleId) -> bool {
        let mut visited = Vec::new();
        let mut pending: Vec<&Module> = self.inner.dependencies.iter().collect();

        while let Some(module) = pending.pop() {
            if module.id() == id {
                return true;
            }
            if visited.contains(&module.id()) {
                continue;
            }
            visited.push(module.id());
            pending.extend(&module.inner.dependencies);
        }
        false
    }

    fn hooks(&self, phase: HookPhase) -> Vec<Injectable> {
        let state = self.inner.state.lock();
        match phase {
            HookPhase::Config => state.config_hooks.clone(),
            HookPhase::Run => state.run_hooks.clone(),
        }
    }

    fn check_injectable(&self, kind: &'static str, injectable: &Injectable) -> Result<(), ValidationErrorKind> {
        injectable.check().map_err(|reason| {
            let err = ValidationErrorKind::InvalidInjectable {
                module: self.inner.name.clone(),
                kind,
                reason,
            };
            error!("{}", err);
            err
        })
    }

    fn check_service_name(&self, kind: &'static str, name: Arc<str>) -> Result<Arc<str>, ValidationErrorKind> {
        if is_service_name(&name) {
            return Ok(name);
        }
        let err = ValidationErrorKind::InvalidServiceName {
            module: self.inner.name.clone(),
            kind,
            name,
            grammar: SERVICE_NAME_GRAMMAR,
        };
        error!("{}", err);
        Err(err)
    }

    fn register(&self, name: Arc<str>, descriptor: ProviderDescriptor) -> Result<&Self, ValidationErrorKind> {
        let kind = descriptor.kind.as_str();
        let mut state = self.inner.state.lock();
        if state.bootstrapped {
            let err = ValidationErrorKind::Bootstrapped {
                module: self.inner.name.clone(),
                kind,
            };
            error!("{}", err);
            return Err(err);
        }

        debug!(service = &*name, kind, module = self.name(), "Register");
        if state.providers.insert(name.clone(), descriptor).is_some() {
            debug!(service = &*name, "Previous registration replaced");
        }
        Ok(self)
    }

    fn add_hook(&self, phase: HookPhase, injectable: Injectable) -> Result<&Self, ValidationErrorKind> {
        let kind = match phase {
            HookPhase::Config => "config",
            HookPhase::Run => "run",
        };
        self.check_injectable(kind, &injectable)?;

        let mut state = self.inner.state.lock();
        if state.bootstrapped {
            let err = ValidationErrorKind::Bootstrapped {
                module: self.inner.name.clone(),
                kind,
            };
            error!("{}", err);
            return Err(err);
        }

        match phase {
            HookPhase::Config => state.config_hooks.push(injectable),
            HookPhase::Run => state.run_hooks.push(injectable),
        }
        Ok(self)
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Module {}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("dependencies", &self.inner.dependencies.iter().map(Module::name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Registration of `closer` shadows the one of `farther` when `farther` is one of its transitive dependencies
fn shadows(visited: &[Module], closer: ModuleId, farther: ModuleId) -> bool {
    visited
        .iter()
        .find(|module| module.id() == closer)
        .is_some_and(|module| module.depends_on(farther))
}

/// Creates a module, the same as [`Module::new`]
///
/// # Errors
/// Returns [`ValidationErrorKind::InvalidModuleName`] if `name` doesn't match [`MODULE_NAME_GRAMMAR`]
pub fn module<N, D>(name: N, dependencies: D) -> Result<Module, ValidationErrorKind>
where
    N: Into<Arc<str>>,
    D: IntoIterator<Item = Module>,
{
    Module::new(name, dependencies)
}
