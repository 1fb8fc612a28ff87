use alloc::{sync::Arc, vec::Vec};
use parking_lot::Mutex;
use tracing::{debug, debug_span};

use crate::{any::AnyService, errors::InvokeErrorKind, injectable::Resolved, Injectable, Injector, Locals};

/// An injectable bound to an injector and callable with positional arguments.
///
/// Created by [`Injector::lift`]. Nothing is resolved until the first [`Lifted::call`];
/// the normalized injectable is cached from then on.
#[derive(Clone)]
pub struct Lifted {
    inner: Arc<LiftedInner>,
}

struct LiftedInner {
    injector: Injector,
    injectable: Injectable,
    receiver: Option<AnyService>,
    param_names: Vec<Arc<str>>,
    locals: Locals,
    resolved: Mutex<Option<Resolved>>,
}

impl Lifted {
    #[must_use]
    pub(crate) fn new(
        injector: Injector,
        injectable: Injectable,
        receiver: Option<AnyService>,
        param_names: Vec<Arc<str>>,
        locals: Locals,
    ) -> Self {
        Self {
            inner: Arc::new(LiftedInner {
                injector,
                injectable,
                receiver,
                param_names,
                locals,
                resolved: Mutex::new(None),
            }),
        }
    }

    /// Names the positional arguments of [`Lifted::call`] are bound to
    #[inline]
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.inner.param_names
    }

    /// Calls the lifted injectable.
    ///
    /// `args[i]` becomes the local `param_names[i]`, on top of the locals given to [`Injector::lift`].
    /// Names without an argument stay unbound and extra arguments are ignored.
    ///
    /// # Errors
    /// Same as [`Injector::invoke`]. A failed normalization isn't cached, so it's retried by the next call.
    pub fn call<I>(&self, args: I) -> Result<Option<AnyService>, InvokeErrorKind>
    where
        I: IntoIterator<Item = AnyService>,
    {
        let inner = &*self.inner;
        let span = debug_span!("lifted", injectable = %inner.injectable, injector = inner.injector.module_name());
        let _guard = span.enter();

        let mut locals = inner.locals.clone();
        for (name, arg) in inner.param_names.iter().zip(args) {
            locals.insert_rc(name.clone(), arg);
        }

        let cached = inner.resolved.lock().clone();
        let resolved = if let Some(resolved) = cached {
            debug!("Found resolved injectable");
            resolved
        } else {
            // Normalization may resolve services, so the lock isn't held while it runs
            let resolved = inner.injectable.resolve(&inner.injector)?;
            *inner.resolved.lock() = Some(resolved.clone());
            debug!("Cached resolved injectable");
            resolved
        };

        inner.injector.call_resolved(resolved, inner.receiver.clone(), &locals)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{collections::BTreeMap, string::String, sync::Arc};
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    use crate::{
        any::{value, AnyService},
        errors::{InvokeErrorKind, ResolveErrorKind},
        Call, Injectable, Injector, Locals,
    };

    fn injector() -> Injector {
        Injector::new(Arc::from("m1"), BTreeMap::new())
    }

    fn sum() -> Injectable {
        Injectable::new(["a", "b", "c"], |call: Call| {
            Ok(value(*call.get::<u32>(0)? + *call.get::<u32>(1)? + *call.get::<u32>(2)?))
        })
    }

    #[test]
    #[traced_test]
    fn test_args_become_locals() {
        let lifted = injector().lift(sum(), None, ["a", "b"], Locals::new().with("c", 100u32));

        let first = lifted.call([Arc::new(1u32) as AnyService, Arc::new(2u32) as AnyService]).unwrap().unwrap();
        let second = lifted.call([Arc::new(10u32) as AnyService, Arc::new(20u32) as AnyService]).unwrap().unwrap();

        assert_eq!(*first.downcast::<u32>().unwrap(), 103);
        assert_eq!(*second.downcast::<u32>().unwrap(), 130);
        assert_eq!(lifted.param_names().len(), 2);
    }

    #[test]
    #[traced_test]
    fn test_args_shadow_lift_locals() {
        let lifted = injector().lift(sum(), None, ["a", "b", "c"], Locals::new().with("c", 100u32));

        let result = lifted
            .call([Arc::new(1u32) as AnyService, Arc::new(2u32) as AnyService, Arc::new(3u32) as AnyService])
            .unwrap()
            .unwrap();

        assert_eq!(*result.downcast::<u32>().unwrap(), 6);
    }

    #[test]
    #[traced_test]
    fn test_missing_and_extra_args() {
        let lifted = injector().lift(sum(), None, ["a", "b", "c"], Locals::new());

        // `c` stays unbound
        assert!(matches!(
            lifted.call([Arc::new(1u32) as AnyService, Arc::new(2u32) as AnyService]),
            Err(InvokeErrorKind::Deps(ResolveErrorKind::NoService { .. }))
        ));

        let lifted = injector().lift(sum(), None, ["a"], Locals::new().with("b", 1u32).with("c", 1u32));
        let result = lifted
            .call([Arc::new(1u32) as AnyService, Arc::new(50u32) as AnyService])
            .unwrap()
            .unwrap();
        assert_eq!(*result.downcast::<u32>().unwrap(), 3);
    }

    #[test]
    #[traced_test]
    fn test_declared_parse_error_surfaces_on_call() {
        let calls = Arc::new(AtomicU8::new(0));
        let lifted = injector().lift(
            Injectable::declared("a =\\> =\\> function (){}", {
                let calls = calls.clone();
                move |_call: Call| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
            }),
            None,
            ["a"],
            Locals::new(),
        );

        assert!(matches!(
            lifted.call([Arc::new(String::from("a")) as AnyService]),
            Err(InvokeErrorKind::Deps(ResolveErrorKind::Parse(_)))
        ));
        assert!(matches!(lifted.call(core::iter::empty()), Err(InvokeErrorKind::Deps(ResolveErrorKind::Parse(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[traced_test]
    fn test_declared_names() {
        let lifted = injector().lift(
            Injectable::declared("|b, a|", |call: Call| Ok(value(*call.get::<u32>(0)? * 10 + *call.get::<u32>(1)?))),
            None,
            ["a", "b"],
            Locals::new(),
        );

        let result = lifted
            .call([Arc::new(1u32) as AnyService, Arc::new(2u32) as AnyService])
            .unwrap()
            .unwrap();

        assert_eq!(*result.downcast::<u32>().unwrap(), 21);
    }
}
