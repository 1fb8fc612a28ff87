use alloc::{sync::Arc, vec::Vec};
use tracing::error;

use crate::{
    any::{AnyService, TypeInfo},
    errors::ResolveErrorKind,
};

/// Arguments of a single invocation: the receiver plus the resolved values of the declared names, in order.
pub struct Call {
    receiver: AnyService,
    names: Arc<[Arc<str>]>,
    args: Vec<AnyService>,
}

impl Call {
    #[inline]
    #[must_use]
    pub(crate) fn new(receiver: AnyService, names: Arc<[Arc<str>]>, args: Vec<AnyService>) -> Self {
        debug_assert_eq!(names.len(), args.len());
        Self { receiver, names, args }
    }

    /// The value the callable is bound to.
    ///
    /// Defaults to the injector, is the provider object for `$get`, and the service for a `service:method` injectable.
    #[inline]
    #[must_use]
    pub fn receiver(&self) -> &AnyService {
        &self.receiver
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn receiver_as<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.receiver.clone().downcast().map_err(|_| {
            let err = ResolveErrorKind::IncorrectType {
                name: Arc::from("self"),
                expected: TypeInfo::of::<T>(),
            };
            error!("{}", err);
            err
        })
    }

    /// Gets the argument at `index` as `T`
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoArgument`] if there is no argument at `index`
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the argument isn't a `T`
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, ResolveErrorKind> {
        self.get_any(index)?.downcast().map_err(|_| {
            let err = ResolveErrorKind::IncorrectType {
                name: self.names[index].clone(),
                expected: TypeInfo::of::<T>(),
            };
            error!("{}", err);
            err
        })
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn get_any(&self, index: usize) -> Result<AnyService, ResolveErrorKind> {
        self.args.get(index).cloned().ok_or_else(|| {
            let err = ResolveErrorKind::NoArgument {
                index,
                len: self.args.len(),
            };
            error!("{}", err);
            err
        })
    }

    /// The declared name of the argument at `index`
    #[inline]
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|name| &**name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
