use alloc::boxed::Box;

use super::{InvokeErrorKind, ResolveErrorKind};

/// Error returned by injectables, service constructors and provider constructors.
///
/// Resolution and invocation errors convert into it, so `?` works on [`crate::Call`] accessors
/// and on nested [`crate::Injector`] calls inside a callable.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("{0}")]
    Resolve(Box<ResolveErrorKind>),
    #[error("{0}")]
    Invoke(Box<InvokeErrorKind>),
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl From<ResolveErrorKind> for InstantiateErrorKind {
    #[inline]
    fn from(err: ResolveErrorKind) -> Self {
        Self::Resolve(Box::new(err))
    }
}

impl From<InvokeErrorKind> for InstantiateErrorKind {
    #[inline]
    fn from(err: InvokeErrorKind) -> Self {
        Self::Invoke(Box::new(err))
    }
}
