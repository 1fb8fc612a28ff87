use alloc::sync::Arc;
use core::any::{type_name, Any, TypeId};

/// A resolved value: a service, a provider object, a local or the injector itself.
pub type AnyService = Arc<dyn Any + Send + Sync>;

/// Wraps `val` as the return value of an injectable.
///
/// ```
/// use radis::{value, Injectable};
///
/// let answer = Injectable::from_fn(|_call| Ok(value(42u32)));
/// ```
#[inline]
#[must_use]
pub fn value<T: Send + Sync + 'static>(val: T) -> Option<AnyService> {
    Some(Arc::new(val))
}

#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub(crate) fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit_once("::").map_or(self.name, |(_, name)| name)
    }
}
