use alloc::{boxed::Box, collections::BTreeMap, sync::Arc};

use crate::any::AnyService;

pub(crate) type Map = BTreeMap<Arc<str>, AnyService>;

/// One-time named values consulted before the injector's registry.
///
/// A local shadows everything, including reserved names like `$injector`.
#[derive(Clone, Default)]
pub struct Locals {
    pub(crate) map: Option<Box<Map>>,
}

impl Locals {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { map: None }
    }

    /// Adds a local, returning the previous value under the same name
    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, name: impl Into<Arc<str>>, value: T) -> Option<AnyService> {
        self.insert_rc(name, Arc::new(value))
    }

    #[inline]
    pub fn insert_rc(&mut self, name: impl Into<Arc<str>>, value: AnyService) -> Option<AnyService> {
        self.map.get_or_insert_with(Box::default).insert(name.into(), value)
    }

    #[inline]
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, name: impl Into<Arc<str>>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AnyService> {
        self.map.as_ref().and_then(|map| map.get(name))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.as_ref().map_or(0, |map| map.len())
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::Locals;

    #[test]
    fn test_insert_overwrites() {
        let mut locals = Locals::new();
        assert!(locals.is_empty());

        assert!(locals.insert("local1", 30u32).is_none());
        let previous = locals.insert("local1", 31u32).unwrap();

        assert_eq!(*previous.downcast::<u32>().unwrap(), 30);
        assert_eq!(*locals.get("local1").unwrap().clone().downcast::<u32>().unwrap(), 31);
        assert_eq!(locals.len(), 1);
    }

    #[test]
    fn test_with() {
        let locals = Locals::new().with("$name", String::from("s1")).with("local1", 5u32);

        assert!(locals.contains("$name"));
        assert!(locals.contains("local1"));
        assert!(!locals.contains("local2"));
    }
}
