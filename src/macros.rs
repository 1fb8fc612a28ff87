/// Builds an [`Injectable`](crate::Injectable) from a closure, taking the dependency names
/// from the closure's own parameter list.
///
/// Parameters with a type are downcast to `Arc<Type>`, parameters without one are passed as
/// [`AnyService`](crate::AnyService). The body returns `Result<Option<AnyService>, InstantiateErrorKind>`.
///
/// ```
/// use radis::{injectable, value, Module};
///
/// let m1 = Module::new("m1", []).unwrap();
/// m1.factory("s1", injectable!(|| Ok(value(40u32)))).unwrap()
///     .factory("s2", injectable!(|s1: u32| Ok(value(*s1 + 2)))).unwrap();
///
/// let injector = m1.bootstrap().unwrap();
/// assert_eq!(*injector.get::<u32>("s2").unwrap(), 42);
/// ```
#[macro_export]
macro_rules! injectable {
    // === No dependencies ===
    // Example: injectable!(|| Ok(None))
    (|| $body:expr) => {
        $crate::Injectable::declared(::core::stringify!(||), move |_call: $crate::Call| $body)
    };

    // === Typed dependencies ===
    // Example: injectable!(|s1: u32, s2: String| Ok(None))
    (| $($name:ident : $ty:ty),+ $(,)? | $body:expr) => {
        $crate::Injectable::declared(
            ::core::stringify!(| $($name: $ty),+ |),
            move |call: $crate::Call| {
                let mut positions = 0usize..;
                $(
                    let $name = call.get::<$ty>(positions.next().unwrap_or_default())?;
                )+
                $body
            },
        )
    };

    // === Untyped dependencies ===
    // Example: injectable!(|s1, s2| Ok(None))
    (| $($name:ident),+ $(,)? | $body:expr) => {
        $crate::Injectable::declared(
            ::core::stringify!(| $($name),+ |),
            move |call: $crate::Call| {
                let mut positions = 0usize..;
                $(
                    let $name = call.get_any(positions.next().unwrap_or_default())?;
                )+
                $body
            },
        )
    };
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{collections::BTreeMap, format, string::String, sync::Arc};
    use tracing_test::traced_test;

    use crate::{
        any::{value, AnyService},
        Injector, Locals,
    };

    fn injector() -> Injector {
        Injector::new(Arc::from("m1"), BTreeMap::new())
    }

    #[test]
    #[traced_test]
    fn test_typed() {
        let injectable = injectable!(|s1: u32, s2: String| Ok(value(format!("{s2}{s1}"))));
        let locals = Locals::new().with("s1", 1u32).with("s2", String::from("s"));

        let result = injector().invoke(&injectable, None, &locals).unwrap().unwrap();

        assert_eq!(*result.downcast::<String>().unwrap(), "s1");
    }

    #[test]
    #[traced_test]
    fn test_untyped() {
        let injectable = injectable!(|s2, s1| Ok(value((s1, s2))));
        let locals = Locals::new().with("s1", 1u32).with("s2", 2u32);

        let result = injector().invoke(&injectable, None, &locals).unwrap().unwrap();
        let pair = result.downcast::<(AnyService, AnyService)>().unwrap();
        let (s1, s2) = &*pair;

        assert_eq!(*s1.clone().downcast::<u32>().unwrap(), 1);
        assert_eq!(*s2.clone().downcast::<u32>().unwrap(), 2);
    }

    #[test]
    #[traced_test]
    fn test_no_dependencies() {
        let injectable = injectable!(|| Ok(value(true)));

        assert_eq!(format!("{injectable}"), "||");
        assert!(injector().invoke(&injectable, None, &Locals::new()).unwrap().is_some());
    }
}
