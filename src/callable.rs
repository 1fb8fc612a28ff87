use alloc::boxed::Box;

/// Something the injector can call with a prepared request.
///
/// Injectables, provider constructors and bound service methods are all stored
/// as boxed, clonable callables so that a registration can be shared between
/// every injector that inherits it.
pub(crate) trait Callable<Request: ?Sized> {
    type Response;
    type Error;

    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error>;
}

pub(crate) struct BoxCloneCallable<Request: ?Sized, Response, Error>(
    pub(crate) Box<dyn CloneCallable<Request, Response = Response, Error = Error> + Send + Sync>,
);

pub(crate) trait CloneCallable<Request: ?Sized>: Callable<Request> {
    #[must_use]
    fn clone_box(&self) -> Box<dyn CloneCallable<Request, Response = Self::Response, Error = Self::Error> + Send + Sync>;
}

impl<Request, T> CloneCallable<Request> for T
where
    Request: ?Sized,
    T: Callable<Request> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> Box<dyn CloneCallable<Request, Response = T::Response, Error = T::Error> + Send + Sync> {
        Box::new(self.clone())
    }
}

impl<Request: ?Sized, Response, Error> Clone for BoxCloneCallable<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> Callable<Request> for BoxCloneCallable<Request, Response, Error> {
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error> {
        self.0.call(request)
    }
}

#[inline]
#[must_use]
pub(crate) const fn callable_fn<T>(f: T) -> CallableFn<T> {
    CallableFn { f }
}

#[derive(Clone)]
pub(crate) struct CallableFn<T> {
    f: T,
}

impl<F, Request, Response, Error> Callable<Request> for CallableFn<F>
where
    F: FnMut(Request) -> Result<Response, Error>,
{
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error> {
        (self.f)(request)
    }
}

/// Boxes `f` as a shareable callable.
#[inline]
#[must_use]
pub(crate) fn boxed<F, Request, Response, Error>(f: F) -> BoxCloneCallable<Request, Response, Error>
where
    F: FnMut(Request) -> Result<Response, Error> + Clone + Send + Sync + 'static,
    Request: 'static,
    Response: 'static,
    Error: 'static,
{
    BoxCloneCallable(Box::new(callable_fn(f)))
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::{boxed, callable_fn, BoxCloneCallable, Callable as _};

    #[test]
    fn test_callable_fn() {
        let mut double = callable_fn(|value: u8| Ok::<_, Infallible>(value * 2));

        assert_eq!(double.call(21).unwrap(), 42);
    }

    #[test]
    fn test_boxed_clone_has_own_state() {
        let mut counter = 0u8;
        let mut callable: BoxCloneCallable<u8, u8, Infallible> = boxed(move |step: u8| {
            counter += step;
            Ok(counter)
        });
        let mut cloned = callable.clone();

        assert_eq!(callable.call(2).unwrap(), 2);
        assert_eq!(callable.call(2).unwrap(), 4);
        // The copy was taken before any call, so it starts from zero
        assert_eq!(cloned.call(1).unwrap(), 1);
    }
}
