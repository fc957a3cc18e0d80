use core::future::Future;
use core::pin::Pin;

/// A dynamically typed, boxed future. Useful for futures that need to be passed around
/// without knowing their concrete type, like backend operations still in flight.
pub type DynFut<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Block until the [future](Future) is completed and returns the result.
pub fn block_on<O>(fut: impl Future<Output = O>) -> O {
    futures_lite::future::block_on(fut)
}

/// Wrap an already computed value into a [dynamic future](DynFut).
pub fn ready<T: Send + 'static>(value: T) -> DynFut<T> {
    Box::pin(core::future::ready(value))
}
