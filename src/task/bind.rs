// src/task/bind.rs

//! Arity adapters for task callables.
//!
//! Tasks are always invoked with a single argument tuple. The traits here
//! let ordinary functions and closures of up to eight parameters be bound
//! directly: `fn(a, b) -> R` becomes a callable taking `(a, b)`.

/// A free callable that can back a [`Task`](super::Task) with argument
/// tuple `A` and return type `R`.
pub trait TaskFn<A, R>: Send + Sync + 'static {
    fn call(&self, args: A) -> R;
}

/// A callable invoked against a shared target object, e.g. a method path
/// such as `Mesher::rebuild` or a closure `|m: &Mesher, chunk: u32| ..`.
pub trait MethodFn<T, A, R>: Send + Sync + 'static {
    fn call(&self, target: &T, args: A) -> R;
}

macro_rules! impl_callable_arity {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> TaskFn<($($arg,)*), R> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
        {
            #[allow(non_snake_case)]
            #[inline]
            fn call(&self, ($($arg,)*): ($($arg,)*)) -> R {
                (self)($($arg),*)
            }
        }

        impl<T, F, R, $($arg,)*> MethodFn<T, ($($arg,)*), R> for F
        where
            F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
        {
            #[allow(non_snake_case)]
            #[inline]
            fn call(&self, target: &T, ($($arg,)*): ($($arg,)*)) -> R {
                (self)(target, $($arg),*)
            }
        }
    };
}

impl_callable_arity!();
impl_callable_arity!(A1);
impl_callable_arity!(A1, A2);
impl_callable_arity!(A1, A2, A3);
impl_callable_arity!(A1, A2, A3, A4);
impl_callable_arity!(A1, A2, A3, A4, A5);
impl_callable_arity!(A1, A2, A3, A4, A5, A6);
impl_callable_arity!(A1, A2, A3, A4, A5, A6, A7);
impl_callable_arity!(A1, A2, A3, A4, A5, A6, A7, A8);
