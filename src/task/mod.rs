// src/task/mod.rs

//! Type-erased units of work.
//!
//! - [`Task`] binds a callable once (a function/closure, or a method on a
//!   shared object) and can then be invoked any number of times with an
//!   argument tuple whose type is fixed when the task type is chosen.
//! - [`any`] provides [`AnyTask`], which also erases the signature so tasks
//!   of different shapes fit in one container; calls are checked against a
//!   runtime signature tag.
//! - [`bind`] holds the arity adapters that turn `Fn(a, b, ..)` into a
//!   tuple-taking call.

pub mod any;
pub mod bind;

use std::fmt;
use std::sync::{Arc, Weak};

use crate::errors::TaskError;

pub use any::{AnyTask, Signature};
pub use bind::{MethodFn, TaskFn};

/// Which kind of callable a [`Task`] is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// A free function or closure.
    Function,
    /// A method invoked on a weakly held target object.
    Method,
}

/// A bound, invokable unit of work taking the argument tuple `A` and
/// returning `R`.
///
/// A default-constructed task is empty; executing it yields
/// [`TaskError::Unbound`]. Cloning shares the underlying callable, so every
/// clone can be invoked independently.
///
/// ```
/// use taskgraph::task::Task;
///
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
///
/// let task = Task::from_fn(add);
/// assert_eq!(task.execute((2, 3)), Ok(5));
/// ```
pub struct Task<A = (), R = ()> {
    binding: Option<Binding<A, R>>,
}

enum Binding<A, R> {
    Function(Arc<dyn TaskFn<A, R>>),
    Method(Arc<dyn BoundMethod<A, R>>),
}

impl<A, R> Clone for Binding<A, R> {
    fn clone(&self) -> Self {
        match self {
            Binding::Function(f) => Binding::Function(Arc::clone(f)),
            Binding::Method(m) => Binding::Method(Arc::clone(m)),
        }
    }
}

/// Object-safe view over a method binding with the target type erased.
trait BoundMethod<A, R>: Send + Sync {
    fn invoke(&self, args: A) -> Result<R, TaskError>;
}

struct MethodBinding<T, M> {
    target: Weak<T>,
    method: M,
}

impl<T, M, A, R> BoundMethod<A, R> for MethodBinding<T, M>
where
    T: Send + Sync + 'static,
    M: MethodFn<T, A, R>,
{
    fn invoke(&self, args: A) -> Result<R, TaskError> {
        let target = self
            .target
            .upgrade()
            .ok_or(TaskError::TargetDropped(std::any::type_name::<T>()))?;
        Ok(self.method.call(&target, args))
    }
}

impl<A: 'static, R: 'static> Task<A, R> {
    /// An empty task with no bound callable.
    pub fn new() -> Self {
        Self { binding: None }
    }

    /// Bind a free function or closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: TaskFn<A, R>,
    {
        let mut task = Self::new();
        task.bind(f);
        task
    }

    /// Bind a method on `target`.
    ///
    /// The task only keeps a weak reference; once every strong reference to
    /// the target is gone, executing yields [`TaskError::TargetDropped`].
    pub fn from_method<T, M>(target: &Arc<T>, method: M) -> Self
    where
        T: Send + Sync + 'static,
        M: MethodFn<T, A, R>,
    {
        let mut task = Self::new();
        task.bind_method(target, method);
        task
    }

    /// Replace the bound callable with a free function or closure.
    pub fn bind<F>(&mut self, f: F)
    where
        F: TaskFn<A, R>,
    {
        self.binding = Some(Binding::Function(Arc::new(f)));
    }

    /// Replace the bound callable with a method on `target`.
    pub fn bind_method<T, M>(&mut self, target: &Arc<T>, method: M)
    where
        T: Send + Sync + 'static,
        M: MethodFn<T, A, R>,
    {
        let binding = MethodBinding {
            target: Arc::downgrade(target),
            method,
        };
        self.binding = Some(Binding::Method(Arc::new(binding)));
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn kind(&self) -> Option<BindingKind> {
        self.binding.as_ref().map(|binding| match binding {
            Binding::Function(_) => BindingKind::Function,
            Binding::Method(_) => BindingKind::Method,
        })
    }

    /// Drop the bound callable, leaving the task empty.
    pub fn unbind(&mut self) {
        self.binding = None;
    }

    /// Move the binding out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        Self {
            binding: self.binding.take(),
        }
    }

    /// Invoke the bound callable with `args`.
    pub fn execute(&self, args: A) -> Result<R, TaskError> {
        match &self.binding {
            Some(Binding::Function(f)) => Ok(f.call(args)),
            Some(Binding::Method(m)) => m.invoke(args),
            None => Err(TaskError::Unbound),
        }
    }
}

impl<A: 'static, R: 'static> Default for Task<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Clone for Task<A, R> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
        }
    }
}

impl<A: 'static, R: 'static> fmt::Debug for Task<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind())
            .field("args", &std::any::type_name::<A>())
            .field("output", &std::any::type_name::<R>())
            .finish()
    }
}
