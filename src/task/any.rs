// src/task/any.rs

//! Signature-erased tasks.
//!
//! [`Task<A, R>`](super::Task) checks its signature at compile time, which
//! means tasks with different argument lists have different types.
//! [`AnyTask`] wraps any of them behind a runtime [`Signature`] tag so they
//! can be stored side by side; a call with the wrong argument or return type
//! fails with [`TaskError::SignatureMismatch`] instead of misbehaving.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::errors::TaskError;
use crate::task::Task;

/// Runtime description of a task's argument tuple and return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    args: &'static str,
    output: &'static str,
    id: TypeId,
}

impl Signature {
    pub fn of<A: 'static, R: 'static>() -> Self {
        Self {
            args: type_name::<A>(),
            output: type_name::<R>(),
            id: TypeId::of::<(A, R)>(),
        }
    }

    /// Type name of the argument tuple.
    pub fn args(&self) -> &'static str {
        self.args
    }

    /// Type name of the return value.
    pub fn output(&self) -> &'static str {
        self.output
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn{} -> {}", self.args, self.output)
    }
}

/// A [`Task`] of any signature.
#[derive(Clone)]
pub struct AnyTask {
    inner: Arc<dyn Any + Send + Sync>,
    signature: Signature,
    bound: bool,
}

impl AnyTask {
    pub fn new<A, R>(task: Task<A, R>) -> Self
    where
        A: 'static,
        R: 'static,
    {
        Self {
            bound: task.is_bound(),
            inner: Arc::new(task),
            signature: Signature::of::<A, R>(),
        }
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Whether this task can be called with arguments `A` returning `R`.
    pub fn accepts<A: 'static, R: 'static>(&self) -> bool {
        self.signature.id == TypeId::of::<(A, R)>()
    }

    /// Recover the typed task.
    pub fn downcast<A: 'static, R: 'static>(&self) -> Result<&Task<A, R>, TaskError> {
        self.inner
            .downcast_ref::<Task<A, R>>()
            .ok_or_else(|| TaskError::SignatureMismatch {
                expected: self.signature.to_string(),
                found: Signature::of::<A, R>().to_string(),
            })
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn execute<A: 'static, R: 'static>(&self, args: A) -> Result<R, TaskError> {
        self.downcast::<A, R>()?.execute(args)
    }
}

impl<A: 'static, R: 'static> From<Task<A, R>> for AnyTask {
    fn from(task: Task<A, R>) -> Self {
        Self::new(task)
    }
}

impl fmt::Debug for AnyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyTask")
            .field("signature", &self.signature.to_string())
            .finish()
    }
}
