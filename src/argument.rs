//! Custom argument matchers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::types::{Arg, SqlValue};

/// Predicate over an actual argument value.
///
/// Place a matcher in an expectation's argument list (see [`Arg::Matcher`])
/// to accept any actual value the predicate approves of.
pub trait Argument: fmt::Debug + Send + Sync {
    /// Returns true if `actual` is acceptable.
    fn matches(&self, actual: &dyn SqlValue) -> bool;
}

/// Matches any argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyArg;

impl Argument for AnyArg {
    fn matches(&self, _actual: &dyn SqlValue) -> bool {
        true
    }
}

/// Wildcard argument, useful for timestamps and generated ids.
pub fn any_arg() -> Arg {
    Arg::Matcher(Arc::new(AnyArg))
}

/// Matches any value of type `T`.
pub struct TypeOf<T>(PhantomData<fn() -> T>);

impl<T> fmt::Debug for TypeOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeOf<{}>", std::any::type_name::<T>())
    }
}

impl<T: 'static> Argument for TypeOf<T> {
    fn matches(&self, actual: &dyn SqlValue) -> bool {
        actual.as_any().is::<T>()
    }
}

/// Accept any value whose concrete type is `T`.
pub fn type_of<T: 'static>() -> Arg {
    Arg::Matcher(Arc::new(TypeOf::<T>(PhantomData)))
}

/// Closure-backed matcher.
pub struct ArgFn<F> {
    name: String,
    predicate: F,
}

impl<F> fmt::Debug for ArgFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<F> Argument for ArgFn<F>
where
    F: Fn(&dyn SqlValue) -> bool + Send + Sync,
{
    fn matches(&self, actual: &dyn SqlValue) -> bool {
        (self.predicate)(actual)
    }
}

/// Build a matcher from a closure. `name` is used in mismatch messages.
///
/// ```
/// use zero_postgres_mock::{arg_fn, SqlValue};
///
/// let positive = arg_fn("positive", |v: &dyn SqlValue| {
///     v.as_any().downcast_ref::<i32>().is_some_and(|n| *n > 0)
/// });
/// # let _ = positive;
/// ```
pub fn arg_fn<F>(name: impl Into<String>, predicate: F) -> Arg
where
    F: Fn(&dyn SqlValue) -> bool + Send + Sync + 'static,
{
    Arg::Matcher(Arc::new(ArgFn {
        name: name.into(),
        predicate,
    }))
}
