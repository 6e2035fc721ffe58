//! Dynamically typed values and argument lists.
//!
//! The mock never encodes values for the wire. Arguments and row values are
//! kept as trait objects and compared by deep equality: two values are equal
//! when they have the same Rust type and compare equal with `PartialEq`.

mod named;

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::argument::Argument;

pub use named::NamedArgs;

/// A value that can be passed as a statement argument or stored in a row.
///
/// Implemented for every `PartialEq + Debug + Send + Sync + 'static` type.
pub trait SqlValue: Debug + Send + Sync + 'static {
    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Deep equality against another value of any type.
    fn eq_value(&self, other: &dyn SqlValue) -> bool;

    /// Name of the concrete Rust type.
    fn type_name(&self) -> &'static str;
}

impl<T: PartialEq + Debug + Send + Sync + 'static> SqlValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn SqlValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Shared handle to a dynamically typed value.
pub type Value = Arc<dyn SqlValue>;

/// Wrap a concrete value into a [`Value`].
pub fn value<T: SqlValue>(v: T) -> Value {
    Arc::new(v)
}

/// SQL NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

/// One positional argument of a statement or of an expectation.
#[derive(Clone)]
pub enum Arg {
    /// A concrete value, matched by deep equality.
    Value(Value),
    /// A predicate, only meaningful on the expectation side.
    Matcher(Arc<dyn Argument>),
    /// Named arguments, rewritten to positional ones against the SQL text.
    Named(NamedArgs),
}

impl Arg {
    /// Wrap a custom matcher.
    pub fn matcher<M: Argument + 'static>(matcher: M) -> Self {
        Arg::Matcher(Arc::new(matcher))
    }

    /// Concrete value of this argument, if any.
    pub fn as_value(&self) -> Option<&dyn SqlValue> {
        match self {
            Arg::Value(v) => Some(v.as_ref()),
            _ => None,
        }
    }
}

impl Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Value(v) => write!(f, "{:?}", v),
            Arg::Matcher(m) => write!(f, "{:?}", m),
            Arg::Named(n) => write!(f, "{:?}", n),
        }
    }
}

/// Conversion into a single [`Arg`].
pub trait IntoArg {
    /// Convert into an argument.
    fn into_arg(self) -> Arg;
}

impl<T: SqlValue> IntoArg for T {
    fn into_arg(self) -> Arg {
        Arg::Value(Arc::new(self))
    }
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for NamedArgs {
    fn into_arg(self) -> Arg {
        Arg::Named(self)
    }
}

/// Trait for argument lists.
pub trait ToParams {
    /// Convert into positional arguments.
    fn to_params(self) -> Vec<Arg>;
}

impl ToParams for () {
    fn to_params(self) -> Vec<Arg> {
        Vec::new()
    }
}

impl ToParams for Vec<Arg> {
    fn to_params(self) -> Vec<Arg> {
        self
    }
}

impl ToParams for NamedArgs {
    fn to_params(self) -> Vec<Arg> {
        vec![Arg::Named(self)]
    }
}

/// Trait for row value lists.
pub trait ToValues {
    /// Convert into row values.
    fn to_values(self) -> Vec<Value>;
}

impl ToValues for Vec<Value> {
    fn to_values(self) -> Vec<Value> {
        self
    }
}

// Tuple implementations via macro
macro_rules! impl_tuples {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T: IntoArg),+> ToParams for ($($T,)+) {
            fn to_params(self) -> Vec<Arg> {
                vec![$(self.$idx.into_arg()),+]
            }
        }

        impl<$($T: SqlValue),+> ToValues for ($($T,)+) {
            fn to_values(self) -> Vec<Value> {
                vec![$(Arc::new(self.$idx) as Value),+]
            }
        }
    };
}

impl_tuples!(0: T0);
impl_tuples!(0: T0, 1: T1);
impl_tuples!(0: T0, 1: T1, 2: T2);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10);
impl_tuples!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10, 11: T11);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_value_requires_same_type() {
        let a = value(5_i32);
        assert!(a.eq_value(&5_i32));
        assert!(!a.eq_value(&5_i64));
        assert!(!a.eq_value(&"5"));
    }

    #[test]
    fn test_tuple_params() {
        let params = (1_i32, "john", Null).to_params();
        assert_eq!(params.len(), 3);
        assert_eq!(format!("{:?}", params), r#"[1, "john", Null]"#);
    }

    #[test]
    fn test_tuple_values() {
        let values = (5_i32, "hello".to_string()).to_values();
        assert!(values[1].type_name().ends_with("String"));
        assert!(values[0].eq_value(&5_i32));
    }
}
