//! Input selector tuples and combiners.
//!
//! A memoized selector is built from a tuple of input selectors
//! `(Fn(&S) -> X1, ..., Fn(&S) -> Xn)` and a combiner `Fn(X1, ..., Xn) -> R`.
//! The arity of the combiner must match the tuple; a mismatch is a type
//! error, so it is rejected before the program ever runs.

use std::fmt::Display;

use crate::equality::RefEq;
use crate::error::{Result, SelectorError};

/// A tuple of input selectors over state `S`.
pub trait InputSelectors<S>: Send + Sync + 'static {
    /// The tuple of projected values.
    type Values: InputValues;

    /// Number of input selectors.
    const ARITY: usize;

    /// Run every input selector in declared order.
    fn select_all(&self, state: &S) -> Self::Values;
}

/// A tuple of projected input values, comparable element-wise by reference.
pub trait InputValues: Clone + Send + Sync + 'static {
    /// `true` iff every element is reference-equal to its counterpart.
    ///
    /// The empty tuple never matches: without inputs there is no cache key.
    fn ref_eq_all(&self, other: &Self) -> bool;
}

/// A combiner taking the projected values as separate arguments.
pub trait Combiner<Args>: Send + Sync + 'static {
    type Output;

    fn combine(&self, args: Args) -> Self::Output;
}

/// The derivation step of a memoized selector.
///
/// Adapts a [`Combiner`] into the fallible form the cache works with, while
/// keeping the raw function reachable for introspection.
pub trait Derive<Args>: Send + Sync + 'static {
    /// The derived value.
    type Value;

    /// The raw combiner.
    type Func;

    fn derive(&self, args: Args) -> Result<Self::Value>;

    fn func(&self) -> &Self::Func;
}

/// A combiner that cannot fail.
#[derive(Debug, Clone)]
pub struct Infallible<F>(pub F);

impl<Args, F> Derive<Args> for Infallible<F>
where
    F: Combiner<Args>,
{
    type Value = F::Output;
    type Func = F;

    #[inline]
    fn derive(&self, args: Args) -> Result<Self::Value> {
        Ok(self.0.combine(args))
    }

    fn func(&self) -> &F {
        &self.0
    }
}

/// A combiner returning `Result<R, E>`; errors become
/// [`SelectorError::Combiner`].
#[derive(Debug, Clone)]
pub struct Fallible<F>(pub F);

impl<Args, F, R, E> Derive<Args> for Fallible<F>
where
    F: Combiner<Args, Output = std::result::Result<R, E>>,
    E: Display,
{
    type Value = R;
    type Func = F;

    fn derive(&self, args: Args) -> Result<R> {
        self.0
            .combine(args)
            .map_err(|err| SelectorError::Combiner(err.to_string()))
    }

    fn func(&self) -> &F {
        &self.0
    }
}

impl<S> InputSelectors<S> for () {
    type Values = ();
    const ARITY: usize = 0;

    fn select_all(&self, _state: &S) -> Self::Values {}
}

impl InputValues for () {
    fn ref_eq_all(&self, _other: &Self) -> bool {
        false
    }
}

impl<Func, Out> Combiner<()> for Func
where
    Func: Fn() -> Out + Send + Sync + 'static,
{
    type Output = Out;

    fn combine(&self, _args: ()) -> Out {
        self()
    }
}

macro_rules! impl_input_tuple {
    ($arity:expr; $($sel:ident $val:ident $idx:tt),+) => {
        impl<S, $($sel, $val),+> InputSelectors<S> for ($($sel,)+)
        where
            $(
                $sel: Fn(&S) -> $val + Send + Sync + 'static,
                $val: RefEq + Clone + Send + Sync + 'static,
            )+
        {
            type Values = ($($val,)+);
            const ARITY: usize = $arity;

            #[inline]
            fn select_all(&self, state: &S) -> Self::Values {
                ($((self.$idx)(state),)+)
            }
        }

        impl<$($val),+> InputValues for ($($val,)+)
        where
            $($val: RefEq + Clone + Send + Sync + 'static,)+
        {
            #[inline]
            fn ref_eq_all(&self, other: &Self) -> bool {
                true $(&& self.$idx.ref_eq(&other.$idx))+
            }
        }

        impl<Func, Out, $($val),+> Combiner<($($val,)+)> for Func
        where
            Func: Fn($($val),+) -> Out + Send + Sync + 'static,
        {
            type Output = Out;

            #[inline]
            fn combine(&self, args: ($($val,)+)) -> Out {
                self($(args.$idx),+)
            }
        }
    };
}

impl_input_tuple!(1; S0 V0 0);
impl_input_tuple!(2; S0 V0 0, S1 V1 1);
impl_input_tuple!(3; S0 V0 0, S1 V1 1, S2 V2 2);
impl_input_tuple!(4; S0 V0 0, S1 V1 1, S2 V2 2, S3 V3 3);
impl_input_tuple!(5; S0 V0 0, S1 V1 1, S2 V2 2, S3 V3 3, S4 V4 4);
impl_input_tuple!(6; S0 V0 0, S1 V1 1, S2 V2 2, S3 V3 3, S4 V4 4, S5 V5 5);
impl_input_tuple!(7; S0 V0 0, S1 V1 1, S2 V2 2, S3 V3 3, S4 V4 4, S5 V5 5, S6 V6 6);
impl_input_tuple!(8; S0 V0 0, S1 V1 1, S2 V2 2, S3 V3 3, S4 V4 4, S5 V5 5, S6 V6 6, S7 V7 7);
