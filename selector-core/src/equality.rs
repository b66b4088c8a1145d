//! Equality Functions
//!
//! Pure predicates that decide whether two selector results are "the same".
//! They are the leaves of the selector subsystem and have no dependencies.
//!
//! # Kinds
//!
//! - **Reference**: two values are equal iff they are the same shared node
//!   (`Arc::ptr_eq`) or, for primitives, equal by value. O(1).
//! - **Shallow**: sequences are equal iff they have the same length and their
//!   elements are reference-equal pairwise; keyed records are equal iff they
//!   have the same key set and reference-equal values. Nested structures are
//!   compared by reference, never recursively. O(n) in the top level.
//! - **Custom**: any deterministic `Fn(&T, &T) -> bool`.
//!
//! Shapes of different types cannot be compared at all; optional values with
//! different presence compare unequal.

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

/// Identity comparison.
///
/// Shared nodes compare by pointer, primitives by value. This is the
/// comparison the memoized selector uses on its input tuple.
pub trait RefEq {
    /// Returns `true` iff `self` and `other` are the same reference.
    fn ref_eq(&self, other: &Self) -> bool;
}

impl<T: ?Sized> RefEq for Arc<T> {
    fn ref_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> RefEq for Rc<T> {
    fn ref_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: RefEq> RefEq for Option<T> {
    fn ref_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.ref_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Implements [`RefEq`] by value for types without identity.
#[macro_export]
macro_rules! impl_ref_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::equality::RefEq for $ty {
                #[inline]
                fn ref_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_ref_eq_by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
    String, str,
);

// Floats compare by bit pattern, with every NaN equal to every other NaN.
// 0.0 and -0.0 differ.
macro_rules! impl_ref_eq_by_bits {
    ($($ty:ty),*) => {
        $(
            impl RefEq for $ty {
                #[inline]
                fn ref_eq(&self, other: &Self) -> bool {
                    (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

impl_ref_eq_by_bits!(f32, f64);

/// Reference equality.
#[inline]
pub fn reference_equal<T: RefEq + ?Sized>(a: &T, b: &T) -> bool {
    a.ref_eq(b)
}

/// One-level structural comparison.
pub trait ShallowEq {
    /// Returns `true` iff the top level of `self` and `other` match with
    /// reference-equal children.
    fn shallow_eq(&self, other: &Self) -> bool;
}

impl<T: RefEq> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.ref_eq(b))
    }
}

impl<T: RefEq> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Arc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).shallow_eq(&**other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K, V, H> ShallowEq for IndexMap<K, V, H>
where
    K: Hash + Eq,
    V: RefEq,
    H: BuildHasher,
{
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|o| value.ref_eq(o)))
    }
}

impl<K, V, H> ShallowEq for HashMap<K, V, H>
where
    K: Hash + Eq,
    V: RefEq,
    H: BuildHasher,
{
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|o| value.ref_eq(o)))
    }
}

/// Shallow equality.
#[inline]
pub fn shallow_equal<T: ShallowEq + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

/// Which comparison an [`Equality`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityKind {
    Reference,
    Shallow,
    Custom,
}

/// An equality function as a value.
///
/// This is the single capability the notification layer accepts: every kind
/// is just a `Fn(&T, &T) -> bool` behind an `Arc`, so cloning is cheap.
pub struct Equality<T: ?Sized> {
    kind: EqualityKind,
    func: Arc<dyn Fn(&T, &T) -> bool + Send + Sync>,
}

impl<T: ?Sized + 'static> Equality<T> {
    /// Reference equality (the default).
    pub fn reference() -> Self
    where
        T: RefEq,
    {
        Self {
            kind: EqualityKind::Reference,
            func: Arc::new(|a: &T, b: &T| a.ref_eq(b)),
        }
    }

    /// One-level shallow equality.
    pub fn shallow() -> Self
    where
        T: ShallowEq,
    {
        Self {
            kind: EqualityKind::Shallow,
            func: Arc::new(|a: &T, b: &T| a.shallow_eq(b)),
        }
    }

    /// A caller-supplied predicate.
    ///
    /// The predicate should be deterministic and symmetric.
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: EqualityKind::Custom,
            func: Arc::new(func),
        }
    }
}

impl<T: ?Sized> Equality<T> {
    /// Which comparison this is.
    pub fn kind(&self) -> EqualityKind {
        self.kind
    }

    /// Compare two values.
    #[inline]
    pub fn equals(&self, a: &T, b: &T) -> bool {
        (self.func)(a, b)
    }
}

impl<T: ?Sized> Clone for Equality<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            func: Arc::clone(&self.func),
        }
    }
}

impl<T: RefEq + ?Sized + 'static> Default for Equality<T> {
    fn default() -> Self {
        Self::reference()
    }
}

impl<T: ?Sized> fmt::Debug for Equality<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equality").field("kind", &self.kind).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_equal_compares_identity_not_contents() {
        let a = Arc::new(vec![1, 2, 3]);
        let b = Arc::new(vec![1, 2, 3]);

        assert!(reference_equal(&a, &a.clone()));
        assert!(!reference_equal(&a, &b));
    }

    #[test]
    fn reference_equal_compares_primitives_by_value() {
        assert!(reference_equal(&7u64, &7u64));
        assert!(!reference_equal(&true, &false));
        assert!(reference_equal("tick", "tick"));
    }

    #[test]
    fn floats_use_same_value_equality() {
        assert!(reference_equal(&f64::NAN, &f64::NAN));
        assert!(reference_equal(&f32::NAN, &f32::NAN));
        assert!(reference_equal(&1.5f64, &1.5f64));
        assert!(!reference_equal(&0.0f64, &-0.0f64));

        let samples = vec![1.0, f64::NAN, -0.0];
        let copy = samples.clone();
        assert!(shallow_equal(&samples, &copy));
    }

    #[test]
    fn shallow_equal_on_copied_array() {
        let shared: Vec<Arc<u32>> = (0..16).map(Arc::new).collect();
        let copy = shared.clone();

        assert!(shallow_equal(&shared, &copy));

        let mut longer = shared.clone();
        longer.push(Arc::new(99));
        assert!(!shallow_equal(&shared, &longer));
    }

    #[test]
    fn shallow_equal_is_one_level_only() {
        // Same contents, different child references.
        let a = vec![Arc::new(1), Arc::new(2)];
        let b = vec![Arc::new(1), Arc::new(2)];
        assert!(!shallow_equal(&a, &b));
    }

    #[test]
    fn shallow_equal_on_shared_arrays() {
        let items: Arc<Vec<Arc<u32>>> = Arc::new((0..4).map(Arc::new).collect());
        let copy = Arc::new(items.as_ref().clone());

        assert!(shallow_equal(&items, &items));
        assert!(shallow_equal(&items, &copy));
    }

    #[test]
    fn shallow_equal_on_records() {
        let flag = Arc::new(true);
        let mut a = IndexMap::new();
        a.insert("filter", Arc::clone(&flag));
        a.insert("tick", Arc::new(false));

        let mut b = IndexMap::new();
        b.insert("tick", Arc::clone(&a["tick"]));
        b.insert("filter", Arc::clone(&flag));

        // Key order does not matter.
        assert!(shallow_equal(&a, &b));

        b.insert("extra", Arc::new(true));
        assert!(!shallow_equal(&a, &b));
    }

    #[test]
    fn shallow_equal_on_mismatched_presence() {
        let some: Option<Vec<u8>> = Some(vec![]);
        assert!(!shallow_equal(&some, &None));
        assert!(shallow_equal(&None::<Vec<u8>>, &None));
    }

    #[test]
    fn equality_values_dispatch_to_their_kind() {
        let items: Arc<Vec<u8>> = Arc::new(vec![1, 2, 3]);
        let copy = Arc::new(vec![1, 2, 3]);

        let reference = Equality::<Arc<Vec<u8>>>::reference();
        let shallow = Equality::<Arc<Vec<u8>>>::shallow();
        let by_len = Equality::custom(|a: &Arc<Vec<u8>>, b: &Arc<Vec<u8>>| a.len() == b.len());

        assert!(!reference.equals(&items, &copy));
        assert!(shallow.equals(&items, &copy));
        assert!(by_len.equals(&items, &Arc::new(vec![0, 0, 0])));

        assert_eq!(reference.kind(), EqualityKind::Reference);
        assert_eq!(shallow.clone().kind(), EqualityKind::Shallow);
        assert_eq!(by_len.kind(), EqualityKind::Custom);
        assert_eq!(Equality::<u8>::default().kind(), EqualityKind::Reference);
    }
}
