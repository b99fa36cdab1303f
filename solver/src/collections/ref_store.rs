use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A dense identifier that can be used as an index into a [RefVec].
pub trait Ref: Into<usize> + From<usize> + Copy + PartialEq + Debug {}

impl<X> Ref for X where X: Into<usize> + From<usize> + Copy + PartialEq + Debug {}

/// Declares a new identifier type backed by a non-zero `u32`, so that `Option<Id>` has the same size as `Id`.
#[macro_export]
macro_rules! create_ref_type {
    ($type_name:ident) => {
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        pub struct $type_name(std::num::NonZeroU32);

        impl $type_name {
            pub const fn from_u32(u: u32) -> Self {
                match std::num::NonZeroU32::new(u + 1) {
                    Some(id) => $type_name(id),
                    None => panic!("identifier overflow"),
                }
            }

            pub const fn to_u32(self) -> u32 {
                self.0.get() - 1
            }
        }

        impl std::fmt::Debug for $type_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($type_name), self.to_u32())
            }
        }

        impl From<usize> for $type_name {
            fn from(u: usize) -> Self {
                Self::from_u32(u as u32)
            }
        }

        impl From<$type_name> for usize {
            fn from(v: $type_name) -> Self {
                v.to_u32() as usize
            }
        }

        impl From<u32> for $type_name {
            fn from(u: u32) -> Self {
                Self::from_u32(u)
            }
        }

        impl From<$type_name> for u32 {
            fn from(v: $type_name) -> Self {
                v.to_u32()
            }
        }
    };
}

/// A vector indexed by a typed key instead of a raw `usize`.
#[derive(Clone, Debug)]
pub struct RefVec<K, V> {
    values: Vec<V>,
    phantom: PhantomData<K>,
}

impl<K, V> Default for RefVec<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RefVec<K, V> {
    pub fn new() -> Self {
        RefVec {
            values: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: V) -> K
    where
        K: Ref,
    {
        self.values.push(value);
        K::from(self.values.len() - 1)
    }

    pub fn get(&self, k: K) -> Option<&V>
    where
        K: Ref,
    {
        self.values.get(k.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + use<K, V>
    where
        K: Ref,
    {
        (0..self.values.len()).map(K::from)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = (K, &V)>
    where
        K: Ref,
    {
        self.values.iter().enumerate().map(|(i, v)| (K::from(i), v))
    }
}

impl<K: Ref, V> Index<K> for RefVec<K, V> {
    type Output = V;

    fn index(&self, index: K) -> &Self::Output {
        &self.values[index.into()]
    }
}

impl<K: Ref, V> IndexMut<K> for RefVec<K, V> {
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.values[index.into()]
    }
}
