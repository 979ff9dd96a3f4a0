//! Caller-defined data attached to a context.
//!
//! Libraries that build on a [`Context`](crate::Context) can keep their own
//! per-thread state next to it, one value per type:
//!
//! ```
//! use hexer::{Config, Context};
//!
//! #[derive(Debug, PartialEq)]
//! struct RequestId(u64);
//!
//! let context = Context::new(&Config::default());
//! context.extensions_mut().insert(RequestId(7));
//! assert_eq!(context.extensions().get::<RequestId>(), Some(&RequestId(7)));
//! ```

use alloc::boxed::Box;
use core::{
    any::{Any, TypeId},
    fmt,
};

use hashbrown::HashMap;

/// Side table holding at most one value of each type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any>, rustc_hash::FxBuildHasher>,
}

impl Extensions {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, returning the previous value of the same type.
    pub fn insert<T: 'static>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok().map(|old: Box<T>| *old))
    }

    /// The stored value of type `T`.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map.get(&TypeId::of::<T>())?.downcast_ref()
    }

    /// Mutable access to the stored value of type `T`.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    /// Returns the stored value of type `T`, inserting one from `f` first if
    /// there is none.
    pub fn get_or_insert_with<T: 'static>(&mut self, f: impl FnOnce() -> T) -> &mut T {
        let slot = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(f()));
        match slot.downcast_mut() {
            Some(value) => value,
            None => unreachable!("extension stored under the wrong type id"),
        }
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast().ok().map(|old: Box<T>| *old))
    }

    /// Returns `true` if a value of type `T` is stored.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_value_per_type() {
        let mut extensions = Extensions::new();
        assert_eq!(extensions.insert(1_u8), None);
        assert_eq!(extensions.insert(2_u8), Some(1));
        assert_eq!(extensions.insert("text"), None);
        assert_eq!(extensions.len(), 2);

        *extensions.get_mut::<u8>().unwrap() += 1;
        assert_eq!(extensions.get::<u8>(), Some(&3));
        assert_eq!(extensions.remove::<u8>(), Some(3));
        assert!(!extensions.contains::<u8>());
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut extensions = Extensions::new();
        extensions.get_or_insert_with(|| 10_u32);
        *extensions.get_or_insert_with(|| 0_u32) += 1;
        assert_eq!(extensions.get::<u32>(), Some(&11));
    }
}
