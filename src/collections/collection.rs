//! Ordered collection with mutation hooks.
//!
//! [`Collection`] behaves like a `Vec` whose owner is told about every mutation before it takes
//! effect. Object model collections use this to keep back-references in sync; for example a
//! method's parameter list stamps each parameter with its owning method and position, see
//! [`crate::metadata::ParameterHooks`].

use std::ops::Index;

use crate::{Error, Result};

/// Callbacks invoked by [`Collection`] before it mutates its storage.
///
/// All methods have empty default implementations, so implementors only override what they
/// care about. `items` is always the current content of the collection at the time of the call
/// and may be adjusted in place (e.g. to renumber siblings).
pub trait CollectionHooks<T> {
    /// Called before `item` is appended at `index` (the current length).
    fn on_add(&mut self, _item: &mut T, _index: usize, _items: &mut [T]) {}

    /// Called before `batch` is appended starting at `index`.
    ///
    /// Defaults to [`CollectionHooks::on_insert_range`].
    fn on_add_range(&mut self, batch: &mut [T], index: usize, items: &mut [T]) {
        self.on_insert_range(batch, index, items);
    }

    /// Called before `item` is inserted at `index`; `items[index..]` will shift up by one.
    fn on_insert(&mut self, _item: &mut T, _index: usize, _items: &mut [T]) {}

    /// Called before `batch` is inserted at `index`.
    ///
    /// Defaults to calling [`CollectionHooks::on_insert`] for every element with the index it
    /// will occupy.
    fn on_insert_range(&mut self, batch: &mut [T], index: usize, items: &mut [T]) {
        for (position, item) in batch.iter_mut().enumerate() {
            self.on_insert(item, index + position, items);
        }
    }

    /// Called before `item` replaces the element at `index`.
    fn on_set(&mut self, _item: &mut T, _index: usize, _items: &mut [T]) {}

    /// Called after `item` was taken out of position `index`; `items` no longer contains it.
    fn on_remove(&mut self, _item: &mut T, _index: usize, _items: &mut [T]) {}

    /// Called before all elements are dropped.
    fn on_clear(&mut self, _items: &mut [T]) {}
}

impl<T> CollectionHooks<T> for () {}

/// An ordered, growable collection that reports mutations to its [`CollectionHooks`].
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::collections::Collection;
///
/// let mut values: Collection<i32> = (0..6).collect();
/// values.insert_range(2, [6, 7, 8])?;
/// assert_eq!(values.as_slice(), &[0, 1, 6, 7, 8, 2, 3, 4, 5]);
/// # Ok::<(), cilflow::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Collection<T, H = ()> {
    items: Vec<T>,
    hooks: H,
}

impl<T> Collection<T> {
    /// Create an empty collection without hooks.
    #[must_use]
    pub fn new() -> Self {
        Collection {
            items: Vec::new(),
            hooks: (),
        }
    }

    /// Create an empty collection without hooks and with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Collection {
            items: Vec::with_capacity(capacity),
            hooks: (),
        }
    }
}

impl<T, H: Default> Default for Collection<T, H> {
    fn default() -> Self {
        Collection {
            items: Vec::new(),
            hooks: H::default(),
        }
    }
}

impl<T, H: CollectionHooks<T>> Collection<T, H> {
    /// Create an empty collection that reports mutations to `hooks`.
    #[must_use]
    pub fn with_hooks(hooks: H) -> Self {
        Collection {
            items: Vec::new(),
            hooks,
        }
    }

    /// Append an element.
    pub fn add(&mut self, mut item: T) {
        let index = self.items.len();
        self.hooks.on_add(&mut item, index, &mut self.items);
        self.items.push(item);
    }

    /// Append all elements of `batch`, in order.
    pub fn add_range<I: IntoIterator<Item = T>>(&mut self, batch: I) {
        let mut batch: Vec<T> = batch.into_iter().collect();
        let index = self.items.len();
        self.hooks.on_add_range(&mut batch, index, &mut self.items);
        self.items.extend(batch);
    }

    /// Insert an element at `index`, shifting later elements up.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index > len`.
    pub fn insert(&mut self, index: usize, mut item: T) -> Result<()> {
        self.check_position(index)?;
        self.hooks.on_insert(&mut item, index, &mut self.items);
        self.items.insert(index, item);
        Ok(())
    }

    /// Insert all elements of `batch` at `index`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index > len`.
    pub fn insert_range<I: IntoIterator<Item = T>>(&mut self, index: usize, batch: I) -> Result<()> {
        self.check_position(index)?;
        let mut batch: Vec<T> = batch.into_iter().collect();
        self.hooks.on_insert_range(&mut batch, index, &mut self.items);
        self.items.splice(index..index, batch);
        Ok(())
    }

    /// Replace the element at `index`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index >= len`.
    pub fn set(&mut self, index: usize, mut item: T) -> Result<T> {
        self.check_index(index)?;
        self.hooks.on_set(&mut item, index, &mut self.items);
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index >= len`.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.check_index(index)?;
        let mut item = self.items.remove(index);
        self.hooks.on_remove(&mut item, index, &mut self.items);
        Ok(item)
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        self.hooks.on_clear(&mut self.items);
        self.items.clear();
    }

    /// Sort the elements with a comparator. Sorting does not invoke hooks.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.items.sort_by(compare);
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    fn check_position(&self, index: usize) -> Result<()> {
        if index <= self.items.len() {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }
}

impl<T: PartialEq, H: CollectionHooks<T>> Collection<T, H> {
    /// Remove the first element equal to `item`. Returns `false` if there was none.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }
}

impl<T, H> Collection<T, H> {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Iterate over the elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// The hooks this collection reports to.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Consume the collection, returning its elements.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: PartialEq, H> Collection<T, H> {
    /// Returns `true` if an element equal to `item` is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Position of the first element equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }
}

impl<T, H> Index<usize> for Collection<T, H> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<T: PartialEq, H, H2> PartialEq<Collection<T, H2>> for Collection<T, H> {
    fn eq(&self, other: &Collection<T, H2>) -> bool {
        self.items == other.items
    }
}

impl<T, H: CollectionHooks<T> + Default> FromIterator<T> for Collection<T, H> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Collection::with_hooks(H::default());
        for item in iter {
            collection.add(item);
        }
        collection
    }
}

impl<'a, T, H> IntoIterator for &'a Collection<T, H> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
