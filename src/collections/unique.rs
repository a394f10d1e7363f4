use std::ops::Index;

use crate::{Error, Result};

/// An ordered set: a list that silently ignores duplicates.
///
/// Elements keep their first-insertion order, which makes iteration deterministic. Control flow
/// blocks store their successor and predecessor edges in a `UniqueList` so that adding the same
/// edge twice is a no-op while the order of distinct edges is preserved.
///
/// Membership checks are linear; edge lists are short.
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::collections::UniqueList;
///
/// let mut list = UniqueList::new();
/// assert!(list.add(3));
/// assert!(list.add(1));
/// assert!(!list.add(3));
/// assert_eq!(list.as_slice(), &[3, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueList<T> {
    list: Vec<T>,
}

impl<T> Default for UniqueList<T> {
    fn default() -> Self {
        UniqueList { list: Vec::new() }
    }
}

impl<T: PartialEq> UniqueList<T> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty list with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        UniqueList {
            list: Vec::with_capacity(capacity),
        }
    }

    /// Append `item` unless it is already present. Returns `true` if it was added.
    pub fn add(&mut self, item: T) -> bool {
        if self.list.contains(&item) {
            return false;
        }
        self.list.push(item);
        true
    }

    /// Append every element not yet present, in order.
    pub fn add_range<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.add(item);
        }
    }

    /// Insert `item` at `index` unless it is already present. Returns `true` if it was added.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index > len`.
    pub fn insert(&mut self, index: usize, item: T) -> Result<bool> {
        if index > self.list.len() {
            return Err(Error::OutOfRange {
                index,
                len: self.list.len(),
            });
        }
        if self.list.contains(&item) {
            return Ok(false);
        }
        self.list.insert(index, item);
        Ok(true)
    }

    /// Overwrite the element at `index` unless `item` is already present anywhere in the list.
    /// Returns `true` if the element was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index >= len`.
    pub fn set(&mut self, index: usize, item: T) -> Result<bool> {
        if index >= self.list.len() {
            return Err(Error::OutOfRange {
                index,
                len: self.list.len(),
            });
        }
        if self.list.contains(&item) {
            return Ok(false);
        }
        self.list[index] = item;
        Ok(true)
    }

    /// Replace `old` with `new` in place.
    ///
    /// If `new` is already present, `old` is only removed, so the list stays duplicate free.
    /// Returns `false` if `old` was not present.
    pub fn replace(&mut self, old: &T, new: T) -> bool {
        let Some(index) = self.index_of(old) else {
            return false;
        };
        if self.list.contains(&new) {
            self.list.remove(index);
        } else {
            self.list[index] = new;
        }
        true
    }

    /// Remove `item`. Returns `false` if it was not present.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if `index >= len`.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        if index >= self.list.len() {
            return Err(Error::OutOfRange {
                index,
                len: self.list.len(),
            });
        }
        Ok(self.list.remove(index))
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// Returns `true` if `item` is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.list.contains(item)
    }

    /// Position of `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.list.iter().position(|candidate| candidate == item)
    }
}

impl<T> UniqueList<T> {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if the list holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.list.get(index)
    }

    /// First element.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.list.first()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.list.iter()
    }

    /// The elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.list
    }
}

impl<T> Index<usize> for UniqueList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.list[index]
    }
}

impl<T: PartialEq> FromIterator<T> for UniqueList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = UniqueList::new();
        list.add_range(iter);
        list
    }
}

impl<T: PartialEq> Extend<T> for UniqueList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_range(iter);
    }
}

impl<'a, T> IntoIterator for &'a UniqueList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_duplicates() {
        let list: UniqueList<u32> = [4, 2, 4, 9, 2].into_iter().collect();
        assert_eq!(list.as_slice(), &[4, 2, 9]);
        assert_eq!(list.first(), Some(&4));
        assert_eq!(list[2], 9);
    }

    #[test]
    fn insert_and_set() {
        let mut list: UniqueList<u32> = [1, 2].into_iter().collect();
        assert!(list.insert(0, 0).unwrap());
        assert!(!list.insert(3, 1).unwrap());
        assert!(list.insert(4, 5).is_err());
        assert_eq!(list.as_slice(), &[0, 1, 2]);

        assert!(!list.set(0, 2).unwrap());
        assert!(list.set(0, 7).unwrap());
        assert_eq!(list.as_slice(), &[7, 1, 2]);
        assert!(list.set(3, 8).is_err());
    }

    #[test]
    fn replace_keeps_position() {
        let mut list: UniqueList<u32> = [1, 2, 3].into_iter().collect();
        assert!(list.replace(&2, 9));
        assert_eq!(list.as_slice(), &[1, 9, 3]);

        assert!(list.replace(&1, 3));
        assert_eq!(list.as_slice(), &[9, 3]);

        assert!(!list.replace(&42, 1));
    }

    #[test]
    fn removal() {
        let mut list: UniqueList<u32> = [1, 2, 3].into_iter().collect();
        assert!(list.remove(&2));
        assert!(!list.remove(&2));
        assert_eq!(list.remove_at(1).unwrap(), 3);
        assert!(list.remove_at(1).is_err());
        list.clear();
        assert!(list.is_empty());
    }
}
