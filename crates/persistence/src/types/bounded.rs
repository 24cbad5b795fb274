//! Fixed-capacity ordered list of record IDs.

use serde::{Deserialize, Serialize};

/// An ordered list holding at most `N` IDs.
///
/// Pushing past capacity fails instead of dropping the ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundedIds<const N: usize> {
    ids: Vec<i32>,
}

/// Returned by [`BoundedIds::try_push`] when the list is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full {
    /// The list's capacity.
    pub capacity: usize,
}

impl<const N: usize> BoundedIds<N> {
    /// Maximum number of IDs.
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self {
            ids: Vec::with_capacity(N),
        }
    }

    /// Builds a list from `ids`, or `None` if there are more than `N`.
    pub fn from_vec(ids: Vec<i32>) -> Option<Self> {
        (ids.len() <= N).then_some(Self { ids })
    }

    pub fn try_push(&mut self, id: i32) -> Result<(), Full> {
        if self.ids.len() >= N {
            return Err(Full { capacity: N });
        }
        self.ids.push(id);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= N
    }

    pub fn contains(&self, id: i32) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, index: usize) -> Option<i32> {
        self.ids.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.ids
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut ids = BoundedIds::<2>::new();
        assert!(ids.try_push(1).is_ok());
        assert!(ids.try_push(2).is_ok());
        assert!(ids.is_full());
        assert_eq!(ids.try_push(3), Err(Full { capacity: 2 }));
        assert_eq!(ids.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_from_vec_checks_capacity() {
        assert!(BoundedIds::<2>::from_vec(vec![1, 2, 3]).is_none());
        let ids = BoundedIds::<2>::from_vec(vec![5]).unwrap();
        assert_eq!(ids.get(0), Some(5));
        assert_eq!(ids.get(1), None);
    }
}
