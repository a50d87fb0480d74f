use fnv::FnvHashMap;

/// A map keyed by an unordered pair of indices, so `(a, b)` and `(b, a)` are the same entry.
#[derive(Clone, Debug, Default)]
pub struct SymmetricMap<T> {
    map: FnvHashMap<(usize, usize), T>,
}

impl<T> SymmetricMap<T> {
    pub fn new() -> Self {
        SymmetricMap {
            map: FnvHashMap::default(),
        }
    }

    fn order_indices(i1: usize, i2: usize) -> (usize, usize) {
        if i1 > i2 {
            (i2, i1)
        } else {
            (i1, i2)
        }
    }

    pub fn contains(&self, i1: usize, i2: usize) -> bool {
        self.map.contains_key(&Self::order_indices(i1, i2))
    }

    pub fn insert(&mut self, i1: usize, i2: usize, value: T) {
        self.map.insert(Self::order_indices(i1, i2), value);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Entries in ascending key order, independent of insertion history.
    pub fn sorted_entries(&self) -> Vec<((usize, usize), &T)> {
        let mut entries: Vec<_> = self.map.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_of_indices_does_not_matter() {
        let mut map = SymmetricMap::new();
        map.insert(5, 2, "hall");
        map.insert(2, 5, "door");
        map.insert(1, 3, "hall");

        assert!(map.contains(2, 5));
        assert!(map.contains(3, 1));
        assert!(!map.contains(1, 5));
        assert_eq!(map.len(), 2);
        assert_eq!(map.sorted_entries(), vec![((1, 3), &"hall"), ((2, 5), &"door")]);

        map.clear();
        assert_eq!(map.len(), 0);
    }
}
