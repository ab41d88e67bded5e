use crate::collections::IdSet;
use crate::types::Id;
use std::collections::HashMap;

/// Union-find over identifiers, used to link reference results that multiple
/// result sets attach to.
///
/// Ids are tracked lazily: an id the structure has never seen forms its own
/// singleton class. `link` unions by rank and compresses paths as it walks;
/// [`extract_set`] never mutates, so repeated extraction of the same class is
/// side-effect free and safe to interleave with reads.
///
/// [`extract_set`]: DisjointIdSet::extract_set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisjointIdSet {
    parent: HashMap<Id, Id>,
    rank: HashMap<Id, u32>,
}

impl DisjointIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the classes containing `a` and `b`.
    pub fn link(&mut self, a: Id, b: Id) {
        let ra = self.find_compressing(a);
        let rb = self.find_compressing(b);
        if ra == rb {
            return;
        }
        let rank_a = self.rank.get(&ra).copied().unwrap_or(0);
        let rank_b = self.rank.get(&rb).copied().unwrap_or(0);
        if rank_a < rank_b {
            self.parent.insert(ra, rb);
        } else if rank_a > rank_b {
            self.parent.insert(rb, ra);
        } else {
            self.parent.insert(rb, ra);
            self.rank.insert(ra, rank_a + 1);
        }
    }

    /// The full equivalence class containing `id`, including `id` itself.
    pub fn extract_set(&self, id: Id) -> IdSet {
        let root = self.find(id);
        let mut set = IdSet::new();
        set.add(id);
        for &candidate in self.parent.keys() {
            if self.find(candidate) == root {
                set.add(candidate);
            }
        }
        set
    }

    /// Root of `id`'s class without mutating the forest.
    fn find(&self, mut id: Id) -> Id {
        while let Some(&next) = self.parent.get(&id) {
            if next == id {
                break;
            }
            id = next;
        }
        id
    }

    /// Root of `id`'s class, halving the path on the way up. Only `link`
    /// calls this so shared references observe a stable forest.
    fn find_compressing(&mut self, mut id: Id) -> Id {
        while let Some(&next) = self.parent.get(&id) {
            if next == id {
                break;
            }
            if let Some(&grand) = self.parent.get(&next) {
                self.parent.insert(id, grand);
            }
            id = next;
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<Id> {
        values.iter().copied().map(Id::new).collect()
    }

    #[test]
    fn test_unlinked_id_is_its_own_class() {
        let sets = DisjointIdSet::new();
        assert_eq!(sets.extract_set(Id::new(7)).to_vec(), ids(&[7]));
    }

    #[test]
    fn test_link_merges_classes() {
        let mut sets = DisjointIdSet::new();
        sets.link(Id::new(1), Id::new(2));
        sets.link(Id::new(3), Id::new(4));
        sets.link(Id::new(2), Id::new(3));

        assert_eq!(sets.extract_set(Id::new(1)).to_vec(), ids(&[1, 2, 3, 4]));
        assert_eq!(sets.extract_set(Id::new(4)).to_vec(), ids(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_extract_is_side_effect_free() {
        let mut sets = DisjointIdSet::new();
        sets.link(Id::new(1), Id::new(2));
        sets.link(Id::new(2), Id::new(5));

        let first = sets.extract_set(Id::new(5));
        let second = sets.extract_set(Id::new(5));
        assert_eq!(first, second);
        assert_eq!(first.to_vec(), ids(&[1, 2, 5]));
    }

    #[test]
    fn test_separate_classes_stay_separate() {
        let mut sets = DisjointIdSet::new();
        sets.link(Id::new(1), Id::new(2));
        sets.link(Id::new(10), Id::new(11));

        assert_eq!(sets.extract_set(Id::new(1)).to_vec(), ids(&[1, 2]));
        assert_eq!(sets.extract_set(Id::new(10)).to_vec(), ids(&[10, 11]));
    }

    #[test]
    fn test_self_link_is_a_noop() {
        let mut sets = DisjointIdSet::new();
        sets.link(Id::new(3), Id::new(3));
        assert_eq!(sets.extract_set(Id::new(3)).to_vec(), ids(&[3]));
    }

    #[test]
    fn test_min_is_canonical_regardless_of_link_order() {
        let mut forward = DisjointIdSet::new();
        forward.link(Id::new(2), Id::new(9));
        forward.link(Id::new(9), Id::new(4));

        let mut backward = DisjointIdSet::new();
        backward.link(Id::new(4), Id::new(9));
        backward.link(Id::new(9), Id::new(2));

        assert_eq!(forward.extract_set(Id::new(9)).min(), Some(Id::new(2)));
        assert_eq!(backward.extract_set(Id::new(9)).min(), Some(Id::new(2)));
    }
}
