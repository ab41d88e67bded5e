use crate::collections::IdSet;
use crate::types::Id;
use std::collections::HashMap;

/// A default-map from identifier to [`IdSet`], optimized for the singleton
/// case.
///
/// The overwhelmingly common shape during correlation is one key with one
/// small set (a result that lives in a single document), so the first
/// key/value pair is stored inline; only the second distinct key promotes the
/// structure to a real hash map. The contract is identical either way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdSetMap {
    repr: Repr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Repr {
    #[default]
    Empty,
    One(Id, IdSet),
    Many(HashMap<Id, IdSet>),
}

impl IdSetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: Id) -> Option<&IdSet> {
        match &self.repr {
            Repr::Empty => None,
            Repr::One(k, set) if *k == key => Some(set),
            Repr::One(..) => None,
            Repr::Many(map) => map.get(&key),
        }
    }

    /// The set for `key`, inserting an empty set if absent.
    pub fn get_or_init(&mut self, key: Id) -> &mut IdSet {
        match &self.repr {
            Repr::Empty => {
                self.repr = Repr::One(key, IdSet::new());
            }
            Repr::One(k, _) if *k != key => self.promote(),
            _ => {}
        }
        match &mut self.repr {
            Repr::One(_, set) => set,
            Repr::Many(map) => map.entry(key).or_default(),
            Repr::Empty => unreachable!("get_or_init always materializes an entry"),
        }
    }

    fn promote(&mut self) {
        if let Repr::One(k, set) = std::mem::take(&mut self.repr) {
            let mut map = HashMap::new();
            map.insert(k, set);
            self.repr = Repr::Many(map);
        }
    }

    /// Add a single member to the set for `key`.
    pub fn add(&mut self, key: Id, value: Id) {
        self.get_or_init(key).add(value);
    }

    /// Union `set` into the set for `key`.
    pub fn union_into(&mut self, key: Id, set: &IdSet) {
        self.get_or_init(key).union(set);
    }

    /// Remove and return the set for `key`.
    pub fn take(&mut self, key: Id) -> Option<IdSet> {
        match &mut self.repr {
            Repr::Empty => None,
            Repr::One(k, _) if *k == key => {
                if let Repr::One(_, set) = std::mem::take(&mut self.repr) {
                    Some(set)
                } else {
                    None
                }
            }
            Repr::One(..) => None,
            Repr::Many(map) => map.remove(&key),
        }
    }

    pub fn delete(&mut self, key: Id) {
        self.take(key);
    }

    pub fn contains_key(&self, key: Id) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::One(..) => 1,
            Repr::Many(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in ascending order. Grouping iterates through this so output is
    /// reproducible regardless of the backing representation.
    pub fn sorted_keys(&self) -> Vec<Id> {
        let mut keys: Vec<Id> = match &self.repr {
            Repr::Empty => Vec::new(),
            Repr::One(k, _) => vec![*k],
            Repr::Many(map) => map.keys().copied().collect(),
        };
        keys.sort();
        keys
    }

    /// Visit every entry. Visit order is unspecified; use [`sorted_keys`] when
    /// order matters.
    ///
    /// [`sorted_keys`]: IdSetMap::sorted_keys
    pub fn each<F: FnMut(Id, &IdSet)>(&self, mut f: F) {
        match &self.repr {
            Repr::Empty => {}
            Repr::One(k, set) => f(*k, set),
            Repr::Many(map) => {
                for (k, set) in map {
                    f(*k, set);
                }
            }
        }
    }
}
