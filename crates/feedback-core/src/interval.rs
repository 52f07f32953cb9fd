use std::collections::BTreeMap;

/// Total map from an ordered key space to values, held in canonical form:
/// no two adjacent intervals carry equal values.
///
/// Keys below the first stored boundary take the default value, so the map
/// covers the entire key range from the start. Downstream predicates
/// ([`IntervalMap::is_constant`] in particular) rely on canonicalization
/// happening inside every [`IntervalMap::assign`], not lazily.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalMap<K, V> {
    default: V,
    bounds: BTreeMap<K, V>,
}

impl<K: Ord + Copy, V: Clone + PartialEq> IntervalMap<K, V> {
    pub fn new(default: V) -> Self {
        Self {
            default,
            bounds: BTreeMap::new(),
        }
    }

    /// The value effective at `key`.
    pub fn get(&self, key: &K) -> &V {
        self.bounds
            .range(..=key)
            .next_back()
            .map_or(&self.default, |(_, value)| value)
    }

    /// Assign `value` to the half-open interval `[lo, hi)`.
    ///
    /// A no-op unless `lo < hi`. Boundary entries are only inserted where
    /// they change the effective value, which keeps the map canonical.
    pub fn assign(&mut self, lo: K, hi: K, value: V) {
        if lo >= hi {
            return;
        }

        let behind = self.get(&hi).clone();

        let obsolete: Vec<K> = self.bounds.range(lo..=hi).map(|(key, _)| *key).collect();
        for key in obsolete {
            self.bounds.remove(&key);
        }

        if *self.left_of(&lo) != value {
            self.bounds.insert(lo, value);
        }
        if *self.get(&hi) != behind {
            self.bounds.insert(hi, behind);
        }
    }

    /// True when a single value covers the whole key range.
    pub fn is_constant(&self) -> bool {
        self.bounds.is_empty()
    }

    /// True when no two adjacent intervals carry equal values.
    pub fn is_canonical(&self) -> bool {
        let mut previous = &self.default;
        for value in self.bounds.values() {
            if value == previous {
                return false;
            }
            previous = value;
        }
        true
    }

    /// The value effective just below `key`.
    fn left_of(&self, key: &K) -> &V {
        self.bounds
            .range(..key)
            .next_back()
            .map_or(&self.default, |(_, value)| value)
    }
}
