//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node in a [`Scene`](crate::scene::Scene) arena
    pub struct NodeId;

    /// Stable handle to a component stored in a [`Scene`](crate::scene::Scene) arena
    pub struct ComponentId;
}

/// Growable bitset keyed by small integer ids
///
/// Used for per-entity component-type masks, so "has component type X" is a
/// single word lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitMask {
    words: Vec<u64>,
}

impl BitMask {
    /// Create an empty mask
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bit at `index`
    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % 64);
    }

    /// Check whether the bit at `index` is set
    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Check whether every bit set in `other` is also set in `self`
    pub fn contains_all(&self, other: &BitMask) -> bool {
        other.words.iter().enumerate().all(|(i, bits)| {
            let own = self.words.get(i).copied().unwrap_or(0);
            own & bits == *bits
        })
    }

    /// Check whether no bit is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Clear all bits
    pub fn clear(&mut self) {
        self.words.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmask_grows_past_one_word() {
        let mut mask = BitMask::new();
        mask.set(3);
        mask.set(130);

        assert!(mask.contains(3));
        assert!(mask.contains(130));
        assert!(!mask.contains(4));
        assert!(!mask.contains(500));
    }

    #[test]
    fn test_bitmask_contains_all() {
        let mut entity = BitMask::new();
        entity.set(1);
        entity.set(70);

        let mut query = BitMask::new();
        query.set(70);
        assert!(entity.contains_all(&query));

        query.set(2);
        assert!(!entity.contains_all(&query));
        assert!(entity.contains_all(&BitMask::new()));
    }
}
