//! Bounded slot arena for the multiplexed loop.
//!
//! Slots are reused lowest-index first after removal (tombstoning). Iteration
//! is bounded by a high-water mark so a mostly-empty table stays cheap to scan.

/// Fixed-capacity table of live clients, indexed by slot.
#[derive(Debug)]
pub struct ConnectionRegistry<T> {
    slots: Vec<Option<T>>,
    len: usize,
    /// One past the highest occupied slot.
    high_water: usize,
}

impl<T> ConnectionRegistry<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            len: 0,
            high_water: 0,
        }
    }

    /// Store `entry` in the first free slot.
    ///
    /// Hands the entry back if every slot is taken.
    pub fn insert(&mut self, entry: T) -> Result<usize, T> {
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            return Err(entry);
        };
        self.slots[slot] = Some(entry);
        self.len += 1;
        self.high_water = self.high_water.max(slot + 1);
        Ok(slot)
    }

    /// Take the entry out of `slot`, leaving it free for reuse.
    pub fn remove(&mut self, slot: usize) -> Option<T> {
        let entry = self.slots.get_mut(slot)?.take()?;
        self.len -= 1;
        while self.high_water > 0 && self.slots[self.high_water - 1].is_none() {
            self.high_water -= 1;
        }
        Some(entry)
    }

    #[cfg(test)]
    fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)?.as_ref()
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots[..self.high_water]
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|e| (slot, e)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// One past the highest occupied slot; bounds every scan.
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
