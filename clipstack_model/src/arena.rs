//! Slot arena backing the object and managed-object stores.
//! Index 0 is reserved (nil); slot reuse bumps the generation so stale
//! identifiers no longer resolve.

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: u32,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Insert a value, returning its 1-based index and generation.
    pub fn insert(&mut self, value: T) -> (u32, u32) {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[(index - 1) as usize];
            slot.value = Some(value);
            return (index, slot.generation);
        }
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (self.slots.len() as u32, 0)
    }

    #[inline]
    fn slot(&self, index: u32, generation: u32) -> Option<&Slot<T>> {
        if index == 0 {
            return None;
        }
        let slot = self.slots.get((index - 1) as usize)?;
        (slot.generation == generation).then_some(slot)
    }

    #[inline]
    pub fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slot(index, generation)?.value.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        if index == 0 {
            return None;
        }
        let slot = self.slots.get_mut((index - 1) as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Remove a value; the slot's generation is bumped so the old id is dead.
    pub fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        if index == 0 {
            return None;
        }
        let slot = self.slots.get_mut((index - 1) as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
        Some(value)
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate live entries as (index, generation, value).
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (i as u32 + 1, slot.generation, v))
        })
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut arena = SlotArena::new();
        let (i, g) = arena.insert("a");
        assert_eq!(arena.get(i, g), Some(&"a"));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.remove(i, g), Some("a"));
        assert_eq!(arena.get(i, g), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn stale_id_does_not_resolve_after_reuse() {
        let mut arena = SlotArena::new();
        let (i, g) = arena.insert(1);
        arena.remove(i, g);
        let (i2, g2) = arena.insert(2);
        assert_eq!(i2, i, "slot should be reused");
        assert_ne!(g2, g, "generation should bump");
        assert_eq!(arena.get(i, g), None);
        assert_eq!(arena.get(i2, g2), Some(&2));
    }

    #[test]
    fn index_zero_is_nil() {
        let arena: SlotArena<i32> = SlotArena::new();
        assert_eq!(arena.get(0, 0), None);
    }
}
