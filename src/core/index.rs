// Dense second -> entry lookup

use crate::core::format::Entry;

/// Slot table sized to `max(second) + 1`. Each slot holds the position of the
/// entry for that second inside the recording's entry vector, or `None` for
/// a gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondIndex {
    slots: Vec<Option<u32>>,
}

impl SecondIndex {
    pub fn build(entries: &[Entry]) -> Self {
        let Some(max_second) = entries.iter().map(|e| e.second).max() else {
            return Self::default();
        };

        let mut slots = vec![None; max_second as usize + 1];
        for (pos, entry) in entries.iter().enumerate() {
            slots[entry.second as usize] = Some(pos as u32);
        }

        Self { slots }
    }

    /// Position of the entry at `second`, if one exists.
    pub fn position(&self, second: u32) -> Option<usize> {
        self.slots
            .get(second as usize)
            .copied()
            .flatten()
            .map(|pos| pos as usize)
    }

    pub fn lookup<'a>(&self, entries: &'a [Entry], second: u32) -> Option<&'a Entry> {
        self.position(second).and_then(|pos| entries.get(pos))
    }

    /// Number of slots, i.e. `max(second) + 1`.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
