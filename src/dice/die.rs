//! Dice values, five-dice sets, and hold selections.
//!
//! A `DiceSet` is always exactly five dice addressed by position 0-4.
//! `HoldSelection` is a compact bitmask over those positions.

use super::source::DieSource;

/// Number of dice in a set.
pub const DICE_PER_SET: usize = 5;

/// Maximum number of dice that may be held for a single reroll.
pub const MAX_HELD: usize = 4;

/// A single die face in 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Die(u8);

impl Die {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// Creates a die from a face value. Returns `None` outside 1..=6.
    pub const fn new(value: u8) -> Option<Die> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Die(value))
        } else {
            None
        }
    }

    /// Creates a die, saturating `value` into 1..=6.
    pub fn clamped(value: u8) -> Die {
        Die(value.clamp(Self::MIN, Self::MAX))
    }

    /// Returns the face value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

/// Five dice for one side of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiceSet([Die; DICE_PER_SET]);

impl DiceSet {
    /// Rolls all five dice.
    pub fn roll(source: &mut dyn DieSource) -> DiceSet {
        DiceSet(std::array::from_fn(|_| source.next_die()))
    }

    /// Builds a set from raw face values. Returns `None` if any value is outside 1..=6.
    pub fn from_values(values: [u8; DICE_PER_SET]) -> Option<DiceSet> {
        let mut dice = [Die(Die::MIN); DICE_PER_SET];
        for (slot, v) in dice.iter_mut().zip(values) {
            *slot = Die::new(v)?;
        }
        Some(DiceSet(dice))
    }

    /// Iterates the dice in positional order.
    pub fn iter(&self) -> impl Iterator<Item = Die> + '_ {
        self.0.iter().copied()
    }

    /// Raw face values in positional order.
    pub fn values(&self) -> [u8; DICE_PER_SET] {
        self.0.map(Die::value)
    }

    /// Sum of all five faces.
    pub fn sum(&self) -> u32 {
        self.0.iter().map(|d| d.value() as u32).sum()
    }

    /// Returns a new set where every die not in `held` is redrawn.
    pub fn reroll_unheld(&self, held: HoldSelection, source: &mut dyn DieSource) -> DiceSet {
        self.reroll_where(source, |index, _| !held.contains(index))
    }

    /// Returns a new set where each die matching `redraw` is replaced by a fresh draw.
    ///
    /// Draws happen in positional order, one per redrawn die.
    pub fn reroll_where<F>(&self, source: &mut dyn DieSource, mut redraw: F) -> DiceSet
    where
        F: FnMut(usize, Die) -> bool,
    {
        let mut next = self.0;
        for (index, die) in next.iter_mut().enumerate() {
            if redraw(index, *die) {
                *die = source.next_die();
            }
        }
        DiceSet(next)
    }
}

/// Indices of human dice kept through the next reroll.
///
/// Stored as a bitmask over positions 0-4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HoldSelection(u8);

impl HoldSelection {
    /// An empty selection.
    pub const fn new() -> Self {
        HoldSelection(0)
    }

    /// Builds a selection from indices, ignoring anything out of range.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut sel = HoldSelection::new();
        for i in indices {
            sel.insert(i);
        }
        sel
    }

    pub fn contains(self, index: usize) -> bool {
        index < DICE_PER_SET && self.0 & (1 << index) != 0
    }

    /// Adds an index. Returns false if out of range or already present.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= DICE_PER_SET || self.contains(index) {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    /// Removes an index. Returns false if it was not present.
    pub fn remove(&mut self, index: usize) -> bool {
        if !self.contains(index) {
            return false;
        }
        self.0 &= !(1 << index);
        true
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Held indices in ascending order.
    pub fn indices(self) -> Vec<usize> {
        (0..DICE_PER_SET).filter(|&i| self.contains(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::source::ScriptedDice;

    #[test]
    fn die_rejects_out_of_range() {
        assert_eq!(Die::new(0), None);
        assert_eq!(Die::new(7), None);
        assert_eq!(Die::new(1).map(Die::value), Some(1));
        assert_eq!(Die::new(6).map(Die::value), Some(6));
        assert_eq!(Die::clamped(9).value(), 6);
        assert_eq!(Die::clamped(0).value(), 1);
    }

    #[test]
    fn roll_draws_five_in_order() {
        let mut source = ScriptedDice::new(&[3, 1, 4, 1, 5]).unwrap();
        let set = DiceSet::roll(&mut source);
        assert_eq!(set.values(), [3, 1, 4, 1, 5]);
        assert_eq!(set.sum(), 14);
    }

    #[test]
    fn from_values_rejects_bad_face() {
        assert!(DiceSet::from_values([1, 2, 3, 4, 5]).is_some());
        assert!(DiceSet::from_values([1, 2, 0, 4, 5]).is_none());
    }

    #[test]
    fn reroll_unheld_keeps_held_positions() {
        let set = DiceSet::from_values([6, 2, 6, 3, 1]).unwrap();
        let held = HoldSelection::from_indices([0, 2]);
        let mut source = ScriptedDice::new(&[4, 5, 2]).unwrap();
        let next = set.reroll_unheld(held, &mut source);
        assert_eq!(next.values(), [6, 4, 6, 5, 2]);
    }

    #[test]
    fn hold_selection_bitmask() {
        let mut sel = HoldSelection::new();
        assert!(sel.is_empty());
        assert!(sel.insert(3));
        assert!(!sel.insert(3));
        assert!(!sel.insert(5));
        assert!(sel.insert(0));
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.indices(), vec![0, 3]);
        assert!(sel.remove(3));
        assert!(!sel.remove(3));
        assert_eq!(sel.indices(), vec![0]);
        sel.clear();
        assert!(sel.is_empty());
    }
}
