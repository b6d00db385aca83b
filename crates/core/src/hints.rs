//! Hint pricing and the per-question unlock ledger.

/// XP price of each hint unlock, by how many hints are already open.
///
/// Only three tiers exist: the first hint, the second hint, and every hint
/// after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintPricing {
    first: u32,
    second: u32,
    beyond: u32,
}

impl Default for HintPricing {
    /// First hint free, second 5 XP, every later hint 10 XP.
    fn default() -> Self {
        Self {
            first: 0,
            second: 5,
            beyond: 10,
        }
    }
}

impl HintPricing {
    #[must_use]
    pub fn new(first: u32, second: u32, beyond: u32) -> Self {
        Self {
            first,
            second,
            beyond,
        }
    }

    /// Cost of the next unlock when `already_unlocked` hints are open.
    #[must_use]
    pub fn cost_of_next(&self, already_unlocked: usize) -> u32 {
        match already_unlocked {
            0 => self.first,
            1 => self.second,
            _ => self.beyond,
        }
    }
}

/// Unlock counter for the question currently on screen.
///
/// `epoch` changes on every reset so a purchase that settles after the student
/// moved on can be recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintLedger {
    unlocked: usize,
    epoch: u64,
}

impl HintLedger {
    #[must_use]
    pub fn unlocked(&self) -> usize {
        self.unlocked
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Open one more hint, never going past `available`.
    ///
    /// Returns the new count, or `None` if every hint was already open.
    pub fn unlock(&mut self, available: usize) -> Option<usize> {
        if self.unlocked >= available {
            return None;
        }
        self.unlocked += 1;
        Some(self.unlocked)
    }

    pub fn reset(&mut self) {
        self.unlocked = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ladder_is_free_then_five_then_flat_ten() {
        let pricing = HintPricing::default();
        assert_eq!(pricing.cost_of_next(0), 0);
        assert_eq!(pricing.cost_of_next(1), 5);
        assert_eq!(pricing.cost_of_next(2), 10);
        assert_eq!(pricing.cost_of_next(3), 10);
        assert_eq!(pricing.cost_of_next(9), 10);
    }

    #[test]
    fn ledger_caps_at_available() {
        let mut ledger = HintLedger::default();
        assert_eq!(ledger.unlock(2), Some(1));
        assert_eq!(ledger.unlock(2), Some(2));
        assert_eq!(ledger.unlock(2), None);
        assert_eq!(ledger.unlocked(), 2);
    }

    #[test]
    fn reset_clears_count_and_moves_epoch() {
        let mut ledger = HintLedger::default();
        ledger.unlock(3);
        let before = ledger.epoch();
        ledger.reset();
        assert_eq!(ledger.unlocked(), 0);
        assert_ne!(ledger.epoch(), before);
    }
}
