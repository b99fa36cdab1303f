mod trail;

pub use trail::Trail;

use std::num::NonZeroU32;

/// A decision level of the search, i.e. the number of save points currently stacked on a
/// backtrackable structure.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DecLvl(NonZeroU32);

impl DecLvl {
    /// Represents the root decision level, at which no decision has been taken yet.
    pub const ROOT: DecLvl = Self::new(0);

    pub const fn new(num_saved: u32) -> Self {
        match NonZeroU32::new(num_saved + 1) {
            Some(lvl) => DecLvl(lvl),
            None => panic!("decision level overflow"),
        }
    }

    /// Returns an integer representation of the decision level.
    /// 0 represents the ROOT.
    pub fn to_int(self) -> u32 {
        self.0.get() - 1
    }
}

impl Default for DecLvl {
    fn default() -> Self {
        Self::ROOT
    }
}

impl From<u32> for DecLvl {
    fn from(num_saved: u32) -> Self {
        DecLvl::new(num_saved)
    }
}

/// A data structure whose modifications can be undone up to a previously saved state.
pub trait Backtrack {
    fn save_state(&mut self) -> DecLvl;
    fn num_saved(&self) -> u32;
    fn current_decision_level(&self) -> DecLvl {
        DecLvl::from(self.num_saved())
    }
    fn restore_last(&mut self);
    fn restore(&mut self, saved_id: DecLvl) {
        while self.current_decision_level() > saved_id {
            self.restore_last();
        }
    }

    fn reset(&mut self) {
        if self.current_decision_level() > DecLvl::ROOT {
            self.restore(DecLvl::ROOT);
        }
    }
}
