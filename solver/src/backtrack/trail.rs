use crate::backtrack::DecLvl;

/// A sequence of events recording the changes made to a data structure, so that they can be
/// undone in reverse order when restoring a save point.
///
/// Events pushed at the root level (before any save point) are dropped: they can never be undone.
#[derive(Clone, Debug)]
pub struct Trail<Event> {
    events: Vec<Event>,
    saved_states: Vec<usize>,
}

impl<Event> Trail<Event> {
    pub fn new() -> Self {
        Trail {
            events: Vec::new(),
            saved_states: Vec::new(),
        }
    }

    pub fn push(&mut self, e: Event) {
        if !self.saved_states.is_empty() {
            self.events.push(e);
        }
    }

    pub fn save_state(&mut self) -> DecLvl {
        self.saved_states.push(self.events.len());
        DecLvl::new(self.num_saved())
    }

    pub fn num_saved(&self) -> u32 {
        self.saved_states.len() as u32
    }

    pub fn current_decision_level(&self) -> DecLvl {
        DecLvl::new(self.num_saved())
    }

    /// Undoes all events since the last save point, handing each of them (most recent first) to `undo`.
    pub fn restore_last_with(&mut self, mut undo: impl FnMut(Event)) {
        let Some(last_index) = self.saved_states.pop() else {
            return;
        };
        while self.events.len() > last_index {
            if let Some(e) = self.events.pop() {
                undo(e)
            }
        }
    }

    pub fn restore_with(&mut self, saved: DecLvl, mut undo: impl FnMut(Event)) {
        while self.current_decision_level() > saved {
            self.restore_last_with(&mut undo)
        }
    }
}

impl<Event> Default for Trail<Event> {
    fn default() -> Self {
        Self::new()
    }
}
