//! Slide/step navigation state machine.

use tracing::debug;

use crate::deck::{Deck, SlideRecord};

/// Current position: slide index and reveal step within that slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub slide_index: usize,
    pub step: usize,
}

impl NavigationState {
    pub const START: Self = Self {
        slide_index: 0,
        step: 0,
    };

    pub fn new(slide_index: usize, step: usize) -> Self {
        Self { slide_index, step }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    NextStep,
    PrevStep,
    NextSlide,
    PrevSlide,
    GoTo(usize),
}

/// Read-only view of the step position handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepHandle {
    pub step: usize,
    pub total_steps: usize,
}

impl StepHandle {
    /// Whether the item revealed at `visible_at` is showing.
    pub fn is_visible(&self, visible_at: usize) -> bool {
        self.step >= visible_at
    }
}

/// Owns the deck and the single mutable position into it.
///
/// Invariants: `slide_index < max(1, deck.len())` and
/// `step <= step_count(slide_index)`.
#[derive(Debug, Clone)]
pub struct Navigator {
    deck: Deck,
    step_counts: Vec<usize>,
    state: NavigationState,
}

impl Navigator {
    pub fn new(deck: Deck) -> Self {
        let step_counts = deck.iter().map(|s| s.step_count).collect();
        Self {
            deck,
            step_counts,
            state: NavigationState::START,
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn slide_count(&self) -> usize {
        self.deck.len()
    }

    pub fn current_slide(&self) -> Option<&SlideRecord> {
        self.deck.get(self.state.slide_index)
    }

    /// Highest step reachable on `index`; 0 for slides that don't exist.
    pub fn step_count(&self, index: usize) -> usize {
        self.step_counts.get(index).copied().unwrap_or(0)
    }

    pub fn current_step_count(&self) -> usize {
        self.step_count(self.state.slide_index)
    }

    pub fn step_handle(&self) -> StepHandle {
        StepHandle {
            step: self.state.step,
            total_steps: self.current_step_count(),
        }
    }

    pub fn is_at_start(&self) -> bool {
        self.state == NavigationState::START
    }

    pub fn is_at_end(&self) -> bool {
        match self.slide_count().checked_sub(1) {
            Some(last) => self.state == NavigationState::new(last, self.step_count(last)),
            None => true,
        }
    }

    /// The state `command` would lead to. Boundary overruns and out-of-range
    /// jumps yield the current state unchanged.
    pub fn next_state(&self, command: NavCommand) -> NavigationState {
        let NavigationState { slide_index, step } = self.state;
        let has_next = slide_index + 1 < self.slide_count();
        let has_prev = slide_index > 0;

        match command {
            NavCommand::NextStep if step < self.step_count(slide_index) => {
                NavigationState::new(slide_index, step + 1)
            }
            NavCommand::NextStep | NavCommand::NextSlide if has_next => {
                NavigationState::new(slide_index + 1, 0)
            }
            NavCommand::PrevStep if step > 0 => NavigationState::new(slide_index, step - 1),
            // Backing out of a slide lands on the last step of the previous one.
            NavCommand::PrevStep if has_prev => {
                NavigationState::new(slide_index - 1, self.step_count(slide_index - 1))
            }
            NavCommand::PrevSlide if has_prev => NavigationState::new(slide_index - 1, 0),
            NavCommand::GoTo(index) if index < self.slide_count() => {
                NavigationState::new(index, 0)
            }
            _ => self.state,
        }
    }

    /// Apply a transition; returns whether the state changed.
    pub fn apply(&mut self, command: NavCommand) -> bool {
        let next = self.next_state(command);
        if next == self.state {
            return false;
        }
        debug!(?command, from = ?self.state, to = ?next, "navigate");
        self.state = next;
        true
    }

    /// Replace the deck and return to the first slide.
    pub fn reload(&mut self, deck: Deck) {
        debug!(slides = deck.len(), "deck reloaded");
        *self = Self::new(deck);
    }

    /// Register the step count of the current slide, re-clamping the step.
    pub fn declare_step_count(&mut self, count: usize) {
        let Some(slot) = self.step_counts.get_mut(self.state.slide_index) else {
            return;
        };
        *slot = count;
        self.state.step = self.state.step.min(count);
    }
}
