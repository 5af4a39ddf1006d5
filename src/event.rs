use hashbrown::HashMap;

use crate::controller::{Action, ButtonMap, ButtonSet};

/// A boolean signal sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanEvent {
    previous: bool,
    current: bool,
}

impl BooleanEvent {
    pub const fn new(initial: bool) -> Self {
        Self {
            previous: initial,
            current: initial,
        }
    }

    pub fn update(&mut self, signal: bool) {
        self.previous = self.current;
        self.current = signal;
    }

    pub const fn current_state(&self) -> bool {
        self.current
    }

    /// True on the tick the signal went high.
    pub const fn rising(&self) -> bool {
        !self.previous && self.current
    }

    /// True on the tick the signal went low.
    pub const fn falling(&self) -> bool {
        self.previous && !self.current
    }
}

/// Tracks every bound action's chord across ticks.
#[derive(Debug, Clone, Default)]
pub struct EventLoop {
    events: HashMap<Action, BooleanEvent>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples every chord in `map` against this tick's buttons.
    pub fn poll(&mut self, map: &ButtonMap, buttons: ButtonSet) {
        for action in map.actions() {
            self.events
                .entry(action)
                .or_default()
                .update(map.is_held(action, buttons));
        }
    }

    pub fn event(&self, action: Action) -> BooleanEvent {
        self.events.get(&action).copied().unwrap_or_default()
    }

    pub fn is_high(&self, action: Action) -> bool {
        self.event(action).current_state()
    }

    pub fn rising(&self, action: Action) -> bool {
        self.event(action).rising()
    }

    /// Forgets all history, as if every chord had just been released.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
