use core::fmt;

use hashbrown::HashMap;
use snafu::{ensure, Snafu};

/// Highest button index a [`ButtonSet`] can hold.
pub const MAX_BUTTON: u8 = 63;

/// A joystick button index as reported by the driver station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonId(pub u8);

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "button {}", self.0)
    }
}

/// The buttons held down during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonSet(u64);

impl ButtonSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Marks `button` as held. Indices past [`MAX_BUTTON`] are ignored.
    pub fn press(&mut self, button: ButtonId) {
        if button.0 <= MAX_BUTTON {
            self.0 |= 1 << button.0;
        }
    }

    pub fn with(mut self, button: ButtonId) -> Self {
        self.press(button);
        self
    }

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        button.0 <= MAX_BUTTON && self.0 & (1 << button.0) != 0
    }
}

impl FromIterator<ButtonId> for ButtonSet {
    fn from_iter<T: IntoIterator<Item = ButtonId>>(iter: T) -> Self {
        let mut set = Self::empty();
        for button in iter {
            set.press(button);
        }
        set
    }
}

/// Things the driver can ask for with a button combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Abandon whatever sequence is running and return to manual drive.
    Cancel,
    /// Start the climb-up sequence.
    ClimbUp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancel => "cancel",
            Self::ClimbUp => "climb up",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum BindingError {
    #[snafu(display("A chord needs two different buttons, got {button} twice."))]
    SameButtonTwice { button: ButtonId },
    #[snafu(display("{button} is out of range, the highest button is 63."))]
    ButtonOutOfRange { button: ButtonId },
    #[snafu(display("That chord is already bound to {action}."))]
    ChordInUse { action: Action },
}

/// Two buttons that must be held together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    first: ButtonId,
    second: ButtonId,
}

impl Chord {
    pub fn new(a: ButtonId, b: ButtonId) -> Result<Self, BindingError> {
        ensure!(a != b, SameButtonTwiceSnafu { button: a });
        for button in [a, b] {
            ensure!(button.0 <= MAX_BUTTON, ButtonOutOfRangeSnafu { button });
        }
        // Order-independent so (7, 8) and (8, 7) are the same chord.
        Ok(Self {
            first: a.min(b),
            second: a.max(b),
        })
    }

    pub fn buttons(&self) -> (ButtonId, ButtonId) {
        (self.first, self.second)
    }

    pub fn is_held(&self, buttons: ButtonSet) -> bool {
        buttons.is_pressed(self.first) && buttons.is_pressed(self.second)
    }
}

/// The table of button chords and the action each one triggers.
#[derive(Debug, Clone)]
pub struct ButtonMap {
    chords: HashMap<Action, Chord>,
}

impl ButtonMap {
    pub fn new(
        cancel: (ButtonId, ButtonId),
        climb_up: (ButtonId, ButtonId),
    ) -> Result<Self, BindingError> {
        let mut map = Self {
            chords: HashMap::new(),
        };
        map.bind(Action::Cancel, Chord::new(cancel.0, cancel.1)?)?;
        map.bind(Action::ClimbUp, Chord::new(climb_up.0, climb_up.1)?)?;
        Ok(map)
    }

    /// Binds `chord` to `action`, replacing the action's previous chord.
    pub fn bind(&mut self, action: Action, chord: Chord) -> Result<(), BindingError> {
        let conflict = self
            .chords
            .iter()
            .find(|(bound, existing)| **bound != action && **existing == chord);
        if let Some((&other, _)) = conflict {
            return ChordInUseSnafu { action: other }.fail();
        }

        self.chords.insert(action, chord);
        Ok(())
    }

    pub fn chord(&self, action: Action) -> Option<Chord> {
        self.chords.get(&action).copied()
    }

    pub fn is_held(&self, action: Action, buttons: ButtonSet) -> bool {
        self.chord(action).is_some_and(|chord| chord.is_held(buttons))
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.chords.keys().copied()
    }
}
