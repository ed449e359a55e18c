//! # Mouse state
//!
//! Snapshots of a mouse's buttons, wheel, and cumulative position, as reported by
//! [`Manager::state`](crate::Manager::state) and [`Manager::device_state`](crate::Manager::device_state).
//!
//! Positions are built by summing raw (relative) motion, and as such are *not* the position of the
//! on-screen cursor - they are only meaningful relative to other snapshots from the same [`Manager`](crate::Manager),
//! or after an explicit [`Manager::set_position`](crate::Manager::set_position).

/// A logical mouse button.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, strum::EnumIter, strum::EnumCount, strum::Display,
)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Button1,
    Button2,
    Button3,
    Button4,
    Button5,
    Button6,
    Button7,
    Button8,
    Button9,
}
impl MouseButton {
    /// The set containing just this button.
    #[must_use]
    pub const fn bit(self) -> MouseButtons {
        match self {
            Self::Left => MouseButtons::LEFT,
            Self::Middle => MouseButtons::MIDDLE,
            Self::Right => MouseButtons::RIGHT,
            Self::Button1 => MouseButtons::BUTTON1,
            Self::Button2 => MouseButtons::BUTTON2,
            Self::Button3 => MouseButtons::BUTTON3,
            Self::Button4 => MouseButtons::BUTTON4,
            Self::Button5 => MouseButtons::BUTTON5,
            Self::Button6 => MouseButtons::BUTTON6,
            Self::Button7 => MouseButtons::BUTTON7,
            Self::Button8 => MouseButtons::BUTTON8,
            Self::Button9 => MouseButtons::BUTTON9,
        }
    }
}

bitflags::bitflags! {
    /// A set of [`MouseButton`]s.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    pub struct MouseButtons: u16 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
        const BUTTON1 = 1 << 3;
        const BUTTON2 = 1 << 4;
        const BUTTON3 = 1 << 5;
        const BUTTON4 = 1 << 6;
        const BUTTON5 = 1 << 7;
        const BUTTON6 = 1 << 8;
        const BUTTON7 = 1 << 9;
        const BUTTON8 = 1 << 10;
        const BUTTON9 = 1 << 11;
    }
}

/// Direction of a single wheel detent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WheelDirection {
    /// Away from the user.
    Up,
    /// Towards the user.
    Down,
}
impl WheelDirection {
    /// Signed step applied to the precise wheel accumulator.
    #[must_use]
    pub const fn step(self) -> f32 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

/// A snapshot of a mouse. See the [module level docs](crate::state) for the meaning of the position.
///
/// The [`Default`] snapshot is the one reported for devices that don't exist: everything released,
/// at the origin, and not connected.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseState {
    /// Cumulative horizontal position, positive right.
    pub x: i32,
    /// Cumulative vertical position, positive down.
    pub y: i32,
    /// Buttons currently held.
    pub buttons: MouseButtons,
    /// Cumulative wheel travel, in detents. Positive away from the user.
    pub wheel_precise: f32,
    pub is_connected: bool,
}
impl MouseState {
    #[must_use]
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(button.bit())
    }
    #[must_use]
    pub fn is_button_up(&self, button: MouseButton) -> bool {
        !self.is_button_down(button)
    }
    /// Cumulative wheel travel rounded to whole detents.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn wheel(&self) -> i32 {
        self.wheel_precise.round() as i32
    }
    /// Iterate the buttons currently held, in declaration order.
    pub fn pressed(&self) -> impl Iterator<Item = MouseButton> + '_ {
        use strum::IntoEnumIterator;
        MouseButton::iter().filter(|button| self.is_button_down(*button))
    }
    pub(crate) fn set_button(&mut self, button: MouseButton, pressed: bool) {
        self.buttons.set(button.bit(), pressed);
    }
}
