//! Per-device mouse state, and merging it into one master state.

use crate::decode::DecodedUpdate;
use crate::state::MouseState;
use crate::util::round_saturating;

struct Slot {
    state: MouseState,
    /// Value of the aggregator's clock when this device last moved. Zero if never.
    moved_at: u64,
}

/// One [`MouseState`] per device, indexed by registry index.
#[derive(Default)]
pub struct Aggregator {
    slots: Vec<Slot>,
    /// Ticks on every motion.
    clock: u64,
    /// Master position for when no device has moved since the last warp (or at all).
    resting: (i32, i32),
}
impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Start tracking a new device, returning its index.
    /// Indices are handed out sequentially, in lockstep with the device registry.
    pub fn push(&mut self, is_connected: bool) -> usize {
        let (x, y) = self.resting;
        self.slots.push(Slot {
            state: MouseState {
                x,
                y,
                is_connected,
                ..MouseState::default()
            },
            moved_at: 0,
        });
        self.slots.len() - 1
    }
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MouseState> {
        self.slots.get(index).map(|slot| &slot.state)
    }
    /// Fold a decoded event into the device at `index`. Unknown indices are ignored.
    pub fn apply(&mut self, index: usize, update: DecodedUpdate) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let state = &mut slot.state;
        match update {
            DecodedUpdate::Button { button, pressed } => state.set_button(button, pressed),
            DecodedUpdate::Wheel(direction) => state.wheel_precise += direction.step(),
            DecodedUpdate::Motion { dx, dy } => {
                // Each event is rounded on its own, the fraction is dropped.
                state.x = state.x.wrapping_add(round_saturating(dx));
                state.y = state.y.wrapping_add(round_saturating(dy));
                self.clock += 1;
                slot.moved_at = self.clock;
            }
            DecodedUpdate::Ignored => (),
        }
    }
    /// Move every device, and the master, to `(x, y)`.
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.resting = (x, y);
        for slot in &mut self.slots {
            slot.state.x = x;
            slot.state.y = y;
        }
    }
    /// Combine all devices into one.
    ///
    /// * A button is down if it is down on any device.
    /// * The wheel is the sum of all wheels.
    /// * Connected if any device is connected.
    /// * The position is that of the device which moved most recently. Several pointers moving
    ///   at once will fight over it.
    #[must_use]
    pub fn merge(&self) -> MouseState {
        let mut master = self.slots.iter().fold(MouseState::default(), |mut master, slot| {
            master.buttons |= slot.state.buttons;
            master.wheel_precise += slot.state.wheel_precise;
            master.is_connected |= slot.state.is_connected;
            master
        });

        (master.x, master.y) = self
            .slots
            .iter()
            .filter(|slot| slot.moved_at != 0)
            .max_by_key(|slot| slot.moved_at)
            .map_or(self.resting, |slot| (slot.state.x, slot.state.y));

        master
    }
}
