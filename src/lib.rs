//! # Raw mouse input for X11, through *`XInput2`* 🖱️
//!
//! Reports what every pointing device attached to the X server is doing, before the server turns
//! it into cursor motion: relative deltas straight from the device, button states, and wheel
//! detents. Several mice are tracked separately, and can be read on their own or merged into one
//! "master" view.
//!
//! The library is poll based. Nothing happens in the background; each query processes the raw
//! events the server has queued up since the last one, then answers from the accumulated state.
//!
//! To get started, create a [`Builder`].
//!
//! ## Coordinates
//! Positions are the running sum of raw motion, rounded to whole device units per event, and
//! do *not* follow the on-screen cursor. Use [`Manager::set_position`] to re-align them with the
//! cursor (which also moves the cursor!).
//!
//! ## Devices
//! Devices are discovered lazily, the first time they send an event. Until a device has been
//! touched it is unknown to this library.

#![warn(clippy::pedantic)]
#![forbid(unsafe_op_in_unsafe_fn)]

mod aggregate;
pub mod builder;
pub mod decode;
pub mod driver;
pub mod filter;
mod platform;
pub mod registry;
pub mod state;
mod util;

pub use builder::Builder;
pub use platform::{Connection, Window};
#[cfg(xinput2)]
pub use platform::xinput2::{Error as X11Error, X11Connection};
pub use registry::{DeviceId, DeviceRecord};
pub use state::{MouseButton, MouseButtons, MouseState};

use platform::PlatformImpl;

/// The system API a [`Manager`] reads input through.
#[derive(Clone, Copy, Debug)]
pub enum Backend {
    /// [`XInput2`](https://www.x.org/releases/current/doc/inputproto/XI2proto.txt) raw events,
    /// through [`x11rb`].
    #[cfg(xinput2)]
    XInput2,
}

/// Manages a connection to the X server. This is the main entry point for reading mouse state.
pub struct Manager {
    pub(crate) internal: platform::PlatformManager,
}
impl Manager {
    /// The state of all mice combined into one.
    ///
    /// Buttons are down if they're down on any mouse, and wheels add up. The position is that
    /// of whichever mouse moved last.
    pub fn state(&mut self) -> MouseState {
        self.internal.poll_master()
    }
    /// The state of a single mouse, by index in [`Manager::devices`]. Indices past the end give
    /// a default state with `is_connected == false`.
    pub fn device_state(&mut self, index: usize) -> MouseState {
        self.internal.poll_device(index)
    }
    /// Move the cursor to `(x, y)` in root window coordinates, and make every mouse report that
    /// position from now on. Values are rounded to the nearest pixel.
    ///
    /// Failures are logged, and leave both the cursor and the reported positions untouched.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.internal.set_position(x, y);
    }
    /// Access device information, for every mouse that has sent input so far.
    ///
    /// Devices are in order of discovery, and never removed.
    #[must_use]
    pub fn devices(&self) -> &[DeviceRecord] {
        self.internal.devices()
    }
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices().len()
    }
    /// Query the API currently in use.
    #[must_use]
    pub fn backed(&self) -> Backend {
        match self.internal {
            #[cfg(xinput2)]
            platform::PlatformManager::XInput2(_) => Backend::XInput2,
        }
    }
    /// The X connection events are read from. Events not meant for this library can be taken
    /// from it with [`X11Connection::take_unmatched`], which should be done regularly as only
    /// a bounded backlog is kept.
    #[cfg(xinput2)]
    #[must_use]
    pub fn x11_connection(&self) -> &std::sync::Arc<parking_lot::Mutex<X11Connection>> {
        match &self.internal {
            platform::PlatformManager::XInput2(driver) => driver.display(),
        }
    }
}
