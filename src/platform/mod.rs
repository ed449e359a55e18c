// Conditionally include each backend...
#[cfg(xinput2)]
pub(crate) mod xinput2;

#[cfg(test)]
pub(crate) mod mock;

use crate::decode::RawEventPayload;
use crate::filter::EventFilter;
use crate::registry::{DeviceId, DeviceRecord};
use crate::state::MouseState;

/// An X window, by resource ID.
pub type Window = u32;

/// The requests the [driver](crate::driver::Driver) makes of a display connection.
///
/// Every method is a short, self-contained exchange with the server. The driver holds the
/// connection's lock across each group of related calls.
pub trait Connection {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look for XInput, version 2 or newer. Returns the extension's major opcode, which tags
    /// its generic events, or `None` if unavailable.
    fn query_extension(&mut self) -> Result<Option<u8>, Self::Error>;
    /// The root window of the connection's screen.
    fn root_window(&self) -> Window;
    /// Subscribe `window` to raw motion and raw button press/release from `device`.
    fn select_raw_events(&mut self, window: Window, device: DeviceId) -> Result<(), Self::Error>;
    /// Take the oldest queued event accepted by `filter`, without blocking. Events the filter
    /// rejects must not be lost.
    fn check_if_event(
        &mut self,
        filter: EventFilter,
    ) -> Result<Option<RawEventPayload>, Self::Error>;
    /// Fetch the description of one device.
    fn query_device(&mut self, device: DeviceId) -> Result<DeviceRecord, Self::Error>;
    /// Move `device`'s cursor to `(x, y)` relative to the origin of `window`.
    fn warp_pointer(
        &mut self,
        device: DeviceId,
        window: Window,
        x: i32,
        y: i32,
    ) -> Result<(), Self::Error>;
    /// Round trip to the server, so that everything it generated in response to prior
    /// requests is queued locally.
    fn sync(&mut self) -> Result<(), Self::Error>;
}

/// Trait that all platforms implement, giving the main `Manager` higher-level access to the black box.
#[enum_dispatch::enum_dispatch]
pub(crate) trait PlatformImpl {
    fn poll_master(&mut self) -> MouseState;
    fn poll_device(&mut self, index: usize) -> MouseState;
    fn set_position(&mut self, x: f64, y: f64);
    #[must_use]
    fn devices(&self) -> &[DeviceRecord];
}

impl<C: Connection> PlatformImpl for crate::driver::Driver<C> {
    fn poll_master(&mut self) -> MouseState {
        crate::driver::Driver::poll_master(self)
    }
    fn poll_device(&mut self, index: usize) -> MouseState {
        crate::driver::Driver::poll_device(self, index)
    }
    fn set_position(&mut self, x: f64, y: f64) {
        crate::driver::Driver::set_position(self, x, y);
    }
    fn devices(&self) -> &[DeviceRecord] {
        crate::driver::Driver::devices(self)
    }
}

/// Static dispatch between compiled backends.
/// Enum cause why not, (almost?) always has one variant and is thus compiles away to the inner type transparently.
/// Even empty enum is OK, since everything involving it becomes essentially `match ! {}` which is sound :D
#[enum_dispatch::enum_dispatch(PlatformImpl)]
pub(crate) enum PlatformManager {
    #[cfg(xinput2)]
    XInput2(xinput2::Manager),
}
